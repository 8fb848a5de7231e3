//! Per-row rejection reasons

/// Why a single row could not become an entity. Never fatal to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line in the source, when known
    pub line: Option<usize>,
    pub kind: RowErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowErrorKind {
    MissingColumn(String),
    EmptyValue(String),
    UnrecognizedType { column: String, value: String },
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },
    /// The source could not decode the row at all
    Malformed(String),
}

impl RowError {
    pub fn new(kind: RowErrorKind) -> Self {
        Self { line: None, kind }
    }

    pub fn missing(column: &str) -> Self {
        Self::new(RowErrorKind::MissingColumn(column.to_string()))
    }

    pub fn empty(column: &str) -> Self {
        Self::new(RowErrorKind::EmptyValue(column.to_string()))
    }

    pub fn unrecognized(column: &str, value: &str) -> Self {
        Self::new(RowErrorKind::UnrecognizedType {
            column: column.to_string(),
            value: value.to_string(),
        })
    }

    pub fn invalid(column: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::new(RowErrorKind::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        })
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RowErrorKind::Malformed(message.into()))
    }

    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        match &self.kind {
            RowErrorKind::MissingColumn(c) => write!(f, "missing column {c}"),
            RowErrorKind::EmptyValue(c) => write!(f, "empty value in {c}"),
            RowErrorKind::UnrecognizedType { column, value } => {
                write!(f, "unrecognized {column} {value:?}")
            }
            RowErrorKind::InvalidValue {
                column,
                value,
                reason,
            } => write!(f, "invalid {column} {value:?}: {reason}"),
            RowErrorKind::Malformed(msg) => write!(f, "malformed row: {msg}"),
        }
    }
}

impl std::error::Error for RowError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_line() {
        let err = RowError::missing("ID").at_line(7);
        assert_eq!(err.to_string(), "line 7: missing column ID");
    }

    #[test]
    fn display_unrecognized() {
        let err = RowError::unrecognized("OCCUPATIONTYPE", "FOO");
        assert_eq!(err.to_string(), r#"unrecognized OCCUPATIONTYPE "FOO""#);
    }
}
