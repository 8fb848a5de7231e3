//! Raw tabular rows as produced by the CSV/XLSX front end

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One input row: column name to string value, in column order.
///
/// Lookups are exact on the column name. Inserting an existing column
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Text form of a scalar cell; nested values are rejected.
fn cell_text(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("cell must be a scalar, got {other}")),
    }
}

struct RawRowVisitor;

impl<'de> Visitor<'de> for RawRowVisitor {
    type Value = RawRow;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a map of column names to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RawRow, A::Error> {
        let mut row = RawRow {
            cells: Vec::with_capacity(access.size_hint().unwrap_or(0)),
        };
        while let Some((column, value)) = access.next_entry::<String, serde_json::Value>()? {
            let text = cell_text(value)
                .map_err(|e| serde::de::Error::custom(format!("column {column}: {e}")))?;
            row.insert(column, text);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for RawRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawRowVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_column_order() {
        let row: RawRow = serde_json::from_str(r#"{"ZZ":"1","AA":"2","MM":"3"}"#).unwrap();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["ZZ", "AA", "MM"]);
    }

    #[test]
    fn scalars_become_text() {
        let row: RawRow =
            serde_json::from_str(r#"{"ISLOCALIZED":true,"DEGREE":12,"NOTE":null}"#).unwrap();
        assert_eq!(row.get("ISLOCALIZED"), Some("true"));
        assert_eq!(row.get("DEGREE"), Some("12"));
        assert_eq!(row.get("NOTE"), Some(""));
    }

    #[test]
    fn nested_values_rejected() {
        let err = serde_json::from_str::<RawRow>(r#"{"ALTLABELS":["a","b"]}"#).unwrap_err();
        assert!(err.to_string().contains("ALTLABELS"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut row: RawRow = [("ID", "1"), ("CODE", "x")].into_iter().collect();
        row.insert("ID", "2");
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("ID"), Some("2"));
        assert_eq!(row.columns().next(), Some("ID"));
    }

    #[test]
    fn lookup_is_exact() {
        let row: RawRow = [("OCCUPATIONTYPE", "esco")].into_iter().collect();
        assert_eq!(row.get("occupationtype"), None);
    }

    #[test]
    fn serializes_in_order() {
        let row: RawRow = [("B", "2"), ("A", "1")].into_iter().collect();
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"B":"2","A":"1"}"#);
    }
}
