//! Row classification: which taxonomy entity a raw row describes.
//!
//! Every function here is pure and total. Unknown values come back as
//! [`ClassifiedEntityType::Unrecognized`] or `None`; the caller decides
//! whether that skips the row, falls back, or fails the job.

use serde::{Deserialize, Serialize};

use crate::row::RawRow;

/// Discriminator column of occupation rows.
pub const OCCUPATION_TYPE_COLUMN: &str = "OCCUPATIONTYPE";
/// Discriminator column of occupation group rows.
pub const GROUP_TYPE_COLUMN: &str = "GROUPTYPE";
/// Generic discriminator column used by mixed exports.
pub const OBJECT_TYPE_COLUMN: &str = "OBJECTTYPE";

/// Entity kind selected by a row's discriminator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifiedEntityType {
    EscoOccupation,
    LocalOccupation,
    IscoGroup,
    LocalGroup,
    SkillGroup,
    Skill,
    Unrecognized,
}

impl ClassifiedEntityType {
    /// Match a discriminator value exactly (case-sensitive).
    pub fn from_marker(value: &str) -> Self {
        match value {
            "escooccupation" => Self::EscoOccupation,
            "localoccupation" => Self::LocalOccupation,
            "iscogroup" => Self::IscoGroup,
            "localgroup" => Self::LocalGroup,
            "skillgroup" => Self::SkillGroup,
            "skill" => Self::Skill,
            _ => Self::Unrecognized,
        }
    }

    /// The discriminator value written for this kind.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Self::EscoOccupation => Some("escooccupation"),
            Self::LocalOccupation => Some("localoccupation"),
            Self::IscoGroup => Some("iscogroup"),
            Self::LocalGroup => Some("localgroup"),
            Self::SkillGroup => Some("skillgroup"),
            Self::Skill => Some("skill"),
            Self::Unrecognized => None,
        }
    }

    pub fn is_occupation(self) -> bool {
        matches!(self, Self::EscoOccupation | Self::LocalOccupation)
    }

    pub fn is_group(self) -> bool {
        matches!(self, Self::IscoGroup | Self::LocalGroup)
    }
}

impl std::fmt::Display for ClassifiedEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker().unwrap_or("unrecognized"))
    }
}

/// Classify a row by any known marker in `column`.
pub fn classify(row: &RawRow, column: &str) -> ClassifiedEntityType {
    row.get(column)
        .map_or(ClassifiedEntityType::Unrecognized, ClassifiedEntityType::from_marker)
}

/// Occupation family only; group and skill markers are `Unrecognized` here.
pub fn classify_occupation_like(row: &RawRow, column: &str) -> ClassifiedEntityType {
    match classify(row, column) {
        kind if kind.is_occupation() => kind,
        _ => ClassifiedEntityType::Unrecognized,
    }
}

/// Occupation group family only.
pub fn classify_group_like(row: &RawRow, column: &str) -> ClassifiedEntityType {
    match classify(row, column) {
        kind if kind.is_group() => kind,
        _ => ClassifiedEntityType::Unrecognized,
    }
}

/// Where an occupation comes from, independent of its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OccupationType {
    Esco,
    Local,
    Localized,
}

impl OccupationType {
    /// Case-insensitive parse of `esco`, `local` or `localized`.
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Esco, Self::Local, Self::Localized]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Esco => "ESCO",
            Self::Local => "LOCAL",
            Self::Localized => "LOCALIZED",
        }
    }
}

/// Origin of the occupation described by the `OCCUPATIONTYPE` column.
pub fn occupation_type_from_row(row: &RawRow) -> Option<OccupationType> {
    occupation_type_in(row, OCCUPATION_TYPE_COLUMN)
}

/// Origin read from an explicit column.
pub fn occupation_type_in(row: &RawRow, column: &str) -> Option<OccupationType> {
    row.get(column).and_then(OccupationType::parse)
}
