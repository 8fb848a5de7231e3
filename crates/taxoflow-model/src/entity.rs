//! Typed taxonomy entities and their row parsers.
//!
//! Entities serialize with the same column names they are parsed from, so an
//! exported record can be imported again unchanged.

use serde::{Serialize, Serializer};

use crate::classify::{
    self, ClassifiedEntityType, GROUP_TYPE_COLUMN, OCCUPATION_TYPE_COLUMN, OccupationType,
};
use crate::error::RowError;
use crate::row::RawRow;

/// Build an entity from one raw row.
pub trait FromRow: Sized {
    fn from_row(row: &RawRow) -> Result<Self, RowError>;
}

// --- cell helpers ----------------------------------------------------------

fn required(row: &RawRow, column: &str) -> Result<String, RowError> {
    let value = row.get(column).ok_or_else(|| RowError::missing(column))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(RowError::empty(column));
    }
    Ok(value.to_string())
}

fn optional(row: &RawRow, column: &str) -> String {
    row.get(column).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn flag(row: &RawRow, column: &str) -> Result<bool, RowError> {
    match row.get(column).map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(RowError::invalid(column, v, "expected true or false")),
    }
}

/// `ALTLABELS` cells hold one label per line.
fn labels(row: &RawRow, column: &str) -> Vec<String> {
    row.get(column)
        .map(|v| {
            v.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn join_lines<S: Serializer>(labels: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&labels.join("\n"))
}

// --- occupations -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OccupationKind {
    #[serde(rename = "escooccupation")]
    Esco,
    #[serde(rename = "localoccupation")]
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupation {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ORIGINURI")]
    pub origin_uri: String,
    #[serde(rename = "CODE")]
    pub code: String,
    #[serde(rename = "OCCUPATIONGROUPCODE")]
    pub group_code: String,
    #[serde(rename = "PREFERREDLABEL")]
    pub preferred_label: String,
    #[serde(rename = "ALTLABELS", serialize_with = "join_lines")]
    pub alt_labels: Vec<String>,
    #[serde(rename = "DESCRIPTION")]
    pub description: String,
    #[serde(rename = "DEFINITION")]
    pub definition: String,
    #[serde(rename = "SCOPENOTE")]
    pub scope_note: String,
    #[serde(rename = "REGULATEDPROFESSIONNOTE")]
    pub regulated_profession_note: String,
    #[serde(rename = "OCCUPATIONTYPE")]
    pub kind: OccupationKind,
    #[serde(rename = "ISLOCALIZED")]
    pub is_localized: bool,
}

/// Shape from the marker; origin spelling (`esco`, `local`, `localized`) as fallback.
fn occupation_kind(row: &RawRow) -> Result<(OccupationKind, bool), RowError> {
    match classify::classify_occupation_like(row, OCCUPATION_TYPE_COLUMN) {
        ClassifiedEntityType::EscoOccupation => return Ok((OccupationKind::Esco, false)),
        ClassifiedEntityType::LocalOccupation => return Ok((OccupationKind::Local, false)),
        _ => {}
    }
    match classify::occupation_type_from_row(row) {
        Some(OccupationType::Esco) => Ok((OccupationKind::Esco, false)),
        Some(OccupationType::Localized) => Ok((OccupationKind::Esco, true)),
        Some(OccupationType::Local) => Ok((OccupationKind::Local, false)),
        None => {
            let value = row.get(OCCUPATION_TYPE_COLUMN).unwrap_or_default();
            Err(RowError::unrecognized(OCCUPATION_TYPE_COLUMN, value))
        }
    }
}

impl FromRow for Occupation {
    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        let (kind, localized_by_type) = occupation_kind(row)?;
        let is_localized = localized_by_type || flag(row, "ISLOCALIZED")?;
        if is_localized && kind == OccupationKind::Local {
            return Err(RowError::invalid(
                "ISLOCALIZED",
                "true",
                "local occupations cannot be localized",
            ));
        }
        Ok(Self {
            id: required(row, "ID")?,
            origin_uri: optional(row, "ORIGINURI"),
            code: required(row, "CODE")?,
            group_code: optional(row, "OCCUPATIONGROUPCODE"),
            preferred_label: required(row, "PREFERREDLABEL")?,
            alt_labels: labels(row, "ALTLABELS"),
            description: optional(row, "DESCRIPTION"),
            definition: optional(row, "DEFINITION"),
            scope_note: optional(row, "SCOPENOTE"),
            regulated_profession_note: optional(row, "REGULATEDPROFESSIONNOTE"),
            kind,
            is_localized,
        })
    }
}

// --- occupation groups -----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupKind {
    #[serde(rename = "iscogroup")]
    Isco,
    #[serde(rename = "localgroup")]
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupationGroup {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ORIGINURI")]
    pub origin_uri: String,
    #[serde(rename = "CODE")]
    pub code: String,
    #[serde(rename = "PREFERREDLABEL")]
    pub preferred_label: String,
    #[serde(rename = "ALTLABELS", serialize_with = "join_lines")]
    pub alt_labels: Vec<String>,
    #[serde(rename = "DESCRIPTION")]
    pub description: String,
    #[serde(rename = "GROUPTYPE")]
    pub kind: GroupKind,
}

impl FromRow for OccupationGroup {
    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        let kind = match classify::classify_group_like(row, GROUP_TYPE_COLUMN) {
            ClassifiedEntityType::IscoGroup => GroupKind::Isco,
            ClassifiedEntityType::LocalGroup => GroupKind::Local,
            _ => {
                let value = row.get(GROUP_TYPE_COLUMN).unwrap_or_default();
                return Err(RowError::unrecognized(GROUP_TYPE_COLUMN, value));
            }
        };
        Ok(Self {
            id: required(row, "ID")?,
            origin_uri: optional(row, "ORIGINURI"),
            code: required(row, "CODE")?,
            preferred_label: required(row, "PREFERREDLABEL")?,
            alt_labels: labels(row, "ALTLABELS"),
            description: optional(row, "DESCRIPTION"),
            kind,
        })
    }
}

// --- skills ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skill {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ORIGINURI")]
    pub origin_uri: String,
    #[serde(rename = "PREFERREDLABEL")]
    pub preferred_label: String,
    #[serde(rename = "ALTLABELS", serialize_with = "join_lines")]
    pub alt_labels: Vec<String>,
    #[serde(rename = "DESCRIPTION")]
    pub description: String,
    #[serde(rename = "DEFINITION")]
    pub definition: String,
    #[serde(rename = "SCOPENOTE")]
    pub scope_note: String,
    #[serde(rename = "SKILLTYPE")]
    pub skill_type: String,
    #[serde(rename = "REUSELEVEL")]
    pub reuse_level: String,
}

impl FromRow for Skill {
    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            id: required(row, "ID")?,
            origin_uri: optional(row, "ORIGINURI"),
            preferred_label: required(row, "PREFERREDLABEL")?,
            alt_labels: labels(row, "ALTLABELS"),
            description: optional(row, "DESCRIPTION"),
            definition: optional(row, "DEFINITION"),
            scope_note: optional(row, "SCOPENOTE"),
            skill_type: optional(row, "SKILLTYPE"),
            reuse_level: optional(row, "REUSELEVEL"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillGroup {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ORIGINURI")]
    pub origin_uri: String,
    #[serde(rename = "CODE")]
    pub code: String,
    #[serde(rename = "PREFERREDLABEL")]
    pub preferred_label: String,
    #[serde(rename = "ALTLABELS", serialize_with = "join_lines")]
    pub alt_labels: Vec<String>,
    #[serde(rename = "DESCRIPTION")]
    pub description: String,
    #[serde(rename = "SCOPENOTE")]
    pub scope_note: String,
}

impl FromRow for SkillGroup {
    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            id: required(row, "ID")?,
            origin_uri: optional(row, "ORIGINURI"),
            code: required(row, "CODE")?,
            preferred_label: required(row, "PREFERREDLABEL")?,
            alt_labels: labels(row, "ALTLABELS"),
            description: optional(row, "DESCRIPTION"),
            scope_note: optional(row, "SCOPENOTE"),
        })
    }
}

// --- hierarchy -------------------------------------------------------------

/// Parent/child link between two taxonomy objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyEdge {
    #[serde(rename = "PARENTOBJECTTYPE")]
    pub parent_type: ClassifiedEntityType,
    #[serde(rename = "PARENTID")]
    pub parent_id: String,
    #[serde(rename = "CHILDOBJECTTYPE")]
    pub child_type: ClassifiedEntityType,
    #[serde(rename = "CHILDID")]
    pub child_id: String,
}

/// Whether `child` may hang under `parent`.
pub fn is_valid_edge(parent: ClassifiedEntityType, child: ClassifiedEntityType) -> bool {
    use ClassifiedEntityType as E;
    match parent {
        E::IscoGroup | E::LocalGroup => child.is_group() || child.is_occupation(),
        E::EscoOccupation | E::LocalOccupation => child.is_occupation(),
        E::SkillGroup => matches!(child, E::SkillGroup | E::Skill),
        E::Skill => child == E::Skill,
        E::Unrecognized => false,
    }
}

fn object_type(row: &RawRow, column: &str) -> Result<ClassifiedEntityType, RowError> {
    match classify::classify(row, column) {
        ClassifiedEntityType::Unrecognized => {
            let value = row.get(column).ok_or_else(|| RowError::missing(column))?;
            Err(RowError::unrecognized(column, value))
        }
        kind => Ok(kind),
    }
}

impl FromRow for HierarchyEdge {
    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        let parent_type = object_type(row, "PARENTOBJECTTYPE")?;
        let child_type = object_type(row, "CHILDOBJECTTYPE")?;
        if !is_valid_edge(parent_type, child_type) {
            return Err(RowError::invalid(
                "CHILDOBJECTTYPE",
                &child_type.to_string(),
                format!("cannot be a child of {parent_type}"),
            ));
        }
        let parent_id = required(row, "PARENTID")?;
        let child_id = required(row, "CHILDID")?;
        if parent_id == child_id {
            return Err(RowError::invalid(
                "CHILDID",
                &child_id,
                "object cannot be its own parent",
            ));
        }
        Ok(Self {
            parent_type,
            parent_id,
            child_type,
            child_id,
        })
    }
}

// --- relations -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Essential,
    Optional,
}

fn relation_type(row: &RawRow) -> Result<RelationType, RowError> {
    let value = required(row, "RELATIONTYPE")?;
    match value.to_ascii_lowercase().as_str() {
        "essential" => Ok(RelationType::Essential),
        "optional" => Ok(RelationType::Optional),
        _ => Err(RowError::invalid(
            "RELATIONTYPE",
            &value,
            "expected essential or optional",
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupationSkillRelation {
    #[serde(rename = "OCCUPATIONTYPE")]
    pub occupation_kind: OccupationKind,
    #[serde(rename = "OCCUPATIONID")]
    pub occupation_id: String,
    #[serde(rename = "RELATIONTYPE")]
    pub relation_type: RelationType,
    #[serde(rename = "SKILLID")]
    pub skill_id: String,
}

impl FromRow for OccupationSkillRelation {
    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        let occupation_kind = match classify::classify_occupation_like(row, OCCUPATION_TYPE_COLUMN)
        {
            ClassifiedEntityType::EscoOccupation => OccupationKind::Esco,
            ClassifiedEntityType::LocalOccupation => OccupationKind::Local,
            _ => {
                let value = row.get(OCCUPATION_TYPE_COLUMN).unwrap_or_default();
                return Err(RowError::unrecognized(OCCUPATION_TYPE_COLUMN, value));
            }
        };
        Ok(Self {
            occupation_kind,
            occupation_id: required(row, "OCCUPATIONID")?,
            relation_type: relation_type(row)?,
            skill_id: required(row, "SKILLID")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillSkillRelation {
    #[serde(rename = "REQUIRINGID")]
    pub requiring_id: String,
    #[serde(rename = "RELATIONTYPE")]
    pub relation_type: RelationType,
    #[serde(rename = "REQUIREDID")]
    pub required_id: String,
}

impl FromRow for SkillSkillRelation {
    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        let requiring_id = required(row, "REQUIRINGID")?;
        let required_id = required(row, "REQUIREDID")?;
        if requiring_id == required_id {
            return Err(RowError::invalid(
                "REQUIREDID",
                &required_id,
                "skill cannot require itself",
            ));
        }
        Ok(Self {
            requiring_id,
            relation_type: relation_type(row)?,
            required_id,
        })
    }
}
