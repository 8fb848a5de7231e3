//! Taxonomy collections: what a file holds and what the repository stores

use serde::{Deserialize, Serialize};

/// One kind of taxonomy record, stored side by side per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Occupations,
    OccupationGroups,
    Skills,
    SkillGroups,
    Hierarchy,
    OccupationSkillRelations,
    SkillSkillRelations,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Self::Occupations,
        Self::OccupationGroups,
        Self::Skills,
        Self::SkillGroups,
        Self::Hierarchy,
        Self::OccupationSkillRelations,
        Self::SkillSkillRelations,
    ];

    /// Parse CLI/config string into enum
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == s)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Occupations => "occupations",
            Self::OccupationGroups => "occupation_groups",
            Self::Skills => "skills",
            Self::SkillGroups => "skill_groups",
            Self::Hierarchy => "hierarchy",
            Self::OccupationSkillRelations => "occupation_skill_relations",
            Self::SkillSkillRelations => "skill_skill_relations",
        }
    }

    /// Columns that together identify a record; duplicates are rejected.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Self::Occupations | Self::OccupationGroups | Self::Skills | Self::SkillGroups => &["ID"],
            Self::Hierarchy => &["PARENTID", "CHILDID"],
            Self::OccupationSkillRelations => &["OCCUPATIONID", "SKILLID"],
            Self::SkillSkillRelations => &["REQUIRINGID", "REQUIREDID"],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_roundtrip() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_name(c.name()), Some(c));
        }
    }

    #[test]
    fn from_name_invalid() {
        assert_eq!(Collection::from_name("Skills"), None);
        assert_eq!(Collection::from_name(""), None);
    }

    #[test]
    fn serde_name_matches_name() {
        for c in Collection::ALL {
            assert_eq!(serde_json::to_string(&c).unwrap(), format!("\"{}\"", c.name()));
        }
    }

    #[test]
    fn every_collection_has_keys() {
        assert!(Collection::ALL.iter().all(|c| !c.key_columns().is_empty()));
    }
}
