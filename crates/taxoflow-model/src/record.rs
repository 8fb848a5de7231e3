//! Row to plain record conversion per collection

use serde::Serialize;
use taxoflow_core::PlainRecord;

use crate::collection::Collection;
use crate::entity::{
    FromRow, HierarchyEdge, Occupation, OccupationGroup, OccupationSkillRelation, Skill,
    SkillGroup, SkillSkillRelation,
};
use crate::error::RowError;
use crate::row::RawRow;

/// Serialize a typed entity into the record shape stored by the repository.
pub fn to_record<E: Serialize>(entity: &E) -> Result<PlainRecord, RowError> {
    match serde_json::to_value(entity) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(RowError::malformed(format!("entity is not a record: {other}"))),
        Err(e) => Err(RowError::malformed(e.to_string())),
    }
}

fn parse_as<E: FromRow + Serialize>(row: &RawRow) -> Result<PlainRecord, RowError> {
    to_record(&E::from_row(row)?)
}

/// Validate a row as an entity of `collection` and return its normalized record.
pub fn parse_record(collection: Collection, row: &RawRow) -> Result<PlainRecord, RowError> {
    match collection {
        Collection::Occupations => parse_as::<Occupation>(row),
        Collection::OccupationGroups => parse_as::<OccupationGroup>(row),
        Collection::Skills => parse_as::<Skill>(row),
        Collection::SkillGroups => parse_as::<SkillGroup>(row),
        Collection::Hierarchy => parse_as::<HierarchyEdge>(row),
        Collection::OccupationSkillRelations => parse_as::<OccupationSkillRelation>(row),
        Collection::SkillSkillRelations => parse_as::<SkillSkillRelation>(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_cover_collection_keys() {
        let row: RawRow = [
            ("ID", "s1"),
            ("PREFERREDLABEL", "use spreadsheets"),
            ("SKILLTYPE", "skill/competence"),
        ]
        .into_iter()
        .collect();
        let record = parse_record(Collection::Skills, &row).unwrap();
        for key in Collection::Skills.key_columns() {
            assert!(record.contains_key(*key));
        }
        assert_eq!(record["SKILLTYPE"], "skill/competence");
    }

    #[test]
    fn parsed_record_reparses() {
        let row: RawRow = [
            ("ID", "occ-9"),
            ("CODE", "1234.5"),
            ("PREFERREDLABEL", "baker"),
            ("ALTLABELS", "pastry cook\nbread maker"),
            ("OCCUPATIONTYPE", "esco"),
        ]
        .into_iter()
        .collect();
        let first = parse_record(Collection::Occupations, &row).unwrap();
        let again: RawRow =
            serde_json::from_value(serde_json::Value::Object(first.clone())).unwrap();
        let second = parse_record(Collection::Occupations, &again).unwrap();
        assert_eq!(first, second);
        assert_eq!(second["OCCUPATIONTYPE"], "escooccupation");
    }

    #[test]
    fn wrong_collection_rejects_row() {
        let row: RawRow = [("ID", "s1"), ("PREFERREDLABEL", "x")].into_iter().collect();
        assert!(parse_record(Collection::Hierarchy, &row).is_err());
    }
}
