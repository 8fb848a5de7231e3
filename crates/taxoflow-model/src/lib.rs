//! Taxoflow Model - taxonomy rows, classification and entities
//!
//! Raw tabular rows come in as [`RawRow`]s. The classifier maps a row's
//! discriminator column onto a closed [`ClassifiedEntityType`], and the
//! entity parsers turn a row into a validated record for one [`Collection`].

pub mod classify;
pub mod collection;
pub mod entity;
pub mod error;
pub mod record;
pub mod row;

// Re-exports
pub use classify::{
    ClassifiedEntityType, GROUP_TYPE_COLUMN, OBJECT_TYPE_COLUMN, OCCUPATION_TYPE_COLUMN,
    OccupationType, classify, classify_group_like, classify_occupation_like,
    occupation_type_from_row, occupation_type_in,
};
pub use collection::Collection;
pub use entity::FromRow;
pub use error::{RowError, RowErrorKind};
pub use record::{parse_record, to_record};
pub use row::RawRow;
