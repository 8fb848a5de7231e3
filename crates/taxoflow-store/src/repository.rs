//! Collaborator contracts consumed by the pipelines

use std::future::Future;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use taxoflow_core::{Document, PipelineError, PlainRecord};
use taxoflow_model::Collection;

/// Record field holding a skill's stored degree centrality.
pub const DEGREE_CENTRALITY_FIELD: &str = "DEGREECENTRALITY";

/// Number of relations touching one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillConnection {
    pub skill_id: String,
    pub relation_count: usize,
}

/// What a bulk write reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteReport {
    pub modified_count: usize,
}

/// Document storage for taxonomy models.
///
/// Whole-call failures come back as `Err`; individually rejected records only
/// lower `modified_count`.
pub trait Repository {
    type Doc: Document;

    /// Insert records into a model's collection, rejecting duplicate keys.
    fn insert_batch(
        &self,
        model_id: &str,
        collection: Collection,
        records: Vec<PlainRecord>,
    ) -> impl Future<Output = Result<WriteReport, PipelineError>>;

    /// All documents of a collection, in insertion order.
    fn find_all(
        &self,
        model_id: &str,
        collection: Collection,
    ) -> impl Stream<Item = Result<Self::Doc, PipelineError>>;

    /// Relation counts per skill, ordered by skill id.
    fn group_by_skill_id(
        &self,
        model_id: &str,
    ) -> impl Stream<Item = Result<SkillConnection, PipelineError>>;

    /// Bulk-update the stored degree centrality of the given skills.
    fn update_degree_centrality(
        &self,
        model_id: &str,
        items: &[SkillConnection],
    ) -> impl Future<Output = Result<WriteReport, PipelineError>>;
}
