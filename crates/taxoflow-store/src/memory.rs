//! In-memory document repository with JSON snapshots.
//!
//! Documents keep their bookkeeping (`doc_id`, `version`, `model_id`) next
//! to the record; [`Document::materialize`] hands out only the record.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use futures_util::{Stream, stream};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use taxoflow_core::{Document, PipelineError, PlainRecord};
use taxoflow_model::Collection;

use crate::atomic::write_atomic;
use crate::repository::{DEGREE_CENTRALITY_FIELD, Repository, SkillConnection, WriteReport};

/// Separator between key column values in the duplicate index
const KEY_SEPARATOR: char = '\u{1f}';

/// A record as held by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub doc_id: u64,
    pub model_id: String,
    pub version: u32,
    pub record: PlainRecord,
}

impl Document for StoredDocument {
    fn materialize(&self) -> Result<PlainRecord, PipelineError> {
        Ok(self.record.clone())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ModelData {
    collections: BTreeMap<Collection, Vec<StoredDocument>>,
    /// (collection, key) → position in `collections`; rebuilt on load
    #[serde(skip)]
    index: FxHashMap<(Collection, String), usize>,
}

impl ModelData {
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (&collection, docs) in &self.collections {
            for (pos, doc) in docs.iter().enumerate() {
                if let Some(key) = record_key(collection, &doc.record) {
                    self.index.insert((collection, key), pos);
                }
            }
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_doc_id: u64,
    models: BTreeMap<String, ModelData>,
}

/// Identity of a record inside its collection, `None` if a key column is blank.
fn record_key(collection: Collection, record: &PlainRecord) -> Option<String> {
    let mut key = String::new();
    for (i, column) in collection.key_columns().iter().enumerate() {
        let part = match record.get(*column)? {
            serde_json::Value::String(s) if !s.is_empty() => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(&part);
    }
    Some(key)
}

fn str_field<'a>(record: &'a PlainRecord, column: &str) -> Option<&'a str> {
    record.get(column).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// Thread-safe in-memory repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<Snapshot>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a snapshot written by [`save`](Self::save). A missing file is an empty repository.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No repository snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut snapshot: Snapshot = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        for model in snapshot.models.values_mut() {
            model.rebuild_index();
        }
        log::info!(
            "Loaded repository snapshot from {} ({} models)",
            path.display(),
            snapshot.models.len()
        );
        Ok(Self {
            state: Mutex::new(snapshot),
        })
    }

    /// Write the whole repository to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = {
            let state = self.lock();
            serde_json::to_vec(&*state).context("failed to serialize repository")?
        };
        write_atomic(path, &json).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Number of documents in a model's collection.
    pub fn count(&self, model_id: &str, collection: Collection) -> usize {
        self.lock()
            .models
            .get(model_id)
            .and_then(|m| m.collections.get(&collection))
            .map_or(0, Vec::len)
    }

    /// Look up one record by its single-column key (e.g. a skill ID).
    pub fn get(&self, model_id: &str, collection: Collection, key: &str) -> Option<PlainRecord> {
        let state = self.lock();
        let model = state.models.get(model_id)?;
        let pos = *model.index.get(&(collection, key.to_string()))?;
        model
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(pos))
            .map(|doc| doc.record.clone())
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.lock().models.keys().cloned().collect()
    }
}

impl Repository for MemoryRepository {
    type Doc = StoredDocument;

    async fn insert_batch(
        &self,
        model_id: &str,
        collection: Collection,
        records: Vec<PlainRecord>,
    ) -> Result<WriteReport, PipelineError> {
        let mut state = self.lock();
        let Snapshot {
            next_doc_id,
            models,
        } = &mut *state;
        let model = models.entry(model_id.to_string()).or_default();
        let docs = model.collections.entry(collection).or_default();

        let mut modified_count = 0;
        for record in records {
            let Some(key) = record_key(collection, &record) else {
                log::debug!("{model_id}/{collection}: record without key rejected");
                continue;
            };
            if model.index.contains_key(&(collection, key.clone())) {
                log::debug!("{model_id}/{collection}: duplicate key {key:?} rejected");
                continue;
            }
            model.index.insert((collection, key), docs.len());
            docs.push(StoredDocument {
                doc_id: *next_doc_id,
                model_id: model_id.to_string(),
                version: 0,
                record,
            });
            *next_doc_id += 1;
            modified_count += 1;
        }
        Ok(WriteReport { modified_count })
    }

    fn find_all(
        &self,
        model_id: &str,
        collection: Collection,
    ) -> impl Stream<Item = Result<StoredDocument, PipelineError>> {
        let docs = self
            .lock()
            .models
            .get(model_id)
            .and_then(|m| m.collections.get(&collection))
            .cloned()
            .unwrap_or_default();
        stream::iter(docs.into_iter().map(Ok))
    }

    fn group_by_skill_id(
        &self,
        model_id: &str,
    ) -> impl Stream<Item = Result<SkillConnection, PipelineError>> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        {
            let state = self.lock();
            if let Some(model) = state.models.get(model_id) {
                let relations = [
                    (Collection::OccupationSkillRelations, &["SKILLID"][..]),
                    (Collection::SkillSkillRelations, &["REQUIRINGID", "REQUIREDID"][..]),
                ];
                for (collection, columns) in relations {
                    for doc in model.collections.get(&collection).into_iter().flatten() {
                        for column in columns {
                            if let Some(skill_id) = str_field(&doc.record, column) {
                                *counts.entry(skill_id.to_string()).or_default() += 1;
                            }
                        }
                    }
                }
            }
        }
        stream::iter(counts.into_iter().map(|(skill_id, relation_count)| {
            Ok(SkillConnection {
                skill_id,
                relation_count,
            })
        }))
    }

    async fn update_degree_centrality(
        &self,
        model_id: &str,
        items: &[SkillConnection],
    ) -> Result<WriteReport, PipelineError> {
        let mut state = self.lock();
        let Some(model) = state.models.get_mut(model_id) else {
            return Ok(WriteReport::default());
        };
        let Some(skills) = model.collections.get_mut(&Collection::Skills) else {
            return Ok(WriteReport::default());
        };

        let mut modified_count = 0;
        for item in items {
            let Some(&pos) = model.index.get(&(Collection::Skills, item.skill_id.clone())) else {
                log::debug!("{model_id}: skill {} not found", item.skill_id);
                continue;
            };
            let doc = &mut skills[pos];
            doc.record.insert(
                DEGREE_CENTRALITY_FIELD.to_string(),
                serde_json::Value::from(item.relation_count),
            );
            doc.version += 1;
            modified_count += 1;
        }
        Ok(WriteReport { modified_count })
    }
}
