//! End-to-end runs against the in-memory repository

use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::Stream;
use taxoflow_core::{BatchOutcome, CancelToken, PipelineError, PlainRecord, ProgressContext};
use taxoflow_model::{Collection, RawRow};
use taxoflow_pipeline::{
    JsonlSink, PipelineConfig, RecordSink, compute_degree_centrality, export_records,
    import_rows, open_rows, rows_from_iter, track_job,
};
use taxoflow_store::{
    DEGREE_CENTRALITY_FIELD, JobKind, JobStatus, MemoryJobStore, MemoryRepository, Repository,
    SkillConnection, StoredDocument, WriteReport,
};
use tempfile::TempDir;

fn row(cells: &[(&str, &str)]) -> RawRow {
    cells.iter().copied().collect()
}

fn skill(id: &str) -> RawRow {
    let label = format!("skill {id}");
    row(&[("ID", id), ("PREFERREDLABEL", label.as_str())])
}

fn occupation_skill(occupation: &str, skill: &str) -> RawRow {
    row(&[
        ("OCCUPATIONTYPE", "escooccupation"),
        ("OCCUPATIONID", occupation),
        ("RELATIONTYPE", "essential"),
        ("SKILLID", skill),
    ])
}

fn skill_skill(requiring: &str, required: &str) -> RawRow {
    row(&[
        ("REQUIRINGID", requiring),
        ("RELATIONTYPE", "optional"),
        ("REQUIREDID", required),
    ])
}

fn config(batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        centrality_batch_size: batch_size,
        ..PipelineConfig::default()
    }
}

/// Delegates to a memory repository but fails the Nth insert or update call.
#[derive(Default)]
struct FailingRepository {
    inner: MemoryRepository,
    fail_insert_on: Option<usize>,
    fail_update_on: Option<usize>,
    inserts: AtomicUsize,
    updates: AtomicUsize,
}

impl FailingRepository {
    fn failing_insert(call: usize) -> Self {
        Self {
            fail_insert_on: Some(call),
            ..Self::default()
        }
    }

    fn failing_update(call: usize) -> Self {
        Self {
            fail_update_on: Some(call),
            ..Self::default()
        }
    }
}

/// Collects records in memory but fails the Nth write.
struct FailingSink {
    fail_on_call: usize,
    calls: usize,
    records: Vec<PlainRecord>,
}

impl RecordSink for FailingSink {
    fn write_batch(&mut self, records: Vec<PlainRecord>) -> Result<BatchOutcome, PipelineError> {
        self.calls += 1;
        if self.calls == self.fail_on_call {
            return Err(std::io::Error::other("disk full").into());
        }
        self.records.write_batch(records)
    }
}

impl Repository for FailingRepository {
    type Doc = StoredDocument;

    async fn insert_batch(
        &self,
        model_id: &str,
        collection: Collection,
        records: Vec<PlainRecord>,
    ) -> Result<WriteReport, PipelineError> {
        let call = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_insert_on == Some(call) {
            return Err(PipelineError::repository("insert", "connection reset"));
        }
        self.inner.insert_batch(model_id, collection, records).await
    }

    fn find_all(
        &self,
        model_id: &str,
        collection: Collection,
    ) -> impl Stream<Item = Result<StoredDocument, PipelineError>> {
        self.inner.find_all(model_id, collection)
    }

    fn group_by_skill_id(
        &self,
        model_id: &str,
    ) -> impl Stream<Item = Result<SkillConnection, PipelineError>> {
        self.inner.group_by_skill_id(model_id)
    }

    async fn update_degree_centrality(
        &self,
        model_id: &str,
        items: &[SkillConnection],
    ) -> Result<WriteReport, PipelineError> {
        let call = self.updates.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_update_on == Some(call) {
            return Err(PipelineError::repository("update", "write conflict"));
        }
        self.inner.update_degree_centrality(model_id, items).await
    }
}

#[tokio::test]
async fn import_counts_rejected_rows() {
    let repo = MemoryRepository::new();
    let rows = vec![
        skill("s1"),
        skill("s2"),
        row(&[("PREFERREDLABEL", "no id")]),
        skill("s1"),
        skill("s3"),
    ];

    let summary = import_rows(
        rows_from_iter(rows),
        Collection::Skills,
        &repo,
        "m1",
        &config(2),
        &CancelToken::new(),
        &ProgressContext::hidden(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stats.rows_processed, 5);
    assert_eq!(summary.stats.rows_success, 3);
    assert_eq!(summary.stats.rows_failed, 2);
    assert_eq!(summary.objects_seen, 5);
    // four valid records in batches of two
    assert_eq!(summary.batches, 2);
    assert_eq!(repo.count("m1", Collection::Skills), 3);
}

#[tokio::test]
async fn import_failure_keeps_earlier_batches() {
    let repo = FailingRepository::failing_insert(2);
    let rows = (1..=5).map(|i| skill(&format!("s{i}")));

    let failure = import_rows(
        rows_from_iter(rows),
        Collection::Skills,
        &repo,
        "m1",
        &config(2),
        &CancelToken::new(),
        &ProgressContext::hidden(),
    )
    .await
    .unwrap_err();

    assert!(matches!(failure.error, PipelineError::Repository { .. }));
    assert_eq!(failure.partial.rows_processed, 2);
    assert_eq!(failure.partial.rows_success, 2);
    // no third batch after the failure
    assert_eq!(repo.inserts.load(Ordering::Relaxed), 2);
    assert_eq!(repo.inner.count("m1", Collection::Skills), 2);
}

#[tokio::test]
async fn cancelled_import_stops_before_first_batch() {
    let repo = MemoryRepository::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let failure = import_rows(
        rows_from_iter([skill("s1")]),
        Collection::Skills,
        &repo,
        "m1",
        &config(1),
        &cancel,
        &ProgressContext::hidden(),
    )
    .await
    .unwrap_err();

    assert!(failure.is_cancelled());
    assert_eq!(failure.partial.rows_processed, 0);
    assert_eq!(repo.count("m1", Collection::Skills), 0);
}

#[tokio::test]
async fn cancelled_import_drops_buffered_rows() {
    let repo = MemoryRepository::new();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    // cancelled while the fourth row is produced; row three is still buffered
    let rows = (1..=5).map(move |i| {
        if i == 4 {
            trigger.cancel();
        }
        skill(&format!("s{i}"))
    });

    let failure = import_rows(
        rows_from_iter(rows),
        Collection::Skills,
        &repo,
        "m1",
        &config(2),
        &cancel,
        &ProgressContext::hidden(),
    )
    .await
    .unwrap_err();

    assert!(failure.is_cancelled());
    assert_eq!(failure.partial.rows_processed, 2);
    assert_eq!(repo.count("m1", Collection::Skills), 2);
    assert!(repo.get("m1", Collection::Skills, "s3").is_none());
}

#[tokio::test]
async fn import_empty_source() {
    let repo = MemoryRepository::new();
    let summary = import_rows(
        rows_from_iter(Vec::new()),
        Collection::Skills,
        &repo,
        "m1",
        &config(1),
        &CancelToken::new(),
        &ProgressContext::hidden(),
    )
    .await
    .unwrap();
    assert_eq!(summary.stats.rows_processed, 0);
    assert_eq!(summary.batches, 0);
}

#[tokio::test]
async fn import_from_jsonl_with_malformed_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("skills.jsonl");
    std::fs::write(
        &path,
        "{\"ID\": \"s1\", \"PREFERREDLABEL\": \"weld\"}\n{broken\n{\"ID\": \"s2\", \"PREFERREDLABEL\": \"cut\"}\n",
    )
    .unwrap();

    let repo = MemoryRepository::new();
    let summary = import_rows(
        open_rows(&path).unwrap().into_stream(),
        Collection::Skills,
        &repo,
        "m1",
        &PipelineConfig::default(),
        &CancelToken::new(),
        &ProgressContext::hidden(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stats.rows_processed, 3);
    assert_eq!(summary.stats.rows_success, 2);
    assert_eq!(summary.stats.rows_failed, 1);
}

#[tokio::test]
async fn import_from_jsonl_with_invalid_utf8_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("skills.jsonl");
    let mut bytes = b"{\"ID\": \"s1\", \"PREFERREDLABEL\": \"weld\"}\n".to_vec();
    bytes.extend_from_slice(b"{\"ID\": \"s2\", \"PREFERREDLABEL\": \"");
    bytes.extend_from_slice(&[0xff, 0xfe]);
    bytes.extend_from_slice(b"\"}\n{\"ID\": \"s3\", \"PREFERREDLABEL\": \"cut\"}\n");
    std::fs::write(&path, bytes).unwrap();

    let repo = MemoryRepository::new();
    let summary = import_rows(
        open_rows(&path).unwrap().into_stream(),
        Collection::Skills,
        &repo,
        "m1",
        &PipelineConfig::default(),
        &CancelToken::new(),
        &ProgressContext::hidden(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stats.rows_processed, 3);
    assert_eq!(summary.stats.rows_success, 2);
    assert_eq!(summary.stats.rows_failed, 1);
    assert!(repo.get("m1", Collection::Skills, "s1").is_some());
    assert!(repo.get("m1", Collection::Skills, "s3").is_some());
}

#[tokio::test]
async fn export_then_reimport() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export").join("skills.jsonl");
    let repo = MemoryRepository::new();
    let progress = ProgressContext::hidden();
    let cancel = CancelToken::new();

    let mut alt = skill("s2");
    alt.insert("ALTLABELS", "cutting\nslicing");
    import_rows(
        rows_from_iter([skill("s1"), alt, skill("s3")]),
        Collection::Skills,
        &repo,
        "m1",
        &config(2),
        &cancel,
        &progress,
    )
    .await
    .unwrap();

    let mut sink = JsonlSink::create(&path).unwrap();
    let summary = export_records(
        &repo,
        Collection::Skills,
        "m1",
        &mut sink,
        &config(2),
        &cancel,
        &progress,
    )
    .await
    .unwrap();
    assert_eq!(summary.stats.rows_success, 3);
    assert_eq!(summary.objects_seen, 3);
    assert_eq!(summary.batches, 2);
    assert_eq!(sink.finish().unwrap(), 3);

    let summary = import_rows(
        open_rows(&path).unwrap().into_stream(),
        Collection::Skills,
        &repo,
        "m2",
        &config(2),
        &cancel,
        &progress,
    )
    .await
    .unwrap();
    assert_eq!(summary.stats.rows_success, 3);
    assert_eq!(
        repo.get("m1", Collection::Skills, "s2"),
        repo.get("m2", Collection::Skills, "s2")
    );
}

#[tokio::test]
async fn export_into_memory_sink() {
    let repo = MemoryRepository::new();
    let progress = ProgressContext::hidden();
    let cancel = CancelToken::new();
    import_rows(
        rows_from_iter([skill("s1")]),
        Collection::Skills,
        &repo,
        "m1",
        &config(10),
        &cancel,
        &progress,
    )
    .await
    .unwrap();

    let mut records: Vec<PlainRecord> = Vec::new();
    let summary = export_records(
        &repo,
        Collection::Skills,
        "m1",
        &mut records,
        &config(10),
        &cancel,
        &progress,
    )
    .await
    .unwrap();
    assert_eq!(summary.stats.rows_processed, 1);
    assert_eq!(records[0]["ID"], "s1");
    assert!(!records[0].contains_key("doc_id"));
}

#[tokio::test]
async fn export_sink_failure_ends_run() {
    let repo = MemoryRepository::new();
    let progress = ProgressContext::hidden();
    let cancel = CancelToken::new();
    import_rows(
        rows_from_iter((1..=5).map(|i| skill(&format!("s{i}")))),
        Collection::Skills,
        &repo,
        "m1",
        &config(10),
        &cancel,
        &progress,
    )
    .await
    .unwrap();

    let mut sink = FailingSink {
        fail_on_call: 2,
        calls: 0,
        records: Vec::new(),
    };
    let failure = export_records(
        &repo,
        Collection::Skills,
        "m1",
        &mut sink,
        &config(2),
        &cancel,
        &progress,
    )
    .await
    .unwrap_err();

    assert!(matches!(failure.error, PipelineError::Io(_)));
    assert_eq!(failure.partial.rows_processed, 2);
    assert_eq!(failure.partial.rows_success, 2);
    assert_eq!(sink.calls, 2);
    assert_eq!(sink.records.len(), 2);
}

#[tokio::test]
async fn centrality_update_failure_ends_run() {
    let repo = FailingRepository::failing_update(2);
    let progress = ProgressContext::hidden();
    let cancel = CancelToken::new();
    let cfg = config(2);

    let skills: Vec<_> = (1..=5).map(|i| skill(&format!("s{i}"))).collect();
    let relations: Vec<_> = (1..=5)
        .map(|i| occupation_skill("o1", &format!("s{i}")))
        .collect();
    for (collection, rows) in [
        (Collection::Skills, skills),
        (Collection::OccupationSkillRelations, relations),
    ] {
        import_rows(
            rows_from_iter(rows),
            collection,
            &repo,
            "m1",
            &cfg,
            &cancel,
            &progress,
        )
        .await
        .unwrap();
    }

    let failure = compute_degree_centrality(&repo, "m1", &cfg, &cancel, &progress)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, PipelineError::Repository { .. }));
    assert_eq!(failure.partial.rows_processed, 2);
    assert_eq!(failure.partial.rows_success, 2);
    // no third update after the failure
    assert_eq!(repo.updates.load(Ordering::Relaxed), 2);
    let centrality = |id: &str| {
        repo.inner
            .get("m1", Collection::Skills, id)
            .and_then(|r| r.get(DEGREE_CENTRALITY_FIELD).cloned())
    };
    assert_eq!(centrality("s1"), Some(1.into()));
    assert_eq!(centrality("s3"), None);
}

#[tokio::test]
async fn centrality_counts_relations_per_skill() {
    let repo = MemoryRepository::new();
    let progress = ProgressContext::hidden();
    let cancel = CancelToken::new();
    let cfg = config(2);

    for (collection, rows) in [
        (Collection::Skills, vec![skill("s1"), skill("s2"), skill("s3")]),
        (
            Collection::OccupationSkillRelations,
            vec![
                occupation_skill("o1", "s1"),
                occupation_skill("o2", "s1"),
                occupation_skill("o1", "s2"),
                occupation_skill("o1", "ghost"),
            ],
        ),
        (Collection::SkillSkillRelations, vec![skill_skill("s2", "s1")]),
    ] {
        import_rows(
            rows_from_iter(rows),
            collection,
            &repo,
            "m1",
            &cfg,
            &cancel,
            &progress,
        )
        .await
        .unwrap();
    }

    let summary = compute_degree_centrality(&repo, "m1", &cfg, &cancel, &progress)
        .await
        .unwrap();

    // ghost, s1 and s2 are referenced; ghost is not a stored skill
    assert_eq!(summary.stats.rows_processed, 3);
    assert_eq!(summary.stats.rows_success, 2);
    assert_eq!(summary.stats.rows_failed, 1);
    assert_eq!(summary.batches, 2);

    let centrality = |id: &str| {
        repo.get("m1", Collection::Skills, id)
            .and_then(|r| r.get(DEGREE_CENTRALITY_FIELD).cloned())
    };
    assert_eq!(centrality("s1"), Some(3.into()));
    assert_eq!(centrality("s2"), Some(2.into()));
    assert_eq!(centrality("s3"), None);
}

#[tokio::test]
async fn tracked_jobs_record_outcome() {
    let jobs = MemoryJobStore::new();
    let progress = ProgressContext::hidden();
    let cancel = CancelToken::new();

    let cfg = config(5);

    let repo = MemoryRepository::new();
    let run = import_rows(
        rows_from_iter([skill("s1"), row(&[("ID", "s2")])]),
        Collection::Skills,
        &repo,
        "m1",
        &cfg,
        &cancel,
        &progress,
    );
    track_job(&jobs, "import-ok", JobKind::Import, run)
        .await
        .unwrap();

    let record = jobs.get("import-ok").unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    let result = record.result.unwrap();
    assert!(!result.errored);
    assert!(result.errors);
    assert_eq!(result.stats.unwrap().rows_failed, 1);

    let failing = FailingRepository::failing_insert(1);
    let run = import_rows(
        rows_from_iter([skill("s1")]),
        Collection::Skills,
        &failing,
        "m1",
        &cfg,
        &cancel,
        &progress,
    );
    let failure = track_job(&jobs, "import-bad", JobKind::Import, run)
        .await
        .unwrap_err();
    assert!(!failure.is_cancelled());

    let record = jobs.get("import-bad").unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    let result = record.result.unwrap();
    assert!(result.errored);
    assert!(result.message.unwrap().contains("connection reset"));

    let statuses: Vec<JobStatus> = jobs
        .history()
        .into_iter()
        .filter(|(id, _)| id == "import-bad")
        .map(|(_, u)| u.status)
        .collect();
    assert_eq!(statuses, vec![JobStatus::Running, JobStatus::Failed]);
}
