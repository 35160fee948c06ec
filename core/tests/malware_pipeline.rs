use siem_rag_core::embed::{EmbeddingClient, HashingEmbedder};
use siem_rag_core::error::{CoreError, CoreResult};
use siem_rag_core::llm::{LlmClient, MockLlm};
use siem_rag_core::pipeline::{MalwarePipeline, PipelineStage, NO_MALWARE_EVENTS_MESSAGE};
use siem_rag_core::report::CorrelationReporter;
use siem_rag_core::vector::{
    CollectionPolicy, CollectionSchema, InMemoryVectorStore, ScalarFilter, SearchHit, StoredEntity,
    VectorRecord, VectorStore,
};
use std::cell::Cell;

const DIM: usize = 48;

const LOGS: &str = "
2025-10-19 14:23:11 WARNING: Suspicious powershell execution detected on host WIN-SRV-01
2025-10-19 14:23:45 ALERT: C2 beacon communication to 192.168.1.100:443 blocked
2025-10-19 14:24:12 CRITICAL: Ransomware encryption activity detected in C:\\Users\\Documents
2025-10-19 14:25:33 INFO: User login successful from 10.0.0.5
2025-10-19 14:26:01 WARNING: Mimikatz credential dumping attempt on DC-01
";

/// In-memory store that records which operations ran and can fail inserts.
struct RecordingStore {
    inner: InMemoryVectorStore,
    ops: Vec<&'static str>,
    fail_insert: bool,
}

impl RecordingStore {
    fn new(fail_insert: bool) -> Self {
        Self {
            inner: InMemoryVectorStore::new(CollectionSchema::malware_incidents("malware_incidents", DIM)),
            ops: Vec::new(),
            fail_insert,
        }
    }
}

impl VectorStore for RecordingStore {
    fn schema(&self) -> &CollectionSchema {
        self.inner.schema()
    }

    fn ensure_collection(&mut self, policy: CollectionPolicy) -> CoreResult<()> {
        self.ops.push("ensure");
        self.inner.ensure_collection(policy)
    }

    fn insert(&mut self, records: &[VectorRecord]) -> CoreResult<usize> {
        self.ops.push("insert");
        if self.fail_insert {
            return Err(CoreError::Transport("milvus unreachable".to_string()));
        }
        self.inner.insert(records)
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.ops.push("flush");
        self.inner.flush()
    }

    fn load(&mut self) -> CoreResult<()> {
        self.ops.push("load");
        self.inner.load()
    }

    fn search(&self, vector: &[f32], top_k: usize) -> CoreResult<Vec<SearchHit>> {
        self.inner.search(vector, top_k)
    }

    fn query_by_filter(&self, filter: &ScalarFilter, limit: usize) -> CoreResult<Vec<StoredEntity>> {
        self.inner.query_by_filter(filter, limit)
    }

    fn num_entities(&self) -> CoreResult<u64> {
        self.inner.num_entities()
    }
}

#[derive(Default)]
struct CountingLlm {
    calls: Cell<u32>,
    fail: bool,
}

impl LlmClient for CountingLlm {
    fn name(&self) -> &str {
        "counting"
    }

    fn generate(&self, prompt: &str) -> CoreResult<String> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(CoreError::Llm("quota exceeded".to_string()));
        }
        Ok(format!("analysis of {} chars", prompt.chars().count()))
    }
}

fn pipeline<L: LlmClient>(llm: L, fail_insert: bool) -> MalwarePipeline<HashingEmbedder, RecordingStore, L> {
    MalwarePipeline::new(
        EmbeddingClient::new(HashingEmbedder::new(DIM), DIM),
        RecordingStore::new(fail_insert),
        CorrelationReporter::new(llm),
    )
}

#[test]
fn zero_events_short_circuits_every_downstream_stage() {
    let llm = CountingLlm::default();
    let mut p = pipeline(&llm, false);
    let out = p.run("INFO: heartbeat\n\nINFO: user login ok\n", None).unwrap();
    assert_eq!(out.report, NO_MALWARE_EVENTS_MESSAGE);
    assert_eq!(out.report, "No malware events detected in logs.");
    assert_eq!(
        out.stages,
        vec![PipelineStage::Idle, PipelineStage::Extracted, PipelineStage::Done]
    );
    assert!(out.events.is_empty());
    assert!(p.store().ops.is_empty());
    assert_eq!(llm.calls.get(), 0);
}

#[test]
fn full_run_stores_retrieves_and_correlates() {
    let llm = CountingLlm::default();
    let mut p = pipeline(&llm, false).with_top_k(3);
    let out = p.run(LOGS, None).unwrap();

    assert_eq!(out.events.len(), 4);
    assert_eq!(out.stored, 4);
    assert_eq!(
        out.stages,
        vec![
            PipelineStage::Idle,
            PipelineStage::Extracted,
            PipelineStage::Stored,
            PipelineStage::Retrieved,
            PipelineStage::Correlated,
            PipelineStage::Done,
        ]
    );
    // The query defaults to the first event's summary, which is stored itself.
    assert_eq!(out.query.as_deref(), Some(out.events[0].summary.as_str()));
    assert_eq!(out.neighbors.len(), 3);
    assert_eq!(out.neighbors[0].incident_id, out.events[0].incident_id);
    assert_eq!(llm.calls.get(), 1);
    assert!(out.report.starts_with("analysis of "));
    assert_eq!(p.store().ops, vec!["ensure", "insert", "flush", "load"]);
}

#[test]
fn explicit_query_is_used_for_retrieval() {
    let mut p = pipeline(MockLlm, false);
    let q = "2025-10-19 14:24:12 CRITICAL: Ransomware encryption activity detected in C:\\Users\\Documents";
    let out = p.run(LOGS, Some(q)).unwrap();
    assert_eq!(out.neighbors[0].label(), "ransomware");
    assert!(out.report.starts_with("[MockLLM] Correlation summary for prompt:\n"));
    assert!(out.report.contains(&format!("NEW EVENT: {}", q)));
}

#[test]
fn llm_failure_still_produces_a_report() {
    let llm = CountingLlm {
        fail: true,
        ..CountingLlm::default()
    };
    let mut p = pipeline(&llm, false);
    let out = p.run(LOGS, None).unwrap();
    assert!(out
        .report
        .starts_with("[LLM Error: llm failure: quota exceeded]\n\nFallback Analysis:\nIncident 1 (Score: 1.0000):"));
    assert_eq!(out.stages.last(), Some(&PipelineStage::Done));
}

#[test]
fn store_failure_propagates_and_skips_correlation() {
    let llm = CountingLlm::default();
    let mut p = pipeline(&llm, true);
    let err = p.run(LOGS, None).unwrap_err();
    assert!(matches!(err, CoreError::Transport(_)));
    assert_eq!(llm.calls.get(), 0);
    assert_eq!(p.store().ops, vec!["ensure", "insert"]);
}

#[test]
fn wide_schema_keeps_longer_raw_text() {
    let line = format!("CRITICAL: ransomware note {}", "é".repeat(3000));
    let mut p = MalwarePipeline::new(
        EmbeddingClient::new(HashingEmbedder::new(DIM), DIM),
        InMemoryVectorStore::new(CollectionSchema::malware_incidents_wide("soc_incidents", DIM)),
        CorrelationReporter::new(MockLlm),
    );
    let out = p.run(&line, None).unwrap();
    assert_eq!(out.stored, 1);
    assert_eq!(out.events[0].raw, line);
    assert!(out.events[0].summary.len() <= 2048);
    assert_eq!(out.neighbors[0].raw(), line);
}
