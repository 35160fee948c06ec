use serde_json::json;
use siem_rag_core::alert::{AlertAck, AlertPayload, AlertSink};
use siem_rag_core::embed::{EmbeddingClient, HashingEmbedder};
use siem_rag_core::error::{CoreError, CoreResult};
use siem_rag_core::pipeline::BruteForcePipeline;
use siem_rag_core::retry::{RetryPolicy, Sleeper};
use siem_rag_core::vector::{CollectionSchema, InMemoryVectorStore, ScalarFilter, ScalarValue, VectorStore};
use siem_rag_core::warehouse::login::FAILED_LOGIN_AGGREGATE_SQL;
use siem_rag_core::warehouse::{BoundQuery, LoginAnalyzer, LoginRules, Row, SqlWarehouse};
use std::cell::{Cell, RefCell};
use std::time::Duration;
use time::macros::datetime;

const DIM: usize = 32;

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _d: Duration) {}
}

fn row(v: serde_json::Value) -> Row {
    v.as_object().cloned().unwrap()
}

struct ScriptedWarehouse {
    aggregates: Vec<Row>,
    successes: Vec<Row>,
}

impl SqlWarehouse for ScriptedWarehouse {
    fn query(&self, q: &BoundQuery) -> CoreResult<Vec<Row>> {
        if q.sql == FAILED_LOGIN_AGGREGATE_SQL {
            Ok(self.aggregates.clone())
        } else {
            Ok(self.successes.clone())
        }
    }
}

fn one_incident() -> ScriptedWarehouse {
    ScriptedWarehouse {
        aggregates: vec![row(json!({
            "ip": "198.51.100.4", "tenant_id": "acme", "failed_count": "12",
            "first_seen": "2025-10-18 11:58:00", "last_seen": "2025-10-18 12:02:00"
        }))],
        successes: vec![row(json!({
            "tenant_id": "acme", "user_id": "alice", "ip": "198.51.100.4",
            "event_time": "2025-10-18 12:03:00", "event_type": "success"
        }))],
    }
}

struct ScriptedSink {
    failures: u32,
    status: u16,
    sent: RefCell<Vec<AlertPayload>>,
    calls: Cell<u32>,
}

impl ScriptedSink {
    fn new(failures: u32, status: u16) -> Self {
        Self {
            failures,
            status,
            sent: RefCell::new(Vec::new()),
            calls: Cell::new(0),
        }
    }
}

impl AlertSink for ScriptedSink {
    fn send(&self, payload: &AlertPayload) -> CoreResult<AlertAck> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n <= self.failures {
            return Err(CoreError::Remote {
                service: "alert",
                status: Some(self.status),
                message: "nope".to_string(),
            });
        }
        self.sent.borrow_mut().push(payload.clone());
        Ok(AlertAck(json!({"ticket": "SOC-1"})))
    }
}

fn store() -> InMemoryVectorStore {
    InMemoryVectorStore::new(CollectionSchema::login_incidents("siem_incidents", DIM))
}

#[test]
fn incident_is_alerted_stored_and_reported() {
    let sink = ScriptedSink::new(1, 502);
    let mut p = BruteForcePipeline::new(
        LoginAnalyzer::new(one_incident(), LoginRules::default()),
        &sink,
        EmbeddingClient::new(HashingEmbedder::new(DIM), DIM),
        store(),
    )
    .with_retry(RetryPolicy::default(), Box::new(NoSleep));

    let out = p.run(datetime!(2025-10-18 12:05:00 UTC)).unwrap();
    assert_eq!(out.stored, 1);
    assert_eq!(out.incidents.len(), 1);
    assert!(out.incidents[0].alert.is_ok());
    assert_eq!(sink.calls.get(), 2);

    let sent = sink.sent.borrow();
    assert_eq!(sent[0].title, "Potential account compromise - brute force followed by success");
    assert_eq!(sent[0].failed_count, 12);
    assert_eq!(sent[0].evidence.len(), 1);

    assert!(out.report.starts_with(
        "# SIEM Incident Report\n\n## Incident 1: IP 198.51.100.4\n- Tenant: acme\n- Failed attempts: 12\n"
    ));
    assert!(out.report.contains("  - 2025-10-18 12:03:00 user=alice event=success\n"));
    assert!(out.report.contains("- Alert API response: {\"ticket\":\"SOC-1\"}"));
    assert!(out.report.ends_with("1 incidents stored in the vector store."));

    let stored = p
        .store()
        .query_by_filter(&ScalarFilter::incidents(Some("198.51.100.4"), Some("acme")), 10)
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].fields["failed_count"], ScalarValue::Int(12));
}

#[test]
fn failed_alert_is_reported_and_storage_continues() {
    let sink = ScriptedSink::new(u32::MAX, 401);
    let mut p = BruteForcePipeline::new(
        LoginAnalyzer::new(one_incident(), LoginRules::default()),
        &sink,
        EmbeddingClient::new(HashingEmbedder::new(DIM), DIM),
        store(),
    )
    .with_retry(RetryPolicy::default(), Box::new(NoSleep));

    let out = p.run(datetime!(2025-10-18 12:05:00 UTC)).unwrap();
    assert_eq!(sink.calls.get(), 1);
    assert!(out.incidents[0].alert.is_err());
    assert!(out.report.contains("- Alert API response: failed ("));
    assert_eq!(out.stored, 1);
    assert_eq!(p.store().num_entities().unwrap(), 1);
}

#[test]
fn quiet_window_renders_the_empty_report() {
    let sink = ScriptedSink::new(0, 500);
    let mut p = BruteForcePipeline::new(
        LoginAnalyzer::new(
            ScriptedWarehouse {
                aggregates: Vec::new(),
                successes: Vec::new(),
            },
            LoginRules::default(),
        ),
        &sink,
        EmbeddingClient::new(HashingEmbedder::new(DIM), DIM),
        store(),
    );
    let out = p.run(datetime!(2025-10-18 12:05:00 UTC)).unwrap();
    assert_eq!(out.report, "# SIEM Report\n\nNo incidents detected.");
    assert_eq!(out.stored, 0);
    assert_eq!(sink.calls.get(), 0);
}
