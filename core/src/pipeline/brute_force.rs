//! SOC automation: failed-login bursts followed by a success become
//! incidents that are alerted on, stored for recall and reported.

use crate::alert::{send_with_retry, AlertPayload, AlertSink};
use crate::embed::{EmbeddingClient, TextEmbedder};
use crate::error::CoreResult;
use crate::report::{render_incident_report, StoredIncident};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::vector::{CollectionPolicy, VectorStore};
use crate::warehouse::{LoginAnalyzer, SqlWarehouse};
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct BruteForceOutcome {
    pub incidents: Vec<StoredIncident>,
    pub stored: usize,
    pub report: String,
}

pub struct BruteForcePipeline<W: SqlWarehouse, A: AlertSink, M: TextEmbedder, S: VectorStore> {
    analyzer: LoginAnalyzer<W>,
    alerts: A,
    embedder: EmbeddingClient<M>,
    store: S,
    policy: CollectionPolicy,
    retry: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl<W: SqlWarehouse, A: AlertSink, M: TextEmbedder, S: VectorStore> BruteForcePipeline<W, A, M, S> {
    pub fn new(analyzer: LoginAnalyzer<W>, alerts: A, embedder: EmbeddingClient<M>, store: S) -> Self {
        Self {
            analyzer,
            alerts,
            embedder,
            store,
            policy: CollectionPolicy::ReuseExisting,
            retry: RetryPolicy::default(),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn with_policy(mut self, policy: CollectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy, sleeper: Box<dyn Sleeper>) -> Self {
        self.retry = retry;
        self.sleeper = sleeper;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A failed alert is recorded in the report and does not stop storage.
    pub fn run(&mut self, now: OffsetDateTime) -> CoreResult<BruteForceOutcome> {
        let incidents = self.analyzer.detect(now)?;
        if incidents.is_empty() {
            tracing::info!("no brute-force incidents");
            return Ok(BruteForceOutcome {
                incidents: Vec::new(),
                stored: 0,
                report: render_incident_report(&[], 0),
            });
        }

        let mut results = Vec::with_capacity(incidents.len());
        let mut records = Vec::with_capacity(incidents.len());
        for incident in incidents {
            let payload = AlertPayload::from_incident(&incident);
            let alert = send_with_retry(&self.alerts, &payload, &self.retry, self.sleeper.as_ref())
                .map_err(|e| {
                    tracing::error!(ip = %incident.ip, error = %e, "alert delivery failed");
                    e.to_string()
                });
            let vector = self.embedder.embed(&incident.description())?;
            records.push(incident.to_record(vector));
            results.push(StoredIncident { incident, alert });
        }

        self.store.ensure_collection(self.policy)?;
        let stored = self.store.insert_and_publish(&records)?;
        let report = render_incident_report(&results, stored);
        Ok(BruteForceOutcome {
            incidents: results,
            stored,
            report,
        })
    }
}
