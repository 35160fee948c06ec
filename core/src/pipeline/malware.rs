//! Extract, store, retrieve, correlate over raw log text.

use super::state::{PipelineStage, StageTracker};
use crate::classify::{KeywordClassifier, MalwareEvent};
use crate::embed::{EmbeddingClient, TextEmbedder};
use crate::error::CoreResult;
use crate::llm::LlmClient;
use crate::report::CorrelationReporter;
use crate::vector::{CollectionPolicy, SearchHit, VectorRecord, VectorStore};
use serde::Serialize;

pub const NO_MALWARE_EVENTS_MESSAGE: &str = "No malware events detected in logs.";

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MalwareOutcome {
    pub stages: Vec<PipelineStage>,
    pub events: Vec<MalwareEvent>,
    pub stored: usize,
    pub query: Option<String>,
    pub neighbors: Vec<SearchHit>,
    pub report: String,
}

pub struct MalwarePipeline<M: TextEmbedder, S: VectorStore, L: LlmClient> {
    classifier: KeywordClassifier,
    embedder: EmbeddingClient<M>,
    store: S,
    reporter: CorrelationReporter<L>,
    policy: CollectionPolicy,
    top_k: usize,
}

impl<M: TextEmbedder, S: VectorStore, L: LlmClient> MalwarePipeline<M, S, L> {
    pub fn new(embedder: EmbeddingClient<M>, store: S, reporter: CorrelationReporter<L>) -> Self {
        Self {
            classifier: KeywordClassifier::default().fitted_to(store.schema()),
            embedder,
            store,
            reporter,
            policy: CollectionPolicy::ReuseExisting,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Text budgets are refitted to the store's schema.
    pub fn with_classifier(mut self, classifier: KeywordClassifier) -> Self {
        self.classifier = classifier.fitted_to(self.store.schema());
        self
    }

    pub fn with_policy(mut self, policy: CollectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the whole flow. `query` defaults to the first event's summary.
    ///
    /// Store and retrieve errors propagate; an LLM error does not, the
    /// reporter folds it into a fallback report.
    pub fn run(&mut self, logs: &str, query: Option<&str>) -> CoreResult<MalwareOutcome> {
        let mut tracker = StageTracker::default();

        let events = self.classifier.extract(logs);
        tracker.transition(PipelineStage::Extracted)?;
        if events.is_empty() {
            tracker.transition(PipelineStage::Done)?;
            tracing::info!("no malware events, stopping after extract");
            return Ok(MalwareOutcome {
                stages: tracker.history().to_vec(),
                events,
                stored: 0,
                query: None,
                neighbors: Vec::new(),
                report: NO_MALWARE_EVENTS_MESSAGE.to_string(),
            });
        }

        let stored = self.store_events(&events)?;
        tracker.transition(PipelineStage::Stored)?;

        let search_query = match query {
            Some(q) if !q.trim().is_empty() => q.to_string(),
            _ => events[0].summary.clone(),
        };
        let neighbors = self.retrieve(&search_query)?;
        tracker.transition(PipelineStage::Retrieved)?;

        let report = self.reporter.report(&search_query, &neighbors);
        tracker.transition(PipelineStage::Correlated)?;
        tracker.transition(PipelineStage::Done)?;

        Ok(MalwareOutcome {
            stages: tracker.history().to_vec(),
            events,
            stored,
            query: Some(search_query),
            neighbors,
            report,
        })
    }

    pub fn store_events(&mut self, events: &[MalwareEvent]) -> CoreResult<usize> {
        self.store.ensure_collection(self.policy)?;
        let mut records = Vec::with_capacity(events.len());
        for event in events {
            let vector = self.embedder.embed(&event.summary)?;
            records.push(VectorRecord::from_malware_event(event, vector));
        }
        let stored = self.store.insert_and_publish(&records)?;
        tracing::info!(stored, model = self.embedder.model_name(), "events stored");
        Ok(stored)
    }

    pub fn retrieve(&mut self, query: &str) -> CoreResult<Vec<SearchHit>> {
        let vector = self.embedder.embed(query)?;
        let hits = self.store.search(&vector, self.top_k)?;
        tracing::info!(hits = hits.len(), top_k = self.top_k, "similar incidents retrieved");
        Ok(hits)
    }
}
