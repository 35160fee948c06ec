//! Retrieval-augmented correlation: neighbours become prompt context, the
//! LLM writes the narrative. A failed LLM call still yields a report.

use crate::llm::LlmClient;
use crate::vector::SearchHit;
use std::fmt::Write;

pub const NO_SIMILAR_INCIDENTS: &str = "No similar incidents found.";

/// One block per neighbour, 1-based, score at four decimals.
pub fn build_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_SIMILAR_INCIDENTS.to_string();
    }
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let _ = write!(
            out,
            "Incident {} (Score: {:.4}):\n  Type: {}\n  Summary: {}\n\n",
            i + 1,
            hit.score,
            hit.label(),
            hit.summary()
        );
    }
    out
}

pub fn build_prompt(query_text: &str, context: &str) -> String {
    format!(
        "You are a senior SOC analyst. Analyze this new security event:\n\n\
         NEW EVENT: {}\n\n\
         SIMILAR HISTORICAL INCIDENTS:\n{}\n\n\
         Provide a structured report with:\n\
         1. Summary (2-3 sentences)\n\
         2. Key Hypotheses (2-3 points)\n\
         3. Recommended Actions (3-4 specific steps)\n\n\
         Use clear, actionable language.",
        query_text, context
    )
}

pub struct CorrelationReporter<L: LlmClient> {
    llm: L,
}

impl<L: LlmClient> CorrelationReporter<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }

    /// Never fails: an LLM error is folded into a fallback report.
    pub fn report(&self, query_text: &str, neighbors: &[SearchHit]) -> String {
        let context = build_context(neighbors);
        let prompt = build_prompt(query_text, &context);
        match self.llm.generate(&prompt) {
            Ok(text) => {
                tracing::info!(llm = self.llm.name(), neighbors = neighbors.len(), "correlation report generated");
                text
            }
            Err(e) => {
                tracing::warn!(llm = self.llm.name(), error = %e, "llm failed, using fallback analysis");
                format!("[LLM Error: {}]\n\nFallback Analysis:\n{}", e, context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, CoreResult};
    use crate::vector::ScalarValue;
    use std::collections::BTreeMap;

    fn hit(score: f32, label: &str, summary: &str) -> SearchHit {
        let mut fields = BTreeMap::new();
        fields.insert("malware_type".to_string(), ScalarValue::from(label));
        fields.insert("summary".to_string(), ScalarValue::from(summary));
        SearchHit {
            incident_id: "inc-000000000001".to_string(),
            fields,
            score,
        }
    }

    struct Down;
    impl LlmClient for Down {
        fn name(&self) -> &str {
            "down"
        }
        fn generate(&self, _prompt: &str) -> CoreResult<String> {
            Err(CoreError::Llm("connection refused".to_string()))
        }
    }

    #[test]
    fn context_blocks_are_numbered_with_four_decimals() {
        let ctx = build_context(&[hit(0.91234, "ransomware", "files encrypted"), hit(0.5, "dropper", "payload")]);
        assert!(ctx.starts_with("Incident 1 (Score: 0.9123):\n  Type: ransomware\n  Summary: files encrypted\n\n"));
        assert!(ctx.contains("Incident 2 (Score: 0.5000):\n  Type: dropper\n"));
    }

    #[test]
    fn empty_neighbours_use_placeholder() {
        assert_eq!(build_context(&[]), NO_SIMILAR_INCIDENTS);
        assert!(build_prompt("q", NO_SIMILAR_INCIDENTS).contains("NEW EVENT: q"));
    }

    #[test]
    fn llm_failure_falls_back_to_context() {
        let out = CorrelationReporter::new(Down).report("q", &[]);
        assert_eq!(
            out,
            "[LLM Error: llm failure: connection refused]\n\nFallback Analysis:\nNo similar incidents found."
        );
    }
}
