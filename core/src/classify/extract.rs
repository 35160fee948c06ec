use super::rules::{KeywordClassifier, MalwareType};
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Byte budgets of the standard malware schema's `summary` and `raw` fields.
pub const SUMMARY_MAX_BYTES: usize = 1024;
pub const RAW_MAX_BYTES: usize = 4096;

/// One log line that tripped the keyword classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MalwareEvent {
    pub incident_id: String,
    pub malware_type: MalwareType,
    pub summary: String,
    pub raw: String,
}

impl KeywordClassifier {
    /// Classify one stripped, non-empty line.
    pub fn classify(&self, line: &str) -> Option<MalwareEvent> {
        let malware_type = self.label(line)?;
        let (summary_limit, raw_limit) = self.limits();
        Some(MalwareEvent {
            incident_id: new_incident_id(),
            malware_type,
            summary: truncate_bytes(line, summary_limit),
            raw: truncate_bytes(line, raw_limit),
        })
    }

    /// Classify every non-empty line of `logs`, keeping input order.
    pub fn extract(&self, logs: &str) -> Vec<MalwareEvent> {
        let events: Vec<MalwareEvent> = logs
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| self.classify(l))
            .collect();
        tracing::info!(count = events.len(), "extracted malware events");
        events
    }
}

pub fn extract_events(logs: &str) -> Vec<MalwareEvent> {
    KeywordClassifier::default().extract(logs)
}

pub fn extract_events_from_path(path: impl AsRef<Path>) -> CoreResult<Vec<MalwareEvent>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(extract_events(&text))
}

/// `inc-` followed by the 12 trailing (random) characters of a ULID.
fn new_incident_id() -> String {
    let ulid = ulid::Ulid::new().to_string().to_ascii_lowercase();
    format!("inc-{}", &ulid[ulid.len() - 12..])
}

/// Longest prefix of at most `max_bytes` UTF-8 bytes that ends on a char
/// boundary. Store VARCHAR limits are byte lengths.
pub fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .take_while(|(idx, c)| idx + c.len_utf8() <= max_bytes)
        .last()
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);
    s[..end].to_string()
}

pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
