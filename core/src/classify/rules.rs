use super::extract::{RAW_MAX_BYTES, SUMMARY_MAX_BYTES};
use crate::vector::{CollectionSchema, ScalarKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MalwareType {
    Ransomware,
    C2Communication,
    Dropper,
    CredentialTheft,
    Unknown,
}

impl MalwareType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalwareType::Ransomware => "ransomware",
            MalwareType::C2Communication => "c2_communication",
            MalwareType::Dropper => "dropper",
            MalwareType::CredentialTheft => "credential_theft",
            MalwareType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MalwareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any of these (case-insensitive substring) makes a line an incident.
pub const TRIGGER_KEYWORDS: [&str; 10] = [
    "ransom",
    "malware",
    "trojan",
    "c2",
    "powershell",
    "payload",
    "beacon",
    "mimikatz",
    "encrypt",
    "suspicious",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub label: MalwareType,
    pub patterns: Vec<&'static str>,
}

impl KeywordRule {
    pub fn new(label: MalwareType, patterns: &[&'static str]) -> Self {
        Self {
            label,
            patterns: patterns.to_vec(),
        }
    }

    fn matches(&self, lower: &str) -> bool {
        self.patterns.iter().any(|p| lower.contains(p))
    }
}

/// Ordered rule table; the first matching rule wins.
pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(MalwareType::Ransomware, &["ransom", "encrypt"]),
        KeywordRule::new(MalwareType::C2Communication, &["beacon", "c2"]),
        KeywordRule::new(MalwareType::Dropper, &["powershell", "payload"]),
        KeywordRule::new(MalwareType::CredentialTheft, &["mimikatz"]),
    ]
}

#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    triggers: Vec<&'static str>,
    rules: Vec<KeywordRule>,
    summary_limit: usize,
    raw_limit: usize,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::with_rules(TRIGGER_KEYWORDS.to_vec(), default_rules())
    }
}

impl KeywordClassifier {
    pub fn with_rules(triggers: Vec<&'static str>, rules: Vec<KeywordRule>) -> Self {
        Self {
            triggers,
            rules,
            summary_limit: SUMMARY_MAX_BYTES,
            raw_limit: RAW_MAX_BYTES,
        }
    }

    /// Byte budgets for `summary` and `raw`.
    pub fn with_limits(mut self, summary_limit: usize, raw_limit: usize) -> Self {
        self.summary_limit = summary_limit;
        self.raw_limit = raw_limit;
        self
    }

    /// Takes the budgets from the schema's `summary` / `raw` VARCHAR fields,
    /// keeping the current ones where the schema has no such field.
    pub fn fitted_to(mut self, schema: &CollectionSchema) -> Self {
        for field in &schema.scalar_fields {
            if let ScalarKind::VarChar { max_length } = field.kind {
                match field.name.as_str() {
                    "summary" => self.summary_limit = max_length as usize,
                    "raw" => self.raw_limit = max_length as usize,
                    _ => {}
                }
            }
        }
        self
    }

    pub fn limits(&self) -> (usize, usize) {
        (self.summary_limit, self.raw_limit)
    }

    /// `None` when the line carries no trigger keyword.
    pub fn label(&self, line: &str) -> Option<MalwareType> {
        let lower = line.to_lowercase();
        if !self.triggers.iter().any(|kw| lower.contains(kw)) {
            return None;
        }
        let label = self
            .rules
            .iter()
            .find(|r| r.matches(&lower))
            .map(|r| r.label)
            .unwrap_or(MalwareType::Unknown);
        Some(label)
    }
}
