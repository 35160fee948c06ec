//! Human-readable Markdown for the brute-force pipeline.

use crate::alert::AlertAck;
use crate::warehouse::{row_str, BruteForceIncident};
use std::fmt::Write;

pub const NO_INCIDENTS_REPORT: &str = "# SIEM Report\n\nNo incidents detected.";

/// An incident together with what the alert receiver said about it.
#[derive(Debug, Clone)]
pub struct StoredIncident {
    pub incident: BruteForceIncident,
    pub alert: Result<AlertAck, String>,
}

pub fn render_incident_report(incidents: &[StoredIncident], stored: usize) -> String {
    if incidents.is_empty() {
        return NO_INCIDENTS_REPORT.to_string();
    }
    let mut out = String::from("# SIEM Incident Report\n\n");
    for (i, item) in incidents.iter().enumerate() {
        let inc = &item.incident;
        let _ = writeln!(out, "## Incident {}: IP {}", i + 1, inc.ip);
        let _ = writeln!(out, "- Tenant: {}", inc.tenant_id);
        let _ = writeln!(out, "- Failed attempts: {}", inc.failed_count);
        out.push_str("- Evidence:\n");
        for row in &inc.evidence {
            let _ = writeln!(
                out,
                "  - {} user={} event={}",
                row_str(row, "event_time"),
                row_str(row, "user_id"),
                row_str(row, "event_type")
            );
        }
        match &item.alert {
            Ok(ack) => {
                let _ = writeln!(out, "- Alert API response: {}", ack.0);
            }
            Err(e) => {
                let _ = writeln!(out, "- Alert API response: failed ({})", e);
            }
        }
        out.push('\n');
    }
    let _ = write!(out, "{} incidents stored in the vector store.", stored);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_report_is_literal() {
        assert_eq!(render_incident_report(&[], 0), "# SIEM Report\n\nNo incidents detected.");
    }

    #[test]
    fn sections_list_evidence_and_alert_outcome() {
        let incident = BruteForceIncident {
            incident_id: "01J".to_string(),
            ip: "198.51.100.4".to_string(),
            tenant_id: "acme".to_string(),
            failed_count: 12,
            evidence: vec![json!({"event_time": "2025-10-18 12:03:00", "user_id": "alice", "event_type": "success"})
                .as_object()
                .cloned()
                .unwrap()],
        };
        let report = render_incident_report(
            &[
                StoredIncident {
                    incident: incident.clone(),
                    alert: Ok(AlertAck(json!({"id": 7}))),
                },
                StoredIncident {
                    incident,
                    alert: Err("timeout".to_string()),
                },
            ],
            2,
        );
        assert!(report.starts_with("# SIEM Incident Report\n\n## Incident 1: IP 198.51.100.4\n- Tenant: acme\n- Failed attempts: 12\n- Evidence:\n  - 2025-10-18 12:03:00 user=alice event=success\n- Alert API response: {\"id\":7}\n"));
        assert!(report.contains("## Incident 2: IP 198.51.100.4"));
        assert!(report.contains("- Alert API response: failed (timeout)"));
        assert!(report.ends_with("2 incidents stored in the vector store."));
    }
}
