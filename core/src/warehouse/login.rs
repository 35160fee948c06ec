//! Brute-force detection over a `login_events` table: failed-login
//! aggregation, then a look for a success shortly after the burst.

use super::client::{row_str, row_u64, BoundQuery, QueryParam, Row, SqlWarehouse};
use crate::error::{CoreError, CoreResult};
use crate::vector::VectorRecord;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// `first_seen` / `last_seen` bound the failures only, so a success inside
/// the lookback window still falls after `last_seen`.
pub const FAILED_LOGIN_AGGREGATE_SQL: &str = "\
SELECT ip, tenant_id, countIf(event_type = 'failed') AS failed_count, \
minIf(event_time, event_type = 'failed') AS first_seen, \
maxIf(event_time, event_type = 'failed') AS last_seen \
FROM {table:Identifier} \
WHERE event_time >= {window_start:DateTime} \
GROUP BY ip, tenant_id \
HAVING failed_count >= {threshold:UInt32} \
ORDER BY failed_count DESC \
LIMIT {limit:UInt32}";

pub const SUCCESS_AFTER_FAILURES_SQL: &str = "\
SELECT tenant_id, user_id, ip, event_time, event_type \
FROM {table:Identifier} \
WHERE ip = {ip:String} \
AND event_time > {last_seen:DateTime} \
AND event_time <= {window_end:DateTime} \
AND event_type = 'success' \
ORDER BY event_time \
LIMIT {limit:UInt32}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRules {
    pub table: String,
    pub failed_threshold: u32,
    pub lookback: Duration,
    pub aggregate_limit: u32,
    pub success_window: Duration,
    pub evidence_limit: u32,
}

impl Default for LoginRules {
    fn default() -> Self {
        Self {
            table: "siem_login_events".to_string(),
            failed_threshold: 5,
            lookback: Duration::minutes(10),
            aggregate_limit: 100,
            success_window: Duration::seconds(300),
            evidence_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedLoginAggregate {
    pub ip: String,
    pub tenant_id: String,
    pub failed_count: u64,
    pub first_seen: String,
    pub last_seen: String,
}

/// Brute force followed by a success within the correlation window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BruteForceIncident {
    pub incident_id: String,
    pub ip: String,
    pub tenant_id: String,
    pub failed_count: u64,
    pub evidence: Vec<Row>,
}

impl BruteForceIncident {
    /// Text handed to the embedder for this incident.
    pub fn description(&self) -> String {
        let users: Vec<String> = self
            .evidence
            .iter()
            .map(|r| row_str(r, "user_id"))
            .filter(|u| !u.is_empty())
            .collect();
        format!(
            "{} failed logins from {} on tenant {} followed by successful login (users: {})",
            self.failed_count,
            self.ip,
            self.tenant_id,
            users.join(", ")
        )
    }

    pub fn to_record(&self, vector: Vec<f32>) -> VectorRecord {
        VectorRecord::new(self.incident_id.clone(), vector)
            .with_field("ip", self.ip.as_str())
            .with_field("tenant_id", self.tenant_id.as_str())
            .with_field("failed_count", self.failed_count as i64)
    }
}

pub fn parse_event_time(s: &str) -> CoreResult<OffsetDateTime> {
    let trimmed = s.trim();
    if let Ok(t) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(t);
    }
    // DateTime64 adds a fractional part; second precision is enough here.
    let whole = trimmed.split('.').next().unwrap_or(trimmed);
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(whole, &fmt)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| CoreError::InvalidInput(format!("unparseable event_time {:?}: {}", s, e)))
}

pub fn format_event_time(t: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let utc = t.to_offset(time::UtcOffset::UTC);
    // The description only names numeric components, which always format.
    utc.format(&fmt).unwrap_or_default()
}

/// `last_seen < t <= last_seen + window`.
pub fn within_success_window(last_seen: OffsetDateTime, t: OffsetDateTime, window: Duration) -> bool {
    t > last_seen && t <= last_seen + window
}

pub struct LoginAnalyzer<W: SqlWarehouse> {
    warehouse: W,
    rules: LoginRules,
}

impl<W: SqlWarehouse> LoginAnalyzer<W> {
    pub fn new(warehouse: W, rules: LoginRules) -> Self {
        Self { warehouse, rules }
    }

    pub fn rules(&self) -> &LoginRules {
        &self.rules
    }

    pub fn aggregate_query(&self, now: OffsetDateTime) -> BoundQuery {
        BoundQuery::new(FAILED_LOGIN_AGGREGATE_SQL)
            .bind("table", QueryParam::Identifier(self.rules.table.clone()))
            .bind(
                "window_start",
                QueryParam::DateTime(format_event_time(now - self.rules.lookback)),
            )
            .bind("threshold", QueryParam::UInt(self.rules.failed_threshold as u64))
            .bind("limit", QueryParam::UInt(self.rules.aggregate_limit as u64))
    }

    pub fn success_query(&self, ip: &str, last_seen: OffsetDateTime) -> BoundQuery {
        BoundQuery::new(SUCCESS_AFTER_FAILURES_SQL)
            .bind("table", QueryParam::Identifier(self.rules.table.clone()))
            .bind("ip", QueryParam::Str(ip.to_string()))
            .bind("last_seen", QueryParam::DateTime(format_event_time(last_seen)))
            .bind(
                "window_end",
                QueryParam::DateTime(format_event_time(last_seen + self.rules.success_window)),
            )
            .bind("limit", QueryParam::UInt(self.rules.evidence_limit as u64))
    }

    /// Sources with at least `failed_threshold` failures in the lookback window.
    pub fn failed_login_aggregates(&self, now: OffsetDateTime) -> CoreResult<Vec<FailedLoginAggregate>> {
        let rows = self.warehouse.query(&self.aggregate_query(now))?;
        let aggregates: Vec<FailedLoginAggregate> = rows
            .iter()
            .map(|r| FailedLoginAggregate {
                ip: row_str(r, "ip"),
                tenant_id: row_str(r, "tenant_id"),
                failed_count: row_u64(r, "failed_count"),
                first_seen: row_str(r, "first_seen"),
                last_seen: row_str(r, "last_seen"),
            })
            .collect();
        tracing::info!(
            count = aggregates.len(),
            threshold = self.rules.failed_threshold,
            "failed-login aggregates"
        );
        Ok(aggregates)
    }

    /// Promote each aggregate that saw a success right after its burst.
    pub fn correlate_successful_logins(
        &self,
        aggregates: &[FailedLoginAggregate],
    ) -> CoreResult<Vec<BruteForceIncident>> {
        let mut incidents = Vec::new();
        for agg in aggregates {
            let last_seen = parse_event_time(&agg.last_seen)?;
            let rows = self.warehouse.query(&self.success_query(&agg.ip, last_seen))?;
            let evidence: Vec<Row> = rows
                .into_iter()
                .filter(|r| match parse_event_time(&row_str(r, "event_time")) {
                    Ok(t) => within_success_window(last_seen, t, self.rules.success_window),
                    Err(e) => {
                        tracing::warn!(ip = %agg.ip, error = %e, "dropping evidence row");
                        false
                    }
                })
                .take(self.rules.evidence_limit as usize)
                .collect();
            if evidence.is_empty() {
                continue;
            }
            tracing::info!(ip = %agg.ip, tenant = %agg.tenant_id, evidence = evidence.len(), "brute force followed by success");
            incidents.push(BruteForceIncident {
                incident_id: ulid::Ulid::new().to_string(),
                ip: agg.ip.clone(),
                tenant_id: agg.tenant_id.clone(),
                failed_count: agg.failed_count,
                evidence,
            });
        }
        Ok(incidents)
    }

    pub fn detect(&self, now: OffsetDateTime) -> CoreResult<Vec<BruteForceIncident>> {
        let aggregates = self.failed_login_aggregates(now)?;
        self.correlate_successful_logins(&aggregates)
    }
}
