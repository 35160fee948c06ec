//! Outbound incident alerts. Delivery is at-least-once: a retried POST may
//! reach the receiver twice.

use crate::error::{CoreError, CoreResult};
use crate::http::{build_client, check_status};
use crate::retry::{RetryPolicy, Sleeper};
use crate::warehouse::{BruteForceIncident, Row};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const BRUTE_FORCE_ALERT_TITLE: &str =
    "Potential account compromise - brute force followed by success";

pub const DEFAULT_SUGGESTED_ACTIONS: [&str; 3] = ["block_ip", "force_password_reset", "notify_owner"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertPayload {
    pub title: String,
    pub ip: String,
    pub tenant_id: String,
    pub failed_count: u64,
    pub evidence: Vec<Row>,
    pub suggested_action: Vec<String>,
}

impl AlertPayload {
    pub fn from_incident(incident: &BruteForceIncident) -> Self {
        Self {
            title: BRUTE_FORCE_ALERT_TITLE.to_string(),
            ip: incident.ip.clone(),
            tenant_id: incident.tenant_id.clone(),
            failed_count: incident.failed_count,
            evidence: incident.evidence.clone(),
            suggested_action: DEFAULT_SUGGESTED_ACTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Whatever JSON the receiver answered with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertAck(pub Value);

pub trait AlertSink {
    fn send(&self, payload: &AlertPayload) -> CoreResult<AlertAck>;
}

impl<S: AlertSink + ?Sized> AlertSink for &S {
    fn send(&self, payload: &AlertPayload) -> CoreResult<AlertAck> {
        (**self).send(payload)
    }
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn send(&self, payload: &AlertPayload) -> CoreResult<AlertAck> {
        (**self).send(payload)
    }
}

/// JSON POST to a webhook with an optional bearer key.
pub struct WebhookAlertClient {
    url: String,
    api_key: Option<String>,
    client: Client,
}

impl WebhookAlertClient {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> CoreResult<Self> {
        if url.trim().is_empty() {
            return Err(CoreError::Config("alert URL is empty".to_string()));
        }
        Ok(Self {
            url: url.to_string(),
            api_key,
            client: build_client(timeout)?,
        })
    }
}

impl AlertSink for WebhookAlertClient {
    fn send(&self, payload: &AlertPayload) -> CoreResult<AlertAck> {
        let mut req = self.client.post(&self.url).json(payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = check_status("alert", req.send()?)?;
        let text = resp.text()?;
        if text.trim().is_empty() {
            return Ok(AlertAck(Value::Null));
        }
        Ok(AlertAck(serde_json::from_str(&text)?))
    }
}

/// Used when no alert endpoint is configured: logs the alert and acks locally.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAlertSink;

impl AlertSink for LoggingAlertSink {
    fn send(&self, payload: &AlertPayload) -> CoreResult<AlertAck> {
        tracing::warn!(
            ip = %payload.ip,
            tenant = %payload.tenant_id,
            failed_count = payload.failed_count,
            title = %payload.title,
            "alert (no endpoint configured)"
        );
        Ok(AlertAck(serde_json::json!({
            "status": "logged",
            "ip": payload.ip,
        })))
    }
}

pub fn send_with_retry<S: AlertSink + ?Sized>(
    sink: &S,
    payload: &AlertPayload,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> CoreResult<AlertAck> {
    policy.run_with("alert.send", sleeper, CoreError::is_retryable, || sink.send(payload))
}
