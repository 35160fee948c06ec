use crate::error::{CoreError, CoreResult};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Every outbound client carries a request timeout; nothing blocks forever.
pub fn build_client(timeout: Duration) -> CoreResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx answer into `CoreError::Remote`, keeping a slice of the body.
pub fn check_status(service: &'static str, resp: Response) -> CoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let snippet: String = body.chars().take(512).collect();
    Err(CoreError::remote(service, Some(status.as_u16()), snippet))
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
