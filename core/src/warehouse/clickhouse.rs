//! ClickHouse over its HTTP interface with server-side query parameters.

use super::client::{BoundQuery, Row, SqlWarehouse};
use crate::error::{CoreError, CoreResult};
use crate::http::{build_client, check_status};
use crate::retry::RetryPolicy;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub secure: bool,
    pub timeout: Duration,
}

impl ClickHouseConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}/", scheme, self.host, self.port)
    }
}

pub struct ClickHouseHttp {
    config: ClickHouseConfig,
    client: Client,
    retry: RetryPolicy,
}

impl ClickHouseHttp {
    pub fn new(config: ClickHouseConfig, retry: RetryPolicy) -> CoreResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            retry,
        })
    }

    fn query_once(&self, query: &BoundQuery) -> CoreResult<Vec<Row>> {
        let url = self.config.base_url();
        let resp = self
            .client
            .post(&url)
            .query(&url_params(query))
            .header("X-ClickHouse-User", &self.config.user)
            .header("X-ClickHouse-Key", &self.config.password)
            .body(query.sql.clone())
            .send()?;
        let text = check_status("clickhouse", resp)?.text()?;
        parse_json_each_row(&text)
    }
}

/// `default_format` plus one `param_<name>` pair per bound value.
pub fn url_params(query: &BoundQuery) -> Vec<(String, String)> {
    let mut out = vec![("default_format".to_string(), "JSONEachRow".to_string())];
    for (name, value) in &query.params {
        out.push((format!("param_{}", name), value.to_string()));
    }
    out
}

pub fn parse_json_each_row(text: &str) -> CoreResult<Vec<Row>> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed)? {
            Value::Object(map) => rows.push(map),
            other => {
                return Err(CoreError::remote(
                    "clickhouse",
                    None,
                    format!("row {} is not an object: {}", idx + 1, other),
                ))
            }
        }
    }
    Ok(rows)
}

impl SqlWarehouse for ClickHouseHttp {
    fn query(&self, query: &BoundQuery) -> CoreResult<Vec<Row>> {
        query.check_bindings()?;
        let rows = self.retry.run("clickhouse.query", || self.query_once(query))?;
        tracing::debug!(rows = rows.len(), "clickhouse query returned");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::client::QueryParam;

    #[test]
    fn values_travel_as_url_parameters() {
        let q = BoundQuery::new("SELECT * FROM t WHERE ip = {ip:String}")
            .bind("ip", QueryParam::Str("1.2.3.4' OR 1=1 --".to_string()));
        let params = url_params(&q);
        assert_eq!(params[0], ("default_format".to_string(), "JSONEachRow".to_string()));
        assert_eq!(
            params[1],
            ("param_ip".to_string(), "1.2.3.4' OR 1=1 --".to_string())
        );
        assert!(!q.sql.contains("OR 1=1"));
    }

    #[test]
    fn json_each_row_is_parsed_line_by_line() {
        let text = "{\"ip\":\"10.0.0.1\",\"failed_count\":\"6\"}\n\n{\"ip\":\"10.0.0.2\",\"failed_count\":\"9\"}\n";
        let rows = parse_json_each_row(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["ip"], "10.0.0.2");
        assert!(parse_json_each_row("[1,2]").is_err());
        assert!(parse_json_each_row("").unwrap().is_empty());
    }

    #[test]
    fn base_url_follows_secure_flag() {
        let mut cfg = ClickHouseConfig {
            host: "ch.local".to_string(),
            port: 8123,
            user: "default".to_string(),
            password: String::new(),
            secure: false,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(cfg.base_url(), "http://ch.local:8123/");
        cfg.secure = true;
        cfg.port = 8443;
        assert_eq!(cfg.base_url(), "https://ch.local:8443/");
    }
}
