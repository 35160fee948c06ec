//! Relational query client and the login-event queries built on it.

pub mod clickhouse;
pub mod client;
pub mod login;

pub use clickhouse::{ClickHouseConfig, ClickHouseHttp};
pub use client::{row_str, row_u64, BoundQuery, QueryParam, Row, SqlWarehouse};
pub use login::{BruteForceIncident, FailedLoginAggregate, LoginAnalyzer, LoginRules};
