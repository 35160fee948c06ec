pub mod alert;
pub mod classify;
pub mod config;
pub mod embed;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod vector;
pub mod warehouse;

pub mod error;
pub mod http;
