//! Runtime configuration from the environment (and `.env` when present).
//!
//! Everything is read once at startup into [`PipelineConfig`]; clients are
//! then built from it and handed to the pipelines explicitly.

use crate::embed::DEFAULT_VECTOR_DIM;
use crate::error::{CoreError, CoreResult};
use crate::http::DEFAULT_TIMEOUT;
use crate::llm::openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::vector::{CollectionPolicy, CollectionSchema, MilvusConfig};
use crate::warehouse::ClickHouseConfig;
use std::time::Duration;

pub const DEFAULT_MILVUS_PORT: u16 = 19530;
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Memory,
    Milvus,
}

/// Layout of the malware collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalwareSchemaKind {
    Standard,
    /// Larger text fields, HNSW index.
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedProvider {
    Hashing,
    Ollama,
    FastEmbed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Mock,
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub vector_backend: VectorBackend,
    pub milvus: Option<MilvusConfig>,
    pub malware_collection: String,
    pub malware_schema: MalwareSchemaKind,
    pub incident_collection: String,
    pub collection_policy: CollectionPolicy,
    pub vector_dim: usize,
    pub embed_provider: EmbedProvider,
    pub embed_model: String,
    pub ollama_url: String,
    pub llm_provider: LlmProvider,
    pub ollama_llm_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub clickhouse: ClickHouseConfig,
    pub login_table: String,
    pub alert_url: Option<String>,
    pub alert_api_key: Option<String>,
    pub http_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_env() -> CoreResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_num::<u64>("HTTP_TIMEOUT_SECS", &v)?),
            None => DEFAULT_TIMEOUT,
        };
        if http_timeout.is_zero() {
            return Err(CoreError::Config("HTTP_TIMEOUT_SECS must be positive".to_string()));
        }

        let vector_dim = match get("VECTOR_DIM") {
            Some(v) => parse_num::<usize>("VECTOR_DIM", &v)?,
            None => DEFAULT_VECTOR_DIM,
        };
        if vector_dim == 0 {
            return Err(CoreError::Config("VECTOR_DIM must be positive".to_string()));
        }

        let milvus_uri = match (get("MILVUS_URI"), get("MILVUS_HOST")) {
            (Some(uri), _) => Some(uri),
            (None, Some(host)) => {
                let port = match get("MILVUS_PORT") {
                    Some(p) => Some(parse_num::<u16>("MILVUS_PORT", &p)?),
                    None => None,
                };
                Some(milvus_uri_from_host(&host, port))
            }
            (None, None) => None,
        };
        if let Some(uri) = &milvus_uri {
            check_url("MILVUS_URI", uri)?;
        }

        let vector_backend = match get("VECTOR_BACKEND").as_deref() {
            Some("memory") => VectorBackend::Memory,
            Some("milvus") => VectorBackend::Milvus,
            Some(other) => {
                return Err(CoreError::Config(format!(
                    "VECTOR_BACKEND must be memory or milvus, got {}",
                    other
                )))
            }
            None if milvus_uri.is_some() => VectorBackend::Milvus,
            None => VectorBackend::Memory,
        };
        let milvus = match (vector_backend, milvus_uri) {
            (VectorBackend::Milvus, Some(uri)) => Some(MilvusConfig {
                uri,
                token: get("MILVUS_TOKEN"),
                timeout: http_timeout,
            }),
            (VectorBackend::Milvus, None) => {
                return Err(CoreError::Config(
                    "VECTOR_BACKEND=milvus needs MILVUS_URI or MILVUS_HOST".to_string(),
                ))
            }
            (VectorBackend::Memory, _) => None,
        };

        let collection_policy = if parse_bool("MILVUS_RESET_COLLECTION", get("MILVUS_RESET_COLLECTION"))? {
            CollectionPolicy::DropAndRecreate
        } else {
            CollectionPolicy::ReuseExisting
        };

        let malware_schema = match get("MILVUS_SCHEMA").as_deref() {
            None | Some("standard") => MalwareSchemaKind::Standard,
            Some("wide") => MalwareSchemaKind::Wide,
            Some(other) => {
                return Err(CoreError::Config(format!(
                    "MILVUS_SCHEMA must be standard or wide, got {}",
                    other
                )))
            }
        };

        let embed_provider = match get("EMBED_PROVIDER").as_deref() {
            None | Some("hashing") => EmbedProvider::Hashing,
            Some("ollama") => EmbedProvider::Ollama,
            Some("fastembed") => EmbedProvider::FastEmbed,
            Some(other) => {
                return Err(CoreError::Config(format!(
                    "EMBED_PROVIDER must be hashing, ollama or fastembed, got {}",
                    other
                )))
            }
        };

        let llm_provider = match get("LLM_PROVIDER").as_deref() {
            None | Some("mock") => LlmProvider::Mock,
            Some("ollama") => LlmProvider::Ollama,
            Some("openai") => LlmProvider::OpenAi,
            Some(other) => {
                return Err(CoreError::Config(format!(
                    "LLM_PROVIDER must be mock, ollama or openai, got {}",
                    other
                )))
            }
        };
        let openai_api_key = get("OPENAI_API_KEY");
        if llm_provider == LlmProvider::OpenAi && openai_api_key.is_none() {
            return Err(CoreError::Config("LLM_PROVIDER=openai needs OPENAI_API_KEY".to_string()));
        }

        let ollama_url = get_or("OLLAMA_URL", DEFAULT_OLLAMA_URL);
        check_url("OLLAMA_URL", &ollama_url)?;
        let openai_base_url = get_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL);
        check_url("OPENAI_BASE_URL", &openai_base_url)?;

        let clickhouse = ClickHouseConfig {
            host: get_or("CLICKHOUSE_HOST", "localhost"),
            port: match get("CLICKHOUSE_PORT") {
                Some(p) => parse_num::<u16>("CLICKHOUSE_PORT", &p)?,
                None => 8123,
            },
            user: get_or("CLICKHOUSE_USER", "default"),
            password: get("CLICKHOUSE_PASSWORD").unwrap_or_default(),
            secure: parse_bool("CLICKHOUSE_SECURE", get("CLICKHOUSE_SECURE"))?,
            timeout: http_timeout,
        };

        let alert_url = get("ALERT_API_URL");
        if let Some(url) = &alert_url {
            check_url("ALERT_API_URL", url)?;
        }

        Ok(Self {
            vector_backend,
            milvus,
            malware_collection: get_or("MILVUS_COLLECTION", "malware_incidents"),
            malware_schema,
            incident_collection: get_or("INCIDENT_COLLECTION", "siem_incidents"),
            collection_policy,
            vector_dim,
            embed_provider,
            embed_model: get_or("EMBED_MODEL", "all-minilm"),
            ollama_url,
            llm_provider,
            ollama_llm_model: get_or("OLLAMA_MODEL", "llama3"),
            openai_api_key,
            openai_model: get_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            openai_base_url,
            clickhouse,
            login_table: get_or("LOGIN_EVENTS_TABLE", "siem_login_events"),
            alert_url,
            alert_api_key: get("ALERT_API_KEY"),
            http_timeout,
        })
    }
}

impl PipelineConfig {
    pub fn malware_schema(&self) -> CollectionSchema {
        match self.malware_schema {
            MalwareSchemaKind::Standard => {
                CollectionSchema::malware_incidents(&self.malware_collection, self.vector_dim)
            }
            MalwareSchemaKind::Wide => {
                CollectionSchema::malware_incidents_wide(&self.malware_collection, self.vector_dim)
            }
        }
    }

    pub fn incident_schema(&self) -> CollectionSchema {
        CollectionSchema::login_incidents(&self.incident_collection, self.vector_dim)
    }
}

/// Managed (Zilliz cloud) hosts are HTTPS on 443; anything else is a
/// self-hosted server on the Milvus port.
pub fn milvus_uri_from_host(host: &str, port: Option<u16>) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }
    let lower = host.to_ascii_lowercase();
    if lower.contains("cloud") || lower.contains("zilliz") {
        format!("https://{}:{}", host, port.unwrap_or(443))
    } else {
        format!("http://{}:{}", host, port.unwrap_or(DEFAULT_MILVUS_PORT))
    }
}

fn check_url(key: &str, value: &str) -> CoreResult<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| CoreError::Config(format!("{} is not a valid URL ({}): {}", key, value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CoreError::Config(format!("{} has unsupported scheme {}", key, other))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .parse()
        .map_err(|_| CoreError::Config(format!("{} must be a number, got {}", key, value)))
}

fn parse_bool(key: &str, value: Option<String>) -> CoreResult<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(CoreError::Config(format!("{} must be a boolean, got {}", key, other))),
    }
}
