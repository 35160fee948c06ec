use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use siem_rag_core::alert::{AlertSink, LoggingAlertSink, WebhookAlertClient};
use siem_rag_core::config::{EmbedProvider, LlmProvider, PipelineConfig, VectorBackend};
use siem_rag_core::embed::{EmbeddingClient, HashingEmbedder, OllamaEmbedder, TextEmbedder};
use siem_rag_core::llm::{LlmClient, MockLlm, OllamaClient, OpenAiChatClient};
use siem_rag_core::logging::init_logging;
use siem_rag_core::pipeline::{BruteForcePipeline, MalwarePipeline};
use siem_rag_core::report::CorrelationReporter;
use siem_rag_core::retry::RetryPolicy;
use siem_rag_core::vector::{
    CollectionPolicy, CollectionSchema, InMemoryVectorStore, MilvusRestStore, ScalarFilter, VectorStore,
};
use siem_rag_core::warehouse::{ClickHouseHttp, LoginAnalyzer, LoginRules};
use std::path::PathBuf;

const SAMPLE_LOGS: &str = "\
2025-10-19 14:23:11 WARNING: Suspicious powershell execution detected on host WIN-SRV-01
2025-10-19 14:23:45 ALERT: C2 beacon communication to 192.168.1.100:443 blocked
2025-10-19 14:24:12 CRITICAL: Ransomware encryption activity detected in C:\\Users\\Documents
2025-10-19 14:25:33 INFO: User login successful from 10.0.0.5
2025-10-19 14:26:01 WARNING: Mimikatz credential dumping attempt on DC-01
2025-10-19 14:27:18 ALERT: Trojan payload downloaded from malicious domain evil.com
";

#[derive(Parser)]
#[command(name = "siem_runner", about = "Security incident extraction, recall and correlation")]
struct Cli {
    /// Directory for the rotating log file.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract malware events from a log file, store them, correlate with history.
    Malware {
        /// Log file; the bundled sample is used when omitted.
        #[arg(long)]
        logs: Option<PathBuf>,
        /// Search text; defaults to the first event's summary.
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Failed-login bursts followed by a success: alert, store, report.
    BruteForce,
    /// Similarity search over a stored collection.
    Search {
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Search brute-force incidents instead of malware events.
        #[arg(long)]
        incidents: bool,
    },
    /// Exact-match lookup of stored brute-force incidents.
    Filter {
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli.log_dir).context("initialize logging")?;
    let cfg = PipelineConfig::from_env().context("load configuration")?;

    match cli.command {
        Command::Malware { logs, query, top_k } => {
            let text = match &logs {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("read {}", path.display()))?,
                None => SAMPLE_LOGS.to_string(),
            };
            let schema = cfg.malware_schema();
            let mut pipeline = MalwarePipeline::new(
                EmbeddingClient::new(build_embedder(&cfg)?, cfg.vector_dim),
                build_store(&cfg, schema)?,
                CorrelationReporter::new(build_llm(&cfg)?),
            )
            .with_policy(cfg.collection_policy)
            .with_top_k(top_k);
            let outcome = pipeline.run(&text, query.as_deref())?;
            tracing::info!(stages = ?outcome.stages, stored = outcome.stored, "malware pipeline finished");
            println!("{}", outcome.report);
        }
        Command::BruteForce => {
            let warehouse = ClickHouseHttp::new(cfg.clickhouse.clone(), RetryPolicy::default())?;
            let rules = LoginRules {
                table: cfg.login_table.clone(),
                ..LoginRules::default()
            };
            let schema = cfg.incident_schema();
            let mut pipeline = BruteForcePipeline::new(
                LoginAnalyzer::new(warehouse, rules),
                build_alert_sink(&cfg)?,
                EmbeddingClient::new(build_embedder(&cfg)?, cfg.vector_dim),
                build_store(&cfg, schema)?,
            )
            .with_policy(cfg.collection_policy);
            let outcome = pipeline.run(time::OffsetDateTime::now_utc())?;
            println!("{}", outcome.report);
        }
        Command::Search {
            text,
            top_k,
            incidents,
        } => {
            let schema = if incidents {
                cfg.incident_schema()
            } else {
                cfg.malware_schema()
            };
            let store = open_store(&cfg, schema)?;
            let mut embedder = EmbeddingClient::new(build_embedder(&cfg)?, cfg.vector_dim);
            let hits = store.search(&embedder.embed(&text)?, top_k)?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::Filter { ip, tenant, limit } => {
            let filter = ScalarFilter::incidents(ip.as_deref(), tenant.as_deref());
            let store = open_store(&cfg, cfg.incident_schema())?;
            let rows = store.query_by_filter(&filter, limit)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn build_embedder(cfg: &PipelineConfig) -> Result<Box<dyn TextEmbedder>> {
    Ok(match cfg.embed_provider {
        EmbedProvider::Hashing => Box::new(HashingEmbedder::new(cfg.vector_dim)),
        EmbedProvider::Ollama => Box::new(OllamaEmbedder::new(
            &cfg.ollama_url,
            &cfg.embed_model,
            cfg.http_timeout,
        )?),
        #[cfg(feature = "local-embeddings")]
        EmbedProvider::FastEmbed => Box::new(siem_rag_core::embed::fastembed::FastEmbedder::new()?),
        #[cfg(not(feature = "local-embeddings"))]
        EmbedProvider::FastEmbed => {
            bail!("EMBED_PROVIDER=fastembed needs the local-embeddings feature")
        }
    })
}

fn build_llm(cfg: &PipelineConfig) -> Result<Box<dyn LlmClient>> {
    Ok(match cfg.llm_provider {
        LlmProvider::Mock => Box::new(MockLlm),
        LlmProvider::Ollama => Box::new(OllamaClient::new(
            &cfg.ollama_url,
            &cfg.ollama_llm_model,
            cfg.http_timeout,
        )?),
        LlmProvider::OpenAi => Box::new(OpenAiChatClient::new(
            &cfg.openai_base_url,
            cfg.openai_api_key.as_deref().unwrap_or_default(),
            &cfg.openai_model,
            cfg.http_timeout,
        )?),
    })
}

fn build_store(cfg: &PipelineConfig, schema: CollectionSchema) -> Result<Box<dyn VectorStore>> {
    match (cfg.vector_backend, &cfg.milvus) {
        (VectorBackend::Milvus, Some(milvus)) => {
            Ok(Box::new(MilvusRestStore::connect(milvus.clone(), schema)?))
        }
        (VectorBackend::Milvus, None) => bail!("milvus backend selected without a URI"),
        (VectorBackend::Memory, _) => {
            tracing::warn!(collection = %schema.name, "in-memory vector store, nothing persists past this run");
            Ok(Box::new(InMemoryVectorStore::new(schema)))
        }
    }
}

/// Read-only access: never drops, loads before querying.
fn open_store(cfg: &PipelineConfig, schema: CollectionSchema) -> Result<Box<dyn VectorStore>> {
    let mut store = build_store(cfg, schema)?;
    store.ensure_collection(CollectionPolicy::ReuseExisting)?;
    store.load()?;
    Ok(store)
}

fn build_alert_sink(cfg: &PipelineConfig) -> Result<Box<dyn AlertSink>> {
    Ok(match &cfg.alert_url {
        Some(url) => Box::new(WebhookAlertClient::new(
            url,
            cfg.alert_api_key.clone(),
            cfg.http_timeout,
        )?),
        None => Box::new(LoggingAlertSink),
    })
}
