use crate::error::{CoreError, CoreResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const PRIMARY_KEY_MAX_LENGTH: u32 = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScalarKind {
    VarChar { max_length: u32 },
    Int64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScalarField {
    pub name: String,
    pub kind: ScalarKind,
}

impl ScalarField {
    pub fn varchar(name: &str, max_length: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: ScalarKind::VarChar { max_length },
        }
    }

    pub fn int64(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ScalarKind::Int64,
        }
    }
}

/// Index type is opaque to callers; the metric is always cosine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndexSpec {
    Auto,
    Hnsw { m: u32, ef_construction: u32 },
}

/// Startup behaviour for an existing collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CollectionPolicy {
    #[default]
    ReuseExisting,
    /// Destructive. Only selected by explicit opt-in.
    DropAndRecreate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub description: String,
    pub primary_field: String,
    pub vector_field: String,
    pub dim: usize,
    pub scalar_fields: Vec<ScalarField>,
    pub index: IndexSpec,
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,254}$").expect("static regex"))
}

impl CollectionSchema {
    /// Log-line incidents: `malware_type`, `summary`, `raw`.
    pub fn malware_incidents(name: &str, dim: usize) -> Self {
        Self {
            name: name.to_string(),
            description: "Malware incidents".to_string(),
            primary_field: "incident_id".to_string(),
            vector_field: "vector".to_string(),
            dim,
            scalar_fields: vec![
                ScalarField::varchar("malware_type", 128),
                ScalarField::varchar("summary", 1024),
                ScalarField::varchar("raw", 4096),
            ],
            index: IndexSpec::Auto,
        }
    }

    /// Wider VARCHAR limits with an HNSW index.
    pub fn malware_incidents_wide(name: &str, dim: usize) -> Self {
        Self {
            description: "SOC incident vectors".to_string(),
            scalar_fields: vec![
                ScalarField::varchar("malware_type", 256),
                ScalarField::varchar("summary", 2048),
                ScalarField::varchar("raw", 8192),
            ],
            index: IndexSpec::Hnsw {
                m: 16,
                ef_construction: 256,
            },
            ..Self::malware_incidents(name, dim)
        }
    }

    /// Brute-force incidents: `ip`, `tenant_id`, `failed_count`.
    pub fn login_incidents(name: &str, dim: usize) -> Self {
        Self {
            name: name.to_string(),
            description: "SIEM incidents with vector embeddings".to_string(),
            primary_field: "incident_id".to_string(),
            vector_field: "description_vector".to_string(),
            dim,
            scalar_fields: vec![
                ScalarField::varchar("ip", 64),
                ScalarField::varchar("tenant_id", 64),
                ScalarField::int64("failed_count"),
            ],
            index: IndexSpec::Auto,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        let re = identifier_re();
        for name in std::iter::once(&self.name)
            .chain(std::iter::once(&self.primary_field))
            .chain(std::iter::once(&self.vector_field))
            .chain(self.scalar_fields.iter().map(|f| &f.name))
        {
            if !re.is_match(name) {
                return Err(CoreError::InvalidInput(format!(
                    "invalid collection or field name: {:?}",
                    name
                )));
            }
        }
        if self.dim == 0 {
            return Err(CoreError::InvalidInput("vector dim must be > 0".to_string()));
        }
        if !(2..=4).contains(&self.scalar_fields.len()) {
            return Err(CoreError::InvalidInput(format!(
                "collection {} must carry 2-4 scalar fields, got {}",
                self.name,
                self.scalar_fields.len()
            )));
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&ScalarField> {
        self.scalar_fields.iter().find(|f| f.name == name)
    }

    /// Primary key followed by every scalar field.
    pub fn output_fields(&self) -> Vec<String> {
        std::iter::once(self.primary_field.clone())
            .chain(self.scalar_fields.iter().map(|f| f.name.clone()))
            .collect()
    }
}
