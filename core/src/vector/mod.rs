//! Vector store seam: one named collection, cosine similarity, and a separate
//! exact-match path over scalar fields.

pub mod filter;
pub mod memory;
pub mod milvus;
pub mod schema;

use crate::classify::MalwareEvent;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use filter::ScalarFilter;
pub use memory::InMemoryVectorStore;
pub use milvus::{MilvusConfig, MilvusRestStore};
pub use schema::{CollectionPolicy, CollectionSchema, IndexSpec, ScalarField, ScalarKind};
use schema::PRIMARY_KEY_MAX_LENGTH;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScalarValue {
    Int(i64),
    Str(String),
}

impl ScalarValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(s) => Some(s),
            ScalarValue::Int(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(i) => Some(*i),
            ScalarValue::Str(_) => None,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Int(i)
    }
}

/// A row bound for the store: primary key, vector and scalar metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub fields: BTreeMap<String, ScalarValue>,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<ScalarValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn from_malware_event(event: &MalwareEvent, vector: Vec<f32>) -> Self {
        Self::new(event.incident_id.clone(), vector)
            .with_field("malware_type", event.malware_type.as_str())
            .with_field("summary", event.summary.as_str())
            .with_field("raw", event.raw.as_str())
    }

    /// Scalar values for every schema field, missing ones defaulted to `""`/`0`.
    ///
    /// Rejects a wrong vector length, an oversized primary key, a VARCHAR over
    /// its limit (in UTF-8 bytes), or a value of the wrong kind. The store
    /// would refuse them.
    pub fn normalized_fields(
        &self,
        schema: &CollectionSchema,
    ) -> CoreResult<BTreeMap<String, ScalarValue>> {
        if self.vector.len() != schema.dim {
            return Err(CoreError::InvalidInput(format!(
                "record {} has vector length {}, collection {} expects {}",
                self.id,
                self.vector.len(),
                schema.name,
                schema.dim
            )));
        }
        if self.id.is_empty() || self.id.len() > PRIMARY_KEY_MAX_LENGTH as usize {
            return Err(CoreError::InvalidInput(format!(
                "primary key {:?} must be 1-{} bytes",
                self.id,
                PRIMARY_KEY_MAX_LENGTH
            )));
        }
        let mut out = BTreeMap::new();
        for field in &schema.scalar_fields {
            let value = match (field.kind, self.fields.get(&field.name)) {
                (ScalarKind::VarChar { .. }, None) => ScalarValue::Str(String::new()),
                (ScalarKind::Int64, None) => ScalarValue::Int(0),
                (ScalarKind::VarChar { max_length }, Some(ScalarValue::Str(s))) => {
                    if s.len() > max_length as usize {
                        return Err(CoreError::InvalidInput(format!(
                            "field {} of record {} is {} bytes, over max_length {}",
                            field.name,
                            self.id,
                            s.len(),
                            max_length
                        )));
                    }
                    ScalarValue::Str(s.clone())
                }
                (ScalarKind::Int64, Some(ScalarValue::Int(i))) => ScalarValue::Int(*i),
                (_, Some(other)) => {
                    return Err(CoreError::InvalidInput(format!(
                        "field {} of record {} has wrong type: {:?}",
                        field.name, self.id, other
                    )))
                }
            };
            out.insert(field.name.clone(), value);
        }
        Ok(out)
    }
}

/// A stored entity returned by the scalar filter path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEntity {
    pub incident_id: String,
    pub fields: BTreeMap<String, ScalarValue>,
}

/// One neighbour from a similarity search. Higher score is more similar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub incident_id: String,
    pub fields: BTreeMap<String, ScalarValue>,
    pub score: f32,
}

impl SearchHit {
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).and_then(|v| v.as_str()).unwrap_or("")
    }

    pub fn int(&self, name: &str) -> i64 {
        self.fields.get(name).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    /// `malware_type`, else `incident_type`, else `unknown`.
    pub fn label(&self) -> &str {
        ["malware_type", "incident_type"]
            .iter()
            .map(|f| self.text(f))
            .find(|s| !s.is_empty())
            .unwrap_or("unknown")
    }

    pub fn summary(&self) -> &str {
        self.text("summary")
    }

    pub fn raw(&self) -> &str {
        self.text("raw")
    }
}

pub trait VectorStore {
    fn schema(&self) -> &CollectionSchema;

    /// Create the collection (and its cosine index) if needed, per `policy`.
    fn ensure_collection(&mut self, policy: CollectionPolicy) -> CoreResult<()>;

    /// Returns the number of rows accepted. Not searchable before flush + load.
    fn insert(&mut self, records: &[VectorRecord]) -> CoreResult<usize>;

    fn flush(&mut self) -> CoreResult<()>;

    fn load(&mut self) -> CoreResult<()>;

    /// Up to `top_k` hits, descending cosine score. A freshly created, empty
    /// collection gives `[]` without an explicit `load`; rows inserted since
    /// the last `load` are not visible.
    fn search(&self, vector: &[f32], top_k: usize) -> CoreResult<Vec<SearchHit>>;

    fn query_by_filter(&self, filter: &ScalarFilter, limit: usize) -> CoreResult<Vec<StoredEntity>>;

    fn num_entities(&self) -> CoreResult<u64>;

    /// insert, flush, load.
    fn insert_and_publish(&mut self, records: &[VectorRecord]) -> CoreResult<usize> {
        if records.is_empty() {
            tracing::warn!(collection = %self.schema().name, "no records to insert");
            return Ok(0);
        }
        let n = self.insert(records)?;
        self.flush()?;
        self.load()?;
        tracing::info!(collection = %self.schema().name, inserted = n, "records published");
        Ok(n)
    }
}

impl<S: VectorStore + ?Sized> VectorStore for Box<S> {
    fn schema(&self) -> &CollectionSchema {
        (**self).schema()
    }

    fn ensure_collection(&mut self, policy: CollectionPolicy) -> CoreResult<()> {
        (**self).ensure_collection(policy)
    }

    fn insert(&mut self, records: &[VectorRecord]) -> CoreResult<usize> {
        (**self).insert(records)
    }

    fn flush(&mut self) -> CoreResult<()> {
        (**self).flush()
    }

    fn load(&mut self) -> CoreResult<()> {
        (**self).load()
    }

    fn search(&self, vector: &[f32], top_k: usize) -> CoreResult<Vec<SearchHit>> {
        (**self).search(vector, top_k)
    }

    fn query_by_filter(&self, filter: &ScalarFilter, limit: usize) -> CoreResult<Vec<StoredEntity>> {
        (**self).query_by_filter(filter, limit)
    }

    fn num_entities(&self) -> CoreResult<u64> {
        (**self).num_entities()
    }
}
