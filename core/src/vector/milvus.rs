//! Milvus / Zilliz Cloud over the v2 REST API.

use super::filter::ScalarFilter;
use super::schema::{CollectionPolicy, CollectionSchema, IndexSpec, ScalarKind, PRIMARY_KEY_MAX_LENGTH};
use super::{ScalarValue, SearchHit, StoredEntity, VectorRecord, VectorStore};
use crate::error::{CoreError, CoreResult};
use crate::http::{build_client, check_status, join_url};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MilvusConfig {
    /// REST endpoint, e.g. `https://in03-xxx.zillizcloud.com` or `http://localhost:19530`.
    pub uri: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

pub struct MilvusRestStore {
    config: MilvusConfig,
    schema: CollectionSchema,
    client: Client,
}

impl MilvusRestStore {
    pub fn connect(config: MilvusConfig, schema: CollectionSchema) -> CoreResult<Self> {
        schema.validate()?;
        let client = build_client(config.timeout)?;
        tracing::info!(uri = %config.uri, collection = %schema.name, "milvus client ready");
        Ok(Self {
            config,
            schema,
            client,
        })
    }

    fn call(&self, path: &str, body: Value) -> CoreResult<Value> {
        let url = join_url(&self.config.uri, path);
        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            req = req.bearer_auth(token);
        }
        let resp = check_status("milvus", req.send()?)?;
        let env: Envelope = resp.json()?;
        if env.code != 0 {
            return Err(CoreError::remote(
                "milvus",
                None,
                format!(
                    "{} failed with code {}: {}",
                    path,
                    env.code,
                    env.message.unwrap_or_default()
                ),
            ));
        }
        Ok(env.data)
    }

    fn has_collection(&self) -> CoreResult<bool> {
        let data = self.call(
            "/v2/vectordb/collections/has",
            json!({ "collectionName": self.schema.name }),
        )?;
        Ok(data.get("has").and_then(Value::as_bool).unwrap_or(false))
    }
}

/// Request body for `collections/create`, index included.
pub fn create_collection_body(schema: &CollectionSchema) -> Value {
    let mut fields = vec![
        json!({
            "fieldName": schema.primary_field,
            "dataType": "VarChar",
            "isPrimary": true,
            "elementTypeParams": { "max_length": PRIMARY_KEY_MAX_LENGTH }
        }),
        json!({
            "fieldName": schema.vector_field,
            "dataType": "FloatVector",
            "elementTypeParams": { "dim": schema.dim }
        }),
    ];
    for f in &schema.scalar_fields {
        fields.push(match f.kind {
            ScalarKind::VarChar { max_length } => json!({
                "fieldName": f.name,
                "dataType": "VarChar",
                "elementTypeParams": { "max_length": max_length }
            }),
            ScalarKind::Int64 => json!({
                "fieldName": f.name,
                "dataType": "Int64"
            }),
        });
    }
    let (index_type, params) = match schema.index {
        IndexSpec::Auto => ("AUTOINDEX", json!({})),
        IndexSpec::Hnsw { m, ef_construction } => {
            ("HNSW", json!({ "M": m, "efConstruction": ef_construction }))
        }
    };
    json!({
        "collectionName": schema.name,
        "description": schema.description,
        "schema": {
            "autoId": false,
            "enableDynamicField": false,
            "fields": fields
        },
        "indexParams": [{
            "fieldName": schema.vector_field,
            "indexName": format!("{}_idx", schema.vector_field),
            "metricType": "COSINE",
            "indexType": index_type,
            "params": params
        }]
    })
}

/// Row objects for `entities/insert`. Each row carries its own id, vector
/// and metadata, so columns cannot drift out of alignment.
pub fn insert_rows(schema: &CollectionSchema, records: &[VectorRecord]) -> CoreResult<Vec<Value>> {
    let mut rows = Vec::with_capacity(records.len());
    for r in records {
        let fields = r.normalized_fields(schema)?;
        let mut row = Map::new();
        row.insert(schema.primary_field.clone(), Value::String(r.id.clone()));
        row.insert(schema.vector_field.clone(), json!(r.vector));
        for (k, v) in fields {
            row.insert(k, serde_json::to_value(v)?);
        }
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

pub fn search_params(index: IndexSpec) -> Value {
    match index {
        IndexSpec::Auto => json!({ "metricType": "COSINE", "params": { "nprobe": 10 } }),
        IndexSpec::Hnsw { .. } => json!({ "metricType": "COSINE", "params": { "ef": 128 } }),
    }
}

fn entity_fields(schema: &CollectionSchema, obj: &Map<String, Value>) -> BTreeMap<String, ScalarValue> {
    let mut fields = BTreeMap::new();
    for f in &schema.scalar_fields {
        let value = match (f.kind, obj.get(&f.name)) {
            (ScalarKind::Int64, Some(v)) => ScalarValue::Int(v.as_i64().unwrap_or(0)),
            (ScalarKind::Int64, None) => ScalarValue::Int(0),
            (ScalarKind::VarChar { .. }, Some(Value::String(s))) => ScalarValue::Str(s.clone()),
            (ScalarKind::VarChar { .. }, _) => ScalarValue::Str(String::new()),
        };
        fields.insert(f.name.clone(), value);
    }
    fields
}

fn entity_id(schema: &CollectionSchema, obj: &Map<String, Value>) -> String {
    obj.get(&schema.primary_field)
        .or_else(|| obj.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parse `entities/search` data. Order is kept as returned (descending score).
pub fn parse_search_hits(schema: &CollectionSchema, data: &Value) -> Vec<SearchHit> {
    let Some(items) = data.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| SearchHit {
            incident_id: entity_id(schema, obj),
            fields: entity_fields(schema, obj),
            score: obj.get("distance").and_then(Value::as_f64).unwrap_or(0.0) as f32,
        })
        .collect()
}

impl VectorStore for MilvusRestStore {
    fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    fn ensure_collection(&mut self, policy: CollectionPolicy) -> CoreResult<()> {
        let exists = self.has_collection()?;
        if exists {
            match policy {
                CollectionPolicy::ReuseExisting => {
                    tracing::info!(collection = %self.schema.name, "reusing existing collection");
                    return Ok(());
                }
                CollectionPolicy::DropAndRecreate => {
                    tracing::warn!(collection = %self.schema.name, "dropping existing collection");
                    self.call(
                        "/v2/vectordb/collections/drop",
                        json!({ "collectionName": self.schema.name }),
                    )?;
                }
            }
        }
        self.call(
            "/v2/vectordb/collections/create",
            create_collection_body(&self.schema),
        )?;
        tracing::info!(
            collection = %self.schema.name,
            index = ?self.schema.index,
            "created collection with cosine index"
        );
        Ok(())
    }

    fn insert(&mut self, records: &[VectorRecord]) -> CoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let rows = insert_rows(&self.schema, records)?;
        let data = self.call(
            "/v2/vectordb/entities/insert",
            json!({ "collectionName": self.schema.name, "data": rows }),
        )?;
        let count = data
            .get("insertCount")
            .and_then(Value::as_u64)
            .unwrap_or(records.len() as u64) as usize;
        tracing::debug!(collection = %self.schema.name, count, "inserted rows");
        Ok(count)
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.call(
            "/v2/vectordb/collections/flush",
            json!({ "collectionName": self.schema.name }),
        )?;
        Ok(())
    }

    fn load(&mut self) -> CoreResult<()> {
        self.call(
            "/v2/vectordb/collections/load",
            json!({ "collectionName": self.schema.name }),
        )?;
        tracing::debug!(collection = %self.schema.name, "collection loaded into memory");
        Ok(())
    }

    fn search(&self, vector: &[f32], top_k: usize) -> CoreResult<Vec<SearchHit>> {
        if vector.len() != self.schema.dim {
            return Err(CoreError::InvalidInput(format!(
                "query vector length {} does not match dim {}",
                vector.len(),
                self.schema.dim
            )));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let data = self.call(
            "/v2/vectordb/entities/search",
            json!({
                "collectionName": self.schema.name,
                "data": [vector],
                "annsField": self.schema.vector_field,
                "limit": top_k,
                "outputFields": self.schema.output_fields(),
                "searchParams": search_params(self.schema.index)
            }),
        )?;
        let hits = parse_search_hits(&self.schema, &data);
        tracing::info!(collection = %self.schema.name, hits = hits.len(), "similarity search");
        Ok(hits)
    }

    fn query_by_filter(&self, filter: &ScalarFilter, limit: usize) -> CoreResult<Vec<StoredEntity>> {
        let expr = filter.to_expr(&self.schema)?;
        let data = self.call(
            "/v2/vectordb/entities/query",
            json!({
                "collectionName": self.schema.name,
                "filter": expr,
                "outputFields": self.schema.output_fields(),
                "limit": limit
            }),
        )?;
        let rows: Vec<StoredEntity> = data
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|obj| StoredEntity {
                        incident_id: entity_id(&self.schema, obj),
                        fields: entity_fields(&self.schema, obj),
                    })
                    .collect()
            })
            .unwrap_or_default();
        tracing::info!(collection = %self.schema.name, filter = %expr, rows = rows.len(), "filter query");
        Ok(rows)
    }

    fn num_entities(&self) -> CoreResult<u64> {
        let data = self.call(
            "/v2/vectordb/collections/get_stats",
            json!({ "collectionName": self.schema.name }),
        )?;
        Ok(data.get("rowCount").and_then(Value::as_u64).unwrap_or(0))
    }
}
