use super::filter::ScalarFilter;
use super::schema::{CollectionPolicy, CollectionSchema};
use super::{ScalarValue, SearchHit, StoredEntity, VectorRecord, VectorStore};
use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Row {
    id: String,
    vector: Vec<f32>,
    fields: BTreeMap<String, ScalarValue>,
}

/// Brute-force cosine store with the same visibility rules as the managed
/// database: inserted rows become durable on `flush` and searchable on `load`.
pub struct InMemoryVectorStore {
    schema: CollectionSchema,
    created: bool,
    pending: Vec<Row>,
    flushed: Vec<Row>,
    loaded: Option<Vec<Row>>,
}

impl InMemoryVectorStore {
    pub fn new(schema: CollectionSchema) -> Self {
        Self {
            schema,
            created: false,
            pending: Vec::new(),
            flushed: Vec::new(),
            loaded: None,
        }
    }

    fn require_created(&self) -> CoreResult<()> {
        if !self.created {
            return Err(CoreError::InvalidInput(format!(
                "collection {} does not exist",
                self.schema.name
            )));
        }
        Ok(())
    }

    /// An empty collection reads as `[]` whether or not it was loaded.
    fn loaded_rows(&self) -> CoreResult<&[Row]> {
        self.require_created()?;
        match &self.loaded {
            Some(rows) => Ok(rows),
            None if self.flushed.is_empty() => Ok(&[]),
            None => Err(CoreError::InvalidInput(format!(
                "collection {} not loaded",
                self.schema.name
            ))),
        }
    }
}

impl VectorStore for InMemoryVectorStore {
    fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    fn ensure_collection(&mut self, policy: CollectionPolicy) -> CoreResult<()> {
        self.schema.validate()?;
        if self.created && policy == CollectionPolicy::DropAndRecreate {
            tracing::warn!(collection = %self.schema.name, "dropping existing collection");
            self.pending.clear();
            self.flushed.clear();
            self.loaded = None;
        }
        self.created = true;
        Ok(())
    }

    fn insert(&mut self, records: &[VectorRecord]) -> CoreResult<usize> {
        self.require_created()?;
        // Validate the whole batch before accepting any row.
        let mut rows = Vec::with_capacity(records.len());
        for r in records {
            rows.push(Row {
                id: r.id.clone(),
                vector: r.vector.clone(),
                fields: r.normalized_fields(&self.schema)?,
            });
        }
        let n = rows.len();
        self.pending.extend(rows);
        Ok(n)
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.require_created()?;
        self.flushed.append(&mut self.pending);
        Ok(())
    }

    fn load(&mut self) -> CoreResult<()> {
        self.require_created()?;
        self.loaded = Some(self.flushed.clone());
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
        let rows = self.loaded_rows()?;
        let mut scored: Vec<(f32, &Row)> = rows
            .iter()
            .map(|r| (cosine_similarity(vector, &r.vector), r))
            .collect();
        // Stable sort keeps insertion order among ties.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, r)| SearchHit {
                incident_id: r.id.clone(),
                fields: r.fields.clone(),
                score,
            })
            .collect())
    }

    fn query_by_filter(&self, filter: &ScalarFilter, limit: usize) -> CoreResult<Vec<StoredEntity>> {
        // Validates field names the same way the remote path does.
        filter.to_expr(&self.schema)?;
        let rows = self.loaded_rows()?;
        Ok(rows
            .iter()
            .filter(|r| filter.matches(&r.fields))
            .take(limit)
            .map(|r| StoredEntity {
                incident_id: r.id.clone(),
                fields: r.fields.clone(),
            })
            .collect())
    }

    fn num_entities(&self) -> CoreResult<u64> {
        self.require_created()?;
        Ok(self.flushed.len() as u64)
    }
}

/// Zero-norm vectors score 0.0 against everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryVectorStore {
        let mut s = InMemoryVectorStore::new(CollectionSchema::login_incidents("siem_incidents", 3));
        s.ensure_collection(CollectionPolicy::ReuseExisting).unwrap();
        s
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn rows_are_invisible_until_flush_and_load() {
        let mut s = store();
        s.load().unwrap();
        s.insert(&[VectorRecord::new("a", vec![1.0, 0.0, 0.0])]).unwrap();
        assert!(s.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
        s.flush().unwrap();
        assert_eq!(s.num_entities().unwrap(), 1);
        assert!(s.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
        s.load().unwrap();
        assert_eq!(s.search(&[1.0, 0.0, 0.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn empty_collection_searches_to_nothing_without_load() {
        let mut s = store();
        assert!(s.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
        assert!(s
            .query_by_filter(&ScalarFilter::incidents(Some("10.0.0.1"), None), 10)
            .unwrap()
            .is_empty());

        s.insert(&[VectorRecord::new("a", vec![1.0, 0.0, 0.0])]).unwrap();
        s.flush().unwrap();
        assert!(s.search(&[1.0, 0.0, 0.0], 5).is_err());
    }

    #[test]
    fn search_on_missing_collection_is_an_error() {
        let s = InMemoryVectorStore::new(CollectionSchema::login_incidents("siem_incidents", 3));
        assert!(s.search(&[1.0, 0.0, 0.0], 5).is_err());
    }

    #[test]
    fn bad_row_rejects_whole_batch() {
        let mut s = store();
        let batch = [
            VectorRecord::new("a", vec![1.0, 0.0, 0.0]),
            VectorRecord::new("b", vec![1.0, 0.0]),
        ];
        assert!(s.insert(&batch).is_err());
        s.flush().unwrap();
        assert_eq!(s.num_entities().unwrap(), 0);
    }

    #[test]
    fn reuse_keeps_rows_and_drop_clears_them() {
        let mut s = store();
        s.insert_and_publish(&[VectorRecord::new("a", vec![1.0, 0.0, 0.0])])
            .unwrap();
        s.ensure_collection(CollectionPolicy::ReuseExisting).unwrap();
        assert_eq!(s.num_entities().unwrap(), 1);
        s.ensure_collection(CollectionPolicy::DropAndRecreate).unwrap();
        assert_eq!(s.num_entities().unwrap(), 0);
    }

    #[test]
    fn duplicate_ids_are_not_rejected() {
        let mut s = store();
        let rec = VectorRecord::new("dup", vec![0.0, 1.0, 0.0]);
        s.insert_and_publish(&[rec.clone(), rec]).unwrap();
        assert_eq!(s.num_entities().unwrap(), 2);
    }
}
