use crate::error::CoreResult;

pub const DEFAULT_VECTOR_DIM: usize = 384;

/// The embedding model itself. Same text must give the same vector.
pub trait TextEmbedder {
    fn model_name(&self) -> &str;
    fn embed_raw(&mut self, text: &str) -> CoreResult<Vec<f32>>;
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for Box<T> {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn embed_raw(&mut self, text: &str) -> CoreResult<Vec<f32>> {
        (**self).embed_raw(text)
    }
}

/// Coerces model output to the collection dimension.
pub struct EmbeddingClient<M: TextEmbedder> {
    model: M,
    dim: usize,
}

impl<M: TextEmbedder> EmbeddingClient<M> {
    pub fn new(model: M, dim: usize) -> Self {
        Self { model, dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Blank text short-circuits to a zero vector without touching the model.
    pub fn embed(&mut self, text: &str) -> CoreResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dim]);
        }
        let raw = self.model.embed_raw(text)?;
        if raw.len() != self.dim {
            tracing::debug!(
                model = self.model.model_name(),
                native_dim = raw.len(),
                dim = self.dim,
                "coercing embedding length"
            );
        }
        Ok(fit_dimension(raw, self.dim))
    }
}

pub fn fit_dimension(mut v: Vec<f32>, dim: usize) -> Vec<f32> {
    v.resize(dim, 0.0);
    v
}
