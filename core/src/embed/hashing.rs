use super::client::TextEmbedder;
use crate::error::CoreResult;
use sha2::{Digest, Sha256};

/// Offline feature-hashing embedder.
///
/// Lowercased alphanumeric tokens are hashed into `dim` signed buckets and the
/// result is L2-normalised, so texts sharing tokens get a positive cosine.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl TextEmbedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "feature-hashing-sha256"
    }

    fn embed_raw(&mut self, text: &str) -> CoreResult<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];
        let lower = text.to_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let mut idx_bytes = [0u8; 8];
            idx_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(idx_bytes) % self.dim as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}
