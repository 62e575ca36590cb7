//! Embedding collaborator interface
//!
//! The loader consumes embeddings through [`VectorProvider`]; it never
//! depends on a concrete embedding service. A failing or unavailable
//! provider degrades documents to vector-less, it never fails an import.

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Source of dense vectors for text values
pub trait VectorProvider: Send + Sync {
    /// Embed a text value. `None` means the provider could not produce a
    /// vector; the caller writes the document without one.
    fn embed(&self, text: &str) -> Option<Vec<f32>>;

    fn is_available(&self) -> bool;

    /// Dimensionality of produced vectors
    fn dimensions(&self) -> usize;
}

/// Deterministic hash-based vectors, used when no real embedding service
/// is wired in. Not semantically meaningful, but stable per input and
/// normalized, which is enough for pipeline plumbing and tests.
pub struct HashVectorProvider {
    dims: usize,
}

impl HashVectorProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

impl Default for HashVectorProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl VectorProvider for HashVectorProvider {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if text.is_empty() {
            return None;
        }
        let bytes = text.as_bytes();
        let mut vector: Vec<f32> = (0..self.dims)
            .map(|i| {
                let h = xxh3_64_with_seed(bytes, i as u64);
                // Map the hash onto [-1, 1]
                (h as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect();

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        debug!("Generated hash-based vector ({} dims)", self.dims);
        Some(vector)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Provider representing a missing embedding service
pub struct UnavailableProvider;

impl VectorProvider for UnavailableProvider {
    fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }

    fn dimensions(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_vectors_are_deterministic() {
        let provider = HashVectorProvider::new(64);
        let a = provider.embed("北京").unwrap();
        let b = provider.embed("北京").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_vectors_differ_by_input() {
        let provider = HashVectorProvider::new(64);
        assert_ne!(provider.embed("alpha").unwrap(), provider.embed("beta").unwrap());
    }

    #[test]
    fn test_hash_vectors_are_normalized() {
        let provider = HashVectorProvider::default();
        let v = provider.embed("some text").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_text_yields_no_vector() {
        assert!(HashVectorProvider::default().embed("").is_none());
    }

    #[test]
    fn test_unavailable_provider() {
        let provider = UnavailableProvider;
        assert!(!provider.is_available());
        assert!(provider.embed("anything").is_none());
    }
}
