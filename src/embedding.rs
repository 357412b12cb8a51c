//! Sentence embedding backends for the ingredient semantic axes.
//!
//! The default backend is a deterministic feature-hashing embedder, so the
//! pipeline runs offline with no model download and produces identical
//! vectors on every run. The `with-bert` feature swaps in a rust-bert
//! sentence-transformer for production-quality axis scores.

use std::hash::{Hash, Hasher};

use anyhow::Result;
use rustc_hash::FxHasher;

/// Default dimensionality for the hashing embedder.
pub const DEFAULT_DIM: usize = 256;

/// Batch text encoder. Implementations must be usable from rayon workers.
pub trait Embedder: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Compute cosine similarity between two vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Signed feature-hashing embedder over character trigrams and word
/// unigrams.
///
/// Similar strings share n-grams and therefore land close in the hashed
/// space, which is enough for the clustering and axis-scoring stages to
/// behave sensibly, while staying fully deterministic.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dim];
        let lowered = text.to_lowercase();

        for token in lowered.split_whitespace() {
            self.bump(&mut vector, token);
            let chars: Vec<char> = token.chars().collect();
            if chars.len() >= 3 {
                for window in chars.windows(3) {
                    self.bump(&mut vector, &window.iter().collect::<String>());
                }
            }
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn bump(&self, vector: &mut [f32], feature: &str) {
        let mut hasher = FxHasher::default();
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let index = (h % self.dim as u64) as usize;
        // One hash bit decides the sign, the classic hashing trick.
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        vector[index] += sign;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl Embedder for HashEmbedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(feature = "with-bert")]
pub use bert::BertEmbedder;

#[cfg(feature = "with-bert")]
mod bert {
    use std::sync::Mutex;

    use anyhow::{Context, Result};
    use rust_bert::pipelines::sentence_embeddings::{
        SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
    };

    use super::Embedder;

    /// Sentence-transformer embedder running on CPU.
    pub struct BertEmbedder {
        model: Mutex<SentenceEmbeddingsModel>,
    }

    impl std::fmt::Debug for BertEmbedder {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("BertEmbedder")
                .field("model", &"<SentenceEmbeddingsModel>")
                .finish()
        }
    }

    impl BertEmbedder {
        /// Initialize the embedding model.
        /// This might take a while to download the model on first run.
        pub fn new() -> Result<Self> {
            // Model creation is blocking and heavy, keep it off the caller's stack.
            let model = std::thread::spawn(|| {
                SentenceEmbeddingsBuilder::remote(SentenceEmbeddingsModelType::AllMiniLmL12V2)
                    .create_model()
            })
            .join()
            .map_err(|_| anyhow::anyhow!("Failed to join model creation thread"))??;

            Ok(Self {
                model: Mutex::new(model),
            })
        }
    }

    impl Embedder for BertEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let model = self
                .model
                .lock()
                .map_err(|_| anyhow::anyhow!("embedding model lock poisoned"))?;
            model.encode(texts).context("Failed to encode texts")
        }
    }
}
