//! Sentence embeddings used to address the Qdrant collection.
//!
//! Case records go through [`Embedder::embed_document`] at index time and
//! question text through [`Embedder::embed_query`] at search time. Both sides
//! must come from the same model, otherwise cosine scores are meaningless.

use crate::error::BackendError;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use std::fmt::Display;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL_DIR: &str = "models/bge-small-en-v1.5";
pub const MAX_SEQUENCE_LENGTH: usize = 512;

/// Prefix bge models expect in front of retrieval queries. Documents go in bare.
pub const BGE_QUERY_INSTRUCTION: &str =
    "Represent this sentence for searching relevant passages: ";

pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    fn embed_document(&self, text: &str) -> Result<Vec<f32>, BackendError>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        self.embed_document(text)
    }
}

/// `BAAI/bge-small-en-v1.5` run on the CPU through candle.
///
/// The model directory holds the files published on the Hugging Face hub:
/// `config.json`, `model.safetensors` and `tokenizer.json`. Output is the
/// L2-normalised CLS hidden state.
pub struct BgeEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
}

fn embedding_error(stage: &str, error: impl Display) -> BackendError {
    BackendError::Embedding(format!("{stage}: {error}"))
}

impl BgeEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self, BackendError> {
        let config_path = model_dir.join("config.json");
        let weights_path = model_dir.join("model.safetensors");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&config_path, &weights_path, &tokenizer_path] {
            if !path.is_file() {
                return Err(BackendError::NotConfigured(format!(
                    "embedding model file missing: {}",
                    path.display()
                )));
            }
        }

        let config: Config = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let device = Device::Cpu;

        let weights = std::fs::read(&weights_path)?;
        let vb = VarBuilder::from_buffered_safetensors(weights, DType::F32, &device)
            .map_err(|error| embedding_error("reading weights", error))?;
        let model = BertModel::load(vb, &config)
            .map_err(|error| embedding_error("building model", error))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|error| embedding_error("loading tokenizer", error))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|error| embedding_error("configuring truncation", error))?;

        info!(
            model_dir = %model_dir.display(),
            dimensions = config.hidden_size,
            "embedding model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions: config.hidden_size,
        })
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|error| embedding_error("tokenizing", error))?;

        let hidden = self
            .forward(
                encoding.get_ids(),
                encoding.get_type_ids(),
                encoding.get_attention_mask(),
            )
            .map_err(|error| embedding_error("forward pass", error))?;

        debug!(token_count = encoding.get_ids().len(), "text embedded");
        cls_embedding(&hidden).map_err(|error| embedding_error("pooling", error))
    }

    fn forward(
        &self,
        ids: &[u32],
        type_ids: &[u32],
        attention_mask: &[u32],
    ) -> candle_core::Result<Tensor> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids, &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(attention_mask, &self.device)?.unsqueeze(0)?;
        self.model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
    }
}

impl Embedder for BgeEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        self.encode(text)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        self.encode(&format!("{BGE_QUERY_INSTRUCTION}{text}"))
    }
}

/// First-token hidden state of a `[1, seq, hidden]` tensor, unit length.
fn cls_embedding(hidden: &Tensor) -> candle_core::Result<Vec<f32>> {
    let cls = hidden.i((0, 0))?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
    Ok(l2_normalize(cls))
}

fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in &mut vector {
            *value /= magnitude;
        }
    }
    vector
}

/// Model-free embedder for tests that only need stable vectors.
#[cfg(test)]
pub(crate) mod testing {
    use super::{l2_normalize, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
    use crate::error::BackendError;

    /// Hashed word unigrams plus character trigrams.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct HashingEmbedder {
        pub dimensions: usize,
    }

    impl Default for HashingEmbedder {
        fn default() -> Self {
            Self {
                dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            }
        }
    }

    fn fnv1a(token: &str) -> u64 {
        let mut hash = 1469598103934665603u64;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        hash
    }

    impl Embedder for HashingEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn embed_document(&self, text: &str) -> Result<Vec<f32>, BackendError> {
            let mut vector = vec![0f32; self.dimensions.max(1)];
            let buckets = vector.len() as u64;
            let lowered = text.to_lowercase();

            for word in lowered
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| word.len() > 1)
            {
                vector[(fnv1a(word) % buckets) as usize] += 2.0;
            }

            let chars: Vec<char> = lowered.chars().filter(|c| !c.is_control()).collect();
            for window in chars.windows(3) {
                let token = window.iter().collect::<String>();
                vector[(fnv1a(&token) % buckets) as usize] += 1.0;
            }

            Ok(l2_normalize(vector))
        }
    }
}
