//! Sentence embeddings via Candle (pure Rust, no Python).
//!
//! The embedding provider is an external collaborator as far as the rest of
//! the crate is concerned: everything downstream depends on the [`Embedder`]
//! trait, and tests substitute deterministic implementations. The production
//! implementation is `sentence-transformers/all-MiniLM-L6-v2` (384-d),
//! fetched from the Hugging Face Hub, mean-pooled and L2-normalized.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;
use tracing::info;

use crate::error::{ClerkError, Result};

/// Output dimension of all-MiniLM-L6-v2. Fixed for the lifetime of an index.
pub const EMBEDDING_DIM: usize = 384;

const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Maps a text string to a fixed-length vector. Deterministic per model.
pub trait Embedder {
    /// Embed `text`. Fails with [`ClerkError::Embedding`] if the input is
    /// blank or the model cannot produce a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of every vector this embedder produces.
    fn dimension(&self) -> usize;
}

/// BERT sentence-embedding model running on CPU.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceEmbedder {
    /// Load model weights, config, and tokenizer from the Hugging Face Hub
    /// (cached locally after the first run).
    pub fn load() -> Result<Self> {
        let device = Device::Cpu;
        info!("loading embedding model {MODEL_ID}");

        let repo = Repo::with_revision(MODEL_ID.to_string(), RepoType::Model, "main".to_string());
        let api = Api::new().map_err(|e| ClerkError::Embedding(e.to_string()))?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo
            .get("config.json")
            .map_err(|e| ClerkError::Embedding(e.to_string()))?;
        let tokenizer_filename = api_repo
            .get("tokenizer.json")
            .map_err(|e| ClerkError::Embedding(e.to_string()))?;
        let weights_filename = api_repo
            .get("model.safetensors")
            .map_err(|e| ClerkError::Embedding(e.to_string()))?;

        let config = std::fs::read_to_string(config_filename)?;
        let config: Config = serde_json::from_str(&config)?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| ClerkError::Embedding(format!("failed to load tokenizer: {e}")))?;

        // SAFETY: the safetensors file was just fetched from the hub and is
        // not modified while mapped.
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Mean pooling over token embeddings, weighted by the attention mask.
    fn mean_pooling(&self, embeddings: &Tensor, attention_mask: &[u32]) -> Result<Tensor> {
        // embeddings: [1, seq_len, hidden]; mask broadcast as [1, seq_len, 1]
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let masked = embeddings.broadcast_mul(&mask)?;
        let sum = masked.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;
        let mean = sum.broadcast_div(&count)?;

        Ok(mean.squeeze(0)?)
    }

    fn normalize(&self, tensor: &Tensor) -> Result<Tensor> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Embedder for SentenceEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ClerkError::Embedding("cannot embed empty input".to_string()));
        }

        // Tokenizer truncates at 512 tokens.
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClerkError::Embedding(format!("tokenization error: {e}")))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;

        let embedding = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let embedding = self.normalize(&embedding)?;

        Ok(embedding.to_vec1::<f32>()?)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}
