//! Local sentence embeddings with all-MiniLM-L6-v2 via candle.
//!
//! Produces 384-dimensional L2-normalised vectors: the same model KeyBERT
//! uses by default.

use crate::domain::ports::Embedder;
use crate::utils::error::{DocError, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, HiddenAct, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

const REVISION: &str = "main";
const MAX_SEQUENCE_LENGTH: usize = 512;

fn model_error(context: &str, e: impl std::fmt::Display) -> DocError {
    DocError::EmbeddingError {
        message: format!("{}: {}", context, e),
    }
}

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl MiniLmEmbedder {
    /// Downloads (or reuses the cached copy of) the model from the Hugging Face hub.
    /// Blocking; call from `spawn_blocking` inside async code.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        tracing::info!("📦 Loading embedding model {}", model_id);
        let api = Api::new().map_err(|e| model_error("Failed to create HF API", e))?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            REVISION.to_string(),
        ));

        let config_path = repo
            .get("config.json")
            .map_err(|e| model_error("Failed to download config", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| model_error("Failed to download tokenizer", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| model_error("Failed to download weights", e))?;

        let config_str = std::fs::read_to_string(&config_path)?;
        let mut config: Config = serde_json::from_str(&config_str)?;
        // MiniLM 使用 gelu
        config.hidden_act = HiddenAct::Gelu;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| model_error("Failed to load tokenizer", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| model_error("Failed to set truncation", e))?;

        // SAFETY: the safetensors file is owned by the hub cache and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| model_error("Failed to load weights", e))?
        };
        let model = BertModel::load(vb, &config).map_err(|e| model_error("Failed to build model", e))?;

        tracing::info!("✅ Embedding model ready: {}", model_id);
        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn forward(&self, texts: &[&str]) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(candle_core::Error::msg)?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut ids = Vec::with_capacity(batch_size * seq_len);
        let mut mask = Vec::with_capacity(batch_size * seq_len);
        let mut type_ids = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            ids.extend(encoding.get_ids().iter().map(|&x| x as i64));
            mask.extend(encoding.get_attention_mask().iter().map(|&x| x as i64));
            type_ids.extend(encoding.get_type_ids().iter().map(|&x| x as i64));
        }

        let input_ids = Tensor::from_vec(ids, (batch_size, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch_size, seq_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(type_ids, (batch_size, seq_len), &self.device)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // attention mask 加權的平均池化
        let mask = attention_mask
            .unsqueeze(2)?
            .to_dtype(DTYPE)?
            .broadcast_as(hidden.shape())?;
        let summed = hidden.mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = summed.div(&counts)?;

        let norm = pooled
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12, f64::MAX)?;
        pooled.broadcast_div(&norm)?.to_vec2::<f32>()
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.forward(texts).map_err(|e| model_error("Embedding forward pass failed", e))
    }
}
