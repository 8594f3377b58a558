//! Local sentence embeddings through ONNX Runtime
//!
//! Runs `sentence-transformers/all-MiniLM-L6-v2` (384 dimensions). The model
//! and tokenizer are fetched from HuggingFace once and cached on disk.

use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{DynValue, Tensor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;

use hopeline_core::{Embedder, Error, Result};

const HF_BASE_URL: &str = "https://huggingface.co/sentence-transformers";

/// Settings for the ONNX embedder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name under the `sentence-transformers` organisation
    pub model: String,
    pub cache_dir: PathBuf,
    pub dimensions: usize,
    /// Token limit per text; longer input is truncated
    pub max_length: usize,
    pub batch_size: usize,
}

impl EmbeddingConfig {
    pub const DEFAULT_MODEL: &'static str = "all-MiniLM-L6-v2";
    pub const DEFAULT_CACHE_DIR: &'static str = ".cache/embeddings";

    /// Defaults, with the cache directory taken from `EMBEDDING_CACHE_DIR`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var("EMBEDDING_CACHE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            config.cache_dir = PathBuf::from(dir);
        }
        config
    }

    /// Fully qualified model name, as recorded in persisted indexes
    pub fn qualified_model(&self) -> String {
        format!("sentence-transformers/{}", self.model)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            cache_dir: PathBuf::from(Self::DEFAULT_CACHE_DIR),
            dimensions: 384,
            max_length: 256,
            batch_size: 32,
        }
    }
}

struct EmbedderInner {
    session: Session,
    tokenizer: Tokenizer,
    dimensions: usize,
    max_length: usize,
    batch_size: usize,
}

/// Sentence embedder backed by an ONNX Runtime session
///
/// Inference is synchronous and runs on the blocking thread pool. The session
/// sits behind a mutex, so concurrent callers embed one batch at a time.
pub struct OnnxEmbedder {
    inner: Arc<Mutex<EmbedderInner>>,
    model_name: String,
}

impl OnnxEmbedder {
    /// Load the embedder, downloading model files into the cache if needed
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!(model = %config.model, cache = %config.cache_dir.display(), "Initializing ONNX embedder");

        let model_dir = config.cache_dir.join(&config.model);
        tokio::fs::create_dir_all(&model_dir).await.map_err(|e| {
            Error::Configuration(format!(
                "Failed to create embedding cache {}: {}",
                model_dir.display(),
                e
            ))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let dimensions = config.dimensions;
        let max_length = config.max_length;
        let batch_size = config.batch_size.max(1);

        let inner = tokio::task::spawn_blocking(move || -> Result<EmbedderInner> {
            let session = Session::builder()
                .map_err(|e| Error::Embedding(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| Error::Embedding(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(4)
                .map_err(|e| Error::Embedding(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Embedding(format!("Failed to load model: {}", e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Embedding(format!("Failed to load tokenizer: {}", e)))?;

            Ok(EmbedderInner {
                session,
                tokenizer,
                dimensions,
                max_length,
                batch_size,
            })
        })
        .await
        .map_err(|e| Error::Other(format!("Task join error: {}", e)))??;

        tracing::info!("ONNX embedder ready");

        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            model_name: config.qualified_model(),
        })
    }

    async fn embed_owned(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut inner = inner
                .lock()
                .map_err(|_| Error::Embedding("Embedder session poisoned".to_string()))?;
            inner.embed(&texts)
        })
        .await
        .map_err(|e| Error::Other(format!("Task join error: {}", e)))?
    }
}

impl EmbedderInner {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_batch(batch)?);
        }
        Ok(embeddings)
    }

    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("Tokenization failed: {}", e)))?;

        let rows = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len().min(self.max_length))
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(rows * seq_len);
        let mut attention_mask = Vec::with_capacity(rows * seq_len);
        let mut token_type_ids = Vec::with_capacity(rows * seq_len);
        for encoding in &encodings {
            pad_row(&mut input_ids, encoding.get_ids(), seq_len);
            pad_row(&mut attention_mask, encoding.get_attention_mask(), seq_len);
            pad_row(&mut token_type_ids, encoding.get_type_ids(), seq_len);
        }

        let inputs = vec![
            ("input_ids", input_tensor(input_ids, rows, seq_len)?),
            ("attention_mask", input_tensor(attention_mask.clone(), rows, seq_len)?),
            ("token_type_ids", input_tensor(token_type_ids, rows, seq_len)?),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::Embedding(format!("Inference failed: {}", e)))?;

        // Sentence-transformers exports name the token states `last_hidden_state`
        let (_, hidden) = outputs
            .iter()
            .find(|(name, _)| name.contains("last_hidden_state"))
            .or_else(|| outputs.iter().next())
            .ok_or_else(|| Error::Embedding("Model produced no output".to_string()))?;

        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Embedding(format!("Unexpected model output: {}", e)))?;
        let hidden_size = shape.get(2).map_or(self.dimensions, |&d| d as usize);

        Ok(mean_pool(data, &attention_mask, rows, seq_len, hidden_size))
    }
}

/// Append `values` truncated or zero-padded to `len`
fn pad_row(out: &mut Vec<i64>, values: &[u32], len: usize) {
    out.extend(values.iter().take(len).map(|&v| i64::from(v)));
    out.resize(out.len() + len.saturating_sub(values.len()), 0);
}

fn input_tensor(values: Vec<i64>, rows: usize, seq_len: usize) -> Result<DynValue> {
    Tensor::from_array((vec![rows, seq_len], values.into_boxed_slice()))
        .map(|tensor| tensor.into_dyn())
        .map_err(|e| Error::Embedding(format!("Failed to build input tensor: {}", e)))
}

/// Attention-masked mean over token states, L2-normalised per row
fn mean_pool(
    hidden: &[f32],
    mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for j in 0..seq_len {
            let weight = mask[i * seq_len + j] as f32;
            if weight <= 0.0 {
                continue;
            }
            let offset = (i * seq_len + j) * hidden_size;
            if let Some(row) = hidden.get(offset..offset + hidden_size) {
                for (acc, value) in sum.iter_mut().zip(row) {
                    *acc += value * weight;
                }
                count += weight;
            }
        }

        if count > 0.0 {
            sum.iter_mut().for_each(|v| *v /= count);
        }
        normalize(&mut sum);
        embeddings.push(sum);
    }

    embeddings
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

async fn download(model: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!("{}/{}/resolve/main/{}", HF_BASE_URL, model, file);
    tracing::info!(%url, "Downloading embedding model file");

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Embedding(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::Embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Embedding(format!("Failed to read {}: {}", file, e)))?;

    // Write next to the target and rename so an interrupted download is not cached
    let partial = path.with_extension("part");
    tokio::fs::write(&partial, &bytes).await?;
    tokio::fs::rename(&partial, path).await?;

    tracing::info!(file, bytes = bytes.len(), "Downloaded embedding model file");
    Ok(())
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_owned(texts.to_vec()).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_owned(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Empty embedding result".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
