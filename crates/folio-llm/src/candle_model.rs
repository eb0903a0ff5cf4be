//! Local GGUF model backend built on candle.
//!
//! Weights load once; each query opens a [`TokenSession`] that steps the
//! model one position at a time and detokenizes incrementally.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use candle_core::quantized::gguf_file;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;

use crate::error::{LlmError, Result};
use crate::model::{LanguageModel, TokenSession};

#[derive(Debug, Clone)]
pub enum ModelSource {
    Local {
        path: PathBuf,
    },
    HuggingFace {
        repo_id: String,
        filename: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub seed: u64,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            seed: 42,
            repeat_penalty: 1.1,
            repeat_last_n: 64,
        }
    }
}

pub struct CandleModel {
    // std::sync::Mutex serializes forward passes; the coordinator's
    // single-flight rule means there is never real contention.
    weights: Arc<Mutex<ModelWeights>>,
    tokenizer: Arc<Tokenizer>,
    eos_token_id: u32,
    sampling: SamplingConfig,
    device: Device,
}

impl std::fmt::Debug for CandleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleModel")
            .field("sampling", &self.sampling)
            .field("device", &format!("{:?}", self.device))
            .finish_non_exhaustive()
    }
}

impl CandleModel {
    /// Load a GGUF chat model and its tokenizer from the given source.
    ///
    /// # Errors
    ///
    /// Returns an error if the download, GGUF parse, or tokenizer load fails.
    pub fn load(source: &ModelSource, sampling: SamplingConfig, device: Device) -> Result<Self> {
        let (weights_path, tokenizer_path) = resolve_paths(source)?;
        let weights = load_gguf_weights(&weights_path, &device)?;
        let tokenizer = load_tokenizer(&tokenizer_path)?;
        let eos_token_id = resolve_eos_token(&tokenizer);
        tracing::info!(eos_token_id, "model loaded");

        Ok(Self {
            weights: Arc::new(Mutex::new(weights)),
            tokenizer: Arc::new(tokenizer),
            eos_token_id,
            sampling,
            device,
        })
    }

    #[must_use]
    pub fn device_name(&self) -> &'static str {
        match &self.device {
            Device::Cpu => "cpu",
            Device::Cuda(_) => "cuda",
            Device::Metal(_) => "metal",
        }
    }
}

impl LanguageModel for CandleModel {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| LlmError::Inference(format!("tokenizer encode failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn start(&self, input: &[u32]) -> Result<Box<dyn TokenSession>> {
        if input.is_empty() {
            return Err(LlmError::Inference("empty input sequence".into()));
        }
        let processor = LogitsProcessor::from_sampling(
            self.sampling.seed,
            Sampling::TopKThenTopP {
                k: self.sampling.top_k,
                p: self.sampling.top_p,
                temperature: self.sampling.temperature,
            },
        );
        Ok(Box::new(CandleSession {
            weights: Arc::clone(&self.weights),
            tokenizer: Arc::clone(&self.tokenizer),
            logits_processor: processor,
            device: self.device.clone(),
            eos_token_id: self.eos_token_id,
            repeat_penalty: self.sampling.repeat_penalty,
            repeat_last_n: self.sampling.repeat_last_n,
            all_tokens: input.to_vec(),
            primed: false,
            stream_tokens: Vec::new(),
            prev_index: 0,
            current_index: 0,
        }))
    }
}

struct CandleSession {
    weights: Arc<Mutex<ModelWeights>>,
    tokenizer: Arc<Tokenizer>,
    logits_processor: LogitsProcessor,
    device: Device,
    eos_token_id: u32,
    repeat_penalty: f32,
    repeat_last_n: usize,
    /// Prompt plus generated tokens, the model's full sequence.
    all_tokens: Vec<u32>,
    /// Whether the prompt batch has been fed through the model.
    primed: bool,
    /// Generated tokens pending incremental detokenization.
    stream_tokens: Vec<u32>,
    prev_index: usize,
    current_index: usize,
}

impl CandleSession {
    fn apply_repeat_penalty(&self, logits: &Tensor) -> Result<Tensor> {
        if (self.repeat_penalty - 1.0).abs() < f32::EPSILON {
            return Ok(logits.clone());
        }
        let start = self.all_tokens.len().saturating_sub(self.repeat_last_n);
        let recent = &self.all_tokens[start..];
        candle_transformers::utils::apply_repeat_penalty(logits, self.repeat_penalty, recent)
            .map_err(LlmError::Candle)
    }

    fn decode_range(&self, start: usize, end: usize) -> Result<String> {
        if start == end {
            return Ok(String::new());
        }
        // Special tokens stay in the output so stop markers remain visible
        // to the stream scanner.
        self.tokenizer
            .decode(&self.stream_tokens[start..end], false)
            .map_err(|e| LlmError::Inference(format!("tokenizer decode failed: {e}")))
    }
}

impl TokenSession for CandleSession {
    fn next_token(&mut self) -> Result<Option<u32>> {
        let (input, pos) = if self.primed {
            let last = *self
                .all_tokens
                .last()
                .ok_or_else(|| LlmError::Inference("empty token sequence".into()))?;
            (Tensor::new(&[last], &self.device)?, self.all_tokens.len() - 1)
        } else {
            (Tensor::new(self.all_tokens.as_slice(), &self.device)?, 0)
        };

        let logits = {
            let mut weights = self
                .weights
                .lock()
                .map_err(|e| LlmError::Inference(format!("model lock poisoned: {e}")))?;
            weights.forward(&input, pos)?
        };
        self.primed = true;

        let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
        let last_logits = if logits.dims().len() > 1 {
            let seq_len = logits.dim(0)?;
            logits.get(seq_len - 1)?
        } else {
            logits
        };
        let last_logits = self.apply_repeat_penalty(&last_logits)?;

        let next = self.logits_processor.sample(&last_logits)?;
        self.all_tokens.push(next);

        if next == self.eos_token_id {
            return Ok(None);
        }
        Ok(Some(next))
    }

    fn decode(&mut self, token: u32) -> Result<Option<String>> {
        let prev_text = self.decode_range(self.prev_index, self.current_index)?;
        self.stream_tokens.push(token);
        let text = self.decode_range(self.prev_index, self.stream_tokens.len())?;

        // Hold back fragments ending in the replacement character: the
        // token only covers part of a multi-byte unit and needs more
        // context before it is displayable.
        if text.len() > prev_text.len() && !text.ends_with('\u{FFFD}') {
            let increment = text[prev_text.len()..].to_string();
            self.prev_index = self.current_index;
            self.current_index = self.stream_tokens.len();
            Ok(Some(increment))
        } else {
            Ok(None)
        }
    }
}

fn resolve_paths(source: &ModelSource) -> Result<(PathBuf, PathBuf)> {
    match source {
        ModelSource::Local { path } => {
            let tokenizer_path = path
                .parent()
                .map(|p| p.join("tokenizer.json"))
                .ok_or_else(|| LlmError::ModelLoad("invalid model path".into()))?;
            Ok((path.clone(), tokenizer_path))
        }
        ModelSource::HuggingFace { repo_id, filename } => {
            let api = hf_hub::api::sync::Api::new()
                .map_err(|e| LlmError::ModelLoad(format!("HuggingFace API client: {e}")))?;
            let repo = api.model(repo_id.clone());

            let model_filename = filename.as_deref().unwrap_or("model.gguf");
            let weights_path = repo.get(model_filename).map_err(|e| {
                LlmError::ModelLoad(format!("download {model_filename} from {repo_id}: {e}"))
            })?;
            let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
                LlmError::ModelLoad(format!("download tokenizer.json from {repo_id}: {e}"))
            })?;
            Ok((weights_path, tokenizer_path))
        }
    }
}

fn load_gguf_weights(path: &Path, device: &Device) -> Result<ModelWeights> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| LlmError::ModelLoad(format!("open GGUF file {}: {e}", path.display())))?;
    let content = gguf_file::Content::read(&mut file)
        .map_err(|e| LlmError::ModelLoad(format!("parse GGUF file: {e}")))?;
    ModelWeights::from_gguf(content, &mut file, device)
        .map_err(|e| LlmError::ModelLoad(format!("load weights from GGUF: {e}")))
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| LlmError::ModelLoad(format!("load tokenizer from {}: {e}", path.display())))
}

fn resolve_eos_token(tokenizer: &Tokenizer) -> u32 {
    // Common end-of-sequence tokens across model families.
    const EOS_CANDIDATES: &[&str] = &[
        "<|end|>",
        "<|endoftext|>",
        "<|eot_id|>",
        "<|im_end|>",
        "</s>",
    ];

    for candidate in EOS_CANDIDATES {
        if let Some(id) = tokenizer.token_to_id(candidate) {
            return id;
        }
    }
    // Token id 2 is EOS in most llama-family tokenizers.
    2
}
