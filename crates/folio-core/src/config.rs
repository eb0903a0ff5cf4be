//! Configuration loaded from a TOML file with environment overrides.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationSettings,
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub max_len: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Chunks submitted per retriever call while indexing.
    pub batch_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Token budget per answer.
    pub max_tokens: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to a local GGUF file, if any.
    pub path: Option<String>,
    /// HuggingFace repository to pull the model from instead.
    pub repo_id: Option<String>,
    pub filename: Option<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_len: 512 }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            batch_size: 16,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { max_tokens: 1024 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationSettings::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if a value fails validation.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FOLIO_CHUNK_MAX_LEN")
            && let Ok(n) = v.parse()
        {
            self.chunking.max_len = n;
        }
        if let Ok(v) = std::env::var("FOLIO_TOP_K")
            && let Ok(n) = v.parse()
        {
            self.retrieval.top_k = n;
        }
        if let Ok(v) = std::env::var("FOLIO_MAX_TOKENS")
            && let Ok(n) = v.parse()
        {
            self.generation.max_tokens = n;
        }
        if let Ok(v) = std::env::var("FOLIO_MODEL_PATH") {
            self.model.path = Some(v);
        }
    }

    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.chunking.max_len > 0, "chunking.max_len must be > 0");
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be > 0");
        anyhow::ensure!(
            self.retrieval.batch_size > 0,
            "retrieval.batch_size must be > 0"
        );
        anyhow::ensure!(
            self.generation.max_tokens > 0,
            "generation.max_tokens must be > 0"
        );
        Ok(())
    }
}
