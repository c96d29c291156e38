use serde::Deserialize;

use crate::analysis::{AnalysisConfig, DEFAULT_MAX_OCCURRENCES};
use crate::decoder::{DEFAULT_BATCH_SIZE, DEFAULT_RECLAIM_EVERY, DecodeOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Release the read buffer every N batches.
    #[serde(default = "default_reclaim_every")]
    pub reclaim_every: Option<usize>,
    /// Soft cap on one batch's memory (raw bytes plus decoded records).
    #[serde(default)]
    pub memory_ceiling_bytes: Option<usize>,
    /// Decoded batches queued between the decoder thread and the writer task.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_reclaim_every() -> Option<usize> {
    Some(DEFAULT_RECLAIM_EVERY)
}

fn default_channel_capacity() -> usize {
    4
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            reclaim_every: default_reclaim_every(),
            memory_ceiling_bytes: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl DecoderConfig {
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            batch_size: self.batch_size,
            reclaim_every: self.reclaim_every,
            memory_ceiling_bytes: self.memory_ceiling_bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSection {
    /// Timestamps kept per issue in the stored result.
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: usize,
}

fn default_max_occurrences() -> usize {
    DEFAULT_MAX_OCCURRENCES
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            max_occurrences: default_max_occurrences(),
        }
    }
}

impl AnalysisSection {
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            max_occurrences: self.max_occurrences,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.decoder.batch_size > 0,
            "decoder.batch_size must be > 0, got {}",
            self.decoder.batch_size
        );
        if let Some(every) = self.decoder.reclaim_every {
            anyhow::ensure!(
                every > 0,
                "decoder.reclaim_every must be > 0, got {}",
                every
            );
        }
        if let Some(ceiling) = self.decoder.memory_ceiling_bytes {
            anyhow::ensure!(
                ceiling > 0,
                "decoder.memory_ceiling_bytes must be > 0, got {}",
                ceiling
            );
        }
        anyhow::ensure!(
            self.decoder.channel_capacity > 0,
            "decoder.channel_capacity must be > 0, got {}",
            self.decoder.channel_capacity
        );
        anyhow::ensure!(
            self.analysis.max_occurrences > 0,
            "analysis.max_occurrences must be > 0, got {}",
            self.analysis.max_occurrences
        );
        Ok(())
    }
}
