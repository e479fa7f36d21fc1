//! Optional YAML config: writer options and read limits.
//!
//! ```yaml
//! writer:
//!   compression_level: 6
//!   owner: duo
//!   format: zip        # or tar-gz; default follows the output name
//! limits:
//!   max_entries: 500
//! ```

use anyhow::{Context, Result};
use duobag_core::{ReadLimits, ReadLimitsOverrides, WriterOptions, WriterOptionsOverrides};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub writer: WriterOptionsOverrides,
    #[serde(default)]
    pub limits: ReadLimitsOverrides,
}

impl CliConfig {
    /// Load from `path`, or defaults when no config was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions::default().apply(self.writer.clone())
    }

    pub fn read_limits(&self) -> ReadLimits {
        ReadLimits::default().apply(self.limits.clone())
    }
}
