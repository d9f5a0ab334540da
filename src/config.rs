use std::path::Path;

use serde::Deserialize;

use crate::error::{HuffmanError, Result};
use crate::registry::ASCII_SLOTS;

/// Tunables shared by the encoder and decoder.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CodecConfig {
    /// Total registry slots, counting the ASCII slots and the EOF sentinel.
    pub symbol_capacity: usize,
    /// Digits after the decimal point for probability and self-information.
    pub probability_precision: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            symbol_capacity: 3000,
            probability_precision: 15,
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CodecConfig =
            toml::from_str(text).map_err(|e| HuffmanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| HuffmanError::resource(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        // every ASCII slot plus the EOF sentinel must fit
        if self.symbol_capacity <= ASCII_SLOTS {
            return Err(HuffmanError::Config(format!(
                "symbol_capacity must exceed {}, got {}",
                ASCII_SLOTS, self.symbol_capacity
            )));
        }
        if self.probability_precision > 30 {
            return Err(HuffmanError::Config(format!(
                "probability_precision must be at most 30, got {}",
                self.probability_precision
            )));
        }
        Ok(())
    }
}
