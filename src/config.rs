//! QC evaluation configuration

use crate::constants::datetime::DEFAULT_DATE_FORMAT;
use crate::constants::limits::{DEFAULT_ANNOTATION_DECIMALS, MAX_ANNOTATION_DECIMALS};
use crate::constants::rules::DEFAULT_DIVERGENCE_SD;
use crate::constants::standardize::DEFAULT_REFERENCE_LEVEL;
use crate::error::{QcError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// QcConfig holds the caller-tunable knobs of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Zero-based index of the reference level among the matched columns (default: 1)
    pub reference_level: usize,

    /// chrono format of the date column (default: `%d.%m.%Y`)
    pub date_format: String,

    /// Cross-level divergence threshold in reference SDs (default: 4.0)
    pub divergence_sd: f64,

    /// Decimal places of comparison annotations (default: 2)
    pub annotation_decimals: u32,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            reference_level: DEFAULT_REFERENCE_LEVEL,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            divergence_sd: DEFAULT_DIVERGENCE_SD,
            annotation_decimals: DEFAULT_ANNOTATION_DECIMALS,
        }
    }
}

impl QcConfig {
    /// Create a new QcConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the reference level index
    pub fn with_reference_level(mut self, index: usize) -> Self {
        self.reference_level = index;
        self
    }

    /// Validate and clamp configuration values
    pub fn validate(&mut self) {
        if !self.divergence_sd.is_finite() || self.divergence_sd <= 0.0 {
            self.divergence_sd = DEFAULT_DIVERGENCE_SD;
        }

        self.annotation_decimals = self.annotation_decimals.min(MAX_ANNOTATION_DECIMALS);

        if self.date_format.trim().is_empty() {
            self.date_format = DEFAULT_DATE_FORMAT.to_string();
        }
    }

    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: QcConfig = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(QcError::Config("empty configuration path".to_string()));
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
