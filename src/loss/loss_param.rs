use std::io::Write;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::error::Result;
use crate::loss::normalization::{ModeRepr, NormalizationMode};

fn default_loss_weight() -> f64 {
    1.0
}

/// Configuration shared by loss layers.
///
/// Fields:
/// - `normalization` — explicit normalization mode; takes precedence when set
/// - `normalize`     — legacy flag, consulted only when `normalization` is
///                     absent: `true` → `Valid`, `false` → `BatchSize`
/// - `loss_weight`   — upstream gradient a host feeds to `backward` when this
///                     layer is the terminal loss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossParameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
    #[serde(default = "default_loss_weight")]
    pub loss_weight: f64,
}

impl Default for LossParameter {
    fn default() -> Self {
        LossParameter {
            normalization: None,
            normalize: None,
            loss_weight: default_loss_weight(),
        }
    }
}

impl LossParameter {
    pub fn with_normalization(mode: NormalizationMode) -> Self {
        LossParameter { normalization: Some(mode), ..Default::default() }
    }

    /// Resolves the mode a layer should use. Called once at layer setup.
    pub fn normalization_mode(&self) -> NormalizationMode {
        match (self.normalization, self.normalize) {
            (Some(mode), _) => mode,
            (None, Some(normalize)) => {
                let mode = if normalize {
                    NormalizationMode::Valid
                } else {
                    NormalizationMode::BatchSize
                };
                debug!(normalize, %mode, "mapped legacy normalize flag");
                mode
            }
            (None, None) => NormalizationMode::Valid,
        }
    }

    /// Parses a JSON config. Unknown normalization names or ids surface as
    /// `Error::UnknownNormalizationMode` rather than a generic JSON error.
    pub fn from_json(json: &str) -> Result<LossParameter> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        if let Some(mode) = raw.get("normalization").filter(|v| !v.is_null()) {
            let repr: ModeRepr = serde_json::from_value(mode.clone())?;
            NormalizationMode::try_from(repr)?;
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a config previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<LossParameter> {
        let json = std::fs::read_to_string(path)?;
        LossParameter::from_json(&json)
    }
}
