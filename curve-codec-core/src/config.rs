// In: src/config.rs

//! The single source of truth for the curve codec's tunable settings.
//!
//! `CurveCodecConfig` is created once when the codec is set up (from code or
//! from a JSON document) and is then read by the compression driver for every
//! clip. Every field participates in the derived-data cache key, so changing
//! any of them forces previously compressed clips to be rebuilt.

use serde::{Deserialize, Serialize};

use crate::codec::CompressionSettings;
use crate::error::CurveCodecError;

/// Settings for the uniform curve codec.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CurveCodecConfig {
    /// Maximum absolute error allowed on a plain curve value.
    #[serde(default = "default_curve_precision")]
    pub curve_precision: f32,

    /// Maximum world-space vertex error (cm) allowed on a curve that drives a
    /// morph target. Converted into a blend-weight tolerance per curve.
    #[serde(default = "default_morph_target_position_precision")]
    pub morph_target_position_precision: f32,

    /// Bump to invalidate every cached blob without changing any other setting.
    #[serde(default)]
    pub force_rebuild_version: u32,

    /// Settings handed to the track codec for every clip.
    #[serde(default)]
    pub compression: CompressionSettings,
}

impl Default for CurveCodecConfig {
    fn default() -> Self {
        Self {
            curve_precision: default_curve_precision(),
            morph_target_position_precision: default_morph_target_position_precision(),
            force_rebuild_version: 0,
            compression: CompressionSettings::default(),
        }
    }
}

impl CurveCodecConfig {
    /// Parses a config from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CurveCodecError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, CurveCodecError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rejects precisions that would make every derived tolerance meaningless.
    pub fn validate(&self) -> Result<(), CurveCodecError> {
        if !(self.curve_precision.is_finite() && self.curve_precision > 0.0) {
            return Err(CurveCodecError::InvalidConfig(format!(
                "curve_precision must be finite and positive, got {}",
                self.curve_precision
            )));
        }
        if !(self.morph_target_position_precision.is_finite() && self.morph_target_position_precision > 0.0) {
            return Err(CurveCodecError::InvalidConfig(format!(
                "morph_target_position_precision must be finite and positive, got {}",
                self.morph_target_position_precision
            )));
        }
        self.compression.validate()
    }
}

/// Helper for `serde` to provide a default for `curve_precision`.
fn default_curve_precision() -> f32 {
    0.001
}

/// Helper for `serde` to provide a default for `morph_target_position_precision`.
/// 0.01cm is conservative enough for cinematic quality.
fn default_morph_target_position_precision() -> f32 {
    0.01
}
