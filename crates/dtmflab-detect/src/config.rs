//! Detector configuration.
//!
//! Every threshold the detector applies lives in [`DetectorConfig`]. Nothing in
//! the detection path falls back to a built-in constant, so an operating point
//! (clean lab recordings, attenuated phone lines, ...) is chosen by picking a
//! [`Preset`] or by loading a TOML file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keypad::COL_FREQS_HZ;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    #[error("block length must be positive")]
    ZeroBlockLen,
    #[error("{freq_hz} Hz tap is not below the Nyquist frequency of a {sample_rate_hz} Hz stream")]
    AboveNyquist { freq_hz: f64, sample_rate_hz: u32 },
    #[error("invalid {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("stability_blocks must be at least 1")]
    ZeroStability,
    #[error("silence_blocks_to_clear must be at least 1")]
    ZeroSilence,
}

/// Asymmetric limits on the power imbalance between the row and column tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwistLimits {
    /// How far (dB) the row tone may exceed the column tone.
    pub standard_max_db: f64,
    /// How far (dB) the column tone may exceed the row tone.
    pub reverse_max_db: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub sample_rate_hz: u32,
    /// Samples per analysis block (N).
    pub block_len: usize,
    /// Absolute power floor both group peaks must reach.
    pub min_energy: f64,
    /// Minimum peak-over-runner-up ratio within each group.
    pub min_dominance_db: f64,
    /// Ceiling of second-harmonic power relative to its fundamental. When
    /// absent the harmonic taps are not computed at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmonic_max_db: Option<f64>,
    /// Consecutive agreeing blocks required before a digit is confirmed.
    pub stability_blocks: u32,
    /// Consecutive silent blocks required before the same digit may be
    /// confirmed again.
    pub silence_blocks_to_clear: u32,
    /// Twist gate; disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twist: Option<TwistLimits>,
}

/// Named operating points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// 205-sample blocks, energy and dominance gates only.
    Lab,
    /// 102-sample blocks with twist and harmonic rejection for noisy lines.
    Line,
}

impl DetectorConfig {
    /// Configuration for a named operating point.
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Lab => Self {
                sample_rate_hz: 8000,
                block_len: 205,
                min_energy: 1.0e7,
                min_dominance_db: 6.0,
                harmonic_max_db: None,
                stability_blocks: 3,
                silence_blocks_to_clear: 1,
                twist: None,
            },
            Preset::Line => Self {
                sample_rate_hz: 8000,
                block_len: 102,
                min_energy: 1.0e7,
                min_dominance_db: 6.0,
                harmonic_max_db: Some(-6.0),
                stability_blocks: 3,
                silence_blocks_to_clear: 2,
                twist: Some(TwistLimits {
                    standard_max_db: 8.0,
                    reverse_max_db: 4.0,
                }),
            },
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialise as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Whether the harmonic gate, and hence harmonic taps, are active.
    pub fn harmonics_enabled(&self) -> bool {
        self.harmonic_max_db.is_some()
    }

    /// Block duration in milliseconds.
    pub fn block_ms(&self) -> f64 {
        self.block_len as f64 * 1000.0 / self.sample_rate_hz as f64
    }

    /// Check that every value is usable before a detector is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.block_len == 0 {
            return Err(ConfigError::ZeroBlockLen);
        }

        let nyquist_hz = self.sample_rate_hz as f64 / 2.0;
        let harmonic_factor = if self.harmonics_enabled() { 2.0 } else { 1.0 };
        let highest_hz = COL_FREQS_HZ[3] * harmonic_factor;
        if highest_hz >= nyquist_hz {
            return Err(ConfigError::AboveNyquist {
                freq_hz: highest_hz,
                sample_rate_hz: self.sample_rate_hz,
            });
        }

        check_threshold("min_energy", self.min_energy, |v| v >= 0.0)?;
        check_threshold("min_dominance_db", self.min_dominance_db, |v| v > 0.0)?;
        if let Some(twist) = self.twist {
            check_threshold("twist.standard_max_db", twist.standard_max_db, |v| v >= 0.0)?;
            check_threshold("twist.reverse_max_db", twist.reverse_max_db, |v| v >= 0.0)?;
        }
        if let Some(ceiling) = self.harmonic_max_db {
            check_threshold("harmonic_max_db", ceiling, |_| true)?;
        }

        if self.stability_blocks == 0 {
            return Err(ConfigError::ZeroStability);
        }
        if self.silence_blocks_to_clear == 0 {
            return Err(ConfigError::ZeroSilence);
        }
        Ok(())
    }
}

fn check_threshold(
    name: &'static str,
    value: f64,
    accept: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if value.is_finite() && accept(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}
