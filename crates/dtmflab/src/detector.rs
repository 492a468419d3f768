use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use dtmflab_detect::{DetectorConfig, Preset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    /// Long blocks, no twist or harmonic gate.
    Lab,
    /// Short blocks with twist and harmonic gates.
    Line,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Lab => Preset::Lab,
            PresetArg::Line => Preset::Line,
        }
    }
}

/// Detector selection shared by `decode` and `evaluate`.
#[derive(Debug, Clone, Args)]
pub struct DetectorArgs {
    /// Built-in threshold preset.
    #[arg(long, value_enum, default_value_t = PresetArg::Lab)]
    pub preset: PresetArg,

    /// TOML detector configuration; overrides --preset.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl DetectorArgs {
    /// Resolve the detector configuration from `--config` or `--preset`.
    pub fn load(&self) -> anyhow::Result<DetectorConfig> {
        match &self.config {
            Some(path) => DetectorConfig::load(path)
                .with_context(|| format!("loading detector config {}", path.display())),
            None => Ok(DetectorConfig::preset(self.preset.into())),
        }
    }
}
