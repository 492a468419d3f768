use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use dtmflab_detect::Detector;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::decode::decode_wav;

/// What a fixture's file name says about its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleMetadata {
    pub condition: String,
    pub code: String,
    pub snr: Option<String>,
    pub noise_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleResult {
    pub filename: String,
    pub metadata: SampleMetadata,
    pub decoded: String,
    pub error: Option<ErrorKind>,
    pub notes: String,
}

impl SampleResult {
    /// True when the decoded digits matched the expected code.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FalsePositive,
    MissingDigits,
    ExtraDigits,
    WrongDigits,
}

impl ErrorKind {
    /// Label used in the report's `error_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FalsePositive => "false positive",
            ErrorKind::MissingDigits => "missing digits",
            ErrorKind::ExtraDigits => "extra digits",
            ErrorKind::WrongDigits => "wrong digits",
        }
    }
}

/// Parse `condition__code_123__snr_10__noise_white.wav` style names.
pub fn parse_metadata(path: &Path) -> SampleMetadata {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tokens: Vec<&str> = stem.split("__").collect();

    let mut meta = SampleMetadata {
        condition: tokens.first().map(|t| t.to_string()).unwrap_or_default(),
        code: String::new(),
        snr: None,
        noise_type: None,
    };

    for token in &tokens {
        if let Some(code) = token.strip_prefix("code_") {
            meta.code = code.replace("star", "*").replace("hash", "#");
        } else if let Some(snr) = token.strip_prefix("snr_") {
            meta.snr = Some(snr.to_string());
        } else if let Some(noise) = token.strip_prefix("noise_") {
            meta.noise_type = Some(noise.to_string());
            if noise == "only" {
                meta.code.clear();
            }
        } else if token.starts_with("silence") {
            meta.code.clear();
        }
    }
    meta
}

/// Compare decoded digits against the expected code.
pub fn classify_error(expected: &str, decoded: &str) -> Option<ErrorKind> {
    if expected == decoded {
        None
    } else if expected.is_empty() {
        Some(ErrorKind::FalsePositive)
    } else if decoded.is_empty() || expected.starts_with(decoded) {
        Some(ErrorKind::MissingDigits)
    } else if decoded.starts_with(expected) {
        Some(ErrorKind::ExtraDigits)
    } else {
        Some(ErrorKind::WrongDigits)
    }
}

/// Success counts keyed by condition and by `condition@snr`.
#[derive(Debug, Default)]
pub struct Tally {
    by_condition: BTreeMap<String, (usize, usize)>,
    by_snr: BTreeMap<String, (usize, usize)>,
}

impl Tally {
    /// Count one result under its condition and, if present, its SNR.
    pub fn record(&mut self, result: &SampleResult) {
        let meta = &result.metadata;
        let bump = |entry: &mut (usize, usize)| {
            entry.1 += 1;
            if result.success() {
                entry.0 += 1;
            }
        };
        bump(self.by_condition.entry(meta.condition.clone()).or_default());
        if let Some(snr) = meta.snr.as_deref().filter(|s| !s.is_empty()) {
            bump(self.by_snr.entry(format!("{}@{}", meta.condition, snr)).or_default());
        }
    }

    /// `(successes, total)` for one condition.
    pub fn condition(&self, condition: &str) -> Option<(usize, usize)> {
        self.by_condition.get(condition).copied()
    }

    /// Human-readable accuracy table.
    pub fn summary(&self) -> String {
        let mut out = String::from("Per-condition accuracy:\n");
        push_lines(&mut out, &self.by_condition);
        if !self.by_snr.is_empty() {
            out.push_str("Per-SNR accuracy:\n");
            push_lines(&mut out, &self.by_snr);
        }
        out
    }
}

fn push_lines(out: &mut String, stats: &BTreeMap<String, (usize, usize)>) {
    for (label, &(success, total)) in stats {
        let rate = if total == 0 {
            0.0
        } else {
            success as f64 / total as f64 * 100.0
        };
        out.push_str(&format!("  {label}: {success}/{total} ({rate:.1}% correct)\n"));
    }
}

/// All `.wav` files below `root`, sorted.
pub fn find_wavs(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let is_wav = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if entry.file_type().is_file() && is_wav {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Decode one fixture and score it against its file name.
pub fn evaluate_file(detector: &Detector, root: &Path, path: &Path) -> SampleResult {
    let metadata = parse_metadata(path);
    let (decoded, mut notes) = match dtmflab_wav::read_wav(path)
        .map_err(anyhow::Error::from)
        .and_then(|wav| decode_wav::<std::io::Sink>(detector, &wav, None))
    {
        Ok(decoded) => (decoded.digits, String::new()),
        Err(err) => {
            warn!(path = %path.display(), "decode failed: {err:#}");
            (String::new(), format!("decode failed: {err:#}"))
        }
    };

    if let Some(noise) = &metadata.noise_type {
        if !notes.is_empty() {
            notes.push_str("; ");
        }
        notes.push_str(&format!("noise={noise}"));
    }

    let error = classify_error(&metadata.code, &decoded);
    debug!(path = %path.display(), expected = %metadata.code, decoded = %decoded, "evaluated");
    SampleResult {
        filename: path
            .strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string(),
        metadata,
        decoded,
        error,
        notes,
    }
}

/// Write one CSV row per evaluated file.
pub fn write_report(path: &Path, results: &[SampleResult]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "filename",
        "condition",
        "code",
        "snr",
        "decoded_code",
        "success",
        "error_type",
        "notes",
    ])?;
    let or_none = |s: &str| if s.is_empty() { "NONE".to_string() } else { s.to_string() };
    for result in results {
        writer.write_record([
            result.filename.clone(),
            result.metadata.condition.clone(),
            or_none(&result.metadata.code),
            result.metadata.snr.clone().unwrap_or_default(),
            or_none(&result.decoded),
            if result.success() { "yes" } else { "no" }.to_string(),
            result.error.map(|e| e.as_str()).unwrap_or_default().to_string(),
            result.notes.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// `evaluate` subcommand. Returns `true` when any `clean` sample failed.
pub fn run(detector: &Detector, root: &Path, report: &Path) -> anyhow::Result<bool> {
    if !root.exists() {
        bail!("test directory not found: {}", root.display());
    }
    let paths = find_wavs(root)?;
    if paths.is_empty() {
        bail!("no WAV files found under {}", root.display());
    }

    let mut tally = Tally::default();
    let mut clean_failure = false;
    let results: Vec<SampleResult> = paths
        .iter()
        .map(|path| {
            let result = evaluate_file(detector, root, path);
            tally.record(&result);
            if result.metadata.condition == "clean" && !result.success() {
                clean_failure = true;
            }
            result
        })
        .collect();

    write_report(report, &results)?;
    println!("Processed {} file(s).", results.len());
    print!("{}", tally.summary());
    if clean_failure {
        eprintln!("Failures detected on clean samples.");
    }
    Ok(clean_failure)
}
