use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use dtmflab_detect::{BlockReport, Detector};
use dtmflab_wav::WavData;
use tracing::info;

const FEATURE_HEADER: [&str; 13] = [
    "block",
    "candidate",
    "emitted_digit",
    "rejection",
    "row_index",
    "col_index",
    "row_peak",
    "col_peak",
    "row_dominance_db",
    "col_dominance_db",
    "twist_db",
    "row2_ratio_db",
    "col2_ratio_db",
];

/// Result of decoding one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub digits: String,
    pub blocks: u64,
}

/// Decode a whole recording, optionally dumping one feature row per block.
pub fn decode_wav<W: Write>(
    detector: &Detector,
    wav: &WavData,
    mut features: Option<&mut csv::Writer<W>>,
) -> anyhow::Result<Decoded> {
    let expected = detector.config().sample_rate_hz;
    if wav.sample_rate_hz != expected {
        bail!(
            "sample rate {} Hz does not match detector rate {} Hz",
            wav.sample_rate_hz,
            expected
        );
    }

    if let Some(writer) = features.as_deref_mut() {
        writer.write_record(FEATURE_HEADER)?;
    }

    let mut state = detector.new_stream();
    let mut digits = String::new();
    for block in wav.samples.chunks_exact(detector.block_len()) {
        let report = detector.process_block(&mut state, block);
        if let Some(writer) = features.as_deref_mut() {
            writer.write_record(feature_row(&report))?;
        }
        if let Some(digit) = report.digit {
            info!(digit = %digit, block = report.index, "digit");
            digits.push(digit);
        }
    }

    if let Some(writer) = features {
        writer.flush()?;
    }

    Ok(Decoded {
        digits,
        blocks: state.blocks_seen(),
    })
}

fn feature_row(report: &BlockReport) -> Vec<String> {
    let f = &report.features;
    let optional_db = |db: Option<f64>| db.map(|v| format!("{v:.3}")).unwrap_or_default();
    vec![
        report.index.to_string(),
        report.candidate.map(String::from).unwrap_or_default(),
        report.digit.map(String::from).unwrap_or_default(),
        report.rejection.map(|r| r.as_str().to_string()).unwrap_or_default(),
        f.row_index.to_string(),
        f.col_index.to_string(),
        format!("{:.1}", f.row_peak),
        format!("{:.1}", f.col_peak),
        format!("{:.3}", f.row_dominance_db),
        format!("{:.3}", f.col_dominance_db),
        format!("{:.3}", f.twist_db),
        optional_db(f.row_harmonic_db),
        optional_db(f.col_harmonic_db),
    ]
}

/// `decode` subcommand.
pub fn run(detector: &Detector, input: &Path, features: Option<&Path>) -> anyhow::Result<()> {
    let wav = dtmflab_wav::read_wav(input)
        .with_context(|| format!("reading {}", input.display()))?;
    println!(
        "Decoding {} (sample_rate={}, blocks={})",
        input.display(),
        wav.sample_rate_hz,
        wav.samples.len() / detector.block_len()
    );

    let decoded = match features {
        Some(path) => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("creating {}", path.display()))?;
            decode_wav(detector, &wav, Some(&mut writer))?
        }
        None => decode_wav::<std::io::Sink>(detector, &wav, None)?,
    };

    println!("Decoded: {}", decoded.digits);
    Ok(())
}
