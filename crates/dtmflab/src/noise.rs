use std::path::Path;

use anyhow::{ensure, Context};
use clap::ValueEnum;
use dtmflab_synth::{mix_bursty_noise, mix_white_noise, NoiseSource};
use dtmflab_wav::{read_wav, write_wav, WavData};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NoiseMode {
    White,
}

/// Seeded generator when `seed` is given, otherwise seeded from the OS.
pub fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// `mix-noise` subcommand.
pub fn mix(
    input: &Path,
    output: &Path,
    snr_db: f64,
    mode: NoiseMode,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    ensure!(snr_db.is_finite(), "invalid SNR value {snr_db}");
    let wav = read_wav(input).with_context(|| format!("reading {}", input.display()))?;

    let samples = match mode {
        NoiseMode::White => mix_white_noise(&wav.samples, snr_db, &mut rng(seed))?,
    };
    write_wav(output, &WavData::new(wav.sample_rate_hz, samples))
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Wrote noisy file to '{}' (SNR {:.2} dB, mode white)",
        output.display(),
        snr_db
    );
    Ok(())
}

/// `bursty-noise` subcommand. Uses Gaussian bursts unless `noise_wav` is given.
pub fn bursty(
    base: &Path,
    output: &Path,
    snr_db: f64,
    noise_wav: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let base_wav = read_wav(base).with_context(|| format!("reading {}", base.display()))?;
    let recording = match noise_wav {
        Some(path) => {
            let noise = read_wav(path).with_context(|| format!("reading {}", path.display()))?;
            ensure!(
                noise.sample_rate_hz == base_wav.sample_rate_hz,
                "sample rate mismatch: base={}Hz noise={}Hz",
                base_wav.sample_rate_hz,
                noise.sample_rate_hz
            );
            Some(noise.samples)
        }
        None => None,
    };
    let source = match &recording {
        Some(samples) => NoiseSource::Recording(samples),
        None => NoiseSource::White,
    };

    let mixed = mix_bursty_noise(
        &base_wav.samples,
        base_wav.sample_rate_hz,
        snr_db,
        source,
        &mut rng(seed),
    )?;
    write_wav(output, &WavData::new(base_wav.sample_rate_hz, mixed))
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {} (SNR {:.2} dB, bursty)", output.display(), snr_db);
    Ok(())
}
