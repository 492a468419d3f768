use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use dtmflab_synth::{generate_sequence, silence, ToneParams};
use dtmflab_wav::{concat_wavs, write_wav, WavData};

/// `generate` subcommand.
pub fn generate(keys: &str, params: &ToneParams, gap_ms: u32, output: &Path) -> anyhow::Result<()> {
    ensure!(params.duration_ms > 0, "duration must be positive");
    ensure!(params.sample_rate_hz > 0, "sample rate must be positive");
    ensure!(
        (0.0..=1.0).contains(&params.amplitude),
        "amplitude must be between 0.0 and 1.0, got {}",
        params.amplitude
    );

    let samples = generate_sequence(keys, params, gap_ms)?;
    let wav = WavData::new(params.sample_rate_hz, samples);
    write_wav(output, &wav).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Wrote {} ({} samples, {:.3} s)",
        output.display(),
        wav.samples.len(),
        wav.duration_secs()
    );
    Ok(())
}

/// `silence` subcommand.
pub fn write_silence(sample_rate_hz: u32, duration_ms: u32, output: &Path) -> anyhow::Result<()> {
    let wav = WavData::new(sample_rate_hz, silence(sample_rate_hz, duration_ms)?);
    write_wav(output, &wav).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {} ({} ms of silence)", output.display(), duration_ms);
    Ok(())
}

/// `concat` subcommand.
pub fn concat(inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let joined = concat_wavs(inputs).context("concatenating inputs")?;
    write_wav(output, &joined).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Wrote {} from {} input(s) ({} samples)",
        output.display(),
        inputs.len(),
        joined.samples.len()
    );
    Ok(())
}
