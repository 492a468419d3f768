use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::{debug, warn};

/// Standard deviation of Gaussian burst content, in sample units.
const BURST_SIGMA: f64 = 0.35 * 32767.0;
const SILENT_RMS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoiseError {
    #[error("input has no samples")]
    Empty,
    #[error("signal power is zero; cannot compute SNR")]
    SilentSignal,
    #[error("SNR must be finite, got {0}")]
    InvalidSnr(f64),
    #[error("sample rate must be positive")]
    ZeroSampleRate,
}

/// Content placed inside each burst of [`mix_bursty_noise`].
#[derive(Debug, Clone, Copy)]
pub enum NoiseSource<'a> {
    /// Gaussian noise.
    White,
    /// Samples of a noise recording, looped from its start for every burst.
    Recording(&'a [i16]),
}

/// Add uniform white noise so the result has the requested SNR.
///
/// Noise power is set to the mean signal power divided by `10^(snr_db / 10)`.
pub fn mix_white_noise<R: Rng + ?Sized>(
    samples: &[i16],
    snr_db: f64,
    rng: &mut R,
) -> Result<Vec<i16>, NoiseError> {
    if !snr_db.is_finite() {
        return Err(NoiseError::InvalidSnr(snr_db));
    }
    if samples.is_empty() {
        return Err(NoiseError::Empty);
    }

    let signal_power = mean_square(samples.iter().map(|&s| s as f64));
    if signal_power <= 0.0 {
        return Err(NoiseError::SilentSignal);
    }
    let target_power = signal_power / 10f64.powf(snr_db / 10.0);

    let noise: Vec<f64> = (0..samples.len())
        .map(|_| rng.random_range(-1.0..1.0))
        .collect();
    let raw_power = mean_square(noise.iter().copied());
    if raw_power <= 0.0 {
        // Only reachable for a single-sample input that drew exactly 0.0.
        return Ok(samples.to_vec());
    }
    let scale = (target_power / raw_power).sqrt();
    debug!(signal_power, target_power, scale, "mixing white noise");

    Ok(samples
        .iter()
        .zip(&noise)
        .map(|(&s, &n)| clamp_i16((s as f64 + n * scale).trunc()))
        .collect())
}

/// Overlay two to four short noise bursts on `base`.
///
/// Bursts last 200 to 400 ms and are placed uniformly at random; bursts that
/// would not fit inside `base` are skipped. The whole noise track is scaled so
/// that `rms(base) / rms(noise) = 10^(snr_db / 20)`. A silent base or silent
/// noise track falls back to a tiny RMS with a warning.
pub fn mix_bursty_noise<R: Rng + ?Sized>(
    base: &[i16],
    sample_rate_hz: u32,
    snr_db: f64,
    source: NoiseSource<'_>,
    rng: &mut R,
) -> Result<Vec<i16>, NoiseError> {
    if !snr_db.is_finite() {
        return Err(NoiseError::InvalidSnr(snr_db));
    }
    if sample_rate_hz == 0 {
        return Err(NoiseError::ZeroSampleRate);
    }

    let track = burst_track(base.len(), sample_rate_hz, source, rng);

    let mut base_rms = rms(base);
    let mut noise_rms = rms(&track);
    if base_rms == 0.0 {
        warn!("base is silent; using epsilon to continue");
        base_rms = SILENT_RMS;
    }
    if noise_rms == 0.0 {
        warn!("noise track is silent; using epsilon to continue");
        noise_rms = SILENT_RMS;
    }
    let scale = base_rms / 10f64.powf(snr_db / 20.0) / noise_rms;

    Ok(base
        .iter()
        .zip(&track)
        .map(|(&b, &n)| clamp_i16((b as f64 + n as f64 * scale).round()))
        .collect())
}

fn burst_track<R: Rng + ?Sized>(
    len: usize,
    sample_rate_hz: u32,
    source: NoiseSource<'_>,
    rng: &mut R,
) -> Vec<i16> {
    let mut track = vec![0i16; len];
    let bursts = rng.random_range(2..=4);
    let gaussian = Normal::new(0.0, BURST_SIGMA).ok();

    for _ in 0..bursts {
        let duration_ms: u64 = rng.random_range(200..=400);
        let burst_len = (sample_rate_hz as u64 * duration_ms / 1000) as usize;
        if burst_len == 0 || burst_len >= len {
            continue;
        }
        let start = rng.random_range(0..=len - burst_len);
        let burst = &mut track[start..start + burst_len];
        debug!(start, len = burst_len, "noise burst");

        match source {
            NoiseSource::White => {
                if let Some(normal) = gaussian {
                    for sample in burst.iter_mut() {
                        *sample = clamp_i16(normal.sample(rng).round());
                    }
                }
            }
            NoiseSource::Recording(noise) if !noise.is_empty() => {
                for (sample, &n) in burst.iter_mut().zip(noise.iter().cycle()) {
                    *sample = n;
                }
            }
            NoiseSource::Recording(_) => {}
        }
    }
    track
}

/// Root mean square of a sample slice; zero when empty.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    mean_square(samples.iter().map(|&s| s as f64)).sqrt()
}

fn mean_square(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.map(|v| v * v).sum::<f64>() / len as f64
}

/// Saturating conversion to a 16-bit sample.
pub fn clamp_i16(value: f64) -> i16 {
    value.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
