use dtmflab_detect::keypad::key_frequencies;
use thiserror::Error;

use crate::sequence::{parse_sequence, SequenceError};
use crate::sine_oscillator::SineOscillator;

const FULL_SCALE: f64 = i16::MAX as f64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    #[error("duration must be positive")]
    ZeroDuration,
    #[error("{duration_ms} ms at {sample_rate_hz} Hz yields no samples")]
    NoSamples { sample_rate_hz: u32, duration_ms: u32 },
}

/// Per-tone synthesis parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    pub sample_rate_hz: u32,
    pub duration_ms: u32,
    /// Peak level of the mixed pair, 0.0 to 1.0 of full scale.
    pub amplitude: f64,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: 8000,
            duration_ms: 200,
            amplitude: 0.8,
        }
    }
}

impl ToneParams {
    fn check(&self) -> Result<(), SynthError> {
        if self.sample_rate_hz == 0 {
            return Err(SynthError::ZeroSampleRate);
        }
        if self.duration_ms == 0 {
            return Err(SynthError::ZeroDuration);
        }
        Ok(())
    }

    /// Samples per key press.
    pub fn tone_samples(&self) -> usize {
        samples_for(self.sample_rate_hz, self.duration_ms)
    }
}

/// Number of samples in `duration_ms` at `sample_rate_hz`, truncated.
pub fn samples_for(sample_rate_hz: u32, duration_ms: u32) -> usize {
    (sample_rate_hz as u64 * duration_ms as u64 / 1000) as usize
}

/// Produces the sum of a row and a column sine as 16-bit PCM.
pub struct DualToneModulator {
    low: SineOscillator,
    high: SineOscillator,
    amplitude: f64,
}

impl DualToneModulator {
    /// Create a modulator for a frequency pair; `amplitude` is clamped to 0.0..=1.0.
    pub fn new(sample_rate_hz: u32, low_hz: f64, high_hz: f64, amplitude: f64) -> Self {
        Self {
            low: SineOscillator::new(sample_rate_hz, low_hz),
            high: SineOscillator::new(sample_rate_hz, high_hz),
            amplitude: amplitude.clamp(0.0, 1.0),
        }
    }

    /// Modulator for a keypad symbol, or `None` if the symbol is not a DTMF key.
    pub fn for_key(key: char, sample_rate_hz: u32, amplitude: f64) -> Option<Self> {
        key_frequencies(key).map(|(low, high)| Self::new(sample_rate_hz, low, high, amplitude))
    }

    /// Fill `out` with consecutive samples, truncated toward zero.
    pub fn modulate(&mut self, out: &mut [i16]) {
        for sample in out {
            let mixed = (self.low.next() + self.high.next()) * 0.5 * self.amplitude;
            *sample = (mixed * FULL_SCALE) as i16;
        }
    }

    /// Restart both oscillators at zero phase.
    pub fn reset_phase(&mut self) {
        self.low.reset();
        self.high.reset();
    }
}

/// Synthesise one key press.
pub fn generate_tone(key: char, params: &ToneParams) -> Result<Vec<i16>, SynthError> {
    let keys = parse_sequence(&key.to_string())?;
    params.check()?;
    render(&keys, params, 0)
}

/// Synthesise a key sequence with `gap_ms` of silence between presses.
pub fn generate_sequence(
    text: &str,
    params: &ToneParams,
    gap_ms: u32,
) -> Result<Vec<i16>, SynthError> {
    let keys = parse_sequence(text)?;
    params.check()?;
    render(&keys, params, gap_ms)
}

/// All-zero samples of the given duration.
pub fn silence(sample_rate_hz: u32, duration_ms: u32) -> Result<Vec<i16>, SynthError> {
    let len = samples_for(sample_rate_hz, duration_ms);
    if len == 0 {
        return Err(SynthError::NoSamples {
            sample_rate_hz,
            duration_ms,
        });
    }
    Ok(vec![0; len])
}

fn render(keys: &[char], params: &ToneParams, gap_ms: u32) -> Result<Vec<i16>, SynthError> {
    let tone_len = params.tone_samples();
    if tone_len == 0 {
        return Err(SynthError::NoSamples {
            sample_rate_hz: params.sample_rate_hz,
            duration_ms: params.duration_ms,
        });
    }
    let gap_len = samples_for(params.sample_rate_hz, gap_ms);
    let total = keys.len() * tone_len + keys.len().saturating_sub(1) * gap_len;

    let mut out = vec![0i16; total];
    let mut offset = 0;
    for &key in keys {
        // Keys were validated by parse_sequence.
        if let Some(mut modulator) =
            DualToneModulator::for_key(key, params.sample_rate_hz, params.amplitude)
        {
            modulator.modulate(&mut out[offset..offset + tone_len]);
        }
        offset += tone_len + gap_len;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tone_is_1600_samples() {
        let samples = generate_tone('5', &ToneParams::default()).expect("tone");
        assert_eq!(samples.len(), 1600);
        assert_eq!(samples[0], 0);
    }

    #[test]
    fn peak_stays_within_amplitude() {
        let params = ToneParams {
            amplitude: 0.5,
            ..ToneParams::default()
        };
        let samples = generate_tone('D', &params).expect("tone");
        let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        assert!(peak <= (0.5 * FULL_SCALE) as u16 + 1);
        assert!(peak > (0.4 * FULL_SCALE) as u16);
    }

    #[test]
    fn amplitude_is_clamped() {
        let loud = ToneParams {
            amplitude: 3.0,
            ..ToneParams::default()
        };
        let full = ToneParams {
            amplitude: 1.0,
            ..ToneParams::default()
        };
        assert_eq!(
            generate_tone('1', &loud).expect("tone"),
            generate_tone('1', &full).expect("tone")
        );
    }

    #[test]
    fn sequence_layout_has_zero_gaps() {
        let params = ToneParams {
            duration_ms: 100,
            ..ToneParams::default()
        };
        let samples = generate_sequence("12", &params, 50).expect("sequence");
        assert_eq!(samples.len(), 800 + 400 + 800);
        assert!(samples[800..1200].iter().all(|&s| s == 0));
        assert!(samples[1200..].iter().any(|&s| s != 0));
    }

    #[test]
    fn every_press_starts_at_zero_phase() {
        let params = ToneParams {
            duration_ms: 50,
            ..ToneParams::default()
        };
        let samples = generate_sequence("77", &params, 10).expect("sequence");
        assert_eq!(samples[..400], samples[480..]);
    }

    #[test]
    fn samples_match_closed_form() {
        let samples = generate_tone('6', &ToneParams::default()).expect("tone");
        for (i, &sample) in samples.iter().enumerate() {
            let t = i as f64 / 8000.0;
            let low = (2.0 * std::f64::consts::PI * 770.0 * t).sin();
            let high = (2.0 * std::f64::consts::PI * 1477.0 * t).sin();
            let expected = ((low + high) * 0.5 * 0.8 * 32767.0) as i16;
            assert_eq!(sample, expected, "sample {i}");
        }
    }

    #[test]
    fn reset_phase_repeats_the_waveform() {
        let mut modulator = DualToneModulator::for_key('#', 8000, 0.8).expect("key");
        let mut first = [0i16; 205];
        let mut second = [0i16; 205];
        modulator.modulate(&mut first);
        modulator.modulate(&mut second);
        assert_ne!(first, second);

        modulator.reset_phase();
        modulator.modulate(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_key_has_no_modulator() {
        assert!(DualToneModulator::for_key('E', 8000, 0.8).is_none());
    }

    #[test]
    fn lowercase_keys_match_uppercase() {
        let params = ToneParams::default();
        assert_eq!(
            generate_tone('a', &params).expect("tone"),
            generate_tone('A', &params).expect("tone")
        );
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert_eq!(
            generate_tone('E', &ToneParams::default()),
            Err(SynthError::Sequence(SequenceError::UnknownKey {
                key: 'E',
                position: 0
            }))
        );
        let params = ToneParams {
            duration_ms: 0,
            ..ToneParams::default()
        };
        assert_eq!(generate_tone('1', &params), Err(SynthError::ZeroDuration));
        let params = ToneParams {
            sample_rate_hz: 0,
            ..ToneParams::default()
        };
        assert_eq!(generate_sequence("12", &params, 50), Err(SynthError::ZeroSampleRate));
    }

    #[test]
    fn silence_needs_at_least_one_sample() {
        assert_eq!(silence(8000, 100).expect("silence").len(), 800);
        assert!(silence(8000, 0).is_err());
    }
}
