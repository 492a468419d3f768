//! Test-signal synthesis: DTMF tones, silence and noise overlays.

pub mod noise;
pub mod sequence;
mod sine_oscillator;
pub mod tone;

pub use noise::{clamp_i16, mix_bursty_noise, mix_white_noise, rms, NoiseError, NoiseSource};
pub use sequence::{parse_sequence, SequenceError};
pub use tone::{
    generate_sequence, generate_tone, samples_for, silence, DualToneModulator, SynthError,
    ToneParams,
};
