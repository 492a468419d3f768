//! DTMF digit detection over fixed-size blocks of 16-bit PCM.
//!
//! Each block runs through a Goertzel filter bank, a validity gate and a
//! per-stream debounce state machine:
//!
//! ```text
//! block -> FilterBank -> PowerTemplate -> Classifier -> Option<char> -> Debouncer -> digit
//! ```

pub mod config;
pub mod detect;
pub mod keypad;

pub use config::{ConfigError, DetectorConfig, Preset, TwistLimits};
pub use detect::classify::{Classification, Classifier, Features, Rejection};
pub use detect::debounce::{DebounceState, Debouncer};
pub use detect::dsp::{compute_power, FilterBank, HarmonicPowers, PowerTemplate, Tap, TapGroup};
pub use detect::{digits, BlockReport, Detector, DigitEvent, DtmfDecoder, StreamState};
