pub mod classify;
pub mod debounce;
pub mod dsp;

use std::sync::Arc;

use tracing::trace;

use crate::config::{ConfigError, DetectorConfig};
use classify::{Classification, Classifier, Features, Rejection};
use debounce::Debouncer;
use dsp::{FilterBank, PowerTemplate};

/// Outcome of one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockReport {
    pub index: u64,
    /// Raw classifier output for this block.
    pub candidate: Option<char>,
    /// Digit confirmed by this block, if any.
    pub digit: Option<char>,
    pub rejection: Option<Rejection>,
    pub features: Features,
}

/// A confirmed digit and where in the stream it was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitEvent {
    pub digit: char,
    pub block_index: u64,
    /// First sample of the confirming block.
    pub start_sample: u64,
}

/// Mutable state of one audio stream.
#[derive(Debug, Clone)]
pub struct StreamState {
    debouncer: Debouncer,
    blocks_seen: u64,
}

impl StreamState {
    /// Debounce state of this stream.
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Blocks processed since creation or the last reset.
    pub fn blocks_seen(&self) -> u64 {
        self.blocks_seen
    }

    /// Start over as a fresh stream.
    pub fn reset(&mut self) {
        self.debouncer.reset();
        self.blocks_seen = 0;
    }
}

/// Immutable DTMF detector: filter bank plus validity gate.
///
/// A `Detector` holds no per-stream state and can be shared between threads;
/// each stream keeps its own [`StreamState`].
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
    bank: FilterBank,
    classifier: Classifier,
}

impl Detector {
    /// Validate `config` and build the filter bank and gate.
    pub fn new(config: &DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            bank: FilterBank::new(
                config.sample_rate_hz,
                config.block_len,
                config.harmonics_enabled(),
            ),
            classifier: Classifier::from_config(config),
        })
    }

    /// Configuration the detector was built from.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Samples per block (N).
    pub fn block_len(&self) -> usize {
        self.bank.block_len()
    }

    /// Goertzel taps used for every block.
    pub fn filter_bank(&self) -> &FilterBank {
        &self.bank
    }

    /// Fresh per-stream state for this detector.
    pub fn new_stream(&self) -> StreamState {
        StreamState {
            debouncer: Debouncer::new(
                self.config.stability_blocks,
                self.config.silence_blocks_to_clear,
            ),
            blocks_seen: 0,
        }
    }

    /// Raw tap powers of one block.
    pub fn powers(&self, block: &[i16]) -> PowerTemplate {
        self.bank.compute(block)
    }

    /// Classify one block without touching any stream state.
    ///
    /// Panics if `block` is not exactly [`block_len`](Self::block_len) samples.
    pub fn classify_block(&self, block: &[i16]) -> Classification {
        self.classifier.classify(&self.bank.compute(block))
    }

    /// Run one block through the filter bank, validity gate and debouncer.
    ///
    /// Panics if `block` is not exactly [`block_len`](Self::block_len) samples.
    pub fn process_block(&self, state: &mut StreamState, block: &[i16]) -> BlockReport {
        let classification = self.classify_block(block);
        let index = state.blocks_seen;
        state.blocks_seen += 1;

        if let Some(rejection) = classification.rejection {
            let f = &classification.features;
            trace!(
                block = index,
                gate = rejection.as_str(),
                row_peak = f.row_peak,
                col_peak = f.col_peak,
                row_dominance_db = f.row_dominance_db,
                col_dominance_db = f.col_dominance_db,
                twist_db = f.twist_db,
                "block rejected"
            );
        }

        BlockReport {
            index,
            candidate: classification.symbol,
            digit: state.debouncer.feed(classification.symbol),
            rejection: classification.rejection,
            features: classification.features,
        }
    }

    /// Decode a complete sample array as a fresh stream.
    ///
    /// Samples are taken in consecutive, non-overlapping blocks; a trailing
    /// partial block is ignored.
    pub fn decode(&self, samples: &[i16]) -> Vec<DigitEvent> {
        let mut state = self.new_stream();
        samples
            .chunks_exact(self.block_len())
            .filter_map(|block| {
                let report = self.process_block(&mut state, block);
                report.digit.map(|digit| self.event(digit, report.index))
            })
            .collect()
    }

    fn event(&self, digit: char, block_index: u64) -> DigitEvent {
        DigitEvent {
            digit,
            block_index,
            start_sample: block_index * self.block_len() as u64,
        }
    }
}

/// Streaming decoder that accepts sample chunks of any length.
pub struct DtmfDecoder {
    detector: Arc<Detector>,
    state: StreamState,
    pending: Vec<i16>,
}

impl DtmfDecoder {
    /// Start a stream on a shared detector.
    pub fn new(detector: Arc<Detector>) -> Self {
        let state = detector.new_stream();
        let pending = Vec::with_capacity(detector.block_len());
        Self {
            detector,
            state,
            pending,
        }
    }

    /// Detector this stream runs on.
    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Feed samples and return the digits confirmed by any completed blocks.
    pub fn push(&mut self, samples: &[i16]) -> Vec<DigitEvent> {
        let block_len = self.detector.block_len();
        let mut events = Vec::new();

        let mut pos = 0usize;
        while pos < samples.len() {
            let take = (block_len - self.pending.len()).min(samples.len() - pos);
            self.pending.extend_from_slice(&samples[pos..pos + take]);
            pos += take;

            if self.pending.len() == block_len {
                let report = self.detector.process_block(&mut self.state, &self.pending);
                if let Some(digit) = report.digit {
                    events.push(self.detector.event(digit, report.index));
                }
                self.pending.clear();
            }
        }

        events
    }

    /// Samples buffered towards the next block.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Reset internal state and drop any partial block.
    pub fn reset(&mut self) {
        self.state.reset();
        self.pending.clear();
    }
}

/// Concatenate the digits of a list of events.
pub fn digits(events: &[DigitEvent]) -> String {
    events.iter().map(|event| event.digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;

    fn tone(low_hz: f64, high_hz: f64, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / 8000.0;
                (((low_hz * t).sin() + (high_hz * t).sin()) * 0.5 * 0.8 * 32767.0) as i16
            })
            .collect()
    }

    #[test]
    fn all_zero_block_is_silence_and_clears_last_digit() {
        let detector = Detector::new(&DetectorConfig::preset(Preset::Line)).expect("detector");
        let mut state = detector.new_stream();

        for block in tone(770.0, 1336.0, 102 * 5).chunks_exact(102) {
            detector.process_block(&mut state, block);
        }
        assert_eq!(state.debouncer().last_emitted(), Some('5'));

        let silence = [0i16; 102];
        for _ in 0..2 {
            let report = detector.process_block(&mut state, &silence);
            assert_eq!(report.candidate, None);
            assert_eq!(report.rejection, Some(Rejection::Energy));
        }
        assert_eq!(state.debouncer().last_emitted(), None);
    }

    #[test]
    fn block_reports_are_numbered() {
        let detector = Detector::new(&DetectorConfig::preset(Preset::Lab)).expect("detector");
        let mut state = detector.new_stream();
        let block = tone(941.0, 1477.0, 205);

        let reports: Vec<_> = (0..3)
            .map(|_| detector.process_block(&mut state, &block))
            .collect();
        assert_eq!(reports.iter().map(|r| r.index).collect::<Vec<_>>(), [0, 1, 2]);
        assert!(reports.iter().all(|r| r.candidate == Some('#')));
        assert_eq!(reports[2].digit, Some('#'));
        assert_eq!(state.blocks_seen(), 3);
    }

    #[test]
    fn decode_reports_confirming_block() {
        let detector = Detector::new(&DetectorConfig::preset(Preset::Lab)).expect("detector");
        let mut samples = vec![0i16; 410];
        samples.extend(tone(697.0, 1209.0, 1600));

        let events = detector.decode(&samples);
        assert_eq!(
            events,
            [DigitEvent {
                digit: '1',
                block_index: 4,
                start_sample: 820
            }]
        );
    }

    #[test]
    fn trailing_partial_block_is_ignored() {
        let detector = Detector::new(&DetectorConfig::preset(Preset::Lab)).expect("detector");
        // Two full blocks plus a partial one: never enough for three stable blocks.
        let samples = tone(852.0, 1336.0, 205 * 3 - 1);
        assert!(detector.decode(&samples).is_empty());
    }

    #[test]
    fn streaming_matches_whole_array_decode() {
        let detector = Arc::new(Detector::new(&DetectorConfig::preset(Preset::Line)).expect("detector"));
        let mut samples = tone(852.0, 1633.0, 1600);
        samples.extend(vec![0; 400]);
        samples.extend(tone(852.0, 1633.0, 1600));

        let whole = detector.decode(&samples);

        let mut decoder = DtmfDecoder::new(detector.clone());
        let mut streamed = Vec::new();
        for chunk in samples.chunks(37) {
            streamed.extend(decoder.push(chunk));
        }

        assert_eq!(digits(&whole), "CC");
        assert_eq!(streamed, whole);
        assert_eq!(decoder.pending_samples(), samples.len() % 102);
    }

    #[test]
    fn decoder_reset_drops_partial_block() {
        let detector = Arc::new(Detector::new(&DetectorConfig::preset(Preset::Lab)).expect("detector"));
        let mut decoder = DtmfDecoder::new(detector);
        decoder.push(&[1; 100]);
        assert_eq!(decoder.pending_samples(), 100);
        decoder.reset();
        assert_eq!(decoder.pending_samples(), 0);
    }

    #[test]
    fn harmonic_taps_follow_the_config() {
        let lab = Detector::new(&DetectorConfig::preset(Preset::Lab)).expect("detector");
        assert!(!lab.filter_bank().has_harmonics());
        assert!(lab.powers(&tone(697.0, 1209.0, 205)).harmonics.is_none());

        let line = Detector::new(&DetectorConfig::preset(Preset::Line)).expect("detector");
        assert!(line.filter_bank().has_harmonics());
        let powers = line.powers(&tone(697.0, 1209.0, 102));
        let harmonics = powers.harmonics.expect("harmonic powers");
        assert!(harmonics.row[0] < powers.row[0]);
        assert!(powers.row[0] > powers.row[1]);
    }

    #[test]
    fn decoder_exposes_its_detector() {
        let detector = Arc::new(Detector::new(&DetectorConfig::preset(Preset::Line)).expect("detector"));
        let decoder = DtmfDecoder::new(detector.clone());
        assert_eq!(decoder.detector().block_len(), 102);
        assert_eq!(decoder.detector().config(), detector.config());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = DetectorConfig::preset(Preset::Lab);
        config.block_len = 0;
        assert!(Detector::new(&config).is_err());
    }

    #[test]
    #[should_panic]
    fn wrong_block_length_panics() {
        let detector = Detector::new(&DetectorConfig::preset(Preset::Lab)).expect("detector");
        let mut state = detector.new_stream();
        detector.process_block(&mut state, &[0; 102]);
    }
}
