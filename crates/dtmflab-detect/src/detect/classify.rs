use crate::config::{DetectorConfig, TwistLimits};
use crate::keypad::key_at;

use super::dsp::PowerTemplate;

/// Keeps power ratios finite when a runner-up or fundamental is silent.
const EPSILON: f64 = 1.0;

/// First gate that rejected a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Energy,
    Dominance,
    Twist,
    Harmonic,
}

impl Rejection {
    /// Short gate name for logs and feature dumps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Energy => "energy",
            Rejection::Dominance => "dominance",
            Rejection::Twist => "twist",
            Rejection::Harmonic => "harmonic",
        }
    }
}

/// Diagnostic measurements taken from one block, whether or not it passed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub row_index: usize,
    pub col_index: usize,
    pub row_peak: f64,
    pub col_peak: f64,
    pub row_dominance_db: f64,
    pub col_dominance_db: f64,
    /// Row peak over column peak; positive when the row tone is louder.
    pub twist_db: f64,
    pub row_harmonic_db: Option<f64>,
    pub col_harmonic_db: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub symbol: Option<char>,
    pub rejection: Option<Rejection>,
    pub features: Features,
}

/// Validity gate turning a power template into at most one keypad symbol.
#[derive(Debug, Clone)]
pub struct Classifier {
    min_energy: f64,
    min_dominance_db: f64,
    twist: Option<TwistLimits>,
    harmonic_max_db: Option<f64>,
}

impl Classifier {
    /// Copy the gate thresholds out of a configuration.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_energy: config.min_energy,
            min_dominance_db: config.min_dominance_db,
            twist: config.twist,
            harmonic_max_db: config.harmonic_max_db,
        }
    }

    /// Run the gates in order and name the first one that fails.
    pub fn classify(&self, template: &PowerTemplate) -> Classification {
        let features = measure(template);
        let rejection = self.first_rejection(&features);
        let symbol = match rejection {
            None => Some(key_at(features.row_index, features.col_index)),
            Some(_) => None,
        };

        Classification {
            symbol,
            rejection,
            features,
        }
    }

    fn first_rejection(&self, f: &Features) -> Option<Rejection> {
        if f.row_peak < self.min_energy || f.col_peak < self.min_energy {
            return Some(Rejection::Energy);
        }

        if f.row_dominance_db < self.min_dominance_db || f.col_dominance_db < self.min_dominance_db {
            return Some(Rejection::Dominance);
        }

        if let Some(limits) = self.twist {
            if f.twist_db > limits.standard_max_db || -f.twist_db > limits.reverse_max_db {
                return Some(Rejection::Twist);
            }
        }

        if let Some(ceiling) = self.harmonic_max_db {
            let too_strong = |ratio: Option<f64>| ratio.is_some_and(|db| db > ceiling);
            if too_strong(f.row_harmonic_db) || too_strong(f.col_harmonic_db) {
                return Some(Rejection::Harmonic);
            }
        }

        None
    }
}

fn measure(template: &PowerTemplate) -> Features {
    let (row_index, row_peak, row_next) = top_two(&template.row);
    let (col_index, col_peak, col_next) = top_two(&template.col);

    let harmonic = |powers: [f64; 4], index: usize, fundamental: f64| {
        ratio_db(powers[index] + EPSILON, fundamental + EPSILON)
    };

    Features {
        row_index,
        col_index,
        row_peak,
        col_peak,
        row_dominance_db: ratio_db(row_peak, row_next + EPSILON),
        col_dominance_db: ratio_db(col_peak, col_next + EPSILON),
        twist_db: ratio_db(row_peak + EPSILON, col_peak + EPSILON),
        row_harmonic_db: template.harmonics.map(|h| harmonic(h.row, row_index, row_peak)),
        col_harmonic_db: template.harmonics.map(|h| harmonic(h.col, col_index, col_peak)),
    }
}

/// Index and value of the largest power plus the second-largest value.
fn top_two(values: &[f64; 4]) -> (usize, f64, f64) {
    let mut max_i = 0;
    let mut max_v = values[0];
    let mut next_v = 0.0;

    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > max_v {
            next_v = max_v;
            max_v = v;
            max_i = i;
        } else if v > next_v {
            next_v = v;
        }
    }

    (max_i, max_v, next_v)
}

fn ratio_db(num: f64, den: f64) -> f64 {
    10.0 * (num / den).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::detect::dsp::{FilterBank, HarmonicPowers};

    fn lab() -> Classifier {
        Classifier::from_config(&DetectorConfig::preset(Preset::Lab))
    }

    fn template(row: [f64; 4], col: [f64; 4]) -> PowerTemplate {
        PowerTemplate {
            row,
            col,
            harmonics: None,
        }
    }

    fn dual_tone(low_hz: f64, high_hz: f64, low_amp: f64, high_amp: f64, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / 8000.0;
                ((low_amp * (low_hz * t).sin() + high_amp * (high_hz * t).sin()) * 32767.0) as i16
            })
            .collect()
    }

    #[test]
    fn top_two_tracks_runner_up() {
        assert_eq!(top_two(&[1.0, 5.0, 3.0, 2.0]), (1, 5.0, 3.0));
        assert_eq!(top_two(&[9.0, 5.0, 3.0, 2.0]), (0, 9.0, 5.0));
        assert_eq!(top_two(&[4.0, 4.0, 0.0, 0.0]), (0, 4.0, 4.0));
    }

    #[test]
    fn clean_template_maps_to_keypad() {
        let result = lab().classify(&template([0.0, 1e10, 0.0, 0.0], [0.0, 0.0, 0.0, 1e10]));
        assert_eq!(result.symbol, Some('B'));
        assert_eq!(result.rejection, None);
        assert_eq!((result.features.row_index, result.features.col_index), (1, 3));
    }

    #[test]
    fn silence_is_rejected_by_energy_floor() {
        let result = lab().classify(&template([0.0; 4], [0.0; 4]));
        assert_eq!(result.symbol, None);
        assert_eq!(result.rejection, Some(Rejection::Energy));
    }

    #[test]
    fn one_weak_group_is_rejected() {
        let result = lab().classify(&template([1e10, 0.0, 0.0, 0.0], [9e6, 0.0, 0.0, 0.0]));
        assert_eq!(result.rejection, Some(Rejection::Energy));
    }

    #[test]
    fn equal_row_powers_never_classify() {
        let result = lab().classify(&template([1e10, 1e10, 0.0, 0.0], [0.0, 1e10, 0.0, 0.0]));
        assert_eq!(result.symbol, None);
        assert_eq!(result.rejection, Some(Rejection::Dominance));
        assert!(result.features.row_dominance_db < 0.0);
    }

    #[test]
    fn runner_up_within_ratio_is_rejected() {
        // 5 dB apart: below the 6 dB minimum.
        let runner_up = 1e10 / 10f64.powf(0.5);
        let result = lab().classify(&template([1e10, runner_up, 0.0, 0.0], [0.0, 1e10, 0.0, 0.0]));
        assert_eq!(result.rejection, Some(Rejection::Dominance));
    }

    #[test]
    fn twist_limits_are_asymmetric() {
        let mut config = DetectorConfig::preset(Preset::Line);
        config.harmonic_max_db = None;
        let classifier = Classifier::from_config(&config);

        // Row 6 dB louder: inside the 8 dB standard limit.
        let row_loud = template([4e10, 0.0, 0.0, 0.0], [1e10, 0.0, 0.0, 0.0]);
        assert_eq!(classifier.classify(&row_loud).symbol, Some('1'));

        // Column 6 dB louder: beyond the 4 dB reverse limit.
        let col_loud = template([1e10, 0.0, 0.0, 0.0], [4e10, 0.0, 0.0, 0.0]);
        let result = classifier.classify(&col_loud);
        assert_eq!(result.rejection, Some(Rejection::Twist));
        assert!(result.features.twist_db < -5.9);
    }

    #[test]
    fn twist_gate_can_be_disabled() {
        let col_loud = template([1e10, 0.0, 0.0, 0.0], [1e12, 0.0, 0.0, 0.0]);
        assert_eq!(lab().classify(&col_loud).symbol, Some('1'));
    }

    #[test]
    fn strong_harmonic_is_rejected() {
        let mut config = DetectorConfig::preset(Preset::Lab);
        config.harmonic_max_db = Some(-6.0);
        let classifier = Classifier::from_config(&config);

        let mut powers = template([0.0, 0.0, 1e10, 0.0], [0.0, 1e10, 0.0, 0.0]);
        powers.harmonics = Some(HarmonicPowers {
            row: [0.0, 0.0, 5e9, 0.0],
            col: [0.0; 4],
        });
        let result = classifier.classify(&powers);
        assert_eq!(result.rejection, Some(Rejection::Harmonic));

        powers.harmonics = Some(HarmonicPowers {
            row: [0.0, 0.0, 1e8, 0.0],
            col: [0.0; 4],
        });
        assert_eq!(classifier.classify(&powers).symbol, Some('8'));
    }

    #[test]
    fn lone_second_harmonic_sine_is_caught_by_harmonic_gate() {
        // 1394 Hz is the second harmonic of the 697 Hz row. Its sidelobes
        // alone are enough to pass the energy and dominance gates as '0'.
        let samples = dual_tone(1394.0, 0.0, 0.8, 0.0, 410);
        let block = &samples[205..];

        let mut config = DetectorConfig::preset(Preset::Lab);
        let bank = FilterBank::new(config.sample_rate_hz, config.block_len, false);
        let plain = Classifier::from_config(&config).classify(&bank.compute(block));
        assert_eq!(plain.symbol, Some('0'));

        config.harmonic_max_db = Some(-6.0);
        let bank = FilterBank::new(config.sample_rate_hz, config.block_len, true);
        let gated = Classifier::from_config(&config).classify(&bank.compute(block));
        assert_eq!(gated.symbol, None);
        assert_eq!(gated.rejection, Some(Rejection::Harmonic));
    }

    #[test]
    fn unbalanced_tone_is_rejected_by_twist() {
        let config = DetectorConfig::preset(Preset::Line);
        let bank = FilterBank::new(config.sample_rate_hz, config.block_len, true);
        let classifier = Classifier::from_config(&config);

        let col_heavy = dual_tone(770.0, 1336.0, 0.04, 0.4, config.block_len);
        let result = classifier.classify(&bank.compute(&col_heavy));
        assert_eq!(result.rejection, Some(Rejection::Twist));

        let balanced = dual_tone(770.0, 1336.0, 0.4, 0.4, config.block_len);
        assert_eq!(classifier.classify(&bank.compute(&balanced)).symbol, Some('5'));
    }
}
