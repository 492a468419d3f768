use num_complex::Complex;

use crate::keypad::{COL_FREQS_HZ, ROW_FREQS_HZ};

/// One tuned Goertzel tap.
#[derive(Debug, Clone, Copy)]
pub struct Tap {
    freq_hz: f64,
    /// Target bin index; fractional in general.
    k: f64,
    coeff: f64,
    twiddle: Complex<f64>,
    block_len: usize,
}

impl Tap {
    /// Tune a tap to `freq_hz` for blocks of `block_len` samples.
    pub fn new(freq_hz: f64, sample_rate_hz: u32, block_len: usize) -> Self {
        let k = block_len as f64 * freq_hz / sample_rate_hz as f64;
        let omega = std::f64::consts::TAU * k / block_len as f64;
        Self {
            freq_hz,
            k,
            coeff: 2.0 * omega.cos(),
            twiddle: Complex::from_polar(1.0, -omega),
            block_len,
        }
    }

    /// Frequency the tap is tuned to.
    pub fn freq_hz(&self) -> f64 {
        self.freq_hz
    }

    /// Target bin index `N·f/fs`.
    pub fn bin(&self) -> f64 {
        self.k
    }

    /// Recurrence coefficient `2·cos(2πk/N)`.
    pub fn coeff(&self) -> f64 {
        self.coeff
    }

    /// Block length the bin was computed for.
    pub fn block_len(&self) -> usize {
        self.block_len
    }
}

/// Power of a single tap over one block.
///
/// Panics if `block` is not exactly the tap's block length.
pub fn compute_power(block: &[i16], tap: &Tap) -> f64 {
    assert_eq!(
        block.len(),
        tap.block_len,
        "block length does not match the filter bank"
    );

    let mut s1 = 0.0f64;
    let mut s2 = 0.0f64;
    for &x in block {
        let s0 = x as f64 + tap.coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }

    (Complex::new(s1, 0.0) - tap.twiddle * s2).norm_sqr()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapGroup {
    Row,
    Col,
    RowHarmonic,
    ColHarmonic,
}

/// Second-harmonic powers, present only when the bank carries harmonic taps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicPowers {
    pub row: [f64; 4],
    pub col: [f64; 4],
}

/// Per-group tap powers for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerTemplate {
    pub row: [f64; 4],
    pub col: [f64; 4],
    pub harmonics: Option<HarmonicPowers>,
}

impl PowerTemplate {
    /// Powers of one tap group, `None` for absent harmonic groups.
    pub fn group(&self, group: TapGroup) -> Option<[f64; 4]> {
        match group {
            TapGroup::Row => Some(self.row),
            TapGroup::Col => Some(self.col),
            TapGroup::RowHarmonic => self.harmonics.map(|h| h.row),
            TapGroup::ColHarmonic => self.harmonics.map(|h| h.col),
        }
    }
}

/// Immutable set of Goertzel taps for the eight DTMF fundamentals and,
/// optionally, their second harmonics.
#[derive(Debug, Clone)]
pub struct FilterBank {
    block_len: usize,
    rows: [Tap; 4],
    cols: [Tap; 4],
    harmonics: Option<([Tap; 4], [Tap; 4])>,
}

impl FilterBank {
    /// Build the bank; harmonic taps are added only when `harmonics` is set.
    pub fn new(sample_rate_hz: u32, block_len: usize, harmonics: bool) -> Self {
        let taps = |freqs: [f64; 4], factor: f64| {
            freqs.map(|freq_hz| Tap::new(freq_hz * factor, sample_rate_hz, block_len))
        };

        Self {
            block_len,
            rows: taps(ROW_FREQS_HZ, 1.0),
            cols: taps(COL_FREQS_HZ, 1.0),
            harmonics: harmonics.then(|| (taps(ROW_FREQS_HZ, 2.0), taps(COL_FREQS_HZ, 2.0))),
        }
    }

    /// Samples per block (N).
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Whether second-harmonic taps are computed.
    pub fn has_harmonics(&self) -> bool {
        self.harmonics.is_some()
    }

    /// Taps of one group, `None` for absent harmonic groups.
    pub fn taps(&self, group: TapGroup) -> Option<&[Tap; 4]> {
        match group {
            TapGroup::Row => Some(&self.rows),
            TapGroup::Col => Some(&self.cols),
            TapGroup::RowHarmonic => self.harmonics.as_ref().map(|(row, _)| row),
            TapGroup::ColHarmonic => self.harmonics.as_ref().map(|(_, col)| col),
        }
    }

    /// Compute every tap's power over one block.
    ///
    /// Panics if `block` is not exactly [`block_len`](Self::block_len) samples.
    pub fn compute(&self, block: &[i16]) -> PowerTemplate {
        assert_eq!(
            block.len(),
            self.block_len,
            "expected a {}-sample block, got {}",
            self.block_len,
            block.len()
        );

        let powers = |taps: &[Tap; 4]| taps.each_ref().map(|tap| compute_power(block, tap));

        PowerTemplate {
            row: powers(&self.rows),
            col: powers(&self.cols),
            harmonics: self.harmonics.as_ref().map(|(row, col)| HarmonicPowers {
                row: powers(row),
                col: powers(col),
            }),
        }
    }
}
