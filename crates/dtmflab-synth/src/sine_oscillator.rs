/// Sine oscillator evaluated exactly at each sample instant.
///
/// The phase is derived from the sample index rather than accumulated, so
/// long tones do not drift and every sample equals `sin(2π·f·i/fs)`.
pub(crate) struct SineOscillator {
    angular_hz: f64,
    sample_rate_hz: f64,
    index: u64,
}

impl SineOscillator {
    pub(crate) fn new(sample_rate_hz: u32, tone_freq_hz: f64) -> Self {
        Self {
            angular_hz: std::f64::consts::TAU * tone_freq_hz,
            sample_rate_hz: sample_rate_hz as f64,
            index: 0,
        }
    }

    pub(crate) fn next(&mut self) -> f64 {
        let t = self.index as f64 / self.sample_rate_hz;
        self.index += 1;
        (self.angular_hz * t).sin()
    }

    pub(crate) fn reset(&mut self) {
        self.index = 0;
    }
}
