//! 16-bit mono PCM WAV input and output.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed WAV: {0}")]
    Format(#[from] hound::Error),
    #[error("unsupported sample format (need integer PCM)")]
    NotPcm,
    #[error("unsupported bit depth {0} (need 16)")]
    BitDepth(u16),
    #[error("expected mono audio, found {0} channels")]
    Channels(u16),
    #[error("sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    RateMismatch { expected: u32, found: u32 },
    #[error("nothing to concatenate")]
    NoInputs,
}

/// Decoded audio: one channel of signed 16-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavData {
    pub sample_rate_hz: u32,
    pub samples: Vec<i16>,
}

impl WavData {
    /// Wrap samples recorded at `sample_rate_hz`.
    pub fn new(sample_rate_hz: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate_hz,
            samples,
        }
    }

    /// Length in seconds; zero for a zero sample rate.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: self.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }
}

/// Read a 16-bit mono PCM file.
pub fn read_wav(path: impl AsRef<Path>) -> Result<WavData, WavError> {
    let path = path.as_ref();
    let wav = read_wav_from(BufReader::new(File::open(path)?))?;
    debug!(
        path = %path.display(),
        sample_rate = wav.sample_rate_hz,
        samples = wav.samples.len(),
        "read wav"
    );
    Ok(wav)
}

/// Parse a WAV stream, accepting only 16-bit integer mono PCM.
pub fn read_wav_from<R: Read>(reader: R) -> Result<WavData, WavError> {
    let mut reader = WavReader::new(reader)?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int {
        return Err(WavError::NotPcm);
    }
    if spec.bits_per_sample != 16 {
        return Err(WavError::BitDepth(spec.bits_per_sample));
    }
    if spec.channels != 1 {
        return Err(WavError::Channels(spec.channels));
    }

    let samples = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    Ok(WavData::new(spec.sample_rate, samples))
}

/// Write `wav` to `path`, creating parent directories as needed.
pub fn write_wav(path: impl AsRef<Path>, wav: &WavData) -> Result<(), WavError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_wav_to(BufWriter::new(File::create(path)?), wav)?;
    debug!(
        path = %path.display(),
        sample_rate = wav.sample_rate_hz,
        samples = wav.samples.len(),
        "wrote wav"
    );
    Ok(())
}

/// Write canonical 16-bit mono PCM.
pub fn write_wav_to<W: Write + Seek>(writer: W, wav: &WavData) -> Result<(), WavError> {
    let mut writer = WavWriter::new(writer, wav.spec())?;
    for &sample in &wav.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Join clips end to end. All parts must share one sample rate.
pub fn concat(parts: &[WavData]) -> Result<WavData, WavError> {
    let first = parts.first().ok_or(WavError::NoInputs)?;
    let expected = first.sample_rate_hz;

    let mut samples = Vec::with_capacity(parts.iter().map(|p| p.samples.len()).sum());
    for part in parts {
        if part.sample_rate_hz != expected {
            return Err(WavError::RateMismatch {
                expected,
                found: part.sample_rate_hz,
            });
        }
        samples.extend_from_slice(&part.samples);
    }
    Ok(WavData::new(expected, samples))
}

/// Read and join files in order.
pub fn concat_wavs<P: AsRef<Path>>(paths: &[P]) -> Result<WavData, WavError> {
    let parts = paths
        .iter()
        .map(read_wav)
        .collect::<Result<Vec<_>, _>>()?;
    concat(&parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(spec: WavSpec, write: impl FnOnce(&mut WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec).expect("writer");
        write(&mut writer);
        writer.finalize().expect("finalize");
        cursor.into_inner()
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("tone.wav");
        let wav = WavData::new(8000, vec![0, 1, -1, i16::MAX, i16::MIN]);

        write_wav(&path, &wav).expect("write");
        assert_eq!(read_wav(&path).expect("read"), wav);
        // 44-byte canonical header plus two bytes per sample.
        assert_eq!(std::fs::metadata(&path).expect("metadata").len(), 44 + 10);
    }

    #[test]
    fn stereo_is_rejected() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = encode(spec, |w| {
            w.write_sample(1i16).expect("sample");
            w.write_sample(2i16).expect("sample");
        });
        assert!(matches!(read_wav_from(Cursor::new(bytes)), Err(WavError::Channels(2))));
    }

    #[test]
    fn eight_bit_is_rejected() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let bytes = encode(spec, |w| w.write_sample(3i8).expect("sample"));
        assert!(matches!(read_wav_from(Cursor::new(bytes)), Err(WavError::BitDepth(8))));
    }

    #[test]
    fn float_is_rejected() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let bytes = encode(spec, |w| w.write_sample(0.5f32).expect("sample"));
        assert!(matches!(read_wav_from(Cursor::new(bytes)), Err(WavError::NotPcm)));
    }

    #[test]
    fn garbage_is_rejected() {
        let bytes = b"RIFF\x04\x00\x00\x00JUNK".to_vec();
        assert!(matches!(read_wav_from(Cursor::new(bytes)), Err(WavError::Format(_))));
        assert!(read_wav_from(Cursor::new(Vec::new())).is_err());
    }

    #[test]
    fn concat_joins_in_order() {
        let joined = concat(&[
            WavData::new(8000, vec![1, 2]),
            WavData::new(8000, vec![]),
            WavData::new(8000, vec![3]),
        ])
        .expect("concat");
        assert_eq!(joined, WavData::new(8000, vec![1, 2, 3]));
    }

    #[test]
    fn concat_requires_matching_rates() {
        let result = concat(&[WavData::new(8000, vec![1]), WavData::new(16000, vec![2])]);
        assert!(matches!(
            result,
            Err(WavError::RateMismatch {
                expected: 8000,
                found: 16000
            })
        ));
        assert!(matches!(concat(&[]), Err(WavError::NoInputs)));
    }

    #[test]
    fn concat_wavs_reads_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, &WavData::new(8000, vec![5; 3])).expect("write");
        write_wav(&b, &WavData::new(8000, vec![-5; 2])).expect("write");

        let joined = concat_wavs(&[a, b]).expect("concat");
        assert_eq!(joined.samples, [5, 5, 5, -5, -5]);
        assert!((joined.duration_secs() - 5.0 / 8000.0).abs() < 1e-12);
    }
}
