//! WAV decoding into analysis samples
//!
//! Reads normalized WAV files into f32 samples in [-1, 1], capping the
//! amount of audio analyzed per screening

use std::path::Path;
use tracing::debug;

use super::AudioError;

/// Check whether a WAV file is already mono PCM at the target rate
pub fn conforms(path: &Path, sample_rate: u32) -> bool {
    match hound::WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            spec.channels == 1 && spec.sample_rate == sample_rate
        }
        Err(_) => false,
    }
}

/// Load samples from a conforming WAV file
///
/// Analysis is capped at `max_secs` of audio; longer files are truncated
pub fn load_samples(path: &Path, sample_rate: u32, max_secs: u32) -> Result<Vec<f32>, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels != 1 || spec.sample_rate != sample_rate {
        return Err(AudioError::UnsupportedFormat(format!(
            "{} ch @ {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let max_samples = (sample_rate as usize) * (max_secs as usize);
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = ((1u32 << (spec.bits_per_sample - 1)) as f32).max(1.0);
            reader
                .samples::<i32>()
                .take(max_samples)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|s| s as f32 / scale)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .take(max_samples)
            .collect::<Result<Vec<_>, _>>()?,
    };

    if samples.is_empty() {
        return Err(AudioError::Empty);
    }

    debug!(
        "Loaded {} samples ({:.2}s) from {:?}",
        samples.len(),
        samples.len() as f64 / sample_rate as f64,
        path
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..4410)
            .map(|i| ((i as f32 / 22050.0) * 440.0 * std::f32::consts::TAU).sin() * 0.5)
            .collect();
        write_wav(&path, 22050, &samples);

        assert!(conforms(&path, 22050));
        assert!(!conforms(&path, 16000));

        let loaded = load_samples(&path, 22050, 30).unwrap();
        assert_eq!(loaded.len(), 4410);
        // 16-bit quantization stays within ~1e-4 of the source
        for (a, b) in loaded.iter().zip(samples.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_duration_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.wav");
        let samples = vec![0.1f32; 22050 * 3];
        write_wav(&path, 22050, &samples);

        let loaded = load_samples(&path, 22050, 2).unwrap();
        assert_eq!(loaded.len(), 22050 * 2);
    }

    #[test]
    fn test_rejects_wrong_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hi.wav");
        write_wav(&path, 44100, &[0.1, 0.2, 0.3]);

        let result = load_samples(&path, 22050, 30);
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 22050, &[]);

        assert!(matches!(
            load_samples(&path, 22050, 30),
            Err(AudioError::Empty)
        ));
    }
}
