//! Audio converter for format normalization
//!
//! Shells out to ffmpeg to turn any supported input into the mono
//! 22.05 kHz 16-bit PCM WAV the feature extractor expects

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{wave, AudioError};

/// Extensions accepted for screening input
const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "webm", "ogg"];

/// Audio format normalization via ffmpeg
pub struct AudioConverter {
    ffmpeg_path: String,
    sample_rate: u32,
}

impl AudioConverter {
    pub fn new(ffmpeg_path: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            sample_rate,
        }
    }

    /// Check whether the file extension is one we accept
    pub fn is_supported(path: &Path) -> bool {
        extension_of(path)
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or(false)
    }

    /// Normalize an input file to analysis-ready WAV
    ///
    /// WAV inputs that already conform (mono, target rate, PCM) are passed
    /// through untouched; everything else goes through ffmpeg. Returns the
    /// path to analyze plus the temp file to delete afterwards, if any.
    pub async fn normalize(
        &self,
        input: &Path,
        work_dir: &Path,
    ) -> Result<(PathBuf, Option<PathBuf>), AudioError> {
        if !input.exists() {
            return Err(AudioError::NotFound(input.to_path_buf()));
        }

        let ext = extension_of(input)
            .ok_or_else(|| AudioError::UnsupportedFormat("<none>".to_string()))?;
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AudioError::UnsupportedFormat(ext));
        }

        if ext == "wav" && wave::conforms(input, self.sample_rate) {
            debug!("{:?} already conforms, skipping conversion", input);
            return Ok((input.to_path_buf(), None));
        }

        fs::create_dir_all(work_dir)?;
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let output = work_dir.join(format!(
            "{}_{}.wav",
            stem,
            chrono::Utc::now().format("%Y%m%d_%H%M%S%f")
        ));

        self.run_ffmpeg(input, &output).await?;
        info!("Converted {:?} -> {:?}", input, output);
        Ok((output.clone(), Some(output)))
    }

    async fn run_ffmpeg(&self, input: &Path, output: &Path) -> Result<(), AudioError> {
        let status = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(input)
            .args(["-acodec", "pcm_s16le"])
            .args(["-ar", &self.sample_rate.to_string()])
            .args(["-ac", "1"])
            .arg("-y")
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| AudioError::FfmpegMissing(e.to_string()))?;

        if !status.success() {
            return Err(AudioError::ConversionFailed(input.to_path_buf()));
        }
        Ok(())
    }

    /// Clean up temporary audio files
    pub fn cleanup_files(paths: &[PathBuf]) {
        for path in paths {
            if path.exists() {
                match fs::remove_file(path) {
                    Ok(_) => debug!("Removed temp file: {:?}", path),
                    Err(e) => warn!("Failed to remove {:?}: {}", path, e),
                }
            }
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(AudioConverter::is_supported(Path::new("voice.wav")));
        assert!(AudioConverter::is_supported(Path::new("voice.WEBM")));
        assert!(AudioConverter::is_supported(Path::new("voice.mp3")));
        assert!(!AudioConverter::is_supported(Path::new("voice.flac")));
        assert!(!AudioConverter::is_supported(Path::new("voice")));
    }

    #[tokio::test]
    async fn test_normalize_rejects_missing_file() {
        let converter = AudioConverter::new("ffmpeg", 22050);
        let result = converter
            .normalize(Path::new("does_not_exist.wav"), Path::new("/tmp"))
            .await;
        assert!(matches!(result, Err(AudioError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_normalize_rejects_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not audio").unwrap();

        let converter = AudioConverter::new("ffmpeg", 22050);
        let result = converter.normalize(&path, dir.path()).await;
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_conforming_wav_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..22050u32 {
            let t = i as f32 / 22050.0;
            let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let converter = AudioConverter::new("ffmpeg", 22050);
        let (analyzed, temp) = converter.normalize(&path, dir.path()).await.unwrap();
        assert_eq!(analyzed, path);
        assert!(temp.is_none());
    }

    #[test]
    fn test_cleanup_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.wav");
        std::fs::write(&path, b"x").unwrap();
        AudioConverter::cleanup_files(&[path.clone(), dir.path().join("missing.wav")]);
        assert!(!path.exists());
    }
}
