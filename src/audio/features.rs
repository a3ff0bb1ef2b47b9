//! Acoustic feature extraction
//!
//! Computes the 18-element feature vector used by the audio classifier:
//! means of 13 MFCCs, zero-crossing rate, RMS energy, spectral centroid,
//! spectral bandwidth, and spectral rolloff. All spectral measures run on
//! 2048-sample Hann-windowed frames with a 512-sample hop.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Samples per analysis frame
pub const FRAME_LEN: usize = 2048;
/// Hop between frame starts
pub const HOP_LEN: usize = 512;
/// Mel bands feeding the MFCC transform
pub const N_MELS: usize = 128;
/// MFCC coefficients kept
pub const MFCC_COUNT: usize = 13;
/// Total feature vector length
pub const FEATURE_LEN: usize = 18;

/// Feature vector indices following the MFCC block
pub const IDX_ZCR: usize = 13;
pub const IDX_RMS: usize = 14;
pub const IDX_CENTROID: usize = 15;
pub const IDX_BANDWIDTH: usize = 16;
pub const IDX_ROLLOFF: usize = 17;

/// Fraction of spectral energy below the rolloff frequency
const ROLLOFF_FRACTION: f32 = 0.85;

/// Floor applied before taking log mel energies
const LOG_FLOOR: f32 = 1e-10;

/// Acoustic feature extractor
///
/// Construction precomputes the FFT plan, Hann window, mel filterbank, and
/// DCT basis; `extract` is then allocation-light per call.
pub struct FeatureExtractor {
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Sparse triangular filters: per mel band, (bin, weight) pairs
    mel_filters: Vec<Vec<(usize, f32)>>,
    /// Orthonormal DCT-II rows, MFCC_COUNT x N_MELS
    dct_basis: Vec<Vec<f32>>,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FRAME_LEN);

        let window = (0..FRAME_LEN)
            .map(|n| {
                let x = std::f32::consts::TAU * n as f32 / FRAME_LEN as f32;
                0.5 * (1.0 - x.cos())
            })
            .collect();

        Self {
            sample_rate,
            fft,
            window,
            mel_filters: build_mel_filterbank(sample_rate),
            dct_basis: build_dct_basis(),
        }
    }

    /// Extract the 18-element feature vector from mono samples
    ///
    /// Input shorter than one frame is zero-padded; silence produces a
    /// finite, zero-dominated vector rather than NaN.
    pub fn extract(&self, samples: &[f32]) -> Vec<f64> {
        let n_bins = FRAME_LEN / 2 + 1;
        let bin_hz = self.sample_rate as f32 / FRAME_LEN as f32;

        let mut mfcc_sums = vec![0.0f64; MFCC_COUNT];
        let mut zcr_sum = 0.0f64;
        let mut rms_sum = 0.0f64;
        let mut centroid_sum = 0.0f64;
        let mut bandwidth_sum = 0.0f64;
        let mut rolloff_sum = 0.0f64;

        let mut frame = vec![0.0f32; FRAME_LEN];
        let mut spectrum = vec![Complex::new(0.0f32, 0.0f32); FRAME_LEN];
        let mut magnitudes = vec![0.0f32; n_bins];

        let mut n_frames = 0usize;
        for start in FrameIter::new(samples.len()) {
            n_frames += 1;

            frame.fill(0.0);
            let end = (start + FRAME_LEN).min(samples.len());
            frame[..end - start].copy_from_slice(&samples[start..end]);

            // Time-domain measures run on the raw frame
            zcr_sum += zero_crossing_rate(&frame) as f64;
            rms_sum += rms(&frame) as f64;

            // Windowed FFT for the spectral measures
            for (i, s) in spectrum.iter_mut().enumerate() {
                *s = Complex::new(frame[i] * self.window[i], 0.0);
            }
            self.fft.process(&mut spectrum);
            for (i, m) in magnitudes.iter_mut().enumerate() {
                *m = spectrum[i].norm();
            }

            let mag_total: f32 = magnitudes.iter().sum();
            if mag_total > 0.0 {
                let centroid = magnitudes
                    .iter()
                    .enumerate()
                    .map(|(k, m)| k as f32 * bin_hz * m)
                    .sum::<f32>()
                    / mag_total;
                let bandwidth = (magnitudes
                    .iter()
                    .enumerate()
                    .map(|(k, m)| {
                        let d = k as f32 * bin_hz - centroid;
                        m * d * d
                    })
                    .sum::<f32>()
                    / mag_total)
                    .sqrt();

                let target = ROLLOFF_FRACTION * mag_total;
                let mut cumulative = 0.0f32;
                let mut rolloff = (n_bins - 1) as f32 * bin_hz;
                for (k, m) in magnitudes.iter().enumerate() {
                    cumulative += m;
                    if cumulative >= target {
                        rolloff = k as f32 * bin_hz;
                        break;
                    }
                }

                centroid_sum += centroid as f64;
                bandwidth_sum += bandwidth as f64;
                rolloff_sum += rolloff as f64;
            }

            // Mel energies from the power spectrum, then log + DCT
            let mut log_mel = [0.0f32; N_MELS];
            for (band, filter) in self.mel_filters.iter().enumerate() {
                let energy: f32 = filter
                    .iter()
                    .map(|&(bin, w)| magnitudes[bin] * magnitudes[bin] * w)
                    .sum();
                log_mel[band] = (energy + LOG_FLOOR).ln();
            }
            for (k, row) in self.dct_basis.iter().enumerate() {
                let coeff: f32 = row.iter().zip(log_mel.iter()).map(|(b, e)| b * e).sum();
                mfcc_sums[k] += coeff as f64;
            }
        }

        let n = n_frames.max(1) as f64;
        let mut features = Vec::with_capacity(FEATURE_LEN);
        features.extend(mfcc_sums.iter().map(|s| s / n));
        features.push(zcr_sum / n);
        features.push(rms_sum / n);
        features.push(centroid_sum / n);
        features.push(bandwidth_sum / n);
        features.push(rolloff_sum / n);
        features
    }
}

/// Frame start positions: full frames while they fit, a single
/// zero-padded frame for short input
struct FrameIter {
    len: usize,
    pos: usize,
    done: bool,
}

impl FrameIter {
    fn new(len: usize) -> Self {
        Self {
            len,
            pos: 0,
            done: false,
        }
    }
}

impl Iterator for FrameIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        if self.len < FRAME_LEN {
            self.done = true;
            return Some(0);
        }
        if self.pos + FRAME_LEN > self.len {
            return None;
        }
        let start = self.pos;
        self.pos += HOP_LEN;
        Some(start)
    }
}

fn zero_crossing_rate(frame: &[f32]) -> f32 {
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

fn rms(frame: &[f32]) -> f32 {
    let sum_sq: f32 = frame.iter().map(|s| s * s).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over the FFT bins, stored sparsely
fn build_mel_filterbank(sample_rate: u32) -> Vec<Vec<(usize, f32)>> {
    let n_bins = FRAME_LEN / 2 + 1;
    let bin_hz = sample_rate as f32 / FRAME_LEN as f32;
    let mel_max = hz_to_mel(sample_rate as f32 / 2.0);

    let edges: Vec<f32> = (0..N_MELS + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (N_MELS + 1) as f32))
        .collect();

    (0..N_MELS)
        .map(|band| {
            let (left, center, right) = (edges[band], edges[band + 1], edges[band + 2]);
            let mut filter = Vec::new();
            for bin in 0..n_bins {
                let f = bin as f32 * bin_hz;
                let weight = if f > left && f <= center {
                    (f - left) / (center - left)
                } else if f > center && f < right {
                    (right - f) / (right - center)
                } else {
                    0.0
                };
                if weight > 0.0 {
                    filter.push((bin, weight));
                }
            }
            filter
        })
        .collect()
}

/// Orthonormal DCT-II rows for the first MFCC_COUNT coefficients
fn build_dct_basis() -> Vec<Vec<f32>> {
    let m = N_MELS as f32;
    (0..MFCC_COUNT)
        .map(|k| {
            let scale = if k == 0 { (1.0 / m).sqrt() } else { (2.0 / m).sqrt() };
            (0..N_MELS)
                .map(|n| {
                    scale
                        * (std::f32::consts::PI * k as f32 * (2.0 * n as f32 + 1.0) / (2.0 * m))
                            .cos()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22050;

    fn sine(freq: f32, amplitude: f32, secs: f32) -> Vec<f32> {
        let n = (SR as f32 * secs) as usize;
        (0..n)
            .map(|i| (std::f32::consts::TAU * freq * i as f32 / SR as f32).sin() * amplitude)
            .collect()
    }

    #[test]
    fn test_vector_shape_and_finiteness() {
        let extractor = FeatureExtractor::new(SR);
        let features = extractor.extract(&sine(440.0, 0.5, 1.0));
        assert_eq!(features.len(), FEATURE_LEN);
        assert!(features.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn test_sine_rms() {
        let extractor = FeatureExtractor::new(SR);
        let features = extractor.extract(&sine(440.0, 0.5, 1.0));
        // RMS of a sine is amplitude / sqrt(2)
        assert!((features[IDX_RMS] - 0.5 / 2.0f64.sqrt()).abs() < 0.01);
    }

    #[test]
    fn test_sine_zero_crossing_rate() {
        let extractor = FeatureExtractor::new(SR);
        let features = extractor.extract(&sine(440.0, 0.5, 1.0));
        // A 440 Hz tone crosses zero 880 times per second
        let expected = 2.0 * 440.0 / SR as f64;
        assert!((features[IDX_ZCR] - expected).abs() < 0.005);
    }

    #[test]
    fn test_sine_spectral_peak_location() {
        let extractor = FeatureExtractor::new(SR);
        let features = extractor.extract(&sine(440.0, 0.5, 1.0));
        // Centroid and rolloff sit at the tone, within a few bins
        assert!((features[IDX_CENTROID] - 440.0).abs() < 40.0);
        assert!((features[IDX_ROLLOFF] - 440.0).abs() < 40.0);
        // A pure tone is narrow-band
        assert!(features[IDX_BANDWIDTH] < 500.0);
    }

    #[test]
    fn test_higher_tone_moves_centroid() {
        let extractor = FeatureExtractor::new(SR);
        let low = extractor.extract(&sine(300.0, 0.5, 0.5));
        let high = extractor.extract(&sine(3000.0, 0.5, 0.5));
        assert!(high[IDX_CENTROID] > low[IDX_CENTROID] + 1000.0);
    }

    #[test]
    fn test_silence_is_finite_zeros() {
        let extractor = FeatureExtractor::new(SR);
        let features = extractor.extract(&vec![0.0f32; SR as usize]);
        assert_eq!(features.len(), FEATURE_LEN);
        assert!(features.iter().all(|f| f.is_finite()));
        assert_eq!(features[IDX_ZCR], 0.0);
        assert_eq!(features[IDX_RMS], 0.0);
        assert_eq!(features[IDX_CENTROID], 0.0);
    }

    #[test]
    fn test_short_input_is_padded() {
        let extractor = FeatureExtractor::new(SR);
        let features = extractor.extract(&[0.1, -0.1, 0.1, -0.1]);
        assert_eq!(features.len(), FEATURE_LEN);
        assert!(features.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn test_frame_iter_counts() {
        // 22050 samples: frames start at 0, 512, ... while a full frame fits
        let starts: Vec<usize> = FrameIter::new(22050).collect();
        assert_eq!(starts[0], 0);
        assert!(starts.iter().all(|s| s + FRAME_LEN <= 22050));
        assert_eq!(starts.len(), (22050 - FRAME_LEN) / HOP_LEN + 1);

        // Short input: exactly one padded frame
        let starts: Vec<usize> = FrameIter::new(100).collect();
        assert_eq!(starts, vec![0]);
    }
}
