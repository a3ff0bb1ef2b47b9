//! Classifier inference for screening decisions
//!
//! Loads a standard scaler and a gradient-boosted tree ensemble from JSON
//! artifacts. The audio detector degrades to a heuristic score when the
//! artifacts are absent; the clinical-values detector does not.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::audio::features::{FEATURE_LEN, IDX_CENTROID, IDX_RMS, MFCC_COUNT};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed model artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Model artifacts not available for {0}")]
    Missing(&'static str),
    #[error("Expected {expected} features, got {got}")]
    FeatureLength { expected: usize, got: usize },
    #[error("Scaler and model disagree on feature count")]
    ArtifactMismatch,
}

/// The 22 biomedical voice measurements accepted by the clinical detector,
/// in the order the model expects them
pub const CLINICAL_FEATURE_NAMES: [&str; 22] = [
    "MDVP:Fo(Hz)",
    "MDVP:Fhi(Hz)",
    "MDVP:Flo(Hz)",
    "MDVP:Jitter(%)",
    "MDVP:Jitter(Abs)",
    "MDVP:RAP",
    "MDVP:PPQ",
    "Jitter:DDP",
    "MDVP:Shimmer",
    "MDVP:Shimmer(dB)",
    "Shimmer:APQ3",
    "Shimmer:APQ5",
    "MDVP:APQ",
    "Shimmer:DDA",
    "NHR",
    "HNR",
    "RPDE",
    "DFA",
    "spread1",
    "spread2",
    "D2",
    "PPE",
];

/// Per-feature standardization: (x - mean) / scale
#[derive(Debug, Clone, Deserialize)]
pub struct Scaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.mean.len() || self.mean.len() != self.scale.len() {
            return Err(ModelError::FeatureLength {
                expected: self.mean.len(),
                got: features.len(),
            });
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (m, s))| if *s != 0.0 { (x - m) / s } else { 0.0 })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }
}

/// One node of a decision tree in array form
///
/// `feature >= 0` marks a split (go left when x < threshold);
/// `feature < 0` marks a leaf carrying `value`
#[derive(Debug, Clone, Deserialize)]
struct TreeNode {
    feature: i32,
    #[serde(default)]
    threshold: f64,
    #[serde(default)]
    left: usize,
    #[serde(default)]
    right: usize,
    #[serde(default)]
    value: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.feature < 0 {
                return node.value;
            }
            let feature = node.feature as usize;
            idx = if x[feature] < node.threshold {
                node.left
            } else {
                node.right
            };
        }
    }
}

/// Binary gradient-boosted tree ensemble
///
/// probability = sigmoid(base_score + sum of leaf values)
#[derive(Debug, Clone, Deserialize)]
pub struct GbtModel {
    #[serde(default)]
    base_score: f64,
    trees: Vec<Tree>,
    n_features: usize,
}

impl GbtModel {
    pub fn predict_probability(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != self.n_features {
            return Err(ModelError::FeatureLength {
                expected: self.n_features,
                got: x.len(),
            });
        }
        let margin: f64 = self.base_score + self.trees.iter().map(|t| t.predict(x)).sum::<f64>();
        Ok(sigmoid(margin))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Heuristic score used when no trained audio model is available
///
/// Mirrors the clinical heuristics encoded in the trained model: reduced
/// vocal energy, unusual spectral placement, and erratic MFCCs each add to
/// the score. Malformed vectors score 0.5.
pub fn fallback_probability(features: &[f64]) -> f64 {
    if features.len() < FEATURE_LEN {
        return 0.5;
    }

    let rms = features[IDX_RMS];
    let centroid = features[IDX_CENTROID];
    let mfcc = &features[..MFCC_COUNT];

    let mut score: f64 = 0.0;

    // Low vocal energy
    if rms < 0.02 {
        score += 0.3;
    }

    // Spectral centroid outside the typical speech band
    if !(2000.0..=5000.0).contains(&centroid) {
        score += 0.2;
    }

    // Erratic MFCC spread
    let mean = mfcc.iter().sum::<f64>() / mfcc.len() as f64;
    let variance = mfcc.iter().map(|c| (c - mean) * (c - mean)).sum::<f64>() / mfcc.len() as f64;
    if variance.sqrt() > 50.0 {
        score += 0.2;
    }

    score.min(1.0)
}

/// Loaded model + scaler pair
struct Artifacts {
    model: GbtModel,
    scaler: Scaler,
}

impl Artifacts {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let scaled = self.scaler.transform(features)?;
        self.model.predict_probability(&scaled)
    }
}

/// Outcome of a classification
#[derive(Debug, Clone, Copy)]
pub struct Prediction {
    /// Probability of Parkinson's, 0..1
    pub probability: f64,
    /// Confidence percentage, rounded to two decimals
    pub confidence: f64,
    /// Probability strictly above the detector threshold
    pub is_positive: bool,
    /// False when the heuristic fallback produced the score
    pub used_model: bool,
}

/// A classifier with its decision threshold
pub struct Detector {
    artifacts: Option<Artifacts>,
    threshold: f64,
    name: &'static str,
}

impl Detector {
    /// Load model and scaler artifacts from `dir`
    ///
    /// Missing files leave the detector in fallback mode; malformed files
    /// are an error.
    pub fn load(
        dir: &Path,
        model_file: &str,
        scaler_file: &str,
        threshold: f64,
        name: &'static str,
    ) -> Result<Self, ModelError> {
        let model_path = dir.join(model_file);
        let scaler_path = dir.join(scaler_file);

        let artifacts = if model_path.exists() && scaler_path.exists() {
            let model: GbtModel = serde_json::from_str(&std::fs::read_to_string(&model_path)?)?;
            let scaler: Scaler = serde_json::from_str(&std::fs::read_to_string(&scaler_path)?)?;
            if scaler.len() != model.n_features {
                return Err(ModelError::ArtifactMismatch);
            }
            info!("{} model and scaler loaded successfully", name);
            Some(Artifacts { model, scaler })
        } else {
            info!("{} model files not found, using fallback detection", name);
            None
        };

        Ok(Self {
            artifacts,
            threshold,
            name,
        })
    }

    pub fn has_model(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Classify an audio feature vector, degrading to the heuristic score
    /// when the model is absent or rejects the input
    pub fn predict(&self, features: &[f64]) -> Prediction {
        let (probability, used_model) = match &self.artifacts {
            Some(artifacts) => match artifacts.predict(features) {
                Ok(p) => (p, true),
                Err(e) => {
                    warn!("{} prediction failed, using fallback: {}", self.name, e);
                    (fallback_probability(features), false)
                }
            },
            None => (fallback_probability(features), false),
        };
        self.verdict(probability, used_model)
    }

    /// Classify clinical values; no fallback exists for this detector
    pub fn predict_strict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        let artifacts = self
            .artifacts
            .as_ref()
            .ok_or(ModelError::Missing(self.name))?;
        let probability = artifacts.predict(features)?;
        Ok(self.verdict(probability, true))
    }

    fn verdict(&self, probability: f64, used_model: bool) -> Prediction {
        Prediction {
            probability,
            confidence: (probability * 10000.0).round() / 100.0,
            is_positive: probability > self.threshold,
            used_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_artifacts(dir: &Path, n_features: usize) {
        // Single stump: +2.0 when feature 0 >= 0 (after scaling), else -2.0
        let model = serde_json::json!({
            "base_score": 0.0,
            "n_features": n_features,
            "trees": [{
                "nodes": [
                    {"feature": 0, "threshold": 0.0, "left": 1, "right": 2},
                    {"feature": -1, "value": -2.0},
                    {"feature": -1, "value": 2.0}
                ]
            }]
        });
        let scaler = serde_json::json!({
            "mean": vec![0.0; n_features],
            "scale": vec![1.0; n_features],
        });
        std::fs::write(dir.join("model.json"), model.to_string()).unwrap();
        std::fs::write(dir.join("scaler.json"), scaler.to_string()).unwrap();
    }

    #[test]
    fn test_scaler_transform() {
        let scaler = Scaler {
            mean: vec![1.0, 2.0],
            scale: vec![2.0, 0.5],
        };
        let scaled = scaler.transform(&[3.0, 1.0]).unwrap();
        assert_eq!(scaled, vec![1.0, -2.0]);

        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(ModelError::FeatureLength { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_ensemble_sigmoid_margin() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), 2);
        let detector = Detector::load(dir.path(), "model.json", "scaler.json", 0.65, "test")
            .unwrap();
        assert!(detector.has_model());

        // Margin +2.0 -> sigmoid(2.0) ~ 0.8808
        let positive = detector.predict(&[1.0, 0.0]);
        assert!(positive.used_model);
        assert!((positive.probability - 0.8808).abs() < 0.001);
        assert!(positive.is_positive);
        assert_eq!(positive.confidence, 88.08);

        // Margin -2.0 -> sigmoid(-2.0) ~ 0.1192
        let negative = detector.predict(&[-1.0, 0.0]);
        assert!(!negative.is_positive);
        assert!((negative.probability - 0.1192).abs() < 0.001);
    }

    #[test]
    fn test_wrong_length_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), 2);
        let detector = Detector::load(dir.path(), "model.json", "scaler.json", 0.65, "test")
            .unwrap();

        // Vector too short for the model and for the heuristic -> 0.5
        let prediction = detector.predict(&[1.0]);
        assert!(!prediction.used_model);
        assert_eq!(prediction.probability, 0.5);
    }

    #[test]
    fn test_missing_artifacts_use_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let detector = Detector::load(dir.path(), "model.json", "scaler.json", 0.65, "audio")
            .unwrap();
        assert!(!detector.has_model());

        let prediction = detector.predict(&vec![0.0; FEATURE_LEN]);
        assert!(!prediction.used_model);

        assert!(matches!(
            detector.predict_strict(&vec![0.0; 22]),
            Err(ModelError::Missing(_))
        ));
    }

    #[test]
    fn test_fallback_scoring() {
        // Quiet voice, low centroid, flat MFCCs: 0.3 + 0.2
        let mut features = vec![0.0; FEATURE_LEN];
        features[IDX_RMS] = 0.01;
        features[IDX_CENTROID] = 1500.0;
        assert!((fallback_probability(&features) - 0.5).abs() < 1e-9);

        // Healthy-looking vector scores zero
        let mut features = vec![0.0; FEATURE_LEN];
        features[IDX_RMS] = 0.1;
        features[IDX_CENTROID] = 3000.0;
        assert_eq!(fallback_probability(&features), 0.0);

        // Erratic MFCCs add 0.2
        let mut features = vec![0.0; FEATURE_LEN];
        features[IDX_RMS] = 0.1;
        features[IDX_CENTROID] = 3000.0;
        for (i, c) in features.iter_mut().take(MFCC_COUNT).enumerate() {
            *c = if i % 2 == 0 { 120.0 } else { -120.0 };
        }
        assert!((fallback_probability(&features) - 0.2).abs() < 1e-9);

        // Malformed vector
        assert_eq!(fallback_probability(&[1.0, 2.0]), 0.5);
    }

    #[test]
    fn test_threshold_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let detector = Detector::load(dir.path(), "model.json", "scaler.json", 0.5, "audio")
            .unwrap();
        // Fallback on a short vector returns exactly 0.5, not above it
        let prediction = detector.predict(&[0.0]);
        assert_eq!(prediction.probability, 0.5);
        assert!(!prediction.is_positive);
    }
}
