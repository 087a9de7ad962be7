//! Configuration management for the training and inference tools.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::describe::{DescriptionLookup, StaticDescriptions};
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feature store locations
    pub store: StoreConfig,

    /// Held-out evaluation parameters
    pub evaluation: EvaluationConfig,

    /// Settings handed to the external landmark detector
    pub detection: DetectionConfig,

    /// Label to description mapping
    pub descriptions: DescriptionConfig,
}

/// Feature store paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Raw (unnormalized) landmarks, one row per image
    pub raw_landmarks: PathBuf,

    /// Normalized features used by the classifier
    pub features: PathBuf,
}

/// Stratified split parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Share of each class held out for testing (0.0-1.0, exclusive)
    pub test_fraction: f64,

    /// Seed for the split
    pub seed: u64,
}

/// Landmark detector parameters.
///
/// Detection runs outside this crate, so these values are only carried and
/// validated here for whatever [`LandmarkSource`](crate::LandmarkSource)
/// implementation is plugged in. Sources reading precomputed skeletons
/// ignore them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Maximum hands per image; only single-hand detection is supported
    pub max_hands: usize,

    /// Treat every input as an unrelated still image
    pub static_image_mode: bool,

    /// Minimum detector confidence (0.0-1.0)
    pub min_detection_confidence: f32,
}

/// Description lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptionConfig {
    /// Label -> lookup key
    pub keys: BTreeMap<String, String>,

    /// Lookup key -> description text
    pub texts: BTreeMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            raw_landmarks: PathBuf::from("features/raw_landmarks.bin"),
            features: PathBuf::from("features/normalized_features.bin"),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_hands: 1,
            static_image_mode: true,
            min_detection_confidence: 0.5,
        }
    }
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        let keys = [
            ("Alapadmam", "asamyuta-hasta-bharatanatyam/Alapadma-Hasta"),
            ("Anjali", "samyuta-hasta-bharatanatyam/Anjali-Hasta-Bharatanatyam"),
            ("Aralam", "asamyuta-hasta-bharatanatyam/Arala-Hasta"),
            ("Ardhachandran", "asamyuta-hasta-bharatanatyam/Ardhacandra-Hasta"),
            ("Ardhapathaka", "asamyuta-hasta-bharatanatyam/Ardhapataka-Hasta"),
        ]
        .into_iter()
        .map(|(label, key)| (label.to_string(), key.to_string()))
        .collect();

        Self {
            keys,
            texts: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let fraction = self.evaluation.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::Config(format!(
                "Test fraction must be strictly between 0.0 and 1.0, got {}",
                fraction
            )));
        }

        if self.detection.max_hands != 1 {
            return Err(Error::Config(format!(
                "Only single-hand detection is supported, got max_hands = {}",
                self.detection.max_hands
            )));
        }
        if !(0.0..=1.0).contains(&self.detection.min_detection_confidence) {
            return Err(Error::Config(
                "Detection confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build a description lookup backed by the configured texts
    pub fn description_lookup(&self) -> DescriptionLookup {
        let texts: StaticDescriptions = self.descriptions.texts.clone().into_iter().collect();
        DescriptionLookup::new(self.descriptions.keys.clone(), Box::new(texts))
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Mudra recognition configuration

# Feature stores
store:
  raw_landmarks: "features/raw_landmarks.bin"
  features: "features/normalized_features.bin"

# Held-out evaluation
evaluation:
  test_fraction: 0.2
  seed: 42

# External landmark detector
detection:
  max_hands: 1
  static_image_mode: true
  min_detection_confidence: 0.5

# Descriptions: label -> key, key -> text
descriptions:
  keys:
    Alapadmam: "asamyuta-hasta-bharatanatyam/Alapadma-Hasta"
    Anjali: "samyuta-hasta-bharatanatyam/Anjali-Hasta-Bharatanatyam"
    Aralam: "asamyuta-hasta-bharatanatyam/Arala-Hasta"
    Ardhachandran: "asamyuta-hasta-bharatanatyam/Ardhacandra-Hasta"
    Ardhapathaka: "asamyuta-hasta-bharatanatyam/Ardhapataka-Hasta"
  texts: {}
"#;
