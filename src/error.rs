use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite feature value at index {index}")]
    NonFiniteFeature { index: usize },

    #[error("Degenerate anchor points: {reason}")]
    DegenerateAnchors { reason: String },

    #[error("Dataset is empty, nothing to fit")]
    EmptyDataset,

    #[error("Classifier has not been fitted")]
    ModelNotFitted,

    #[error("Feature store not found: {}", .0.display())]
    FeatureStoreNotFound(PathBuf),

    #[error("Feature store {} is corrupt: {detail}", .path.display())]
    FeatureStoreCorrupt { path: PathBuf, detail: String },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Description lookup failed: {0}")]
    DescriptionLookup(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateAnchors {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
