//! # mudra-match
//!
//! Static hand pose ("mudra") recognition from 21-point 3D hand landmarks.
//!
//! This crate provides:
//! - **Alignment**: closed-form least-squares similarity fit (Umeyama) of four
//!   anchor landmarks onto a fixed canonical frame
//! - **Normalization**: the fitted transform applied to the whole skeleton,
//!   removing position, orientation and scale
//! - **Classification**: 1-nearest-neighbor matching against a labeled
//!   reference set, with the distance as a confidence proxy
//! - **Datasets**: batch building, stratified splitting and an atomic
//!   columnar store for features, labels and source paths
//!
//! Hand detection itself is external: plug a detector in through the
//! [`LandmarkSource`] trait.
//!
//! ## Algorithm Overview
//!
//! 1. Take the wrist, index base, pinky base and thumb base landmarks
//! 2. Fit scale, rotation and translation onto the canonical anchors
//!    (wrist at the origin, index base on +x, pinky base on -x, thumb base on +y)
//! 3. Apply the transform to all 21 points and flatten to 63 values
//! 4. Return the label of the closest reference vector
//!
//! ## Quick Start
//!
//! ```rust
//! use mudra_match::{
//!     FeatureDataset, LandmarkNormalizer, LandmarkSet, NearestNeighborClassifier, Point3,
//!     RawSample,
//! };
//!
//! // A toy skeleton: 21 points on an arc, fingertips pushed out by `spread`.
//! fn hand(spread: f32) -> LandmarkSet {
//!     let points = (0..21)
//!         .map(|i| {
//!             let a = i as f32 * 0.3;
//!             let r = if i % 4 == 0 && i > 0 { 40.0 + spread } else { 40.0 };
//!             Point3::new(300.0 + r * a.cos(), 220.0 + r * a.sin(), 0.0)
//!         })
//!         .collect();
//!     LandmarkSet::from_points(points).unwrap()
//! }
//!
//! let normalizer = LandmarkNormalizer::new();
//! let report = FeatureDataset::build(
//!     &normalizer,
//!     vec![
//!         RawSample { landmarks: Some(hand(0.0)), label: "Pataka".into(), source: None },
//!         RawSample { landmarks: Some(hand(25.0)), label: "Alapadmam".into(), source: None },
//!     ],
//! );
//! let knn = NearestNeighborClassifier::fit(&report.dataset).unwrap();
//!
//! let query = normalizer.normalize(&hand(22.0)).unwrap();
//! let prediction = knn.classify(&query);
//! assert_eq!(prediction.label, "Alapadmam");
//! ```
//!
//! ## Serving
//!
//! [`MudraService`] owns a detector and the installed classifier. It answers
//! every request with an [`InferenceOutcome`] (recognized, no hand, model not
//! ready, rejected) and can reload its classifier from a feature store while
//! other threads keep classifying.

pub mod alignment;
pub mod anchors;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod describe;
mod error;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod service;
pub mod store;
mod types;

pub use alignment::{estimate_similarity_transform, SimilarityTransform};
pub use anchors::AnchorFrame;
pub use classifier::{NearestNeighborClassifier, Prediction};
pub use config::Config;
pub use dataset::{BuildReport, FeatureDataset, LabeledSample, RawSample};
pub use describe::{DescriptionLookup, DescriptionSource, StaticDescriptions};
pub use error::{Error, Result};
pub use metrics::{evaluate_split, ClassReport, Evaluation};
pub use normalize::LandmarkNormalizer;
pub use pipeline::{CorpusItem, Extraction, HandDetection, LandmarkSource};
pub use service::{InferenceOutcome, MudraService, Recognition};
pub use store::ArrayStore;
pub use types::{FeatureVector, HandLandmark, LandmarkSet, Point3, FEATURE_DIM, NUM_LANDMARKS};
