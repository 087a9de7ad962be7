//! Online inference: one image in, one structured outcome out.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::classifier::NearestNeighborClassifier;
use crate::dataset::FeatureDataset;
use crate::describe::DescriptionLookup;
use crate::error::{Error, Result};
use crate::normalize::LandmarkNormalizer;
use crate::pipeline::{HandDetection, LandmarkSource};
use crate::types::LandmarkSet;

/// A recognized mudra.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognition {
    pub label: String,
    pub distance: f64,
    pub description: Option<String>,
}

/// Every way an inference request can end. None of them is a panic.
#[derive(Debug)]
pub enum InferenceOutcome {
    Recognized(Recognition),
    NoHandDetected,
    /// No classifier has been installed yet.
    ModelNotReady,
    /// The request itself was unusable, e.g. degenerate anchors.
    Rejected(Error),
}

impl InferenceOutcome {
    /// Collapse into a `Result`; a missing hand is `Ok(None)`.
    pub fn into_result(self) -> Result<Option<Recognition>> {
        match self {
            InferenceOutcome::Recognized(r) => Ok(Some(r)),
            InferenceOutcome::NoHandDetected => Ok(None),
            InferenceOutcome::ModelNotReady => Err(Error::ModelNotFitted),
            InferenceOutcome::Rejected(e) => Err(e),
        }
    }
}

/// Owns the detector, the normalizer and the currently installed classifier.
///
/// The classifier is read-only once installed. Requests take a cheap `Arc`
/// clone under a read lock and classify without holding it; [`reload`]
/// replaces the classifier under the write lock, so a request sees either the
/// old index or the new one.
///
/// [`reload`]: MudraService::reload
pub struct MudraService<S> {
    detector: S,
    normalizer: LandmarkNormalizer,
    descriptions: Option<DescriptionLookup>,
    classifier: RwLock<Option<Arc<NearestNeighborClassifier>>>,
}

impl<S> MudraService<S> {
    pub fn new(detector: S) -> Self {
        Self {
            detector,
            normalizer: LandmarkNormalizer::new(),
            descriptions: None,
            classifier: RwLock::new(None),
        }
    }

    pub fn with_descriptions(mut self, descriptions: DescriptionLookup) -> Self {
        self.descriptions = Some(descriptions);
        self
    }

    pub fn detector(&self) -> &S {
        &self.detector
    }

    pub fn ready(&self) -> bool {
        self.current().is_some()
    }

    /// The installed classifier, if any.
    pub fn current(&self) -> Option<Arc<NearestNeighborClassifier>> {
        self.classifier
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a fitted classifier, returning the one it replaces.
    pub fn install(&self, classifier: NearestNeighborClassifier) -> Option<Arc<NearestNeighborClassifier>> {
        let mut slot = self
            .classifier
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.replace(Arc::new(classifier))
    }

    pub fn unload(&self) -> Option<Arc<NearestNeighborClassifier>> {
        self.classifier
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Load a feature store, fit on all of it and install the result.
    ///
    /// Loading and fitting happen before the lock is taken. If either fails
    /// the previously installed classifier stays in place.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let dataset = FeatureDataset::load(path)?;
        let classifier = NearestNeighborClassifier::fit(&dataset)?;
        let n = classifier.len();
        self.install(classifier);
        log::info!("Classifier reloaded from {} ({} samples)", path.display(), n);
        Ok(n)
    }

    /// Classify a skeleton that has already been extracted.
    pub fn classify_landmarks(&self, landmarks: &LandmarkSet) -> InferenceOutcome {
        let Some(classifier) = self.current() else {
            return InferenceOutcome::ModelNotReady;
        };

        let features = match self.normalizer.normalize(landmarks) {
            Ok(f) => f,
            Err(e) => return InferenceOutcome::Rejected(e),
        };
        let prediction = classifier.classify(&features);
        let description = self
            .descriptions
            .as_ref()
            .and_then(|d| d.describe(&prediction.label));

        InferenceOutcome::Recognized(Recognition {
            label: prediction.label,
            distance: prediction.distance,
            description,
        })
    }

    /// Detect, normalize and classify one image.
    pub fn infer<I: ?Sized>(&self, image: &I) -> InferenceOutcome
    where
        S: LandmarkSource<I>,
    {
        if !self.ready() {
            return InferenceOutcome::ModelNotReady;
        }
        match self.detector.detect(image) {
            Ok(HandDetection::Found(landmarks)) => self.classify_landmarks(&landmarks),
            Ok(HandDetection::NoHand) => InferenceOutcome::NoHandDetected,
            Err(e) => InferenceOutcome::Rejected(e),
        }
    }
}
