//! Offline training path: landmark extraction over a labeled corpus, raw
//! landmark storage, batch normalization and classifier fitting.

use crate::classifier::NearestNeighborClassifier;
use crate::dataset::{BuildReport, FeatureDataset, RawSample};
use crate::error::Result;
use crate::normalize::LandmarkNormalizer;
use crate::store::ArrayStore;
use crate::types::LandmarkSet;

/// What a landmark detector saw in one image.
#[derive(Debug, Clone, PartialEq)]
pub enum HandDetection {
    Found(LandmarkSet),
    /// A normal outcome, not a failure.
    NoHand,
}

/// External hand landmark detector.
///
/// Implementations are expected to run with at most one hand per image in
/// static-image mode (see [`crate::config::DetectionConfig`]). `Err` is for
/// genuine failures such as an undecodable image.
pub trait LandmarkSource<I: ?Sized> {
    fn detect(&self, image: &I) -> Result<HandDetection>;
}

/// One labeled image of the training corpus.
#[derive(Debug, Clone)]
pub struct CorpusItem<I> {
    pub image: I,
    pub label: String,
    pub source: Option<String>,
}

/// Result of running the detector over a corpus.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// One entry per corpus item, in corpus order.
    pub samples: Vec<RawSample>,
    /// Items where no hand was found.
    pub no_hand: usize,
    /// Items the detector failed on.
    pub errors: usize,
}

impl Extraction {
    pub fn failed(&self) -> usize {
        self.no_hand + self.errors
    }
}

/// Run `detector` over every corpus item.
///
/// Items without a usable skeleton are kept as [`RawSample`]s with no
/// landmarks so that the later build step can count them as dropped.
pub fn extract_corpus<I, S, C>(detector: &S, corpus: C) -> Extraction
where
    S: LandmarkSource<I>,
    C: IntoIterator<Item = CorpusItem<I>>,
{
    let mut extraction = Extraction::default();
    for item in corpus {
        let landmarks = match detector.detect(&item.image) {
            Ok(HandDetection::Found(set)) => Some(set),
            Ok(HandDetection::NoHand) => {
                extraction.no_hand += 1;
                None
            }
            Err(e) => {
                log::warn!(
                    "Landmark extraction failed for {}: {}",
                    item.source.as_deref().unwrap_or("<unnamed>"),
                    e
                );
                extraction.errors += 1;
                None
            }
        };
        extraction.samples.push(RawSample {
            landmarks,
            label: item.label,
            source: item.source,
        });
    }

    log::info!(
        "Extracted landmarks from {} of {} images ({} without a hand, {} errors)",
        extraction.samples.len() - extraction.failed(),
        extraction.samples.len(),
        extraction.no_hand,
        extraction.errors
    );
    extraction
}

/// Pack the samples that have landmarks into a raw landmark store.
pub fn raw_store(samples: &[RawSample]) -> Result<ArrayStore> {
    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut paths = Vec::new();
    for sample in samples {
        if let Some(set) = &sample.landmarks {
            features.extend(set.to_flat_vec());
            labels.push(sample.label.clone());
            paths.push(sample.source.clone().unwrap_or_default());
        }
    }
    ArrayStore::new(features, labels, paths)
}

/// Unpack a raw landmark store.
pub fn raw_samples(store: &ArrayStore) -> Result<Vec<RawSample>> {
    store
        .iter_rows()
        .map(|(row, label, path)| {
            Ok(RawSample {
                landmarks: Some(LandmarkSet::from_flat(row)?),
                label: label.to_string(),
                source: (!path.is_empty()).then(|| path.to_string()),
            })
        })
        .collect()
}

/// Normalize every skeleton of a raw landmark store.
pub fn normalize_store(normalizer: &LandmarkNormalizer, raw: &ArrayStore) -> Result<BuildReport> {
    Ok(FeatureDataset::build(normalizer, raw_samples(raw)?))
}

/// Build a dataset from raw samples and fit a classifier on all of it.
pub fn train(
    normalizer: &LandmarkNormalizer,
    samples: Vec<RawSample>,
) -> Result<(NearestNeighborClassifier, BuildReport)> {
    let report = FeatureDataset::build(normalizer, samples);
    let classifier = NearestNeighborClassifier::fit(&report.dataset)?;
    Ok((classifier, report))
}
