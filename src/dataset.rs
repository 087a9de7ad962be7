//! Labeled collections of normalized skeletons.

use std::collections::BTreeMap;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::normalize::LandmarkNormalizer;
use crate::store::ArrayStore;
use crate::types::{FeatureVector, LandmarkSet};

/// One normalized skeleton with its class name.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: String,
    /// Where the sample came from, typically the image path.
    pub source: Option<String>,
}

/// A corpus item before normalization.
///
/// `landmarks` is `None` when extraction failed upstream (unreadable image,
/// no hand found).
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub landmarks: Option<LandmarkSet>,
    pub label: String,
    pub source: Option<String>,
}

/// Outcome of a batch build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub dataset: FeatureDataset,
    /// Samples that arrived without landmarks.
    pub missing: usize,
    /// Samples whose anchors could not be aligned.
    pub degenerate: usize,
}

impl BuildReport {
    pub fn dropped(&self) -> usize {
        self.missing + self.degenerate
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureDataset {
    samples: Vec<LabeledSample>,
}

enum Outcome {
    Kept(LabeledSample),
    Missing,
    Degenerate,
}

impl FeatureDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<LabeledSample>) -> Self {
        Self { samples }
    }

    /// Normalize a batch of raw samples.
    ///
    /// Samples are processed in parallel; the dataset keeps the input order.
    /// Failed samples are counted and skipped, never aborting the batch.
    pub fn build(normalizer: &LandmarkNormalizer, samples: Vec<RawSample>) -> BuildReport {
        let total = samples.len();
        let outcomes: Vec<Outcome> = samples
            .into_par_iter()
            .map(|raw| {
                let Some(landmarks) = raw.landmarks else {
                    return Outcome::Missing;
                };
                match normalizer.normalize(&landmarks) {
                    Ok(features) => Outcome::Kept(LabeledSample {
                        features,
                        label: raw.label,
                        source: raw.source,
                    }),
                    Err(e) => {
                        log::debug!(
                            "Dropping {} ({}): {}",
                            raw.source.as_deref().unwrap_or("<unnamed>"),
                            raw.label,
                            e
                        );
                        Outcome::Degenerate
                    }
                }
            })
            .collect();

        let mut dataset = Self::new();
        let mut missing = 0;
        let mut degenerate = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Kept(sample) => dataset.samples.push(sample),
                Outcome::Missing => missing += 1,
                Outcome::Degenerate => degenerate += 1,
            }
        }

        log::info!(
            "Built {} of {} samples ({} without landmarks, {} degenerate)",
            dataset.len(),
            total,
            missing,
            degenerate
        );

        BuildReport {
            dataset,
            missing,
            degenerate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: LabeledSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledSample> {
        self.samples.iter()
    }

    /// Sorted, de-duplicated class names.
    pub fn classes(&self) -> Vec<String> {
        self.class_counts().into_keys().collect()
    }

    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.samples {
            *counts.entry(s.label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// A new dataset with the rows at `indices`, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            samples: indices.iter().map(|&i| self.samples[i].clone()).collect(),
        }
    }

    /// Split into (train, test) keeping each class's share in both parts.
    ///
    /// Each class contributes `round(n_c * test_fraction)` rows to the test
    /// part, clamped so both parts get at least one. Rows are drawn with a
    /// generator seeded from `seed`; both parts keep dataset order.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(Error::InvalidSplit(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }

        let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, s) in self.samples.iter().enumerate() {
            by_class.entry(s.label.as_str()).or_default().push(i);
        }
        if let Some((label, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
            return Err(Error::InvalidSplit(format!(
                "class '{}' has {} sample(s), at least 2 are needed",
                label,
                rows.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Vec::with_capacity(self.len());
        let mut test = Vec::new();
        for rows in by_class.values_mut() {
            let n = rows.len();
            let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
            rows.shuffle(&mut rng);
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }
        train.sort_unstable();
        test.sort_unstable();

        log::debug!(
            "Stratified split (seed {}): {} train / {} test",
            seed,
            train.len(),
            test.len()
        );

        Ok((self.subset(&train), self.subset(&test)))
    }

    /// Convert to the persisted three-array layout.
    pub fn to_store(&self) -> Result<ArrayStore> {
        let mut features = Vec::with_capacity(self.len() * crate::types::FEATURE_DIM);
        let mut labels = Vec::with_capacity(self.len());
        let mut paths = Vec::with_capacity(self.len());
        for s in &self.samples {
            features.extend_from_slice(s.features.as_slice());
            labels.push(s.label.clone());
            paths.push(s.source.clone().unwrap_or_default());
        }
        ArrayStore::new(features, labels, paths)
    }

    /// Rebuild a dataset from a store. Empty source paths become `None`.
    pub fn from_store(store: &ArrayStore) -> Result<Self> {
        let samples = store
            .iter_rows()
            .map(|(row, label, path)| {
                Ok(LabeledSample {
                    features: FeatureVector::new(row.to_vec())?,
                    label: label.to_string(),
                    source: (!path.is_empty()).then(|| path.to_string()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { samples })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_store()?.save(path)
    }

    /// Load a normalized feature store.
    ///
    /// A row holding NaN or infinity could never be matched, so the whole
    /// store is reported as corrupt, naming the first such row.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let store = ArrayStore::load(path)?;
        if let Some(index) = store.features().iter().position(|v| !v.is_finite()) {
            return Err(Error::FeatureStoreCorrupt {
                path: path.to_path_buf(),
                detail: format!(
                    "row {}: expected finite features, found {} in column {}",
                    index / store.cols(),
                    store.features()[index],
                    index % store.cols()
                ),
            });
        }
        Self::from_store(&store)
    }
}

impl<'a> IntoIterator for &'a FeatureDataset {
    type Item = &'a LabeledSample;
    type IntoIter = std::slice::Iter<'a, LabeledSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point3, FEATURE_DIM, NUM_LANDMARKS};

    fn vector(fill: f32) -> FeatureVector {
        FeatureVector::new(vec![fill; FEATURE_DIM]).unwrap()
    }

    fn dataset(per_class: &[(&str, usize)]) -> FeatureDataset {
        let mut ds = FeatureDataset::new();
        for (c, &(label, n)) in per_class.iter().enumerate() {
            for i in 0..n {
                ds.push(LabeledSample {
                    features: vector(c as f32 * 10.0 + i as f32),
                    label: label.to_string(),
                    source: Some(format!("{}/{}.jpg", label, i)),
                });
            }
        }
        ds
    }

    fn skeleton(offset: f32) -> LandmarkSet {
        let points = (0..NUM_LANDMARKS)
            .map(|i| {
                let a = i as f32 * 0.3;
                Point3::new(100.0 + 40.0 * a.cos() + offset, 200.0 + 40.0 * a.sin(), i as f32)
            })
            .collect();
        LandmarkSet::from_points(points).unwrap()
    }

    #[test]
    fn build_counts_dropped_samples_and_keeps_order() {
        let samples = vec![
            RawSample {
                landmarks: Some(skeleton(0.0)),
                label: "Anjali".into(),
                source: Some("a.jpg".into()),
            },
            RawSample {
                landmarks: None,
                label: "Anjali".into(),
                source: Some("b.jpg".into()),
            },
            RawSample {
                landmarks: Some(
                    LandmarkSet::from_points(vec![Point3::new(1.0, 1.0, 1.0); NUM_LANDMARKS])
                        .unwrap(),
                ),
                label: "Aralam".into(),
                source: Some("c.jpg".into()),
            },
            RawSample {
                landmarks: Some(skeleton(5.0)),
                label: "Aralam".into(),
                source: Some("d.jpg".into()),
            },
        ];

        let report = FeatureDataset::build(&LandmarkNormalizer::new(), samples);

        assert_eq!(report.missing, 1);
        assert_eq!(report.degenerate, 1);
        assert_eq!(report.dropped(), 2);
        let sources: Vec<_> = report
            .dataset
            .iter()
            .map(|s| s.source.clone().unwrap())
            .collect();
        assert_eq!(sources, vec!["a.jpg", "d.jpg"]);
    }

    #[test]
    fn stratified_split_sizes() {
        let ds = dataset(&[("A", 10), ("B", 10), ("C", 10)]);
        let (train, test) = ds.stratified_split(0.2, 42).unwrap();

        assert_eq!(train.len(), 24);
        assert_eq!(test.len(), 6);
        for count in test.class_counts().values() {
            assert_eq!(*count, 2);
        }
        for count in train.class_counts().values() {
            assert_eq!(*count, 8);
        }
        assert_eq!(train.classes(), ds.classes());
    }

    #[test]
    fn stratified_split_partitions_rows() {
        let ds = dataset(&[("A", 7), ("B", 3), ("C", 12)]);
        let (train, test) = ds.stratified_split(0.25, 3).unwrap();

        let mut all: Vec<_> = train
            .iter()
            .chain(test.iter())
            .map(|s| s.source.clone().unwrap())
            .collect();
        all.sort();
        let mut expected: Vec<_> = ds.iter().map(|s| s.source.clone().unwrap()).collect();
        expected.sort();
        assert_eq!(all, expected);
        assert_eq!(test.class_counts().len(), 3);
        assert_eq!(train.class_counts().len(), 3);
    }

    #[test]
    fn stratified_split_is_deterministic() {
        let ds = dataset(&[("A", 10), ("B", 10)]);
        let first = ds.stratified_split(0.3, 99).unwrap();
        let second = ds.stratified_split(0.3, 99).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn stratified_split_rejects_singleton_class() {
        let ds = dataset(&[("A", 5), ("B", 1)]);
        match ds.stratified_split(0.2, 0) {
            Err(Error::InvalidSplit(msg)) => assert!(msg.contains("'B'"), "{}", msg),
            other => panic!("expected InvalidSplit, got {:?}", other),
        }
    }

    #[test]
    fn stratified_split_rejects_bad_fraction() {
        let ds = dataset(&[("A", 5)]);
        assert!(ds.stratified_split(0.0, 0).is_err());
        assert!(ds.stratified_split(1.0, 0).is_err());
        assert!(ds.stratified_split(f64::NAN, 0).is_err());
    }

    #[test]
    fn store_round_trip() {
        let mut ds = dataset(&[("Anjali", 2), ("Aralam", 2)]);
        ds.samples[1].source = None;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normalized.bin");
        ds.save(&path).unwrap();
        let loaded = FeatureDataset::load(&path).unwrap();

        assert_eq!(loaded, ds);
    }

    #[test]
    fn non_finite_rows_are_rejected_on_load() {
        let mut features = vec![0.0; FEATURE_DIM];
        features.extend(vec![f32::NAN; FEATURE_DIM]);
        let store = ArrayStore::new(
            features,
            vec!["Anjali".into(), "Aralam".into()],
            vec!["".into(), "".into()],
        )
        .unwrap();

        assert!(matches!(
            FeatureDataset::from_store(&store),
            Err(Error::NonFiniteFeature { index: 0 })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nan.bin");
        store.save(&path).unwrap();

        match FeatureDataset::load(&path) {
            Err(Error::FeatureStoreCorrupt { detail, .. }) => {
                assert!(detail.starts_with("row 1:"), "{}", detail);
            }
            other => panic!("expected corrupt store, got {:?}", other),
        }
    }
}
