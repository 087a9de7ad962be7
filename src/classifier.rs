use rayon::prelude::*;
use serde::Serialize;

use crate::dataset::FeatureDataset;
use crate::error::{Error, Result};
use crate::types::{squared_distance, FeatureVector, FEATURE_DIM};

/// Result of a nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Euclidean distance to the matched training vector. Smaller is a
    /// closer match; it is not a calibrated probability.
    pub distance: f64,
    /// Row of the matched vector in the training dataset.
    pub index: usize,
}

/// 1-nearest-neighbor classifier over normalized skeletons.
///
/// Fitting copies the training matrix into one contiguous buffer; lookups are
/// a linear scan. Once fitted the classifier is immutable, so a single
/// instance can be shared between threads.
#[derive(Debug, Clone)]
pub struct NearestNeighborClassifier {
    features: Vec<f32>,
    labels: Vec<String>,
}

impl NearestNeighborClassifier {
    pub fn fit(dataset: &FeatureDataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let mut features = Vec::with_capacity(dataset.len() * FEATURE_DIM);
        let mut labels = Vec::with_capacity(dataset.len());
        for sample in dataset {
            features.extend_from_slice(sample.features.as_slice());
            labels.push(sample.label.clone());
        }

        log::debug!("Fitted nearest-neighbor index over {} samples", labels.len());
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Find the closest training vector. Ties go to the earliest row.
    pub fn classify(&self, query: &FeatureVector) -> Prediction {
        let q = query.as_slice();
        let mut best_index = 0;
        let mut best = f64::INFINITY;
        for (i, row) in self.features.chunks_exact(FEATURE_DIM).enumerate() {
            let d = squared_distance(row, q);
            if d < best {
                best = d;
                best_index = i;
            }
        }

        Prediction {
            label: self.labels[best_index].clone(),
            distance: best.sqrt(),
            index: best_index,
        }
    }

    /// Classify many queries in parallel; results keep query order.
    pub fn classify_batch(&self, queries: &[FeatureVector]) -> Vec<Prediction> {
        queries.par_iter().map(|q| self.classify(q)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LabeledSample;

    fn sample(values: &[(usize, f32)], label: &str) -> LabeledSample {
        let mut v = vec![0.0; FEATURE_DIM];
        for &(i, x) in values {
            v[i] = x;
        }
        LabeledSample {
            features: FeatureVector::new(v).unwrap(),
            label: label.into(),
            source: None,
        }
    }

    fn query(values: &[(usize, f32)]) -> FeatureVector {
        sample(values, "").features
    }

    #[test]
    fn fit_rejects_empty_dataset() {
        assert!(matches!(
            NearestNeighborClassifier::fit(&FeatureDataset::new()),
            Err(Error::EmptyDataset)
        ));
    }

    #[test]
    fn picks_nearest_and_reports_distance() {
        let ds = FeatureDataset::from_samples(vec![
            sample(&[(0, 0.0)], "Anjali"),
            sample(&[(0, 10.0)], "Aralam"),
            sample(&[(1, 10.0)], "Alapadmam"),
        ]);
        let knn = NearestNeighborClassifier::fit(&ds).unwrap();
        assert_eq!(knn.len(), 3);

        let p = knn.classify(&query(&[(0, 7.0)]));
        assert_eq!(p.label, "Aralam");
        assert_eq!(p.index, 1);
        assert!((p.distance - 3.0).abs() < 1e-12);

        let p = knn.classify(&query(&[(1, 9.0), (2, 1.0)]));
        assert_eq!(p.label, "Alapadmam");
        assert!((p.distance - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn exact_match_has_zero_distance() {
        let ds = FeatureDataset::from_samples(vec![sample(&[(5, 0.25), (40, -0.5)], "Anjali")]);
        let knn = NearestNeighborClassifier::fit(&ds).unwrap();

        let p = knn.classify(&ds.samples()[0].features);
        assert_eq!(p.distance, 0.0);
    }

    #[test]
    fn ties_go_to_first_row() {
        let ds = FeatureDataset::from_samples(vec![
            sample(&[(0, -1.0)], "first"),
            sample(&[(0, 1.0)], "second"),
            sample(&[(0, -1.0)], "third"),
        ]);
        let knn = NearestNeighborClassifier::fit(&ds).unwrap();

        let p = knn.classify(&query(&[]));
        assert_eq!(p.label, "first");
        assert_eq!(p.index, 0);
    }

    #[test]
    fn classification_is_deterministic() {
        let ds = FeatureDataset::from_samples(
            (0..50)
                .map(|i| sample(&[(i % FEATURE_DIM, i as f32 * 0.1)], &format!("c{}", i % 4)))
                .collect(),
        );
        let knn = NearestNeighborClassifier::fit(&ds).unwrap();
        let q = query(&[(3, 0.2), (17, 1.1)]);

        let first = knn.classify(&q);
        for _ in 0..10 {
            assert_eq!(knn.classify(&q), first);
        }
        assert_eq!(knn.classify_batch(&[q.clone(), q]), vec![first.clone(), first]);
    }
}
