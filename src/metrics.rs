//! Offline accuracy assessment on a held-out split.
//!
//! The classifier is fitted on the training part only and every test vector
//! is matched against it, so no query is ever compared with itself.

use serde::Serialize;

use crate::classifier::NearestNeighborClassifier;
use crate::dataset::FeatureDataset;
use crate::error::Result;
use crate::types::FeatureVector;

/// Precision, recall and F1 for one class.
///
/// Undefined ratios (no predictions or no support) are reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of test samples whose true label is this class.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Label order used for the confusion matrix rows and columns.
    pub labels: Vec<String>,
    /// `confusion[truth][predicted]`.
    pub confusion: Vec<Vec<usize>>,
    pub train_size: usize,
    pub test_size: usize,
}

impl Evaluation {
    /// Tally predictions against ground truth.
    ///
    /// Labels not listed in `labels` are ignored in the confusion matrix but
    /// still count as misses for accuracy.
    pub fn from_predictions<T, P>(labels: Vec<String>, truth: &[T], predicted: &[P]) -> Self
    where
        T: AsRef<str>,
        P: AsRef<str>,
    {
        debug_assert_eq!(truth.len(), predicted.len());
        let k = labels.len();
        let mut confusion = vec![vec![0; k]; k];
        let position = |l: &str| labels.iter().position(|x| x == l);

        for (t, p) in truth.iter().zip(predicted.iter()) {
            if let (Some(ti), Some(pi)) = (position(t.as_ref()), position(p.as_ref())) {
                confusion[ti][pi] += 1;
            }
        }

        Self {
            labels,
            confusion,
            train_size: 0,
            test_size: truth.len(),
        }
    }

    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.confusion[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        if self.test_size == 0 {
            return 0.0;
        }
        self.correct() as f64 / self.test_size as f64
    }

    pub fn confusion_matrix(&self) -> &[Vec<usize>] {
        &self.confusion
    }

    pub fn class_reports(&self) -> Vec<ClassReport> {
        let k = self.labels.len();
        (0..k)
            .map(|i| {
                let tp = self.confusion[i][i] as f64;
                let support: usize = self.confusion[i].iter().sum();
                let predicted: usize = (0..k).map(|r| self.confusion[r][i]).sum();

                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);

                ClassReport {
                    label: self.labels[i].clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Unweighted mean of the per-class F1 scores.
    pub fn macro_f1(&self) -> f64 {
        let reports = self.class_reports();
        if reports.is_empty() {
            return 0.0;
        }
        reports.iter().map(|r| r.f1).sum::<f64>() / reports.len() as f64
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Split `dataset`, fit on the training part and score the test part.
pub fn evaluate_split(dataset: &FeatureDataset, test_fraction: f64, seed: u64) -> Result<Evaluation> {
    let (train, test) = dataset.stratified_split(test_fraction, seed)?;
    let knn = NearestNeighborClassifier::fit(&train)?;

    let truth: Vec<&str> = test.iter().map(|s| s.label.as_str()).collect();
    let queries: Vec<FeatureVector> = test.iter().map(|s| s.features.clone()).collect();
    let predicted: Vec<String> = knn
        .classify_batch(&queries)
        .into_iter()
        .map(|p| p.label)
        .collect();

    let mut evaluation = Evaluation::from_predictions(dataset.classes(), &truth, &predicted);
    evaluation.train_size = train.len();

    log::info!(
        "Accuracy {:.4} on {} test samples ({} train)",
        evaluation.accuracy(),
        evaluation.test_size,
        evaluation.train_size
    );
    Ok(evaluation)
}
