use crate::alignment::{estimate_similarity_transform, SimilarityTransform};
use crate::anchors::AnchorFrame;
use crate::error::{Error, Result};
use crate::types::{FeatureVector, LandmarkSet, FEATURE_DIM};

/// Maps a raw skeleton into the canonical anchor frame.
///
/// The similarity transform is fitted on the four anchor landmarks only and
/// then applied to all 21 points, so the skeleton keeps its shape: only
/// rotation, translation and a uniform scale are removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkNormalizer;

impl LandmarkNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Fit the transform that takes this skeleton's anchors onto the canonical frame.
    pub fn estimate(&self, landmarks: &LandmarkSet) -> Result<SimilarityTransform> {
        let source = AnchorFrame::extract(landmarks);
        let target = AnchorFrame::canonical_anchors();
        estimate_similarity_transform(&source, &target)
    }

    pub fn normalize(&self, landmarks: &LandmarkSet) -> Result<FeatureVector> {
        self.normalize_with_transform(landmarks)
            .map(|(features, _)| features)
    }

    /// Normalize and also return the fitted transform.
    pub fn normalize_with_transform(
        &self,
        landmarks: &LandmarkSet,
    ) -> Result<(FeatureVector, SimilarityTransform)> {
        let transform = self.estimate(landmarks)?;

        let mut values = Vec::with_capacity(FEATURE_DIM);
        for p in landmarks.points() {
            let q = transform.apply_point(*p);
            values.extend_from_slice(&[q.x, q.y, q.z]);
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::degenerate(
                "normalized skeleton contains non-finite coordinates",
            ));
        }

        Ok((FeatureVector::new(values)?, transform))
    }
}
