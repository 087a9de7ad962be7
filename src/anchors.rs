//! Canonical reference geometry for hand alignment.

use nalgebra::Vector3;

use crate::types::{HandLandmark, LandmarkSet};

/// Landmarks used to fit the alignment: wrist, index base, pinky base, thumb base.
pub const ANCHOR_LANDMARKS: [HandLandmark; 4] = [
    HandLandmark::Wrist,
    HandLandmark::IndexFingerMcp,
    HandLandmark::PinkyMcp,
    HandLandmark::ThumbCmc,
];

/// Distance of the index, pinky and thumb anchors from the wrist in the canonical frame.
pub const CANONICAL_ANCHOR_SPAN: f64 = 0.05;

/// Fixed target pose that every skeleton is aligned into.
///
/// The wrist sits at the origin, the index base on +x, the pinky base on -x
/// and the thumb base on +y.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorFrame;

impl AnchorFrame {
    /// Indices of the anchor landmarks, in anchor order.
    pub const fn anchor_indices() -> [usize; 4] {
        [
            ANCHOR_LANDMARKS[0].index(),
            ANCHOR_LANDMARKS[1].index(),
            ANCHOR_LANDMARKS[2].index(),
            ANCHOR_LANDMARKS[3].index(),
        ]
    }

    /// Canonical positions of the anchors, in the same order as [`Self::anchor_indices`].
    pub fn canonical_anchors() -> [Vector3<f64>; 4] {
        [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(CANONICAL_ANCHOR_SPAN, 0.0, 0.0),
            Vector3::new(-CANONICAL_ANCHOR_SPAN, 0.0, 0.0),
            Vector3::new(0.0, CANONICAL_ANCHOR_SPAN, 0.0),
        ]
    }

    /// Pull the anchor sub-points out of a skeleton.
    pub fn extract(landmarks: &LandmarkSet) -> [Vector3<f64>; 4] {
        Self::anchor_indices().map(|idx| landmarks[idx].to_vector())
    }
}
