use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of keypoints in a hand skeleton.
pub const NUM_LANDMARKS: usize = 21;

/// Length of a flattened skeleton (21 points × 3 coordinates).
pub const FEATURE_DIM: usize = NUM_LANDMARKS * 3;

/// A 3D point with floating-point coordinates.
///
/// For raw skeletons x and y are in image pixels and z is a depth in
/// pixel-equivalent units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Widen to a double-precision vector for the alignment math.
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x as f32, v.y as f32, v.z as f32)
    }
}

/// The 21 hand keypoints in MediaPipe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexFingerMcp = 5,
    IndexFingerPip = 6,
    IndexFingerDip = 7,
    IndexFingerTip = 8,
    MiddleFingerMcp = 9,
    MiddleFingerPip = 10,
    MiddleFingerDip = 11,
    MiddleFingerTip = 12,
    RingFingerMcp = 13,
    RingFingerPip = 14,
    RingFingerDip = 15,
    RingFingerTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A single hand skeleton: exactly 21 points, indexed by [`HandLandmark`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<Point3>,
}

impl LandmarkSet {
    /// Build a skeleton from exactly [`NUM_LANDMARKS`] points.
    pub fn from_points(points: Vec<Point3>) -> Result<Self> {
        if points.len() != NUM_LANDMARKS {
            return Err(Error::ShapeMismatch {
                what: "landmark set",
                expected: NUM_LANDMARKS,
                found: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Build a skeleton from a flat vector of [x0, y0, z0, x1, ...] coordinates.
    pub fn from_flat(values: &[f32]) -> Result<Self> {
        if values.len() != FEATURE_DIM {
            return Err(Error::ShapeMismatch {
                what: "flattened landmark set",
                expected: FEATURE_DIM,
                found: values.len(),
            });
        }
        let points = values
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn get(&self, landmark: HandLandmark) -> Point3 {
        self.points[landmark.index()]
    }

    /// Flatten to [x0, y0, z0, x1, ...] in landmark order.
    pub fn to_flat_vec(&self) -> Vec<f32> {
        let mut v = Vec::with_capacity(FEATURE_DIM);
        for p in &self.points {
            v.extend_from_slice(&[p.x, p.y, p.z]);
        }
        v
    }
}

impl std::ops::Index<usize> for LandmarkSet {
    type Output = Point3;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

/// A pose-canonical skeleton flattened to [`FEATURE_DIM`] values.
///
/// Length and finiteness are checked on construction, so every vector that
/// reaches the dataset or the classifier has the same shape and can be
/// compared by distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.len() != FEATURE_DIM {
            return Err(Error::ShapeMismatch {
                what: "feature vector",
                expected: FEATURE_DIM,
                found: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteFeature { index });
        }
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    /// The `idx`-th landmark of the normalized skeleton.
    pub fn point(&self, idx: usize) -> Point3 {
        let base = idx * 3;
        Point3::new(
            self.values[base],
            self.values[base + 1],
            self.values[base + 2],
        )
    }

    /// Euclidean distance, accumulated in double precision.
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        squared_distance(&self.values, &other.values).sqrt()
    }
}

pub(crate) fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_vector_conversion() {
        let p = Point3::new(1.5, -2.0, 3.25);
        assert_eq!(p.to_vector(), Vector3::new(1.5, -2.0, 3.25));
        assert_eq!(Point3::from_vector(&p.to_vector()), p);
    }

    #[test]
    fn landmark_set_requires_21_points() {
        let err = LandmarkSet::from_points(vec![Point3::new(0.0, 0.0, 0.0); 20]).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: 21,
                found: 20,
                ..
            }
        ));

        let err = LandmarkSet::from_flat(&[0.0; 62]).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: 63,
                found: 62,
                ..
            }
        ));
    }

    #[test]
    fn landmark_flat_layout() {
        let flat: Vec<f32> = (0..FEATURE_DIM).map(|i| i as f32).collect();
        let set = LandmarkSet::from_flat(&flat).unwrap();

        assert_eq!(set.get(HandLandmark::Wrist), Point3::new(0.0, 1.0, 2.0));
        assert_eq!(set.get(HandLandmark::PinkyMcp), Point3::new(51.0, 52.0, 53.0));
        assert_eq!(set[20], Point3::new(60.0, 61.0, 62.0));
        assert_eq!(set.to_flat_vec(), flat);
    }

    #[test]
    fn feature_vector_shape_is_checked() {
        assert!(FeatureVector::new(vec![0.0; FEATURE_DIM]).is_ok());
        assert!(matches!(
            FeatureVector::new(vec![0.0; 64]),
            Err(Error::ShapeMismatch {
                expected: 63,
                found: 64,
                ..
            })
        ));
    }

    #[test]
    fn feature_vector_rejects_non_finite_values() {
        let mut values = vec![0.0; FEATURE_DIM];
        values[7] = f32::NAN;
        assert!(matches!(
            FeatureVector::new(values),
            Err(Error::NonFiniteFeature { index: 7 })
        ));

        let mut values = vec![0.0; FEATURE_DIM];
        values[62] = f32::INFINITY;
        assert!(matches!(
            FeatureVector::new(values),
            Err(Error::NonFiniteFeature { index: 62 })
        ));
    }

    #[test]
    fn feature_vector_distance() {
        let a = FeatureVector::new(vec![0.0; FEATURE_DIM]).unwrap();
        let mut values = vec![0.0; FEATURE_DIM];
        values[0] = 3.0;
        values[62] = 4.0;
        let b = FeatureVector::new(values).unwrap();

        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
        assert_eq!(b.point(20), Point3::new(0.0, 0.0, 4.0));
    }
}
