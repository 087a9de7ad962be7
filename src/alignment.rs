//! Least-squares similarity alignment between two point sets.
//!
//! Implements the closed-form solution of Umeyama (1991): centre both sets,
//! take the SVD of their cross-covariance, read the rotation off `U · Vᵀ`,
//! and derive scale and translation from the singular values and centroids.

use nalgebra::{Matrix3, Vector3};

use crate::error::{Error, Result};
use crate::types::Point3;

/// Fewer points than this cannot pin down a 3D rotation.
pub const MIN_POINTS: usize = 3;

/// Source variance at or below this is treated as coincident points.
const VARIANCE_EPS: f64 = 1e-12;

/// Sine of the smallest angle accepted between two edges of an anchor triangle.
const COLLINEAR_TOLERANCE: f64 = 1e-6;

/// Edges shorter than this fraction of the point-set extent count as coincident.
const COINCIDENT_TOLERANCE: f64 = 1e-9;

/// A similarity transform `p' = s · (R · p) + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    /// Uniform scale, always positive.
    pub scale: f64,
    /// Proper rotation (orthonormal, determinant +1).
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn apply(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.scale * (self.rotation * p) + self.translation
    }

    pub fn apply_point(&self, p: Point3) -> Point3 {
        Point3::from_vector(&self.apply(&p.to_vector()))
    }

    pub fn is_finite(&self) -> bool {
        self.scale.is_finite()
            && self.rotation.iter().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite())
    }
}

/// Estimate the similarity transform that best maps `source` onto `target`
/// in the least-squares sense.
///
/// Both slices must have the same length (at least [`MIN_POINTS`]). The
/// source points must span a plane: coincident points, or any three
/// collinear points, are rejected with [`Error::DegenerateAnchors`] because
/// the rotation (and with it the scale) is not determined by them.
pub fn estimate_similarity_transform(
    source: &[Vector3<f64>],
    target: &[Vector3<f64>],
) -> Result<SimilarityTransform> {
    if source.len() < MIN_POINTS {
        return Err(Error::ShapeMismatch {
            what: "source point set",
            expected: MIN_POINTS,
            found: source.len(),
        });
    }
    if target.len() != source.len() {
        return Err(Error::ShapeMismatch {
            what: "target point set",
            expected: source.len(),
            found: target.len(),
        });
    }
    if !source
        .iter()
        .chain(target.iter())
        .all(|p| p.iter().all(|v| v.is_finite()))
    {
        return Err(Error::degenerate("non-finite input coordinate"));
    }

    let n = source.len() as f64;
    let mu_src = centroid(source);
    let mu_dst = centroid(target);

    let mut cov = Matrix3::zeros();
    let mut var_src = 0.0;
    for (s, d) in source.iter().zip(target.iter()) {
        let sc = s - mu_src;
        let dc = d - mu_dst;
        cov += dc * sc.transpose();
        var_src += sc.norm_squared();
    }
    cov /= n;
    var_src /= n;

    if var_src <= VARIANCE_EPS {
        return Err(Error::degenerate(format!(
            "source variance {:e} is too small to fix a scale",
            var_src
        )));
    }
    check_spans_plane(source, &mu_src, var_src.sqrt())?;

    let svd = cov.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| Error::degenerate("SVD did not produce U"))?;
    let mut v_t = svd
        .v_t
        .ok_or_else(|| Error::degenerate("SVD did not produce V^T"))?;

    let mut rotation = u * v_t;

    // Reflection: flip the axis of the smallest singular value.
    if rotation.determinant() < 0.0 {
        let smallest = svd.singular_values.imin();
        v_t.row_mut(smallest).neg_mut();
        rotation = u * v_t;
    }

    let scale = svd.singular_values.sum() / var_src;
    let translation = mu_dst - scale * (rotation * mu_src);

    let transform = SimilarityTransform {
        scale,
        rotation,
        translation,
    };

    if !transform.is_finite() {
        return Err(Error::degenerate("alignment produced non-finite values"));
    }
    if scale <= VARIANCE_EPS {
        return Err(Error::degenerate(format!(
            "estimated scale {:e} is not positive",
            scale
        )));
    }

    Ok(transform)
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f64>, p| acc + p);
    sum / points.len() as f64
}

/// Reject point sets where any two points coincide or any three are collinear.
fn check_spans_plane(points: &[Vector3<f64>], mu: &Vector3<f64>, spread: f64) -> Result<()> {
    let extent = points
        .iter()
        .map(|p| (p - mu).norm())
        .fold(spread, f64::max);
    let min_edge = COINCIDENT_TOLERANCE * extent;

    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let a = points[j] - points[i];
            if a.norm() <= min_edge {
                return Err(Error::degenerate(format!(
                    "points {} and {} coincide",
                    i, j
                )));
            }
            for k in (j + 1)..points.len() {
                let b = points[k] - points[i];
                let sine = a.cross(&b).norm() / (a.norm() * b.norm());
                if !(sine > COLLINEAR_TOLERANCE) {
                    return Err(Error::degenerate(format!(
                        "points {}, {} and {} are collinear",
                        i, j, k
                    )));
                }
            }
        }
    }

    Ok(())
}
