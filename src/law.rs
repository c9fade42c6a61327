//! Biophysical laws governing vessel geometry.
//!
//! Pure functions only: Murray's law for radii shrinkage throughout a vessel
//! tree, the bifurcation angles of the idealized minimal-volume setup, and a
//! total-least-squares line fit used to orient bifurcation planes.

use glam::{DMat3, DVec3, Vec3};

/// Murray's law: radius of the parent vessel feeding two children.
///
/// `murray_radius(r_l, r_r, γ) = (r_l^γ + r_r^γ)^(1/γ)`, with γ typically 3.
pub fn murray_radius(r_l: f32, r_r: f32, exponent: f32) -> f32 {
    (r_l.powf(exponent) + r_r.powf(exponent)).powf(1.0 / exponent)
}

/// Bifurcation angles for an idealized minimal-volume bifurcation.
///
/// Returns `(θ_l, θ_r)` in degrees, θ_l negative and θ_r positive, measured
/// as rotations around the bifurcation plane normal. Inputs are clamped so
/// the `acos` can never produce NaN.
pub fn murray_angles(r_p: f32, r_l: f32, r_r: f32) -> (f32, f32) {
    let tmp = (r_p.powi(4) + r_l.powi(4) - r_r.powi(4)) / (2.0 * r_p.powi(2) * r_l.powi(2));
    let angle_l = -tmp.clamp(-1.0, 1.0).acos().to_degrees();

    let tmp = (r_p.powi(4) - r_l.powi(4) + r_r.powi(4)) / (2.0 * r_p.powi(2) * r_r.powi(2));
    let angle_r = tmp.clamp(-1.0, 1.0).acos().to_degrees();

    (angle_l, angle_r)
}

/// Fits a line through a point cloud by minimizing orthogonal distances.
///
/// Returns `(centroid, axis)` where `axis` is a unit vector along the
/// dominant eigenvector of the covariance matrix. The covariance is
/// accumulated in f64 and the eigenvector found by power iteration; for
/// degenerate input (all points coincident, or an empty slice) the axis is
/// an unspecified but finite unit vector.
pub fn best_line_fit(points: &[Vec3]) -> (Vec3, Vec3) {
    if points.is_empty() {
        return (Vec3::ZERO, Vec3::X);
    }

    let mut mean = DVec3::ZERO;
    for p in points {
        mean += p.as_dvec3();
    }
    mean /= points.len() as f64;

    let mut cov = DMat3::ZERO;
    for p in points {
        let d = p.as_dvec3() - mean;
        // Outer product d * dᵀ, column by column.
        cov += DMat3::from_cols(d * d.x, d * d.y, d * d.z);
    }

    let centroid = mean.as_vec3();

    // Seed power iteration with the strongest covariance column; a rank-one
    // covariance (colinear input) then converges immediately.
    let cols = [cov.x_axis, cov.y_axis, cov.z_axis];
    let mut axis = cols
        .into_iter()
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .unwrap_or(DVec3::X);
    if axis.length_squared() < 1e-24 {
        return (centroid, Vec3::X);
    }
    axis = axis.normalize();

    for _ in 0..64 {
        let next = cov * axis;
        if next.length_squared() < 1e-24 {
            break;
        }
        axis = next.normalize();
    }

    (centroid, axis.as_vec3())
}
