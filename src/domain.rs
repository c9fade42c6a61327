//! Spatial domains that drive attraction sampling.
//!
//! Domains are defined solely by the points they sample; there is no
//! enforcement of boundaries. `min_extends` / `max_extends` bound the
//! sampled region and size the spatial indices. A synthesis run is
//! reproducible per domain seed, to the extent the platform's float
//! operations agree.

use glam::{UVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Seed used by every domain until [`Domain::seed`] is called.
pub const DEFAULT_SEED: u32 = 42;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("line domain needs matching endpoint lists (got {starts} starts, {ends} ends)")]
    MismatchedEndpoints { starts: usize, ends: usize },
    #[error("domain has no geometry to sample from")]
    EmptyGeometry,
    #[error("voxel mask holds {got} entries but the resolution implies {expected}")]
    MaskLengthMismatch { expected: usize, got: usize },
}

/// A point sampler over a bounded region of space.
pub trait Domain {
    /// Reseeds the domain's random generator.
    fn seed(&mut self, number: u32);

    /// Draws one point from the domain.
    fn sample(&mut self) -> Vec3;

    fn min_extends(&self) -> Vec3;

    fn max_extends(&self) -> Vec3;

    /// Draws `count` points, appending them to `out`.
    fn samples(&mut self, out: &mut Vec<Vec3>, count: usize) {
        out.reserve(count);
        for _ in 0..count {
            out.push(self.sample());
        }
    }
}

fn rng_from(number: u32) -> StdRng {
    StdRng::seed_from_u64(number as u64)
}

/// Uniform sampling over a disc in the z-plane of `center`.
#[derive(Debug)]
pub struct CircleDomain {
    center: Vec3,
    radius: f32,
    rng: StdRng,
}

impl CircleDomain {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            rng: rng_from(DEFAULT_SEED),
        }
    }
}

impl Domain for CircleDomain {
    fn seed(&mut self, number: u32) {
        self.rng = rng_from(number);
    }

    fn sample(&mut self) -> Vec3 {
        let r = self.radius * self.rng.random_range(0.0f32..=1.0).sqrt();
        let theta = self.rng.random_range(0.0f32..std::f32::consts::TAU);
        self.center + Vec3::new(r * theta.cos(), r * theta.sin(), 0.0)
    }

    fn min_extends(&self) -> Vec3 {
        self.center - Vec3::new(self.radius, self.radius, 0.0)
    }

    fn max_extends(&self) -> Vec3 {
        self.center + Vec3::new(self.radius, self.radius, 0.0)
    }
}

/// Uniform sampling over a solid ball.
#[derive(Debug)]
pub struct SphereDomain {
    center: Vec3,
    radius: f32,
    rng: StdRng,
}

impl SphereDomain {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            rng: rng_from(DEFAULT_SEED),
        }
    }
}

impl Domain for SphereDomain {
    fn seed(&mut self, number: u32) {
        self.rng = rng_from(number);
    }

    fn sample(&mut self) -> Vec3 {
        // Rejection from the bounding cube; acceptance rate is ~52%.
        loop {
            let p = Vec3::new(
                self.rng.random_range(-1.0f32..=1.0),
                self.rng.random_range(-1.0f32..=1.0),
                self.rng.random_range(-1.0f32..=1.0),
            );
            if p.length_squared() <= 1.0 {
                return self.center + p * self.radius;
            }
        }
    }

    fn min_extends(&self) -> Vec3 {
        self.center - Vec3::splat(self.radius)
    }

    fn max_extends(&self) -> Vec3 {
        self.center + Vec3::splat(self.radius)
    }
}

/// Sampling along a set of line segments with a uniform jitter.
///
/// Useful to develop an initial tree along a prescribed course. Each draw
/// picks a segment, a point along it, and offsets every axis by up to
/// `deviation`.
#[derive(Debug)]
pub struct LinesDomain {
    segments: Vec<(Vec3, Vec3)>,
    deviation: f32,
    min: Vec3,
    max: Vec3,
    rng: StdRng,
}

impl LinesDomain {
    pub fn new(start: Vec<Vec3>, end: Vec<Vec3>, deviation: f32) -> Result<Self, DomainError> {
        if start.len() != end.len() {
            return Err(DomainError::MismatchedEndpoints {
                starts: start.len(),
                ends: end.len(),
            });
        }
        if start.is_empty() {
            return Err(DomainError::EmptyGeometry);
        }

        let segments: Vec<(Vec3, Vec3)> = start.into_iter().zip(end).collect();
        let (min, max) = Self::extents(&segments, deviation);
        Ok(Self {
            segments,
            deviation,
            min,
            max,
            rng: rng_from(DEFAULT_SEED),
        })
    }

    /// Like [`LinesDomain::new`], but first subdivides every segment into
    /// pieces no longer than `sub_distance`, so that picking a segment
    /// uniformly no longer over-weights short segments.
    pub fn with_subdivision(
        start: Vec<Vec3>,
        end: Vec<Vec3>,
        sub_distance: f32,
        deviation: f32,
    ) -> Result<Self, DomainError> {
        let domain = Self::new(start, end, deviation)?;

        let mut subdivided = Vec::new();
        for (a, b) in &domain.segments {
            let length = (*b - *a).length();
            let pieces = (length / sub_distance).ceil().max(1.0) as usize;
            for i in 0..pieces {
                let t0 = i as f32 / pieces as f32;
                let t1 = (i + 1) as f32 / pieces as f32;
                subdivided.push((a.lerp(*b, t0), a.lerp(*b, t1)));
            }
        }

        Ok(Self {
            segments: subdivided,
            ..domain
        })
    }

    fn extents(segments: &[(Vec3, Vec3)], deviation: f32) -> (Vec3, Vec3) {
        let mut min = Vec3::INFINITY;
        let mut max = Vec3::NEG_INFINITY;
        for (a, b) in segments {
            min = min.min(*a).min(*b);
            max = max.max(*a).max(*b);
        }
        (min - Vec3::splat(deviation), max + Vec3::splat(deviation))
    }
}

impl Domain for LinesDomain {
    fn seed(&mut self, number: u32) {
        self.rng = rng_from(number);
    }

    fn sample(&mut self) -> Vec3 {
        let (a, b) = self.segments[self.rng.random_range(0..self.segments.len())];
        let t = self.rng.random_range(0.0f32..=1.0);
        let jitter = Vec3::new(
            self.rng.random_range(-self.deviation..=self.deviation),
            self.rng.random_range(-self.deviation..=self.deviation),
            self.rng.random_range(-self.deviation..=self.deviation),
        );
        a.lerp(b, t) + jitter
    }

    fn min_extends(&self) -> Vec3 {
        self.min
    }

    fn max_extends(&self) -> Vec3 {
        self.max
    }
}

/// Sampling over a voxelized region.
///
/// Built either from a boolean occupancy mask laid out x-fastest over a
/// `resolution` grid, or from explicit voxel centers. Each draw jitters a
/// random voxel center within its voxel.
#[derive(Debug)]
pub struct VoxelsDomain {
    min: Vec3,
    max: Vec3,
    voxel_size: Vec3,
    centers: Vec<Vec3>,
    rng: StdRng,
}

impl VoxelsDomain {
    pub fn from_mask(
        min: Vec3,
        max: Vec3,
        resolution: UVec3,
        voxels: &[bool],
    ) -> Result<Self, DomainError> {
        let expected = (resolution.x * resolution.y * resolution.z) as usize;
        if voxels.len() != expected {
            return Err(DomainError::MaskLengthMismatch {
                expected,
                got: voxels.len(),
            });
        }

        let voxel_size = (max - min) / resolution.as_vec3();
        let mut centers = Vec::new();
        for z in 0..resolution.z {
            for y in 0..resolution.y {
                for x in 0..resolution.x {
                    let index = ((z * resolution.y + y) * resolution.x + x) as usize;
                    if voxels[index] {
                        let cell = UVec3::new(x, y, z).as_vec3();
                        centers.push(min + (cell + Vec3::splat(0.5)) * voxel_size);
                    }
                }
            }
        }

        Self::from_centers(min, max, resolution, centers)
    }

    pub fn from_centers(
        min: Vec3,
        max: Vec3,
        resolution: UVec3,
        centers: Vec<Vec3>,
    ) -> Result<Self, DomainError> {
        if centers.is_empty() {
            return Err(DomainError::EmptyGeometry);
        }
        Ok(Self {
            min,
            max,
            voxel_size: (max - min) / resolution.as_vec3(),
            centers,
            rng: rng_from(DEFAULT_SEED),
        })
    }
}

impl Domain for VoxelsDomain {
    fn seed(&mut self, number: u32) {
        self.rng = rng_from(number);
    }

    fn sample(&mut self) -> Vec3 {
        let center = self.centers[self.rng.random_range(0..self.centers.len())];
        let half = self.voxel_size * 0.5;
        center
            + Vec3::new(
                self.rng.random_range(-half.x..=half.x),
                self.rng.random_range(-half.y..=half.y),
                self.rng.random_range(-half.z..=half.z),
            )
    }

    fn min_extends(&self) -> Vec3 {
        self.min
    }

    fn max_extends(&self) -> Vec3 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_samples_stay_inside_ball_and_extents() {
        let center = Vec3::new(1.0, -2.0, 0.5);
        let mut domain = SphereDomain::new(center, 2.0);

        for _ in 0..500 {
            let p = domain.sample();
            assert!((p - center).length() <= 2.0 + 1e-5);
            assert!(p.cmpge(domain.min_extends()).all());
            assert!(p.cmple(domain.max_extends()).all());
        }
    }

    #[test]
    fn circle_samples_lie_in_center_plane() {
        let center = Vec3::new(0.0, 0.0, 3.0);
        let mut domain = CircleDomain::new(center, 1.5);

        for _ in 0..100 {
            let p = domain.sample();
            assert_eq!(p.z, 3.0);
            assert!((p - center).length() <= 1.5 + 1e-5);
        }
    }

    #[test]
    fn same_seed_reproduces_the_sample_stream() {
        let mut a = SphereDomain::new(Vec3::ZERO, 1.0);
        let mut b = SphereDomain::new(Vec3::ZERO, 1.0);
        a.seed(7);
        b.seed(7);

        for _ in 0..50 {
            assert_eq!(a.sample(), b.sample());
        }

        a.seed(7);
        let first = a.sample();
        a.seed(8);
        assert_ne!(first, a.sample());
    }

    #[test]
    fn samples_appends_requested_count() {
        let mut domain = SphereDomain::new(Vec3::ZERO, 1.0);
        let mut out = vec![Vec3::ZERO];
        domain.samples(&mut out, 10);
        assert_eq!(out.len(), 11);
    }

    #[test]
    fn lines_constructor_validates_endpoints() {
        let err = LinesDomain::new(vec![Vec3::ZERO], vec![], 0.1).unwrap_err();
        assert!(matches!(err, DomainError::MismatchedEndpoints { starts: 1, ends: 0 }));

        let err = LinesDomain::new(vec![], vec![], 0.1).unwrap_err();
        assert!(matches!(err, DomainError::EmptyGeometry));
    }

    #[test]
    fn lines_samples_stay_within_deviation_of_segment() {
        let start = Vec3::ZERO;
        let end = Vec3::new(10.0, 0.0, 0.0);
        let mut domain = LinesDomain::new(vec![start], vec![end], 0.25).unwrap();

        for _ in 0..200 {
            let p = domain.sample();
            assert!(p.x >= -0.25 && p.x <= 10.25);
            assert!(p.y.abs() <= 0.25);
            assert!(p.z.abs() <= 0.25);
        }

        assert_eq!(domain.min_extends(), Vec3::splat(-0.25));
        assert_eq!(domain.max_extends(), Vec3::new(10.25, 0.25, 0.25));
    }

    #[test]
    fn subdivided_lines_sample_the_same_region() {
        let mut domain = LinesDomain::with_subdivision(
            vec![Vec3::ZERO],
            vec![Vec3::new(10.0, 0.0, 0.0)],
            1.0,
            0.0,
        )
        .unwrap();

        for _ in 0..100 {
            let p = domain.sample();
            assert!(p.x >= 0.0 && p.x <= 10.0);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn voxel_mask_selects_only_marked_cells() {
        let resolution = UVec3::new(2, 1, 1);
        // Only the +x cell of a [0,2]×[0,1]×[0,1] box is occupied.
        let mut domain = VoxelsDomain::from_mask(
            Vec3::ZERO,
            Vec3::new(2.0, 1.0, 1.0),
            resolution,
            &[false, true],
        )
        .unwrap();

        for _ in 0..100 {
            let p = domain.sample();
            assert!(p.x >= 1.0 && p.x <= 2.0);
        }
    }

    #[test]
    fn voxel_mask_length_is_checked() {
        let err = VoxelsDomain::from_mask(Vec3::ZERO, Vec3::ONE, UVec3::new(2, 2, 2), &[true; 3])
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::MaskLengthMismatch { expected: 8, got: 3 }
        ));
    }
}
