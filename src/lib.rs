//! Coupled vascular tree synthesis by space colonization.
//!
//! Grows paired arterial and venous vessel trees inside a sampled spatial
//! domain, pulling vessel tips toward attraction points under Murray's law
//! for radii and bifurcation angles.
//!
//! Main components:
//! - [`domain`] — point-sampled spatial domains (circle, sphere, lines, voxels).
//! - [`tree`] — vessel forests, trees, and node roles.
//! - [`octree`] — bounded spatial index for nodes and attraction points.
//! - [`law`] — Murray's law and the bifurcation-plane line fit.
//! - [`config`] — per-system settings and the growth schedule.
//! - [`synthesizer`] — the coupled growth engine.
//! - [`types`] — shared id types.

pub mod config;
pub mod domain;
pub mod law;
pub mod octree;
pub mod synthesizer;
pub mod tree;
pub mod types;
