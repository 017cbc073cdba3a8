//! Mesh refinement algorithms.
//!
//! This module contains the smooth-refinement pipeline:
//!
//! - **Smoothing preparation** ([`smooth`]): flat-face detection, per-corner
//!   normal rebuilding, and weighted cubic Bézier tangent construction.
//! - **Refinement** ([`refine`]): cached topological sub-triangulation,
//!   parallel subdivision, and curved patch evaluation.
//!
//! Passes over independent index ranges pick sequential or parallel
//! execution based on problem size; fan walks around vertices are always
//! sequential per vertex.

pub mod progress;
pub mod refine;
pub mod smooth;

pub use progress::Progress;

use nalgebra::{Vector3, Vector4};

/// Work-item count above which a data-parallel pass uses rayon.
const PARALLEL_CUTOFF: usize = 4096;

/// Should a pass over `n` independent items run in parallel?
#[inline]
pub(crate) fn run_parallel(n: usize) -> bool {
    n >= PARALLEL_CUTOFF
}

/// Linear interpolation between two scalars.
#[inline]
pub(crate) fn mix(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// The vector part of a homogeneous tangent.
#[inline]
pub(crate) fn xyz(v: Vector4<f64>) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

/// Normalize, returning zero for vectors with no usable direction.
#[inline]
pub(crate) fn safe_normalize(v: Vector3<f64>) -> Vector3<f64> {
    let norm = v.norm();
    if norm > 0.0 && norm.is_finite() {
        v / norm
    } else {
        Vector3::zeros()
    }
}

/// The component of `v` orthogonal to the unit vector `unit`.
#[inline]
pub(crate) fn orthogonal_to(v: Vector3<f64>, unit: Vector3<f64>) -> Vector3<f64> {
    v - v.dot(&unit) * unit
}
