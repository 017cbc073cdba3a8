//! Triangle provenance and per-corner properties.
//!
//! Triangles carry a [`TriRef`] naming the original input face they derive
//! from; connected runs of triangles with the same reference form *flat
//! faces*. Independently of vertex space, each triangle corner can index a
//! *property vertex* in [`MeshRelation`], so an edge that is shared
//! topologically may still be a property seam (e.g. a normal discontinuity).

use std::sync::atomic::{AtomicU32, Ordering};

use nalgebra::Vector3;

/// Sentinel for a not-yet-assigned index.
pub(crate) const UNSET: usize = usize::MAX;

static NEXT_MESH_ID: AtomicU32 = AtomicU32::new(0);

/// Reserve a fresh mesh instance ID.
///
/// Every call returns a distinct value, so triangles stamped with different
/// reservations never compare as the same face.
pub fn reserve_mesh_id() -> u32 {
    NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)
}

/// Provenance tag identifying the original input face a triangle derives
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriRef {
    /// The mesh instance the triangle belongs to.
    pub mesh_id: u32,
    /// Index of the original face within that instance.
    pub tri: usize,
}

impl TriRef {
    /// Do two triangles derive from the same original face?
    #[inline]
    pub fn same_face(&self, other: &TriRef) -> bool {
        self.mesh_id == other.mesh_id && self.tri == other.tri
    }
}

/// Parallel arrays tying triangles to their per-corner properties.
#[derive(Debug, Clone, Default)]
pub struct MeshRelation {
    /// Width of one property-vertex record. Zero means no properties.
    pub num_prop: usize,

    /// Flat property array of length `num_prop_vert * num_prop`.
    pub properties: Vec<f64>,

    /// For each triangle, the property-vertex index of each corner. Two
    /// adjacent triangles share a property vertex iff their corner indices
    /// match.
    pub tri_properties: Vec<[usize; 3]>,

    /// Origin face of each triangle.
    pub tri_ref: Vec<TriRef>,
}

/// An affine coordinate within an original (pre-subdivision) triangle.
///
/// The components of `uvw` sum to one; component `i` is the weight of corner
/// `i` of triangle `tri`.
#[derive(Debug, Clone, Copy)]
pub struct Barycentric {
    /// The original triangle this coordinate refers to.
    pub tri: usize,
    /// Barycentric weights of the three corners.
    pub uvw: Vector3<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_face() {
        let a = TriRef { mesh_id: 1, tri: 4 };
        let b = TriRef { mesh_id: 1, tri: 4 };
        let c = TriRef { mesh_id: 1, tri: 5 };
        let d = TriRef { mesh_id: 2, tri: 4 };

        assert!(a.same_face(&b));
        assert!(!a.same_face(&c));
        assert!(!a.same_face(&d));
    }

    #[test]
    fn test_reserved_ids_are_distinct() {
        let a = reserve_mesh_id();
        let b = reserve_mesh_id();
        assert_ne!(a, b);
    }
}
