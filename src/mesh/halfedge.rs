//! Flat half-edge representation for closed manifold triangle meshes.
//!
//! This module provides an index-based half-edge structure tuned for
//! data-parallel refinement. Unlike pointer-rich DCEL variants, every
//! triangle owns three consecutive half-edges, so the face of half-edge `h`
//! is always `h / 3` and corner arithmetic is plain index math.
//!
//! # Structure
//!
//! - Triangle `t` owns half-edges `3t`, `3t + 1`, `3t + 2`, winding
//!   counter-clockwise.
//! - Each half-edge records its start and end vertex and the index of the
//!   oppositely oriented half-edge on the neighboring face.
//! - A half-edge is *forward* iff `start_vert < end_vert`; exactly one of a
//!   pair is forward, which selects the canonical representative of an
//!   undirected edge.
//!
//! # Closedness
//!
//! Every half-edge has a valid pair. Meshes with open boundaries are
//! rejected at construction; the refinement algorithms rely on complete
//! vertex fans.

use nalgebra::{Point3, Vector3, Vector4};

use super::relation::MeshRelation;

/// Squared-distance tolerance below which two per-corner normals are
/// considered continuous across an edge.
pub(crate) const TOLERANCE: f64 = 1e-5;

/// The next half-edge around the triangle of `h`.
#[inline]
pub fn next_halfedge(h: usize) -> usize {
    if h % 3 == 2 {
        h - 2
    } else {
        h + 1
    }
}

/// A directed side of a triangle, paired with its opposite on the
/// neighboring triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halfedge {
    /// The vertex this half-edge originates from.
    pub start_vert: usize,

    /// The vertex this half-edge points to.
    pub end_vert: usize,

    /// The oppositely oriented half-edge on the neighboring face.
    pub paired_halfedge: usize,

    /// The triangle this half-edge belongs to; always its index over three.
    pub face: usize,
}

impl Halfedge {
    /// Is this the canonical representative of its undirected edge?
    #[inline]
    pub fn is_forward(&self) -> bool {
        self.start_vert < self.end_vert
    }
}

/// A closed manifold triangle mesh with paired property arrays.
///
/// All members are plain parallel vectors; identity of a vertex, half-edge,
/// or triangle is its index. Use [`build_from_triangles`] to construct one
/// with consistent connectivity.
///
/// [`build_from_triangles`]: crate::mesh::build_from_triangles
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Vertex positions; identity is the index.
    pub vert_pos: Vec<Point3<f64>>,

    /// Half-edges, three consecutive per triangle.
    pub halfedges: Vec<Halfedge>,

    /// Unit normal of each triangle. Cleared by subdivision and restored by
    /// [`calculate_normals`](TriMesh::calculate_normals).
    pub face_normal: Vec<Vector3<f64>>,

    /// Area-weighted unit normal of each vertex.
    pub vert_normal: Vec<Vector3<f64>>,

    /// Weighted cubic Bézier tangent of each half-edge: `xyz` is the
    /// tangent vector, `w` the rational weight. Empty until one of the
    /// tangent constructors runs; a zero tangent marks a sharp edge.
    pub halfedge_tangent: Vec<Vector4<f64>>,

    /// Triangle provenance and per-corner properties.
    pub relation: MeshRelation,
}

impl TriMesh {
    /// Get the number of vertices.
    #[inline]
    pub fn num_vert(&self) -> usize {
        self.vert_pos.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedge(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of triangles.
    #[inline]
    pub fn num_tri(&self) -> usize {
        self.halfedges.len() / 3
    }

    /// Get the width of one property-vertex record.
    #[inline]
    pub fn num_prop(&self) -> usize {
        self.relation.num_prop
    }

    /// Get the number of property vertices.
    ///
    /// When the mesh carries no properties, property-vertex space coincides
    /// with vertex space.
    #[inline]
    pub fn num_prop_vert(&self) -> usize {
        if self.relation.num_prop == 0 {
            self.num_vert()
        } else {
            self.relation.properties.len() / self.relation.num_prop
        }
    }

    /// Check if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.halfedges.is_empty()
    }

    /// Read the property normal at the corner owning `halfedge`.
    ///
    /// `normal_idx` is the offset of the normal's first component within a
    /// property record, as passed to
    /// [`set_normals`](crate::algo::smooth::set_normals).
    pub fn get_normal(&self, halfedge: usize, normal_idx: usize) -> Vector3<f64> {
        let tri = halfedge / 3;
        let j = halfedge % 3;
        let prop = self.relation.tri_properties[tri][j];
        let base = prop * self.relation.num_prop + normal_idx;
        Vector3::new(
            self.relation.properties[base],
            self.relation.properties[base + 1],
            self.relation.properties[base + 2],
        )
    }

    /// Walk the fan of half-edges leaving the start vertex of `start`,
    /// calling `func` for each. The walk ends back at `start`, which is
    /// visited last.
    pub fn for_vert(&self, start: usize, mut func: impl FnMut(usize)) {
        let mut current = start;
        loop {
            current = next_halfedge(self.halfedges[current].paired_halfedge);
            func(current);
            if current == start {
                break;
            }
        }
    }

    /// Two-pass fan walk: `transform` maps each half-edge to a value, and
    /// `op` sees each half-edge together with its value and the next
    /// fan half-edge's value, so it can reason about edge-to-edge
    /// transitions. The walk starts at `start`.
    pub fn for_vert_with<T>(
        &self,
        start: usize,
        mut transform: impl FnMut(usize) -> T,
        mut op: impl FnMut(usize, &T, &T),
    ) {
        let mut here = transform(start);
        let mut current = start;
        loop {
            let next_edge = next_halfedge(self.halfedges[current].paired_halfedge);
            let next = transform(next_edge);
            op(current, &here, &next);
            here = next;
            current = next_edge;
            if current == start {
                break;
            }
        }
    }

    /// Recompute `face_normal` and `vert_normal` from positions.
    ///
    /// Face normals are normalized cross products; vertex normals are
    /// area-weighted sums of incident face normals.
    pub fn calculate_normals(&mut self) {
        let num_tri = self.num_tri();
        let mut face_normal = Vec::with_capacity(num_tri);
        let mut vert_normal = vec![Vector3::zeros(); self.num_vert()];

        for tri in 0..num_tri {
            let p0 = self.vert_pos[self.halfedges[3 * tri].start_vert];
            let p1 = self.vert_pos[self.halfedges[3 * tri + 1].start_vert];
            let p2 = self.vert_pos[self.halfedges[3 * tri + 2].start_vert];
            let area_normal = (p1 - p0).cross(&(p2 - p0));

            let len = area_normal.norm();
            face_normal.push(if len > 1e-12 {
                area_normal / len
            } else {
                Vector3::zeros()
            });

            for i in 0..3 {
                vert_normal[self.halfedges[3 * tri + i].start_vert] += area_normal;
            }
        }

        for n in &mut vert_normal {
            let len = n.norm();
            if len > 1e-12 {
                *n /= len;
            }
        }

        self.face_normal = face_normal;
        self.vert_normal = vert_normal;
    }

    /// Check that half-edge connectivity is consistent.
    pub fn is_valid(&self) -> bool {
        let num_vert = self.num_vert();
        for (h, he) in self.halfedges.iter().enumerate() {
            if he.face != h / 3 {
                return false;
            }
            if he.start_vert >= num_vert || he.end_vert >= num_vert {
                return false;
            }
            if he.paired_halfedge >= self.halfedges.len() {
                return false;
            }
            let pair = &self.halfedges[he.paired_halfedge];
            if pair.paired_halfedge != h {
                return false;
            }
            if pair.start_vert != he.end_vert || pair.end_vert != he.start_vert {
                return false;
            }
            // consecutive half-edges of a triangle chain head to tail
            if self.halfedges[next_halfedge(h)].start_vert != he.end_vert {
                return false;
            }
        }
        true
    }
}
