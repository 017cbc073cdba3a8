//! Smoothing preparation: flat faces, per-corner normals, and sharpened
//! edges.
//!
//! Smooth refinement works from two inputs that this module prepares:
//!
//! - **Per-corner normals** ([`set_normals`]): property normals shared
//!   within smooth regions and split across creases, driven by a dihedral
//!   angle threshold and flat-face membership.
//! - **Half-edge tangents** ([`create_tangents`],
//!   [`create_tangents_from_normals`]): weighted cubic Bézier tangents that
//!   trace circular arcs across smooth edges and collapse to zero along
//!   sharp ones.
//!
//! Triangles grouped under one [`TriRef`] form *flat faces* once at least
//! three of them connect; flat faces keep their face normal instead of an
//! interpolated one, and their internal edges never bend.
//!
//! [`TriRef`]: crate::mesh::TriRef

mod normals;
mod tangents;

pub use normals::set_normals;
pub use tangents::{circular_tangent, create_tangents, create_tangents_from_normals};

use std::collections::HashMap;

use rayon::prelude::*;

use crate::algo::run_parallel;
use crate::mesh::{TriMesh, TriRef};

/// A smoothness request for one half-edge.
///
/// A smoothness of zero makes the edge fully sharp; one leaves it fully
/// smooth. The two half-edges of an edge may carry different values, in
/// which case the smaller wins on each side.
#[derive(Debug, Clone, Copy)]
pub struct Smoothness {
    /// The half-edge the request applies to.
    pub halfedge: usize,
    /// Smoothness in `[0, 1]`.
    pub smoothness: f64,
}

/// Flat-face membership of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatVert {
    /// No incident flat face.
    None,
    /// All incident flat faces share one original face; holds a
    /// representative triangle.
    Single(usize),
    /// Two or more distinct flat faces meet at this vertex.
    Mixed,
}

/// Find triangles that are part of flat faces.
///
/// A triangle is flat iff at least two of its neighbors share its
/// [`TriRef`], or it shares its `TriRef` with such a triangle. Flat faces
/// therefore contain at least three triangles; their vert normals must all
/// match the face normal rather than being interpolated.
pub fn flat_faces(mesh: &TriMesh) -> Vec<bool> {
    let num_tri = mesh.num_tri();
    let same_face_neighbors = |tri: usize| -> usize {
        let tri_ref = mesh.relation.tri_ref[tri];
        (0..3)
            .filter(|&j| {
                let neighbor = mesh.halfedges[mesh.halfedges[3 * tri + j].paired_halfedge].face;
                mesh.relation.tri_ref[neighbor].same_face(&tri_ref)
            })
            .count()
    };

    let seed: Vec<bool> = if run_parallel(num_tri) {
        (0..num_tri)
            .into_par_iter()
            .map(|tri| same_face_neighbors(tri) > 1)
            .collect()
    } else {
        (0..num_tri).map(|tri| same_face_neighbors(tri) > 1).collect()
    };

    let spread = |tri: usize| -> bool {
        seed[tri]
            || (0..3).any(|j| {
                let neighbor = mesh.halfedges[mesh.halfedges[3 * tri + j].paired_halfedge].face;
                seed[neighbor]
                    && mesh.relation.tri_ref[neighbor].same_face(&mesh.relation.tri_ref[tri])
            })
    };
    if run_parallel(num_tri) {
        (0..num_tri).into_par_iter().map(spread).collect()
    } else {
        (0..num_tri).map(spread).collect()
    }
}

/// Classify each vertex by the flat faces touching it.
///
/// Returns [`FlatVert::Single`] with a representative triangle when exactly
/// one flat face touches the vertex, [`FlatVert::Mixed`] when several
/// distinct ones do, and [`FlatVert::None`] otherwise.
pub fn vert_flat_face(mesh: &TriMesh, flat: &[bool]) -> Vec<FlatVert> {
    let mut vert_flat = vec![FlatVert::None; mesh.num_vert()];
    let mut vert_ref: Vec<Option<TriRef>> = vec![None; mesh.num_vert()];
    for tri in 0..mesh.num_tri() {
        if !flat[tri] {
            continue;
        }
        let tri_ref = mesh.relation.tri_ref[tri];
        for j in 0..3 {
            let vert = mesh.halfedges[3 * tri + j].start_vert;
            if vert_ref[vert] == Some(tri_ref) {
                continue;
            }
            vert_ref[vert] = Some(tri_ref);
            vert_flat[vert] = match vert_flat[vert] {
                FlatVert::None => FlatVert::Single(tri),
                _ => FlatVert::Mixed,
            };
        }
    }
    vert_flat
}

/// Emit a pair of [`Smoothness`] entries for every edge whose dihedral
/// angle exceeds `min_sharp_angle` (degrees), each with smoothness
/// `min_smoothness`.
///
/// The result feeds [`create_tangents`]; see also
/// [`smooth_out`] for the composed operation.
pub fn sharpen_edges(
    mesh: &TriMesh,
    min_sharp_angle: f64,
    min_smoothness: f64,
) -> Vec<Smoothness> {
    let mut sharpened = Vec::new();
    let min_radians = min_sharp_angle.to_radians();
    for (e, he) in mesh.halfedges.iter().enumerate() {
        if !he.is_forward() {
            continue;
        }
        let pair = he.paired_halfedge;
        let dihedral = mesh.face_normal[e / 3]
            .dot(&mesh.face_normal[pair / 3])
            .acos();
        if dihedral > min_radians {
            sharpened.push(Smoothness {
                halfedge: e,
                smoothness: min_smoothness,
            });
            sharpened.push(Smoothness {
                halfedge: pair,
                smoothness: min_smoothness,
            });
        }
    }
    sharpened
}

/// Remap sharpened-edge half-edge indices through [`TriRef::tri`] onto a
/// re-sorted mesh.
///
/// Sharpened edges reference the input mesh, but triangles may have been
/// reordered since (e.g. by a boolean engine); the provenance tags recover
/// where each original half-edge went.
pub fn update_sharpened_edges(
    mesh: &TriMesh,
    sharpened_edges: &[Smoothness],
) -> Vec<Smoothness> {
    let mut old_halfedge_to_new = HashMap::new();
    for tri in 0..mesh.num_tri() {
        let old_tri = mesh.relation.tri_ref[tri].tri;
        for i in 0..3 {
            old_halfedge_to_new.insert(3 * old_tri + i, 3 * tri + i);
        }
    }
    sharpened_edges
        .iter()
        .map(|edge| Smoothness {
            halfedge: old_halfedge_to_new
                .get(&edge.halfedge)
                .copied()
                .unwrap_or(edge.halfedge),
            smoothness: edge.smoothness,
        })
        .collect()
}

/// Build tangents that smooth the mesh everywhere except across edges
/// bent more than `min_sharp_angle` (degrees), which keep smoothness
/// `min_smoothness`.
pub fn smooth_out(mesh: &mut TriMesh, min_sharp_angle: f64, min_smoothness: f64) {
    let sharpened = sharpen_edges(mesh, min_sharp_angle, min_smoothness);
    create_tangents(mesh, sharpened);
}


#[cfg(test)]
mod tests {
    use super::fixtures::{cube, fan_cube};
    use super::*;

    #[test]
    fn test_flat_faces_need_three_triangles() {
        // two triangles per face never reach the flat threshold
        let mesh = cube();
        assert!(flat_faces(&mesh).iter().all(|&flat| !flat));
    }

    #[test]
    fn test_flat_faces_fanned_cube() {
        let mesh = fan_cube();
        assert!(flat_faces(&mesh).iter().all(|&flat| flat));
    }

    #[test]
    fn test_vert_flat_face_classification() {
        let mesh = fan_cube();
        let flat = flat_faces(&mesh);
        let vert_flat = vert_flat_face(&mesh, &flat);

        // cube corners touch three distinct flat faces
        for v in 0..8 {
            assert_eq!(vert_flat[v], FlatVert::Mixed);
        }
        // face centers touch exactly one
        for v in 8..14 {
            match vert_flat[v] {
                FlatVert::Single(tri) => {
                    assert_eq!(
                        mesh.halfedges[3 * tri + 2].start_vert,
                        v,
                        "representative triangle must touch the vertex"
                    );
                }
                other => panic!("face center classified as {:?}", other),
            }
        }
    }

    #[test]
    fn test_sharpen_edges_cube() {
        let mesh = cube();
        // the 12 cube edges bend 90 degrees; the 6 face diagonals are flat
        let sharpened = sharpen_edges(&mesh, 45.0, 0.25);
        assert_eq!(sharpened.len(), 24);
        for edge in &sharpened {
            assert_eq!(edge.smoothness, 0.25);
            let he = mesh.halfedges[edge.halfedge];
            let dihedral = mesh.face_normal[edge.halfedge / 3]
                .dot(&mesh.face_normal[he.paired_halfedge / 3])
                .acos()
                .to_degrees();
            assert!(dihedral > 45.0);
        }
        // nothing sharp above the actual dihedral
        assert!(sharpen_edges(&mesh, 135.0, 0.0).is_empty());
    }

    #[test]
    fn test_update_sharpened_edges_remaps() {
        let mut mesh = cube();
        // pretend the triangles were rotated one slot during a re-sort
        let num_tri = mesh.num_tri();
        for (tri, r) in mesh.relation.tri_ref.iter_mut().enumerate() {
            r.tri = (tri + 1) % num_tri;
        }
        let sharpened = vec![Smoothness {
            halfedge: 3,
            smoothness: 0.5,
        }];
        let updated = update_sharpened_edges(&mesh, &sharpened);
        // old tri 1 now lives at tri 0
        assert_eq!(updated[0].halfedge, 0);
        assert_eq!(updated[0].smoothness, 0.5);
    }
}
