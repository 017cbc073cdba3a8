//! Weighted cubic Bézier tangent construction.
//!
//! Every half-edge gets a tangent stored as a 4-vector: `xyz` is the
//! geometric tangent at the start vertex, `w` the rational weight. Where the
//! tangents at both ends of an edge mirror each other, the resulting
//! weighted cubic traces a circular arc, minimizing maximum curvature.
//! Zero-length tangents form sharp corners with minimal oscillation.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use nalgebra::{Vector3, Vector4};
use rayon::prelude::*;

use super::{flat_faces, vert_flat_face, FlatVert, Smoothness};
use crate::algo::{run_parallel, safe_normalize, xyz};
use crate::mesh::{next_halfedge, TriMesh, TOLERANCE};

/// Calculate a tangent in weighted cubic Bézier form from a desired tangent
/// direction (length is ignored) and the edge vector to the neighboring
/// vertex.
///
/// In a symmetric situation where the tangents at each end are mirror
/// images of each other, the edge curve becomes a circular arc.
pub fn circular_tangent(tangent: Vector3<f64>, edge_vec: Vector3<f64>) -> Vector4<f64> {
    let dir = safe_normalize(tangent);

    let mut weight = dir.dot(&safe_normalize(edge_vec)).abs();
    if weight == 0.0 {
        weight = 1.0;
    }
    // quadratic weighted Bézier for circular interpolation
    let quadratic = dir * (edge_vec.norm() / (2.0 * weight));
    let bz2 = Vector4::new(quadratic.x, quadratic.y, quadratic.z, 1.0) * weight;
    // equivalent cubic weighted Bézier
    let bz3 = Vector4::new(0.0, 0.0, 0.0, 1.0).lerp(&bz2, 2.0 / 3.0);
    // convert from homogeneous form to geometric form
    Vector4::new(bz3.x / bz3.w, bz3.y / bz3.w, bz3.z / bz3.w, bz3.w)
}

/// Default tangent of one half-edge: a circular tangent in the mean plane
/// of the two adjacent faces, constrained to the start vertex's normal.
fn smooth_bezier(mesh: &TriMesh, vert_normal: &[Vector3<f64>], halfedge: usize) -> Vector4<f64> {
    let edge = mesh.halfedges[halfedge];
    let edge_vec = mesh.vert_pos[edge.end_vert] - mesh.vert_pos[edge.start_vert];
    let edge_normal = (mesh.face_normal[edge.face]
        + mesh.face_normal[mesh.halfedges[edge.paired_halfedge].face])
        * 0.5;
    let dir = edge_normal
        .cross(&edge_vec)
        .cross(&vert_normal[edge.start_vert]);
    circular_tangent(dir, edge_vec)
}

fn smooth_bezier_pass(mesh: &TriMesh, vert_normal: &[Vector3<f64>]) -> Vec<Vector4<f64>> {
    let num_halfedge = mesh.num_halfedge();
    if run_parallel(num_halfedge) {
        (0..num_halfedge)
            .into_par_iter()
            .map(|h| smooth_bezier(mesh, vert_normal, h))
            .collect()
    } else {
        (0..num_halfedge)
            .map(|h| smooth_bezier(mesh, vert_normal, h))
            .collect()
    }
}

/// Scale the tangents of the fan arc strictly between `first` and `last`.
fn smooth_half(mesh: &mut TriMesh, first: usize, last: usize, smoothness: f64) {
    let mut current = next_halfedge(mesh.halfedges[first].paired_halfedge);
    while current != last {
        mesh.halfedge_tangent[current] *= smoothness;
        current = next_halfedge(mesh.halfedges[current].paired_halfedge);
    }
}

/// Build half-edge tangents constrained to the per-corner property normals
/// written by [`set_normals`](super::set_normals).
///
/// Edges across which the property normal is continuous become circular
/// arcs. At a vertex whose fan crosses exactly two normal discontinuities,
/// the two crossing half-edges are aligned into a continuous crease and the
/// rest of the fan is sharpened; three or more discontinuities make the
/// vertex a cone point with all tangents zeroed.
pub fn create_tangents_from_normals(mesh: &mut TriMesh, normal_idx: usize) {
    let num_vert = mesh.num_vert();
    let num_halfedge = mesh.num_halfedge();

    let mut vert_normal = vec![Vector3::zeros(); num_vert];
    let mut vert_sharp_halfedge: Vec<[Option<usize>; 2]> = vec![[None; 2]; num_vert];
    for e in 0..num_halfedge {
        let vert = mesh.halfedges[e].start_vert;
        let sharp = &mut vert_sharp_halfedge[vert];
        if sharp[0].is_some() && sharp[1].is_some() {
            continue;
        }

        let mut idx = 0;
        // only used when the fan has a single normal
        let mut last_normal = Vector3::zeros();
        mesh.for_vert_with(
            e,
            |h| mesh.get_normal(h, normal_idx),
            |h, normal, next_normal| {
                let diff = next_normal - normal;
                if diff.dot(&diff) > TOLERANCE * TOLERANCE {
                    if idx > 1 {
                        sharp[0] = None;
                    } else {
                        sharp[idx] = Some(h);
                        idx += 1;
                    }
                }
                last_normal = *normal;
            },
        );
        vert_normal[vert] = last_normal;
    }

    mesh.halfedge_tangent = smooth_bezier_pass(mesh, &vert_normal);

    for vert in 0..num_vert {
        let Some(second) = vert_sharp_halfedge[vert][1] else {
            continue;
        };
        if let Some(first) = vert_sharp_halfedge[vert][0] {
            // align the two transitions into a continuous crease
            let new_tangent = mesh
                .get_normal(first, normal_idx)
                .cross(&mesh.get_normal(second, normal_idx))
                .normalize();
            if !new_tangent.x.is_finite() {
                continue;
            }
            let pos = mesh.vert_pos[vert];
            mesh.halfedge_tangent[first] = circular_tangent(
                new_tangent,
                mesh.vert_pos[mesh.halfedges[first].end_vert] - pos,
            );
            mesh.halfedge_tangent[second] = circular_tangent(
                -new_tangent,
                mesh.vert_pos[mesh.halfedges[second].end_vert] - pos,
            );

            let mut current = first;
            loop {
                current = next_halfedge(mesh.halfedges[current].paired_halfedge);
                if current != first && current != second {
                    mesh.halfedge_tangent[current] = Vector4::zeros();
                }
                if current == first {
                    break;
                }
            }
        } else {
            // cone point: zero every tangent around the vertex
            let mut current = second;
            loop {
                mesh.halfedge_tangent[current] = Vector4::zeros();
                current = next_halfedge(mesh.halfedges[current].paired_halfedge);
                if current == second {
                    break;
                }
            }
        }
    }
}

/// Build half-edge tangents constrained to the vertex normals, sharpening
/// the listed edges.
///
/// Tangents that cross a sharpened edge are shortened by the edge's
/// smoothness, concentrating curvature there, while the tangents of the
/// sharp edges themselves are aligned for continuity. Internal edges
/// between distinct flat faces are always fully sharpened.
pub fn create_tangents(mesh: &mut TriMesh, mut sharpened_edges: Vec<Smoothness>) {
    let tri_is_flat = flat_faces(mesh);
    let vert_flat = vert_flat_face(mesh, &tri_is_flat);
    let mut vert_normal = mesh.vert_normal.clone();
    for (v, normal) in vert_normal.iter_mut().enumerate() {
        if let FlatVert::Single(tri) = vert_flat[v] {
            *normal = mesh.face_normal[tri];
        }
    }

    mesh.halfedge_tangent = smooth_bezier_pass(mesh, &vert_normal);

    // sharpen edges around flat faces, just on the face side
    for tri in 0..mesh.num_tri() {
        if !tri_is_flat[tri] {
            continue;
        }
        for j in 0..3 {
            let tri2 = mesh.halfedges[3 * tri + j].paired_halfedge / 3;
            if !tri_is_flat[tri2]
                || !mesh.relation.tri_ref[tri].same_face(&mesh.relation.tri_ref[tri2])
            {
                sharpened_edges.push(Smoothness {
                    halfedge: 3 * tri + j,
                    smoothness: 0.0,
                });
            }
        }
    }

    if sharpened_edges.is_empty() {
        return;
    }

    // canonical edge map keyed by the forward half-edge, pairing each side
    // with the opposite side's default smoothness of one; the minimum wins
    // when a side is specified twice
    let mut edges: BTreeMap<usize, (Smoothness, Smoothness)> = BTreeMap::new();
    for edge in sharpened_edges {
        if edge.smoothness >= 1.0 {
            continue;
        }
        let forward = mesh.halfedges[edge.halfedge].is_forward();
        let pair = mesh.halfedges[edge.halfedge].paired_halfedge;
        let idx = if forward { edge.halfedge } else { pair };
        match edges.entry(idx) {
            Entry::Vacant(vacant) => {
                let mut entry = (
                    edge,
                    Smoothness {
                        halfedge: pair,
                        smoothness: 1.0,
                    },
                );
                if !forward {
                    std::mem::swap(&mut entry.0, &mut entry.1);
                }
                vacant.insert(entry);
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let side = if forward { &mut entry.0 } else { &mut entry.1 };
                side.smoothness = side.smoothness.min(edge.smoothness);
            }
        }
    }

    // group sharpened edges by the vertex they leave
    let mut vert_tangents: BTreeMap<usize, Vec<(Smoothness, Smoothness)>> = BTreeMap::new();
    for edge in edges.values() {
        vert_tangents
            .entry(mesh.halfedges[edge.0.halfedge].start_vert)
            .or_default()
            .push(*edge);
        vert_tangents
            .entry(mesh.halfedges[edge.1.halfedge].start_vert)
            .or_default()
            .push((edge.1, edge.0));
    }

    for vert in vert_tangents.values() {
        // sharp edges that end are smooth at their terminal vert
        if vert.len() == 1 {
            continue;
        }
        if vert.len() == 2 {
            // align the two sharp half-edges into a continuous crease
            let first = vert[0].0.halfedge;
            let second = vert[1].0.halfedge;
            let new_tangent =
                (xyz(mesh.halfedge_tangent[first]) - xyz(mesh.halfedge_tangent[second]))
                    .normalize();

            let pos = mesh.vert_pos[mesh.halfedges[first].start_vert];
            mesh.halfedge_tangent[first] = circular_tangent(
                new_tangent,
                mesh.vert_pos[mesh.halfedges[first].end_vert] - pos,
            );
            mesh.halfedge_tangent[second] = circular_tangent(
                -new_tangent,
                mesh.vert_pos[mesh.halfedges[second].end_vert] - pos,
            );

            smooth_half(
                mesh,
                first,
                second,
                (vert[0].1.smoothness + vert[1].0.smoothness) / 2.0,
            );
            smooth_half(
                mesh,
                second,
                first,
                (vert[1].1.smoothness + vert[0].0.smoothness) / 2.0,
            );
        } else {
            // sharpen the vertex uniformly
            let mut smoothness = 0.0;
            for pair in vert {
                smoothness += pair.0.smoothness + pair.1.smoothness;
            }
            smoothness /= (2 * vert.len()) as f64;

            let start = vert[0].0.halfedge;
            let mut current = start;
            loop {
                mesh.halfedge_tangent[current] *= smoothness;
                current = next_halfedge(mesh.halfedges[current].paired_halfedge);
                if current == start {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{cube, hex_bipyramid, octahedron};
    use super::super::{set_normals, smooth_out};
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circular_tangent_zero_direction() {
        let tangent = circular_tangent(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(xyz(tangent), Vector3::zeros());
        assert!(tangent.w > 0.0);
    }

    #[test]
    fn test_circular_tangent_weight_is_half_angle_cosine() {
        // a quarter arc between unit points: the rational weight must be
        // cos(45 degrees)
        let tangent = circular_tangent(Vector3::new(0.0, 1.0, 0.0), Vector3::new(-1.0, 1.0, 0.0));
        let expected = std::f64::consts::FRAC_1_SQRT_2;
        // the cubic weight is the degree-elevated quadratic weight
        let quadratic_equivalent = (3.0 * tangent.w - 1.0) / 2.0;
        assert_relative_eq!(quadratic_equivalent, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_tangents_orthogonal_to_vertex_normal() {
        let mut mesh = octahedron();
        create_tangents(&mut mesh, Vec::new());

        assert_eq!(mesh.halfedge_tangent.len(), mesh.num_halfedge());
        for (h, tangent) in mesh.halfedge_tangent.iter().enumerate() {
            let vert = mesh.halfedges[h].start_vert;
            assert!(tangent.iter().all(|c| c.is_finite()));
            assert!(xyz(*tangent).norm() > 0.0);
            assert_relative_eq!(
                xyz(*tangent).dot(&mesh.vert_normal[vert]),
                0.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_two_sharp_edges_align_antiparallel() {
        let mut mesh = hex_bipyramid();
        // both half-edges of the apex edges to equator verts 1 and 4
        let sharpened = [0, 18]
            .iter()
            .flat_map(|&h| {
                let pair = mesh.halfedges[h].paired_halfedge;
                [
                    Smoothness {
                        halfedge: h,
                        smoothness: 0.0,
                    },
                    Smoothness {
                        halfedge: pair,
                        smoothness: 0.0,
                    },
                ]
            })
            .collect();
        create_tangents(&mut mesh, sharpened);

        let t_first = xyz(mesh.halfedge_tangent[0]).normalize();
        let t_second = xyz(mesh.halfedge_tangent[18]).normalize();
        assert_relative_eq!(t_first.dot(&t_second), -1.0, epsilon = 1e-9);

        // the four intermediate tangents around the apex collapse to zero
        let mut zeroed = 0;
        mesh.for_vert(0, |h| {
            if h != 0 && h != 18 {
                assert_eq!(xyz(mesh.halfedge_tangent[h]), Vector3::zeros());
                zeroed += 1;
            }
        });
        assert_eq!(zeroed, 4);
    }

    #[test]
    fn test_three_sharp_edges_sharpen_cone() {
        let mut mesh = hex_bipyramid();
        let sharpened = [0, 6, 12]
            .iter()
            .flat_map(|&h| {
                let pair = mesh.halfedges[h].paired_halfedge;
                [
                    Smoothness {
                        halfedge: h,
                        smoothness: 0.0,
                    },
                    Smoothness {
                        halfedge: pair,
                        smoothness: 0.0,
                    },
                ]
            })
            .collect();
        create_tangents(&mut mesh, sharpened);

        // all six apex tangents are scaled by the average smoothness (zero)
        mesh.for_vert(0, |h| {
            assert_eq!(mesh.halfedge_tangent[h], Vector4::zeros());
        });
    }

    #[test]
    fn test_smooth_out_sharpens_everything_below_threshold() {
        let mut mesh = octahedron();
        // every octahedron edge bends ~109 degrees
        smooth_out(&mut mesh, 60.0, 0.0);
        for tangent in &mesh.halfedge_tangent {
            assert_eq!(*tangent, Vector4::zeros());
        }
    }

    #[test]
    fn test_tangents_from_smooth_normals_are_smooth() {
        let mut mesh = octahedron();
        set_normals(&mut mesh, 0, 180.0);
        create_tangents_from_normals(&mut mesh, 0);

        for tangent in &mesh.halfedge_tangent {
            assert!(tangent.iter().all(|c| c.is_finite()));
            assert!(xyz(*tangent).norm() > 0.0);
        }
    }

    #[test]
    fn test_tangents_from_sharp_normals_zero_cone_points() {
        let mut mesh = cube();
        set_normals(&mut mesh, 0, 45.0);
        create_tangents_from_normals(&mut mesh, 0);

        // every cube corner sees three normal discontinuities, so every
        // vertex is a cone point and all tangents collapse
        for tangent in &mesh.halfedge_tangent {
            assert_eq!(*tangent, Vector4::zeros());
        }
    }
}
