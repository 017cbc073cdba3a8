//! Per-corner normal rebuilding with sharpness-driven unsharing.

use nalgebra::Vector3;

use super::{flat_faces, vert_flat_face, FlatVert};
use crate::mesh::{next_halfedge, TriMesh, UNSET};

/// Does the fan walk cross a smoothness boundary between these two faces?
fn group_boundary(
    mesh: &TriMesh,
    flat: &[bool],
    min_sharp_angle: f64,
    face: usize,
    prev_face: usize,
) -> bool {
    let dihedral = mesh.face_normal[face]
        .dot(&mesh.face_normal[prev_face])
        .acos()
        .to_degrees();
    dihedral > min_sharp_angle
        || flat[face] != flat[prev_face]
        || (flat[face]
            && flat[prev_face]
            && !mesh.relation.tri_ref[face].same_face(&mesh.relation.tri_ref[prev_face]))
}

/// Rebuild property normals, unshared across edges bent more than
/// `min_sharp_angle` (degrees).
///
/// Each vertex fan is split into groups at sharp edges and flat-face
/// boundaries. A vertex with fewer than two sharp edges keeps a single
/// normal (its flat face's normal if it has one, else the smooth vertex
/// normal); otherwise every group accumulates incident face normals
/// weighted by the angle each face subtends at the vertex, and corners in
/// different groups get distinct property vertices.
///
/// Existing property channels are preserved; the normal is written at
/// components `normal_idx..normal_idx + 3` of each record, growing records
/// as needed.
pub fn set_normals(mesh: &mut TriMesh, normal_idx: usize, min_sharp_angle: f64) {
    if mesh.is_empty() {
        return;
    }

    let old_num_prop = mesh.relation.num_prop;
    let num_tri = mesh.num_tri();
    let num_vert = mesh.num_vert();

    let tri_is_flat = flat_faces(mesh);
    let vert_flat = vert_flat_face(mesh, &tri_is_flat);

    // count sharp edges per vertex: bent edges, plus smooth edges between
    // distinct flat-face groups at verts where several flat faces meet
    let mut vert_num_sharp = vec![0usize; num_vert];
    for (e, he) in mesh.halfedges.iter().enumerate() {
        if !he.is_forward() {
            continue;
        }
        let tri1 = e / 3;
        let tri2 = he.paired_halfedge / 3;
        let dihedral = mesh.face_normal[tri1]
            .dot(&mesh.face_normal[tri2])
            .acos()
            .to_degrees();
        if dihedral > min_sharp_angle {
            vert_num_sharp[he.start_vert] += 1;
            vert_num_sharp[he.end_vert] += 1;
        } else {
            let face_split = tri_is_flat[tri1] != tri_is_flat[tri2]
                || (tri_is_flat[tri1]
                    && tri_is_flat[tri2]
                    && !mesh.relation.tri_ref[tri1].same_face(&mesh.relation.tri_ref[tri2]));
            if face_split {
                if vert_flat[he.start_vert] == FlatVert::Mixed {
                    vert_num_sharp[he.start_vert] += 1;
                }
                if vert_flat[he.end_vert] == FlatVert::Mixed {
                    vert_num_sharp[he.end_vert] += 1;
                }
            }
        }
    }

    let num_prop = old_num_prop.max(normal_idx + 3);
    let old_num_prop_vert = mesh.num_prop_vert();
    let mut old_properties = vec![0.0; num_prop * old_num_prop_vert];
    std::mem::swap(&mut mesh.relation.properties, &mut old_properties);
    mesh.relation.num_prop = num_prop;

    if mesh.relation.tri_properties.is_empty() {
        mesh.relation.tri_properties = (0..num_tri)
            .map(|tri| {
                [
                    mesh.halfedges[3 * tri].start_vert,
                    mesh.halfedges[3 * tri + 1].start_vert,
                    mesh.halfedges[3 * tri + 2].start_vert,
                ]
            })
            .collect();
    }
    let mut old_tri_prop = vec![[UNSET; 3]; num_tri];
    std::mem::swap(&mut mesh.relation.tri_properties, &mut old_tri_prop);

    for tri in 0..num_tri {
        for i in 0..3 {
            if mesh.relation.tri_properties[tri][i] != UNSET {
                continue;
            }
            let start_edge = 3 * tri + i;
            let vert = mesh.halfedges[start_edge].start_vert;

            if vert_num_sharp[vert] < 2 {
                // one normal stamped across the whole fan
                let normal = match vert_flat[vert] {
                    FlatVert::Single(flat_tri) => mesh.face_normal[flat_tri],
                    _ => mesh.vert_normal[vert],
                };
                let mut last_prop = UNSET;
                let mut current = start_edge;
                loop {
                    current = next_halfedge(mesh.halfedges[current].paired_halfedge);
                    let this_tri = current / 3;
                    let j = current % 3;
                    let prop = old_tri_prop[this_tri][j];
                    mesh.relation.tri_properties[this_tri][j] = prop;
                    if prop != last_prop {
                        last_prop = prop;
                        let src = prop * old_num_prop;
                        let dst = prop * num_prop;
                        for p in 0..old_num_prop {
                            mesh.relation.properties[dst + p] = old_properties[src + p];
                        }
                        for k in 0..3 {
                            mesh.relation.properties[dst + normal_idx + k] = normal[k];
                        }
                    }
                    if current == start_edge {
                        break;
                    }
                }
            } else {
                let center_pos = mesh.vert_pos[vert].coords;
                // walk forward until the fan crosses a boundary, so the
                // group scan starts on one
                let mut current = start_edge;
                let mut prev_face = mesh.halfedges[current].face;
                loop {
                    let next = next_halfedge(mesh.halfedges[current].paired_halfedge);
                    let face = mesh.halfedges[next].face;
                    if group_boundary(mesh, &tri_is_flat, min_sharp_angle, face, prev_face) {
                        break;
                    }
                    current = next;
                    prev_face = face;
                    if current == start_edge {
                        break;
                    }
                }
                let end_edge = current;

                // accumulate angle-weighted face normals per group
                let mut group: Vec<usize> = Vec::new();
                let mut normals: Vec<Vector3<f64>> = Vec::new();
                let mut prev_edge_vec =
                    (mesh.vert_pos[mesh.halfedges[current].end_vert].coords - center_pos)
                        .normalize();
                loop {
                    current = next_halfedge(mesh.halfedges[current].paired_halfedge);
                    let face = mesh.halfedges[current].face;
                    if group_boundary(mesh, &tri_is_flat, min_sharp_angle, face, prev_face) {
                        normals.push(Vector3::zeros());
                    }
                    group.push(normals.len() - 1);

                    let edge_vec =
                        (mesh.vert_pos[mesh.halfedges[current].end_vert].coords - center_pos)
                            .normalize();
                    let dot = prev_edge_vec.dot(&edge_vec);
                    let phi = if dot >= 1.0 {
                        0.0
                    } else if dot <= -1.0 {
                        std::f64::consts::PI
                    } else {
                        dot.acos()
                    };
                    let last = normals.len() - 1;
                    normals[last] += mesh.face_normal[face] * phi;

                    prev_face = face;
                    prev_edge_vec = edge_vec;
                    if current == end_edge {
                        break;
                    }
                }
                for normal in &mut normals {
                    *normal = normal.normalize();
                }

                // assign group normals, allocating a fresh property vertex
                // whenever a group boundary is crossed without a property
                // seam already splitting the corner
                let mut last_group = 0;
                let mut last_prop = UNSET;
                let mut new_prop = UNSET;
                let mut idx = 0;
                loop {
                    current = next_halfedge(mesh.halfedges[current].paired_halfedge);
                    let this_tri = current / 3;
                    let j = current % 3;
                    let prop = old_tri_prop[this_tri][j];

                    if group[idx] != last_group && group[idx] != 0 && prop == last_prop {
                        last_group = group[idx];
                        new_prop = mesh.relation.properties.len() / num_prop;
                        mesh.relation
                            .properties
                            .resize((new_prop + 1) * num_prop, 0.0);
                        let src = prop * old_num_prop;
                        let dst = new_prop * num_prop;
                        for p in 0..old_num_prop {
                            mesh.relation.properties[dst + p] = old_properties[src + p];
                        }
                        for k in 0..3 {
                            mesh.relation.properties[dst + normal_idx + k] =
                                normals[group[idx]][k];
                        }
                    } else if prop != last_prop {
                        last_prop = prop;
                        new_prop = prop;
                        let src = prop * old_num_prop;
                        let dst = prop * num_prop;
                        for p in 0..old_num_prop {
                            mesh.relation.properties[dst + p] = old_properties[src + p];
                        }
                        for k in 0..3 {
                            mesh.relation.properties[dst + normal_idx + k] =
                                normals[group[idx]][k];
                        }
                    }

                    mesh.relation.tri_properties[this_tri][j] = new_prop;
                    idx += 1;
                    if current == end_edge {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{cube, fan_cube, octahedron};
    use super::*;

    #[test]
    fn test_cube_unshares_per_face() {
        let mut mesh = cube();
        set_normals(&mut mesh, 0, 45.0);

        // four property vertices per face
        assert_eq!(mesh.relation.num_prop, 3);
        assert_eq!(mesh.num_prop_vert(), 24);

        // every corner's normal equals its face normal, bit for bit
        for h in 0..mesh.num_halfedge() {
            assert_eq!(mesh.get_normal(h, 0), mesh.face_normal[h / 3]);
        }
    }

    #[test]
    fn test_fanned_cube_flat_faces_keep_face_normal() {
        let mut mesh = fan_cube();
        set_normals(&mut mesh, 0, 45.0);

        for h in 0..mesh.num_halfedge() {
            assert_eq!(mesh.get_normal(h, 0), mesh.face_normal[h / 3]);
        }
    }

    #[test]
    fn test_all_smooth_keeps_shared_verts() {
        let mut mesh = octahedron();
        set_normals(&mut mesh, 0, 180.0);

        // nothing splits: property space still matches vertex space
        assert_eq!(mesh.num_prop_vert(), 6);
        for h in 0..mesh.num_halfedge() {
            let vert = mesh.halfedges[h].start_vert;
            assert_eq!(mesh.get_normal(h, 0), mesh.vert_normal[vert]);
        }
    }

    #[test]
    fn test_all_sharp_unshares_every_corner() {
        let mut mesh = octahedron();
        // octahedron dihedral is ~109 degrees, so every edge is sharp
        set_normals(&mut mesh, 0, 90.0);

        assert_eq!(mesh.num_prop_vert(), 3 * mesh.num_tri());
        for h in 0..mesh.num_halfedge() {
            let normal = mesh.get_normal(h, 0);
            assert!((normal - mesh.face_normal[h / 3]).norm() < 1e-12);
        }
    }

    #[test]
    fn test_existing_property_channel_preserved() {
        let mut mesh = cube();
        // seed one scalar property per vertex
        mesh.relation.num_prop = 1;
        mesh.relation.properties = (0..mesh.num_vert()).map(|v| 10.0 + v as f64).collect();
        mesh.relation.tri_properties = (0..mesh.num_tri())
            .map(|tri| {
                [
                    mesh.halfedges[3 * tri].start_vert,
                    mesh.halfedges[3 * tri + 1].start_vert,
                    mesh.halfedges[3 * tri + 2].start_vert,
                ]
            })
            .collect();

        set_normals(&mut mesh, 1, 45.0);
        assert_eq!(mesh.relation.num_prop, 4);

        // channel zero still holds the original per-vertex value
        for tri in 0..mesh.num_tri() {
            for i in 0..3 {
                let vert = mesh.halfedges[3 * tri + i].start_vert;
                let prop = mesh.relation.tri_properties[tri][i];
                assert_eq!(
                    mesh.relation.properties[prop * 4],
                    10.0 + vert as f64,
                    "scalar channel must survive the normal rebuild"
                );
            }
        }
    }

    #[test]
    fn test_empty_mesh_is_noop() {
        let mut mesh = TriMesh::default();
        set_normals(&mut mesh, 0, 30.0);
        assert_eq!(mesh.relation.num_prop, 0);
    }
}
