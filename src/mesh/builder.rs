//! Mesh construction utilities.
//!
//! This module builds the flat half-edge structure from triangle-vertex
//! lists. Pairing works through a directed-edge map: every directed edge of
//! a closed manifold appears exactly once, and its reversal on the
//! neighboring face becomes its pair.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{Halfedge, TriMesh};
use super::relation::{reserve_mesh_id, MeshRelation, TriRef, UNSET};
use crate::error::{MeshError, Result};

/// Canonical (forward) view of an undirected edge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TmpEdge {
    /// Smaller vertex of the edge.
    pub first: usize,
    /// Larger vertex of the edge.
    pub second: usize,
    /// Index of the forward half-edge.
    pub halfedge_idx: usize,
}

/// One canonical record per undirected edge, holding the forward half-edge.
pub(crate) fn collect_edges(halfedges: &[Halfedge]) -> Vec<TmpEdge> {
    halfedges
        .iter()
        .enumerate()
        .filter(|(_, he)| he.is_forward())
        .map(|(idx, he)| TmpEdge {
            first: he.start_vert,
            second: he.end_vert,
            halfedge_idx: idx,
        })
        .collect()
}

/// Build paired half-edges for a closed manifold triangulation.
fn build_halfedges(faces: &[[usize; 3]]) -> Result<Vec<Halfedge>> {
    let mut halfedges = Vec::with_capacity(faces.len() * 3);
    let mut edge_map: HashMap<(usize, usize), usize> = HashMap::with_capacity(faces.len() * 3);

    for (tri, face) in faces.iter().enumerate() {
        for i in 0..3 {
            let start = face[i];
            let end = face[(i + 1) % 3];
            let idx = 3 * tri + i;
            if edge_map.insert((start, end), idx).is_some() {
                return Err(MeshError::NonManifoldEdge { v0: start, v1: end });
            }
            halfedges.push(Halfedge {
                start_vert: start,
                end_vert: end,
                paired_halfedge: UNSET,
                face: tri,
            });
        }
    }

    for h in 0..halfedges.len() {
        let (start, end) = (halfedges[h].start_vert, halfedges[h].end_vert);
        match edge_map.get(&(end, start)) {
            Some(&pair) => halfedges[h].paired_halfedge = pair,
            None => return Err(MeshError::NonManifoldEdge { v0: start, v1: end }),
        }
    }

    Ok(halfedges)
}

/// Build a closed manifold mesh from vertices and triangle faces.
///
/// Each input triangle becomes its own original face, so no flat faces
/// exist initially; assign shared [`TriRef`]s afterwards to group triangles
/// into polygonal faces. Face and vertex normals are computed.
///
/// # Errors
///
/// Fails if `faces` is empty, references an out-of-range vertex, contains a
/// degenerate triangle, or does not form a closed manifold.
///
/// # Example
/// ```
/// use strudel::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
///     Point3::new(0.5, 0.5, 1.0),
/// ];
/// let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
///
/// let mesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vert(), 4);
/// assert_eq!(mesh.num_tri(), 4);
/// ```
pub fn build_from_triangles(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<TriMesh> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex {
                    face: fi,
                    vertex: vi,
                });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mesh_id = reserve_mesh_id();
    let mut mesh = TriMesh {
        vert_pos: vertices.to_vec(),
        halfedges: build_halfedges(faces)?,
        relation: MeshRelation {
            tri_ref: (0..faces.len())
                .map(|tri| TriRef { mesh_id, tri })
                .collect(),
            ..Default::default()
        },
        ..Default::default()
    };
    mesh.calculate_normals();
    Ok(mesh)
}

/// Replace the mesh's half-edges with ones built from a new triangle-vertex
/// array, as produced by subdivision.
pub(crate) fn rebuild_halfedges(mesh: &mut TriMesh, tri_verts: &[[usize; 3]]) {
    mesh.halfedges = build_halfedges(tri_verts)
        .expect("subdivision produced a non-manifold triangulation");
}

/// Convert a mesh back to a face-vertex representation.
///
/// Returns a (vertices, faces) tuple.
pub fn to_face_vertex(mesh: &TriMesh) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let faces = (0..mesh.num_tri())
        .map(|tri| {
            [
                mesh.halfedges[3 * tri].start_vert,
                mesh.halfedges[3 * tri + 1].start_vert,
                mesh.halfedges[3 * tri + 2].start_vert,
            ]
        })
        .collect();
    (mesh.vert_pos.clone(), faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron_input() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_tetrahedron() {
        let (vertices, faces) = tetrahedron_input();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vert(), 4);
        assert_eq!(mesh.num_tri(), 4);
        assert_eq!(mesh.num_halfedge(), 12);
        assert!(mesh.is_valid());
        assert_eq!(mesh.face_normal.len(), 4);
        assert_eq!(mesh.vert_normal.len(), 4);
        // each triangle starts as its own original face
        for (tri, r) in mesh.relation.tri_ref.iter().enumerate() {
            assert_eq!(r.tri, tri);
        }
    }

    #[test]
    fn test_collect_edges_canonical() {
        let (vertices, faces) = tetrahedron_input();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        let edges = collect_edges(&mesh.halfedges);
        assert_eq!(edges.len(), 6);
        for edge in &edges {
            assert!(edge.first < edge.second);
            let he = mesh.halfedges[edge.halfedge_idx];
            assert_eq!(he.start_vert, edge.first);
            assert_eq!(he.end_vert, edge.second);
        }
    }

    #[test]
    fn test_open_mesh_rejected() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2]];
        let result = build_from_triangles(&vertices, &faces);
        assert!(matches!(result, Err(MeshError::NonManifoldEdge { .. })));
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let faces = vec![[0, 1, 2]];
        let result = build_from_triangles(&vertices, &faces);
        assert!(matches!(
            result,
            Err(MeshError::InvalidVertexIndex { .. })
        ));
    }

    #[test]
    fn test_degenerate_face() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 0, 2]];
        let result = build_from_triangles(&vertices, &faces);
        assert!(matches!(result, Err(MeshError::DegenerateFace { .. })));
    }

    #[test]
    fn test_empty_input() {
        let result = build_from_triangles(&[], &[]);
        assert!(matches!(result, Err(MeshError::EmptyMesh)));
    }

    #[test]
    fn test_roundtrip() {
        let (vertices, faces) = tetrahedron_input();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();
        let (out_verts, out_faces) = to_face_vertex(&mesh);

        assert_eq!(out_verts.len(), vertices.len());
        assert_eq!(out_faces, faces);
        for (v_in, v_out) in vertices.iter().zip(out_verts.iter()) {
            assert!((v_in - v_out).norm() < 1e-12);
        }
    }
}
