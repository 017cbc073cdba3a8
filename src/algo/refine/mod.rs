//! Subdivision-driven refinement.
//!
//! [`subdivide`] splits every edge into pieces as directed by a caller
//! function, sub-triangulating each triangle through the cached
//! [`Partition`] and carrying positions, provenance, and properties along.
//! [`refine`] composes subdivision with the curved patch evaluation of
//! [`interp_tri`] whenever tangents are present, so a tangent-carrying mesh
//! refines onto its smoothed surface.
//!
//! # Example
//!
//! ```
//! use strudel::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//! let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//! let mut mesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! refine_uniform(&mut mesh, 4);
//! assert_eq!(mesh.num_tri(), 4 * 16);
//! assert!(mesh.is_valid());
//! ```

mod interp;
mod partition;

pub use interp::interp_tri;
pub use partition::Partition;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::algo::{run_parallel, Progress};
use crate::mesh::{
    collect_edges, rebuild_halfedges, reserve_mesh_id, Barycentric, TriMesh, TriRef,
};

/// The next corner index within a triangle.
#[inline]
pub(crate) fn next3(i: usize) -> usize {
    (i + 1) % 3
}

/// Split each edge into pieces as defined by `edge_divisions` (the number
/// of new verts to insert, given the edge vector) and sub-triangulate each
/// triangle accordingly.
///
/// Returns the barycentric coordinate of every vertex of the subdivided
/// mesh relative to the original triangles, so callers can re-project the
/// new verts through a smoothing patch. Normals are left cleared; run
/// [`calculate_normals`](TriMesh::calculate_normals) (or use [`refine`])
/// once vertices reach their final positions.
pub fn subdivide<F>(mesh: &mut TriMesh, edge_divisions: F) -> Vec<Barycentric>
where
    F: Fn(Vector3<f64>) -> usize + Sync,
{
    if mesh.is_empty() {
        return Vec::new();
    }

    let num_vert = mesh.num_vert();
    let num_tri = mesh.num_tri();
    let edges = collect_edges(&mesh.halfedges);
    let num_edge = edges.len();

    // each half-edge's canonical edge index
    let mut half2edge = vec![0usize; mesh.num_halfedge()];
    for (e, edge) in edges.iter().enumerate() {
        half2edge[edge.halfedge_idx] = e;
        half2edge[mesh.halfedges[edge.halfedge_idx].paired_halfedge] = e;
    }

    let edge_added: Vec<usize> = {
        let count = |edge: &crate::mesh::TmpEdge| {
            edge_divisions(mesh.vert_pos[edge.first] - mesh.vert_pos[edge.second])
        };
        if run_parallel(num_edge) {
            edges.par_iter().map(count).collect()
        } else {
            edges.iter().map(count).collect()
        }
    };

    // exclusive scan; new edge verts go after the retained ones
    let mut edge_offset = Vec::with_capacity(num_edge);
    let mut next_vert = num_vert;
    for &added in &edge_added {
        edge_offset.push(next_vert);
        next_vert += added;
    }
    let total_edge_added = next_vert - num_vert;

    let mut vert_bary = vec![
        Barycentric {
            tri: 0,
            uvw: Vector3::zeros(),
        };
        next_vert
    ];
    // retained verts: whichever incident triangle writes last wins, and
    // every writer records equivalent information
    for tri in 0..num_tri {
        for i in 0..3 {
            let mut uvw = Vector3::zeros();
            uvw[i] = 1.0;
            vert_bary[mesh.halfedges[3 * tri + i].start_vert] = Barycentric { tri, uvw };
        }
    }
    // edge verts: linear barycentrics on the forward half-edge's triangle
    for (e, edge) in edges.iter().enumerate() {
        let n = edge_added[e];
        let frac = 1.0 / (n as f64 + 1.0);
        let v0 = edge.halfedge_idx % 3;
        let v1 = next3(v0);
        let tri = edge.halfedge_idx / 3;
        for i in 0..n {
            let mut uvw = Vector3::zeros();
            uvw[v1] = (i as f64 + 1.0) * frac;
            uvw[v0] = 1.0 - uvw[v1];
            vert_bary[edge_offset[e] + i] = Barycentric { tri, uvw };
        }
    }

    let sub_tris: Vec<Partition> = {
        let fetch = |tri: usize| {
            Partition::get_partition([
                edge_added[half2edge[3 * tri]] + 1,
                edge_added[half2edge[3 * tri + 1]] + 1,
                edge_added[half2edge[3 * tri + 2]] + 1,
            ])
        };
        if run_parallel(num_tri) {
            (0..num_tri).into_par_iter().map(fetch).collect()
        } else {
            (0..num_tri).map(fetch).collect()
        }
    };

    let mut tri_offset = Vec::with_capacity(num_tri);
    let mut next_tri = 0usize;
    for part in &sub_tris {
        tri_offset.push(next_tri);
        next_tri += part.tri_vert.len();
    }
    let total_tri = next_tri;

    let mut interior_offset = Vec::with_capacity(num_tri);
    let mut next_interior = vert_bary.len();
    for part in &sub_tris {
        interior_offset.push(next_interior);
        next_interior += part.num_interior();
    }

    vert_bary.resize(
        next_interior,
        Barycentric {
            tri: 0,
            uvw: Vector3::zeros(),
        },
    );
    let mut tri_verts = vec![[0usize; 3]; total_tri];
    let mut tri_ref = vec![mesh.relation.tri_ref[0]; total_tri];

    // reindex each triangle's partition into the global vertex space;
    // computed in parallel, spliced sequentially
    let patches: Vec<(Vec<[usize; 3]>, Vec<Barycentric>)> = {
        let reindex_tri = |tri: usize| {
            let mut tri3 = [0usize; 3];
            let mut edge_offsets = [0usize; 3];
            let mut edge_fwd = [false; 3];
            for i in 0..3 {
                let halfedge = mesh.halfedges[3 * tri + i];
                tri3[i] = halfedge.start_vert;
                edge_offsets[i] = edge_offset[half2edge[3 * tri + i]];
                edge_fwd[i] = halfedge.is_forward();
            }
            let part = &sub_tris[tri];
            let new_tris = part.reindex(tri3, edge_offsets, edge_fwd, interior_offset[tri]);

            // invert the sorting permutation to place interior barycentrics
            // back on the triangle's own axes
            let idx = part.idx;
            let v_idx = if idx[1] == next3(idx[0]) {
                idx
            } else {
                [idx[2], idx[0], idx[1]]
            };
            let mut r_idx = [0usize; 3];
            for i in 0..3 {
                r_idx[v_idx[i]] = i;
            }
            let interior: Vec<Barycentric> = part.vert_bary[part.interior_offset()..]
                .iter()
                .map(|bary| Barycentric {
                    tri,
                    uvw: Vector3::new(bary[r_idx[0]], bary[r_idx[1]], bary[r_idx[2]]),
                })
                .collect();
            (new_tris, interior)
        };
        if run_parallel(num_tri) {
            (0..num_tri).into_par_iter().map(reindex_tri).collect()
        } else {
            (0..num_tri).map(reindex_tri).collect()
        }
    };
    for (tri, (new_tris, interior)) in patches.iter().enumerate() {
        tri_verts[tri_offset[tri]..tri_offset[tri] + new_tris.len()].copy_from_slice(new_tris);
        for slot in &mut tri_ref[tri_offset[tri]..tri_offset[tri] + new_tris.len()] {
            *slot = mesh.relation.tri_ref[tri];
        }
        vert_bary[interior_offset[tri]..interior_offset[tri] + interior.len()]
            .copy_from_slice(interior);
    }

    // positions of all verts from their barycentrics
    let new_vert_pos: Vec<Point3<f64>> = {
        let place = |bary: &Barycentric| {
            let p0 = mesh.vert_pos[mesh.halfedges[3 * bary.tri].start_vert].coords;
            let p1 = mesh.vert_pos[mesh.halfedges[3 * bary.tri + 1].start_vert].coords;
            let p2 = mesh.vert_pos[mesh.halfedges[3 * bary.tri + 2].start_vert].coords;
            Point3::from(p0 * bary.uvw[0] + p1 * bary.uvw[1] + p2 * bary.uvw[2])
        };
        if run_parallel(vert_bary.len()) {
            vert_bary.par_iter().map(place).collect()
        } else {
            vert_bary.iter().map(place).collect()
        }
    };
    mesh.vert_pos = new_vert_pos;
    mesh.face_normal.clear();

    if mesh.relation.num_prop > 0 {
        let num_prop = mesh.relation.num_prop;
        let num_prop_vert = mesh.num_prop_vert();
        let added_verts = mesh.num_vert() - num_vert;
        let prop_offset = num_prop_vert - num_vert;

        let mut prop = vec![0.0; num_prop * (num_prop_vert + added_verts + total_edge_added)];
        prop[..mesh.relation.properties.len()].copy_from_slice(&mesh.relation.properties);

        let interpolate = |record: &mut [f64], tri: usize, uvw: Vector3<f64>| {
            for (p, slot) in record.iter_mut().enumerate() {
                let mut tri_prop = Vector3::zeros();
                for k in 0..3 {
                    tri_prop[k] = mesh.relation.properties
                        [mesh.relation.tri_properties[tri][k] * num_prop + p];
                }
                *slot = tri_prop.dot(&uvw);
            }
        };

        // every new vert interpolates its triangle's corner properties
        {
            let added_region =
                &mut prop[num_prop_vert * num_prop..(num_prop_vert + added_verts) * num_prop];
            let fill = |(record, bary): (&mut [f64], &Barycentric)| {
                interpolate(record, bary.tri, bary.uvw);
            };
            if run_parallel(added_verts) {
                added_region
                    .par_chunks_mut(num_prop)
                    .zip(vert_bary[num_vert..].par_iter())
                    .for_each(fill);
            } else {
                added_region
                    .chunks_mut(num_prop)
                    .zip(vert_bary[num_vert..].iter())
                    .for_each(fill);
            }
        }

        // each edge also gets pair-side records so that property seams can
        // split; they go unreferenced when the edge is not a seam
        for (e, edge) in edges.iter().enumerate() {
            let n = edge_added[e];
            let frac = 1.0 / (n as f64 + 1.0);
            let pair_idx = mesh.halfedges[edge.halfedge_idx].paired_halfedge;
            let v0 = pair_idx % 3;
            let v1 = next3(v0);
            let tri = pair_idx / 3;
            let base = edge_offset[e] + prop_offset + added_verts;
            for i in 0..n {
                let mut uvw = Vector3::zeros();
                uvw[v1] = (i as f64 + 1.0) * frac;
                uvw[v0] = 1.0 - uvw[v1];
                interpolate(
                    &mut prop[(base + i) * num_prop..(base + i + 1) * num_prop],
                    tri,
                    uvw,
                );
            }
        }

        // reindex property-vertex space, splitting seams
        let prop_patches: Vec<Vec<[usize; 3]>> = {
            let reindex_prop = |tri: usize| {
                let rel = &mesh.relation;
                let tri3 = rel.tri_properties[tri];
                let mut edge_offsets = [0usize; 3];
                let mut edge_fwd = [true; 3];
                for i in 0..3 {
                    let halfedge = mesh.halfedges[3 * tri + i];
                    edge_offsets[i] = edge_offset[half2edge[3 * tri + i]];
                    if !halfedge.is_forward() {
                        let pair_tri = halfedge.paired_halfedge / 3;
                        let j = halfedge.paired_halfedge % 3;
                        if rel.tri_properties[pair_tri][j] != rel.tri_properties[tri][next3(i)]
                            || rel.tri_properties[pair_tri][next3(j)]
                                != rel.tri_properties[tri][i]
                        {
                            // property seam: this side uses its own records
                            edge_offsets[i] += added_verts;
                        } else {
                            edge_fwd[i] = false;
                        }
                    }
                }
                sub_tris[tri].reindex(
                    tri3,
                    [
                        edge_offsets[0] + prop_offset,
                        edge_offsets[1] + prop_offset,
                        edge_offsets[2] + prop_offset,
                    ],
                    edge_fwd,
                    interior_offset[tri] + prop_offset,
                )
            };
            if run_parallel(num_tri) {
                (0..num_tri).into_par_iter().map(reindex_prop).collect()
            } else {
                (0..num_tri).map(reindex_prop).collect()
            }
        };
        let mut tri_properties = vec![[0usize; 3]; total_tri];
        for (tri, new_tris) in prop_patches.iter().enumerate() {
            tri_properties[tri_offset[tri]..tri_offset[tri] + new_tris.len()]
                .copy_from_slice(new_tris);
        }

        mesh.relation.properties = prop;
        mesh.relation.tri_properties = tri_properties;
    }

    mesh.relation.tri_ref = tri_ref;
    rebuild_halfedges(mesh, &tri_verts);

    vert_bary
}

/// Refine the mesh by subdividing each edge per `edge_divisions`,
/// projecting new verts through the smoothed surface when tangents are
/// present.
///
/// Tangents are consumed: the refined mesh is left without them, with
/// fresh normals and, when the surface was warped, fresh original face
/// IDs.
pub fn refine<F>(mesh: &mut TriMesh, edge_divisions: F)
where
    F: Fn(Vector3<f64>) -> usize + Sync,
{
    refine_with_progress(mesh, edge_divisions, &Progress::none());
}

/// [`refine`] with staged progress reporting.
pub fn refine_with_progress<F>(mesh: &mut TriMesh, edge_divisions: F, progress: &Progress)
where
    F: Fn(Vector3<f64>) -> usize + Sync,
{
    if mesh.is_empty() {
        return;
    }
    progress.report(0, 3, "Subdividing");
    let old = mesh.clone();
    let vert_bary = subdivide(mesh, edge_divisions);
    if vert_bary.is_empty() {
        return;
    }

    if old.halfedge_tangent.len() == old.halfedges.len() {
        progress.report(1, 3, "Evaluating patches");
        let new_pos: Vec<Point3<f64>> = if run_parallel(vert_bary.len()) {
            vert_bary
                .par_iter()
                .map(|bary| interp_tri(&old, bary))
                .collect()
        } else {
            vert_bary.iter().map(|bary| interp_tri(&old, bary)).collect()
        };
        mesh.vert_pos = new_pos;

        // the warped sub-faces are no longer coplanar with their source
        // faces, so they become their own originals
        let mesh_id = reserve_mesh_id();
        for (tri, r) in mesh.relation.tri_ref.iter_mut().enumerate() {
            *r = TriRef { mesh_id, tri };
        }
    }

    progress.report(2, 3, "Recomputing normals");
    mesh.halfedge_tangent.clear();
    mesh.calculate_normals();
    progress.report(3, 3, "Refine");
}

/// Split every edge of the mesh into `n` pieces of equal length.
pub fn refine_uniform(mesh: &mut TriMesh, n: usize) {
    if n > 1 {
        refine(mesh, |_| n - 1);
    }
}

/// Split edges so that no piece is longer than `length`.
pub fn refine_to_length(mesh: &mut TriMesh, length: f64) {
    if !(length > 0.0) {
        return;
    }
    refine(mesh, move |edge| (edge.norm() / length) as usize);
}
