//! Curved patch evaluation over an original triangle.
//!
//! The smoothed surface over a triangle is a rational cubic Bézier patch
//! built from the half-edge tangents: for each corner, a cubic along the
//! opposite edge provides an endpoint and tangent frame, a second cubic
//! runs from that endpoint to the corner, and the three corner
//! contributions blend in homogeneous coordinates. All mixing keeps the
//! rational weights; the division happens once at the end.

use nalgebra::{Point3, Vector3, Vector4};

use crate::algo::{mix, orthogonal_to, safe_normalize, xyz};
use crate::mesh::{Barycentric, TriMesh};

fn homogeneous(v: Vector4<f64>) -> Vector4<f64> {
    Vector4::new(v.x * v.w, v.y * v.w, v.z * v.w, v.w)
}

fn homogeneous_point(p: Vector3<f64>) -> Vector4<f64> {
    Vector4::new(p.x, p.y, p.z, 1.0)
}

fn h_normalize(v: Vector4<f64>) -> Vector3<f64> {
    xyz(v) / v.w
}

/// Control point one tangent step away from `point`.
fn bezier(point: Vector3<f64>, tangent: Vector4<f64>) -> Vector4<f64> {
    homogeneous(Vector4::new(point.x, point.y, point.z, 0.0) + tangent)
}

/// One de Casteljau step: reduce a homogeneous cubic to the linear segment
/// at parameter `x`.
fn cubic_bezier_to_linear(
    p0: Vector4<f64>,
    p1: Vector4<f64>,
    p2: Vector4<f64>,
    p3: Vector4<f64>,
    x: f64,
) -> [Vector4<f64>; 2] {
    let p12 = p1.lerp(&p2, x);
    [
        p0.lerp(&p1, x).lerp(&p12, x),
        p12.lerp(&p2.lerp(&p3, x), x),
    ]
}

fn bezier_point(points: [Vector4<f64>; 2], x: f64) -> Vector3<f64> {
    h_normalize(points[0].lerp(&points[1], x))
}

fn bezier_tangent(points: [Vector4<f64>; 2]) -> Vector3<f64> {
    (h_normalize(points[1]) - h_normalize(points[0])).normalize()
}

/// Map a barycentric coordinate within an original triangle to a position
/// on the smoothed surface.
///
/// `mesh` must be the snapshot taken before subdivision, with tangents
/// present; corners reproduce exactly.
pub fn interp_tri(mesh: &TriMesh, bary: &Barycentric) -> Point3<f64> {
    let tri = bary.tri;
    let uvw = bary.uvw;

    let corners = [
        mesh.vert_pos[mesh.halfedges[3 * tri].start_vert].coords,
        mesh.vert_pos[mesh.halfedges[3 * tri + 1].start_vert].coords,
        mesh.vert_pos[mesh.halfedges[3 * tri + 2].start_vert].coords,
    ];
    for i in 0..3 {
        if uvw[i] == 1.0 {
            return Point3::from(corners[i]);
        }
    }

    let tangent_r = [
        mesh.halfedge_tangent[3 * tri],
        mesh.halfedge_tangent[3 * tri + 1],
        mesh.halfedge_tangent[3 * tri + 2],
    ];
    // the incoming tangent at each corner: the pair of the previous edge
    let tangent_l = [
        mesh.halfedge_tangent[mesh.halfedges[3 * tri + 2].paired_halfedge],
        mesh.halfedge_tangent[mesh.halfedges[3 * tri].paired_halfedge],
        mesh.halfedge_tangent[mesh.halfedges[3 * tri + 1].paired_halfedge],
    ];

    let mut pos_h = Vector4::zeros();
    for i in 0..3 {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;
        let x = uvw[k] / (1.0 - uvw[i]);

        // the opposite edge's cubic gives the far endpoint and its frame
        let bez = cubic_bezier_to_linear(
            homogeneous_point(corners[j]),
            bezier(corners[j], tangent_r[j]),
            bezier(corners[k], tangent_l[k]),
            homogeneous_point(corners[k]),
            x,
        );
        let end = bezier_point(bez, x);
        let tangent = bezier_tangent(bez);

        let j_bitangent = safe_normalize(orthogonal_to(
            xyz(tangent_l[j]),
            safe_normalize(xyz(tangent_r[j])),
        ));
        let k_bitangent = safe_normalize(orthogonal_to(
            xyz(tangent_r[k]),
            -safe_normalize(xyz(tangent_l[k])),
        ));
        let normal = safe_normalize(j_bitangent.lerp(&k_bitangent, x).cross(&tangent));
        let delta = orthogonal_to(
            xyz(tangent_l[j]).lerp(&xyz(tangent_r[k]), x),
            normal,
        );
        let delta_w = mix(tangent_l[j].w, tangent_r[k].w, x);

        // second cubic from the edge point toward corner i
        let bez1 = cubic_bezier_to_linear(
            homogeneous_point(end),
            homogeneous(Vector4::new(
                end.x + delta.x,
                end.y + delta.y,
                end.z + delta.z,
                delta_w,
            )),
            bezier(corners[i], tangent_r[i].lerp(&tangent_l[i], x)),
            homogeneous_point(corners[i]),
            uvw[i],
        );
        let p = bezier_point(bez1, uvw[i]);
        let weight = uvw[j] * uvw[j] * uvw[k] * uvw[k];
        pos_h += homogeneous(Vector4::new(p.x, p.y, p.z, weight));
    }
    Point3::from(h_normalize(pos_h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::smooth::create_tangents;
    use crate::mesh::build_from_triangles;
    use approx::assert_relative_eq;

    fn octahedron() -> TriMesh {
        let vertices = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ];
        let faces = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_corners_reproduce_exactly() {
        let mut mesh = octahedron();
        create_tangents(&mut mesh, Vec::new());

        for tri in 0..mesh.num_tri() {
            for i in 0..3 {
                let mut uvw = nalgebra::Vector3::zeros();
                uvw[i] = 1.0;
                let p = interp_tri(&mesh, &Barycentric { tri, uvw });
                let corner = mesh.vert_pos[mesh.halfedges[3 * tri + i].start_vert];
                assert_eq!(p, corner);
            }
        }
    }

    #[test]
    fn test_edge_midpoints_land_on_the_sphere() {
        let mut mesh = octahedron();
        create_tangents(&mut mesh, Vec::new());

        // circular tangents between unit verts trace great-circle arcs
        for tri in 0..mesh.num_tri() {
            for i in 0..3 {
                let mut uvw = nalgebra::Vector3::zeros();
                uvw[i] = 0.5;
                uvw[(i + 1) % 3] = 0.5;
                let p = interp_tri(&mesh, &Barycentric { tri, uvw });
                assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_interior_bulges_toward_the_sphere() {
        let mut mesh = octahedron();
        create_tangents(&mut mesh, Vec::new());

        let center = interp_tri(
            &mesh,
            &Barycentric {
                tri: 0,
                uvw: nalgebra::Vector3::new(1.0, 1.0, 1.0) / 3.0,
            },
        );
        let flat_norm = 1.0 / f64::sqrt(3.0);
        assert!(center.coords.norm() > flat_norm + 0.05);
        assert!(center.coords.norm() < 1.02);
    }

    #[test]
    fn test_zero_tangents_keep_faces_flat() {
        let mut mesh = octahedron();
        // all tangents zero: the patch degenerates to the flat triangle
        mesh.halfedge_tangent = vec![nalgebra::Vector4::zeros(); mesh.num_halfedge()];

        let normal = mesh.face_normal[0];
        let offset = normal.dot(&mesh.vert_pos[mesh.halfedges[0].start_vert].coords);
        for (u, v) in [(0.5, 0.5), (0.3, 0.3), (0.2, 0.7), (1.0 / 3.0, 1.0 / 3.0)] {
            let uvw = nalgebra::Vector3::new(u, v, 1.0 - u - v);
            let p = interp_tri(&mesh, &Barycentric { tri: 0, uvw });
            assert_relative_eq!(normal.dot(&p.coords), offset, epsilon = 1e-9);
        }
    }
}
