//! Core mesh data structures.
//!
//! The primary type is [`TriMesh`], a closed manifold triangle mesh in a
//! flat half-edge layout: triangle `t` owns half-edges `3t..3t + 3` and
//! every half-edge knows its oppositely oriented pair. Alongside the
//! topology, a mesh carries per-face provenance ([`TriRef`]) and an
//! optional property-vertex space ([`MeshRelation`]) so corners can hold
//! values (such as normals) that break across seams.
//!
//! # Construction
//!
//! ```
//! use strudel::mesh::build_from_triangles;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//! let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//!
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert!(mesh.is_valid());
//! ```

mod builder;
mod halfedge;
mod relation;

pub use builder::{build_from_triangles, to_face_vertex};
pub use halfedge::{next_halfedge, Halfedge, TriMesh};
pub use relation::{reserve_mesh_id, Barycentric, MeshRelation, TriRef};

pub(crate) use builder::{collect_edges, rebuild_halfedges, TmpEdge};
pub(crate) use halfedge::TOLERANCE;
pub(crate) use relation::UNSET;
