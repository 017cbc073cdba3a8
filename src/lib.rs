//! # Strudel
//!
//! Curved-surface refinement for closed manifold triangle meshes.
//!
//! Strudel takes a triangle mesh with half-edge topology and refines it
//! onto a smooth surface: per-corner normals mark which edges stay sharp,
//! weighted cubic Bézier tangents bend each edge into a circular arc, and a
//! cached topological partition subdivides every triangle before the new
//! vertices are projected through a rational Bézier patch.
//!
//! ## Features
//!
//! - **Flat half-edge structure**: triangle `t` owns half-edges
//!   `3t..3t + 3`, so traversal is plain index arithmetic
//! - **Sharpness-aware normals**: per-corner property normals, unshared
//!   across edges bent beyond a threshold
//! - **Circular Bézier tangents**: smooth edges become circular arcs, with
//!   per-edge smoothness control for creases
//! - **Cached subdivision**: the sub-triangulation of a triangle depends
//!   only on its three edge-division counts and is memoized process-wide
//! - **Data-parallel passes**: large meshes refine across threads via
//!   rayon
//!
//! ## Quick Start
//!
//! ```
//! use strudel::prelude::*;
//! use nalgebra::Point3;
//!
//! // an octahedron with unit vertices
//! let vertices = vec![
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(-1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, -1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(0.0, 0.0, -1.0),
//! ];
//! let faces = vec![
//!     [0, 2, 4], [2, 1, 4], [1, 3, 4], [3, 0, 4],
//!     [2, 0, 5], [1, 2, 5], [3, 1, 5], [0, 3, 5],
//! ];
//! let mut mesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! // smooth tangents from vertex normals, then refine onto the surface
//! create_tangents(&mut mesh, Vec::new());
//! refine_uniform(&mut mesh, 4);
//!
//! assert_eq!(mesh.num_tri(), 8 * 16);
//! assert!(mesh.is_valid());
//! ```
//!
//! ## Sharp Edges
//!
//! Creases survive smoothing either through per-corner normals
//! ([`set_normals`](algo::smooth::set_normals) followed by
//! [`create_tangents_from_normals`](algo::smooth::create_tangents_from_normals))
//! or by listing edges explicitly:
//!
//! ```
//! use strudel::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(-1.0, 0.0, 0.0),
//! #     Point3::new(0.0, 1.0, 0.0),
//! #     Point3::new(0.0, -1.0, 0.0),
//! #     Point3::new(0.0, 0.0, 1.0),
//! #     Point3::new(0.0, 0.0, -1.0),
//! # ];
//! # let faces = vec![
//! #     [0, 2, 4], [2, 1, 4], [1, 3, 4], [3, 0, 4],
//! #     [2, 0, 5], [1, 2, 5], [3, 1, 5], [0, 3, 5],
//! # ];
//! let mut mesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! // keep one edge fully sharp, smooth everything else
//! create_tangents(
//!     &mut mesh,
//!     vec![Smoothness { halfedge: 0, smoothness: 0.0 }],
//! );
//! refine_uniform(&mut mesh, 3);
//! assert!(mesh.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// ```
/// use strudel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::refine::{
        refine, refine_to_length, refine_uniform, refine_with_progress, subdivide,
    };
    pub use crate::algo::smooth::{
        create_tangents, create_tangents_from_normals, set_normals, sharpen_edges, smooth_out,
        Smoothness,
    };
    pub use crate::algo::Progress;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_triangles, next_halfedge, to_face_vertex, Barycentric, Halfedge,
        MeshRelation, TriMesh, TriRef,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
