//! Error types for strudel.
//!
//! Construction of a mesh can fail; the refinement algorithms themselves do
//! not return errors. Refining an empty mesh is a silent no-op, and internal
//! partitioning invariants are enforced with assertions.

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while building a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// An edge is not shared by exactly two oppositely oriented faces.
    ///
    /// The refinement algorithms walk complete vertex fans, so every edge
    /// must be interior: open boundaries and over-shared edges are rejected.
    #[error("edge ({v0}, {v1}) is not shared by exactly two faces")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },
}
