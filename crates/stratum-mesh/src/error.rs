//! Error types for mesh construction and attribute handling.

use thiserror::Error;

/// Errors that can occur while building or annotating a mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// The mesh has no vertices or no faces.
    #[error("mesh is empty")]
    Empty,

    /// A flat buffer does not divide into whole triples.
    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index}, but the mesh has {count} vertices")]
    IndexOutOfRange {
        /// Face index.
        face: usize,
        /// Offending vertex index.
        index: usize,
        /// Number of vertices in the mesh.
        count: usize,
    },

    /// A face uses the same vertex more than once.
    #[error("face {0} is degenerate (repeated vertex)")]
    DegenerateFace(usize),

    /// An attribute column does not have one value per element.
    #[error("attribute '{name}' has {got} values, expected {expected}")]
    AttributeLength {
        /// Attribute name.
        name: String,
        /// Required number of values.
        expected: usize,
        /// Supplied number of values.
        got: usize,
    },
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
