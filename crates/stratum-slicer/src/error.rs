//! Error types for the slicer.

use stratum_mesh::MeshError;
use thiserror::Error;

/// Errors that can occur during slicing and print organization.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Mesh has degenerate geometry.
    #[error("mesh has degenerate geometry: {0}")]
    DegenerateMesh(String),

    /// Invalid settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A string option did not name a known variant.
    #[error("unknown {kind} '{value}'")]
    UnknownOption {
        /// Which option was being parsed.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A parameter required by the selected mode was not supplied.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// A per-item list does not have one entry per item.
    #[error("{what}: expected {expected} values, got {got}")]
    CountMismatch {
        /// What the list describes.
        what: &'static str,
        /// Required number of entries.
        expected: usize,
        /// Supplied number of entries.
        got: usize,
    },

    /// An optional collaborator is not available.
    #[error("{0} is not installed")]
    NotInstalled(String),

    /// The requested feature path has no implementation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A printpoint reached the output boundary without a required attribute.
    #[error("printpoint {index} of layer {layer} path {path} has no {attribute}")]
    IncompleteAttributes {
        /// Layer index.
        layer: usize,
        /// Path index within the layer.
        path: usize,
        /// Point index within the path.
        index: usize,
        /// Name of the missing attribute.
        attribute: &'static str,
    },

    /// Mesh construction or attribute error.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Settings file could not be parsed.
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    /// Interchange document could not be read or written.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
