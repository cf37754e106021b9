//! Error types for mesh loading

use std::path::PathBuf;

use thiserror::Error;

/// Which per-attribute list a face index points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Vertex,
    Normal,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Vertex => f.write_str("vertex"),
            IndexKind::Normal => f.write_str("normal"),
        }
    }
}

/// Errors that can occur while loading and building a mesh
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("could not open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("unsupported mesh format: {} (expected .obj)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: face has {corners} corners, only triangles are supported")]
    NonTriangularFace { line: usize, corners: usize },

    #[error("face {face}: {kind} index {index} out of range ({len} defined)")]
    IndexOutOfRange {
        face: usize,
        kind: IndexKind,
        index: usize,
        len: usize,
    },

    #[error("mesh has no {0}")]
    EmptyMesh(&'static str),

    #[error("degenerate geometry: bounding span is {span}")]
    DegenerateGeometry { span: f32 },
}

/// Result type alias for mesh operations
pub type Result<T> = std::result::Result<T, MeshError>;
