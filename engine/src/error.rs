use std::path::PathBuf;

/// Errors reported by the viewer core.
///
/// Interactive operations never fail; they fall back and log instead.
/// These variants surface only from explicit `try_*` lookups and persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node `{path}` not found in hierarchy")]
    NodeNotFound { path: String },

    #[error("Bounding volume is empty or invalid")]
    DegenerateBounds,

    #[error("No symmetrical counterpart found for `{path}`")]
    SymmetryPairNotFound { path: String },

    #[error("Failed to access `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode RON document: {source}")]
    Decode {
        #[from]
        source: ron::error::SpannedError,
    },

    #[error("Failed to encode RON document: {source}")]
    Encode {
        #[from]
        source: ron::Error,
    },
}
