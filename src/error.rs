//! Error types for the KL-divergence loss layer.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure here is a structural or configuration problem; none is
/// recovered inside the layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Prediction and target blobs cannot be bound together.
    #[error("shape mismatch: predictions {predictions:?} vs targets {targets:?} ({reason})")]
    ShapeMismatch {
        predictions: Vec<usize>,
        targets: Vec<usize>,
        reason: &'static str,
    },

    /// The caller asked for a gradient with respect to the target distribution.
    #[error("{layer} layer cannot backpropagate to target distribution")]
    UnsupportedGradient { layer: &'static str },

    /// A normalization mode name or id that does not map to a known variant.
    #[error("unknown normalization mode: {0}")]
    UnknownNormalizationMode(String),

    /// No layer is registered under this type name.
    #[error("unknown layer type: {0}")]
    UnknownLayerType(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
