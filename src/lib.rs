pub mod error;
pub mod math;
pub mod loss;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::blob::Blob;
pub use loss::kld::KldLoss;
pub use loss::loss_layer::{LossLayer, PropagateDown};
pub use loss::loss_param::LossParameter;
pub use loss::normalization::{resolve_normalizer, NormalizationMode};
pub use loss::registry::create_layer;
