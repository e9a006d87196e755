pub mod kld;
pub mod loss_layer;
pub mod loss_param;
pub mod normalization;
pub mod registry;

pub use kld::KldLoss;
pub use loss_layer::{LossLayer, PropagateDown};
pub use loss_param::LossParameter;
pub use normalization::{resolve_normalizer, NormalizationMode};
