use crate::error::Result;
use crate::math::blob::Blob;

/// Which bottom blobs the host wants gradients for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagateDown {
    pub predictions: bool,
    pub targets: bool,
}

impl PropagateDown {
    /// Gradient for the predictions only; the usual request.
    pub const PREDICTIONS: PropagateDown = PropagateDown { predictions: true, targets: false };
}

impl Default for PropagateDown {
    fn default() -> Self {
        PropagateDown::PREDICTIONS
    }
}

/// A layer that reduces a (predictions, targets) pair to a scalar loss.
///
/// Hosts call `reshape` whenever the input shapes may have changed, then
/// `forward` and `backward` once per training step. Implementations hold no
/// state between calls other than what `reshape` binds.
pub trait LossLayer: Send + Sync {
    /// Registered type name, e.g. `"KLDLoss"`.
    fn layer_type(&self) -> &'static str;

    /// Upstream gradient to use when this layer is the terminal loss.
    fn loss_weight(&self) -> f64;

    /// Validates the two input shapes and binds the sizes the normalizer needs.
    fn reshape(&mut self, predictions: &Blob, targets: &Blob) -> Result<()>;

    /// Computes the scalar loss.
    fn forward(&self, predictions: &Blob, targets: &Blob) -> Result<f64>;

    /// Writes the gradient of `top_diff * loss` into the gradient buffer of `predictions`.
    fn backward(
        &self,
        top_diff: f64,
        propagate_down: PropagateDown,
        predictions: &mut Blob,
        targets: &Blob,
    ) -> Result<()>;
}
