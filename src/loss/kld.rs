use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::loss::loss_layer::{LossLayer, PropagateDown};
use crate::loss::loss_param::LossParameter;
use crate::loss::normalization::{resolve_normalizer, NormalizationMode};
use crate::math::blob::Blob;

/// Smallest positive normal `f64`; both operands of the log are clamped to it
/// so that zero probabilities never produce `-inf`.
pub const PROB_FLOOR: f64 = f64::MIN_POSITIVE;

/// Kullback-Leibler divergence loss between a predicted distribution and a
/// target distribution:
///
///   L = -Σ q·(ln p − ln q) / normalizer  =  Σ q·ln(q/p) / normalizer
///
/// `predictions` must already be probabilities (e.g. softmax output); no
/// softmax is applied here. The gradient w.r.t. the predictions is
/// `(p − q) / normalizer`, the combined softmax + cross-entropy gradient.
/// The `ln q` term is constant in `p`, so it does not change the gradient.
#[derive(Debug, Clone)]
pub struct KldLoss {
    normalization: NormalizationMode,
    loss_weight: f64,
    outer_num: usize,
    inner_num: usize,
}

impl KldLoss {
    pub const TYPE: &'static str = "KLDLoss";

    /// Builds the layer and resolves its normalization mode once.
    pub fn new(param: &LossParameter) -> KldLoss {
        KldLoss {
            normalization: param.normalization_mode(),
            loss_weight: param.loss_weight,
            outer_num: 0,
            inner_num: 0,
        }
    }

    pub fn normalization(&self) -> NormalizationMode {
        self.normalization
    }

    pub fn outer_num(&self) -> usize {
        self.outer_num
    }

    pub fn inner_num(&self) -> usize {
        self.inner_num
    }

    /// Divisor for the bound shape. The valid count is always the element
    /// count, so `Valid` normalizes like `Full` here.
    pub fn normalizer(&self) -> f64 {
        let count = self.outer_num * self.inner_num;
        resolve_normalizer(self.normalization, count as f64, self.outer_num, self.inner_num)
    }

    /// Allocating wrapper around `backward` for hosts that do not keep a
    /// diff buffer: returns `∂(top_diff · L)/∂p`.
    pub fn gradient(&self, predictions: &Blob, targets: &Blob, top_diff: f64) -> Result<Vec<f64>> {
        let mut scratch = predictions.clone();
        self.backward(top_diff, PropagateDown::PREDICTIONS, &mut scratch, targets)?;
        Ok(scratch.into_diff())
    }

    /// Both blobs must still split into the `outer_num x inner_num` bound by
    /// `reshape`; equal element counts alone are not enough.
    fn check_bound(&self, predictions: &Blob, targets: &Blob) -> Result<()> {
        let matches_bound = |blob: &Blob| {
            blob.dim(0) == Some(self.outer_num) && blob.count_from(1) == self.inner_num
        };
        if !matches_bound(predictions) || !matches_bound(targets) {
            return Err(Error::ShapeMismatch {
                predictions: predictions.shape().to_vec(),
                targets: targets.shape().to_vec(),
                reason: "blobs do not match the shape bound by reshape",
            });
        }
        Ok(())
    }
}

impl LossLayer for KldLoss {
    fn layer_type(&self) -> &'static str {
        KldLoss::TYPE
    }

    fn loss_weight(&self) -> f64 {
        self.loss_weight
    }

    fn reshape(&mut self, predictions: &Blob, targets: &Blob) -> Result<()> {
        let mismatch = |reason| Error::ShapeMismatch {
            predictions: predictions.shape().to_vec(),
            targets: targets.shape().to_vec(),
            reason,
        };
        let (outer, target_outer) = match (predictions.dim(0), targets.dim(0)) {
            (Some(p), Some(t)) => (p, t),
            _ => return Err(mismatch("inputs need a leading batch axis")),
        };
        if outer != target_outer {
            return Err(mismatch("inputs must have the same first dimension"));
        }
        if predictions.count() != targets.count() {
            return Err(mismatch("inputs must have the same size"));
        }

        self.outer_num = outer;
        self.inner_num = predictions.count_from(1);
        debug!(
            outer_num = self.outer_num,
            inner_num = self.inner_num,
            normalization = %self.normalization,
            "bound KLDLoss shape"
        );
        Ok(())
    }

    fn forward(&self, predictions: &Blob, targets: &Blob) -> Result<f64> {
        self.check_bound(predictions, targets)?;

        // ln(p) − ln(q), both floor-clamped.
        let log_ratio: Vec<f64> = predictions.data().iter().zip(targets.data())
            .map(|(&p, &q)| p.max(PROB_FLOOR).ln() - q.max(PROB_FLOOR).ln())
            .collect();
        let raw: f64 = log_ratio.iter().zip(targets.data())
            .map(|(r, q)| r * q)
            .sum();

        let normalizer = self.normalizer();
        let loss = -raw / normalizer;
        trace!(loss, normalizer, "KLDLoss forward");
        Ok(loss)
    }

    fn backward(
        &self,
        top_diff: f64,
        propagate_down: PropagateDown,
        predictions: &mut Blob,
        targets: &Blob,
    ) -> Result<()> {
        if propagate_down.targets {
            return Err(Error::UnsupportedGradient { layer: KldLoss::TYPE });
        }
        if !propagate_down.predictions {
            return Ok(());
        }
        self.check_bound(predictions, targets)?;

        let scale = top_diff / self.normalizer();
        let (data, diff) = predictions.data_and_diff_mut();
        for ((d, &p), &q) in diff.iter_mut().zip(data).zip(targets.data()) {
            *d = (p - q) * scale;
        }
        trace!(scale, "KLDLoss backward");
        Ok(())
    }
}
