use rand::prelude::*;
use serde::{Serialize, Deserialize};

/// An N-d buffer of `f64` with a parallel gradient buffer.
///
/// `data` holds the values read by the forward pass; `diff` receives the
/// gradient written by the backward pass. Both always have `count()` elements:
/// the buffers are only reachable through fixed-length slices, and
/// `set_data` / deserialization reject lengths that disagree with the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlobRepr")]
pub struct Blob {
    shape: Vec<usize>,
    data: Vec<f64>,
    diff: Vec<f64>,
}

#[derive(Deserialize)]
struct BlobRepr {
    shape: Vec<usize>,
    data: Vec<f64>,
    #[serde(default)]
    diff: Option<Vec<f64>>,
}

impl TryFrom<BlobRepr> for Blob {
    type Error = String;

    fn try_from(repr: BlobRepr) -> Result<Self, Self::Error> {
        let count: usize = repr.shape.iter().product();
        let diff = repr.diff.unwrap_or_else(|| vec![0.0; count]);
        if repr.data.len() != count || diff.len() != count {
            return Err(format!(
                "blob of shape {:?} needs {} values, got data {} and diff {}",
                repr.shape, count, repr.data.len(), diff.len()
            ));
        }
        Ok(Blob { shape: repr.shape, data: repr.data, diff })
    }
}

impl Blob {
    pub fn zeros(shape: &[usize]) -> Blob {
        let count = shape.iter().product();
        Blob {
            shape: shape.to_vec(),
            data: vec![0.0; count],
            diff: vec![0.0; count],
        }
    }

    /// Wraps `data` in a blob of the given shape.
    /// Returns `None` when `data.len()` is not the product of `shape`.
    pub fn from_data(shape: &[usize], data: Vec<f64>) -> Option<Blob> {
        let count: usize = shape.iter().product();
        if data.len() != count {
            return None;
        }
        Some(Blob {
            shape: shape.to_vec(),
            data,
            diff: vec![0.0; count],
        })
    }

    /// A batch of `outer` random distributions over `inner` outcomes.
    ///
    /// Each row is a softmax of uniform samples in [-scale, scale], so every
    /// entry is strictly positive and each row sums to 1.
    pub fn random_distribution(outer: usize, inner: usize, scale: f64) -> Blob {
        let mut rng = rand::thread_rng();
        let mut res = Blob::zeros(&[outer, inner]);
        for row in res.data.chunks_mut(inner.max(1)) {
            for v in row.iter_mut() {
                *v = (rng.gen::<f64>() * 2.0 - 1.0) * scale;
            }
            // Shift by the max before exp for stability.
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for v in row.iter_mut() {
                *v = (*v - max).exp();
                sum += *v;
            }
            for v in row.iter_mut() {
                *v /= sum;
            }
        }
        res
    }

    /// A batch of one-hot rows; `labels[i]` is the hot index of row i.
    /// Labels outside `0..inner` leave their row all zero.
    pub fn one_hot(labels: &[usize], inner: usize) -> Blob {
        let mut res = Blob::zeros(&[labels.len(), inner]);
        for (row, &label) in res.data.chunks_mut(inner.max(1)).zip(labels) {
            if let Some(v) = row.get_mut(label) {
                *v = 1.0;
            }
        }
        res
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn diff(&self) -> &[f64] {
        &self.diff
    }

    pub fn diff_mut(&mut self) -> &mut [f64] {
        &mut self.diff
    }

    /// Values for reading alongside the gradient buffer for writing.
    pub fn data_and_diff_mut(&mut self) -> (&[f64], &mut [f64]) {
        (&self.data, &mut self.diff)
    }

    /// Replaces the values, keeping the shape.
    /// Returns `false` and leaves the blob untouched if `data` has the wrong length.
    pub fn set_data(&mut self, data: Vec<f64>) -> bool {
        if data.len() != self.count() {
            return false;
        }
        self.data = data;
        true
    }

    /// Consumes the blob, returning its gradient buffer.
    pub fn into_diff(self) -> Vec<f64> {
        self.diff
    }

    /// Size of one axis; `None` if the blob has fewer axes.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.shape.get(axis).copied()
    }

    /// Total number of elements.
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Product of the dimensions from `start_axis` to the last axis.
    /// An empty range (start past the last axis) yields 1.
    pub fn count_from(&self, start_axis: usize) -> usize {
        self.shape.iter().skip(start_axis).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_from_splits_outer_and_inner() {
        let blob = Blob::zeros(&[4, 2, 5]);
        assert_eq!(blob.count(), 40);
        assert_eq!(blob.dim(0), Some(4));
        assert_eq!(blob.count_from(1), 10);
        assert_eq!(blob.count_from(3), 1);
        assert_eq!(blob.dim(3), None);
    }

    #[test]
    fn from_data_rejects_wrong_length() {
        assert!(Blob::from_data(&[2, 3], vec![0.0; 5]).is_none());
        let blob = Blob::from_data(&[2, 3], vec![1.0; 6]).unwrap();
        assert_eq!(blob.diff(), &[0.0; 6]);
    }

    #[test]
    fn random_distribution_rows_sum_to_one() {
        let blob = Blob::random_distribution(3, 7, 4.0);
        for row in blob.data().chunks(7) {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "row sums to {sum}");
            assert!(row.iter().all(|&p| p > 0.0));
        }
    }

    #[test]
    fn set_data_keeps_length_in_step_with_shape() {
        let mut blob = Blob::zeros(&[1, 2]);
        assert!(!blob.set_data(vec![0.5]));
        assert_eq!(blob.data(), &[0.0, 0.0]);
        assert!(blob.set_data(vec![0.5, 0.5]));
        assert_eq!(blob.data(), &[0.5, 0.5]);
        assert_eq!(blob.diff_mut().len(), 2);
    }

    #[test]
    fn deserialize_rejects_buffers_that_disagree_with_shape() {
        let ok: Blob = serde_json::from_str(r#"{"shape":[1,2],"data":[0.7,0.3]}"#).unwrap();
        assert_eq!(ok.diff(), &[0.0, 0.0]);
        let short_diff = r#"{"shape":[1,2],"data":[0.7,0.3],"diff":[0.0]}"#;
        assert!(serde_json::from_str::<Blob>(short_diff).is_err());
        let short_data = r#"{"shape":[2,2],"data":[0.7,0.3]}"#;
        assert!(serde_json::from_str::<Blob>(short_data).is_err());
    }

    #[test]
    fn one_hot_sets_single_entry_per_row() {
        let blob = Blob::one_hot(&[2, 0], 3);
        assert_eq!(blob.shape(), &[2, 3]);
        assert_eq!(blob.data(), &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }
}
