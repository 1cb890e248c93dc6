// =============================================================================
// Sorted Sample Sets
// =============================================================================
//
// Every bound in this crate works on order statistics, so samples are sorted
// once, up front. A `SortedSamples` holds m independent sample sets of size n
// as the rows of an (m, n) array, each row ascending.
//
// The caller's data is never touched: constructors copy before sorting.
//
// =============================================================================

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Result, ToleranceError};

/// m sample sets of size n, each sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedSamples {
    data: Array2<f64>,
}

impl SortedSamples {
    /// Copy and sort each row of `x`.
    pub fn from_rows(x: ArrayView2<f64>) -> Result<Self> {
        let (m, n) = x.dim();
        if m == 0 || n == 0 {
            return Err(ToleranceError::EmptyInput(format!(
                "sample matrix has shape ({m}, {n})"
            )));
        }

        let mut data = x.to_owned();
        for mut row in data.axis_iter_mut(Axis(0)) {
            let mut values = row.to_vec();
            values.sort_by(f64::total_cmp);
            for (slot, value) in row.iter_mut().zip(values) {
                *slot = value;
            }
        }
        Ok(Self { data })
    }

    /// A single sample set.
    pub fn from_slice(x: &[f64]) -> Result<Self> {
        let view = ArrayView2::from_shape((1, x.len()), x)
            .map_err(|e| ToleranceError::DimensionMismatch(e.to_string()))?;
        Self::from_rows(view)
    }

    /// Number of sample sets (m).
    pub fn n_sets(&self) -> usize {
        self.data.nrows()
    }

    /// Size of each sample set (n).
    pub fn sample_size(&self) -> usize {
        self.data.ncols()
    }

    /// The j-th order statistic of every set.
    pub fn column(&self, j: usize) -> ArrayView1<'_, f64> {
        self.data.column(j)
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Per-row mean and standard deviation (ddof = 1).
    pub fn mean_and_std(&self) -> (Array1<f64>, Array1<f64>) {
        let means = self.data.map_axis(Axis(1), |row| row.sum() / row.len() as f64);
        let stds = self.data.map_axis(Axis(1), |row| row.std(1.0));
        (means, stds)
    }

    /// Natural log of every value. Order is preserved, so rows stay sorted.
    pub fn ln(&self) -> Self {
        Self {
            data: self.data.mapv(f64::ln),
        }
    }
}
