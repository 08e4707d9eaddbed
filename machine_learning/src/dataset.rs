use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis, s};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A supervised dataset stored row major: every row holds `x_size` inputs followed by `y_size`
/// expected outputs.
#[derive(Debug, Clone)]
pub struct Dataset {
    x_size: usize,
    y_size: usize,
    rows: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `data` - The flat rows of the dataset.
    /// * `x_size` - The amount of inputs per row.
    /// * `y_size` - The amount of outputs per row.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `data` can't be split into whole rows.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        let cols = x_size + y_size;

        if cols == 0 || data.len() % cols != 0 {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: data.len(),
                expected: cols,
            });
        }

        let len = data.len() / cols;
        let rows = Array2::from_shape_vec((len, cols), data).map_err(|_| MlErr::SizeMismatch {
            what: "dataset rows",
            got: len,
            expected: cols,
        })?;

        Ok(Self {
            x_size,
            y_size,
            rows,
        })
    }

    /// Returns the amount of rows in the dataset.
    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    /// A view over the inputs of every row.
    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.rows.slice(s![.., ..self.x_size])
    }

    /// A view over the expected outputs of every row.
    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.rows.slice(s![.., self.x_size..])
    }

    /// Randomly permutes the rows of the dataset.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.rows = self.rows.select(Axis(0), &order);
    }

    /// Splits the dataset into consecutive batches of at most `batch_size` rows.
    ///
    /// # Returns
    /// An iterator of `(x, y)` views.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let x_size = self.x_size;

        self.rows
            .axis_chunks_iter(Axis(0), batch_size.get())
            .map(move |batch| batch.split_at(Axis(1), x_size))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn rows(n: usize) -> Vec<f32> {
        (0..n).flat_map(|i| [i as f32, 10. * i as f32]).collect()
    }

    #[test]
    fn test_rejects_partial_rows() {
        assert!(Dataset::new(vec![1., 2., 3.], 1, 1).is_err());
    }

    #[test]
    fn test_batches_cover_every_row() {
        let dataset = Dataset::new(rows(5), 1, 1).unwrap();
        let sizes: Vec<usize> = dataset
            .batches(NonZeroUsize::new(2).unwrap())
            .map(|(x, y)| {
                assert_eq!(x.nrows(), y.nrows());
                x.nrows()
            })
            .collect();

        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_shuffle_keeps_inputs_paired_with_outputs() {
        let mut dataset = Dataset::new(rows(32), 1, 1).unwrap();
        dataset.shuffle(&mut StdRng::seed_from_u64(7));

        for (x, y) in dataset.x().iter().zip(dataset.y().iter()) {
            assert_eq!(*y, 10. * x);
        }

        let mut xs: Vec<f32> = dataset.x().iter().copied().collect();
        xs.sort_by(f32::total_cmp);
        assert_eq!(xs, (0..32).map(|i| i as f32).collect::<Vec<_>>());
    }
}
