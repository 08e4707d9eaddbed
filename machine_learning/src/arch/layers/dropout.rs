use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Inverted dropout: during training each activation is zeroed with probability `rate` and the
/// survivors are scaled by `1 / (1 - rate)`, at inference it is the identity.
#[derive(Debug, Clone)]
pub struct Dropout {
    rate: f32,
    rng: StdRng,
    mask: Array2<f32>,
}

impl Dropout {
    /// Creates a new `Dropout` layer.
    ///
    /// # Arguments
    /// * `rate` - The probability of dropping each activation, in `[0, 1]`.
    /// * `seed` - Seeds the mask generator so runs are reproducible.
    pub fn new(rate: f32, seed: u64) -> Self {
        Self {
            rate,
            rng: StdRng::seed_from_u64(seed),
            mask: Array2::zeros((0, 0)),
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let keep = 1. - self.rate;
        let rng = &mut self.rng;

        self.mask = if self.rate <= 0. {
            Array2::ones(x.raw_dim())
        } else if keep <= 0. {
            Array2::zeros(x.raw_dim())
        } else {
            let scale = 1. / keep;
            Array2::from_shape_fn(x.raw_dim(), |_| {
                if rng.random::<f32>() < keep { scale } else { 0. }
            })
        };

        &x * &self.mask
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Array2<f32> {
        d * &self.mask
    }

    pub fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.to_owned()
    }
}
