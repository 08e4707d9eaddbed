use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{MlErr, Result};

/// Samples `limit` weights using Xavier (Glorot) uniform initialization.
///
/// # Arguments
/// * `rng` - The random number generator.
/// * `fan_in` - The number of input units in the weight tensor.
/// * `fan_out` - The number of output units in the weight tensor.
/// * `limit` - The amount of weights to generate.
///
/// # Returns
/// The weights, or an error if the calculated range is invalid.
pub fn xavier_uniform<R: Rng>(
    rng: &mut R,
    fan_in: usize,
    fan_out: usize,
    limit: usize,
) -> Result<Vec<f32>> {
    let range = (6. / (fan_in + fan_out) as f32).sqrt();
    uniform(rng, -range, range, limit)
}

/// Samples `limit` values uniformly from `[low, high)`.
///
/// # Returns
/// An error if the range is invalid (low >= high or not finite).
pub fn uniform<R: Rng>(rng: &mut R, low: f32, high: f32, limit: usize) -> Result<Vec<f32>> {
    let distribution = Uniform::new(low, high).map_err(|_| MlErr::InvalidHyperparameter {
        name: "initialization range",
        reason: "low must be lower than high and both finite",
    })?;

    Ok(distribution.sample_iter(rng).take(limit).collect())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_xavier_stays_within_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let weights = xavier_uniform(&mut rng, 4, 2, 100).unwrap();
        let range = (6f32 / 6.).sqrt();

        assert_eq!(weights.len(), 100);
        assert!(weights.iter().all(|w| (-range..range).contains(w)));
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = xavier_uniform(&mut StdRng::seed_from_u64(42), 3, 3, 9).unwrap();
        let b = xavier_uniform(&mut StdRng::seed_from_u64(42), 3, 3, 9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_range() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(uniform(&mut rng, 1., 1., 3).is_err());
    }
}
