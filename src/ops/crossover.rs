//! Recombination of two parent designs.

use crate::core::{DesignBounds, Genes};
use crate::ops::{check_distribution_index, random_unit, OperatorError};
use rand::RngCore;

/// Produces two children by mixing the genes of two parents.
///
/// Children may leave the design box; the engine clamps them afterwards.
///
/// # Examples
/// ```
/// use blade_mdo::ops::CrossoverOperator;
/// use blade_mdo::Genes;
///
/// struct Swap;
///
/// impl CrossoverOperator for Swap {
///     fn crossover(&self, a: &Genes, b: &Genes, _rng: &mut dyn rand::RngCore) -> (Genes, Genes) {
///         (*b, *a)
///     }
/// }
///
/// let (left, right) = Swap.crossover(&[20.0, 1.0, 0.0], &[50.0, 5.0, 20.0], &mut rand::thread_rng());
/// assert_eq!(left, [50.0, 5.0, 20.0]);
/// assert_eq!(right, [20.0, 1.0, 0.0]);
/// ```
pub trait CrossoverOperator: Send + Sync {
    /// Recombines two parents.
    fn crossover(&self, parent_a: &Genes, parent_b: &Genes, rng: &mut dyn RngCore)
        -> (Genes, Genes);
}

impl<T: CrossoverOperator + ?Sized> CrossoverOperator for Box<T> {
    fn crossover(
        &self,
        parent_a: &Genes,
        parent_b: &Genes,
        rng: &mut dyn RngCore,
    ) -> (Genes, Genes) {
        (**self).crossover(parent_a, parent_b, rng)
    }
}

/// Simulated binary crossover (Deb & Agrawal) applied gene by gene.
///
/// Genes on which both parents agree are copied unchanged, so degenerate
/// dimensions never drift.
#[derive(Debug, Clone)]
pub struct SimulatedBinaryCrossover {
    distribution_index: f64,
}

impl SimulatedBinaryCrossover {
    /// Creates an SBX operator with distribution index `eta`.
    ///
    /// # Errors
    /// Returns [`OperatorError::InvalidDistributionIndex`] when `eta` is not
    /// a positive finite number.
    pub fn new(eta: f64) -> Result<Self, OperatorError> {
        Ok(Self {
            distribution_index: check_distribution_index("sbx", eta)?,
        })
    }

    /// Distribution index of the operator.
    #[must_use]
    pub fn distribution_index(&self) -> f64 {
        self.distribution_index
    }

    fn spread_factor(&self, rng: &mut dyn RngCore) -> f64 {
        let exponent = 1.0 / (self.distribution_index + 1.0);
        let u = random_unit(rng);
        if u <= 0.5 {
            (2.0 * u).powf(exponent)
        } else {
            (1.0 / (2.0 * (1.0 - u))).powf(exponent)
        }
    }
}

impl CrossoverOperator for SimulatedBinaryCrossover {
    fn crossover(
        &self,
        parent_a: &Genes,
        parent_b: &Genes,
        rng: &mut dyn RngCore,
    ) -> (Genes, Genes) {
        let mut child_a = *parent_a;
        let mut child_b = *parent_b;
        for idx in 0..child_a.len() {
            let (a, b) = (parent_a[idx], parent_b[idx]);
            if (a - b).abs() < f64::EPSILON {
                continue;
            }
            let beta = self.spread_factor(rng);
            child_a[idx] = 0.5 * ((1.0 + beta) * a + (1.0 - beta) * b);
            child_b[idx] = 0.5 * ((1.0 - beta) * a + (1.0 + beta) * b);
        }
        (child_a, child_b)
    }
}

/// Blend crossover (BLX-α): each child gene is drawn uniformly from the
/// parents' interval widened by `alpha` on both sides, then clipped to the
/// design box.
#[derive(Debug, Clone)]
pub struct BlendAlphaCrossover {
    alpha: f64,
    bounds: DesignBounds,
}

impl BlendAlphaCrossover {
    /// Creates a BLX-α operator.
    ///
    /// # Errors
    /// Returns [`OperatorError::InvalidParameter`] when `alpha` is negative or
    /// not finite.
    pub fn new(alpha: f64, bounds: DesignBounds) -> Result<Self, OperatorError> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(OperatorError::InvalidParameter {
                operator: "blx-alpha",
                parameter: "alpha",
                value: alpha,
            });
        }
        Ok(Self { alpha, bounds })
    }

    fn blend(&self, idx: usize, a: f64, b: f64, rng: &mut dyn RngCore) -> f64 {
        let (low, high) = (a.min(b), a.max(b));
        let reach = self.alpha * (high - low);
        let value = low - reach + random_unit(rng) * (high - low + 2.0 * reach);
        value.clamp(self.bounds.lower[idx], self.bounds.upper[idx])
    }
}

impl CrossoverOperator for BlendAlphaCrossover {
    fn crossover(
        &self,
        parent_a: &Genes,
        parent_b: &Genes,
        rng: &mut dyn RngCore,
    ) -> (Genes, Genes) {
        let mut child_a = *parent_a;
        let mut child_b = *parent_b;
        for idx in 0..child_a.len() {
            child_a[idx] = self.blend(idx, parent_a[idx], parent_b[idx], rng);
            child_b[idx] = self.blend(idx, parent_a[idx], parent_b[idx], rng);
        }
        (child_a, child_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sbx_copies_identical_parents() {
        let operator = SimulatedBinaryCrossover::new(20.0).unwrap();
        let parent = [35.0, 3.0, 10.0];
        let mut rng = StdRng::seed_from_u64(1);
        let (child_a, child_b) = operator.crossover(&parent, &parent, &mut rng);
        assert_eq!(child_a, parent);
        assert_eq!(child_b, parent);
    }

    #[test]
    fn sbx_children_are_centred_on_parents() {
        let operator = SimulatedBinaryCrossover::new(20.0).unwrap();
        let parent_a = [25.0, 2.0, 4.0];
        let parent_b = [45.0, 4.0, 16.0];
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let (child_a, child_b) = operator.crossover(&parent_a, &parent_b, &mut rng);
            for idx in 0..3 {
                let parent_mean = 0.5 * (parent_a[idx] + parent_b[idx]);
                let child_mean = 0.5 * (child_a[idx] + child_b[idx]);
                assert!((parent_mean - child_mean).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn sbx_rejects_bad_index() {
        assert!(SimulatedBinaryCrossover::new(-1.0).is_err());
    }

    #[test]
    fn blx_alpha_stays_in_bounds() {
        let bounds = DesignBounds::default();
        let operator = BlendAlphaCrossover::new(0.5, bounds).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let (child_a, child_b) =
                operator.crossover(&[20.0, 1.0, 0.0], &[50.0, 5.0, 20.0], &mut rng);
            assert!(bounds.contains_genes(&child_a));
            assert!(bounds.contains_genes(&child_b));
        }
    }
}
