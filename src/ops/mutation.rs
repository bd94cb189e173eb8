//! Bounded perturbation of a single design.

use crate::core::{DesignBounds, Genes, DIMENSIONS};
use crate::ops::{check_distribution_index, check_probability, random_unit, OperatorError};
use rand::RngCore;

/// Perturbs a design and returns the mutated copy.
///
/// # Examples
/// ```
/// use blade_mdo::ops::MutationOperator;
/// use blade_mdo::Genes;
///
/// struct Nudge;
///
/// impl MutationOperator for Nudge {
///     fn mutate(&self, parent: &Genes, _rng: &mut dyn rand::RngCore) -> Genes {
///         [parent[0] + 1.0, parent[1], parent[2]]
///     }
/// }
///
/// assert_eq!(Nudge.mutate(&[30.0, 2.0, 5.0], &mut rand::thread_rng()), [31.0, 2.0, 5.0]);
/// ```
pub trait MutationOperator: Send + Sync {
    /// Returns a mutated copy of `parent`.
    fn mutate(&self, parent: &Genes, rng: &mut dyn RngCore) -> Genes;
}

impl<T: MutationOperator + ?Sized> MutationOperator for Box<T> {
    fn mutate(&self, parent: &Genes, rng: &mut dyn RngCore) -> Genes {
        (**self).mutate(parent, rng)
    }
}

/// Bounded polynomial mutation (Deb & Goyal).
///
/// Each gene mutates independently with `gene_probability`; the perturbation
/// shrinks near the bounds so the result never leaves the box.
#[derive(Debug, Clone)]
pub struct PolynomialMutation {
    distribution_index: f64,
    gene_probability: f64,
    bounds: DesignBounds,
}

impl PolynomialMutation {
    /// Creates the operator. The default gene probability is one over the
    /// number of design variables.
    ///
    /// # Errors
    /// Returns [`OperatorError`] when the distribution index is not positive.
    pub fn new(bounds: DesignBounds, eta: f64) -> Result<Self, OperatorError> {
        #[allow(clippy::cast_precision_loss)]
        let gene_probability = 1.0 / DIMENSIONS as f64;
        Self::with_gene_probability(bounds, eta, gene_probability)
    }

    /// Creates the operator with an explicit per-gene probability.
    ///
    /// # Errors
    /// Returns [`OperatorError`] when the distribution index or the
    /// probability is invalid.
    pub fn with_gene_probability(
        bounds: DesignBounds,
        eta: f64,
        gene_probability: f64,
    ) -> Result<Self, OperatorError> {
        Ok(Self {
            distribution_index: check_distribution_index("polynomial mutation", eta)?,
            gene_probability: check_probability("polynomial mutation", gene_probability)?,
            bounds,
        })
    }

    fn perturb(&self, value: f64, lower: f64, upper: f64, rng: &mut dyn RngCore) -> f64 {
        let range = upper - lower;
        if range <= 0.0 {
            return lower;
        }
        let exponent = self.distribution_index + 1.0;
        let u = random_unit(rng);
        let delta_q = if u < 0.5 {
            let slack = 1.0 - (value - lower) / range;
            let term = 2.0 * u + (1.0 - 2.0 * u) * slack.powf(exponent);
            term.powf(1.0 / exponent) - 1.0
        } else {
            let slack = 1.0 - (upper - value) / range;
            let term = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * slack.powf(exponent);
            1.0 - term.powf(1.0 / exponent)
        };
        if delta_q.is_finite() {
            (value + delta_q * range).clamp(lower, upper)
        } else {
            value.clamp(lower, upper)
        }
    }
}

impl MutationOperator for PolynomialMutation {
    fn mutate(&self, parent: &Genes, rng: &mut dyn RngCore) -> Genes {
        let mut child = *parent;
        for (idx, gene) in child.iter_mut().enumerate() {
            if random_unit(rng) >= self.gene_probability {
                continue;
            }
            *gene = self.perturb(*gene, self.bounds.lower[idx], self.bounds.upper[idx], rng);
        }
        child
    }
}
