//! Core design-space primitives.
//!
//! This module holds the value types shared by both search strategies: the
//! three-variable [`DesignVector`], the box [`DesignBounds`] that constrain it
//! and the natural-unit [`ObjectiveVector`] produced by the evaluator. The
//! optimization engines work on plain `[f64; 3]` gene arrays and convert at
//! the edges.

pub mod experiment;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use std::fmt::{self, Display, Formatter};

/// Number of design variables.
pub const DIMENSIONS: usize = 3;

/// Number of objectives.
pub const OBJECTIVES: usize = 3;

/// Gene array used by the operators, ordered as blade length, maximum chord
/// and twist angle.
///
/// # Examples
/// ```
/// use blade_mdo::{DesignVector, Genes};
/// let genes: Genes = [35.0, 3.0, 10.0];
/// assert_eq!(DesignVector::from(genes).max_chord, 3.0);
/// ```
pub type Genes = [f64; DIMENSIONS];

/// A rotor blade design.
///
/// # Examples
/// ```
/// use blade_mdo::DesignVector;
/// let design = DesignVector::new(40.0, 2.5, 8.0);
/// assert_eq!(design.to_array(), [40.0, 2.5, 8.0]);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesignVector {
    /// Blade length in metres.
    pub blade_length: f64,
    /// Maximum chord in metres.
    pub max_chord: f64,
    /// Twist angle in degrees.
    pub twist_angle: f64,
}

impl DesignVector {
    /// Creates a design from its three variables.
    #[must_use]
    pub fn new(blade_length: f64, max_chord: f64, twist_angle: f64) -> Self {
        Self {
            blade_length,
            max_chord,
            twist_angle,
        }
    }

    /// Returns the design as a gene array.
    #[must_use]
    pub fn to_array(&self) -> Genes {
        [self.blade_length, self.max_chord, self.twist_angle]
    }
}

impl From<Genes> for DesignVector {
    fn from(genes: Genes) -> Self {
        Self::new(genes[0], genes[1], genes[2])
    }
}

impl From<DesignVector> for Genes {
    fn from(design: DesignVector) -> Self {
        design.to_array()
    }
}

/// Closed box bounds on the design variables.
///
/// A dimension whose lower bound equals its upper bound is valid: that
/// variable is simply held fixed by every search.
///
/// # Examples
/// ```
/// use blade_mdo::{DesignBounds, DesignVector};
/// let bounds = DesignBounds::default();
/// assert!(bounds.contains(&DesignVector::new(35.0, 3.0, 10.0)));
/// assert_eq!(bounds.midpoint(), [35.0, 3.0, 10.0]);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesignBounds {
    /// Lower bounds for blade length, chord and twist.
    pub lower: Genes,
    /// Upper bounds for blade length, chord and twist.
    pub upper: Genes,
}

impl Default for DesignBounds {
    fn default() -> Self {
        Self {
            lower: [20.0, 1.0, 0.0],
            upper: [50.0, 5.0, 20.0],
        }
    }
}

impl DesignBounds {
    /// Creates bounds from lower and upper arrays without validating them.
    #[must_use]
    pub fn new(lower: Genes, upper: Genes) -> Self {
        Self { lower, upper }
    }

    /// Returns a copy of these bounds with one dimension pinned to `value`.
    ///
    /// # Examples
    /// ```
    /// use blade_mdo::DesignBounds;
    /// let bounds = DesignBounds::default().with_fixed(2, 10.0);
    /// assert_eq!(bounds.lower[2], bounds.upper[2]);
    /// ```
    ///
    /// # Panics
    /// Panics if `dimension` is not below [`DIMENSIONS`].
    #[must_use]
    pub fn with_fixed(mut self, dimension: usize, value: f64) -> Self {
        self.lower[dimension] = value;
        self.upper[dimension] = value;
        self
    }

    /// Checks that every bound is finite and that no lower bound exceeds its
    /// upper bound.
    ///
    /// # Errors
    /// Returns [`BoundsError`] describing the first offending dimension.
    pub fn validate(&self) -> Result<(), BoundsError> {
        for (dimension, (&lower, &upper)) in self.lower.iter().zip(self.upper.iter()).enumerate()
        {
            if !(lower.is_finite() && upper.is_finite()) {
                return Err(BoundsError::NonFinite {
                    dimension,
                    lower,
                    upper,
                });
            }
            if lower > upper {
                return Err(BoundsError::InvalidRange {
                    dimension,
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }

    /// Indicates whether every variable of `design` lies within the bounds.
    #[must_use]
    pub fn contains(&self, design: &DesignVector) -> bool {
        self.contains_genes(&design.to_array())
    }

    /// Gene-array variant of [`Self::contains`].
    #[must_use]
    pub fn contains_genes(&self, genes: &Genes) -> bool {
        genes
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(value, (lower, upper))| lower <= value && value <= upper)
    }

    /// Clamps every gene into its bound.
    pub fn clamp(&self, genes: &mut Genes) {
        for (value, (&lower, &upper)) in genes
            .iter_mut()
            .zip(self.lower.iter().zip(self.upper.iter()))
        {
            *value = value.clamp(lower, upper);
        }
    }

    /// Returns the centre of the box.
    #[must_use]
    pub fn midpoint(&self) -> Genes {
        let mut centre = [0.0; DIMENSIONS];
        for (idx, value) in centre.iter_mut().enumerate() {
            *value = 0.5 * (self.lower[idx] + self.upper[idx]);
        }
        centre
    }

    /// Draws a design uniformly from the box. Degenerate dimensions always
    /// return their fixed value.
    ///
    /// Callers must validate the bounds first.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Genes {
        let mut genes = [0.0; DIMENSIONS];
        for (idx, gene) in genes.iter_mut().enumerate() {
            let (lower, upper) = (self.lower[idx], self.upper[idx]);
            *gene = if lower == upper {
                lower
            } else {
                Uniform::new_inclusive(lower, upper)
                    .sample(rng)
                    .clamp(lower, upper)
            };
        }
        genes
    }
}

/// Error returned when invalid bounds are provided.
///
/// # Examples
/// ```
/// use blade_mdo::DesignBounds;
/// let err = DesignBounds::new([50.0, 1.0, 0.0], [20.0, 5.0, 20.0]).validate().unwrap_err();
/// assert!(err.to_string().contains("dimension 0"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsError {
    /// A lower bound exceeds its upper bound.
    InvalidRange {
        /// Index of the problematic dimension.
        dimension: usize,
        /// The lower bound value.
        lower: f64,
        /// The upper bound value.
        upper: f64,
    },
    /// A bound is infinite or NaN.
    NonFinite {
        /// Index of the problematic dimension.
        dimension: usize,
        /// The lower bound value.
        lower: f64,
        /// The upper bound value.
        upper: f64,
    },
}

impl Display for BoundsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange {
                dimension,
                lower,
                upper,
            } => write!(
                f,
                "invalid bounds for dimension {dimension}: lower {lower} exceeds upper {upper}"
            ),
            Self::NonFinite {
                dimension,
                lower,
                upper,
            } => write!(
                f,
                "non-finite bounds for dimension {dimension} (lower: {lower}, upper: {upper})"
            ),
        }
    }
}

impl std::error::Error for BoundsError {}

/// Whether an objective is maximized or minimized.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveDirection {
    /// Larger is better.
    Maximize,
    /// Smaller is better.
    Minimize,
}

impl ObjectiveDirection {
    /// Sign that maps a natural-unit value onto a minimization axis.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Maximize => -1.0,
            Self::Minimize => 1.0,
        }
    }
}

/// Direction of AEP, mass and fatigue, in that order.
pub const OBJECTIVE_DIRECTIONS: [ObjectiveDirection; OBJECTIVES] = [
    ObjectiveDirection::Maximize,
    ObjectiveDirection::Minimize,
    ObjectiveDirection::Minimize,
];

/// Objective values in natural units.
///
/// # Examples
/// ```
/// use blade_mdo::ObjectiveVector;
/// let objectives = ObjectiveVector::new(150.0, 4000.0, 80.0);
/// assert_eq!(objectives.to_minimization(), [-150.0, 4000.0, 80.0]);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveVector {
    /// Annual energy production in MWh. Maximized.
    pub aep: f64,
    /// Blade mass in kg. Minimized.
    pub mass: f64,
    /// Fatigue load proxy in arbitrary units. Minimized.
    pub fatigue: f64,
}

impl ObjectiveVector {
    /// Creates an objective vector.
    #[must_use]
    pub fn new(aep: f64, mass: f64, fatigue: f64) -> Self {
        Self { aep, mass, fatigue }
    }

    /// Returns the values as an array in natural units.
    #[must_use]
    pub fn to_array(&self) -> [f64; OBJECTIVES] {
        [self.aep, self.mass, self.fatigue]
    }

    /// Maps the values onto minimization axes using [`OBJECTIVE_DIRECTIONS`].
    #[must_use]
    pub fn to_minimization(&self) -> [f64; OBJECTIVES] {
        let mut oriented = self.to_array();
        for (value, direction) in oriented.iter_mut().zip(OBJECTIVE_DIRECTIONS.iter()) {
            *value *= direction.sign();
        }
        oriented
    }

    /// Inverse of [`Self::to_minimization`].
    #[must_use]
    pub fn from_minimization(oriented: [f64; OBJECTIVES]) -> Self {
        let mut natural = oriented;
        for (value, direction) in natural.iter_mut().zip(OBJECTIVE_DIRECTIONS.iter()) {
            *value *= direction.sign();
        }
        Self::new(natural[0], natural[1], natural[2])
    }

    /// Pareto dominance in natural units, honouring each objective's direction.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        dominates(&self.to_minimization(), &other.to_minimization())
    }
}

/// Returns `true` when `candidate` is no worse than `other` on every
/// minimization axis and strictly better on at least one.
///
/// # Examples
/// ```
/// assert!(blade_mdo::dominates(&[0.0, 0.5], &[0.1, 0.5]));
/// assert!(!blade_mdo::dominates(&[0.1, 0.5], &[0.1, 0.5]));
/// ```
#[must_use]
pub fn dominates(candidate: &[f64], other: &[f64]) -> bool {
    let mut strictly_better = false;
    for (&a, &b) in candidate.iter().zip(other.iter()) {
        if a > b {
            return false;
        }
        if a < b {
            strictly_better = true;
        }
    }
    strictly_better
}

pub(crate) fn population_diversity(designs: &[Genes]) -> f64 {
    if designs.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let size = designs.len() as f64;
    let mut means = [0.0; DIMENSIONS];
    for design in designs {
        for (mean, value) in means.iter_mut().zip(design.iter()) {
            *mean += value / size;
        }
    }
    let mut total_variance = 0.0;
    for design in designs {
        for (mean, value) in means.iter().zip(design.iter()) {
            let diff = value - mean;
            total_variance += diff * diff / size;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    {
        (total_variance / DIMENSIONS as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_bounds_match_blade_envelope() {
        let bounds = DesignBounds::default();
        assert!(bounds.validate().is_ok());
        assert!(bounds.contains(&DesignVector::new(20.0, 5.0, 0.0)));
        assert!(!bounds.contains(&DesignVector::new(19.9, 3.0, 10.0)));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let bounds = DesignBounds::new([20.0, 5.0, 0.0], [50.0, 1.0, 20.0]);
        let err = bounds.validate().unwrap_err();
        assert!(matches!(err, BoundsError::InvalidRange { dimension: 1, .. }));
    }

    #[test]
    fn non_finite_bounds_are_rejected() {
        let bounds = DesignBounds::new([20.0, 1.0, f64::NAN], [50.0, 5.0, 20.0]);
        assert!(matches!(
            bounds.validate(),
            Err(BoundsError::NonFinite { dimension: 2, .. })
        ));
    }

    #[test]
    fn sample_respects_bounds_and_fixed_dimensions() {
        let bounds = DesignBounds::default().with_fixed(2, 10.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let genes = bounds.sample(&mut rng);
            assert!(bounds.contains_genes(&genes));
            assert_eq!(genes[2], 10.0);
        }
    }

    #[test]
    #[should_panic]
    fn fixing_a_missing_dimension_panics() {
        let _ = DesignBounds::default().with_fixed(DIMENSIONS, 1.0);
    }

    #[test]
    fn clamp_pulls_genes_inside() {
        let bounds = DesignBounds::default();
        let mut genes = [10.0, 6.0, -3.0];
        bounds.clamp(&mut genes);
        assert_eq!(genes, [20.0, 5.0, 0.0]);
    }

    #[test]
    fn minimization_transform_round_trips() {
        let objectives = ObjectiveVector::new(120.0, 3000.0, 40.0);
        let oriented = objectives.to_minimization();
        assert_eq!(oriented[0], -120.0);
        assert_eq!(ObjectiveVector::from_minimization(oriented), objectives);
    }

    #[test]
    fn natural_dominance_prefers_higher_aep() {
        let better = ObjectiveVector::new(200.0, 3000.0, 40.0);
        let worse = ObjectiveVector::new(150.0, 3000.0, 40.0);
        assert!(better.dominates(&worse));
        assert!(!worse.dominates(&better));
    }

    #[test]
    fn diversity_is_zero_for_identical_designs() {
        let designs = vec![[30.0, 2.0, 5.0]; 4];
        assert_eq!(population_diversity(&designs), 0.0);
        assert!(population_diversity(&[[20.0, 1.0, 0.0], [50.0, 5.0, 20.0]]) > 0.0);
    }
}
