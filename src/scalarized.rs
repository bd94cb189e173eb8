//! Scalarized gradient search.
//!
//! Each trial draws a random preference over the three objectives from a
//! symmetric Dirichlet distribution, folds the objectives into one normalized
//! weighted sum and minimizes it over the design box with
//! [`LocalMinimizer`]. Every trial contributes exactly one
//! [`Method::Gradient`] candidate, converged or not.

use crate::core::experiment::{Candidate, ExperimentMetadata, Method, ResultSet};
use crate::core::{BoundsError, DesignBounds, DesignVector, Genes, ObjectiveVector, OBJECTIVES};
use crate::objective::evaluate;
use crate::ops::{LocalMinimizer, ProblemBounds, ProblemError, ProblemResult, ScalarProblem};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use std::fmt::{self, Display, Formatter};
use tracing::{debug, info, warn};

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Reference magnitudes dividing each objective before weighting.
///
/// # Examples
/// ```
/// let norms = blade_mdo::Normalization::default();
/// assert_eq!((norms.aep, norms.mass, norms.fatigue), (200.0, 5000.0, 100.0));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// AEP reference in MWh.
    pub aep: f64,
    /// Mass reference in kg.
    pub mass: f64,
    /// Fatigue reference.
    pub fatigue: f64,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            aep: 200.0,
            mass: 5000.0,
            fatigue: 100.0,
        }
    }
}

impl Normalization {
    fn validate(&self) -> Result<(), ScalarizedError> {
        for (objective, value) in [
            ("AEP", self.aep),
            ("Mass", self.mass),
            ("Fatigue", self.fatigue),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScalarizedError::InvalidNormalization { objective, value });
            }
        }
        Ok(())
    }
}

/// Objective weights `(w_aep, w_mass, w_fatigue)`: non-negative and summing
/// to one.
///
/// # Examples
/// ```
/// use blade_mdo::WeightSample;
/// let weights = WeightSample::new([0.2, 0.3, 0.5]).unwrap();
/// assert_eq!(weights.mass(), 0.3);
/// assert!(WeightSample::new([0.5, 0.5, 0.5]).is_err());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    weights: [f64; OBJECTIVES],
}

impl WeightSample {
    /// Validates and wraps a weight vector.
    ///
    /// # Errors
    /// Returns [`ScalarizedError::InvalidWeights`] for negative or non-finite
    /// components or a sum farther than `1e-9` from one.
    pub fn new(weights: [f64; OBJECTIVES]) -> Result<Self, ScalarizedError> {
        let sum: f64 = weights.iter().sum();
        let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0)
            && (sum - 1.0).abs() <= WEIGHT_TOLERANCE;
        if valid {
            Ok(Self { weights })
        } else {
            Err(ScalarizedError::InvalidWeights(weights))
        }
    }

    fn draw<R: Rng>(dirichlet: &Dirichlet<f64>, rng: &mut R) -> Result<Self, ScalarizedError> {
        let sample = dirichlet.sample(rng);
        let mut weights = [0.0; OBJECTIVES];
        for (weight, value) in weights.iter_mut().zip(sample) {
            *weight = value;
        }
        let sum: f64 = weights.iter().sum();
        Self::new(weights.map(|weight| weight / sum))
    }

    /// Weights as an array in objective order.
    #[must_use]
    pub fn to_array(self) -> [f64; OBJECTIVES] {
        self.weights
    }

    /// AEP weight.
    #[must_use]
    pub fn aep(&self) -> f64 {
        self.weights[0]
    }

    /// Mass weight.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.weights[1]
    }

    /// Fatigue weight.
    #[must_use]
    pub fn fatigue(&self) -> f64 {
        self.weights[2]
    }
}

/// Where each local minimization starts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPoint {
    /// Centre of the design box.
    #[default]
    Midpoint,
    /// Uniform random design inside the box, drawn per trial.
    Random,
}

/// Settings of a scalarized run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GradientSettings {
    /// Number of trials, one candidate each.
    pub num_points: usize,
    /// Symmetric Dirichlet concentration of the weight draws.
    pub concentration: f64,
    /// Objective reference magnitudes.
    pub normalization: Normalization,
    /// Start point of every trial.
    pub start: StartPoint,
    /// Evaluation limit of the local minimizer.
    pub max_evaluations: usize,
    /// Final trust radius of the local minimizer, relative to the initial one.
    pub tolerance: f64,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            num_points: 20,
            concentration: 1.0,
            normalization: Normalization::default(),
            start: StartPoint::Midpoint,
            max_evaluations: 1000,
            tolerance: 1e-6,
        }
    }
}

/// Errors produced by the scalarized searcher.
#[derive(Debug)]
pub enum ScalarizedError {
    /// At least one trial is required.
    InvalidTrialCount(usize),
    /// A normalization constant was non-positive or not finite.
    InvalidNormalization {
        /// Objective the constant applies to.
        objective: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The Dirichlet concentration was non-positive or not finite.
    InvalidConcentration(f64),
    /// A weight vector was not a valid convex combination.
    InvalidWeights([f64; OBJECTIVES]),
    /// The design bounds are inconsistent.
    Bounds(BoundsError),
    /// A design could not be evaluated.
    Problem(ProblemError),
}

impl Display for ScalarizedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTrialCount(count) => {
                write!(f, "number of trials must be positive (received {count})")
            }
            Self::InvalidNormalization { objective, value } => write!(
                f,
                "{objective} normalization must be positive and finite (received {value})"
            ),
            Self::InvalidConcentration(value) => write!(
                f,
                "Dirichlet concentration must be positive and finite (received {value})"
            ),
            Self::InvalidWeights(weights) => write!(
                f,
                "weights must be non-negative and sum to one (received {weights:?})"
            ),
            Self::Bounds(err) => write!(f, "{err}"),
            Self::Problem(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ScalarizedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bounds(err) => Some(err),
            Self::Problem(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BoundsError> for ScalarizedError {
    fn from(err: BoundsError) -> Self {
        Self::Bounds(err)
    }
}

impl From<ProblemError> for ScalarizedError {
    fn from(err: ProblemError) -> Self {
        Self::Problem(err)
    }
}

/// Weighted, normalized blade objective for one trial.
///
/// # Examples
/// ```
/// use blade_mdo::{DesignBounds, Normalization, ObjectiveVector, ScalarizedObjective, WeightSample};
/// let objective = ScalarizedObjective::new(
///     DesignBounds::default(),
///     WeightSample::new([1.0, 0.0, 0.0]).unwrap(),
///     Normalization::default(),
/// );
/// assert_eq!(objective.value(&ObjectiveVector::new(100.0, 1.0, 1.0)), -0.5);
/// ```
#[derive(Debug, Clone)]
pub struct ScalarizedObjective {
    bounds: DesignBounds,
    weights: WeightSample,
    normalization: Normalization,
}

impl ScalarizedObjective {
    /// Creates the scalarized objective.
    #[must_use]
    pub fn new(bounds: DesignBounds, weights: WeightSample, normalization: Normalization) -> Self {
        Self {
            bounds,
            weights,
            normalization,
        }
    }

    /// Scalar value of an evaluated design. AEP enters with a negative sign.
    #[must_use]
    pub fn value(&self, objectives: &ObjectiveVector) -> f64 {
        -self.weights.aep() * objectives.aep / self.normalization.aep
            + self.weights.mass() * objectives.mass / self.normalization.mass
            + self.weights.fatigue() * objectives.fatigue / self.normalization.fatigue
    }
}

impl ProblemBounds for ScalarizedObjective {
    fn bounds(&self) -> &DesignBounds {
        &self.bounds
    }
}

impl ScalarProblem for ScalarizedObjective {
    fn evaluate(&self, genes: &Genes) -> ProblemResult<f64> {
        Ok(self.value(&evaluate(&DesignVector::from(*genes))?))
    }
}

/// Outcome of one scalarized trial.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrialDiagnostics {
    /// Weights drawn for the trial.
    pub weights: WeightSample,
    /// Design the minimizer started from.
    pub start: Genes,
    /// Whether the minimizer met a tolerance.
    pub converged: bool,
    /// Objective evaluations requested by the minimizer.
    pub evaluations: usize,
    /// Scalarized value at the returned design.
    pub scalar_value: f64,
}

/// Report returned by [`ScalarizedSearcher::run`].
#[derive(Debug, Clone)]
pub struct ScalarizedReport {
    /// One [`Method::Gradient`] candidate per trial, in trial order.
    pub results: ResultSet,
    /// Per-trial diagnostics, aligned with `results`.
    pub trials: Vec<TrialDiagnostics>,
    /// Run metadata.
    pub metadata: ExperimentMetadata,
}

impl ScalarizedReport {
    /// Number of trials whose minimizer did not converge.
    #[must_use]
    pub fn non_converged(&self) -> usize {
        self.trials.iter().filter(|trial| !trial.converged).count()
    }
}

/// Builder used to configure a [`ScalarizedSearcher`].
#[derive(Debug, Clone)]
pub struct ScalarizedBuilder {
    bounds: DesignBounds,
    settings: GradientSettings,
}

impl ScalarizedBuilder {
    /// Replaces all settings at once.
    #[must_use]
    pub fn settings(mut self, settings: GradientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the number of trials.
    #[must_use]
    pub fn num_points(mut self, num_points: usize) -> Self {
        self.settings.num_points = num_points;
        self
    }

    /// Sets the Dirichlet concentration.
    #[must_use]
    pub fn concentration(mut self, concentration: f64) -> Self {
        self.settings.concentration = concentration;
        self
    }

    /// Sets the normalization constants.
    #[must_use]
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.settings.normalization = normalization;
        self
    }

    /// Sets the start point policy.
    #[must_use]
    pub fn start(mut self, start: StartPoint) -> Self {
        self.settings.start = start;
        self
    }

    /// Validates the configuration and builds the searcher.
    ///
    /// # Errors
    /// Returns [`ScalarizedError`] for zero trials, bad normalization, a bad
    /// concentration or invalid bounds.
    pub fn build(self) -> Result<ScalarizedSearcher, ScalarizedError> {
        let settings = self.settings;
        if settings.num_points == 0 {
            return Err(ScalarizedError::InvalidTrialCount(settings.num_points));
        }
        settings.normalization.validate()?;
        let concentration = settings.concentration;
        if !(concentration.is_finite() && concentration > 0.0) {
            return Err(ScalarizedError::InvalidConcentration(concentration));
        }
        self.bounds.validate()?;
        let dirichlet = Dirichlet::new(&[concentration; OBJECTIVES])
            .map_err(|_| ScalarizedError::InvalidConcentration(concentration))?;
        let solver = LocalMinimizer::new()
            .max_evaluations(settings.max_evaluations)
            .tolerance(settings.tolerance);
        Ok(ScalarizedSearcher {
            bounds: self.bounds,
            settings,
            dirichlet,
            solver,
        })
    }
}

/// Dirichlet-weighted multi-start local search.
///
/// # Examples
/// ```
/// use blade_mdo::{DesignBounds, Method, ScalarizedSearcher};
/// use rand::SeedableRng;
///
/// let searcher = ScalarizedSearcher::builder(DesignBounds::default())
///     .num_points(3)
///     .build()
///     .unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(3);
/// let report = searcher.run(&mut rng).unwrap();
/// assert_eq!(report.results.len(), 3);
/// assert!(report.results.iter().all(|c| c.origin() == Method::Gradient));
/// ```
#[derive(Debug, Clone)]
pub struct ScalarizedSearcher {
    bounds: DesignBounds,
    settings: GradientSettings,
    dirichlet: Dirichlet<f64>,
    solver: LocalMinimizer,
}

impl ScalarizedSearcher {
    /// Creates a builder with the default [`GradientSettings`].
    #[must_use]
    pub fn builder(bounds: DesignBounds) -> ScalarizedBuilder {
        ScalarizedBuilder {
            bounds,
            settings: GradientSettings::default(),
        }
    }

    /// Settings the searcher was built with.
    #[must_use]
    pub fn settings(&self) -> &GradientSettings {
        &self.settings
    }

    /// Runs every trial in order.
    ///
    /// # Errors
    /// Returns [`ScalarizedError::Problem`] when a design cannot be evaluated.
    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<ScalarizedReport, ScalarizedError> {
        let trials = self.settings.num_points;
        info!(trials, "starting scalarized search");
        let mut results = ResultSet::new();
        let mut diagnostics = Vec::with_capacity(trials);
        for trial in 0..trials {
            let weights = WeightSample::draw(&self.dirichlet, rng)?;
            let start = match self.settings.start {
                StartPoint::Midpoint => self.bounds.midpoint(),
                StartPoint::Random => self.bounds.sample(rng),
            };
            debug!(trial, weights = ?weights.to_array(), "scalarized trial");
            let problem = ScalarizedObjective::new(self.bounds, weights, self.settings.normalization);
            let solution = self.solver.minimize(&problem, &start)?;
            if !solution.converged {
                warn!(
                    trial,
                    evaluations = solution.evaluations,
                    "local minimizer did not converge, keeping last iterate"
                );
            }
            let design = DesignVector::from(solution.x);
            results.push(Candidate::new(design, evaluate(&design)?, Method::Gradient));
            diagnostics.push(TrialDiagnostics {
                weights,
                start,
                converged: solution.converged,
                evaluations: solution.evaluations,
                scalar_value: solution.value,
            });
        }
        let report = ScalarizedReport {
            results,
            trials: diagnostics,
            metadata: ExperimentMetadata::new(trials, None, std::any::type_name::<R>()),
        };
        info!(
            candidates = report.results.len(),
            non_converged = report.non_converged(),
            "scalarized search finished"
        );
        Ok(report)
    }
}

/// Runs the scalarized searcher over `bounds` with the given settings.
///
/// # Errors
/// Returns [`ScalarizedError`] for invalid settings or bounds.
pub fn run_gradient<R: Rng>(
    bounds: DesignBounds,
    settings: &GradientSettings,
    rng: &mut R,
) -> Result<ScalarizedReport, ScalarizedError> {
    ScalarizedSearcher::builder(bounds)
        .settings(settings.clone())
        .build()?
        .run(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn minimize(weights: [f64; OBJECTIVES]) -> Genes {
        let bounds = DesignBounds::default();
        let problem = ScalarizedObjective::new(
            bounds,
            WeightSample::new(weights).unwrap(),
            Normalization::default(),
        );
        LocalMinimizer::new()
            .minimize(&problem, &bounds.midpoint())
            .unwrap()
            .x
    }

    #[test]
    fn weight_sample_rejects_invalid_vectors() {
        assert!(WeightSample::new([0.2, 0.3, 0.5]).is_ok());
        assert!(WeightSample::new([1.0, 0.0, 0.0]).is_ok());
        assert!(WeightSample::new([-0.1, 0.6, 0.5]).is_err());
        assert!(WeightSample::new([0.3, 0.3, 0.3]).is_err());
        assert!(WeightSample::new([f64::NAN, 0.5, 0.5]).is_err());
    }

    #[test]
    fn dirichlet_draws_are_valid_weights() {
        let dirichlet = Dirichlet::new(&[1.0; OBJECTIVES]).unwrap();
        let mut rng = StdRng::seed_from_u64(31);
        for _ in 0..500 {
            let weights = WeightSample::draw(&dirichlet, &mut rng).unwrap().to_array();
            assert!(weights.iter().all(|w| *w >= 0.0));
            assert!((weights.iter().sum::<f64>() - 1.0).abs() <= WEIGHT_TOLERANCE);
        }
    }

    #[test]
    fn scalar_value_negates_aep() {
        let objective = ScalarizedObjective::new(
            DesignBounds::default(),
            WeightSample::new([0.5, 0.25, 0.25]).unwrap(),
            Normalization::default(),
        );
        let value = objective.value(&ObjectiveVector::new(200.0, 5000.0, 100.0));
        assert!((value - 0.0).abs() < 1e-12);
    }

    #[test]
    fn mass_only_weights_shrink_the_blade() {
        let x = minimize([0.0, 1.0, 0.0]);
        assert!((x[0] - 20.0).abs() < 1e-4);
        assert!((x[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn aep_only_weights_grow_the_blade() {
        let x = minimize([1.0, 0.0, 0.0]);
        assert!((x[0] - 50.0).abs() < 1e-4);
        assert!((x[1] - 5.0).abs() < 1e-4);
        assert!((x[2] - 12.0).abs() < 0.05);
    }

    #[test]
    fn any_aep_weight_settles_on_the_preferred_twist() {
        for weights in [[0.4, 0.3, 0.3], [0.2, 0.5, 0.3], [0.6, 0.1, 0.3]] {
            let x = minimize(weights);
            assert!((x[2] - 12.0).abs() < 0.05, "{weights:?} -> {x:?}");
        }
    }

    #[test]
    fn configuration_errors_fail_fast() {
        let bounds = DesignBounds::default();
        assert!(matches!(
            ScalarizedSearcher::builder(bounds).num_points(0).build(),
            Err(ScalarizedError::InvalidTrialCount(0))
        ));
        assert!(matches!(
            ScalarizedSearcher::builder(bounds).concentration(0.0).build(),
            Err(ScalarizedError::InvalidConcentration(_))
        ));
        let normalization = Normalization {
            mass: 0.0,
            ..Normalization::default()
        };
        assert!(matches!(
            ScalarizedSearcher::builder(bounds)
                .normalization(normalization)
                .build(),
            Err(ScalarizedError::InvalidNormalization {
                objective: "Mass",
                ..
            })
        ));
        let inverted = DesignBounds::new([20.0, 5.0, 0.0], [50.0, 1.0, 20.0]);
        assert!(matches!(
            ScalarizedSearcher::builder(inverted).build(),
            Err(ScalarizedError::Bounds(_))
        ));
    }

    #[test]
    fn every_trial_yields_one_candidate() {
        let searcher = ScalarizedSearcher::builder(DesignBounds::default())
            .num_points(6)
            .build()
            .unwrap();
        let report = searcher.run(&mut StdRng::seed_from_u64(32)).unwrap();
        assert_eq!(report.results.len(), 6);
        assert_eq!(report.trials.len(), 6);
        for (candidate, trial) in report.results.iter().zip(&report.trials) {
            assert_eq!(trial.start, DesignBounds::default().midpoint());
            let expected = evaluate(candidate.design()).unwrap();
            assert_eq!(candidate.objectives(), &expected);
        }
    }

    #[test]
    fn random_starts_stay_inside_bounds() {
        let bounds = DesignBounds::default();
        let searcher = ScalarizedSearcher::builder(bounds)
            .num_points(4)
            .start(StartPoint::Random)
            .build()
            .unwrap();
        let report = searcher.run(&mut StdRng::seed_from_u64(33)).unwrap();
        for (candidate, trial) in report.results.iter().zip(&report.trials) {
            assert!(bounds.contains_genes(&trial.start));
            assert!(bounds.contains(candidate.design()));
        }
    }
}
