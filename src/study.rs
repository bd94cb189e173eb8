//! End-to-end study: evolutionary exploration, scalarized gradient search and
//! aggregation, driven by one seeded random source.

use crate::core::experiment::{aggregate, ResultSet};
use crate::core::DesignBounds;
use crate::nsga2::{EvolutionarySettings, Nsga2, Nsga2Error, Nsga2Report};
use crate::objective::BladeProblem;
use crate::scalarized::{GradientSettings, ScalarizedError, ScalarizedReport, ScalarizedSearcher};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::{self, Display, Formatter};
use tracing::info;

/// Settings for a full study.
///
/// All fields are public, so the usual pattern is to start from the default
/// and reassign what differs:
/// ```
/// let mut settings = blade_mdo::StudySettings::default();
/// settings.seed = 42;
/// settings.gradient.num_points = 5;
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StudySettings {
    /// Design bounds shared by both searchers.
    pub bounds: DesignBounds,
    /// NSGA-II settings.
    pub evolutionary: EvolutionarySettings,
    /// Scalarized search settings.
    pub gradient: GradientSettings,
    /// Seed of the random source.
    pub seed: u64,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            bounds: DesignBounds::default(),
            evolutionary: EvolutionarySettings::default(),
            gradient: GradientSettings::default(),
            seed: 0,
        }
    }
}

/// Errors produced by [`run_study`].
#[derive(Debug)]
pub enum StudyError {
    /// The evolutionary search failed.
    Evolutionary(Nsga2Error),
    /// The scalarized search failed.
    Gradient(ScalarizedError),
}

impl Display for StudyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evolutionary(err) => write!(f, "evolutionary search failed: {err}"),
            Self::Gradient(err) => write!(f, "gradient search failed: {err}"),
        }
    }
}

impl std::error::Error for StudyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Evolutionary(err) => Some(err),
            Self::Gradient(err) => Some(err),
        }
    }
}

impl From<Nsga2Error> for StudyError {
    fn from(err: Nsga2Error) -> Self {
        Self::Evolutionary(err)
    }
}

impl From<ScalarizedError> for StudyError {
    fn from(err: ScalarizedError) -> Self {
        Self::Gradient(err)
    }
}

/// Everything a study produced.
#[derive(Debug, Clone)]
pub struct StudyReport {
    /// Evolutionary candidates followed by gradient candidates.
    pub results: ResultSet,
    /// Full evolutionary report.
    pub evolutionary: Nsga2Report,
    /// Full scalarized report.
    pub gradient: ScalarizedReport,
}

/// Runs both searchers in sequence from `StdRng::seed_from_u64(settings.seed)`
/// and aggregates their candidates.
///
/// Both configurations are validated by their builders before any search
/// work, and the evolutionary one before the gradient one. A failure aborts
/// the study with no partial result.
///
/// # Errors
/// Returns [`StudyError`] when either searcher rejects its configuration or
/// fails to evaluate a design.
///
/// # Examples
/// ```
/// use blade_mdo::{run_study, Method, StudySettings};
///
/// let mut settings = StudySettings::default();
/// settings.evolutionary.population_size = 12;
/// settings.evolutionary.generations = 4;
/// settings.gradient.num_points = 3;
/// let report = run_study(&settings).unwrap();
/// assert_eq!(report.results.len(), 15);
/// assert_eq!(report.results.by_method(Method::Gradient).count(), 3);
/// ```
pub fn run_study(settings: &StudySettings) -> Result<StudyReport, StudyError> {
    let mut explorer = Nsga2::builder(BladeProblem::new(settings.bounds))
        .settings(settings.evolutionary.clone())
        .build()?;
    let searcher = ScalarizedSearcher::builder(settings.bounds)
        .settings(settings.gradient.clone())
        .build()?;
    let mut rng = StdRng::seed_from_u64(settings.seed);
    info!(seed = settings.seed, "starting blade study");

    let mut evolutionary = explorer.run(&mut rng)?;
    evolutionary.metadata.rng_seed = Some(settings.seed);
    let mut gradient = searcher.run(&mut rng)?;
    gradient.metadata.rng_seed = Some(settings.seed);

    let results = aggregate(evolutionary.results.clone(), gradient.results.clone());
    info!(candidates = results.len(), "blade study finished");
    Ok(StudyReport {
        results,
        evolutionary,
        gradient,
    })
}
