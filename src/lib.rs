#![warn(missing_docs)]

/*! Multi-objective design optimization of a wind-turbine rotor blade.

A blade is described by three continuous variables (blade length, maximum chord and twist
angle) and judged on three conflicting objectives: annual energy production (maximized),
blade mass (minimized) and a root fatigue load proxy (minimized).

Two searchers explore the trade-off:
* [`Nsga2`] evolves a population towards the Pareto front.
* [`ScalarizedSearcher`] runs bounded local minimizations of randomly weighted sums.

[`aggregate`] combines their candidates into one [`ResultSet`] whose
[records](ResultSet::records) follow the `AEP, Mass, Fatigue, Method` export layout.
[`run_study`] does all of this from a single seed:
```
let mut settings = blade_mdo::StudySettings::default();
settings.evolutionary.population_size = 20;
settings.evolutionary.generations = 5;
settings.gradient.num_points = 4;
let report = blade_mdo::run_study(&settings).unwrap();
assert_eq!(report.results.len(), 24);
```
!*/

pub mod core;
pub mod nsga2;
pub mod objective;
pub mod ops;
pub mod scalarized;
pub mod study;

pub use crate::core::experiment::{
    aggregate, Candidate, ExperimentMetadata, ExportRecord, Method, ObjectiveSummary, ResultSet,
    RunStats, EXPORT_COLUMNS,
};
pub use crate::core::{
    dominates, BoundsError, DesignBounds, DesignVector, Genes, ObjectiveDirection,
    ObjectiveVector, DIMENSIONS, OBJECTIVES, OBJECTIVE_DIRECTIONS,
};
pub use crate::nsga2::{
    run_evolutionary, EvolutionarySettings, Generation, Individual, Nsga2, Nsga2Builder,
    Nsga2Error, Nsga2Report,
};
pub use crate::objective::{evaluate, BladeProblem};
pub use crate::scalarized::{
    run_gradient, GradientSettings, Normalization, ScalarizedBuilder, ScalarizedError,
    ScalarizedObjective, ScalarizedReport, ScalarizedSearcher, StartPoint, TrialDiagnostics,
    WeightSample,
};
pub use crate::study::{run_study, StudyError, StudyReport, StudySettings};
