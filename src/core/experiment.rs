//! Candidate bookkeeping, result aggregation and run analytics.
//!
//! Both searchers hand their output over as a [`ResultSet`] of immutable
//! [`Candidate`] values. [`aggregate`] concatenates the two sets and the
//! [`ExportRecord`] rows are what tabular export and plotting consume.

use crate::core::{dominates, DesignVector, ObjectiveVector, OBJECTIVES};
use std::fmt::{self, Display, Formatter};

/// Column order of the exported table.
pub const EXPORT_COLUMNS: [&str; 4] = ["AEP", "Mass", "Fatigue", "Method"];

/// Search strategy that produced a [`Candidate`].
///
/// # Examples
/// ```
/// use blade_mdo::Method;
/// assert_eq!(Method::Evolutionary.to_string(), "GA");
/// assert_eq!(Method::Gradient.to_string(), "Gradient");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// NSGA-II evolutionary exploration.
    #[cfg_attr(feature = "serde", serde(rename = "GA"))]
    Evolutionary,
    /// Scalarized local minimization.
    Gradient,
}

impl Method {
    /// Literal spelling used in exported tables.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Evolutionary => "GA",
            Self::Gradient => "Gradient",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An evaluated design tagged with the method that produced it.
///
/// Candidates cannot be modified once created.
///
/// # Examples
/// ```
/// use blade_mdo::{Candidate, DesignVector, Method, ObjectiveVector};
/// let candidate = Candidate::new(
///     DesignVector::new(30.0, 2.0, 10.0),
///     ObjectiveVector::new(50.0, 2400.0, 67.5),
///     Method::Gradient,
/// );
/// assert_eq!(candidate.origin(), Method::Gradient);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    design: DesignVector,
    objectives: ObjectiveVector,
    origin: Method,
}

impl Candidate {
    /// Creates a candidate.
    #[must_use]
    pub fn new(design: DesignVector, objectives: ObjectiveVector, origin: Method) -> Self {
        Self {
            design,
            objectives,
            origin,
        }
    }

    /// Returns the design variables.
    #[must_use]
    pub fn design(&self) -> &DesignVector {
        &self.design
    }

    /// Returns the natural-unit objective values.
    #[must_use]
    pub fn objectives(&self) -> &ObjectiveVector {
        &self.objectives
    }

    /// Returns the producing method.
    #[must_use]
    pub fn origin(&self) -> Method {
        self.origin
    }

    /// Returns the export row for this candidate.
    #[must_use]
    pub fn record(&self) -> ExportRecord {
        ExportRecord {
            aep: self.objectives.aep,
            mass: self.objectives.mass,
            fatigue: self.objectives.fatigue,
            method: self.origin,
        }
    }
}

/// One row of the exported trade-off table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRecord {
    /// Annual energy production in MWh.
    #[cfg_attr(feature = "serde", serde(rename = "AEP"))]
    pub aep: f64,
    /// Blade mass in kg.
    #[cfg_attr(feature = "serde", serde(rename = "Mass"))]
    pub mass: f64,
    /// Fatigue load proxy.
    #[cfg_attr(feature = "serde", serde(rename = "Fatigue"))]
    pub fatigue: f64,
    /// Producing method, `GA` or `Gradient`.
    #[cfg_attr(feature = "serde", serde(rename = "Method"))]
    pub method: Method,
}

impl ExportRecord {
    /// Returns the row as strings in [`EXPORT_COLUMNS`] order.
    #[must_use]
    pub fn fields(&self) -> [String; 4] {
        [
            self.aep.to_string(),
            self.mass.to_string(),
            self.fatigue.to_string(),
            self.method.label().to_owned(),
        ]
    }
}

/// Append-only sequence of candidates.
///
/// # Examples
/// ```
/// use blade_mdo::{Candidate, DesignVector, Method, ObjectiveVector, ResultSet};
/// let mut results = ResultSet::new();
/// results.push(Candidate::new(
///     DesignVector::new(30.0, 2.0, 10.0),
///     ObjectiveVector::new(50.0, 2400.0, 67.5),
///     Method::Evolutionary,
/// ));
/// assert_eq!(results.len(), 1);
/// assert_eq!(results.records()[0].method, Method::Evolutionary);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    candidates: Vec<Candidate>,
}

impl ResultSet {
    /// Creates an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(capacity),
        }
    }

    /// Appends a candidate.
    pub fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Indicates whether no candidate has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Returns the candidates in production order.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Iterates over the candidates in production order.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Returns the export rows in production order.
    #[must_use]
    pub fn records(&self) -> Vec<ExportRecord> {
        self.candidates.iter().map(Candidate::record).collect()
    }

    /// Returns the candidates produced by `method`, in order.
    pub fn by_method(&self, method: Method) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.origin() == method)
    }

    /// Returns a new set holding only candidates that no other candidate of
    /// this set dominates.
    ///
    /// This is an opt-in post-processing step; [`aggregate`] never filters.
    #[must_use]
    pub fn non_dominated(&self) -> Self {
        let oriented: Vec<[f64; OBJECTIVES]> = self
            .candidates
            .iter()
            .map(|candidate| candidate.objectives().to_minimization())
            .collect();
        let candidates = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                !oriented
                    .iter()
                    .enumerate()
                    .any(|(other, values)| other != *idx && dominates(values, &oriented[*idx]))
            })
            .map(|(_, candidate)| candidate.clone())
            .collect();
        Self { candidates }
    }
}

impl IntoIterator for ResultSet {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Concatenates the evolutionary and gradient result sets.
///
/// Order and origin tags are preserved and nothing is removed, not even
/// duplicates or dominated candidates.
///
/// # Examples
/// ```
/// use blade_mdo::{aggregate, ResultSet};
/// let merged = aggregate(ResultSet::new(), ResultSet::new());
/// assert!(merged.is_empty());
/// ```
#[must_use]
pub fn aggregate(evolutionary: ResultSet, gradient: ResultSet) -> ResultSet {
    let mut merged = ResultSet::with_capacity(evolutionary.len() + gradient.len());
    for candidate in evolutionary.into_iter().chain(gradient) {
        merged.push(candidate);
    }
    merged
}

/// Mean, minimum and maximum of each objective over one population.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveSummary {
    /// Per-objective mean.
    pub mean: ObjectiveVector,
    /// Per-objective minimum.
    pub min: ObjectiveVector,
    /// Per-objective maximum.
    pub max: ObjectiveVector,
}

impl ObjectiveSummary {
    /// Summarizes a non-empty slice of objective vectors. Returns `None`
    /// for an empty slice.
    #[must_use]
    pub fn from_objectives(values: &[ObjectiveVector]) -> Option<Self> {
        let first = values.first()?.to_array();
        let mut sum = [0.0; OBJECTIVES];
        let mut min = first;
        let mut max = first;
        for value in values {
            for (idx, component) in value.to_array().into_iter().enumerate() {
                sum[idx] += component;
                min[idx] = min[idx].min(component);
                max[idx] = max[idx].max(component);
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let count = values.len() as f64;
        let mean = sum.map(|total| total / count);
        Some(Self {
            mean: ObjectiveVector::new(mean[0], mean[1], mean[2]),
            min: ObjectiveVector::new(min[0], min[1], min[2]),
            max: ObjectiveVector::new(max[0], max[1], max[2]),
        })
    }
}

/// Time-series metrics captured during an evolutionary run.
///
/// # Examples
/// ```
/// use blade_mdo::RunStats;
/// let stats = RunStats::new();
/// assert_eq!(stats.generations(), 0);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Objective summary of the population after each generation.
    pub objectives: Vec<ObjectiveSummary>,
    /// Size of the first front after each generation.
    pub first_front_size: Vec<usize>,
    /// Design-space diversity of the population after each generation.
    pub population_diversity: Vec<f64>,
}

impl RunStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of generations recorded.
    #[must_use]
    pub fn generations(&self) -> usize {
        self.objectives.len()
    }
}

/// Metadata describing an executed run.
///
/// # Examples
/// ```
/// use blade_mdo::ExperimentMetadata;
/// let metadata = ExperimentMetadata::new(10, Some(7), "StdRng");
/// assert_eq!(metadata.iterations, 10);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentMetadata {
    /// Generations or trials executed.
    pub iterations: usize,
    /// Seed recorded by the caller, if any.
    pub rng_seed: Option<u64>,
    /// Description of the random source.
    pub rng_description: String,
}

impl ExperimentMetadata {
    /// Creates a metadata record.
    #[must_use]
    pub fn new(iterations: usize, rng_seed: Option<u64>, rng_description: impl Into<String>) -> Self {
        Self {
            iterations,
            rng_seed,
            rng_description: rng_description.into(),
        }
    }
}
