//! NSGA-II exploration of the blade trade-off surface.
//!
//! The [`Nsga2`] engine evolves a fixed-size population of designs for a
//! fixed number of generations using crowded binary tournaments, simulated
//! binary crossover and polynomial mutation, with elitist (μ + λ) survival.
//! Every generation is a fresh, immutable [`Generation`] built from the
//! previous one, so intermediate states can be observed and tested through
//! [`Nsga2::run_with_observer`].

use crate::core::experiment::{
    Candidate, ExperimentMetadata, Method, ObjectiveSummary, ResultSet, RunStats,
};
use crate::core::{
    dominates, population_diversity, BoundsError, DesignBounds, DesignVector, Genes,
    ObjectiveVector, OBJECTIVES,
};
use crate::objective::BladeProblem;
use crate::ops::{
    check_probability, random_unit, CrossoverOperator, CrowdedTournament, MultiObjectiveProblem,
    MutationOperator, OperatorError, PolynomialMutation, ProblemError, Rank, SelectionOperator,
    SimulatedBinaryCrossover,
};
use rand::Rng;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, info};

/// Settings of an evolutionary run.
///
/// # Examples
/// ```
/// let settings = blade_mdo::EvolutionarySettings::default();
/// assert_eq!(settings.population_size, 200);
/// assert_eq!(settings.generations, 100);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionarySettings {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generations to run.
    pub generations: usize,
    /// Probability that a parent pair is recombined.
    pub crossover_probability: f64,
    /// Probability that a child is mutated.
    pub mutation_probability: f64,
    /// SBX distribution index.
    pub crossover_eta: f64,
    /// Polynomial mutation distribution index.
    pub mutation_eta: f64,
}

impl Default for EvolutionarySettings {
    fn default() -> Self {
        Self {
            population_size: 200,
            generations: 100,
            crossover_probability: 0.7,
            mutation_probability: 0.3,
            crossover_eta: 20.0,
            mutation_eta: 20.0,
        }
    }
}

/// Errors produced by the [`Nsga2`] engine.
#[derive(Debug)]
pub enum Nsga2Error {
    /// Population size must be greater than zero.
    InvalidPopulationSize(usize),
    /// Number of generations must be at least one.
    InvalidGenerationCount(usize),
    /// A variation probability was outside `[0, 1]`.
    InvalidProbability {
        /// Name of the setting.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The design bounds are inconsistent.
    Bounds(BoundsError),
    /// A default operator rejected its parameters.
    Operator(OperatorError),
    /// The selection operator returned no parent, or an index outside a
    /// population of the given size.
    Selection(usize),
    /// A design could not be evaluated.
    Problem(ProblemError),
}

impl Display for Nsga2Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPopulationSize(size) => write!(
                f,
                "population size must be greater than zero (received {size})"
            ),
            Self::InvalidGenerationCount(count) => write!(
                f,
                "number of generations must be positive (received {count})"
            ),
            Self::InvalidProbability { parameter, value } => {
                write!(f, "{parameter} must be within [0, 1] (received {value})")
            }
            Self::Bounds(err) => write!(f, "{err}"),
            Self::Operator(err) => write!(f, "{err}"),
            Self::Selection(population) => write!(
                f,
                "selection operator produced no valid parent from a population of {population}"
            ),
            Self::Problem(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Nsga2Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bounds(err) => Some(err),
            Self::Operator(err) => Some(err),
            Self::Problem(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BoundsError> for Nsga2Error {
    fn from(err: BoundsError) -> Self {
        Self::Bounds(err)
    }
}

impl From<OperatorError> for Nsga2Error {
    fn from(err: OperatorError) -> Self {
        Self::Operator(err)
    }
}

impl From<ProblemError> for Nsga2Error {
    fn from(err: ProblemError) -> Self {
        Self::Problem(err)
    }
}

/// Evaluated member of a [`Generation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    genes: Genes,
    oriented: [f64; OBJECTIVES],
    rank: Rank,
}

impl Individual {
    /// Design variables.
    #[must_use]
    pub fn genes(&self) -> &Genes {
        &self.genes
    }

    /// Minimization-oriented objective values used for ranking.
    #[must_use]
    pub fn oriented_objectives(&self) -> &[f64; OBJECTIVES] {
        &self.oriented
    }

    /// Objective values in natural units.
    #[must_use]
    pub fn objectives(&self) -> ObjectiveVector {
        ObjectiveVector::from_minimization(self.oriented)
    }

    /// Front rank and crowding distance within the generation.
    #[must_use]
    pub fn rank(&self) -> Rank {
        self.rank
    }

    fn to_candidate(&self) -> Candidate {
        Candidate::new(
            DesignVector::from(self.genes),
            self.objectives(),
            Method::Evolutionary,
        )
    }
}

/// One immutable generation of the evolutionary search.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    index: usize,
    individuals: Vec<Individual>,
}

impl Generation {
    fn from_evaluated(index: usize, members: Vec<(Genes, [f64; OBJECTIVES])>) -> Self {
        let oriented: Vec<[f64; OBJECTIVES]> = members.iter().map(|(_, values)| *values).collect();
        let mut ranks = vec![Rank::new(0, 0.0); members.len()];
        for (front_idx, front) in non_dominated_fronts(&oriented).iter().enumerate() {
            for (&member, crowding) in front.iter().zip(crowding_distances(&oriented, front)) {
                ranks[member] = Rank::new(front_idx, crowding);
            }
        }
        let individuals = members
            .into_iter()
            .zip(ranks)
            .map(|((genes, oriented), rank)| Individual {
                genes,
                oriented,
                rank,
            })
            .collect();
        Self { index, individuals }
    }

    /// Generation counter, 0 being the initial population.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Members of the generation.
    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Indicates an empty generation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Members of the first non-dominated front.
    pub fn first_front(&self) -> impl Iterator<Item = &Individual> {
        self.individuals
            .iter()
            .filter(|individual| individual.rank.front == 0)
    }

    fn ranks(&self) -> Vec<Rank> {
        self.individuals.iter().map(Individual::rank).collect()
    }

    fn summary(&self) -> Option<ObjectiveSummary> {
        let objectives: Vec<ObjectiveVector> =
            self.individuals.iter().map(Individual::objectives).collect();
        ObjectiveSummary::from_objectives(&objectives)
    }
}

/// Report returned by [`Nsga2::run`].
#[derive(Debug, Clone)]
pub struct Nsga2Report {
    /// Final population, tagged [`Method::Evolutionary`], in population order.
    pub results: ResultSet,
    /// Non-dominated designs collected across all generations, capped at the
    /// population size.
    pub archive: ResultSet,
    /// Per-generation statistics.
    pub stats: RunStats,
    /// Run metadata.
    pub metadata: ExperimentMetadata,
}

/// Builder used to configure an [`Nsga2`] engine.
pub struct Nsga2Builder<P> {
    problem: P,
    settings: EvolutionarySettings,
    crossover: Option<Box<dyn CrossoverOperator>>,
    mutation: Option<Box<dyn MutationOperator>>,
    selection: Option<Box<dyn SelectionOperator>>,
}

impl<P> Nsga2Builder<P>
where
    P: MultiObjectiveProblem,
{
    /// Replaces all numeric settings at once.
    #[must_use]
    pub fn settings(mut self, settings: EvolutionarySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Configures the population size.
    #[must_use]
    pub fn population_size(mut self, size: usize) -> Self {
        self.settings.population_size = size;
        self
    }

    /// Configures the number of generations.
    #[must_use]
    pub fn generations(mut self, generations: usize) -> Self {
        self.settings.generations = generations;
        self
    }

    /// Configures the crossover probability.
    #[must_use]
    pub fn crossover_probability(mut self, probability: f64) -> Self {
        self.settings.crossover_probability = probability;
        self
    }

    /// Configures the mutation probability.
    #[must_use]
    pub fn mutation_probability(mut self, probability: f64) -> Self {
        self.settings.mutation_probability = probability;
        self
    }

    /// Replaces the crossover operator.
    #[must_use]
    pub fn crossover(mut self, operator: impl CrossoverOperator + 'static) -> Self {
        self.crossover = Some(Box::new(operator));
        self
    }

    /// Replaces the mutation operator.
    #[must_use]
    pub fn mutation(mut self, operator: impl MutationOperator + 'static) -> Self {
        self.mutation = Some(Box::new(operator));
        self
    }

    /// Replaces the parent selection operator.
    #[must_use]
    pub fn selection(mut self, operator: impl SelectionOperator + 'static) -> Self {
        self.selection = Some(Box::new(operator));
        self
    }

    /// Validates the configuration and builds the engine.
    ///
    /// # Errors
    /// Returns [`Nsga2Error`] for a zero population or generation count, a
    /// probability outside `[0, 1]`, invalid bounds or invalid operator
    /// parameters.
    pub fn build(self) -> Result<Nsga2<P>, Nsga2Error> {
        let settings = self.settings;
        if settings.population_size == 0 {
            return Err(Nsga2Error::InvalidPopulationSize(settings.population_size));
        }
        if settings.generations == 0 {
            return Err(Nsga2Error::InvalidGenerationCount(settings.generations));
        }
        for (parameter, value) in [
            ("crossover probability", settings.crossover_probability),
            ("mutation probability", settings.mutation_probability),
        ] {
            if check_probability(parameter, value).is_err() {
                return Err(Nsga2Error::InvalidProbability { parameter, value });
            }
        }
        let bounds = *self.problem.bounds();
        bounds.validate()?;
        let crossover: Box<dyn CrossoverOperator> = match self.crossover {
            Some(operator) => operator,
            None => Box::new(SimulatedBinaryCrossover::new(settings.crossover_eta)?),
        };
        let mutation: Box<dyn MutationOperator> = match self.mutation {
            Some(operator) => operator,
            None => Box::new(PolynomialMutation::new(bounds, settings.mutation_eta)?),
        };
        let selection: Box<dyn SelectionOperator> = match self.selection {
            Some(operator) => operator,
            None => Box::new(CrowdedTournament),
        };
        Ok(Nsga2 {
            problem: self.problem,
            bounds,
            settings,
            crossover,
            mutation,
            selection,
        })
    }
}

/// NSGA-II engine.
///
/// # Examples
/// ```
/// use blade_mdo::{BladeProblem, DesignBounds, Method, Nsga2};
/// use rand::SeedableRng;
///
/// let mut engine = Nsga2::builder(BladeProblem::new(DesignBounds::default()))
///     .population_size(16)
///     .generations(5)
///     .build()
///     .unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let report = engine.run(&mut rng).unwrap();
/// assert_eq!(report.results.len(), 16);
/// assert!(report.results.iter().all(|c| c.origin() == Method::Evolutionary));
/// ```
pub struct Nsga2<P> {
    problem: P,
    bounds: DesignBounds,
    settings: EvolutionarySettings,
    crossover: Box<dyn CrossoverOperator>,
    mutation: Box<dyn MutationOperator>,
    selection: Box<dyn SelectionOperator>,
}

impl<P> Nsga2<P>
where
    P: MultiObjectiveProblem,
{
    /// Creates a builder with the default [`EvolutionarySettings`].
    #[must_use]
    pub fn builder(problem: P) -> Nsga2Builder<P> {
        Nsga2Builder {
            problem,
            settings: EvolutionarySettings::default(),
            crossover: None,
            mutation: None,
            selection: None,
        }
    }

    /// Settings the engine was built with.
    #[must_use]
    pub fn settings(&self) -> &EvolutionarySettings {
        &self.settings
    }

    /// Runs the configured number of generations.
    ///
    /// # Errors
    /// Returns [`Nsga2Error::Problem`] when a design cannot be evaluated.
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> Result<Nsga2Report, Nsga2Error> {
        self.run_with_observer(rng, |_| {})
    }

    /// Runs the search and hands every generation, the initial population
    /// included, to `observer` once it is complete.
    ///
    /// # Errors
    /// Returns [`Nsga2Error::Problem`] when a design cannot be evaluated.
    pub fn run_with_observer<R, F>(
        &mut self,
        rng: &mut R,
        mut observer: F,
    ) -> Result<Nsga2Report, Nsga2Error>
    where
        R: Rng,
        F: FnMut(&Generation),
    {
        let size = self.settings.population_size;
        info!(
            population_size = size,
            generations = self.settings.generations,
            "starting evolutionary search"
        );
        let initial: Vec<Genes> = (0..size).map(|_| self.bounds.sample(rng)).collect();
        let mut current = Generation::from_evaluated(0, self.evaluate_all(initial)?);
        let mut stats = RunStats::new();
        let mut archive = ParetoArchive::new(size);
        archive.absorb(&current);
        observer(&current);

        for index in 1..=self.settings.generations {
            let offspring = self.offspring(&current, rng)?;
            let offspring = self.evaluate_all(offspring)?;
            let next = Self::survivors(index, &current, offspring, size);
            archive.absorb(&next);
            Self::record(&mut stats, &next);
            observer(&next);
            current = next;
        }

        let mut results = ResultSet::new();
        for individual in current.individuals() {
            results.push(individual.to_candidate());
        }
        info!(
            candidates = results.len(),
            archive = archive.members.len(),
            "evolutionary search finished"
        );
        Ok(Nsga2Report {
            results,
            archive: archive.into_result_set(),
            stats,
            metadata: ExperimentMetadata::new(
                self.settings.generations,
                None,
                std::any::type_name::<R>(),
            ),
        })
    }

    fn evaluate_all(
        &mut self,
        designs: Vec<Genes>,
    ) -> Result<Vec<(Genes, [f64; OBJECTIVES])>, Nsga2Error> {
        let mut evaluated = Vec::with_capacity(designs.len());
        for genes in designs {
            let objectives = self.problem.evaluate(&genes)?;
            evaluated.push((genes, objectives));
        }
        Ok(evaluated)
    }

    fn offspring<R: Rng>(
        &self,
        parents: &Generation,
        rng: &mut R,
    ) -> Result<Vec<Genes>, Nsga2Error> {
        let size = self.settings.population_size;
        let ranks = parents.ranks();
        let parent = |idx: usize| {
            parents
                .individuals
                .get(idx)
                .map(|individual| individual.genes)
                .ok_or(Nsga2Error::Selection(parents.len()))
        };
        let mut children = Vec::with_capacity(size);
        while children.len() < size {
            let (first, second) = self
                .selection
                .select_pair(&ranks, rng)
                .ok_or(Nsga2Error::Selection(parents.len()))?;
            let mut child_a = parent(first)?;
            let mut child_b = parent(second)?;
            if random_unit(rng) < self.settings.crossover_probability {
                (child_a, child_b) = self.crossover.crossover(&child_a, &child_b, rng);
            }
            for child in [&mut child_a, &mut child_b] {
                if random_unit(rng) < self.settings.mutation_probability {
                    *child = self.mutation.mutate(child, rng);
                }
                self.problem.clamp_to_domain(child);
            }
            children.push(child_a);
            if children.len() < size {
                children.push(child_b);
            }
        }
        Ok(children)
    }

    fn survivors(
        index: usize,
        parents: &Generation,
        offspring: Vec<(Genes, [f64; OBJECTIVES])>,
        size: usize,
    ) -> Generation {
        let mut combined: Vec<(Genes, [f64; OBJECTIVES])> = parents
            .individuals
            .iter()
            .map(|individual| (individual.genes, individual.oriented))
            .collect();
        combined.extend(offspring);
        let oriented: Vec<[f64; OBJECTIVES]> = combined.iter().map(|(_, values)| *values).collect();
        let mut kept = Vec::with_capacity(size);
        for front in non_dominated_fronts(&oriented) {
            if kept.len() + front.len() <= size {
                kept.extend(front);
                if kept.len() == size {
                    break;
                }
                continue;
            }
            let remaining = size - kept.len();
            kept.extend(most_isolated(&oriented, &front, remaining));
            break;
        }
        let members = kept.into_iter().map(|idx| combined[idx]).collect();
        Generation::from_evaluated(index, members)
    }

    fn record(stats: &mut RunStats, generation: &Generation) {
        let designs: Vec<Genes> = generation
            .individuals
            .iter()
            .map(|individual| individual.genes)
            .collect();
        let diversity = population_diversity(&designs);
        let first_front = generation.first_front().count();
        if let Some(summary) = generation.summary() {
            debug!(
                generation = generation.index,
                first_front,
                diversity,
                mean_aep = summary.mean.aep,
                max_aep = summary.max.aep,
                min_mass = summary.min.mass,
                min_fatigue = summary.min.fatigue,
                "generation complete"
            );
            stats.objectives.push(summary);
        }
        stats.first_front_size.push(first_front);
        stats.population_diversity.push(diversity);
    }
}

/// Runs NSGA-II over the blade problem with the given settings.
///
/// # Errors
/// Returns [`Nsga2Error`] for invalid settings or bounds.
///
/// # Examples
/// ```
/// use blade_mdo::{run_evolutionary, DesignBounds, EvolutionarySettings};
/// use rand::SeedableRng;
///
/// let settings = EvolutionarySettings { population_size: 10, generations: 3, ..Default::default() };
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// let report = run_evolutionary(DesignBounds::default(), &settings, &mut rng).unwrap();
/// assert_eq!(report.results.len(), 10);
/// ```
pub fn run_evolutionary<R: Rng>(
    bounds: DesignBounds,
    settings: &EvolutionarySettings,
    rng: &mut R,
) -> Result<Nsga2Report, Nsga2Error> {
    Nsga2::builder(BladeProblem::new(bounds))
        .settings(settings.clone())
        .build()?
        .run(rng)
}

/// Bounded set of mutually non-dominated designs seen during a run.
struct ParetoArchive {
    capacity: usize,
    members: Vec<(Genes, [f64; OBJECTIVES])>,
}

impl ParetoArchive {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            members: Vec::new(),
        }
    }

    fn absorb(&mut self, generation: &Generation) {
        let mut pool = std::mem::take(&mut self.members);
        for individual in generation.first_front() {
            if !pool.iter().any(|(genes, _)| *genes == individual.genes) {
                pool.push((individual.genes, individual.oriented));
            }
        }
        let oriented: Vec<[f64; OBJECTIVES]> = pool.iter().map(|(_, values)| *values).collect();
        let Some(front) = non_dominated_fronts(&oriented).into_iter().next() else {
            return;
        };
        let mut kept = if front.len() > self.capacity {
            most_isolated(&oriented, &front, self.capacity)
        } else {
            front
        };
        kept.sort_unstable();
        self.members = kept.into_iter().map(|idx| pool[idx]).collect();
    }

    fn into_result_set(self) -> ResultSet {
        let mut results = ResultSet::new();
        for (genes, oriented) in self.members {
            results.push(Candidate::new(
                DesignVector::from(genes),
                ObjectiveVector::from_minimization(oriented),
                Method::Evolutionary,
            ));
        }
        results
    }
}

/// Partitions `objectives` into non-dominated fronts, best first.
pub(crate) fn non_dominated_fronts(objectives: &[[f64; OBJECTIVES]]) -> Vec<Vec<usize>> {
    let size = objectives.len();
    let mut domination_counts = vec![0usize; size];
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); size];
    let mut current = Vec::new();
    for p in 0..size {
        for q in (p + 1)..size {
            if dominates(&objectives[p], &objectives[q]) {
                dominated[p].push(q);
                domination_counts[q] += 1;
            } else if dominates(&objectives[q], &objectives[p]) {
                dominated[q].push(p);
                domination_counts[p] += 1;
            }
        }
    }
    for (p, &count) in domination_counts.iter().enumerate() {
        if count == 0 {
            current.push(p);
        }
    }
    let mut fronts = Vec::new();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominated[p] {
                domination_counts[q] -= 1;
                if domination_counts[q] == 0 {
                    next.push(q);
                }
            }
        }
        fronts.push(current);
        current = next;
    }
    fronts
}

/// The `count` members of `front` with the largest crowding distance.
fn most_isolated(objectives: &[[f64; OBJECTIVES]], front: &[usize], count: usize) -> Vec<usize> {
    let crowding = crowding_distances(objectives, front);
    let mut order: Vec<usize> = (0..front.len()).collect();
    order.sort_by(|&a, &b| crowding[b].total_cmp(&crowding[a]));
    order
        .into_iter()
        .take(count)
        .map(|position| front[position])
        .collect()
}

/// Crowding distance of each member of `front`, in the same order.
pub(crate) fn crowding_distances(objectives: &[[f64; OBJECTIVES]], front: &[usize]) -> Vec<f64> {
    let len = front.len();
    if len <= 2 {
        return vec![f64::INFINITY; len];
    }
    let mut distances = vec![0.0; len];
    let mut order: Vec<usize> = (0..len).collect();
    for axis in 0..OBJECTIVES {
        order.sort_by(|&a, &b| objectives[front[a]][axis].total_cmp(&objectives[front[b]][axis]));
        let first = order[0];
        let last = order[len - 1];
        distances[first] = f64::INFINITY;
        distances[last] = f64::INFINITY;
        let range = objectives[front[last]][axis] - objectives[front[first]][axis];
        if range.abs() < f64::EPSILON {
            continue;
        }
        for window in order.windows(3) {
            let (prev, current, next) = (window[0], window[1], window[2]);
            if distances[current].is_finite() {
                distances[current] +=
                    (objectives[front[next]][axis] - objectives[front[prev]][axis]) / range;
            }
        }
    }
    distances
}
