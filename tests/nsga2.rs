use blade_mdo::ops::{
    BlendAlphaCrossover, MultiObjectiveProblem, PolynomialMutation, ProblemBounds, ProblemError,
    ProblemResult, Rank, SelectionOperator,
};
use blade_mdo::{dominates, DesignBounds, Genes, Method, Nsga2, Nsga2Error};
use rand::{RngCore, SeedableRng};

struct PlaneFront {
    bounds: DesignBounds,
}

impl ProblemBounds for PlaneFront {
    fn bounds(&self) -> &DesignBounds {
        &self.bounds
    }
}

impl MultiObjectiveProblem for PlaneFront {
    fn evaluate(&mut self, genes: &Genes) -> ProblemResult<[f64; 3]> {
        Ok([genes[0], genes[1], 2.0 - genes[0] - genes[1] + genes[2]])
    }
}

struct Exploding {
    bounds: DesignBounds,
    remaining: usize,
}

impl ProblemBounds for Exploding {
    fn bounds(&self) -> &DesignBounds {
        &self.bounds
    }
}

impl MultiObjectiveProblem for Exploding {
    fn evaluate(&mut self, genes: &Genes) -> ProblemResult<[f64; 3]> {
        if self.remaining == 0 {
            return Err(ProblemError::Domain {
                variable: "max_chord",
                value: genes[1],
            });
        }
        self.remaining -= 1;
        Ok(*genes)
    }
}

fn unit_box() -> DesignBounds {
    DesignBounds::new([0.0; 3], [1.0; 3])
}

#[test]
fn nsga2_finds_non_dominated_solutions() {
    let problem = PlaneFront { bounds: unit_box() };
    let mut engine = Nsga2::builder(problem)
        .population_size(12)
        .generations(8)
        .build()
        .unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(13);
    let report = engine.run(&mut rng).unwrap();
    assert_eq!(report.results.len(), 12);
    assert_eq!(report.stats.generations(), 8);
    assert!(!report.archive.is_empty());
    let archived: Vec<[f64; 3]> = report
        .archive
        .iter()
        .map(|candidate| candidate.design().to_array())
        .collect();
    for (idx, genes) in archived.iter().enumerate() {
        let objectives = [genes[0], genes[1], 2.0 - genes[0] - genes[1] + genes[2]];
        for (other_idx, other) in archived.iter().enumerate() {
            if idx == other_idx {
                continue;
            }
            let other_objectives = [other[0], other[1], 2.0 - other[0] - other[1] + other[2]];
            assert!(
                !dominates(&other_objectives, &objectives),
                "solution {other_idx} dominates {idx}: {other:?} vs {genes:?}"
            );
        }
    }
}

#[test]
fn offspring_never_leave_the_box() {
    let bounds = unit_box();
    let mut engine = Nsga2::builder(PlaneFront { bounds })
        .population_size(16)
        .generations(10)
        .mutation_probability(1.0)
        .build()
        .unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(14);
    engine
        .run_with_observer(&mut rng, |generation| {
            for individual in generation.individuals() {
                assert!(bounds.contains_genes(individual.genes()));
            }
        })
        .unwrap();
}

#[test]
fn evaluation_failure_aborts_the_run() {
    let problem = Exploding {
        bounds: unit_box(),
        remaining: 20,
    };
    let mut engine = Nsga2::builder(problem)
        .population_size(10)
        .generations(5)
        .build()
        .unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(15);
    let err = engine.run(&mut rng).err().unwrap();
    assert!(matches!(err, Nsga2Error::Problem(ProblemError::Domain { .. })));
}

#[test]
fn results_are_tagged_evolutionary() {
    let mut engine = Nsga2::builder(PlaneFront { bounds: unit_box() })
        .population_size(8)
        .generations(2)
        .build()
        .unwrap();
    let report = engine
        .run(&mut rand::rngs::StdRng::seed_from_u64(16))
        .unwrap();
    assert!(report.results.iter().all(|c| c.origin() == Method::Evolutionary));
    assert!(report.archive.iter().all(|c| c.origin() == Method::Evolutionary));
}

#[test]
fn custom_operators_can_be_plugged_in() {
    let bounds = unit_box();
    let mut engine = Nsga2::builder(PlaneFront { bounds })
        .population_size(10)
        .generations(5)
        .crossover(BlendAlphaCrossover::new(0.5, bounds).unwrap())
        .mutation(PolynomialMutation::with_gene_probability(bounds, 5.0, 1.0).unwrap())
        .build()
        .unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(17);
    let report = engine.run(&mut rng).unwrap();
    assert_eq!(report.results.len(), 10);
    assert!(report
        .results
        .iter()
        .all(|candidate| bounds.contains(candidate.design())));
}

struct NoParent;

impl SelectionOperator for NoParent {
    fn select_index(&self, _ranks: &[Rank], _rng: &mut dyn RngCore) -> Option<usize> {
        None
    }
}

struct PastTheEnd;

impl SelectionOperator for PastTheEnd {
    fn select_index(&self, ranks: &[Rank], _rng: &mut dyn RngCore) -> Option<usize> {
        Some(ranks.len())
    }
}

#[test]
fn selection_without_a_parent_aborts_the_run() {
    let mut engine = Nsga2::builder(PlaneFront { bounds: unit_box() })
        .population_size(10)
        .generations(3)
        .selection(NoParent)
        .build()
        .unwrap();
    let err = engine
        .run(&mut rand::rngs::StdRng::seed_from_u64(18))
        .err()
        .unwrap();
    assert!(matches!(err, Nsga2Error::Selection(10)));
    assert!(err.to_string().contains("10"));
}

#[test]
fn selection_outside_the_population_aborts_the_run() {
    let mut engine = Nsga2::builder(PlaneFront { bounds: unit_box() })
        .population_size(6)
        .generations(2)
        .selection(PastTheEnd)
        .build()
        .unwrap();
    let err = engine
        .run(&mut rand::rngs::StdRng::seed_from_u64(19))
        .err()
        .unwrap();
    assert!(matches!(err, Nsga2Error::Selection(6)));
}
