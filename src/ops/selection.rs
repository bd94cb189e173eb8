//! Parent selection over front rank and crowding distance.

use rand::{Rng, RngCore};
use std::cmp::Ordering;

/// Position of an individual in the non-dominated ordering.
///
/// # Examples
/// ```
/// use blade_mdo::ops::Rank;
/// use std::cmp::Ordering;
///
/// let front0 = Rank::new(0, 1.0);
/// let front1 = Rank::new(1, f64::INFINITY);
/// assert_eq!(front0.crowded_cmp(&front1), Ordering::Less);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rank {
    /// Index of the non-dominated front, 0 being the best.
    pub front: usize,
    /// Crowding distance within that front.
    pub crowding: f64,
}

impl Rank {
    /// Creates a rank.
    #[must_use]
    pub fn new(front: usize, crowding: f64) -> Self {
        Self { front, crowding }
    }

    /// Crowded-comparison order: lower front first, then larger crowding
    /// distance. `Less` means `self` is preferred.
    #[must_use]
    pub fn crowded_cmp(&self, other: &Self) -> Ordering {
        self.front
            .cmp(&other.front)
            .then_with(|| other.crowding.total_cmp(&self.crowding))
    }
}

/// Chooses a parent index from a ranked population.
pub trait SelectionOperator: Send + Sync {
    /// Returns the index of the selected parent, or `None` for an empty
    /// population.
    fn select_index(&self, ranks: &[Rank], rng: &mut dyn RngCore) -> Option<usize>;

    /// Samples two parents.
    fn select_pair(&self, ranks: &[Rank], rng: &mut dyn RngCore) -> Option<(usize, usize)> {
        let first = self.select_index(ranks, rng)?;
        let second = self.select_index(ranks, rng)?;
        Some((first, second))
    }
}

impl<T: SelectionOperator + ?Sized> SelectionOperator for Box<T> {
    fn select_index(&self, ranks: &[Rank], rng: &mut dyn RngCore) -> Option<usize> {
        (**self).select_index(ranks, rng)
    }
}

/// Binary tournament using the crowded-comparison operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrowdedTournament;

impl SelectionOperator for CrowdedTournament {
    fn select_index(&self, ranks: &[Rank], rng: &mut dyn RngCore) -> Option<usize> {
        match ranks.len() {
            0 => None,
            1 => Some(0),
            len => {
                let first = random_index(len, rng);
                let mut second = random_index(len, rng);
                while second == first {
                    second = random_index(len, rng);
                }
                if ranks[second].crowded_cmp(&ranks[first]) == Ordering::Less {
                    Some(second)
                } else {
                    Some(first)
                }
            }
        }
    }
}

fn random_index(len: usize, rng: &mut dyn RngCore) -> usize {
    rng.gen_range(0..len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn lower_front_wins() {
        let ranks = [Rank::new(1, f64::INFINITY), Rank::new(0, 0.1)];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(CrowdedTournament.select_index(&ranks, &mut rng), Some(1));
        }
    }

    #[test]
    fn crowding_breaks_ties() {
        let ranks = [Rank::new(0, 0.2), Rank::new(0, 0.9)];
        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(CrowdedTournament.select_index(&ranks, &mut rng), Some(1));
    }

    #[test]
    fn empty_and_singleton_populations() {
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(CrowdedTournament.select_index(&[], &mut rng), None);
        assert_eq!(
            CrowdedTournament.select_index(&[Rank::new(3, 0.0)], &mut rng),
            Some(0)
        );
    }

    #[test]
    fn select_pair_returns_valid_indices() {
        let ranks = [Rank::new(0, 1.0), Rank::new(0, 2.0), Rank::new(1, 3.0)];
        let mut rng = StdRng::seed_from_u64(10);
        let (first, second) = CrowdedTournament.select_pair(&ranks, &mut rng).unwrap();
        assert!(first < 3 && second < 3);
        assert_ne!(first, 2);
        assert_ne!(second, 2);
    }

    #[test]
    fn random_index_covers_the_whole_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [0usize; 3];
        for _ in 0..300 {
            seen[random_index(3, &mut rng)] += 1;
        }
        assert!(seen.iter().all(|count| *count > 50));
    }
}
