use crate::data::Candidate;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    #[error("expected {expected} advisors, got {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("unknown advisor '{0}'")]
    Unknown(String),
    #[error("advisor '{0}' appears more than once")]
    Duplicate(String),
    #[error("cannot move row {from} to {to} in a ranking of {len}")]
    OutOfBounds { from: usize, to: usize, len: usize },
}

/// Where the initial order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    Restored,
    Shuffled,
}

/// A permutation of candidate identifiers, first choice first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking(Vec<String>);

impl Ranking {
    pub fn shuffled<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> Self {
        let mut ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        ids.shuffle(rng);
        Self(ids)
    }

    /// Accepts `order` only if it is a permutation of `expected`.
    pub fn validated(order: Vec<String>, expected: &HashSet<String>) -> Result<Self, RankingError> {
        if order.len() != expected.len() {
            return Err(RankingError::LengthMismatch {
                expected: expected.len(),
                found: order.len(),
            });
        }

        let mut seen = HashSet::with_capacity(order.len());
        for id in &order {
            if !expected.contains(id) {
                return Err(RankingError::Unknown(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(RankingError::Duplicate(id.clone()));
            }
        }

        Ok(Self(order))
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The order a drag from `from` to `to` would produce. Does not mutate.
    pub fn moved(&self, from: usize, to: usize) -> Result<Vec<String>, RankingError> {
        let len = self.0.len();
        if from >= len || to >= len {
            return Err(RankingError::OutOfBounds { from, to, len });
        }
        let mut order = self.0.clone();
        let item = order.remove(from);
        order.insert(to, item);
        Ok(order)
    }
}

pub fn candidate_ids(candidates: &[Candidate]) -> HashSet<String> {
    candidates.iter().map(|c| c.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn candidates(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| Candidate {
                id: id.to_string(),
                capacity: String::new(),
                tags: Vec::new(),
            })
            .collect()
    }

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn shuffled_is_a_permutation() {
        let list = candidates(&["A", "B", "C", "D", "E", "F"]);
        let expected = candidate_ids(&list);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ranking = Ranking::shuffled(&list, &mut rng);
            assert!(Ranking::validated(ranking.ids().to_vec(), &expected).is_ok());
        }
    }

    #[test]
    fn shuffled_reaches_every_first_position() {
        let list = candidates(&["A", "B", "C"]);
        let mut firsts = HashSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            firsts.insert(Ranking::shuffled(&list, &mut rng).ids()[0].clone());
        }
        assert_eq!(firsts.len(), 3);
    }

    #[test]
    fn shuffled_orders_are_roughly_uniform() {
        let list = candidates(&["A", "B", "C"]);
        let mut rng = StdRng::seed_from_u64(2026);
        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();
        for _ in 0..6000 {
            let ranking = Ranking::shuffled(&list, &mut rng);
            *counts.entry(ranking.ids().to_vec()).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        for (order, count) in &counts {
            assert!(
                (850..=1150).contains(count),
                "{order:?} appeared {count} times"
            );
        }
    }

    #[test]
    fn validation_rejects_wrong_length_and_unknown_ids() {
        let expected = candidate_ids(&candidates(&["A", "B", "C"]));

        assert_eq!(
            Ranking::validated(order(&["A", "B"]), &expected),
            Err(RankingError::LengthMismatch {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            Ranking::validated(order(&["A", "B", "D"]), &expected),
            Err(RankingError::Unknown("D".to_owned()))
        );
        assert_eq!(
            Ranking::validated(order(&["A", "A", "B"]), &expected),
            Err(RankingError::Duplicate("A".to_owned()))
        );

        let accepted = Ranking::validated(order(&["C", "A", "B"]), &expected).unwrap();
        assert_eq!(accepted.ids(), order(&["C", "A", "B"]).as_slice());
    }

    #[test]
    fn moved_shifts_rows_between() {
        let expected = candidate_ids(&candidates(&["A", "B", "C", "D"]));
        let ranking = Ranking::validated(order(&["A", "B", "C", "D"]), &expected).unwrap();

        assert_eq!(ranking.moved(0, 2).unwrap(), order(&["B", "C", "A", "D"]));
        assert_eq!(ranking.moved(3, 0).unwrap(), order(&["D", "A", "B", "C"]));
        assert_eq!(ranking.moved(1, 1).unwrap(), order(&["A", "B", "C", "D"]));
        assert!(ranking.moved(4, 0).is_err());
    }
}
