use cogbat_core::{Trial, TrialType};
use rand::Rng;
use rand::seq::SliceRandom;

/// Ordered trial specifications sharing a block number and trial type.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<S> {
    /// 1-based, as written to the sheet.
    pub index: usize,
    pub trial_type: TrialType,
    pub specs: Vec<S>,
}

impl<S: Clone> Block<S> {
    /// Every spec in `pool`, in random order.
    pub fn shuffled<R: Rng + ?Sized>(
        index: usize,
        trial_type: TrialType,
        mut pool: Vec<S>,
        rng: &mut R,
    ) -> Self {
        pool.shuffle(rng);
        Self {
            index,
            trial_type,
            specs: pool,
        }
    }

    /// Curated lists that must run in the given order.
    pub fn fixed(index: usize, trial_type: TrialType, specs: Vec<S>) -> Self {
        Self {
            index,
            trial_type,
            specs,
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn trials(&self) -> impl Iterator<Item = Trial<S>> + '_ {
        let block_len = self.specs.len();
        self.specs.iter().enumerate().map(move |(index, spec)| Trial {
            spec: spec.clone(),
            block: self.index,
            trial_type: self.trial_type,
            index,
            block_len,
        })
    }

    /// Rewrites every spec, e.g. to draw a per-trial random value.
    pub fn map_with<U, F: FnMut(S) -> U>(self, f: F) -> Block<U> {
        Block {
            index: self.index,
            trial_type: self.trial_type,
            specs: self.specs.into_iter().map(f).collect(),
        }
    }
}

/// Factorial block: main blocks hold each combination `repetitions` times,
/// practice blocks keep the first half of the shuffled pool.
pub fn build_block<S: Clone, R: Rng + ?Sized>(
    combinations: &[S],
    repetitions: usize,
    trial_type: TrialType,
    index: usize,
    rng: &mut R,
) -> Block<S> {
    let pool: Vec<S> = (0..repetitions)
        .flat_map(|_| combinations.iter().cloned())
        .collect();
    let mut block = Block::shuffled(index, trial_type, pool, rng);
    if trial_type.is_practice() {
        let half = block.specs.len() / 2;
        block.specs.truncate(half);
    }
    tracing::debug!(
        index,
        trial_type = trial_type.label(),
        trials = block.len(),
        "block built"
    );
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn counts<S: std::hash::Hash + Eq + Clone>(specs: &[S]) -> HashMap<S, usize> {
        let mut m = HashMap::new();
        for s in specs {
            *m.entry(s.clone()).or_insert(0) += 1;
        }
        m
    }

    #[test]
    fn main_block_repeats_every_combination() {
        let combos: Vec<(u8, char)> = (0..3)
            .flat_map(|n| ['l', 'r'].into_iter().map(move |c| (n, c)))
            .collect();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let block = build_block(&combos, 2, TrialType::Main, 1, &mut rng);
            assert_eq!(block.len(), combos.len() * 2);
            let c = counts(&block.specs);
            assert_eq!(c.len(), combos.len());
            assert!(c.values().all(|&n| n == 2));
        }
    }

    #[test]
    fn practice_block_is_half_the_pool() {
        let combos: Vec<u32> = (0..48).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let block = build_block(&combos, 1, TrialType::Practice, 0, &mut rng);
        assert_eq!(block.len(), 24);
        assert!(block.specs.iter().all(|s| combos.contains(s)));
        assert!(counts(&block.specs).values().all(|&n| n == 1));
    }

    #[test]
    fn trials_carry_block_position() {
        let block = Block::fixed(2, TrialType::Main, vec!['a', 'b', 'c']);
        let trials: Vec<_> = block.trials().collect();
        assert_eq!(trials.len(), 3);
        assert_eq!(trials[1].index, 1);
        assert_eq!(trials[1].block, 2);
        assert!(trials[2].is_last_in_block());
        assert_eq!(trials[0].spec, 'a');
    }

    #[test]
    fn same_seed_same_order() {
        let combos: Vec<u32> = (0..10).collect();
        let a = build_block(&combos, 2, TrialType::Main, 1, &mut StdRng::seed_from_u64(9));
        let b = build_block(&combos, 2, TrialType::Main, 1, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
