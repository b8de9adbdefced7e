// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use rand::{
    Rng,
    seq::{IndexedRandom, SliceRandom},
};

/// Draws character suggestions from one role pool.
///
/// Each pass over the pool is a fresh random permutation, so a name is handed
/// out at most once until every name in the pool has been used. Demand beyond
/// the pool size starts another pass; duplicates only show up from that point.
/// This keeps suggestions varied without ever failing on a small pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolSampler<'a> {
    pool: &'a [String],
}

impl<'a> PoolSampler<'a> {
    pub fn new(pool: &'a [String]) -> Self {
        Self { pool }
    }

    /// Returns exactly `count` names, or none at all for an empty pool.
    pub fn draw<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<String> {
        if self.pool.is_empty() {
            return Vec::new();
        }

        let mut drawn = Vec::with_capacity(count);
        while drawn.len() < count {
            let mut pass: Vec<&String> = self.pool.iter().collect();
            pass.shuffle(rng);
            let needed = count - drawn.len();
            drawn.extend(pass.into_iter().take(needed).cloned());
        }
        drawn
    }

    /// Uniform pick with replacement.
    pub fn pick_one<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        self.pool.choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharacterPools, RoleCategory};
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::{HashMap, HashSet};

    #[test]
    fn draw_within_pool_size_never_repeats() {
        let pools = CharacterPools::default();
        let sampler = pools.sampler(RoleCategory::Duelist);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let drawn = sampler.draw(19, &mut rng);
            let unique: HashSet<&String> = drawn.iter().collect();
            assert_eq!(drawn.len(), 19);
            assert_eq!(unique.len(), 19);
        }
    }

    #[test]
    fn draw_past_pool_size_still_succeeds() {
        let pools = CharacterPools::default();
        let sampler = pools.sampler(RoleCategory::Strategist);
        let mut rng = StdRng::seed_from_u64(42);

        let drawn = sampler.draw(9, &mut rng);
        assert_eq!(drawn.len(), 9);

        let first_pass: HashSet<&String> = drawn[..8].iter().collect();
        assert_eq!(first_pass.len(), 8);
        assert!(pools.pool(RoleCategory::Strategist).contains(&drawn[8]));
    }

    #[test]
    fn draw_spreads_repeats_evenly_across_passes() {
        let pools = CharacterPools::default();
        let sampler = pools.sampler(RoleCategory::Vanguard);
        let mut rng = StdRng::seed_from_u64(3);

        let drawn = sampler.draw(20, &mut rng);
        let mut counts: HashMap<&String, usize> = HashMap::new();
        for name in &drawn {
            *counts.entry(name).or_default() += 1;
        }
        assert_eq!(counts.len(), 8);
        assert!(counts.values().all(|&count| (2..=3).contains(&count)));
    }

    #[test]
    fn draw_zero_and_empty_pool_return_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec!["Thor".to_string()];
        assert!(PoolSampler::new(&pool).draw(0, &mut rng).is_empty());
        assert!(PoolSampler::new(&[]).draw(4, &mut rng).is_empty());
        assert_eq!(PoolSampler::new(&[]).pick_one(&mut rng), None);
    }

    #[test]
    fn single_name_pool_repeats_that_name() {
        let mut rng = StdRng::seed_from_u64(9);
        let pool = vec!["Groot".to_string()];
        let drawn = PoolSampler::new(&pool).draw(3, &mut rng);
        assert_eq!(drawn, vec!["Groot", "Groot", "Groot"]);
    }
}
