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

use std::{collections::HashSet, vec};

use rand::{Rng, seq::SliceRandom};
use thiserror::Error;

use crate::{
    AssignedSlot, CharacterPools, FLEX_PERCENT, Lineup, MemberId, ROLE_PERCENT, RoleAssignment,
    RoleCategory, RolePick, Slot, TEAM_SIZE,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("role assignment needs exactly {expected} slots, got {actual}")]
    InvalidSlotCount { expected: usize, actual: usize },
    #[error("slot id {0} appears more than once")]
    DuplicateSlotId(MemberId),
}

/// How the shuffled roster is cut into role groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicePlan {
    /// Share of the roster each single role takes, rounded up.
    pub role_percent: usize,
    /// Share of the combined Vanguard and Duelist groups that turns Flex, rounded down.
    pub flex_percent: usize,
}

impl SlicePlan {
    pub const STANDARD: SlicePlan = SlicePlan {
        role_percent: ROLE_PERCENT,
        flex_percent: FLEX_PERCENT,
    };

    pub fn role_slice(&self, total: usize) -> usize {
        (total * self.role_percent).div_ceil(100)
    }

    /// Never more than `combined`.
    pub fn flex_slice(&self, combined: usize) -> usize {
        (combined * self.flex_percent / 100).min(combined)
    }

    /// Slots left over once the three role groups are cut.
    pub fn tail_len(&self, total: usize) -> usize {
        total.saturating_sub(self.role_slice(total) * RoleCategory::ALL.len())
    }
}

impl Default for SlicePlan {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Roll roles and character suggestions for a full six-seat roster.
///
/// The returned lineup keeps `slots` in the order given, so real players stay
/// ahead of placeholders regardless of how the roll shuffled them.
pub fn assign_roles<R: Rng + ?Sized>(
    slots: Vec<Slot>,
    pools: &CharacterPools,
    rng: &mut R,
) -> Result<Lineup, AssignmentError> {
    if slots.len() != TEAM_SIZE {
        return Err(AssignmentError::InvalidSlotCount {
            expected: TEAM_SIZE,
            actual: slots.len(),
        });
    }
    let mut seen = HashSet::with_capacity(slots.len());
    if let Some(duplicate) = slots.iter().map(Slot::id).find(|id| !seen.insert(*id)) {
        return Err(AssignmentError::DuplicateSlotId(duplicate));
    }
    Ok(assign_with_plan(slots, SlicePlan::STANDARD, pools, rng))
}

/// Roll roles for any roster size under `plan`.
///
/// Slots that fall outside the three role groups get a random single role.
/// Under [`SlicePlan::STANDARD`] and six seats there is no such tail.
pub fn assign_with_plan<R: Rng + ?Sized>(
    slots: Vec<Slot>,
    plan: SlicePlan,
    pools: &CharacterPools,
    rng: &mut R,
) -> Lineup {
    let mut shuffled: Vec<MemberId> = slots.iter().map(Slot::id).collect();
    shuffled.shuffle(rng);

    let per_role = plan.role_slice(shuffled.len());
    let vanguard = clamped_slice(&shuffled, 0, per_role);
    let duelist = clamped_slice(&shuffled, per_role, per_role);
    let strategist = clamped_slice(&shuffled, per_role * 2, per_role);
    let tail = clamped_slice(&shuffled, per_role * 3, shuffled.len());

    let mut front_line: Vec<MemberId> = vanguard.iter().chain(duelist).copied().collect();
    front_line.shuffle(rng);
    let flex = &front_line[..plan.flex_slice(front_line.len())];

    let vanguard_only: Vec<MemberId> = vanguard
        .iter()
        .filter(|id| !flex.contains(id))
        .copied()
        .collect();
    let duelist_only: Vec<MemberId> = duelist
        .iter()
        .filter(|id| !flex.contains(id))
        .copied()
        .collect();

    let mut draws = Draws::new(
        pools,
        [
            vanguard_only.len() + flex.len(),
            duelist_only.len() + flex.len(),
            strategist.len(),
        ],
        rng,
    );

    let mut assignment = RoleAssignment::default();
    for &id in &vanguard_only {
        let character = draws.next(RoleCategory::Vanguard, rng);
        assignment.insert(id, RolePick::Vanguard { character });
    }
    for &id in &duelist_only {
        let character = draws.next(RoleCategory::Duelist, rng);
        assignment.insert(id, RolePick::Duelist { character });
    }
    for &id in strategist {
        let character = draws.next(RoleCategory::Strategist, rng);
        assignment.insert(id, RolePick::Strategist { character });
    }
    for &id in flex {
        let vanguard = draws.next(RoleCategory::Vanguard, rng);
        let duelist = draws.next(RoleCategory::Duelist, rng);
        assignment.insert(id, RolePick::Flex { vanguard, duelist });
    }
    for &id in tail {
        let category = RoleCategory::ALL[rng.random_range(0..RoleCategory::ALL.len())];
        let character = draws.next(category, rng);
        assignment.insert(id, RolePick::single(category, character));
    }

    Lineup { slots, assignment }
}

/// Redraw every character suggestion, keeping each slot's role as it is.
pub fn reroll_characters<R: Rng + ?Sized>(
    assignment: &RoleAssignment,
    pools: &CharacterPools,
    rng: &mut R,
) -> RoleAssignment {
    let mut draws = Draws::new(
        pools,
        RoleCategory::ALL.map(|category| assignment.demand(category)),
        rng,
    );

    assignment
        .iter()
        .map(|entry| {
            let pick = match &entry.pick {
                RolePick::Vanguard { .. } => RolePick::Vanguard {
                    character: draws.next(RoleCategory::Vanguard, rng),
                },
                RolePick::Duelist { .. } => RolePick::Duelist {
                    character: draws.next(RoleCategory::Duelist, rng),
                },
                RolePick::Strategist { .. } => RolePick::Strategist {
                    character: draws.next(RoleCategory::Strategist, rng),
                },
                RolePick::Flex { .. } => {
                    let vanguard = draws.next(RoleCategory::Vanguard, rng);
                    let duelist = draws.next(RoleCategory::Duelist, rng);
                    RolePick::Flex { vanguard, duelist }
                }
            };
            AssignedSlot {
                slot_id: entry.slot_id,
                pick,
            }
        })
        .collect()
}

/// Per-category queues of drawn suggestions for one roll.
struct Draws<'a> {
    pools: &'a CharacterPools,
    queues: [vec::IntoIter<String>; 3],
}

impl<'a> Draws<'a> {
    fn new<R: Rng + ?Sized>(pools: &'a CharacterPools, demand: [usize; 3], rng: &mut R) -> Self {
        let queues = [
            pools
                .sampler(RoleCategory::Vanguard)
                .draw(demand[0], rng)
                .into_iter(),
            pools
                .sampler(RoleCategory::Duelist)
                .draw(demand[1], rng)
                .into_iter(),
            pools
                .sampler(RoleCategory::Strategist)
                .draw(demand[2], rng)
                .into_iter(),
        ];
        Self { pools, queues }
    }

    /// Next queued suggestion, or a uniform pick from the whole pool once the
    /// queue runs dry.
    fn next<R: Rng + ?Sized>(&mut self, category: RoleCategory, rng: &mut R) -> String {
        let queue = &mut self.queues[category_index(category)];
        queue
            .next()
            .or_else(|| self.pools.sampler(category).pick_one(rng))
            .unwrap_or_default()
    }
}

fn category_index(category: RoleCategory) -> usize {
    match category {
        RoleCategory::Vanguard => 0,
        RoleCategory::Duelist => 1,
        RoleCategory::Strategist => 2,
    }
}

fn clamped_slice(ids: &[MemberId], start: usize, len: usize) -> &[MemberId] {
    let start = start.min(ids.len());
    let end = start.saturating_add(len).min(ids.len());
    &ids[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Activity, CandidateMember, PLACEHOLDER_ID_BASE, RoleTag, build_roster, placeholder_slots,
    };
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::{HashMap, HashSet};

    fn six_slots() -> Vec<Slot> {
        let mut slots: Vec<Slot> = ["Amy", "Bob", "Zed"]
            .iter()
            .enumerate()
            .map(|(idx, name)| Slot::Real {
                id: idx as MemberId + 1,
                display_name: name.to_string(),
            })
            .collect();
        slots.extend(placeholder_slots(3));
        slots
    }

    fn slots_of(len: usize) -> Vec<Slot> {
        (0..len)
            .map(|idx| Slot::Real {
                id: idx as MemberId + 100,
                display_name: format!("player-{idx}"),
            })
            .collect()
    }

    fn characters_of(pick: &RolePick) -> Vec<(RoleCategory, &str)> {
        match pick {
            RolePick::Vanguard { character } => vec![(RoleCategory::Vanguard, character.as_str())],
            RolePick::Duelist { character } => vec![(RoleCategory::Duelist, character.as_str())],
            RolePick::Strategist { character } => {
                vec![(RoleCategory::Strategist, character.as_str())]
            }
            RolePick::Flex { vanguard, duelist } => vec![
                (RoleCategory::Vanguard, vanguard.as_str()),
                (RoleCategory::Duelist, duelist.as_str()),
            ],
        }
    }

    #[test]
    fn standard_plan_cuts_six_into_two_per_role_with_no_tail() {
        let plan = SlicePlan::STANDARD;
        assert_eq!(plan.role_slice(TEAM_SIZE), 2);
        assert_eq!(plan.flex_slice(4), 2);
        assert_eq!(plan.tail_len(TEAM_SIZE), 0);
    }

    #[test]
    fn assignment_covers_every_slot_with_fixed_role_counts() {
        let pools = CharacterPools::default();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let lineup = assign_roles(six_slots(), &pools, &mut rng).unwrap();
            let assignment = &lineup.assignment;

            assert_eq!(assignment.len(), TEAM_SIZE);
            let ids: HashSet<MemberId> = assignment.iter().map(|entry| entry.slot_id).collect();
            let expected: HashSet<MemberId> = lineup.slots.iter().map(Slot::id).collect();
            assert_eq!(ids, expected);

            assert_eq!(assignment.count_tag(RoleTag::Strategist), 2);
            assert_eq!(assignment.count_tag(RoleTag::Flex), 2);
            assert_eq!(
                assignment.count_tag(RoleTag::Vanguard) + assignment.count_tag(RoleTag::Duelist),
                2
            );
            assert_eq!(
                assignment.demand(RoleCategory::Vanguard),
                2 + assignment.count_tag(RoleTag::Vanguard)
            );
        }
    }

    #[test]
    fn assignment_keeps_input_slot_order() {
        let pools = CharacterPools::default();
        let mut rng = StdRng::seed_from_u64(11);
        let slots = six_slots();
        let lineup = assign_roles(slots.clone(), &pools, &mut rng).unwrap();
        assert_eq!(lineup.slots, slots);
        assert_eq!(lineup.slots[3].id(), PLACEHOLDER_ID_BASE);
    }

    #[test]
    fn suggestions_come_from_matching_pool_without_repeats() {
        let pools = CharacterPools::default();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let lineup = assign_roles(six_slots(), &pools, &mut rng).unwrap();

            let mut seen: HashSet<&str> = HashSet::new();
            for entry in lineup.assignment.iter() {
                for (category, character) in characters_of(&entry.pick) {
                    assert!(
                        pools.pool(category).iter().any(|name| name == character),
                        "{character} is not a {category}"
                    );
                    assert!(seen.insert(character), "{character} suggested twice");
                }
            }
        }
    }

    #[test]
    fn wrong_slot_count_is_rejected() {
        let pools = CharacterPools::default();
        let mut rng = StdRng::seed_from_u64(5);
        let err = assign_roles(slots_of(5), &pools, &mut rng).unwrap_err();
        assert_eq!(
            err,
            AssignmentError::InvalidSlotCount {
                expected: 6,
                actual: 5
            }
        );
        assert!(assign_roles(slots_of(7), &pools, &mut rng).is_err());
    }

    #[test]
    fn duplicate_slot_ids_are_rejected() {
        let pools = CharacterPools::default();
        let mut rng = StdRng::seed_from_u64(6);
        let mut slots = vec![Slot::Real {
            id: PLACEHOLDER_ID_BASE,
            display_name: "Amy".to_string(),
        }];
        slots.extend(placeholder_slots(5));

        let err = assign_roles(slots, &pools, &mut rng).unwrap_err();
        assert_eq!(err, AssignmentError::DuplicateSlotId(PLACEHOLDER_ID_BASE));
    }

    #[test]
    fn roster_with_colliding_member_id_still_gets_six_entries() {
        let pools = CharacterPools::default();
        let members = vec![
            CandidateMember {
                id: PLACEHOLDER_ID_BASE,
                display_name: "Amy".to_string(),
                is_bot: false,
                activities: vec![Activity {
                    name: Some("Marvel Rivals".to_string()),
                    kind: None,
                }],
            },
            CandidateMember {
                id: 2,
                display_name: "Bob".to_string(),
                is_bot: false,
                activities: vec![Activity {
                    name: Some("Marvel Rivals".to_string()),
                    kind: None,
                }],
            },
        ];
        let slots = build_roster(&members, &HashSet::new());

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let lineup = assign_roles(slots.clone(), &pools, &mut rng).unwrap();
            assert_eq!(lineup.assignment.len(), TEAM_SIZE);
            assert_eq!(lineup.assignment.count_tag(RoleTag::Strategist), 2);
            assert_eq!(lineup.assignment.count_tag(RoleTag::Flex), 2);
            assert_eq!(lineup.summary().lines().count(), TEAM_SIZE);
            assert!(!lineup.summary().description.contains("Unassigned"));
        }
    }

    #[test]
    fn oversized_flex_percent_turns_whole_front_line_flex() {
        let pools = CharacterPools::default();
        let plan = SlicePlan {
            role_percent: 20,
            flex_percent: 150,
        };
        assert_eq!(plan.flex_slice(4), 4);

        let mut rng = StdRng::seed_from_u64(15);
        let lineup = assign_with_plan(six_slots(), plan, &pools, &mut rng);
        assert_eq!(lineup.assignment.len(), TEAM_SIZE);
        assert_eq!(lineup.assignment.count_tag(RoleTag::Flex), 4);
        assert_eq!(lineup.assignment.count_tag(RoleTag::Strategist), 2);
    }

    #[test]
    fn roles_are_spread_across_seats_over_many_rolls() {
        let pools = CharacterPools::default();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut tags_for_first_seat: HashMap<RoleTag, usize> = HashMap::new();
        for _ in 0..400 {
            let lineup = assign_roles(six_slots(), &pools, &mut rng).unwrap();
            if let Some(pick) = lineup.assignment.get(1) {
                *tags_for_first_seat.entry(pick.tag()).or_default() += 1;
            }
        }
        assert_eq!(tags_for_first_seat.len(), 4);
    }

    #[test]
    fn tail_slots_get_a_single_role_under_a_thin_plan() {
        let pools = CharacterPools::default();
        let plan = SlicePlan {
            role_percent: 10,
            flex_percent: 50,
        };
        assert_eq!(plan.tail_len(TEAM_SIZE), 3);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let lineup = assign_with_plan(slots_of(TEAM_SIZE), plan, &pools, &mut rng);
            let assignment = &lineup.assignment;

            assert_eq!(assignment.len(), TEAM_SIZE);
            assert_eq!(assignment.count_tag(RoleTag::Flex), 1);
            for entry in assignment.iter() {
                for (category, character) in characters_of(&entry.pick) {
                    assert!(pools.pool(category).iter().any(|name| name == character));
                }
            }
        }
    }

    #[test]
    fn large_roster_exhausts_strategist_pool_without_failing() {
        let pools = CharacterPools::default();
        let plan = SlicePlan {
            role_percent: 30,
            flex_percent: 50,
        };
        let mut rng = StdRng::seed_from_u64(77);
        // 30 seats at 30% gives 9 strategists against a pool of 8.
        let lineup = assign_with_plan(slots_of(30), plan, &pools, &mut rng);
        assert!(lineup.assignment.count_tag(RoleTag::Strategist) >= 9);
        assert_eq!(lineup.assignment.len(), 30);
        for entry in lineup.assignment.iter() {
            for (_, character) in characters_of(&entry.pick) {
                assert!(!character.is_empty());
            }
        }
    }

    #[test]
    fn reroll_keeps_every_role_tag() {
        let pools = CharacterPools::default();
        let mut rng = StdRng::seed_from_u64(99);
        let lineup = assign_roles(six_slots(), &pools, &mut rng).unwrap();

        let once = reroll_characters(&lineup.assignment, &pools, &mut rng);
        let twice = reroll_characters(&once, &pools, &mut rng);

        assert_eq!(once.tags(), lineup.assignment.tags());
        assert_eq!(twice.tags(), lineup.assignment.tags());

        let original_order: Vec<MemberId> =
            lineup.assignment.iter().map(|entry| entry.slot_id).collect();
        let rerolled_order: Vec<MemberId> = twice.iter().map(|entry| entry.slot_id).collect();
        assert_eq!(rerolled_order, original_order);
    }

    #[test]
    fn reroll_changes_some_suggestion() {
        let pools = CharacterPools::default();
        let mut rng = StdRng::seed_from_u64(1234);
        let lineup = assign_roles(six_slots(), &pools, &mut rng).unwrap();

        let changed = (0..10).any(|_| {
            reroll_characters(&lineup.assignment, &pools, &mut rng) != lineup.assignment
        });
        assert!(changed);
    }

    #[test]
    fn reroll_of_flex_heavy_assignment_stays_within_pools() {
        let pools = CharacterPools::default();
        let mut rng = StdRng::seed_from_u64(8);
        let assignment: RoleAssignment = (0..10)
            .map(|idx| AssignedSlot {
                slot_id: idx,
                pick: RolePick::Flex {
                    vanguard: String::new(),
                    duelist: String::new(),
                },
            })
            .collect();

        // Ten Flex seats need ten Vanguard suggestions from a pool of eight.
        let rerolled = reroll_characters(&assignment, &pools, &mut rng);
        assert_eq!(rerolled.count_tag(RoleTag::Flex), 10);
        for entry in rerolled.iter() {
            for (category, character) in characters_of(&entry.pick) {
                assert!(pools.pool(category).iter().any(|name| name == character));
            }
        }
    }
}
