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

mod assign;
mod roster;
mod sampler;
mod summary;

use std::{
    collections::HashMap,
    fmt,
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use assign::{AssignmentError, SlicePlan, assign_roles, assign_with_plan, reroll_characters};
pub use roster::{
    activity_listing, build_roster, member_listing, placeholder_slots, placeholder_slots_avoiding,
    qualifying_members,
};
pub use sampler::PoolSampler;
pub use summary::{Summary, render_summary, summary_line};

pub const TARGET_ACTIVITY: &str = "marvel rivals";
pub const TEAM_SIZE: usize = 6;
pub const ROLE_PERCENT: usize = 20;
pub const FLEX_PERCENT: usize = 50;

/// Placeholder ids start here and count up, skipping any id a seated member
/// already holds.
pub const PLACEHOLDER_ID_BASE: MemberId = 1_000_000;

/// Labels for filler seats, used in order.
pub const PLACEHOLDER_LABELS: [&str; TEAM_SIZE] = [
    "Team Member A",
    "Team Member B",
    "Team Member C",
    "Team Member D",
    "Team Member E",
    "Team Member F",
];

pub const SUMMARY_TITLE: &str = "Marvel Rivals Role Assignments";
pub const SUMMARY_COLOR: u32 = 0x3498DB;

pub const VANGUARD_CHARACTERS: [&str; 8] = [
    "Captain America",
    "Thor",
    "Hulk",
    "Venom",
    "Peni Parker",
    "Magneto",
    "Doctor Strange",
    "Groot",
];

pub const DUELIST_CHARACTERS: [&str; 19] = [
    "Mister Fantastic",
    "Wolverine",
    "Hawkeye",
    "Iron Fist",
    "Moon Knight",
    "Psylocke",
    "Squirrel Girl",
    "Winter Soldier",
    "Black Widow",
    "Namor",
    "Storm",
    "Scarlet Witch",
    "Star-Lord",
    "Magik",
    "Spider-Man",
    "The Punisher",
    "Hela",
    "Iron Man",
    "Black Panther",
];

pub const STRATEGIST_CHARACTERS: [&str; 8] = [
    "Invisible Woman",
    "Cloak and Dagger",
    "Jeff the Land Shark",
    "Adam Warlock",
    "Luna Snow",
    "Loki",
    "Rocket Raccoon",
    "Mantis",
];

pub type MemberId = u64;
pub type ChannelId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleCategory {
    Vanguard,
    Duelist,
    Strategist,
}

impl RoleCategory {
    pub const ALL: [RoleCategory; 3] = [
        RoleCategory::Vanguard,
        RoleCategory::Duelist,
        RoleCategory::Strategist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vanguard => "Vanguard",
            Self::Duelist => "Duelist",
            Self::Strategist => "Strategist",
        }
    }
}

impl fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a slot ended up with, ignoring which characters were suggested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleTag {
    Vanguard,
    Duelist,
    Strategist,
    Flex,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolePick {
    Vanguard { character: String },
    Duelist { character: String },
    Strategist { character: String },
    /// Member picks either suggestion in game.
    Flex { vanguard: String, duelist: String },
}

impl RolePick {
    pub fn single(category: RoleCategory, character: String) -> Self {
        match category {
            RoleCategory::Vanguard => Self::Vanguard { character },
            RoleCategory::Duelist => Self::Duelist { character },
            RoleCategory::Strategist => Self::Strategist { character },
        }
    }

    pub fn tag(&self) -> RoleTag {
        match self {
            Self::Vanguard { .. } => RoleTag::Vanguard,
            Self::Duelist { .. } => RoleTag::Duelist,
            Self::Strategist { .. } => RoleTag::Strategist,
            Self::Flex { .. } => RoleTag::Flex,
        }
    }

    /// Whether this pick consumes a suggestion from `category`'s pool.
    pub fn needs(&self, category: RoleCategory) -> bool {
        matches!(
            (self, category),
            (Self::Vanguard { .. }, RoleCategory::Vanguard)
                | (Self::Duelist { .. }, RoleCategory::Duelist)
                | (Self::Strategist { .. }, RoleCategory::Strategist)
                | (Self::Flex { .. }, RoleCategory::Vanguard)
                | (Self::Flex { .. }, RoleCategory::Duelist)
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    #[serde(default)]
    pub name: Option<String>,
    /// Platform activity type such as "playing" or "streaming".
    #[serde(default)]
    pub kind: Option<String>,
}

/// A channel member as reported by the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateMember {
    pub id: MemberId,
    pub display_name: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl CandidateMember {
    /// Case-insensitive exact match against any activity name.
    pub fn is_playing(&self, activity: &str) -> bool {
        let wanted = activity.to_lowercase();
        self.activities
            .iter()
            .filter_map(|entry| entry.name.as_deref())
            .any(|name| name.to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    Real { id: MemberId, display_name: String },
    Placeholder { id: MemberId, label: String },
}

impl Slot {
    pub fn id(&self) -> MemberId {
        match self {
            Self::Real { id, .. } | Self::Placeholder { id, .. } => *id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Real { display_name, .. } => display_name,
            Self::Placeholder { label, .. } => label,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignedSlot {
    pub slot_id: MemberId,
    pub pick: RolePick,
}

/// Slot id to role pick, kept in the order entries were assigned.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RoleAssignment {
    entries: Vec<AssignedSlot>,
}

impl RoleAssignment {
    /// Inserts or replaces the pick for `slot_id`. Replacing keeps the
    /// original position.
    pub fn insert(&mut self, slot_id: MemberId, pick: RolePick) {
        match self.entries.iter_mut().find(|entry| entry.slot_id == slot_id) {
            Some(entry) => entry.pick = pick,
            None => self.entries.push(AssignedSlot { slot_id, pick }),
        }
    }

    pub fn get(&self, slot_id: MemberId) -> Option<&RolePick> {
        self.entries
            .iter()
            .find(|entry| entry.slot_id == slot_id)
            .map(|entry| &entry.pick)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssignedSlot> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tags(&self) -> HashMap<MemberId, RoleTag> {
        self.entries
            .iter()
            .map(|entry| (entry.slot_id, entry.pick.tag()))
            .collect()
    }

    pub fn count_tag(&self, tag: RoleTag) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.pick.tag() == tag)
            .count()
    }

    /// Number of suggestions `category`'s pool has to supply.
    pub fn demand(&self, category: RoleCategory) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.pick.needs(category))
            .count()
    }
}

impl FromIterator<AssignedSlot> for RoleAssignment {
    fn from_iter<I: IntoIterator<Item = AssignedSlot>>(iter: I) -> Self {
        let mut assignment = RoleAssignment::default();
        for entry in iter {
            assignment.insert(entry.slot_id, entry.pick);
        }
        assignment
    }
}

/// Six seats in display order together with their role picks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Lineup {
    pub slots: Vec<Slot>,
    pub assignment: RoleAssignment,
}

impl Lineup {
    pub fn summary(&self) -> Summary {
        render_summary(&self.assignment, &self.slots)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("{0} pool has no characters")]
    Empty(RoleCategory),
    #[error("{0} pool contains a blank character name")]
    BlankName(RoleCategory),
    #[error("character {name} appears in both the {first} and {second} pools")]
    Overlap {
        name: String,
        first: RoleCategory,
        second: RoleCategory,
    },
}

/// Character catalogs, one per role category.
///
/// Pools are non-empty and disjoint. Names are trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterPools {
    vanguard: Vec<String>,
    duelist: Vec<String>,
    strategist: Vec<String>,
}

impl CharacterPools {
    pub fn new(
        vanguard: Vec<String>,
        duelist: Vec<String>,
        strategist: Vec<String>,
    ) -> Result<Self, PoolError> {
        let pools = Self {
            vanguard: normalize_pool(RoleCategory::Vanguard, vanguard)?,
            duelist: normalize_pool(RoleCategory::Duelist, duelist)?,
            strategist: normalize_pool(RoleCategory::Strategist, strategist)?,
        };

        let mut owners: HashMap<&str, RoleCategory> = HashMap::new();
        for category in RoleCategory::ALL {
            for name in pools.pool(category) {
                if let Some(&first) = owners.get(name.as_str()) {
                    if first != category {
                        return Err(PoolError::Overlap {
                            name: name.clone(),
                            first,
                            second: category,
                        });
                    }
                }
                owners.insert(name.as_str(), category);
            }
        }

        Ok(pools)
    }

    pub fn pool(&self, category: RoleCategory) -> &[String] {
        match category {
            RoleCategory::Vanguard => &self.vanguard,
            RoleCategory::Duelist => &self.duelist,
            RoleCategory::Strategist => &self.strategist,
        }
    }

    pub fn sampler(&self, category: RoleCategory) -> PoolSampler<'_> {
        PoolSampler::new(self.pool(category))
    }
}

impl Default for CharacterPools {
    fn default() -> Self {
        Self {
            vanguard: owned_names(&VANGUARD_CHARACTERS),
            duelist: owned_names(&DUELIST_CHARACTERS),
            strategist: owned_names(&STRATEGIST_CHARACTERS),
        }
    }
}

fn owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn normalize_pool(category: RoleCategory, names: Vec<String>) -> Result<Vec<String>, PoolError> {
    if names.is_empty() {
        return Err(PoolError::Empty(category));
    }
    names
        .into_iter()
        .map(|name| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                Err(PoolError::BlankName(category))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Replace `${VAR_NAME}` patterns in a string with values from environment variables.
/// Unknown or unset variables are replaced with an empty string.
pub fn expand_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .into_owned()
}
