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

use std::collections::HashSet;

use crate::{
    CandidateMember, MemberId, PLACEHOLDER_ID_BASE, PLACEHOLDER_LABELS, Slot, TARGET_ACTIVITY,
    TEAM_SIZE,
};

/// Non-bot, non-ignored members currently playing `activity`, sorted by
/// display name ignoring case.
pub fn qualifying_members<'a>(
    members: &'a [CandidateMember],
    ignored: &HashSet<MemberId>,
    activity: &str,
) -> Vec<&'a CandidateMember> {
    let mut qualifying: Vec<&CandidateMember> = members
        .iter()
        .filter(|member| !member.is_bot && !ignored.contains(&member.id))
        .filter(|member| member.is_playing(activity))
        .collect();
    qualifying.sort_by_cached_key(|member| member.display_name.to_lowercase());
    qualifying
}

/// Build the six seats for one roll.
///
/// A member reported more than once keeps only its first seat. Extra players
/// past the sixth (by name order) sit out. Missing seats are filled with
/// placeholders in label order, using ids no seated member holds.
pub fn build_roster(members: &[CandidateMember], ignored: &HashSet<MemberId>) -> Vec<Slot> {
    let mut seated: HashSet<MemberId> = HashSet::new();
    let mut slots: Vec<Slot> = qualifying_members(members, ignored, TARGET_ACTIVITY)
        .into_iter()
        .filter(|member| seated.insert(member.id))
        .take(TEAM_SIZE)
        .map(|member| Slot::Real {
            id: member.id,
            display_name: member.display_name.clone(),
        })
        .collect();

    let missing = TEAM_SIZE - slots.len();
    slots.extend(placeholder_slots_avoiding(missing, &seated));
    slots
}

pub fn placeholder_slots(count: usize) -> impl Iterator<Item = Slot> {
    placeholder_slots_avoiding(count, &HashSet::new()).into_iter()
}

/// Placeholders take the lowest ids from [`PLACEHOLDER_ID_BASE`] upward that
/// are not in `taken`.
pub fn placeholder_slots_avoiding(count: usize, taken: &HashSet<MemberId>) -> Vec<Slot> {
    let free_ids = (PLACEHOLDER_ID_BASE..).filter(|id| !taken.contains(id));
    PLACEHOLDER_LABELS
        .iter()
        .take(count)
        .zip(free_ids)
        .map(|(label, id)| Slot::Placeholder {
            id,
            label: label.to_string(),
        })
        .collect()
}

/// Display names of the non-bot members, for channel diagnostics.
pub fn member_listing(members: &[CandidateMember]) -> Vec<String> {
    members
        .iter()
        .filter(|member| !member.is_bot)
        .map(|member| member.display_name.clone())
        .collect()
}

/// One line per non-bot member activity, for presence diagnostics.
pub fn activity_listing(members: &[CandidateMember]) -> Vec<String> {
    let mut lines = Vec::new();
    for member in members.iter().filter(|member| !member.is_bot) {
        if member.activities.is_empty() {
            lines.push(format!("{}: No activities found", member.display_name));
            continue;
        }
        for activity in &member.activities {
            lines.push(format!(
                "{}: {} (Type: {})",
                member.display_name,
                activity.name.as_deref().unwrap_or("None"),
                activity.kind.as_deref().unwrap_or("unknown"),
            ));
        }
    }
    lines
}
