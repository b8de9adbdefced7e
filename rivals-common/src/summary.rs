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

use serde::{Deserialize, Serialize};

use crate::{RoleAssignment, RolePick, SUMMARY_COLOR, SUMMARY_TITLE, Slot};

/// Rendered role summary, shaped like a chat embed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub description: String,
    pub color: u32,
}

impl Summary {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.description.lines()
    }
}

pub fn summary_line(slot: &Slot, pick: Option<&RolePick>) -> String {
    let name = slot.display_name();
    match pick {
        Some(RolePick::Vanguard { character }) => {
            format!("**{name}** → Vanguard (Suggested: {character})")
        }
        Some(RolePick::Duelist { character }) => {
            format!("**{name}** → Duelist (Suggested: {character})")
        }
        Some(RolePick::Strategist { character }) => {
            format!("**{name}** → Strategist (Suggested: {character})")
        }
        Some(RolePick::Flex { vanguard, duelist }) => format!(
            "**{name}** → Flex (Choose either: Vanguard [Suggested: {vanguard}] or Duelist [Suggested: {duelist}])"
        ),
        None => format!("**{name}** → Unassigned"),
    }
}

/// One line per slot, in the order given.
pub fn render_summary(assignment: &RoleAssignment, slots: &[Slot]) -> Summary {
    let description = slots
        .iter()
        .map(|slot| summary_line(slot, assignment.get(slot.id())))
        .collect::<Vec<_>>()
        .join("\n");

    Summary {
        title: SUMMARY_TITLE.to_string(),
        description,
        color: SUMMARY_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RoleCategory, placeholder_slots};

    fn amy() -> Slot {
        Slot::Real {
            id: 1,
            display_name: "Amy".to_string(),
        }
    }

    #[test]
    fn lines_follow_slot_order_not_assignment_order() {
        let mut slots = vec![amy()];
        slots.extend(placeholder_slots(2));

        let mut assignment = RoleAssignment::default();
        assignment.insert(
            slots[2].id(),
            RolePick::single(RoleCategory::Strategist, "Mantis".to_string()),
        );
        assignment.insert(
            1,
            RolePick::Flex {
                vanguard: "Groot".to_string(),
                duelist: "Storm".to_string(),
            },
        );
        assignment.insert(
            slots[1].id(),
            RolePick::single(RoleCategory::Vanguard, "Thor".to_string()),
        );

        let summary = render_summary(&assignment, &slots);
        assert_eq!(summary.title, "Marvel Rivals Role Assignments");
        assert_eq!(summary.color, 0x3498DB);
        assert_eq!(
            summary.lines().collect::<Vec<_>>(),
            vec![
                "**Amy** → Flex (Choose either: Vanguard [Suggested: Groot] or Duelist [Suggested: Storm])",
                "**Team Member A** → Vanguard (Suggested: Thor)",
                "**Team Member B** → Strategist (Suggested: Mantis)",
            ]
        );
    }

    #[test]
    fn missing_entry_renders_unassigned() {
        let line = summary_line(&amy(), None);
        assert_eq!(line, "**Amy** → Unassigned");

        let summary = render_summary(&RoleAssignment::default(), &[amy()]);
        assert_eq!(summary.description, "**Amy** → Unassigned");
    }

    #[test]
    fn duelist_line_names_the_suggestion() {
        let pick = RolePick::single(RoleCategory::Duelist, "Hela".to_string());
        assert_eq!(
            summary_line(&amy(), Some(&pick)),
            "**Amy** → Duelist (Suggested: Hela)"
        );
    }
}
