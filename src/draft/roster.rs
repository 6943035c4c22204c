// Roster slot assignment and team-needs calculation.
//
// Both are pure functions over the league template and the labels a team
// has already filled; the engine supplies those from storage.

use std::collections::BTreeMap;

use crate::draft::DraftError;
use crate::model::{Player, RosterTemplate};
use crate::position::{Position, SlotLabel};

/// Remaining open slots per position: `slot_count - filled`, keeping only
/// positions with at least one opening.
///
/// Filled labels group by their position prefix, so "OF2" counts against
/// OF.
pub fn team_needs(template: &RosterTemplate, filled: &[SlotLabel]) -> BTreeMap<Position, u32> {
    let mut filled_counts: BTreeMap<Position, u32> = BTreeMap::new();
    for label in filled {
        *filled_counts.entry(label.position).or_insert(0) += 1;
    }

    let mut needs = BTreeMap::new();
    for def in template.iter() {
        let used = filled_counts.get(&def.position).copied().unwrap_or(0);
        let needed = def.slots.saturating_sub(used);
        if needed > 0 {
            needs.insert(def.position, needed);
        }
    }
    needs
}

/// Decide which concrete slot a player fills, by a fixed priority:
///
/// 1. A UTIL-only player (after DH→UTIL substitution) may take only UTIL
///    slots — hard error when they are full.
/// 2. The player's single-instance positions (C, 1B, 2B, SS, 3B) in list
///    order, first open one wins.
/// 3. OF numbered slots for OF-eligible players.
/// 4. P numbered slots for pitchers and P/SP-eligible players.
/// 5. UTIL numbered slots for batters.
/// 6. Otherwise the team's roster is full everywhere this player can
///    play: hard error, never a silent default.
///
/// Numbered slots are tried in ascending index order, bounded by the
/// template's slot counts. Specific positions fill before generic ones,
/// and the OF/P pools are exhausted before any flex fallback.
pub fn determine_slot_to_fill(
    template: &RosterTemplate,
    filled: &[SlotLabel],
    player: &Player,
) -> Result<SlotLabel, DraftError> {
    let mut positions: Vec<Position> = Vec::new();
    for pos in player.positions.iter().map(|p| p.normalize_dh()) {
        if !positions.contains(&pos) {
            positions.push(pos);
        }
    }

    let no_slot = || DraftError::NoAssignableSlot {
        player: player.name.clone(),
    };

    // Step 1: UTIL-only players (no other position besides UTIL/DH).
    if positions == [Position::Utility] {
        return first_open_numbered(template, filled, Position::Utility).ok_or_else(no_slot);
    }

    // Step 2: single-instance positions before any generic slot.
    for &pos in positions.iter().filter(|p| p.is_single_instance()) {
        if template.slot_count(pos) > 0 {
            let label = SlotLabel::bare(pos);
            if !filled.contains(&label) {
                return Ok(label);
            }
        }
    }

    // Step 3: the outfield pool.
    if positions.contains(&Position::Outfield) {
        if let Some(label) = first_open_numbered(template, filled, Position::Outfield) {
            return Ok(label);
        }
    }

    // Step 4: the pitcher pool.
    let p_eligible = player.is_pitcher
        || positions.contains(&Position::Pitcher)
        || positions.contains(&Position::StartingPitcher);
    if p_eligible {
        if let Some(label) = first_open_numbered(template, filled, Position::Pitcher) {
            return Ok(label);
        }
    }

    // Step 5: UTIL as the batters' last resort.
    if !player.is_pitcher
        && !positions.contains(&Position::Pitcher)
        && !positions.contains(&Position::StartingPitcher)
    {
        if let Some(label) = first_open_numbered(template, filled, Position::Utility) {
            return Ok(label);
        }
    }

    Err(no_slot())
}

/// First unfilled numbered slot for `position`, ascending.
fn first_open_numbered(
    template: &RosterTemplate,
    filled: &[SlotLabel],
    position: Position,
) -> Option<SlotLabel> {
    (1..=template.slot_count(position))
        .map(|i| SlotLabel::new(position, i))
        .find(|label| !filled.contains(label))
}
