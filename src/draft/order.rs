// Snake draft pick-order generation.
//
// Pure functions: the engine persists the generated slots inside the
// draft-creation transaction.

use serde::Serialize;

/// One generated pick slot, before any player is assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PickSlot {
    pub round: u32,
    pub pick_in_round: u32,
    pub overall_pick: u32,
    pub team_id: i64,
}

/// Generate the full snake order for `team_ids` (already in draft-slot
/// order) over `total_rounds` rounds.
///
/// Odd rounds walk the teams in slot order, even rounds in reverse;
/// `overall_pick` is a running 1-based counter and `pick_in_round`
/// restarts at 1 each round.
pub fn snake_order(team_ids: &[i64], total_rounds: u32) -> Vec<PickSlot> {
    let mut slots = Vec::with_capacity(team_ids.len() * total_rounds as usize);
    let mut overall_pick = 1;

    for round in 1..=total_rounds {
        let forward = round % 2 == 1;
        let round_teams: Vec<i64> = if forward {
            team_ids.to_vec()
        } else {
            team_ids.iter().rev().copied().collect()
        };

        for (i, &team_id) in round_teams.iter().enumerate() {
            slots.push(PickSlot {
                round,
                pick_in_round: i as u32 + 1,
                overall_pick,
                team_id,
            });
            overall_pick += 1;
        }
    }

    slots
}

/// How many picks happen between a team's pick in `current_round` and its
/// next turn, counting the next turn itself.
///
/// The snake mirror makes this symmetric: picks remaining in the current
/// round plus picks before the team's slot in the next (reversed) round,
/// plus one for the team's own next pick.
pub fn picks_until_next_turn(num_teams: u32, current_round: u32, draft_slot: u32) -> u32 {
    if current_round % 2 == 1 {
        // Odd round: the team picks at `draft_slot`; in the next round it
        // picks at position (num_teams - draft_slot + 1).
        let picks_left_in_round = num_teams - draft_slot;
        let picks_before_next = num_teams - draft_slot;
        picks_left_in_round + picks_before_next + 1
    } else {
        // Even round: the team picks at (num_teams - draft_slot + 1); in
        // the next round it is back at `draft_slot`.
        let picks_left_in_round = draft_slot - 1;
        let picks_before_next = draft_slot - 1;
        picks_left_in_round + picks_before_next + 1
    }
}

/// The overall pick number of the team's next turn, given its current
/// overall pick number.
pub fn next_turn_overall_pick(
    num_teams: u32,
    current_round: u32,
    draft_slot: u32,
    current_overall_pick: u32,
) -> u32 {
    current_overall_pick + picks_until_next_turn(num_teams, current_round, draft_slot)
}
