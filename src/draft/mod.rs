// Draft engine: pick-order generation, the draft state machine, and
// roster slot assignment.

pub mod engine;
pub mod order;
pub mod roster;

use thiserror::Error;

/// Expected, user-correctable failures of draft operations. Every
/// operation is transactional: an error leaves pick and roster state
/// untouched.
#[derive(Debug, Error)]
pub enum DraftError {
    /// The cursor points past the last round, or the draft is not in
    /// progress yet.
    #[error("no current pick available for draft {draft_id}")]
    NoCurrentPick { draft_id: i64 },

    /// The slot under the cursor already has a player.
    #[error("pick #{overall_pick} has already been made")]
    PickAlreadyMade { overall_pick: u32 },

    /// The player is already on another pick of this draft.
    #[error("player {player} has already been drafted by {team} (pick #{overall_pick})")]
    PlayerAlreadyDrafted {
        player: String,
        team: String,
        overall_pick: u32,
    },

    /// The roster-assignment resolver exhausted every fallback.
    #[error("no available roster position for player {player}")]
    NoAssignableSlot { player: String },

    /// `revert_last_pick` with no made pick to revert.
    #[error("no picks to revert for draft {draft_id}")]
    NothingToRevert { draft_id: i64 },

    /// `start_draft` on a draft that is not in `setup`.
    #[error("draft {draft_id} cannot be started from status `{status}`")]
    NotInSetup { draft_id: i64, status: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
