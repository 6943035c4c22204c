// Core domain types shared across the draft engine, scoring engine, and
// persistence layer.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::Position;
use crate::position::SlotLabel;

// ---------------------------------------------------------------------------
// League and roster template
// ---------------------------------------------------------------------------

/// One entry of a league's ordered roster template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RosterSlotDef {
    pub position: Position,
    pub slots: u32,
}

/// An ordered list of (position, slot count) pairs. Order is the league's
/// display order and determines nothing about draft semantics beyond the
/// total round count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterTemplate(pub Vec<RosterSlotDef>);

impl RosterTemplate {
    /// Total roster spots — one draft round per spot.
    pub fn total_rounds(&self) -> u32 {
        self.0.iter().map(|d| d.slots).sum()
    }

    /// Slot count for a position, 0 when the template omits it.
    pub fn slot_count(&self, position: Position) -> u32 {
        self.0
            .iter()
            .find(|d| d.position == position)
            .map(|d| d.slots)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterSlotDef> {
        self.0.iter()
    }
}

/// A fantasy league. Scoring categories are intentionally *not* embedded
/// here: they are re-read from storage at the start of every scoring run
/// so formula edits are never served from a stale copy.
#[derive(Debug, Clone)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub num_teams: u32,
    pub roster_template: RosterTemplate,
}

/// A team in a league. `draft_slot` is the 1-based position in round one
/// of a snake draft and is unique within the league.
#[derive(Debug, Clone)]
pub struct Team {
    pub id: i64,
    pub league_id: i64,
    pub name: String,
    pub draft_slot: u32,
}

// ---------------------------------------------------------------------------
// Scoring configuration
// ---------------------------------------------------------------------------

/// Which scoring bucket a category (or player) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    Batter,
    Pitcher,
}

impl PlayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerType::Batter => "batter",
            PlayerType::Pitcher => "pitcher",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "batter" => Some(PlayerType::Batter),
            "pitcher" => Some(PlayerType::Pitcher),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A league scoring rule: points per unit of one stat for one player type.
/// Unique per (league, player_type, stat_code).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringCategory {
    pub player_type: PlayerType,
    pub stat_code: String,
    pub stat_name: String,
    pub points_per_unit: f64,
    pub display_order: u32,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Players and projections
// ---------------------------------------------------------------------------

/// A player, independent of any league or draft.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub mlb_team: String,
    pub positions: Vec<Position>,
    pub is_pitcher: bool,
}

impl Player {
    pub fn player_type(&self) -> PlayerType {
        if self.is_pitcher {
            PlayerType::Pitcher
        } else {
            PlayerType::Batter
        }
    }

    /// Roster eligibility for a position code.
    ///
    /// Any batter is UTIL-eligible and any pitcher is P-eligible; every
    /// other code requires membership in the player's own position list.
    pub fn is_eligible_for(&self, position: Position) -> bool {
        if position == Position::Utility && !self.is_pitcher {
            return true;
        }
        if position == Position::Pitcher && self.is_pitcher {
            return true;
        }
        self.positions.contains(&position)
    }
}

/// A seasonal statistical projection for a player from a named source.
///
/// Stats are a bag of nullable numeric fields keyed by lowercase field
/// name ("hr", "doubles", "ip"). Absence means the source did not project
/// that stat; it is never the same as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub player_id: i64,
    pub season: u32,
    pub source: String,
    pub stats: BTreeMap<String, f64>,
}

impl Projection {
    pub fn stat(&self, field: &str) -> Option<f64> {
        self.stats.get(field).copied()
    }
}

// ---------------------------------------------------------------------------
// Computed scores
// ---------------------------------------------------------------------------

/// One line of a score breakdown: how a single category contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLine {
    pub stat_name: String,
    pub value: f64,
    pub points_per_unit: f64,
    pub points: f64,
}

/// Per-category breakdown keyed by stat code. A player is scored against
/// exactly one bucket, so no batter/pitcher nesting is needed.
pub type ScoreBreakdown = BTreeMap<String, CategoryLine>;

/// A player's computed fantasy value for one league, season, and
/// projection source. Recomputation overwrites the row for its key.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerScore {
    pub player_id: i64,
    pub league_id: i64,
    pub season: u32,
    pub projection_source: String,
    pub total_points: f64,
    pub category_breakdown: ScoreBreakdown,
    pub calculated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// Draft lifecycle state. `Paused` is an alternate of `InProgress`; the
/// pick-making path never produces it but the model must represent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftStatus {
    Setup,
    InProgress,
    Paused,
    Completed,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Setup => "setup",
            DraftStatus::InProgress => "in_progress",
            DraftStatus::Paused => "paused",
            DraftStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "setup" => Some(DraftStatus::Setup),
            "in_progress" => Some(DraftStatus::InProgress),
            "paused" => Some(DraftStatus::Paused),
            "completed" => Some(DraftStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Only snake drafts are implemented by this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftType {
    Snake,
}

impl DraftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftType::Snake => "snake",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "snake" => Some(DraftType::Snake),
            _ => None,
        }
    }
}

/// A draft for one league. The cursor (`current_round`,
/// `current_pick`) points at the next slot to be filled;
/// `current_team_id` denormalizes that slot's team while the draft is
/// live. `total_rounds` is frozen at creation from the league template.
#[derive(Debug, Clone)]
pub struct Draft {
    pub id: i64,
    pub league_id: i64,
    pub name: String,
    pub status: DraftStatus,
    pub draft_type: DraftType,
    pub current_round: u32,
    pub current_pick: u32,
    pub current_team_id: Option<i64>,
    pub total_rounds: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One pick slot of a draft. The identity fields (round, pick_in_round,
/// overall_pick, team) are immutable; the assignment fields are null
/// until the pick is made and are cleared again on revert.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftPick {
    pub id: i64,
    pub draft_id: i64,
    pub round: u32,
    pub pick_in_round: u32,
    pub overall_pick: u32,
    pub team_id: i64,
    pub player_id: Option<i64>,
    pub position_filled: Option<SlotLabel>,
    pub advisor_context: Option<serde_json::Value>,
    pub picked_at: Option<DateTime<Utc>>,
}

impl DraftPick {
    pub fn is_picked(&self) -> bool {
        self.player_id.is_some()
    }
}

/// A roster assignment created by a pick. Unique per
/// (draft, team, roster_slot) — a team can never fill the same concrete
/// slot twice.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub id: i64,
    pub draft_id: i64,
    pub team_id: i64,
    pub player_id: i64,
    pub roster_slot: SlotLabel,
    pub draft_pick_id: i64,
}

/// Aggregate pick counts for a draft, consumed by the advisor context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftSummary {
    pub total_picks: u32,
    pub completed_picks: u32,
    pub remaining_picks: u32,
    pub pitchers_picked: u32,
    pub hitters_picked: u32,
    pub pitcher_percentage: f64,
    pub hitter_percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batter(positions: Vec<Position>) -> Player {
        Player {
            id: 1,
            name: "Test Batter".into(),
            mlb_team: "NYY".into(),
            positions,
            is_pitcher: false,
        }
    }

    fn pitcher() -> Player {
        Player {
            id: 2,
            name: "Test Pitcher".into(),
            mlb_team: "LAD".into(),
            positions: vec![Position::StartingPitcher],
            is_pitcher: true,
        }
    }

    #[test]
    fn template_total_rounds_sums_slots() {
        let template = RosterTemplate(vec![
            RosterSlotDef { position: Position::Catcher, slots: 1 },
            RosterSlotDef { position: Position::Outfield, slots: 3 },
            RosterSlotDef { position: Position::Pitcher, slots: 11 },
        ]);
        assert_eq!(template.total_rounds(), 15);
        assert_eq!(template.slot_count(Position::Outfield), 3);
        assert_eq!(template.slot_count(Position::Utility), 0);
    }

    #[test]
    fn any_batter_is_util_eligible() {
        let p = batter(vec![Position::Catcher]);
        assert!(p.is_eligible_for(Position::Utility));
        assert!(!p.is_eligible_for(Position::Pitcher));
    }

    #[test]
    fn any_pitcher_is_p_eligible() {
        let p = pitcher();
        assert!(p.is_eligible_for(Position::Pitcher));
        assert!(!p.is_eligible_for(Position::Utility));
    }

    #[test]
    fn other_positions_require_membership() {
        let p = batter(vec![Position::FirstBase, Position::Outfield]);
        assert!(p.is_eligible_for(Position::FirstBase));
        assert!(p.is_eligible_for(Position::Outfield));
        assert!(!p.is_eligible_for(Position::ShortStop));
    }

    #[test]
    fn draft_status_string_roundtrip() {
        for status in [
            DraftStatus::Setup,
            DraftStatus::InProgress,
            DraftStatus::Paused,
            DraftStatus::Completed,
        ] {
            assert_eq!(DraftStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DraftStatus::from_str("bogus"), None);
    }

    #[test]
    fn projection_stat_lookup() {
        let mut stats = BTreeMap::new();
        stats.insert("hr".to_string(), 42.0);
        let proj = Projection {
            player_id: 1,
            season: 2026,
            source: "fantasypros".into(),
            stats,
        };
        assert_eq!(proj.stat("hr"), Some(42.0));
        assert_eq!(proj.stat("sb"), None);
    }
}
