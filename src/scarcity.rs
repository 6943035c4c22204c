// Positional scarcity analysis.
//
// Pure computation over ranked player pools: how steep the drop-off is
// behind the best available player at each position, and whether the
// second-best option will survive until the requesting team's next turn.
// The output is advisory data for the recommendation collaborator; no
// side effects, no I/O.

use serde::Serialize;

use crate::position::Position;

// ---------------------------------------------------------------------------
// Scarcity levels
// ---------------------------------------------------------------------------

/// How urgent the position is, classified by the tier drop between the
/// #1 and #2 available players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScarcityLevel {
    /// Tier drop of 50+ points.
    Critical,
    /// Tier drop of 30+ points.
    High,
    /// Tier drop of 15+ points.
    Medium,
    /// Anything flatter.
    Low,
}

impl ScarcityLevel {
    /// Classify from the points gap between the top two candidates.
    pub fn from_tier_drop(tier_drop: f64) -> Self {
        if tier_drop >= 50.0 {
            ScarcityLevel::Critical
        } else if tier_drop >= 30.0 {
            ScarcityLevel::High
        } else if tier_drop >= 15.0 {
            ScarcityLevel::Medium
        } else {
            ScarcityLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScarcityLevel::Critical => "CRITICAL",
            ScarcityLevel::High => "HIGH",
            ScarcityLevel::Medium => "MEDIUM",
            ScarcityLevel::Low => "LOW",
        }
    }

    fn sort_order(&self) -> u8 {
        match self {
            ScarcityLevel::Critical => 0,
            ScarcityLevel::High => 1,
            ScarcityLevel::Medium => 2,
            ScarcityLevel::Low => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Whether the #2-ranked candidate should survive until the team's next
/// turn, judged from ADP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AvailabilityOutlook {
    /// ADP before the next pick: likely gone.
    LikelyGone,
    /// ADP within five picks of the next pick: at risk.
    AtRisk,
    /// Safe to wait a round.
    SafeToWait,
}

/// Availability judgement for the second-best candidate at a position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityPrediction {
    pub outlook: AvailabilityOutlook,
    /// The candidate being judged.
    pub player: String,
    /// The ADP used (falls back to overall rank, then a 999 sentinel).
    pub adp: f64,
    /// The requesting team's next overall pick number.
    pub next_pick: u32,
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// One eligible player with their computed points and draft-market data.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub player_id: i64,
    pub name: String,
    pub points: f64,
    pub adp: Option<f64>,
    pub overall_rank: Option<u32>,
    pub positions: Vec<Position>,
    pub is_pitcher: bool,
}

/// A top-of-position candidate in the scarcity output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCandidate {
    pub name: String,
    pub points: f64,
    pub adp: Option<f64>,
}

/// Scarcity analysis for a single position.
#[derive(Debug, Clone, Serialize)]
pub struct PositionScarcity {
    pub position: Position,
    pub scarcity_level: ScarcityLevel,
    /// Open roster slots the requesting team still has at this position.
    pub slots_needed: u32,
    pub players_available: usize,
    /// Points gap between the #1 and #2 candidates (0 with fewer than 2).
    pub tier_drop_points: f64,
    pub availability: Option<AvailabilityPrediction>,
    pub top_3: Vec<TopCandidate>,
}

/// Position codes tracked by the analyzer.
const TRACKED_POSITIONS: &[Position] = &[
    Position::Catcher,
    Position::FirstBase,
    Position::SecondBase,
    Position::ThirdBase,
    Position::ShortStop,
    Position::Outfield,
    Position::DesignatedHitter,
    Position::StartingPitcher,
    Position::ReliefPitcher,
    Position::Pitcher,
];

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Analyze one position: rank its candidates by points, measure the tier
/// drop, and judge the #2 candidate's availability at the team's next
/// turn. Returns `None` when no candidate qualifies at the position.
pub fn analyze_position(
    position: Position,
    candidates: &[RankedCandidate],
    slots_needed: u32,
    picks_until_next_turn: u32,
    current_overall_pick: u32,
) -> Option<PositionScarcity> {
    let mut pool: Vec<&RankedCandidate> = candidates
        .iter()
        .filter(|c| eligible_at(c, position))
        .collect();
    if pool.is_empty() {
        return None;
    }
    pool.sort_by(|a, b| {
        b.points
            .partial_cmp(&a.points)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let best = pool[0];
    let second = pool.get(1);

    let tier_drop = second
        .map(|s| round1(best.points - s.points))
        .unwrap_or(0.0);

    let availability = second.and_then(|s| {
        if picks_until_next_turn == 0 {
            return None;
        }
        let adp = s.adp.or(s.overall_rank.map(f64::from)).unwrap_or(999.0);
        let next_pick = current_overall_pick + picks_until_next_turn;
        let outlook = if adp < f64::from(next_pick) {
            AvailabilityOutlook::LikelyGone
        } else if adp < f64::from(next_pick + 5) {
            AvailabilityOutlook::AtRisk
        } else {
            AvailabilityOutlook::SafeToWait
        };
        Some(AvailabilityPrediction {
            outlook,
            player: s.name.clone(),
            adp,
            next_pick,
        })
    });

    Some(PositionScarcity {
        position,
        scarcity_level: ScarcityLevel::from_tier_drop(tier_drop),
        slots_needed,
        players_available: pool.len(),
        tier_drop_points: tier_drop,
        availability,
        top_3: pool
            .iter()
            .take(3)
            .map(|c| TopCandidate {
                name: c.name.clone(),
                points: c.points,
                adp: c.adp,
            })
            .collect(),
    })
}

/// Analyze every tracked position and sort the results by level, then by
/// tier drop descending. `slots_needed` comes from the team-needs map;
/// positions the team has filled still appear (with 0 needed) so the
/// consumer can tell "scarce but irrelevant" from "scarce and urgent".
pub fn analyze_all(
    candidates: &[RankedCandidate],
    team_needs: &std::collections::BTreeMap<Position, u32>,
    picks_until_next_turn: u32,
    current_overall_pick: u32,
) -> Vec<PositionScarcity> {
    let mut entries: Vec<PositionScarcity> = TRACKED_POSITIONS
        .iter()
        .filter_map(|&position| {
            analyze_position(
                position,
                candidates,
                team_needs.get(&position).copied().unwrap_or(0),
                picks_until_next_turn,
                current_overall_pick,
            )
        })
        .collect();

    entries.sort_by(|a, b| {
        a.scarcity_level
            .sort_order()
            .cmp(&b.scarcity_level.sort_order())
            .then_with(|| {
                b.tier_drop_points
                    .partial_cmp(&a.tier_drop_points)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    entries
}

/// Position-pool membership. Pitcher codes pool together: a pitcher
/// listed at P qualifies for SP/RP/P queries, since every pitcher fills
/// the same P roster slots.
fn eligible_at(candidate: &RankedCandidate, position: Position) -> bool {
    if position.is_pitching() {
        return candidate.is_pitcher
            && (candidate.positions.contains(&position)
                || candidate.positions.contains(&Position::Pitcher));
    }
    candidate.positions.contains(&position)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
