// The recommendation collaborator boundary.
//
// The engine produces an `AdvisorContext` (eligible players with scores,
// team needs, scarcity analysis) and consumes an ordered recommendation
// list, treating it as opaque except for `player_id`. The advisor's
// ordering is preserved verbatim — it encodes strategy (pitcher timing,
// scarcity, roster needs) that a re-sort by raw points would destroy.
//
// The advisor call is the only async, failable step near the engine: it
// is timeout-bound and falls back to a deterministic
// best-available-by-points ranking so a dead collaborator never blocks a
// draft. Retry policy belongs to callers, not here.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::Database;
use crate::draft::engine::DraftEngine;
use crate::draft::order;
use crate::model::{DraftStatus, DraftSummary};
use crate::position::Position;
use crate::scarcity::{self, PositionScarcity, RankedCandidate};

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),

    #[error("advisor returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("advisor call timed out")]
    Timeout,
}

// ---------------------------------------------------------------------------
// Context and recommendations
// ---------------------------------------------------------------------------

/// Everything the core hands to the recommendation collaborator for one
/// pick decision.
#[derive(Debug, Clone)]
pub struct AdvisorContext {
    pub draft_id: i64,
    pub league_id: i64,
    pub team_id: i64,
    pub team_name: String,
    pub draft_slot: u32,
    pub current_round: u32,
    pub total_rounds: u32,
    pub summary: DraftSummary,
    /// Open slots per position for the team on the clock.
    pub needs: BTreeMap<Position, u32>,
    /// Eligible, undrafted players with their league points and ADP.
    pub candidates: Vec<RankedCandidate>,
    pub scarcity: Vec<PositionScarcity>,
    /// The team's current overall pick number.
    pub current_overall_pick: u32,
    pub picks_until_next_turn: u32,
}

/// One advisor suggestion. The list order is the advisor's ranking and
/// must not be re-sorted by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub player_id: i64,
    pub player_name: String,
    pub positions: Vec<Position>,
    pub is_pitcher: bool,
    pub rank: u32,
    pub projected_points: f64,
    pub explanation: String,
}

/// A draft recommendation source. Implementations may call out to
/// anything (an LLM, a ranking service); the engine only requires the
/// returned list to reference eligible player ids.
#[async_trait]
pub trait DraftAdvisor: Send + Sync {
    async fn recommend(
        &self,
        context: &AdvisorContext,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, AdvisorError>;
}

// ---------------------------------------------------------------------------
// Context construction
// ---------------------------------------------------------------------------

/// Assemble the advisor context for the team on the clock.
///
/// Candidate points come from stored `PlayerScore` rows for
/// (league, season, source); ADP rides along in the projection bag under
/// the `adp` field.
pub fn build_advisor_context(
    db: &Database,
    draft_id: i64,
    team_id: i64,
    season: u32,
    source: &str,
) -> Result<AdvisorContext> {
    let engine = DraftEngine::new(db);
    let draft = engine.draft(draft_id)?;
    let team = db.team(team_id)?;
    let summary = engine.draft_summary(draft_id)?;
    let needs = engine.team_needs(draft_id, team_id)?;
    let eligible = engine.eligible_players(draft_id, team_id)?;
    let num_teams = db.league_teams(draft.league_id)?.len() as u32;

    let mut candidates = Vec::with_capacity(eligible.len());
    for player in eligible {
        let points = db
            .player_score(player.id, draft.league_id, season, source)?
            .map(|s| s.total_points);
        let adp = db
            .projection(player.id, season, source)?
            .and_then(|p| p.stat("adp"));
        candidates.push(RankedCandidate {
            player_id: player.id,
            name: player.name,
            points: points.unwrap_or(0.0),
            adp,
            overall_rank: None,
            positions: player.positions,
            is_pitcher: player.is_pitcher,
        });
    }

    let current_overall_pick = summary.completed_picks + 1;
    let picks_until_next_turn =
        order::picks_until_next_turn(num_teams, draft.current_round, team.draft_slot);
    let scarcity = scarcity::analyze_all(
        &candidates,
        &needs,
        picks_until_next_turn,
        current_overall_pick,
    );

    Ok(AdvisorContext {
        draft_id,
        league_id: draft.league_id,
        team_id,
        team_name: team.name,
        draft_slot: team.draft_slot,
        current_round: draft.current_round,
        total_rounds: draft.total_rounds,
        summary,
        needs,
        candidates,
        scarcity,
        current_overall_pick,
        picks_until_next_turn,
    })
}

// ---------------------------------------------------------------------------
// Deterministic fallback
// ---------------------------------------------------------------------------

/// Best-available-by-points ranking used whenever the real advisor
/// fails, times out, or returns nothing.
///
/// Batters and pitchers are ranked within their own pools (their point
/// scales differ), and a team still needing pitchers is always offered
/// at least one.
pub struct FallbackAdvisor;

/// Points used for ranking: the stored score, or a rough estimate from
/// overall rank when no score exists (pitchers projected at 65% of the
/// batter curve).
fn effective_points(candidate: &RankedCandidate) -> f64 {
    if candidate.points > 0.0 {
        return candidate.points;
    }
    match candidate.overall_rank {
        Some(rank) => {
            let base = (600.0 - f64::from(rank) * 3.0).max(100.0);
            if candidate.is_pitcher {
                base * 0.65
            } else {
                base
            }
        }
        None => candidate.points,
    }
}

/// The fallback ranking as a pure function.
pub fn fallback_recommendations(context: &AdvisorContext, top_n: usize) -> Vec<Recommendation> {
    let sort_key = |a: &&RankedCandidate, b: &&RankedCandidate| {
        effective_points(b)
            .partial_cmp(&effective_points(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.player_id.cmp(&b.player_id))
    };

    let mut batters: Vec<&RankedCandidate> =
        context.candidates.iter().filter(|c| !c.is_pitcher).collect();
    batters.sort_by(sort_key);
    let mut pitchers: Vec<&RankedCandidate> =
        context.candidates.iter().filter(|c| c.is_pitcher).collect();
    pitchers.sort_by(sort_key);

    let pitcher_slots_needed: u32 = context
        .needs
        .iter()
        .filter(|(pos, _)| pos.is_pitching())
        .map(|(_, n)| n)
        .sum();

    let mut picks: Vec<&RankedCandidate> = Vec::new();

    // Early rounds: lead with an elite pitcher when the roster needs one.
    if context.current_round <= 4 && pitcher_slots_needed > 0 {
        if let Some(&top_pitcher) = pitchers.first() {
            let elite = top_pitcher.overall_rank.is_some_and(|r| r <= 50);
            if elite {
                picks.push(top_pitcher);
            }
        }
    }

    for &batter in &batters {
        if picks.len() >= top_n {
            break;
        }
        picks.push(batter);
    }

    // A team that still needs pitchers always gets at least one option.
    if pitcher_slots_needed > 0 && !picks.iter().any(|c| c.is_pitcher) {
        if let Some(&top_pitcher) = pitchers.first() {
            if picks.len() >= top_n {
                picks.pop();
            }
            picks.push(top_pitcher);
        }
    }

    picks
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, c)| {
            let kind = if c.is_pitcher { "pitcher" } else { "batter" };
            Recommendation {
                player_id: c.player_id,
                player_name: c.name.clone(),
                positions: c.positions.clone(),
                is_pitcher: c.is_pitcher,
                rank: i as u32 + 1,
                projected_points: (effective_points(c) * 10.0).round() / 10.0,
                explanation: format!("Best available {kind} by projected points."),
            }
        })
        .collect()
}

#[async_trait]
impl DraftAdvisor for FallbackAdvisor {
    async fn recommend(
        &self,
        context: &AdvisorContext,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, AdvisorError> {
        Ok(fallback_recommendations(context, top_n))
    }
}

/// Ask the advisor with a deadline; on failure, timeout, or an empty
/// answer, fall back to the deterministic ranking. A successful answer
/// is returned exactly as ordered by the advisor.
pub async fn recommend_with_fallback(
    advisor: &dyn DraftAdvisor,
    context: &AdvisorContext,
    top_n: usize,
    timeout: Duration,
) -> Vec<Recommendation> {
    match tokio::time::timeout(timeout, advisor.recommend(context, top_n)).await {
        Ok(Ok(recommendations)) if !recommendations.is_empty() => recommendations,
        Ok(Ok(_)) => {
            warn!(draft_id = context.draft_id, "advisor returned no recommendations, using fallback");
            fallback_recommendations(context, top_n)
        }
        Ok(Err(e)) => {
            warn!(draft_id = context.draft_id, error = %e, "advisor failed, using fallback");
            fallback_recommendations(context, top_n)
        }
        Err(_) => {
            warn!(draft_id = context.draft_id, "advisor timed out, using fallback");
            fallback_recommendations(context, top_n)
        }
    }
}

// ---------------------------------------------------------------------------
// Round simulation
// ---------------------------------------------------------------------------

/// One pick made during simulation.
#[derive(Debug, Clone)]
pub struct SimulatedPick {
    pub overall_pick: u32,
    pub round: u32,
    pub pick_in_round: u32,
    pub team_id: i64,
    pub team_name: String,
    pub player_id: i64,
    pub player_name: String,
    pub roster_slot: String,
    pub is_pitcher: bool,
    pub projected_points: f64,
}

/// Outcome of a simulation run. Per-pick failures are collected rather
/// than aborting the caller; `success` is false only when the run could
/// not start at all.
#[derive(Debug)]
pub struct SimulationResult {
    pub success: bool,
    pub picks_made: Vec<SimulatedPick>,
    pub errors: Vec<String>,
    pub stopped_at_round: u32,
}

/// Advisor-driven auto-drafting through `stop_round` (inclusive): for
/// each turn, ask the advisor (with fallback), take its top suggestion,
/// resolve the roster slot, and make the pick. Reports progress per
/// pick as (picks made, picks planned, pick).
#[allow(clippy::too_many_arguments)]
pub async fn simulate_rounds(
    db: &Database,
    advisor: &dyn DraftAdvisor,
    draft_id: i64,
    stop_round: u32,
    season: u32,
    source: &str,
    advisor_timeout: Duration,
    mut progress: impl FnMut(usize, usize, &SimulatedPick),
) -> Result<SimulationResult> {
    let engine = DraftEngine::new(db);
    let mut draft = engine.draft(draft_id).context("failed to load draft")?;

    let mut result = SimulationResult {
        success: true,
        picks_made: Vec::new(),
        errors: Vec::new(),
        stopped_at_round: draft.current_round,
    };

    if stop_round < 1 || stop_round > draft.total_rounds {
        result.success = false;
        result.errors.push(format!(
            "invalid stop round: must be between 1 and {}",
            draft.total_rounds
        ));
        return Ok(result);
    }
    if draft.status != DraftStatus::InProgress {
        result.success = false;
        result.errors.push("draft is not in progress".to_string());
        return Ok(result);
    }

    let num_teams = db.league_teams(draft.league_id)?.len() as u32;
    let picks_planned = {
        let picks_in_current_round = i64::from(num_teams) - i64::from(draft.current_pick) + 1;
        let full_rounds = i64::from(stop_round) - i64::from(draft.current_round);
        (picks_in_current_round + full_rounds * i64::from(num_teams)).max(0) as usize
    };

    while draft.current_round <= stop_round && draft.status == DraftStatus::InProgress {
        let Some(current) = engine.current_pick(draft_id)? else {
            result
                .errors
                .push(format!("no current pick at round {}", draft.current_round));
            break;
        };
        let team = db.team(current.team_id)?;

        let context = build_advisor_context(db, draft_id, current.team_id, season, source)?;
        let recommendations =
            recommend_with_fallback(advisor, &context, 5, advisor_timeout).await;

        let Some(top) = recommendations.first() else {
            result.errors.push(format!(
                "no recommendations available for pick #{}",
                current.overall_pick
            ));
            break;
        };

        let advisor_context = serde_json::json!({
            "player_ids": recommendations.iter().map(|r| r.player_id).collect::<Vec<_>>(),
            "explanation": top.explanation,
        });

        match engine.make_pick(draft_id, top.player_id, None, Some(advisor_context)) {
            Ok(pick) => {
                let simulated = SimulatedPick {
                    overall_pick: pick.overall_pick,
                    round: pick.round,
                    pick_in_round: pick.pick_in_round,
                    team_id: team.id,
                    team_name: team.name,
                    player_id: top.player_id,
                    player_name: top.player_name.clone(),
                    roster_slot: pick
                        .position_filled
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                    is_pitcher: top.is_pitcher,
                    projected_points: top.projected_points,
                };
                result.picks_made.push(simulated);
                let made = result.picks_made.len();
                progress(made, picks_planned, &result.picks_made[made - 1]);
            }
            Err(e) => {
                result
                    .errors
                    .push(format!("error at pick #{}: {e}", current.overall_pick));
                break;
            }
        }

        draft = engine.draft(draft_id)?;
    }

    result.stopped_at_round = draft.current_round.min(draft.total_rounds);
    info!(
        draft_id,
        picks = result.picks_made.len(),
        stopped_at_round = result.stopped_at_round,
        "simulation finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RosterSlotDef, RosterTemplate};

    struct Fixture {
        db: Database,
        league_id: i64,
        team_ids: Vec<i64>,
    }

    fn fixture() -> Fixture {
        let db = Database::open(":memory:").unwrap();
        let template = RosterTemplate(vec![
            RosterSlotDef { position: Position::Catcher, slots: 1 },
            RosterSlotDef { position: Position::Utility, slots: 1 },
            RosterSlotDef { position: Position::Pitcher, slots: 1 },
        ]);
        let league_id = db.create_league("Sim League", 2, &template).unwrap();
        let team_ids = vec![
            db.create_team(league_id, "Aces", 1).unwrap(),
            db.create_team(league_id, "Bombers", 2).unwrap(),
        ];
        Fixture { db, league_id, team_ids }
    }

    fn candidate(
        id: i64,
        name: &str,
        points: f64,
        is_pitcher: bool,
        positions: Vec<Position>,
    ) -> RankedCandidate {
        RankedCandidate {
            player_id: id,
            name: name.into(),
            points,
            adp: None,
            overall_rank: None,
            positions,
            is_pitcher,
        }
    }

    fn context_with(candidates: Vec<RankedCandidate>, needs: BTreeMap<Position, u32>) -> AdvisorContext {
        AdvisorContext {
            draft_id: 1,
            league_id: 1,
            team_id: 1,
            team_name: "Aces".into(),
            draft_slot: 1,
            current_round: 5,
            total_rounds: 20,
            summary: DraftSummary {
                total_picks: 40,
                completed_picks: 8,
                remaining_picks: 32,
                pitchers_picked: 2,
                hitters_picked: 6,
                pitcher_percentage: 25.0,
                hitter_percentage: 75.0,
            },
            needs,
            candidates,
            scarcity: Vec::new(),
            current_overall_pick: 9,
            picks_until_next_turn: 3,
        }
    }

    struct FixedAdvisor(Vec<Recommendation>);

    #[async_trait]
    impl DraftAdvisor for FixedAdvisor {
        async fn recommend(
            &self,
            _context: &AdvisorContext,
            _top_n: usize,
        ) -> Result<Vec<Recommendation>, AdvisorError> {
            Ok(self.0.clone())
        }
    }

    struct FailingAdvisor;

    #[async_trait]
    impl DraftAdvisor for FailingAdvisor {
        async fn recommend(
            &self,
            _context: &AdvisorContext,
            _top_n: usize,
        ) -> Result<Vec<Recommendation>, AdvisorError> {
            Err(AdvisorError::Unavailable("connection refused".into()))
        }
    }

    struct SlowAdvisor;

    #[async_trait]
    impl DraftAdvisor for SlowAdvisor {
        async fn recommend(
            &self,
            context: &AdvisorContext,
            top_n: usize,
        ) -> Result<Vec<Recommendation>, AdvisorError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(fallback_recommendations(context, top_n))
        }
    }

    fn rec(id: i64, name: &str) -> Recommendation {
        Recommendation {
            player_id: id,
            player_name: name.into(),
            positions: vec![Position::Outfield],
            is_pitcher: false,
            rank: 0,
            projected_points: 0.0,
            explanation: "advisor says so".into(),
        }
    }

    // -- Fallback ranking --

    #[test]
    fn fallback_ranks_batters_by_points() {
        let ctx = context_with(
            vec![
                candidate(1, "Mid", 300.0, false, vec![Position::Outfield]),
                candidate(2, "Top", 500.0, false, vec![Position::Outfield]),
                candidate(3, "Low", 100.0, false, vec![Position::Outfield]),
            ],
            BTreeMap::from([(Position::Outfield, 3)]),
        );
        let recs = fallback_recommendations(&ctx, 2);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].player_name, "Top");
        assert_eq!(recs[1].player_name, "Mid");
        assert_eq!(recs[0].rank, 1);
    }

    #[test]
    fn fallback_guarantees_a_pitcher_when_needed() {
        let ctx = context_with(
            vec![
                candidate(1, "Bat A", 500.0, false, vec![Position::Outfield]),
                candidate(2, "Bat B", 490.0, false, vec![Position::Outfield]),
                candidate(3, "Arm", 300.0, true, vec![Position::StartingPitcher]),
            ],
            BTreeMap::from([(Position::Outfield, 1), (Position::Pitcher, 5)]),
        );
        let recs = fallback_recommendations(&ctx, 2);
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().any(|r| r.is_pitcher), "pitcher should be included");
        // The last batter was displaced, not the best one.
        assert_eq!(recs[0].player_name, "Bat A");
    }

    #[test]
    fn fallback_skips_pitchers_when_none_needed() {
        let ctx = context_with(
            vec![
                candidate(1, "Bat A", 500.0, false, vec![Position::Outfield]),
                candidate(2, "Arm", 600.0, true, vec![Position::StartingPitcher]),
            ],
            BTreeMap::from([(Position::Outfield, 1)]),
        );
        let recs = fallback_recommendations(&ctx, 2);
        assert!(recs.iter().all(|r| !r.is_pitcher));
    }

    #[test]
    fn fallback_leads_with_elite_pitcher_in_early_rounds() {
        let mut elite = candidate(3, "Elite Arm", 0.0, true, vec![Position::StartingPitcher]);
        elite.overall_rank = Some(10);
        let mut ctx = context_with(
            vec![
                candidate(1, "Bat A", 500.0, false, vec![Position::Outfield]),
                elite,
            ],
            BTreeMap::from([(Position::Outfield, 1), (Position::Pitcher, 5)]),
        );
        ctx.current_round = 2;
        let recs = fallback_recommendations(&ctx, 3);
        assert!(recs[0].is_pitcher, "elite pitcher leads in round 2");
    }

    #[test]
    fn fallback_is_deterministic_on_ties() {
        let ctx = context_with(
            vec![
                candidate(9, "Tied B", 300.0, false, vec![Position::Outfield]),
                candidate(4, "Tied A", 300.0, false, vec![Position::Outfield]),
            ],
            BTreeMap::from([(Position::Outfield, 2)]),
        );
        let first = fallback_recommendations(&ctx, 2);
        let second = fallback_recommendations(&ctx, 2);
        assert_eq!(first, second);
        // Lower player id wins the tie.
        assert_eq!(first[0].player_id, 4);
    }

    #[test]
    fn rank_estimate_used_when_no_score() {
        let mut ranked = candidate(1, "Ranked", 0.0, false, vec![Position::Outfield]);
        ranked.overall_rank = Some(20);
        assert!((effective_points(&ranked) - 540.0).abs() < f64::EPSILON);

        let mut ranked_arm = candidate(2, "Ranked Arm", 0.0, true, vec![Position::Pitcher]);
        ranked_arm.overall_rank = Some(20);
        assert!((effective_points(&ranked_arm) - 351.0).abs() < f64::EPSILON);
    }

    // -- Fallback wrapper --

    #[tokio::test]
    async fn advisor_order_is_preserved_verbatim() {
        // The advisor ranks a lower-points player first; the wrapper must
        // not re-sort.
        let advisor = FixedAdvisor(vec![rec(2, "Second Best"), rec(1, "Best")]);
        let ctx = context_with(
            vec![
                candidate(1, "Best", 500.0, false, vec![Position::Outfield]),
                candidate(2, "Second Best", 400.0, false, vec![Position::Outfield]),
            ],
            BTreeMap::from([(Position::Outfield, 2)]),
        );
        let recs = recommend_with_fallback(&advisor, &ctx, 2, Duration::from_secs(1)).await;
        assert_eq!(recs[0].player_name, "Second Best");
        assert_eq!(recs[1].player_name, "Best");
    }

    #[tokio::test]
    async fn failure_falls_back_to_points_ranking() {
        let ctx = context_with(
            vec![
                candidate(1, "Best", 500.0, false, vec![Position::Outfield]),
                candidate(2, "Next", 400.0, false, vec![Position::Outfield]),
            ],
            BTreeMap::from([(Position::Outfield, 2)]),
        );
        let recs = recommend_with_fallback(&FailingAdvisor, &ctx, 2, Duration::from_secs(1)).await;
        assert_eq!(recs[0].player_name, "Best");
    }

    #[tokio::test]
    async fn empty_answer_falls_back() {
        let advisor = FixedAdvisor(Vec::new());
        let ctx = context_with(
            vec![candidate(1, "Only", 500.0, false, vec![Position::Outfield])],
            BTreeMap::from([(Position::Outfield, 1)]),
        );
        let recs = recommend_with_fallback(&advisor, &ctx, 1, Duration::from_secs(1)).await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].player_name, "Only");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back_without_blocking() {
        let ctx = context_with(
            vec![candidate(1, "Only", 500.0, false, vec![Position::Outfield])],
            BTreeMap::from([(Position::Outfield, 1)]),
        );
        let recs = recommend_with_fallback(&SlowAdvisor, &ctx, 1, Duration::from_millis(50)).await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].explanation, "Best available batter by projected points.");
    }

    // -- Context construction --

    #[tokio::test]
    async fn context_carries_needs_candidates_and_scarcity() {
        let f = fixture();
        let engine = DraftEngine::new(&f.db);
        let draft = engine.initialize_draft(f.league_id, None).unwrap();
        engine.start_draft(draft.id).unwrap();

        let catcher = f
            .db
            .upsert_player("Backstop", "TST", &[Position::Catcher], false)
            .unwrap();
        f.db.upsert_projection(catcher, 2026, "fantasypros", &[("adp", 12.0)])
            .unwrap();
        f.db.upsert_player("Arm", "TST", &[Position::StartingPitcher], true)
            .unwrap();

        let ctx = build_advisor_context(&f.db, draft.id, f.team_ids[0], 2026, "fantasypros")
            .unwrap();
        assert_eq!(ctx.team_name, "Aces");
        assert_eq!(ctx.current_overall_pick, 1);
        assert_eq!(ctx.needs.get(&Position::Catcher), Some(&1));
        assert_eq!(ctx.candidates.len(), 2);
        let backstop = ctx.candidates.iter().find(|c| c.name == "Backstop").unwrap();
        assert_eq!(backstop.adp, Some(12.0));
        assert!(ctx.scarcity.iter().any(|s| s.position == Position::Catcher));
        // 2 teams, slot 1, round 1: picks 2 and 3 are the opponent's, next
        // turn is overall pick 4.
        assert_eq!(ctx.picks_until_next_turn, 3);
    }

    // -- Simulation --

    #[tokio::test]
    async fn simulate_to_completion_with_fallback_advisor() {
        let f = fixture();
        let engine = DraftEngine::new(&f.db);
        let draft = engine.initialize_draft(f.league_id, None).unwrap();
        engine.start_draft(draft.id).unwrap();

        // Enough players for 6 picks: 4 batters and 2 pitchers.
        for i in 0..4 {
            let id = f
                .db
                .upsert_player(&format!("Bat {i}"), "TST", &[Position::Catcher], false)
                .unwrap();
            f.db.upsert_projection(id, 2026, "fantasypros", &[("hr", 40.0 - i as f64)])
                .unwrap();
        }
        for i in 0..2 {
            f.db.upsert_player(&format!("Arm {i}"), "TST", &[Position::StartingPitcher], true)
                .unwrap();
        }

        let mut progress_calls = 0;
        let result = simulate_rounds(
            &f.db,
            &FallbackAdvisor,
            draft.id,
            3,
            2026,
            "fantasypros",
            Duration::from_secs(1),
            |_, _, _| progress_calls += 1,
        )
        .await
        .unwrap();

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.picks_made.len(), 6);
        assert_eq!(progress_calls, 6);
        assert_eq!(result.stopped_at_round, 3);

        let finished = engine.draft(draft.id).unwrap();
        assert_eq!(finished.status, DraftStatus::Completed);

        // Every pick carries its advisor context blob.
        for pick in engine.picks(draft.id).unwrap() {
            let context = pick.advisor_context.expect("simulated pick has context");
            assert!(context.get("player_ids").is_some());
        }
        // Each team ended with exactly one pitcher in its single P slot.
        for team_id in &f.team_ids {
            let roster = engine.team_roster(draft.id, *team_id).unwrap();
            assert_eq!(roster.len(), 3);
        }
    }

    #[tokio::test]
    async fn simulate_stops_mid_draft_at_stop_round() {
        let f = fixture();
        let engine = DraftEngine::new(&f.db);
        let draft = engine.initialize_draft(f.league_id, None).unwrap();
        engine.start_draft(draft.id).unwrap();

        for i in 0..6 {
            let id = f
                .db
                .upsert_player(&format!("Bat {i}"), "TST", &[Position::Catcher], false)
                .unwrap();
            f.db.upsert_projection(id, 2026, "fantasypros", &[("hr", 30.0 - i as f64)])
                .unwrap();
        }

        let result = simulate_rounds(
            &f.db,
            &FallbackAdvisor,
            draft.id,
            1,
            2026,
            "fantasypros",
            Duration::from_secs(1),
            |_, _, _| {},
        )
        .await
        .unwrap();

        assert!(result.success);
        assert_eq!(result.picks_made.len(), 2);
        let current = engine.draft(draft.id).unwrap();
        assert_eq!(current.status, DraftStatus::InProgress);
        assert_eq!(current.current_round, 2);
    }

    #[tokio::test]
    async fn simulate_rejects_invalid_stop_round() {
        let f = fixture();
        let engine = DraftEngine::new(&f.db);
        let draft = engine.initialize_draft(f.league_id, None).unwrap();
        engine.start_draft(draft.id).unwrap();

        let result = simulate_rounds(
            &f.db,
            &FallbackAdvisor,
            draft.id,
            99,
            2026,
            "fantasypros",
            Duration::from_secs(1),
            |_, _, _| {},
        )
        .await
        .unwrap();
        assert!(!result.success);
        assert!(result.errors[0].contains("invalid stop round"));
    }

    #[tokio::test]
    async fn simulate_requires_in_progress_draft() {
        let f = fixture();
        let engine = DraftEngine::new(&f.db);
        let draft = engine.initialize_draft(f.league_id, None).unwrap();

        let result = simulate_rounds(
            &f.db,
            &FallbackAdvisor,
            draft.id,
            1,
            2026,
            "fantasypros",
            Duration::from_secs(1),
            |_, _, _| {},
        )
        .await
        .unwrap();
        assert!(!result.success);
        assert!(result.errors[0].contains("not in progress"));
    }

    #[tokio::test]
    async fn simulate_records_error_when_pool_runs_dry() {
        let f = fixture();
        let engine = DraftEngine::new(&f.db);
        let draft = engine.initialize_draft(f.league_id, None).unwrap();
        engine.start_draft(draft.id).unwrap();

        // Only one player for a six-pick draft.
        let id = f
            .db
            .upsert_player("Lone Bat", "TST", &[Position::Catcher], false)
            .unwrap();
        f.db.upsert_projection(id, 2026, "fantasypros", &[("hr", 30.0)])
            .unwrap();

        let result = simulate_rounds(
            &f.db,
            &FallbackAdvisor,
            draft.id,
            3,
            2026,
            "fantasypros",
            Duration::from_secs(1),
            |_, _, _| {},
        )
        .await
        .unwrap();

        assert_eq!(result.picks_made.len(), 1);
        assert!(!result.errors.is_empty());
    }
}
