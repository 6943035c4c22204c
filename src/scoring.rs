// Scoring engine: converts statistical projections into league-specific
// fantasy points.
//
// Scoring categories are re-read from storage at the start of every
// league-wide run — formulas are never served from a cached copy.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::Database;
use crate::model::{
    CategoryLine, Player, PlayerScore, PlayerType, Projection, ScoreBreakdown, ScoringCategory,
};

#[derive(Debug, Error)]
pub enum ScoringError {
    /// The league has no active scoring category in either bucket.
    #[error("league {league_id} has no scoring categories defined")]
    NoCategoriesConfigured { league_id: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Progress report for a league-wide scoring run.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub completed: usize,
    pub total: usize,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Stat-code → projection-field mapping
// ---------------------------------------------------------------------------

/// Projection field for a batter stat code. `SO` is an alias for `K`.
/// Unmapped codes fall back to their lowercase form.
fn batter_stat_field(stat_code: &str) -> String {
    match stat_code {
        "AB" => "ab".into(),
        "PA" => "pa".into(),
        "H" => "h".into(),
        "2B" => "doubles".into(),
        "3B" => "triples".into(),
        "HR" => "hr".into(),
        "R" => "r".into(),
        "RBI" => "rbi".into(),
        "SB" => "sb".into(),
        "CS" => "cs".into(),
        "BB" => "bb".into(),
        "K" | "SO" => "k".into(),
        "HBP" => "hbp".into(),
        "AVG" => "avg".into(),
        "OBP" => "obp".into(),
        "SLG" => "slg".into(),
        "OPS" => "ops".into(),
        other => other.to_lowercase(),
    }
}

/// Projection field for a pitcher stat code. `SO` aliases `K`; `SHO`,
/// `NH`, and `PG` map to their spelled-out fields.
fn pitcher_stat_field(stat_code: &str) -> String {
    match stat_code {
        "IP" => "ip".into(),
        "W" => "w".into(),
        "L" => "l".into(),
        "SV" => "sv".into(),
        "HLD" => "hld".into(),
        "K" | "SO" => "k".into(),
        "BB" => "bb".into(),
        "H" => "h".into(),
        "ER" => "er".into(),
        "QS" => "qs".into(),
        "CG" => "cg".into(),
        "SHO" => "shutouts".into(),
        "NH" => "no_hitters".into(),
        "PG" => "perfect_games".into(),
        "HBP" => "hbp".into(),
        "ERA" => "era".into(),
        "WHIP" => "whip".into(),
        other => other.to_lowercase(),
    }
}

/// Resolve a stat code against a projection.
///
/// Two batter codes are special: `1B` is derived
/// (`max(0, h − doubles − triples − hr)`, absent components counting as
/// 0) and `H` always resolves to hits-or-0. Every other code returns
/// `None` when the projection lacks the field — absent is not zero.
fn stat_value(projection: &Projection, stat_code: &str, player_type: PlayerType) -> Option<f64> {
    if player_type == PlayerType::Batter {
        if stat_code == "1B" {
            let hits = projection.stat("h").unwrap_or(0.0);
            let doubles = projection.stat("doubles").unwrap_or(0.0);
            let triples = projection.stat("triples").unwrap_or(0.0);
            let hr = projection.stat("hr").unwrap_or(0.0);
            return Some((hits - doubles - triples - hr).max(0.0));
        }
        if stat_code == "H" {
            return Some(projection.stat("h").unwrap_or(0.0));
        }
    }

    let field = match player_type {
        PlayerType::Batter => batter_stat_field(stat_code),
        PlayerType::Pitcher => pitcher_stat_field(stat_code),
    };
    projection.stat(&field)
}

/// Round to two decimals, the precision scores are stored at.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Apply one category set to a projection: total points plus the
/// per-category breakdown. Categories whose stat is absent contribute
/// nothing and are omitted from the breakdown.
pub fn score_projection(
    projection: &Projection,
    player_type: PlayerType,
    categories: &[ScoringCategory],
) -> (f64, ScoreBreakdown) {
    let mut total = 0.0;
    let mut breakdown = ScoreBreakdown::new();

    for category in categories {
        let Some(value) = stat_value(projection, &category.stat_code, player_type) else {
            continue;
        };
        let points = value * category.points_per_unit;
        total += points;
        breakdown.insert(
            category.stat_code.clone(),
            CategoryLine {
                stat_name: category.stat_name.clone(),
                value,
                points_per_unit: category.points_per_unit,
                points: round2(points),
            },
        );
    }

    (round2(total), breakdown)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Scoring operations over a shared [`Database`].
pub struct ScoringEngine<'a> {
    db: &'a Database,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        ScoringEngine { db }
    }

    /// Score one player against the category set matching their type (a
    /// player is never scored against both sets) and upsert the result
    /// on its (player, league, season, source) key.
    pub fn calculate_player_score(
        &self,
        player: &Player,
        league_id: i64,
        projection: &Projection,
        batter_categories: &[ScoringCategory],
        pitcher_categories: &[ScoringCategory],
    ) -> Result<PlayerScore, ScoringError> {
        let categories = match player.player_type() {
            PlayerType::Batter => batter_categories,
            PlayerType::Pitcher => pitcher_categories,
        };
        let (total_points, category_breakdown) =
            score_projection(projection, player.player_type(), categories);

        let score = PlayerScore {
            player_id: player.id,
            league_id,
            season: projection.season,
            projection_source: projection.source.clone(),
            total_points,
            category_breakdown,
            calculated_at: Utc::now(),
        };
        self.db.upsert_player_score(&score)?;
        debug!(
            player = %player.name,
            league_id,
            total_points,
            "player score calculated"
        );
        Ok(score)
    }

    /// Score every player holding a projection for (season, source) and
    /// return how many were scored. Players without a projection are
    /// silently skipped.
    pub fn calculate_league_scores(
        &self,
        league_id: i64,
        season: u32,
        source: &str,
    ) -> Result<usize, ScoringError> {
        self.calculate_league_scores_with_progress(league_id, season, source, |_| {})
    }

    /// [`calculate_league_scores`](Self::calculate_league_scores) with a
    /// progress callback, invoked once per scored player. Scores are
    /// written in a single batch transaction after computation.
    pub fn calculate_league_scores_with_progress(
        &self,
        league_id: i64,
        season: u32,
        source: &str,
        mut progress: impl FnMut(ProgressUpdate),
    ) -> Result<usize, ScoringError> {
        // Reload scoring categories on every call so a formula edit is
        // picked up by the very next run.
        let batter_categories = self.db.scoring_categories(league_id, PlayerType::Batter)?;
        let pitcher_categories = self.db.scoring_categories(league_id, PlayerType::Pitcher)?;

        if batter_categories.is_empty() && pitcher_categories.is_empty() {
            return Err(ScoringError::NoCategoriesConfigured { league_id });
        }

        let player_ids = self.db.players_with_projection(season, source)?;
        let total = player_ids.len();
        let mut scores = Vec::with_capacity(total);

        for player_id in player_ids {
            let player = self.db.player(player_id)?;
            let Some(projection) = self.db.projection(player_id, season, source)? else {
                continue;
            };

            let categories = match player.player_type() {
                PlayerType::Batter => &batter_categories,
                PlayerType::Pitcher => &pitcher_categories,
            };
            let (total_points, category_breakdown) =
                score_projection(&projection, player.player_type(), categories);

            scores.push(PlayerScore {
                player_id,
                league_id,
                season,
                projection_source: source.to_string(),
                total_points,
                category_breakdown,
                calculated_at: Utc::now(),
            });
            progress(ProgressUpdate {
                completed: scores.len(),
                total,
                message: format!("scored {}", player.name),
            });
        }

        self.db.upsert_player_scores(&scores)?;
        let count = scores.len();
        info!(league_id, season, source, count, "league scores calculated");
        Ok(count)
    }

    /// Stored scores for a league ordered by total points descending.
    pub fn top_players(
        &self,
        league_id: i64,
        season: u32,
        source: &str,
        limit: usize,
    ) -> Result<Vec<(i64, f64)>, ScoringError> {
        Ok(self.db.top_players(league_id, season, source, limit)?)
    }
}
