// SQLite persistence layer for leagues, players, projections, scores,
// and draft state.
//
// The `Mutex<Connection>` is the serialization point for draft
// operations: the engine holds the lock for the full transaction of each
// pick-mutating call, so at most one make_pick/revert is in flight per
// process.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{
    League, Player, PlayerScore, PlayerType, Projection, RosterSlotDef, RosterTemplate,
    ScoringCategory, Team,
};
use crate::position::Position;

/// SQLite-backed storage for the draft engine and scoring engine.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database
    /// (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS leagues (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                name      TEXT NOT NULL,
                num_teams INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS league_positions (
                league_id     INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                position_code TEXT NOT NULL,
                slot_count    INTEGER NOT NULL,
                display_order INTEGER NOT NULL,
                PRIMARY KEY (league_id, position_code)
            );

            CREATE TABLE IF NOT EXISTS league_scoring_categories (
                league_id       INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                player_type     TEXT NOT NULL,
                stat_code       TEXT NOT NULL,
                stat_name       TEXT NOT NULL,
                points_per_unit REAL NOT NULL,
                display_order   INTEGER NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (league_id, player_type, stat_code)
            );

            CREATE TABLE IF NOT EXISTS teams (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id  INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                name       TEXT NOT NULL,
                draft_slot INTEGER NOT NULL,
                UNIQUE (league_id, draft_slot)
            );

            CREATE TABLE IF NOT EXISTS players (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                name       TEXT NOT NULL,
                mlb_team   TEXT NOT NULL,
                positions  TEXT NOT NULL,
                is_pitcher INTEGER NOT NULL,
                UNIQUE (name, mlb_team)
            );

            CREATE TABLE IF NOT EXISTS player_projections (
                player_id INTEGER NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                season    INTEGER NOT NULL,
                source    TEXT NOT NULL,
                stat_name TEXT NOT NULL,
                value     REAL NOT NULL,
                PRIMARY KEY (player_id, season, source, stat_name)
            );

            CREATE TABLE IF NOT EXISTS player_scores (
                player_id          INTEGER NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                league_id          INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                season             INTEGER NOT NULL,
                projection_source  TEXT NOT NULL,
                total_points       REAL NOT NULL,
                category_breakdown TEXT NOT NULL,
                calculated_at      TEXT NOT NULL,
                PRIMARY KEY (player_id, league_id, season, projection_source)
            );

            CREATE TABLE IF NOT EXISTS drafts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id       INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                name            TEXT NOT NULL,
                status          TEXT NOT NULL,
                draft_type      TEXT NOT NULL,
                current_round   INTEGER NOT NULL,
                current_pick    INTEGER NOT NULL,
                current_team_id INTEGER REFERENCES teams(id),
                total_rounds    INTEGER NOT NULL,
                started_at      TEXT,
                completed_at    TEXT
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                draft_id        INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                round           INTEGER NOT NULL,
                pick_in_round   INTEGER NOT NULL,
                overall_pick    INTEGER NOT NULL,
                team_id         INTEGER NOT NULL REFERENCES teams(id),
                player_id       INTEGER REFERENCES players(id),
                position_filled TEXT,
                advisor_context TEXT,
                picked_at       TEXT,
                UNIQUE (draft_id, overall_pick)
            );

            CREATE INDEX IF NOT EXISTS idx_draft_picks_cursor
                ON draft_picks(draft_id, round, pick_in_round);

            CREATE TABLE IF NOT EXISTS team_rosters (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                draft_id      INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                team_id       INTEGER NOT NULL REFERENCES teams(id),
                player_id     INTEGER NOT NULL REFERENCES players(id),
                roster_slot   TEXT NOT NULL,
                draft_pick_id INTEGER NOT NULL REFERENCES draft_picks(id),
                UNIQUE (draft_id, team_id, roster_slot)
            );

            CREATE INDEX IF NOT EXISTS idx_player_scores_rank
                ON player_scores(league_id, season, projection_source, total_points);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Leagues
    // ------------------------------------------------------------------

    /// Create a league together with its ordered roster template, in one
    /// transaction.
    pub fn create_league(
        &self,
        name: &str,
        num_teams: u32,
        template: &RosterTemplate,
    ) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        tx.execute(
            "INSERT INTO leagues (name, num_teams) VALUES (?1, ?2)",
            params![name, num_teams],
        )
        .context("failed to insert league")?;
        let league_id = tx.last_insert_rowid();

        for (order, def) in template.iter().enumerate() {
            tx.execute(
                "INSERT INTO league_positions (league_id, position_code, slot_count, display_order)
                 VALUES (?1, ?2, ?3, ?4)",
                params![league_id, def.position.code(), def.slots, order as u32],
            )
            .context("failed to insert league position")?;
        }

        tx.commit().context("failed to commit league creation")?;
        Ok(league_id)
    }

    /// Load a league and its roster template.
    pub fn league(&self, league_id: i64) -> Result<League> {
        let conn = self.conn();
        let (name, num_teams): (String, u32) = conn
            .query_row(
                "SELECT name, num_teams FROM leagues WHERE id = ?1",
                params![league_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .with_context(|| format!("league {league_id} not found"))?;

        let mut stmt = conn
            .prepare(
                "SELECT position_code, slot_count FROM league_positions
                 WHERE league_id = ?1 ORDER BY display_order",
            )
            .context("failed to prepare league_positions query")?;
        let template = stmt
            .query_map(params![league_id], |row| {
                let code: String = row.get(0)?;
                let slots: u32 = row.get(1)?;
                Ok((code, slots))
            })
            .context("failed to query league positions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map league position rows")?
            .into_iter()
            .filter_map(|(code, slots)| {
                Position::from_code(&code).map(|position| RosterSlotDef { position, slots })
            })
            .collect();

        Ok(League {
            id: league_id,
            name,
            num_teams,
            roster_template: RosterTemplate(template),
        })
    }

    // ------------------------------------------------------------------
    // Scoring categories
    // ------------------------------------------------------------------

    /// Replace a league's scoring categories wholesale.
    pub fn set_scoring_categories(
        &self,
        league_id: i64,
        categories: &[ScoringCategory],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        tx.execute(
            "DELETE FROM league_scoring_categories WHERE league_id = ?1",
            params![league_id],
        )
        .context("failed to clear scoring categories")?;

        for cat in categories {
            tx.execute(
                "INSERT INTO league_scoring_categories
                    (league_id, player_type, stat_code, stat_name, points_per_unit, display_order, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    league_id,
                    cat.player_type.as_str(),
                    cat.stat_code,
                    cat.stat_name,
                    cat.points_per_unit,
                    cat.display_order,
                    cat.is_active,
                ],
            )
            .context("failed to insert scoring category")?;
        }

        tx.commit().context("failed to commit scoring categories")
    }

    /// Active scoring categories for one player type, in display order.
    ///
    /// Always hits storage — callers must not cache the result across
    /// scoring runs.
    pub fn scoring_categories(
        &self,
        league_id: i64,
        player_type: PlayerType,
    ) -> Result<Vec<ScoringCategory>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT stat_code, stat_name, points_per_unit, display_order
                 FROM league_scoring_categories
                 WHERE league_id = ?1 AND player_type = ?2 AND is_active = 1
                 ORDER BY display_order",
            )
            .context("failed to prepare scoring_categories query")?;

        let categories = stmt
            .query_map(params![league_id, player_type.as_str()], |row| {
                Ok(ScoringCategory {
                    player_type,
                    stat_code: row.get(0)?,
                    stat_name: row.get(1)?,
                    points_per_unit: row.get(2)?,
                    display_order: row.get(3)?,
                    is_active: true,
                })
            })
            .context("failed to query scoring categories")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map scoring category rows")?;

        Ok(categories)
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    pub fn create_team(&self, league_id: i64, name: &str, draft_slot: u32) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO teams (league_id, name, draft_slot) VALUES (?1, ?2, ?3)",
            params![league_id, name, draft_slot],
        )
        .context("failed to insert team")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn team(&self, team_id: i64) -> Result<Team> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, league_id, name, draft_slot FROM teams WHERE id = ?1",
            params![team_id],
            |row| {
                Ok(Team {
                    id: row.get(0)?,
                    league_id: row.get(1)?,
                    name: row.get(2)?,
                    draft_slot: row.get(3)?,
                })
            },
        )
        .with_context(|| format!("team {team_id} not found"))
    }

    /// Teams of a league in draft-slot order.
    pub fn league_teams(&self, league_id: i64) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, league_id, name, draft_slot FROM teams
                 WHERE league_id = ?1 ORDER BY draft_slot",
            )
            .context("failed to prepare league_teams query")?;
        let teams = stmt
            .query_map(params![league_id], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    league_id: row.get(1)?,
                    name: row.get(2)?,
                    draft_slot: row.get(3)?,
                })
            })
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;
        Ok(teams)
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert a player or update their record if a `(name, mlb_team)` row
    /// already exists. Returns the player's row id.
    ///
    /// Positions are stored as a JSON array of codes (e.g. `["SS","2B"]`).
    pub fn upsert_player(
        &self,
        name: &str,
        mlb_team: &str,
        positions: &[Position],
        is_pitcher: bool,
    ) -> Result<i64> {
        let conn = self.conn();
        let codes: Vec<&str> = positions.iter().map(|p| p.code()).collect();
        let positions_json =
            serde_json::to_string(&codes).context("failed to serialize positions")?;

        let id: i64 = conn
            .query_row(
                "INSERT INTO players (name, mlb_team, positions, is_pitcher)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name, mlb_team) DO UPDATE SET
                    positions  = excluded.positions,
                    is_pitcher = excluded.is_pitcher
                 RETURNING id",
                params![name, mlb_team, positions_json, is_pitcher],
                |row| row.get(0),
            )
            .context("failed to upsert player")?;
        Ok(id)
    }

    pub fn player(&self, player_id: i64) -> Result<Player> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, mlb_team, positions, is_pitcher FROM players WHERE id = ?1",
            params![player_id],
            map_player_row,
        )
        .with_context(|| format!("player {player_id} not found"))
    }

    pub fn all_players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, mlb_team, positions, is_pitcher FROM players ORDER BY id")
            .context("failed to prepare all_players query")?;
        let players = stmt
            .query_map([], map_player_row)
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    /// Store a projection for (player, season, source), replacing any
    /// previous stats for that key in one transaction.
    pub fn upsert_projection(
        &self,
        player_id: i64,
        season: u32,
        source: &str,
        stats: &[(&str, f64)],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        tx.execute(
            "DELETE FROM player_projections
             WHERE player_id = ?1 AND season = ?2 AND source = ?3",
            params![player_id, season, source],
        )
        .context("failed to clear projection")?;

        for &(stat_name, value) in stats {
            tx.execute(
                "INSERT INTO player_projections (player_id, season, source, stat_name, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![player_id, season, source, stat_name, value],
            )
            .context("failed to insert projection stat")?;
        }

        tx.commit().context("failed to commit projection")
    }

    /// Load the projection bag for (player, season, source). Returns
    /// `None` when no stats exist for that key.
    pub fn projection(
        &self,
        player_id: i64,
        season: u32,
        source: &str,
    ) -> Result<Option<Projection>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT stat_name, value FROM player_projections
                 WHERE player_id = ?1 AND season = ?2 AND source = ?3",
            )
            .context("failed to prepare projection query")?;
        let stats = stmt
            .query_map(params![player_id, season, source], |row| {
                let name: String = row.get(0)?;
                let value: f64 = row.get(1)?;
                Ok((name, value))
            })
            .context("failed to query projection")?
            .collect::<std::result::Result<std::collections::BTreeMap<_, _>, _>>()
            .context("failed to map projection rows")?;

        if stats.is_empty() {
            return Ok(None);
        }
        Ok(Some(Projection {
            player_id,
            season,
            source: source.to_string(),
            stats,
        }))
    }

    /// Ids of players holding at least one projected stat for
    /// (season, source).
    pub fn players_with_projection(&self, season: u32, source: &str) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT player_id FROM player_projections
                 WHERE season = ?1 AND source = ?2 ORDER BY player_id",
            )
            .context("failed to prepare players_with_projection query")?;
        let ids = stmt
            .query_map(params![season, source], |row| row.get(0))
            .context("failed to query projected players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map projected player ids")?;
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Player scores
    // ------------------------------------------------------------------

    /// Upsert a computed score on its (player, league, season, source)
    /// key. A second calculation for the same key overwrites.
    pub fn upsert_player_score(&self, score: &PlayerScore) -> Result<()> {
        let conn = self.conn();
        let breakdown = serde_json::to_string(&score.category_breakdown)
            .context("failed to serialize category breakdown")?;
        conn.execute(
            "INSERT INTO player_scores
                (player_id, league_id, season, projection_source, total_points, category_breakdown, calculated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(player_id, league_id, season, projection_source) DO UPDATE SET
                total_points       = excluded.total_points,
                category_breakdown = excluded.category_breakdown,
                calculated_at      = excluded.calculated_at",
            params![
                score.player_id,
                score.league_id,
                score.season,
                score.projection_source,
                score.total_points,
                breakdown,
                score.calculated_at.to_rfc3339(),
            ],
        )
        .context("failed to upsert player score")?;
        Ok(())
    }

    /// Upsert a batch of computed scores in one transaction. Used by
    /// league-wide recalculation so a failure rolls the whole run back.
    pub fn upsert_player_scores(&self, scores: &[PlayerScore]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        for score in scores {
            let breakdown = serde_json::to_string(&score.category_breakdown)
                .context("failed to serialize category breakdown")?;
            tx.execute(
                "INSERT INTO player_scores
                    (player_id, league_id, season, projection_source, total_points, category_breakdown, calculated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(player_id, league_id, season, projection_source) DO UPDATE SET
                    total_points       = excluded.total_points,
                    category_breakdown = excluded.category_breakdown,
                    calculated_at      = excluded.calculated_at",
                params![
                    score.player_id,
                    score.league_id,
                    score.season,
                    score.projection_source,
                    score.total_points,
                    breakdown,
                    score.calculated_at.to_rfc3339(),
                ],
            )
            .context("failed to upsert player score in batch")?;
        }

        tx.commit().context("failed to commit score batch")
    }

    pub fn player_score(
        &self,
        player_id: i64,
        league_id: i64,
        season: u32,
        source: &str,
    ) -> Result<Option<PlayerScore>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT total_points, category_breakdown, calculated_at FROM player_scores
             WHERE player_id = ?1 AND league_id = ?2 AND season = ?3 AND projection_source = ?4",
            params![player_id, league_id, season, source],
            |row| {
                let total_points: f64 = row.get(0)?;
                let breakdown_json: String = row.get(1)?;
                let calculated_at: String = row.get(2)?;
                Ok((total_points, breakdown_json, calculated_at))
            },
        )
        .optional()
        .context("failed to query player score")?
        .map(|(total_points, breakdown_json, calculated_at)| {
            let category_breakdown = serde_json::from_str(&breakdown_json)
                .context("failed to deserialize category breakdown")?;
            Ok(PlayerScore {
                player_id,
                league_id,
                season,
                projection_source: source.to_string(),
                total_points,
                category_breakdown,
                calculated_at: parse_timestamp(&calculated_at)?,
            })
        })
        .transpose()
    }

    /// Player scores for a league ordered by total points descending.
    pub fn top_players(
        &self,
        league_id: i64,
        season: u32,
        source: &str,
        limit: usize,
    ) -> Result<Vec<(i64, f64)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id, total_points FROM player_scores
                 WHERE league_id = ?1 AND season = ?2 AND projection_source = ?3
                 ORDER BY total_points DESC LIMIT ?4",
            )
            .context("failed to prepare top_players query")?;
        let rows = stmt
            .query_map(params![league_id, season, source, limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .context("failed to query top players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map top player rows")?;
        Ok(rows)
    }
}

/// Map a `players` row into a `Player`. Positions are a JSON array of
/// codes; unknown codes are dropped rather than failing the whole row.
pub(crate) fn map_player_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    let positions_json: String = row.get(3)?;
    let codes: Vec<String> = serde_json::from_str(&positions_json).unwrap_or_default();
    let positions = codes.iter().filter_map(|c| Position::from_code(c)).collect();
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        mlb_team: row.get(2)?,
        positions,
        is_pitcher: row.get(4)?,
    })
}

/// Parse an RFC 3339 timestamp stored as TEXT.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp `{s}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoreBreakdown;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn test_template() -> RosterTemplate {
        RosterTemplate(vec![
            RosterSlotDef { position: Position::Catcher, slots: 1 },
            RosterSlotDef { position: Position::Outfield, slots: 3 },
            RosterSlotDef { position: Position::Pitcher, slots: 2 },
        ])
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "leagues",
            "league_positions",
            "league_scoring_categories",
            "teams",
            "players",
            "player_projections",
            "player_scores",
            "drafts",
            "draft_picks",
            "team_rosters",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn create_and_load_league_preserves_template_order() {
        let db = test_db();
        let id = db.create_league("Test", 10, &test_template()).unwrap();

        let league = db.league(id).unwrap();
        assert_eq!(league.name, "Test");
        assert_eq!(league.num_teams, 10);
        assert_eq!(league.roster_template.0.len(), 3);
        assert_eq!(league.roster_template.0[0].position, Position::Catcher);
        assert_eq!(league.roster_template.0[1].position, Position::Outfield);
        assert_eq!(league.roster_template.0[1].slots, 3);
        assert_eq!(league.roster_template.total_rounds(), 6);
    }

    #[test]
    fn teams_ordered_by_draft_slot() {
        let db = test_db();
        let league_id = db.create_league("Test", 3, &test_template()).unwrap();
        db.create_team(league_id, "Third", 3).unwrap();
        db.create_team(league_id, "First", 1).unwrap();
        db.create_team(league_id, "Second", 2).unwrap();

        let teams = db.league_teams(league_id).unwrap();
        assert_eq!(teams.len(), 3);
        assert_eq!(teams[0].name, "First");
        assert_eq!(teams[1].name, "Second");
        assert_eq!(teams[2].name, "Third");
    }

    #[test]
    fn duplicate_draft_slot_rejected() {
        let db = test_db();
        let league_id = db.create_league("Test", 2, &test_template()).unwrap();
        db.create_team(league_id, "A", 1).unwrap();
        assert!(db.create_team(league_id, "B", 1).is_err());
    }

    #[test]
    fn upsert_player_no_duplicates() {
        let db = test_db();
        let positions = vec![Position::ShortStop, Position::SecondBase];
        let id1 = db.upsert_player("Trea Turner", "PHI", &positions, false).unwrap();
        let id2 = db
            .upsert_player("Trea Turner", "PHI", &[Position::ShortStop], false)
            .unwrap();
        assert_eq!(id1, id2);

        let player = db.player(id1).unwrap();
        assert_eq!(player.positions, vec![Position::ShortStop]);
        assert!(!player.is_pitcher);
    }

    #[test]
    fn player_positions_roundtrip() {
        let db = test_db();
        let id = db
            .upsert_player(
                "Mookie Betts",
                "LAD",
                &[Position::ShortStop, Position::SecondBase, Position::Outfield],
                false,
            )
            .unwrap();
        let player = db.player(id).unwrap();
        assert_eq!(
            player.positions,
            vec![Position::ShortStop, Position::SecondBase, Position::Outfield]
        );
    }

    #[test]
    fn projection_roundtrip_and_overwrite() {
        let db = test_db();
        let id = db
            .upsert_player("Aaron Judge", "NYY", &[Position::Outfield], false)
            .unwrap();

        db.upsert_projection(id, 2026, "fantasypros", &[("hr", 50.0), ("rbi", 120.0)])
            .unwrap();

        let proj = db.projection(id, 2026, "fantasypros").unwrap().unwrap();
        assert_eq!(proj.stat("hr"), Some(50.0));
        assert_eq!(proj.stat("rbi"), Some(120.0));
        assert_eq!(proj.stat("sb"), None);

        // Overwrite replaces the whole bag, including dropping old stats.
        db.upsert_projection(id, 2026, "fantasypros", &[("hr", 55.0)])
            .unwrap();
        let proj = db.projection(id, 2026, "fantasypros").unwrap().unwrap();
        assert_eq!(proj.stat("hr"), Some(55.0));
        assert_eq!(proj.stat("rbi"), None);
    }

    #[test]
    fn projection_missing_returns_none() {
        let db = test_db();
        let id = db
            .upsert_player("No Projection", "BOS", &[Position::Catcher], false)
            .unwrap();
        assert!(db.projection(id, 2026, "fantasypros").unwrap().is_none());
        assert!(db.players_with_projection(2026, "fantasypros").unwrap().is_empty());
    }

    #[test]
    fn projections_keyed_by_season_and_source() {
        let db = test_db();
        let id = db
            .upsert_player("Two Sources", "SEA", &[Position::Catcher], false)
            .unwrap();
        db.upsert_projection(id, 2026, "fantasypros", &[("hr", 20.0)]).unwrap();
        db.upsert_projection(id, 2026, "steamer", &[("hr", 25.0)]).unwrap();
        db.upsert_projection(id, 2025, "fantasypros", &[("hr", 18.0)]).unwrap();

        assert_eq!(
            db.projection(id, 2026, "fantasypros").unwrap().unwrap().stat("hr"),
            Some(20.0)
        );
        assert_eq!(
            db.projection(id, 2026, "steamer").unwrap().unwrap().stat("hr"),
            Some(25.0)
        );
        assert_eq!(
            db.projection(id, 2025, "fantasypros").unwrap().unwrap().stat("hr"),
            Some(18.0)
        );
    }

    #[test]
    fn scoring_categories_roundtrip() {
        let db = test_db();
        let league_id = db.create_league("Test", 2, &test_template()).unwrap();

        let categories = vec![
            ScoringCategory {
                player_type: PlayerType::Batter,
                stat_code: "HR".into(),
                stat_name: "Home Runs".into(),
                points_per_unit: 4.0,
                display_order: 0,
                is_active: true,
            },
            ScoringCategory {
                player_type: PlayerType::Batter,
                stat_code: "SB".into(),
                stat_name: "Stolen Bases".into(),
                points_per_unit: 2.0,
                display_order: 1,
                is_active: false,
            },
            ScoringCategory {
                player_type: PlayerType::Pitcher,
                stat_code: "K".into(),
                stat_name: "Strikeouts".into(),
                points_per_unit: 1.0,
                display_order: 0,
                is_active: true,
            },
        ];
        db.set_scoring_categories(league_id, &categories).unwrap();

        // Inactive categories are filtered out.
        let batter = db.scoring_categories(league_id, PlayerType::Batter).unwrap();
        assert_eq!(batter.len(), 1);
        assert_eq!(batter[0].stat_code, "HR");

        let pitcher = db.scoring_categories(league_id, PlayerType::Pitcher).unwrap();
        assert_eq!(pitcher.len(), 1);
        assert_eq!(pitcher[0].stat_code, "K");
    }

    #[test]
    fn set_scoring_categories_replaces_previous() {
        let db = test_db();
        let league_id = db.create_league("Test", 2, &test_template()).unwrap();

        let first = vec![ScoringCategory {
            player_type: PlayerType::Batter,
            stat_code: "HR".into(),
            stat_name: "Home Runs".into(),
            points_per_unit: 4.0,
            display_order: 0,
            is_active: true,
        }];
        db.set_scoring_categories(league_id, &first).unwrap();

        let second = vec![ScoringCategory {
            player_type: PlayerType::Batter,
            stat_code: "RBI".into(),
            stat_name: "Runs Batted In".into(),
            points_per_unit: 1.0,
            display_order: 0,
            is_active: true,
        }];
        db.set_scoring_categories(league_id, &second).unwrap();

        let batter = db.scoring_categories(league_id, PlayerType::Batter).unwrap();
        assert_eq!(batter.len(), 1);
        assert_eq!(batter[0].stat_code, "RBI");
    }

    #[test]
    fn player_score_upsert_overwrites() {
        let db = test_db();
        let league_id = db.create_league("Test", 2, &test_template()).unwrap();
        let player_id = db
            .upsert_player("Scored", "NYY", &[Position::Outfield], false)
            .unwrap();

        let score = PlayerScore {
            player_id,
            league_id,
            season: 2026,
            projection_source: "fantasypros".into(),
            total_points: 412.5,
            category_breakdown: ScoreBreakdown::new(),
            calculated_at: Utc::now(),
        };
        db.upsert_player_score(&score).unwrap();
        db.upsert_player_score(&PlayerScore {
            total_points: 430.0,
            ..score.clone()
        })
        .unwrap();

        let loaded = db
            .player_score(player_id, league_id, 2026, "fantasypros")
            .unwrap()
            .unwrap();
        assert!((loaded.total_points - 430.0).abs() < f64::EPSILON);

        // Only one row for the key.
        let conn = db.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM player_scores", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn top_players_ordered_by_points() {
        let db = test_db();
        let league_id = db.create_league("Test", 2, &test_template()).unwrap();

        for (name, points) in [("Low", 100.0), ("High", 300.0), ("Mid", 200.0)] {
            let player_id = db
                .upsert_player(name, "TST", &[Position::Outfield], false)
                .unwrap();
            db.upsert_player_score(&PlayerScore {
                player_id,
                league_id,
                season: 2026,
                projection_source: "fantasypros".into(),
                total_points: points,
                category_breakdown: ScoreBreakdown::new(),
                calculated_at: Utc::now(),
            })
            .unwrap();
        }

        let top = db.top_players(league_id, 2026, "fantasypros", 2).unwrap();
        assert_eq!(top.len(), 2);
        assert!((top[0].1 - 300.0).abs() < f64::EPSILON);
        assert!((top[1].1 - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn foreign_keys_enforced() {
        let db = test_db();
        // Projection for a non-existent player should fail with
        // foreign_keys = ON.
        let result = db.upsert_projection(9999, 2026, "fantasypros", &[("hr", 30.0)]);
        assert!(result.is_err());
    }
}
