// The draft state machine.
//
// Every mutating operation runs inside one SQLite transaction while
// holding the connection lock, so the draft row's cursor fields are
// read-then-written atomically and at most one pick operation is in
// flight per draft.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::db::Database;
use crate::draft::order::snake_order;
use crate::draft::roster;
use crate::draft::DraftError;
use crate::model::{
    Draft, DraftPick, DraftStatus, DraftSummary, DraftType, Player, RosterEntry, RosterTemplate,
};
use crate::position::{Position, SlotLabel};

/// Draft operations over a shared [`Database`].
pub struct DraftEngine<'a> {
    db: &'a Database,
}

impl<'a> DraftEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        DraftEngine { db }
    }

    // ------------------------------------------------------------------
    // Initialization and lifecycle
    // ------------------------------------------------------------------

    /// Create a draft for a league: the draft row plus every pick slot of
    /// the snake order, in one transaction. `total_rounds` is the sum of
    /// the league template's slot counts, frozen at this moment.
    pub fn initialize_draft(
        &self,
        league_id: i64,
        name: Option<&str>,
    ) -> Result<Draft, DraftError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let template = get_template(&tx, league_id)?;
        let total_rounds = template.total_rounds();
        let team_ids: Vec<i64> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM teams WHERE league_id = ?1 ORDER BY draft_slot",
            )?;
            let ids = stmt
                .query_map(params![league_id], |row| row.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            ids
        };

        let default_name = format!("Draft - {}", Utc::now().format("%Y-%m-%d %H:%M"));
        let name = name.unwrap_or(&default_name);

        tx.execute(
            "INSERT INTO drafts
                (league_id, name, status, draft_type, current_round, current_pick, total_rounds)
             VALUES (?1, ?2, ?3, ?4, 1, 1, ?5)",
            params![
                league_id,
                name,
                DraftStatus::Setup.as_str(),
                DraftType::Snake.as_str(),
                total_rounds,
            ],
        )?;
        let draft_id = tx.last_insert_rowid();

        for slot in snake_order(&team_ids, total_rounds) {
            tx.execute(
                "INSERT INTO draft_picks (draft_id, round, pick_in_round, overall_pick, team_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    draft_id,
                    slot.round,
                    slot.pick_in_round,
                    slot.overall_pick,
                    slot.team_id,
                ],
            )?;
        }

        let draft = get_draft(&tx, draft_id)?;
        tx.commit()?;
        info!(
            draft_id,
            league_id, total_rounds, "initialized draft with {} pick slots",
            team_ids.len() * total_rounds as usize
        );
        Ok(draft)
    }

    /// Move the draft from `setup` to `in_progress` and put the team on
    /// the very first pick slot on the clock.
    pub fn start_draft(&self, draft_id: i64) -> Result<Draft, DraftError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let draft = get_draft(&tx, draft_id)?;
        if draft.status != DraftStatus::Setup {
            return Err(DraftError::NotInSetup {
                draft_id,
                status: draft.status.as_str().to_string(),
            });
        }

        let first_pick =
            get_pick_at(&tx, draft_id, 1, 1)?.ok_or(DraftError::NoCurrentPick { draft_id })?;

        tx.execute(
            "UPDATE drafts SET status = ?1, started_at = ?2, current_team_id = ?3 WHERE id = ?4",
            params![
                DraftStatus::InProgress.as_str(),
                Utc::now().to_rfc3339(),
                first_pick.team_id,
                draft_id,
            ],
        )?;

        let draft = get_draft(&tx, draft_id)?;
        tx.commit()?;
        info!(draft_id, "draft started");
        Ok(draft)
    }

    /// Load a draft by id.
    pub fn draft(&self, draft_id: i64) -> Result<Draft, DraftError> {
        let conn = self.db.conn();
        get_draft(&conn, draft_id)
    }

    /// The pick slot under the draft cursor, or `None` once the cursor
    /// has advanced past the last round.
    pub fn current_pick(&self, draft_id: i64) -> Result<Option<DraftPick>, DraftError> {
        let conn = self.db.conn();
        let draft = get_draft(&conn, draft_id)?;
        get_pick_at(&conn, draft_id, draft.current_round, draft.current_pick)
    }

    /// All pick slots of a draft in overall order.
    pub fn picks(&self, draft_id: i64) -> Result<Vec<DraftPick>, DraftError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                    player_id, position_filled, advisor_context, picked_at
             FROM draft_picks WHERE draft_id = ?1 ORDER BY overall_pick",
        )?;
        let picks = stmt
            .query_map(params![draft_id], map_pick_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(picks)
    }

    // ------------------------------------------------------------------
    // Making and reverting picks
    // ------------------------------------------------------------------

    /// Record a player into the current pick slot.
    ///
    /// Preconditions, checked in order inside the transaction: the draft
    /// is in progress with a current slot; the slot is unoccupied; the
    /// player is not on any other pick of this draft. When `slot` is
    /// omitted the roster-assignment resolver picks one. On success the
    /// pick is stamped, the roster entry created, and the cursor
    /// advanced — atomically.
    pub fn make_pick(
        &self,
        draft_id: i64,
        player_id: i64,
        slot: Option<SlotLabel>,
        advisor_context: Option<serde_json::Value>,
    ) -> Result<DraftPick, DraftError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let draft = get_draft(&tx, draft_id)?;
        if draft.status != DraftStatus::InProgress {
            return Err(DraftError::NoCurrentPick { draft_id });
        }

        let current = get_pick_at(&tx, draft_id, draft.current_round, draft.current_pick)?
            .ok_or(DraftError::NoCurrentPick { draft_id })?;

        if current.is_picked() {
            return Err(DraftError::PickAlreadyMade {
                overall_pick: current.overall_pick,
            });
        }

        // A player may appear at most once per draft. Scan the picks so
        // the error can name the offending team and pick number.
        let existing: Option<(u32, String, String)> = tx
            .query_row(
                "SELECT dp.overall_pick, t.name, p.name
                 FROM draft_picks dp
                 JOIN teams t ON t.id = dp.team_id
                 JOIN players p ON p.id = dp.player_id
                 WHERE dp.draft_id = ?1 AND dp.player_id = ?2",
                params![draft_id, player_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        if let Some((overall_pick, team, player)) = existing {
            return Err(DraftError::PlayerAlreadyDrafted {
                player,
                team,
                overall_pick,
            });
        }

        let player = get_player(&tx, player_id)?;

        let slot = match slot {
            Some(slot) => slot,
            None => {
                let template = get_template(&tx, draft.league_id)?;
                let filled = filled_labels(&tx, draft_id, current.team_id)?;
                roster::determine_slot_to_fill(&template, &filled, &player)?
            }
        };

        let context_json = advisor_context
            .as_ref()
            .map(|v| v.to_string());

        tx.execute(
            "UPDATE draft_picks
             SET player_id = ?1, position_filled = ?2, advisor_context = ?3, picked_at = ?4
             WHERE id = ?5",
            params![
                player_id,
                slot.to_string(),
                context_json,
                Utc::now().to_rfc3339(),
                current.id,
            ],
        )?;

        tx.execute(
            "INSERT INTO team_rosters (draft_id, team_id, player_id, roster_slot, draft_pick_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![draft_id, current.team_id, player_id, slot.to_string(), current.id],
        )?;

        advance_cursor(&tx, &draft)?;

        let pick = get_pick(&tx, current.id)?;
        tx.commit()?;
        info!(
            draft_id,
            overall_pick = pick.overall_pick,
            player = %player.name,
            slot = %slot,
            "pick recorded"
        );
        Ok(pick)
    }

    /// Undo the chronologically last made pick: the one with the maximum
    /// `overall_pick` among picks with a player — not necessarily the
    /// slot just before the cursor.
    ///
    /// Legal in any status; this is the one operation allowed to reopen a
    /// completed draft. Clears the pick's assignment fields, deletes its
    /// roster entry, and rewinds the cursor to its slot.
    pub fn revert_last_pick(&self, draft_id: i64) -> Result<DraftPick, DraftError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        // Verify the draft exists before reporting "nothing to revert".
        let _ = get_draft(&tx, draft_id)?;

        let last: Option<DraftPick> = {
            let mut stmt = tx.prepare(
                "SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                        player_id, position_filled, advisor_context, picked_at
                 FROM draft_picks
                 WHERE draft_id = ?1 AND player_id IS NOT NULL
                 ORDER BY overall_pick DESC LIMIT 1",
            )?;
            stmt.query_row(params![draft_id], map_pick_row).optional()?
        };
        let last = last.ok_or(DraftError::NothingToRevert { draft_id })?;

        tx.execute(
            "DELETE FROM team_rosters WHERE draft_pick_id = ?1",
            params![last.id],
        )?;

        tx.execute(
            "UPDATE draft_picks
             SET player_id = NULL, position_filled = NULL, advisor_context = NULL, picked_at = NULL
             WHERE id = ?1",
            params![last.id],
        )?;

        tx.execute(
            "UPDATE drafts
             SET current_round = ?1, current_pick = ?2, current_team_id = ?3,
                 status = ?4, completed_at = NULL
             WHERE id = ?5",
            params![
                last.round,
                last.pick_in_round,
                last.team_id,
                DraftStatus::InProgress.as_str(),
                draft_id,
            ],
        )?;

        let pick = get_pick(&tx, last.id)?;
        tx.commit()?;
        info!(draft_id, overall_pick = pick.overall_pick, "pick reverted");
        Ok(pick)
    }

    // ------------------------------------------------------------------
    // Pools, rosters, and needs
    // ------------------------------------------------------------------

    /// Undrafted players: those with no pick in this draft. Optionally
    /// filtered to pitchers or batters.
    pub fn available_players(
        &self,
        draft_id: i64,
        is_pitcher: Option<bool>,
    ) -> Result<Vec<Player>, DraftError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, mlb_team, positions, is_pitcher FROM players
             WHERE id NOT IN (
                 SELECT player_id FROM draft_picks
                 WHERE draft_id = ?1 AND player_id IS NOT NULL
             )
             ORDER BY id",
        )?;
        let mut players = stmt
            .query_map(params![draft_id], crate::db::map_player_row)?
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(is_pitcher) = is_pitcher {
            players.retain(|p| p.is_pitcher == is_pitcher);
        }
        Ok(players)
    }

    /// A team's roster entries for a draft.
    pub fn team_roster(&self, draft_id: i64, team_id: i64) -> Result<Vec<RosterEntry>, DraftError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, draft_id, team_id, player_id, roster_slot, draft_pick_id
             FROM team_rosters WHERE draft_id = ?1 AND team_id = ?2 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![draft_id, team_id], |row| {
                let slot_str: String = row.get(4)?;
                Ok(RosterEntry {
                    id: row.get(0)?,
                    draft_id: row.get(1)?,
                    team_id: row.get(2)?,
                    player_id: row.get(3)?,
                    roster_slot: SlotLabel::parse(&slot_str)
                        .unwrap_or(SlotLabel::bare(Position::Utility)),
                    draft_pick_id: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Open slots per position for a team, from its filled labels and the
    /// league template.
    pub fn team_needs(
        &self,
        draft_id: i64,
        team_id: i64,
    ) -> Result<BTreeMap<Position, u32>, DraftError> {
        let conn = self.db.conn();
        let draft = get_draft(&conn, draft_id)?;
        let template = get_template(&conn, draft.league_id)?;
        let filled = filled_labels(&conn, draft_id, team_id)?;
        Ok(roster::team_needs(&template, &filled))
    }

    /// Undrafted players eligible for at least one of the team's needed
    /// positions.
    pub fn eligible_players(
        &self,
        draft_id: i64,
        team_id: i64,
    ) -> Result<Vec<Player>, DraftError> {
        let needs = self.team_needs(draft_id, team_id)?;
        let available = self.available_players(draft_id, None)?;
        Ok(available
            .into_iter()
            .filter(|player| needs.keys().any(|&pos| player.is_eligible_for(pos)))
            .collect())
    }

    /// Aggregate pick counts for the advisor context.
    pub fn draft_summary(&self, draft_id: i64) -> Result<DraftSummary, DraftError> {
        let conn = self.db.conn();
        let total_picks: u32 = conn.query_row(
            "SELECT COUNT(*) FROM draft_picks WHERE draft_id = ?1",
            params![draft_id],
            |row| row.get(0),
        )?;
        let completed_picks: u32 = conn.query_row(
            "SELECT COUNT(*) FROM draft_picks WHERE draft_id = ?1 AND player_id IS NOT NULL",
            params![draft_id],
            |row| row.get(0),
        )?;
        let pitchers_picked: u32 = conn.query_row(
            "SELECT COUNT(*) FROM draft_picks dp
             JOIN players p ON p.id = dp.player_id
             WHERE dp.draft_id = ?1 AND p.is_pitcher = 1",
            params![draft_id],
            |row| row.get(0),
        )?;
        let hitters_picked = completed_picks - pitchers_picked;

        let percentage = |part: u32| {
            if completed_picks > 0 {
                (part as f64 / completed_picks as f64 * 1000.0).round() / 10.0
            } else {
                0.0
            }
        };

        Ok(DraftSummary {
            total_picks,
            completed_picks,
            remaining_picks: total_picks - completed_picks,
            pitchers_picked,
            hitters_picked,
            pitcher_percentage: percentage(pitchers_picked),
            hitter_percentage: percentage(hitters_picked),
        })
    }
}

// ---------------------------------------------------------------------------
// Row helpers (shared between operations; all take the live connection or
// transaction so no second lock is ever acquired)
// ---------------------------------------------------------------------------

fn get_draft(conn: &Connection, draft_id: i64) -> Result<Draft, DraftError> {
    conn.query_row(
        "SELECT id, league_id, name, status, draft_type, current_round, current_pick,
                current_team_id, total_rounds, started_at, completed_at
         FROM drafts WHERE id = ?1",
        params![draft_id],
        map_draft_row,
    )
    .map_err(DraftError::from)
}

fn map_draft_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Draft> {
    let status_str: String = row.get(3)?;
    let status = DraftStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown draft status `{status_str}`").into(),
        )
    })?;
    let type_str: String = row.get(4)?;
    let draft_type = DraftType::from_str(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown draft type `{type_str}`").into(),
        )
    })?;
    Ok(Draft {
        id: row.get(0)?,
        league_id: row.get(1)?,
        name: row.get(2)?,
        status,
        draft_type,
        current_round: row.get(5)?,
        current_pick: row.get(6)?,
        current_team_id: row.get(7)?,
        total_rounds: row.get(8)?,
        started_at: parse_optional_ts(row.get(9)?),
        completed_at: parse_optional_ts(row.get(10)?),
    })
}

fn map_pick_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DraftPick> {
    let slot_str: Option<String> = row.get(7)?;
    let context_str: Option<String> = row.get(8)?;
    Ok(DraftPick {
        id: row.get(0)?,
        draft_id: row.get(1)?,
        round: row.get(2)?,
        pick_in_round: row.get(3)?,
        overall_pick: row.get(4)?,
        team_id: row.get(5)?,
        player_id: row.get(6)?,
        position_filled: slot_str.as_deref().and_then(SlotLabel::parse),
        advisor_context: context_str.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        picked_at: parse_optional_ts(row.get(9)?),
    })
}

fn parse_optional_ts(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn get_pick(conn: &Connection, pick_id: i64) -> Result<DraftPick, DraftError> {
    conn.query_row(
        "SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                player_id, position_filled, advisor_context, picked_at
         FROM draft_picks WHERE id = ?1",
        params![pick_id],
        map_pick_row,
    )
    .map_err(DraftError::from)
}

fn get_pick_at(
    conn: &Connection,
    draft_id: i64,
    round: u32,
    pick_in_round: u32,
) -> Result<Option<DraftPick>, DraftError> {
    conn.query_row(
        "SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                player_id, position_filled, advisor_context, picked_at
         FROM draft_picks
         WHERE draft_id = ?1 AND round = ?2 AND pick_in_round = ?3",
        params![draft_id, round, pick_in_round],
        map_pick_row,
    )
    .optional()
    .map_err(DraftError::from)
}

fn get_player(conn: &Connection, player_id: i64) -> Result<Player, DraftError> {
    conn.query_row(
        "SELECT id, name, mlb_team, positions, is_pitcher FROM players WHERE id = ?1",
        params![player_id],
        crate::db::map_player_row,
    )
    .map_err(DraftError::from)
}

fn get_template(conn: &Connection, league_id: i64) -> Result<RosterTemplate, DraftError> {
    let mut stmt = conn.prepare(
        "SELECT position_code, slot_count FROM league_positions
         WHERE league_id = ?1 ORDER BY display_order",
    )?;
    let defs = stmt
        .query_map(params![league_id], |row| {
            let code: String = row.get(0)?;
            let slots: u32 = row.get(1)?;
            Ok((code, slots))
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter_map(|(code, slots)| {
            Position::from_code(&code)
                .map(|position| crate::model::RosterSlotDef { position, slots })
        })
        .collect();
    Ok(RosterTemplate(defs))
}

fn filled_labels(
    conn: &Connection,
    draft_id: i64,
    team_id: i64,
) -> Result<Vec<SlotLabel>, DraftError> {
    let mut stmt = conn.prepare(
        "SELECT roster_slot FROM team_rosters WHERE draft_id = ?1 AND team_id = ?2",
    )?;
    let labels = stmt
        .query_map(params![draft_id, team_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .filter_map(|s| SlotLabel::parse(s))
        .collect();
    Ok(labels)
}

/// Advance the cursor after a successful pick: next pick in the round,
/// or pick 1 of the next round. Past the last round the draft completes
/// and the clock is cleared; otherwise the next slot's team goes on the
/// clock.
fn advance_cursor(conn: &Connection, draft: &Draft) -> Result<(), DraftError> {
    let num_teams: u32 = conn.query_row(
        "SELECT COUNT(*) FROM teams WHERE league_id = ?1",
        params![draft.league_id],
        |row| row.get(0),
    )?;

    let (mut round, mut pick) = (draft.current_round, draft.current_pick);
    if pick >= num_teams {
        round += 1;
        pick = 1;
    } else {
        pick += 1;
    }

    if round > draft.total_rounds {
        conn.execute(
            "UPDATE drafts
             SET current_round = ?1, current_pick = ?2, status = ?3,
                 completed_at = ?4, current_team_id = NULL
             WHERE id = ?5",
            params![
                round,
                pick,
                DraftStatus::Completed.as_str(),
                Utc::now().to_rfc3339(),
                draft.id,
            ],
        )?;
        info!(draft_id = draft.id, "draft completed");
    } else {
        let next = get_pick_at(conn, draft.id, round, pick)?;
        conn.execute(
            "UPDATE drafts SET current_round = ?1, current_pick = ?2, current_team_id = ?3
             WHERE id = ?4",
            params![round, pick, next.map(|p| p.team_id), draft.id],
        )?;
    }
    Ok(())
}
