// Draft simulator entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config/league.toml
// 3. Open database, seed the league, teams, and scoring formula
// 4. Recompute league scores from stored projections
// 5. Initialize and start a snake draft
// 6. Auto-draft every round with the fallback advisor
// 7. Print the finished board

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use draft_sim::advisor::{self, FallbackAdvisor};
use draft_sim::config;
use draft_sim::db::Database;
use draft_sim::draft::engine::DraftEngine;
use draft_sim::scoring::{ScoringEngine, ScoringError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("draft simulator starting up");

    let cwd = std::env::current_dir()?;
    let config = config::load_config_from(&cwd).context("failed to load configuration")?;
    info!(
        "config loaded: league={}, {} teams, {} rounds",
        config.league_name,
        config.num_teams(),
        config.roster_template.total_rounds()
    );

    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("database opened at {}", config.db_path);

    // Seed the league, its draft order, and the scoring formula.
    let league_id = db
        .create_league(&config.league_name, config.num_teams(), &config.roster_template)
        .context("failed to create league")?;
    for (i, name) in config.teams.iter().enumerate() {
        db.create_team(league_id, name, i as u32 + 1)
            .with_context(|| format!("failed to create team {name}"))?;
    }
    let mut categories = config.batter_categories.clone();
    categories.extend(config.pitcher_categories.clone());
    db.set_scoring_categories(league_id, &categories)
        .context("failed to store scoring categories")?;

    // Convert stored projections into league points. A league without a
    // formula can still run a draft; the advisor falls back to rank data.
    let scoring = ScoringEngine::new(&db);
    match scoring.calculate_league_scores(league_id, config.season, &config.projection_source) {
        Ok(count) => info!("scored {count} players"),
        Err(ScoringError::NoCategoriesConfigured { .. }) => {
            warn!("no scoring categories configured, drafting without league points");
        }
        Err(e) => return Err(e).context("failed to calculate league scores"),
    }

    let engine = DraftEngine::new(&db);
    let draft = engine
        .initialize_draft(league_id, None)
        .context("failed to initialize draft")?;
    let draft = engine.start_draft(draft.id).context("failed to start draft")?;
    info!("draft {} started: {} rounds", draft.id, draft.total_rounds);

    let result = advisor::simulate_rounds(
        &db,
        &FallbackAdvisor,
        draft.id,
        draft.total_rounds,
        config.season,
        &config.projection_source,
        Duration::from_secs(30),
        |made, planned, pick| {
            info!(
                "pick {made}/{planned}: #{} {} -> {} ({})",
                pick.overall_pick, pick.team_name, pick.player_name, pick.roster_slot
            );
        },
    )
    .await
    .context("simulation failed")?;

    for error in &result.errors {
        warn!("{error}");
    }

    // Print the finished board.
    let summary = engine.draft_summary(draft.id)?;
    println!(
        "{}: {}/{} picks made ({} hitters, {} pitchers)",
        config.league_name,
        summary.completed_picks,
        summary.total_picks,
        summary.hitters_picked,
        summary.pitchers_picked
    );
    for pick in engine.picks(draft.id)? {
        let Some(player_id) = pick.player_id else { continue };
        let player = db.player(player_id)?;
        let team = db.team(pick.team_id)?;
        let slot = pick.position_filled.map(|s| s.to_string()).unwrap_or_default();
        println!(
            "R{:<3} #{:<4} {:<20} {:<6} {}",
            pick.round, pick.overall_pick, team.name, slot, player.name
        );
    }

    info!("draft simulator finished");
    Ok(())
}

/// Initialize tracing to stderr, filtered by RUST_LOG.
fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("draft_sim=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
