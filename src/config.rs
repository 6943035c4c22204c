// Configuration loading and parsing (league.toml).
//
// The TOML file is the one place position codes exist as strings; parsing
// converts them into the typed `RosterTemplate` the rest of the crate uses.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::model::{PlayerType, RosterSlotDef, RosterTemplate, ScoringCategory};
use crate::position::Position;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse config: {0}")]
    ParseString(toml::de::Error),

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Raw file structs (serde targets)
// ---------------------------------------------------------------------------

/// Wrapper for the top-level tables in league.toml.
#[derive(Debug, Deserialize)]
struct LeagueFile {
    league: LeagueSection,
    #[serde(default)]
    scoring: ScoringSection,
    #[serde(default)]
    database: DatabaseSection,
}

#[derive(Debug, Deserialize)]
struct LeagueSection {
    name: String,
    /// Team names in draft-slot order (slot 1 first).
    teams: Vec<String>,
    roster: Vec<RosterEntry>,
    #[serde(default)]
    batter_categories: Vec<CategoryEntry>,
    #[serde(default)]
    pitcher_categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    position: String,
    slots: u32,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    stat: String,
    #[serde(default)]
    name: String,
    points: f64,
}

#[derive(Debug, Deserialize)]
struct ScoringSection {
    #[serde(default = "default_season")]
    season: u32,
    #[serde(default = "default_source")]
    source: String,
}

impl Default for ScoringSection {
    fn default() -> Self {
        ScoringSection {
            season: default_season(),
            source: default_source(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    #[serde(default = "default_db_path")]
    path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: default_db_path(),
        }
    }
}

fn default_season() -> u32 {
    2026
}

fn default_source() -> String {
    "fantasypros".to_string()
}

fn default_db_path() -> String {
    "draft-sim.db".to_string()
}

// ---------------------------------------------------------------------------
// Assembled config
// ---------------------------------------------------------------------------

/// Fully parsed and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub league_name: String,
    /// Team names in draft-slot order.
    pub teams: Vec<String>,
    pub roster_template: RosterTemplate,
    pub batter_categories: Vec<ScoringCategory>,
    pub pitcher_categories: Vec<ScoringCategory>,
    pub season: u32,
    pub projection_source: String,
    pub db_path: String,
}

impl Config {
    pub fn num_teams(&self) -> u32 {
        self.teams.len() as u32
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a league.toml document from a string.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let file: LeagueFile = toml::from_str(text).map_err(ConfigError::ParseString)?;
    assemble(file)
}

/// Load `config/league.toml` relative to `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("league.toml");
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    let file: LeagueFile =
        toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })?;
    assemble(file)
}

fn assemble(file: LeagueFile) -> Result<Config, ConfigError> {
    let mut template = Vec::with_capacity(file.league.roster.len());
    for entry in &file.league.roster {
        let position =
            Position::from_code(&entry.position).ok_or_else(|| ConfigError::ValidationError {
                field: "league.roster.position".into(),
                message: format!("unknown position code `{}`", entry.position),
            })?;
        template.push(RosterSlotDef {
            position,
            slots: entry.slots,
        });
    }

    let config = Config {
        league_name: file.league.name,
        teams: file.league.teams,
        roster_template: RosterTemplate(template),
        batter_categories: convert_categories(&file.league.batter_categories, PlayerType::Batter),
        pitcher_categories: convert_categories(
            &file.league.pitcher_categories,
            PlayerType::Pitcher,
        ),
        season: file.scoring.season,
        projection_source: file.scoring.source,
        db_path: file.database.path,
    };

    validate(&config)?;
    Ok(config)
}

fn convert_categories(entries: &[CategoryEntry], player_type: PlayerType) -> Vec<ScoringCategory> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| ScoringCategory {
            player_type,
            stat_code: e.stat.clone(),
            stat_name: if e.name.is_empty() {
                e.stat.clone()
            } else {
                e.name.clone()
            },
            points_per_unit: e.points,
            display_order: i as u32,
            is_active: true,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.teams.len() < 2 {
        return Err(ConfigError::ValidationError {
            field: "league.teams".into(),
            message: format!("need at least 2 teams, got {}", config.teams.len()),
        });
    }

    if config.roster_template.total_rounds() == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.roster".into(),
            message: "roster template must contain at least one slot".into(),
        });
    }

    // Duplicate positions would make slot counts ambiguous.
    let mut seen = std::collections::HashSet::new();
    for def in config.roster_template.iter() {
        if !seen.insert(def.position) {
            return Err(ConfigError::ValidationError {
                field: "league.roster".into(),
                message: format!("duplicate roster position `{}`", def.position),
            });
        }
    }

    for (field, categories) in [
        ("league.batter_categories", &config.batter_categories),
        ("league.pitcher_categories", &config.pitcher_categories),
    ] {
        let mut codes = std::collections::HashSet::new();
        for cat in categories.iter() {
            if !codes.insert(cat.stat_code.as_str()) {
                return Err(ConfigError::ValidationError {
                    field: field.into(),
                    message: format!("duplicate stat code `{}`", cat.stat_code),
                });
            }
            if !cat.points_per_unit.is_finite() {
                return Err(ConfigError::ValidationError {
                    field: field.into(),
                    message: format!("points for `{}` must be finite", cat.stat_code),
                });
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
