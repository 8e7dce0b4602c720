// Configuration loading and parsing (league.toml, settings.toml).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

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

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub championships: Vec<ManualChampionship>,
    pub exceptions: ExceptionsConfig,
    pub aggregation: AggregationSettings,
    pub bracket: BracketConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    #[serde(default)]
    championships: Vec<ManualChampionship>,
    #[serde(default)]
    exceptions: ExceptionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    /// Sleeper league id of the current (newest) season.
    pub id: String,
    pub name: String,
    /// Seasons whose playoff bracket is rebuilt from matchup points.
    #[serde(default)]
    pub bracket_seasons: Vec<u16>,
}

/// One row of the manual championship table. Counts are added to the
/// winners computed from reconstructed brackets.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ManualChampionship {
    pub user_id: String,
    pub count: u32,
    #[serde(default)]
    pub note: Option<String>,
}

/// Named data-quality exceptions. These are one-off patches for known
/// anomalies in league history and are not general rules.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ExceptionsConfig {
    /// Case-insensitive substrings; matching team names never count as the
    /// league's worst week.
    #[serde(default)]
    pub worst_week_excluded_teams: Vec<String>,
    /// Draft classes skipped by the bust/steal computation.
    #[serde(default)]
    pub draft_excluded_seasons: Vec<u16>,
}

impl ExceptionsConfig {
    /// Whether `team_name` matches one of the worst-week exclusions.
    pub fn excludes_worst_week_team(&self, team_name: &str) -> bool {
        let lower = team_name.to_lowercase();
        self.worst_week_excluded_teams
            .iter()
            .any(|needle| !needle.is_empty() && lower.contains(&needle.to_lowercase()))
    }

    pub fn excludes_draft_season(&self, year: u16) -> bool {
        self.draft_excluded_seasons.contains(&year)
    }
}

// ---------------------------------------------------------------------------
// settings.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire settings.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    aggregation: AggregationSettings,
    bracket: BracketConfig,
    cache: CacheConfig,
    http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AggregationSettings {
    /// Playoff weeks appended to the regular season when computing a
    /// season's week range.
    pub playoff_weeks: u32,
    /// Hard ceiling on any season's week range.
    pub max_week: u32,
    /// Maximum number of in-flight week fetches.
    pub pool_size: usize,
    /// Games decided by this many points or fewer are close games.
    pub close_game_margin: f64,
    /// Minimum meetings before a pairing can be a rivalry.
    pub rivalry_min_games: u32,
    /// Length of the per-user weekly leaderboard.
    pub top_weeks: usize,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            playoff_weeks: 3,
            max_week: 18,
            pool_size: 6,
            close_game_margin: 10.0,
            rivalry_min_games: 3,
            top_weeks: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketConfig {
    pub teams: usize,
    pub byes: usize,
    /// Week number of each round, play-in first.
    pub round_weeks: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// SQLite file path. Empty resolves to the platform data directory.
    pub path: String,
    /// Version tag embedded in every cache key.
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HttpConfig {
    pub base_url: String,
    pub projections_url: String,
    pub scores_url: String,
    pub user_agent: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Files under `config/`, each seeded from `defaults/` when missing.
pub const CONFIG_FILES: [&str; 2] = ["league.toml", "settings.toml"];

/// Overrides the working directory as the root holding `config/` and
/// `defaults/`.
pub const HOME_ENV: &str = "LEAGUEBOOK_HOME";

/// Load and validate `config/league.toml` and `config/settings.toml` under
/// `base_dir`. Nothing is seeded; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");
    let LeagueFile {
        league,
        championships,
        exceptions,
    } = parse_toml(&config_dir.join("league.toml"))?;
    let SettingsFile {
        aggregation,
        bracket,
        cache,
        http,
    } = parse_toml(&config_dir.join("settings.toml"))?;

    let config = Config {
        league,
        championships,
        exceptions,
        aggregation,
        bracket,
        cache,
        http,
    };
    validate(&config)?;
    Ok(config)
}

/// Seed each missing file of `CONFIG_FILES` from `defaults/`, never touching a
/// file that already exists. Returns the paths written.
///
/// A root with neither `defaults/` nor `config/` is an error: the binary was
/// started outside its installation.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    match (defaults_dir.is_dir(), config_dir.is_dir()) {
        (false, false) => {
            return Err(seed_error(format!(
                "neither defaults/ nor config/ found in {}; set {HOME_ENV} or run from the install root",
                base_dir.display()
            )))
        }
        (false, true) => return Ok(Vec::new()),
        _ => {}
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| seed_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut seeded = Vec::new();
    for name in CONFIG_FILES {
        let source = defaults_dir.join(name);
        if !source.is_file() {
            continue;
        }
        let target = config_dir.join(name);
        if seed_file(&source, &target)? {
            seeded.push(target);
        }
    }
    Ok(seeded)
}

/// Load config from `$LEAGUEBOOK_HOME`, or the working directory when unset,
/// seeding missing files from `defaults/` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let base_dir = match std::env::var_os(HOME_ENV) {
        Some(home) => PathBuf::from(home),
        None => std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
            path: PathBuf::from("."),
        })?,
    };
    ensure_config_files(&base_dir)?;
    load_config_from(&base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy `source` to `target` unless `target` exists. Returns whether it
/// copied.
fn seed_file(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(seed_error(format!("cannot create {}: {e}", target.display()))),
    };
    let mut src = std::fs::File::open(source)
        .map_err(|e| seed_error(format!("cannot read {}: {e}", source.display())))?;
    std::io::copy(&mut src, &mut dest)
        .map_err(|e| seed_error(format!("cannot write {}: {e}", target.display())))?;
    Ok(true)
}

fn seed_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.id.trim().is_empty() {
        return Err(invalid("league.id", "must not be empty"));
    }

    let agg = &config.aggregation;
    if agg.max_week == 0 || agg.max_week > 18 {
        return Err(invalid(
            "aggregation.max_week",
            format!("must be between 1 and 18, got {}", agg.max_week),
        ));
    }
    if !(1..=16).contains(&agg.pool_size) {
        return Err(invalid(
            "aggregation.pool_size",
            format!("must be between 1 and 16, got {}", agg.pool_size),
        ));
    }
    if agg.close_game_margin < 0.0 {
        return Err(invalid(
            "aggregation.close_game_margin",
            format!("must be >= 0, got {}", agg.close_game_margin),
        ));
    }
    if agg.top_weeks == 0 {
        return Err(invalid("aggregation.top_weeks", "must be > 0"));
    }

    let bracket = &config.bracket;
    if bracket.byes >= bracket.teams {
        return Err(invalid(
            "bracket.byes",
            format!("must be less than bracket.teams ({})", bracket.teams),
        ));
    }
    if bracket.round_weeks.is_empty() {
        return Err(invalid("bracket.round_weeks", "must list at least one week"));
    }
    if bracket.round_weeks.windows(2).any(|w| w[0] >= w[1]) {
        return Err(invalid("bracket.round_weeks", "must be strictly ascending"));
    }

    if config.cache.version.trim().is_empty() {
        return Err(invalid("cache.version", "must not be empty"));
    }
    if config.cache.version.contains(':') {
        return Err(invalid("cache.version", "must not contain ':'"));
    }

    for (i, champ) in config.championships.iter().enumerate() {
        if champ.user_id.trim().is_empty() {
            return Err(invalid(
                &format!("championships[{i}].user_id"),
                "must not be empty",
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
