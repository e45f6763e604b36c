//! Configuration for the `taskboard` client.
//!
//! Layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use taskboard_proto::task::{Priority, Status, TeamId, UserId};

use crate::board::BoardSettings;
use crate::gateway::TaskScope;
use crate::tasks::{DEFAULT_MAX_TITLE_LEN, TaskFilter};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    board: BoardFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    token: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    user_id: Option<String>,
    user_name: Option<String>,
    team_id: Option<String>,
    team_query: Option<bool>,
    max_title_len: Option<usize>,
    rollback_on_failure: Option<bool>,
    event_buffer: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- API --
    /// Root of the REST API.
    pub base_url: String,
    /// Bearer credential, if any.
    pub token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,

    // -- Board --
    /// Acting user id.
    pub user_id: String,
    /// Acting user display name.
    pub user_name: String,
    /// Team whose board is shown; `None` for the personal board.
    pub team_id: Option<String>,
    /// List the team's tasks with `GET /tasks?teamId=` instead of the
    /// team collection.
    pub team_query: bool,
    /// Maximum task title length in characters.
    pub max_title_len: usize,
    /// Move tasks back when the server rejects a move.
    pub rollback_on_failure: bool,
    /// Buffer size for the board event channel.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            token: None,
            request_timeout: Duration::from_secs(10),
            user_id: "local".to_string(),
            user_name: "Me".to_string(),
            team_id: None,
            team_query: false,
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            rollback_on_failure: false,
            event_buffer: 64,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or if any config file that exists fails to parse.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// CLI and environment values over compiled defaults, skipping the
    /// config file. Used when the file cannot be loaded.
    #[must_use]
    pub fn from_cli(cli: &CliArgs) -> Self {
        Self::resolve(cli, &ConfigFile::default())
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            base_url: cli
                .base_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.base_url),
            token: cli.token.clone().or_else(|| file.api.token.clone()),
            request_timeout: file
                .api
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            user_id: cli
                .user_id
                .clone()
                .or_else(|| file.board.user_id.clone())
                .unwrap_or(defaults.user_id),
            user_name: cli
                .user_name
                .clone()
                .or_else(|| file.board.user_name.clone())
                .unwrap_or(defaults.user_name),
            team_id: cli
                .team
                .clone()
                .or_else(|| file.board.team_id.clone())
                .filter(|t| !t.is_empty()),
            team_query: cli.team_query || file.board.team_query.unwrap_or(defaults.team_query),
            max_title_len: file
                .board
                .max_title_len
                .unwrap_or(defaults.max_title_len),
            rollback_on_failure: cli.rollback
                || file
                    .board
                    .rollback_on_failure
                    .unwrap_or(defaults.rollback_on_failure),
            event_buffer: file.board.event_buffer.unwrap_or(defaults.event_buffer),
        }
    }

    /// Collection the board mirrors.
    #[must_use]
    pub fn scope(&self) -> TaskScope {
        match &self.team_id {
            None => TaskScope::Personal,
            Some(team) if self.team_query => TaskScope::TeamFiltered(TeamId::new(team.as_str())),
            Some(team) => TaskScope::Team(TeamId::new(team.as_str())),
        }
    }

    /// Board behavior derived from this configuration.
    #[must_use]
    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            user_id: UserId::new(self.user_id.as_str()),
            user_name: self.user_name.clone(),
            max_title_len: self.max_title_len,
            rollback_on_failure: self.rollback_on_failure,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban task board client")]
pub struct CliArgs {
    /// Root URL of the task API.
    #[arg(long, env = "TASKBOARD_API_URL", global = true)]
    pub base_url: Option<String>,

    /// Bearer token sent with every request.
    #[arg(long, env = "TASKBOARD_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Acting user id.
    #[arg(long, env = "TASKBOARD_USER_ID", global = true)]
    pub user_id: Option<String>,

    /// Acting user display name (default assignee for new tasks).
    #[arg(long, env = "TASKBOARD_USER_NAME", global = true)]
    pub user_name: Option<String>,

    /// Work on a team's board instead of the personal one.
    #[arg(long, env = "TASKBOARD_TEAM", global = true)]
    pub team: Option<String>,

    /// Reach the team's tasks through `/tasks?teamId=` instead of
    /// `/teams/{team}/tasks`.
    #[arg(long, global = true)]
    pub team_query: bool,

    /// Move tasks back when the server rejects a move.
    #[arg(long, global = true)]
    pub rollback: bool,

    /// Use an in-memory board with demo tasks instead of the API.
    #[arg(long, global = true)]
    pub offline: bool,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "TASKBOARD_LOG", global = true)]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do; defaults to `list`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Board subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board.
    List(FilterArgs),
    /// Create a task.
    Add {
        /// Task title.
        title: String,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: NaiveDate,
        /// Longer description.
        #[arg(long)]
        description: Option<String>,
        /// low, medium or high.
        #[arg(long)]
        priority: Option<Priority>,
        /// Initial column (defaults to todo).
        #[arg(long)]
        status: Option<Status>,
        /// Personal assignee (defaults to the acting user's name).
        #[arg(long)]
        assignee: Option<String>,
        /// Team member id to assign; repeatable.
        #[arg(long = "member")]
        members: Vec<String>,
    },
    /// Move a task to another column.
    Move {
        /// Task id.
        id: String,
        /// Destination column.
        to: Status,
    },
    /// Change task fields other than status.
    Edit {
        /// Task id.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// New due date (YYYY-MM-DD).
        #[arg(long)]
        due: Option<NaiveDate>,
        /// New priority.
        #[arg(long)]
        priority: Option<Priority>,
        /// New personal assignee.
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Delete a task.
    Rm {
        /// Task id.
        id: String,
    },
}

/// Filter flags for `list`. Unset flags constrain nothing.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    /// Due date prefix: `2024`, `2024-08` or `2024-08-01`.
    #[arg(long)]
    pub date: Option<String>,
    /// Assignee name or team member id.
    #[arg(long)]
    pub assignee: Option<String>,
    /// Only this column.
    #[arg(long)]
    pub status: Option<Status>,
    /// Only tasks owned by this team.
    #[arg(long = "in-team")]
    pub team_id: Option<String>,
}

impl From<FilterArgs> for TaskFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            date: args.date.unwrap_or_default(),
            assignee: args.assignee.unwrap_or_default(),
            status: args.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
            team_id: args.team_id.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskboard").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
