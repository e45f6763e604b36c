//! Remote task gateway abstraction.
//!
//! Defines the [`TaskGateway`] trait the board talks to. Implementations:
//! - [`http::HttpGateway`]: the REST API over `reqwest`
//! - [`memory::MemoryGateway`]: in-process server stand-in for tests and
//!   offline mode
//!
//! A gateway is stateless from the board's point of view: it translates
//! requests and responses, never retries, and never touches the task store.

pub mod http;
pub mod memory;

use std::fmt;
use std::future::Future;

use taskboard_proto::task::{Status, Task, TaskId, TeamId};
use taskboard_proto::wire::{TaskPatch, WireError};

use crate::tasks::Columns;

/// Which task collection a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TaskScope {
    /// The acting user's tasks: `/tasks`.
    #[default]
    Personal,
    /// A team's tasks: `/teams/{teamId}/tasks`.
    Team(TeamId),
    /// A team's tasks through the flat collection: listed with
    /// `GET /tasks?teamId={teamId}`, written through `/tasks`.
    TeamFiltered(TeamId),
}

impl TaskScope {
    /// URL path segments of the collection.
    #[must_use]
    pub fn collection_segments(&self) -> Vec<&str> {
        match self {
            Self::Personal | Self::TeamFiltered(_) => vec!["tasks"],
            Self::Team(team) => vec!["teams", team.as_str(), "tasks"],
        }
    }

    /// Query parameter narrowing a listing of the collection.
    #[must_use]
    pub fn list_query(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::TeamFiltered(team) => Some(("teamId", team.as_str())),
            Self::Personal | Self::Team(_) => None,
        }
    }

    /// Owning team, for the team scopes.
    #[must_use]
    pub const fn team(&self) -> Option<&TeamId> {
        match self {
            Self::Personal => None,
            Self::Team(team) | Self::TeamFiltered(team) => Some(team),
        }
    }
}

impl fmt::Display for TaskScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Team(team) => write!(f, "team:{team}"),
            Self::TeamFiltered(team) => write!(f, "tasks?teamId={team}"),
        }
    }
}

/// Message the API sends with a `403` for a dead session.
const SESSION_EXPIRED_MESSAGE: &str = "invalid or expired token";

/// Errors returned by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server responded {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the raw body.
        message: String,
    },

    /// The response body did not fit the typed task model.
    #[error("invalid response: {0}")]
    Decode(#[from] WireError),

    /// The configured base URL cannot be used for API requests.
    #[error("invalid base url: {0}")]
    BaseUrl(String),

    /// The gateway refused the request without reaching a server.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether this is the API's "invalid or expired token" rejection,
    /// which an outer session layer treats as a forced logout.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        match self {
            Self::Status { status, message } => {
                *status == 403
                    && message
                        .to_ascii_lowercase()
                        .contains(SESSION_EXPIRED_MESSAGE)
            }
            _ => false,
        }
    }
}

/// Async gateway to the task REST API.
///
/// Every failure is returned to the caller; callers decide whether and how
/// the task store changes.
pub trait TaskGateway: Send + Sync {
    /// Fetches every task in `scope`, grouped by status.
    fn fetch_all(
        &self,
        scope: &TaskScope,
    ) -> impl Future<Output = Result<Columns, GatewayError>> + Send;

    /// Creates a task and returns it as the server assigned it.
    fn create(
        &self,
        scope: &TaskScope,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, GatewayError>> + Send;

    /// Sends a partial update. The merged task is not returned.
    fn update(
        &self,
        scope: &TaskScope,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Deletes a task.
    fn remove(
        &self,
        scope: &TaskScope,
        id: &TaskId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Sends a status-only update.
    fn update_status(
        &self,
        scope: &TaskScope,
        id: &TaskId,
        status: Status,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        let patch = TaskPatch::status(status);
        async move { self.update(scope, id, &patch).await }
    }
}
