//! Boundary traits for the catalog and transport collaborators.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{Category, Skill, StreamEvent};

/// Execution session identifier.
pub type SessionId = Uuid;

/// Status of an execution session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No session in flight.
    Idle,
    /// Connection requested, no output received yet.
    Requesting,
    /// At least one fragment received, stream still open.
    Streaming,
    /// Stream completed successfully.
    Finished,
    /// Stream or connection failed.
    Errored,
    /// The caller stopped the session.
    Cancelled,
}

impl SessionStatus {
    /// Whether a session with this status is still consuming its stream.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Requesting | Self::Streaming)
    }

    /// Whether this status admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Errored | Self::Cancelled)
    }
}

/// Classification of a session failure, kept alongside the message so the
/// front end can distinguish failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The connection could not be opened.
    Connect,
    /// The service returned a failure or the stream broke mid-flight.
    Stream,
    /// The stream stopped delivering events past the configured idle timeout.
    Stalled,
    /// The stream ended without a terminal event.
    Protocol,
}

/// Failure details retained on an errored session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable message from the transport or service.
    pub message: String,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Catalog error.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Skill not found: {0}")]
    NotFound(String),
    #[error("Catalog error: {0}")]
    Internal(String),
}

/// Transport error, raised when a stream cannot be opened or breaks.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Service returned status {0}")]
    Status(u16),
    #[error("Stream error: {0}")]
    Stream(String),
}

impl TransportError {
    /// Classification for session error reporting.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect(_) => ErrorKind::Connect,
            Self::Status(_) | Self::Stream(_) => ErrorKind::Stream,
        }
    }
}

/// Lazy, finite, non-restartable sequence of stream events.
///
/// Implementations must release the underlying connection exactly once on
/// every exit path; dropping the stream is the release.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Trait for skill catalog backends.
///
/// Reads are pure and side-effect-free; implementations may cache.
#[async_trait]
pub trait SkillCatalog: Send + Sync {
    /// List skills, optionally restricted to one category.
    async fn list_skills(&self, category: Option<&str>) -> Result<Vec<Skill>, CatalogError>;

    /// List categories with skill counts, derived from the current skill set.
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Look up a single skill by slug.
    async fn get(&self, slug: &str) -> Result<Skill, CatalogError>;
}

/// Trait for streaming skill transports.
#[async_trait]
pub trait SkillTransport: Send + Sync {
    /// Open a streaming execution of `slug` with `prompt`.
    ///
    /// The returned stream yields fragments in arrival order and terminates
    /// after at most one `Completed` or `Failed` event. The `token` is
    /// checked at every yield point; once cancelled, the transport stops
    /// reading and the consumer releases the connection by dropping the
    /// stream.
    ///
    /// The transport does not validate that `slug` exists in any catalog;
    /// that is the caller's responsibility.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be opened; failures after
    /// that surface as a single in-stream `Failed` event.
    async fn open_stream(
        &self,
        slug: &str,
        prompt: &str,
        token: CancellationToken,
    ) -> Result<EventStream, TransportError>;
}
