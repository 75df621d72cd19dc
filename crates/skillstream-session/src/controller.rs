//! The session controller state machine.
//!
//! ```text
//! Idle --execute--> Requesting --first fragment--> Streaming --Completed--> Finished
//!                       |                              |---Failed--> Errored
//!                       |---Failed--> Errored          |
//!                       '-------- cancel() ------------'--> Cancelled
//! ```
//!
//! Cancellation wins over a late-arriving terminal event: `cancel()` moves
//! the session to `Cancelled` synchronously, and every transition applied by
//! the drive task is guarded on the session still being live.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::StreamExt;
use skillstream_core::{
    ErrorKind, EventStream, SessionError, SessionId, SessionStatus, Skill, SkillTransport,
    StreamEvent,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::session::ExecutionSession;

/// Controller configuration.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Maximum gap between stream events before the session is failed as
    /// stalled. `None` (the default) waits indefinitely, matching a
    /// transport with no liveness guarantee.
    pub idle_timeout: Option<Duration>,
}

/// Synchronous rejection of an `execute` call. No session is created and no
/// connection is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    #[error("Prompt is empty")]
    EmptyPrompt,
    #[error("A session is already in flight")]
    Busy,
}

struct State {
    session: Option<ExecutionSession>,
    token: Option<CancellationToken>,
    /// Bumped on every new session; stale drive tasks check it before
    /// touching state.
    epoch: u64,
}

struct Shared {
    state: Mutex<State>,
    watch_tx: watch::Sender<Option<ExecutionSession>>,
}

impl Shared {
    /// Run a guarded transition: the mutation is applied only if the epoch
    /// still matches and the session is still live. Discarding under a
    /// failed guard is what makes `Cancelled` final.
    fn transition(&self, epoch: u64, apply: impl FnOnce(&mut ExecutionSession)) {
        let mut state = self.state.lock().unwrap();
        if state.epoch != epoch {
            return;
        }
        let Some(session) = state.session.as_mut() else {
            return;
        };
        if !session.status.is_live() {
            tracing::debug!(status = ?session.status, "Discarding event for settled session");
            return;
        }
        apply(session);
        self.publish(&state);
    }

    fn publish(&self, state: &State) {
        self.watch_tx.send_replace(state.session.clone());
    }
}

/// Drives one skill execution at a time.
///
/// Owns the only mutable copy of the active `ExecutionSession`; callers
/// read snapshots and invoke `execute`/`cancel`. All transitions are
/// evaluated under one lock, held only for examine-decide-mutate, never
/// across an await.
pub struct SessionController<T> {
    transport: Arc<T>,
    config: ControllerConfig,
    shared: Arc<Shared>,
}

impl<T> SessionController<T>
where
    T: SkillTransport + 'static,
{
    /// Create a controller with default configuration.
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_config(transport, ControllerConfig::default())
    }

    /// Create a controller with explicit configuration.
    #[must_use]
    pub fn with_config(transport: Arc<T>, config: ControllerConfig) -> Self {
        let (watch_tx, _) = watch::channel(None);
        Self {
            transport,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    session: None,
                    token: None,
                    epoch: 0,
                }),
                watch_tx,
            }),
        }
    }

    /// Start a new execution session.
    ///
    /// Validation is synchronous and happens before any connection is
    /// opened: an empty or whitespace-only prompt and a controller that is
    /// already `Requesting` or `Streaming` are both rejected without
    /// touching the active session. Must be called within a Tokio runtime.
    ///
    /// # Errors
    /// Returns `ExecuteError::EmptyPrompt` or `ExecuteError::Busy`.
    pub fn execute(&self, skill: &Skill, prompt: &str) -> Result<SessionId, ExecuteError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ExecuteError::EmptyPrompt);
        }

        let (id, token, epoch) = {
            let mut state = self.shared.state.lock().unwrap();
            if state.session.as_ref().is_some_and(|s| s.status.is_live()) {
                return Err(ExecuteError::Busy);
            }

            let id = Uuid::new_v4();
            let token = CancellationToken::new();
            state.session = Some(ExecutionSession::new(id, skill.clone(), prompt));
            state.token = Some(token.clone());
            state.epoch += 1;
            self.shared.publish(&state);
            (id, token, state.epoch)
        };

        tracing::info!(session = %id, skill = %skill.slug, "Starting skill execution");

        let shared = Arc::clone(&self.shared);
        let transport = Arc::clone(&self.transport);
        let slug = skill.slug.clone();
        let prompt = prompt.to_string();
        let idle_timeout = self.config.idle_timeout;
        tokio::spawn(async move {
            drive(shared, transport, slug, prompt, token, epoch, idle_timeout).await;
        });

        Ok(id)
    }

    /// Request cancellation of the in-flight session.
    ///
    /// Effective immediately: the session moves to `Cancelled` before this
    /// returns, no further fragments are applied, and a terminal event that
    /// races in later is discarded. No-op when no session is live.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock().unwrap();
        let Some(session) = state.session.as_mut() else {
            return;
        };
        if !session.status.is_live() {
            return;
        }

        session.status = SessionStatus::Cancelled;
        tracing::info!(session = %session.id, "Cancelled skill execution");
        if let Some(token) = state.token.take() {
            token.cancel();
        }
        self.shared.publish(&state);
    }

    /// Discard a settled session, returning the controller to `Idle`.
    ///
    /// Used when the front end switches skills. Returns `false` (and leaves
    /// state untouched) while a session is live.
    pub fn clear(&self) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        if state.session.as_ref().is_some_and(|s| s.status.is_live()) {
            return false;
        }
        state.session = None;
        state.token = None;
        self.shared.publish(&state);
        true
    }

    /// Snapshot of the current session, if any.
    #[must_use]
    pub fn session(&self) -> Option<ExecutionSession> {
        self.shared.state.lock().unwrap().session.clone()
    }

    /// Current status; `Idle` when no session exists.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.shared
            .state
            .lock()
            .unwrap()
            .session
            .as_ref()
            .map_or(SessionStatus::Idle, |s| s.status)
    }

    /// Reactive handle for observers: receives a fresh snapshot on every
    /// transition. The controller does not care how (or whether) it is
    /// consumed.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<ExecutionSession>> {
        self.shared.watch_tx.subscribe()
    }
}

enum Next {
    Event(Option<StreamEvent>),
    Stalled,
}

async fn next_event(stream: &mut EventStream, idle_timeout: Option<Duration>) -> Next {
    match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
            Ok(event) => Next::Event(event),
            Err(_) => Next::Stalled,
        },
        None => Next::Event(stream.next().await),
    }
}

/// The single fragment-consumption loop for one session.
///
/// Returning drops the stream, which releases the transport connection;
/// every exit path goes through that drop exactly once.
async fn drive<T>(
    shared: Arc<Shared>,
    transport: Arc<T>,
    slug: String,
    prompt: String,
    token: CancellationToken,
    epoch: u64,
    idle_timeout: Option<Duration>,
) where
    T: SkillTransport,
{
    let opened = tokio::select! {
        biased;
        () = token.cancelled() => return,
        opened = transport.open_stream(&slug, &prompt, token.clone()) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            shared.transition(epoch, |session| {
                session.status = SessionStatus::Errored;
                session.error = Some(SessionError {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            });
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => return,
            next = next_event(&mut stream, idle_timeout) => next,
        };

        match next {
            Next::Event(Some(StreamEvent::TextFragment { text })) => {
                shared.transition(epoch, |session| {
                    // First fragment proves the service is responding.
                    if session.status == SessionStatus::Requesting {
                        session.status = SessionStatus::Streaming;
                    }
                    session.accumulated_output.push_str(&text);
                });
            }
            Next::Event(Some(StreamEvent::Completed {
                execution_time_seconds,
            })) => {
                shared.transition(epoch, |session| {
                    session.status = SessionStatus::Finished;
                    session.execution_time_seconds = Some(execution_time_seconds);
                });
                return;
            }
            Next::Event(Some(StreamEvent::Failed { message })) => {
                shared.transition(epoch, |session| {
                    session.status = SessionStatus::Errored;
                    session.error = Some(SessionError {
                        kind: ErrorKind::Stream,
                        message,
                    });
                });
                return;
            }
            Next::Event(None) => {
                shared.transition(epoch, |session| {
                    session.status = SessionStatus::Errored;
                    session.error = Some(SessionError {
                        kind: ErrorKind::Protocol,
                        message: "stream ended without a terminal event".to_string(),
                    });
                });
                return;
            }
            Next::Stalled => {
                shared.transition(epoch, |session| {
                    session.status = SessionStatus::Errored;
                    session.error = Some(SessionError {
                        kind: ErrorKind::Stalled,
                        message: "stream stopped delivering events".to_string(),
                    });
                });
                return;
            }
        }
    }
}
