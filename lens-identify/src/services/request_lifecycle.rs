//! Request lifecycle tracking
//!
//! Each client session has at most one live identification request. Starting
//! a new one cancels the previous pending request, and only the newest
//! request of a session may record its result. A late answer from a
//! superseded request is discarded.
//!
//! States: `Pending` → `Resolved` | `Failed` | `Cancelled`

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Session limit. Finished sessions are pruned first; when all are pending
/// the oldest request is cancelled and forgotten.
pub const MAX_TRACKED_SESSIONS: usize = 1024;

/// Last known state of a session's request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState<T> {
    Pending,
    Resolved { result: T },
    Failed { message: String },
    Cancelled,
}

impl<T> RequestState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }
}

/// Handle held by the code running a tracked request
#[derive(Debug, Clone)]
pub struct RequestTicket {
    session: String,
    generation: u64,
    token: CancellationToken,
}

impl RequestTicket {
    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancelled when the request is superseded or explicitly cancelled
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Whether `finish` stored the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    Recorded,
    /// A newer request replaced this one, or it was cancelled
    Discarded,
}

struct SessionSlot<T> {
    generation: u64,
    token: CancellationToken,
    state: RequestState<T>,
}

/// Per-session request tracker
pub struct RequestTracker<T> {
    sessions: Mutex<HashMap<String, SessionSlot<T>>>,
    next_generation: AtomicU64,
}

impl<T: Clone> Default for RequestTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> RequestTracker<T> {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Start a request, superseding any pending request of the same session
    pub async fn begin(&self, session: &str) -> RequestTicket {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let mut sessions = self.sessions.lock().await;

        if sessions.len() >= MAX_TRACKED_SESSIONS && !sessions.contains_key(session) {
            sessions.retain(|_, slot| slot.state.is_pending());
        }
        if sessions.len() >= MAX_TRACKED_SESSIONS && !sessions.contains_key(session) {
            // Every tracked session is still pending: drop the oldest request
            let oldest = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.generation)
                .map(|(name, _)| name.clone());
            if let Some(name) = oldest {
                if let Some(slot) = sessions.remove(&name) {
                    tracing::warn!(
                        session = %name,
                        generation = slot.generation,
                        "Session limit reached, cancelling oldest pending request"
                    );
                    slot.token.cancel();
                }
            }
        }

        if let Some(previous) = sessions.get(session) {
            if previous.state.is_pending() {
                tracing::debug!(
                    session,
                    superseded = previous.generation,
                    generation,
                    "Superseding pending request"
                );
                previous.token.cancel();
            }
        }

        sessions.insert(
            session.to_string(),
            SessionSlot {
                generation,
                token: token.clone(),
                state: RequestState::Pending,
            },
        );

        RequestTicket {
            session: session.to_string(),
            generation,
            token,
        }
    }

    /// Record the final state of a request
    pub async fn finish(&self, ticket: &RequestTicket, state: RequestState<T>) -> FinishOutcome {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&ticket.session) {
            Some(slot) if slot.generation == ticket.generation && slot.state.is_pending() => {
                slot.state = state;
                FinishOutcome::Recorded
            }
            _ => {
                tracing::debug!(
                    session = %ticket.session,
                    generation = ticket.generation,
                    "Discarding result of superseded request"
                );
                FinishOutcome::Discarded
            }
        }
    }

    /// Cancel the pending request of a session
    ///
    /// Returns false when nothing was pending.
    pub async fn cancel(&self, session: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(session) {
            Some(slot) if slot.state.is_pending() => {
                slot.token.cancel();
                slot.state = RequestState::Cancelled;
                tracing::info!(session, generation = slot.generation, "Request cancelled");
                true
            }
            _ => false,
        }
    }

    /// Last known state of a session
    pub async fn state(&self, session: &str) -> Option<RequestState<T>> {
        let sessions = self.sessions.lock().await;
        sessions.get(session).map(|slot| slot.state.clone())
    }
}
