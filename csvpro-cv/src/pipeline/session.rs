//! Per-user conversion sessions
//!
//! A session moves `Empty -> Processing -> Ready | Error` and back to
//! `Processing` whenever new input arrives. Each `begin` bumps the
//! generation; completing with an older generation is ignored, so the newest
//! input always wins.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;
use uuid::Uuid;

use super::format::{export, ExportFile, ExportFormat};
use super::gate::ConversionResult;
use super::row::Row;
use super::ConvertError;

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Empty,
    Processing,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Empty,
    Processing { source_name: String },
    Ready { source_name: String, result: ConversionResult },
    Error { source_name: String, message: String },
}

/// One user's conversion workspace
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    state: SessionState,
    generation: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            state: SessionState::Empty,
            generation: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::Empty => SessionStatus::Empty,
            SessionState::Processing { .. } => SessionStatus::Processing,
            SessionState::Ready { .. } => SessionStatus::Ready,
            SessionState::Error { .. } => SessionStatus::Error,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Base name of the input currently held (or being processed)
    pub fn source_name(&self) -> Option<&str> {
        match &self.state {
            SessionState::Empty => None,
            SessionState::Processing { source_name }
            | SessionState::Ready { source_name, .. }
            | SessionState::Error { source_name, .. } => Some(source_name),
        }
    }

    /// Start processing new input; returns the generation to complete with
    pub fn begin(&mut self, source_name: impl Into<String>) -> u64 {
        self.generation += 1;
        self.state = SessionState::Processing {
            source_name: source_name.into(),
        };
        self.updated_at = Utc::now();
        self.generation
    }

    /// Store the outcome of a run started by `begin`
    ///
    /// Returns false (and changes nothing) when `generation` has been
    /// superseded by a newer `begin`.
    pub fn complete(
        &mut self,
        generation: u64,
        outcome: Result<ConversionResult, ConvertError>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                "Session {}: dropping stale result (generation {} < {})",
                self.id, generation, self.generation
            );
            return false;
        }

        let source_name = match &self.state {
            SessionState::Processing { source_name } => source_name.clone(),
            _ => return false,
        };

        self.state = match outcome {
            Ok(result) => SessionState::Ready { source_name, result },
            Err(e) => SessionState::Error {
                source_name,
                message: e.to_string(),
            },
        };
        self.updated_at = Utc::now();
        true
    }

    /// Rows available for export, if any
    pub fn rows(&self) -> &[Row] {
        match &self.state {
            SessionState::Ready { result, .. } => &result.rows,
            _ => &[],
        }
    }

    /// Render the held rows; only a `Ready` session with rows can export
    pub fn export(&self, format: ExportFormat) -> Result<ExportFile, ConvertError> {
        match &self.state {
            SessionState::Ready { source_name, result } => export(&result.rows, source_name, format),
            _ => Err(ConvertError::NothingToExport),
        }
    }

    /// Client view with at most `preview_rows` rows
    pub fn snapshot(&self, preview_rows: usize) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            id: self.id,
            state: self.status(),
            source_name: self.source_name().map(str::to_string),
            columns: Vec::new(),
            row_count: 0,
            truncated: false,
            message: None,
            preview: Vec::new(),
            updated_at: self.updated_at,
        };

        match &self.state {
            SessionState::Ready { result, .. } => {
                snapshot.columns = result
                    .rows
                    .first()
                    .map(|r| r.columns().map(str::to_string).collect())
                    .unwrap_or_default();
                snapshot.row_count = result.rows.len();
                snapshot.truncated = result.truncated;
                snapshot.message = result.warning.clone();
                snapshot.preview = result.rows.iter().take(preview_rows).cloned().collect();
            }
            SessionState::Error { message, .. } => {
                snapshot.message = Some(message.clone());
            }
            SessionState::Empty | SessionState::Processing { .. } => {}
        }

        snapshot
    }
}

/// Serialized session view
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: SessionStatus,
    pub source_name: Option<String>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub truncated: bool,
    /// Truncation warning when ready, parse error when failed
    pub message: Option<String>,
    pub preview: Vec<Row>,
    pub updated_at: DateTime<Utc>,
}

/// Idle lifetime used when none is configured
const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3600);

/// In-memory sessions keyed by id
///
/// Every accessor takes the caller's user id; a session owned by somebody
/// else behaves exactly like a missing one. So does a session left unchanged
/// for longer than the idle TTL, which is dropped on the next sweep.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    /// `None` keeps sessions until they are deleted
    idle_ttl: Option<Duration>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose sessions expire after `idle_ttl` without changes (zero disables expiry)
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_ttl: (!idle_ttl.is_zero()).then_some(idle_ttl),
        }
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl
    }

    pub async fn create(&self, user_id: &str) -> Session {
        let session = Session::new(user_id);
        let mut sessions = self.sessions.write().await;
        let evicted = sweep(&mut sessions, self.idle_ttl, Utc::now());
        if evicted > 0 {
            debug!("Evicted {} idle sessions", evicted);
        }
        sessions.insert(session.id, session.clone());
        session
    }

    /// Run `f` against a session owned by `user_id`
    pub async fn read<R>(&self, id: Uuid, user_id: &str, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .filter(|s| s.user_id == user_id && is_live(s, self.idle_ttl, now))
            .map(f)
    }

    /// Run `f` against a mutable session owned by `user_id`
    pub async fn update<R>(
        &self,
        id: Uuid,
        user_id: &str,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(&id)
            .filter(|s| s.user_id == user_id && is_live(s, self.idle_ttl, now))
            .map(f)
    }

    /// Delete a session; an expired one is dropped but reported as missing
    pub async fn remove(&self, id: Uuid, user_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            Some(s) if s.user_id == user_id => {
                let live = is_live(s, self.idle_ttl, Utc::now());
                sessions.remove(&id);
                live
            }
            _ => false,
        }
    }

    /// Drop every expired session, returning how many were removed
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        sweep(&mut sessions, self.idle_ttl, Utc::now())
    }

    /// Background sweep every `period`, for the life of the runtime
    pub fn spawn_eviction(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut tick = interval(period);
            loop {
                tick.tick().await;
                let evicted = store.evict_idle().await;
                if evicted > 0 {
                    debug!("Evicted {} idle sessions", evicted);
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn is_live(session: &Session, idle_ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
    let Some(ttl) = idle_ttl else {
        return true;
    };
    // Negative idle time (clock stepped back) counts as fresh
    (now - session.updated_at).to_std().map_or(true, |idle| idle <= ttl)
}

fn sweep(sessions: &mut HashMap<Uuid, Session>, idle_ttl: Option<Duration>, now: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|_, s| is_live(s, idle_ttl, now));
    before - sessions.len()
}
