//! Session snapshots stored under a work item's `session_state` key.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_yaml::Value;
use tracing::info;

use crate::error::ErrorCode;
use crate::model::{SESSION_STATE_KEY, SessionState, WorkItemId};
use crate::queue::{Queue, QueueError, WorkItem};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The item's metadata block could not be parsed; recording would bury it.
    #[error("work item {id} has malformed metadata: {reason}")]
    Malformed { id: WorkItemId, reason: String },

    #[error("session_state on {id} is not a valid snapshot: {source}")]
    Snapshot {
        id: WorkItemId,
        source: serde_yaml::Error,
    },
}

impl SessionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Queue(err) => err.code(),
            Self::Malformed { .. } | Self::Snapshot { .. } => ErrorCode::DocumentParseFailed,
        }
    }
}

/// What the caller learned during a session.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub progress_notes: String,
    pub modified_files: Vec<String>,
    pub next_steps: Vec<String>,
    pub recent_commits: String,
}

/// Replace the session snapshot on `id`, leaving every other key as it was.
pub fn record(
    queue: &Queue,
    id: WorkItemId,
    last_updated: DateTime<Utc>,
    update: &SessionUpdate,
) -> Result<SessionState, SessionError> {
    let item = queue.find(id)?;
    let _guard = queue.lock(id)?;
    let mut loaded = queue.read(&item)?;
    if let Some(warning) = loaded.warning {
        return Err(SessionError::Malformed {
            id,
            reason: warning.to_string(),
        });
    }

    let snapshot = SessionState::normalized(
        last_updated.to_rfc3339_opts(SecondsFormat::Secs, true),
        &update.progress_notes,
        &update.modified_files,
        &update.next_steps,
        &update.recent_commits,
    );
    let value = serde_yaml::to_value(&snapshot).map_err(|source| SessionError::Snapshot { id, source })?;
    loaded.document.set(SESSION_STATE_KEY, value);
    queue.write(&item, &loaded.document)?;

    info!(
        %id,
        files = snapshot.modified_files.len(),
        next_steps = snapshot.next_steps.len(),
        "recorded session state"
    );
    Ok(snapshot)
}

/// Current snapshot on `id`, if one has been recorded.
pub fn read_session(queue: &Queue, id: WorkItemId) -> Result<Option<SessionState>, SessionError> {
    session_of(&queue.load(id)?)
}

/// Snapshot stored on an already loaded item.
pub fn session_of(item: &WorkItem) -> Result<Option<SessionState>, SessionError> {
    match item.document.get(SESSION_STATE_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|source| SessionError::Snapshot { id: item.id, source }),
    }
}
