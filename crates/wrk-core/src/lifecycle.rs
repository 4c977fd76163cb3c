//! Status reconciliation: the directory an item sits in is authoritative.
//!
//! Operators move files between status directories; this module rewrites
//! the `status` metadata key to match. Every other key keeps its value and
//! position and the body is never touched.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::ErrorCode;
use crate::model::{Location, Status, StatusReading, WorkItemId, read_status};
use crate::queue::{ItemRef, Queue, QueueError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl LifecycleError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Queue(err) => err.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Rewrite historical synonyms (`complete`, `closed`, ...) to `done`.
    pub normalize_synonyms: bool,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            normalize_synonyms: true,
        }
    }
}

impl ReconcilePolicy {
    /// Policy for the explicit migration pass.
    #[must_use]
    pub const fn migration() -> Self {
        Self {
            normalize_synonyms: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Status already matches the directory.
    Unchanged,
    /// No metadata block; `{id, status}` was created.
    Synthesized,
    /// Status was missing, non-text, or disagreed with the directory.
    Repaired,
    /// A synonym or non-canonical spelling was rewritten.
    Normalized,
    /// Metadata block is malformed; left alone for an operator.
    Skipped,
    /// The item could not be locked, read, or written; see `error`.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub id: WorkItemId,
    pub location: Location,
    /// Raw status text before reconciliation, if any.
    pub previous: Option<String>,
    pub status: Status,
    pub action: ReconcileAction,
    /// Whether the file was (or, for a dry run, would be) rewritten.
    pub changed: bool,
    pub written: bool,
    /// Stable code and message when `action` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReconcileFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileFailure {
    pub error_code: &'static str,
    pub message: String,
}

impl ReconcileOutcome {
    fn failed(item: &ItemRef, err: &LifecycleError) -> Self {
        Self {
            id: item.id,
            location: item.location,
            previous: None,
            status: item.location.status(),
            action: ReconcileAction::Failed,
            changed: false,
            written: false,
            error: Some(ReconcileFailure {
                error_code: err.code().code(),
                message: err.to_string(),
            }),
        }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.action, ReconcileAction::Failed)
    }
}

/// Decide what reconciliation would do to one parsed document.
///
/// Returns the rewritten document when anything changes.
#[must_use]
pub fn plan_document(
    id: WorkItemId,
    location: Location,
    document: &Document,
    malformed: bool,
    policy: ReconcilePolicy,
) -> (Option<Document>, ReconcileOutcome) {
    let target = location.status();
    let raw = document.get("status");
    let previous = raw.map(describe);

    let outcome = |action: ReconcileAction| ReconcileOutcome {
        id,
        location,
        previous: previous.clone(),
        status: target,
        action,
        changed: !matches!(action, ReconcileAction::Unchanged | ReconcileAction::Skipped),
        written: false,
        error: None,
    };

    if malformed {
        return (None, outcome(ReconcileAction::Skipped));
    }

    if document.metadata.is_empty() {
        let mut metadata = Mapping::new();
        metadata.insert("id".into(), Value::String(id.to_string()));
        metadata.insert("status".into(), Value::String(target.to_string()));
        let rewritten = Document::new(metadata, document.body.clone());
        return (Some(rewritten), outcome(ReconcileAction::Synthesized));
    }

    let action = match raw.and_then(Value::as_str) {
        None => ReconcileAction::Repaired,
        Some(text) => match read_status(text) {
            StatusReading::Canonical(status) if status == target => {
                if text == target.as_str() {
                    ReconcileAction::Unchanged
                } else {
                    ReconcileAction::Normalized
                }
            }
            StatusReading::Synonym(status) if status == target => {
                if policy.normalize_synonyms {
                    ReconcileAction::Normalized
                } else {
                    ReconcileAction::Unchanged
                }
            }
            _ => ReconcileAction::Repaired,
        },
    };

    if action == ReconcileAction::Unchanged {
        return (None, outcome(action));
    }

    let mut rewritten = document.clone();
    rewritten.set("status", target.as_str());
    (Some(rewritten), outcome(action))
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| String::new(), |text| text.trim_end().to_string()),
    }
}

/// Reconcile one item file under its lock.
///
/// With `dry_run` the outcome is computed and nothing is written or locked.
pub fn reconcile_item(
    queue: &Queue,
    item: &ItemRef,
    policy: ReconcilePolicy,
    dry_run: bool,
) -> Result<ReconcileOutcome, LifecycleError> {
    let _guard = if dry_run { None } else { Some(queue.lock(item.id)?) };

    let loaded = queue.read(item)?;
    let (rewritten, mut outcome) = plan_document(
        item.id,
        item.location,
        &loaded.document,
        loaded.warning.is_some(),
        policy,
    );

    match rewritten {
        Some(document) if !dry_run => {
            queue.write(item, &document)?;
            outcome.written = true;
            info!(
                id = %item.id,
                location = %item.location,
                action = ?outcome.action,
                previous = outcome.previous.as_deref().unwrap_or("<none>"),
                "reconciled status"
            );
        }
        _ => debug!(id = %item.id, action = ?outcome.action, dry_run, "reconcile decision"),
    }

    Ok(outcome)
}

/// Reconcile the item with `id`, wherever it lives.
pub fn reconcile_id(
    queue: &Queue,
    id: WorkItemId,
    policy: ReconcilePolicy,
    dry_run: bool,
) -> Result<ReconcileOutcome, LifecycleError> {
    let item = queue.find(id)?;
    reconcile_item(queue, &item, policy, dry_run)
}

/// Reconcile every item in every status directory.
///
/// Each item is locked independently; the queue as a whole is not. An item
/// that fails is reported as [`ReconcileAction::Failed`] and the pass goes on.
/// Only failing to list the queue is an error.
pub fn reconcile_queue(
    queue: &Queue,
    policy: ReconcilePolicy,
    dry_run: bool,
) -> Result<Vec<ReconcileOutcome>, LifecycleError> {
    let outcomes = queue
        .items()?
        .iter()
        .map(|item| {
            reconcile_item(queue, item, policy, dry_run).unwrap_or_else(|err| {
                warn!(id = %item.id, path = %item.path.display(), error = %err, "reconcile failed");
                ReconcileOutcome::failed(item, &err)
            })
        })
        .collect();
    Ok(outcomes)
}

/// Reconcile with synonym normalization forced on.
pub fn migrate_queue(queue: &Queue, dry_run: bool) -> Result<Vec<ReconcileOutcome>, LifecycleError> {
    reconcile_queue(queue, ReconcilePolicy::migration(), dry_run)
}
