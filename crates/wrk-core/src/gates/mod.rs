//! Process gate verification.
//!
//! A work item carries evidence for each gate in two places: metadata flags
//! on the item itself, and files under `assets/<ID>/`. Each [`Gate`] inspects
//! a read-only [`GateContext`] and reports whether its evidence is present.
//! The [`Verifier`] runs every gate, never stopping at the first failure.

pub mod builtin;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::ErrorCode;
use crate::model::WorkItemId;
use crate::queue::{Queue, QueueError};

pub use builtin::{LegalGate, PlanGate, WorkstationGate};

/// Failures that prevent verification from running at all.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("asset directory for {id} not found: {}", path.display())]
    AssetDirMissing { id: WorkItemId, path: PathBuf },

    #[error("failed to list {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl GateError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Queue(err) => err.code(),
            Self::AssetDirMissing { .. } => ErrorCode::AssetDirNotFound,
            Self::Io { .. } => ErrorCode::InternalUnexpected,
        }
    }

    /// Item or asset directory absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code().kind() == "not_found"
    }
}

/// Filename convention for an evidence file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePredicate {
    /// Exactly one of these names.
    Named(&'static [&'static str]),
    /// Name contains this text, ignoring ASCII case.
    NameContains(&'static str),
}

impl FilePredicate {
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Named(names) => names.contains(&file_name),
            Self::NameContains(needle) => file_name
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }

    /// Short description used in gate details.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Named(names) => names.join(", "),
            Self::NameContains(needle) => format!("a file named *{needle}*"),
        }
    }
}

/// Everything a gate may look at.
#[derive(Debug)]
pub struct GateContext<'a> {
    pub id: WorkItemId,
    pub metadata: &'a Mapping,
    pub queue_root: &'a Path,
    pub asset_dir: &'a Path,
    /// Regular file names directly under the asset directory, sorted.
    pub asset_files: Vec<String>,
}

impl GateContext<'_> {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// First asset file the predicate accepts.
    #[must_use]
    pub fn find(&self, predicate: &FilePredicate) -> Option<&str> {
        self.asset_files
            .iter()
            .map(String::as_str)
            .find(|name| predicate.matches(name))
    }
}

/// Outcome of one gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateCheck {
    pub satisfied: bool,
    pub details: String,
}

impl GateCheck {
    #[must_use]
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            satisfied: true,
            details: details.into(),
        }
    }

    #[must_use]
    pub fn fail(details: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            details: details.into(),
        }
    }
}

/// A named process precondition.
pub trait Gate: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &GateContext<'_>) -> GateCheck;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateRecord {
    pub gate: String,
    #[serde(rename = "ok")]
    pub satisfied: bool,
    pub details: String,
}

/// A failed gate, as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("gate '{gate}' unsatisfied: {details}")]
pub struct GateUnsatisfied {
    pub gate: String,
    pub details: String,
}

impl GateUnsatisfied {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::GateUnsatisfied
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub id: WorkItemId,
    pub ok: bool,
    pub gates: Vec<GateRecord>,
}

impl GateReport {
    #[must_use]
    pub fn new(id: WorkItemId, gates: Vec<GateRecord>) -> Self {
        let ok = gates.iter().all(|record| record.satisfied);
        Self { id, ok, gates }
    }

    #[must_use]
    pub fn unsatisfied(&self) -> Vec<GateUnsatisfied> {
        self.gates
            .iter()
            .filter(|record| !record.satisfied)
            .map(|record| GateUnsatisfied {
                gate: record.gate.clone(),
                details: record.details.clone(),
            })
            .collect()
    }
}

/// Ordered set of gates.
pub struct Verifier {
    gates: Vec<Box<dyn Gate>>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.gates.iter().map(|gate| gate.name()))
            .finish()
    }
}

impl Verifier {
    #[must_use]
    pub fn empty() -> Self {
        Self { gates: Vec::new() }
    }

    /// Plan, workstation contract, cross-review, TDD and legal gates.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            gates: builtin::standard_gates(),
        }
    }

    #[must_use]
    pub fn with_gate(mut self, gate: impl Gate + 'static) -> Self {
        self.gates.push(Box::new(gate));
        self
    }

    pub fn gate_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.gates.iter().map(|gate| gate.name())
    }

    /// Run every gate against an already-built context.
    #[must_use]
    pub fn evaluate(&self, ctx: &GateContext<'_>) -> GateReport {
        let records = self
            .gates
            .iter()
            .map(|gate| {
                let check = gate.check(ctx);
                debug!(id = %ctx.id, gate = gate.name(), ok = check.satisfied, "gate evaluated");
                GateRecord {
                    gate: gate.name().to_string(),
                    satisfied: check.satisfied,
                    details: check.details,
                }
            })
            .collect();
        GateReport::new(ctx.id, records)
    }

    /// Locate `id`, list its asset directory and run every gate.
    pub fn verify(&self, queue: &Queue, id: WorkItemId) -> Result<GateReport, GateError> {
        let item = queue.load(id)?;
        let asset_dir = queue.asset_dir(id);
        if !asset_dir.is_dir() {
            return Err(GateError::AssetDirMissing { id, path: asset_dir });
        }

        let ctx = GateContext {
            id,
            metadata: &item.document.metadata,
            queue_root: queue.root(),
            asset_dir: &asset_dir,
            asset_files: list_files(&asset_dir)?,
        };
        Ok(self.evaluate(&ctx))
    }
}

fn list_files(dir: &Path) -> Result<Vec<String>, GateError> {
    let io_err = |source| GateError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Verify `id` against the standard gate set.
pub fn verify(queue: &Queue, id: WorkItemId) -> Result<GateReport, GateError> {
    Verifier::standard().verify(queue, id)
}
