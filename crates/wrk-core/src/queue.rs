//! Work queue directory layout and item access.
//!
//! ```text
//! <root>/
//!   pending/WRK-1.md
//!   working/WRK-2.md
//!   blocked/ done/ archived/
//!   assets/WRK-2/          gate evidence
//!   .locks/WRK-2.lock      advisory locks
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::document::{self, Document, DocumentError, FrontmatterWarning};
use crate::error::ErrorCode;
use crate::lock::{ItemLock, LockError, QueueLock};
use crate::model::{Location, StatusReading, WorkItemId, read_status};

/// Directory under the queue root holding per-item evidence.
pub const ASSETS_DIR: &str = "assets";

/// Default lock acquisition timeout.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Queue access errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue root does not exist.
    #[error("queue directory not found: {}", path.display())]
    QueueMissing { path: PathBuf },

    /// No item with this id in any status directory.
    #[error("work item {id} not found")]
    NotFound { id: WorkItemId },

    /// Every id up to `WRK-<u64::MAX>` is taken.
    #[error("no work item id left after {last}")]
    IdSpaceExhausted { last: WorkItemId },

    /// Target file already exists.
    #[error("refusing to overwrite existing item {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// Lock acquisition failed.
    #[error("{0}")]
    Lock(#[from] LockError),

    /// Metadata could not be rendered.
    #[error("render failed: {0}")]
    Render(#[from] DocumentError),

    /// Filesystem error.
    #[error("I/O error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl QueueError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::QueueMissing { .. } => ErrorCode::QueueNotFound,
            Self::NotFound { .. } => ErrorCode::ItemNotFound,
            Self::AlreadyExists { .. } | Self::IdSpaceExhausted { .. } | Self::Io { .. } => {
                ErrorCode::WriteFailed
            }
            Self::Lock(err) => err.code(),
            Self::Render(err) => err.code(),
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Location of one item file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    pub id: WorkItemId,
    pub location: Location,
    pub path: PathBuf,
}

/// An item file together with its parsed document.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub location: Location,
    pub path: PathBuf,
    pub document: Document,
    /// Set when the metadata block was malformed and discarded.
    pub warning: Option<FrontmatterWarning>,
    pub modified: Option<SystemTime>,
}

impl WorkItem {
    /// Raw `status` value from metadata.
    #[must_use]
    pub fn raw_status(&self) -> Option<&str> {
        self.document.get_str("status")
    }

    /// Classified status reading, `None` when absent.
    #[must_use]
    pub fn status(&self) -> Option<StatusReading> {
        self.raw_status().map(read_status)
    }

    #[must_use]
    pub fn to_ref(&self) -> ItemRef {
        ItemRef {
            id: self.id,
            location: self.location,
            path: self.path.clone(),
        }
    }
}

/// Fields for a new pending item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Highest id known from the queue statistics ledger, if any.
    pub last_known_id: Option<u64>,
    /// Extra metadata such as `priority` or `route`, appended after the core keys.
    pub fields: Mapping,
}

/// Handle on a queue root directory.
#[derive(Debug, Clone)]
pub struct Queue {
    root: PathBuf,
    lock_timeout: Duration,
}

impl Queue {
    /// Handle on `root` without checking that it exists.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Handle on an existing queue root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let queue = Self::new(root);
        if !queue.root.is_dir() {
            return Err(QueueError::QueueMissing { path: queue.root });
        }
        Ok(queue)
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn location_dir(&self, location: Location) -> PathBuf {
        self.root.join(location.dir_name())
    }

    #[must_use]
    pub fn asset_dir(&self, id: WorkItemId) -> PathBuf {
        self.root.join(ASSETS_DIR).join(id.to_string())
    }

    /// Take the per-item write lock.
    pub fn lock(&self, id: WorkItemId) -> Result<ItemLock, QueueError> {
        Ok(ItemLock::acquire(&self.root, &id, self.lock_timeout)?)
    }

    /// Items in one status directory, sorted by id. A missing directory is empty.
    pub fn items_in(&self, location: Location) -> Result<Vec<ItemRef>, QueueError> {
        let dir = self.location_dir(location);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(QueueError::io(&dir, err)),
        };

        let mut items = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| QueueError::io(&dir, err))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            // Only the canonical spelling counts, so listing agrees with `find`.
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<WorkItemId>().ok())
                .filter(|id| path.file_name().and_then(|n| n.to_str()) == Some(id.file_name().as_str()))
            else {
                debug!(path = %path.display(), "skipping file without a work item id name");
                continue;
            };
            items.push(ItemRef { id, location, path });
        }
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    /// Items across every status directory, grouped by location then id.
    pub fn items(&self) -> Result<Vec<ItemRef>, QueueError> {
        let mut all = Vec::new();
        for location in Location::ALL {
            all.extend(self.items_in(location)?);
        }
        Ok(all)
    }

    /// Find the file for `id` in any status directory.
    pub fn find(&self, id: WorkItemId) -> Result<ItemRef, QueueError> {
        let file_name = id.file_name();
        let mut found = Location::ALL.into_iter().filter_map(|location| {
            let path = self.location_dir(location).join(&file_name);
            path.is_file().then_some(ItemRef { id, location, path })
        });

        let first = found.next().ok_or(QueueError::NotFound { id })?;
        for duplicate in found {
            warn!(
                %id,
                kept = %first.location,
                duplicate = %duplicate.location,
                "item present in more than one status directory"
            );
        }
        Ok(first)
    }

    /// Read and parse an item file.
    pub fn read(&self, item: &ItemRef) -> Result<WorkItem, QueueError> {
        let text = fs::read_to_string(&item.path).map_err(|err| QueueError::io(&item.path, err))?;
        let modified = fs::metadata(&item.path).and_then(|m| m.modified()).ok();
        let (document, warning) = document::parse_with_diagnostics(&text);
        if let Some(warning) = &warning {
            warn!(id = %item.id, path = %item.path.display(), %warning, "malformed work item metadata");
        }
        Ok(WorkItem {
            id: item.id,
            location: item.location,
            path: item.path.clone(),
            document,
            warning,
            modified,
        })
    }

    /// Look up and read `id`.
    pub fn load(&self, id: WorkItemId) -> Result<WorkItem, QueueError> {
        let item = self.find(id)?;
        self.read(&item)
    }

    /// Atomically replace an item file with `document`.
    ///
    /// Callers hold the item's [`ItemLock`].
    pub fn write(&self, item: &ItemRef, document: &Document) -> Result<(), QueueError> {
        let text = document.render()?;
        crate::lock::write_atomic(&item.path, &text).map_err(|err| QueueError::io(&item.path, err))?;
        info!(id = %item.id, location = %item.location, "wrote work item");
        Ok(())
    }

    /// Highest id present in any status directory.
    pub fn max_id(&self) -> Result<Option<WorkItemId>, QueueError> {
        Ok(self.items()?.into_iter().map(|item| item.id).max())
    }

    /// Allocate the next id and create `pending/<ID>.md`.
    pub fn create(&self, draft: &NewItem) -> Result<ItemRef, QueueError> {
        let _guard = QueueLock::acquire(&self.root, self.lock_timeout)?;

        let from_files = self.max_id()?.map_or(0, WorkItemId::number);
        let last = WorkItemId::new(from_files.max(draft.last_known_id.unwrap_or(0)));
        let id = last.next().ok_or(QueueError::IdSpaceExhausted { last })?;

        let mut metadata = Mapping::new();
        metadata.insert("id".into(), Value::String(id.to_string()));
        metadata.insert("title".into(), Value::String(draft.title.clone()));
        metadata.insert("status".into(), Value::String(Location::Pending.status().to_string()));
        metadata.insert(
            "created_at".into(),
            Value::String(draft.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        for (key, value) in &draft.fields {
            if !metadata.contains_key(key) {
                metadata.insert(key.clone(), value.clone());
            }
        }

        let summary = draft.summary.as_deref().unwrap_or(&draft.title);
        let body = format!("# {id}: {}\n\n## What\n\n{summary}\n", draft.title);
        let text = document::render(&metadata, &body)?;

        let dir = self.location_dir(Location::Pending);
        fs::create_dir_all(&dir).map_err(|err| QueueError::io(&dir, err))?;
        let path = dir.join(id.file_name());
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| {
                if err.kind() == io::ErrorKind::AlreadyExists {
                    QueueError::AlreadyExists { path: path.clone() }
                } else {
                    QueueError::io(&path, err)
                }
            })?;
        file.write_all(text.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|err| QueueError::io(&path, err))?;

        info!(%id, "created work item");
        Ok(ItemRef {
            id,
            location: Location::Pending,
            path,
        })
    }
}
