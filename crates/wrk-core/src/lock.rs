//! Advisory file locks and atomic replacement for queue mutations.
//!
//! Lock files live under `<queue>/.locks/`. They are never removed; holding
//! the OS-level exclusive lock is what matters, not the file's existence.

use crate::error::ErrorCode;
use crate::model::item::WorkItemId;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use std::{process, thread};

pub const LOCK_DIR: &str = ".locks";

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not lock {} within {waited:?}", path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("lock file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::Io { .. } => ErrorCode::WriteFailed,
        }
    }
}

/// An exclusive lock held until drop.
#[derive(Debug)]
struct Held {
    file: File,
    path: PathBuf,
}

impl Held {
    fn take(path: PathBuf, timeout: Duration) -> Result<Self, LockError> {
        let io_err = |path: &Path, source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|err| io_err(dir, err))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| io_err(&path, err))?;

        let deadline = Instant::now() + timeout;
        while file.try_lock_exclusive().is_err() {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    path,
                    waited: timeout,
                });
            }
            thread::sleep(RETRY_INTERVAL.min(deadline - now));
        }
        Ok(Self { file, path })
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Serializes read-modify-write cycles on one work item.
#[derive(Debug)]
pub struct ItemLock(Held);

impl ItemLock {
    pub fn acquire(queue_root: &Path, id: &WorkItemId, timeout: Duration) -> Result<Self, LockError> {
        Held::take(item_lock_path(queue_root, id), timeout).map(Self)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0.path
    }
}

/// Queue-wide lock taken while allocating a new id.
#[derive(Debug)]
pub struct QueueLock(Held);

impl QueueLock {
    pub fn acquire(queue_root: &Path, timeout: Duration) -> Result<Self, LockError> {
        Held::take(queue_root.join(LOCK_DIR).join("queue.lock"), timeout).map(Self)
    }
}

#[must_use]
pub fn item_lock_path(queue_root: &Path, id: &WorkItemId) -> PathBuf {
    queue_root.join(LOCK_DIR).join(format!("{id}.lock"))
}

/// Replace `path` with `contents` through a sibling temp file and `rename`.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        ));
    };
    let tmp = dir.join(format!(".{}.{}.tmp", name.to_string_lossy(), process::id()));

    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    });
    let result = written.and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    const SHORT: Duration = Duration::from_millis(30);

    #[test]
    fn item_lock_file_is_named_after_the_item() {
        let tmp = TempDir::new().expect("tmp");
        let lock = ItemLock::acquire(tmp.path(), &WorkItemId::new(4), SHORT).expect("lock");
        assert_eq!(lock.path(), tmp.path().join(".locks/WRK-4.lock"));
    }

    #[test]
    fn second_holder_times_out_with_contention_code() {
        let tmp = TempDir::new().expect("tmp");
        let id = WorkItemId::new(7);
        let _held = ItemLock::acquire(tmp.path(), &id, SHORT).expect("first");

        let err = ItemLock::acquire(tmp.path(), &id, SHORT).unwrap_err();
        assert!(matches!(err, LockError::Timeout { .. }));
        assert_eq!(err.code(), ErrorCode::LockContention);
    }

    #[test]
    fn distinct_items_lock_independently() {
        let tmp = TempDir::new().expect("tmp");
        let _a = ItemLock::acquire(tmp.path(), &WorkItemId::new(1), SHORT).expect("a");
        let _b = ItemLock::acquire(tmp.path(), &WorkItemId::new(2), SHORT).expect("b");
        let _q = QueueLock::acquire(tmp.path(), SHORT).expect("queue");
    }

    #[test]
    fn waiter_succeeds_once_holder_drops() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path().to_path_buf();
        let (locked_tx, locked_rx) = mpsc::channel();

        let holder = {
            let root = root.clone();
            thread::spawn(move || {
                let _held = QueueLock::acquire(&root, SHORT).expect("holder");
                locked_tx.send(()).expect("signal");
                thread::sleep(Duration::from_millis(50));
            })
        };
        locked_rx.recv().expect("holder locked");

        QueueLock::acquire(&root, Duration::from_secs(2)).expect("waiter");
        holder.join().expect("join");
    }

    #[test]
    fn atomic_write_leaves_only_the_target() {
        let tmp = TempDir::new().expect("tmp");
        let target = tmp.path().join("WRK-1.md");
        fs::write(&target, "before").expect("seed");

        write_atomic(&target, "after").expect("write");

        assert_eq!(fs::read_to_string(&target).expect("read"), "after");
        let names: Vec<String> = fs::read_dir(tmp.path())
            .expect("list")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["WRK-1.md"]);
    }
}
