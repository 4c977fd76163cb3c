//! Command handlers. Each `run_*` renders its own result and returns the
//! [`Exit`] the process should terminate with.

pub mod create;
pub mod gates;
pub mod reconcile;
pub mod scan;
pub mod session;
pub mod show;
pub mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use wrk_core::config::{ConfigError, ProjectConfig};
use wrk_core::gates::GateError;
use wrk_core::lifecycle::LifecycleError;
use wrk_core::queue::QueueError;
use wrk_core::schema::SchemaError;
use wrk_core::session::SessionError;
use wrk_core::{ErrorCode, Queue, WorkItemId};

use crate::output::{CliError, OutputMode, render_error};

/// Process outcome: `0` success, `1` failed check or error, `2` not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    Failure,
    NotFound,
}

impl Exit {
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::NotFound => 2,
        }
    }

    pub fn for_error(code: ErrorCode) -> Self {
        if code.kind() == "not_found" {
            Self::NotFound
        } else {
            Self::Failure
        }
    }

    /// `Success` when `passed`, otherwise `Failure`.
    pub const fn check(passed: bool) -> Self {
        if passed { Self::Success } else { Self::Failure }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        Self::from(exit.code())
    }
}

/// Core errors that carry a stable code.
pub trait Coded: std::fmt::Display {
    fn error_code(&self) -> ErrorCode;
}

macro_rules! coded {
    ($($ty:ty),* $(,)?) => {
        $(impl Coded for $ty {
            fn error_code(&self) -> ErrorCode {
                self.code()
            }
        })*
    };
}

coded!(ConfigError, GateError, LifecycleError, QueueError, SchemaError, SessionError);

/// Resolved workspace paths and settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub workspace: PathBuf,
    pub config: ProjectConfig,
    pub queue_root: PathBuf,
    pub state_dir: PathBuf,
    pub output: OutputMode,
}

impl Context {
    pub fn queue(&self) -> Result<Queue, QueueError> {
        Ok(Queue::open(&self.queue_root)?.with_lock_timeout(self.config.lock.timeout()))
    }

    /// Render a coded failure and pick the matching exit.
    pub fn fail(&self, code: ErrorCode, message: impl Into<String>) -> anyhow::Result<Exit> {
        render_error(self.output, &CliError::from_code(code, message))?;
        Ok(Exit::for_error(code))
    }

    pub fn fail_with(&self, err: &impl Coded) -> anyhow::Result<Exit> {
        self.fail(err.error_code(), err.to_string())
    }

    /// Parse an item id argument, rendering the failure when it is malformed.
    pub fn parse_id(&self, raw: &str) -> anyhow::Result<Result<WorkItemId, Exit>> {
        match raw.parse::<WorkItemId>() {
            Ok(id) => Ok(Ok(id)),
            Err(err) => Ok(Err(self.fail(ErrorCode::InvalidItemId, err.to_string())?)),
        }
    }
}
