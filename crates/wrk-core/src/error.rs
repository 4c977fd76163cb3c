//! Stable error codes shared by every module and surfaced by the CLI.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigReadFailed,
    QueueNotFound,
    ItemNotFound,
    AssetDirNotFound,
    InvalidItemId,
    FileNotFound,
    SchemaLookupFailed,
    DocumentParseFailed,
    ValidationFailed,
    GateUnsatisfied,
    WriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// `E####`, grouped by area: 1 config, 2 lookup, 3 documents, 4 gates, 5 writes.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigReadFailed => "E1003",
            Self::QueueNotFound => "E1002",
            Self::ItemNotFound => "E2001",
            Self::AssetDirNotFound => "E2002",
            Self::InvalidItemId => "E2003",
            Self::FileNotFound => "E2004",
            Self::SchemaLookupFailed => "E3001",
            Self::DocumentParseFailed => "E3002",
            Self::ValidationFailed => "E3003",
            Self::GateUnsatisfied => "E4001",
            Self::WriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Taxonomy kind used in structured output.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::SchemaLookupFailed => "schema_lookup_error",
            Self::DocumentParseFailed | Self::ConfigParseError => "parse_error",
            Self::ValidationFailed | Self::InvalidItemId => "validation_error",
            Self::QueueNotFound
            | Self::ItemNotFound
            | Self::AssetDirNotFound
            | Self::FileNotFound => "not_found",
            Self::GateUnsatisfied => "gate_unsatisfied",
            Self::ConfigReadFailed
            | Self::WriteFailed
            | Self::LockContention
            | Self::InternalUnexpected => "io_error",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Invalid project config",
            Self::ConfigReadFailed => "Project config could not be read",
            Self::QueueNotFound => "Queue directory not found",
            Self::ItemNotFound => "Work item not found",
            Self::AssetDirNotFound => "Asset directory not found",
            Self::InvalidItemId => "Invalid work item ID",
            Self::FileNotFound => "File not found",
            Self::SchemaLookupFailed => "No schema registered for file",
            Self::DocumentParseFailed => "Structured document parse error",
            Self::ValidationFailed => "Schema validation failed",
            Self::GateUnsatisfied => "Process gate unsatisfied",
            Self::WriteFailed => "Work item write failed",
            Self::LockContention => "Item is locked by another writer",
            Self::InternalUnexpected => "Unexpected internal failure",
        }
    }

    /// What the operator can do about it.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .wrk/config.toml and retry."),
            Self::ConfigReadFailed => Some("Check that .wrk/config.toml is a readable file."),
            Self::QueueNotFound => Some("Pass --queue or set queue.root in .wrk/config.toml."),
            Self::ItemNotFound => Some("Check the ID with `wrk scan` or list the status directories."),
            Self::AssetDirNotFound => Some("Create assets/<ID>/ and add the gate evidence files."),
            Self::InvalidItemId => Some("Use IDs of the form WRK-123."),
            Self::FileNotFound => Some("Check the path and retry."),
            Self::SchemaLookupFailed => Some(
                "Canonical files are reflect-state, learnings, state, and cc-user-insights (.yaml/.yml).",
            ),
            Self::DocumentParseFailed => Some("Fix the YAML syntax and retry."),
            Self::ValidationFailed => Some("Fix the listed fields and re-run `wrk validate`."),
            Self::GateUnsatisfied => Some("Add the missing evidence and re-run `wrk gates`."),
            Self::WriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other writer releases its lock."),
            Self::InternalUnexpected => Some("Re-run with -v and include the log when reporting it."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
