//! Two-part document format: a YAML metadata block followed by a free-form body.
//!
//! ```text
//! ---
//! id: WRK-12
//! status: working
//! ---
//! ## What
//! ...
//! ```
//!
//! Parsing never fails. A missing block yields empty metadata and the text as
//! body; a malformed block is reported as a [`FrontmatterWarning`] and the whole
//! text is kept as body so nothing is lost. [`render`] is a left inverse of
//! [`parse`] for every mapping [`parse`] can produce.

pub mod section;

use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::error::ErrorCode;

pub use section::section;

/// Marker line opening and closing the metadata block.
pub const MARKER: &str = "---";

/// Errors from the shared YAML mapping parser and the renderer.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// YAML syntax error.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Well-formed YAML whose top level is not a mapping.
    #[error("expected a mapping at the top level, found {found}")]
    NotAMapping { found: &'static str },
}

impl DocumentError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::DocumentParseFailed
    }
}

/// Why a metadata block was discarded during [`parse_with_diagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterWarning {
    /// Opening marker without a closing marker line.
    Unterminated,
    /// The block did not parse as a YAML mapping.
    Invalid(String),
}

impl std::fmt::Display for FrontmatterWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unterminated => write!(f, "metadata block has no closing '{MARKER}' line"),
            Self::Invalid(reason) => write!(f, "metadata block is malformed: {reason}"),
        }
    }
}

/// A parsed document: ordered metadata plus the untouched body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub metadata: Mapping,
    pub body: String,
}

impl Document {
    #[must_use]
    pub fn new(metadata: Mapping, body: impl Into<String>) -> Self {
        Self {
            metadata,
            body: body.into(),
        }
    }

    /// Look up a metadata value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Look up a metadata value as a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Insert or replace a key. Existing keys keep their position.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(Value::String(key.to_string()), value.into());
    }

    /// Render back to text. See [`render`].
    pub fn render(&self) -> Result<String, DocumentError> {
        render(&self.metadata, &self.body)
    }
}

/// Parse `text` into metadata and body, degrading on malformed blocks.
#[must_use]
pub fn parse(text: &str) -> Document {
    parse_with_diagnostics(text).0
}

/// Parse `text`, also returning the reason a metadata block was discarded.
#[must_use]
pub fn parse_with_diagnostics(text: &str) -> (Document, Option<FrontmatterWarning>) {
    let degraded = || Document::new(Mapping::new(), text);

    let split = match split_block(text) {
        Split::Absent => return (degraded(), None),
        Split::Unterminated => Err(FrontmatterWarning::Unterminated),
        Split::Block { yaml, body } => parse_yaml_mapping(yaml)
            .map(|metadata| Document::new(metadata, body))
            .map_err(|err| FrontmatterWarning::Invalid(err.to_string())),
    };

    match split {
        Ok(doc) => (doc, None),
        Err(warning) => {
            warn!(%warning, "discarding metadata block; keeping original text as body");
            (degraded(), Some(warning))
        }
    }
}

/// Render metadata and body as a document.
///
/// The block is always emitted, even for empty metadata, so a body that
/// itself begins with a marker line survives a round trip.
pub fn render(metadata: &Mapping, body: &str) -> Result<String, DocumentError> {
    let yaml = serde_yaml::to_string(metadata)?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(MARKER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(MARKER);
    out.push('\n');
    out.push_str(body);
    Ok(out)
}

/// Parse a YAML text whose top level must be a mapping.
///
/// Empty text and an explicit `null` produce an empty mapping. This is the
/// single structured parser shared by work items and canonical state files.
pub fn parse_yaml_mapping(text: &str) -> Result<Mapping, DocumentError> {
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(text)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(DocumentError::NotAMapping {
            found: value_kind(&other),
        }),
    }
}

/// Short name of a YAML value's shape for diagnostics.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

enum Split<'a> {
    Absent,
    Unterminated,
    Block { yaml: &'a str, body: &'a str },
}

fn is_marker(line: &str) -> bool {
    line.trim_end() == MARKER
}

fn split_block(text: &str) -> Split<'_> {
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Split::Absent;
    };
    if !is_marker(first) {
        return Split::Absent;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let line_end = offset + line.len();
        if is_marker(line) {
            return Split::Block {
                yaml: &text[yaml_start..offset],
                body: &text[line_end..],
            };
        }
        offset = line_end;
    }
    Split::Unterminated
}
