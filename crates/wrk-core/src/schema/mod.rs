//! Declarative schemas for the canonical state files and the registry that
//! resolves a file name to its schema.
//!
//! Validation walks a parsed YAML mapping against a [`Schema`], collecting
//! every problem (never stopping at the first) and producing a normalized
//! copy of the value:
//!
//! - numeric ranges are closed intervals; out-of-range values are errors
//! - a string holding a bare decimal such as `.5` is coerced to a number
//! - `null`/absent text fields with a default take that default
//! - keys the schema does not mention are left untouched
//!
//! [`SchemaRegistry::load`] then deserializes the normalized value into a
//! typed model from [`models`].

pub mod builtin;
pub mod models;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::dates::parse_timestamp;
use crate::document::{self, value_kind};
use crate::error::ErrorCode;

/// Shape and constraints of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Free text; `null`/absent becomes `default` when one is documented.
    Text { default: Option<&'static str> },
    /// Whole number within the closed interval `[min, max]`.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Real number within the closed interval `[min, max]`.
    Number { min: Option<f64>, max: Option<f64> },
    Bool,
    /// Text accepted by [`parse_timestamp`].
    Timestamp,
    /// List of text entries.
    TextList,
    /// List of nested records.
    Records(&'static [FieldSpec]),
}

/// One named field of a schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    #[must_use]
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: false,
            kind,
        }
    }
}

/// A declarative schema for one canonical state file.
#[derive(Debug, PartialEq)]
pub struct Schema {
    /// Logical name, which is also the file stem (`reflect-state`).
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Kind tag carried by every [`SchemaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaErrorKind {
    MissingField,
    OutOfRange,
    WrongType,
    ParseError,
    SchemaLookupError,
    NotFound,
    IoError,
}

impl SchemaErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::OutOfRange => "out_of_range",
            Self::WrongType => "wrong_type",
            Self::ParseError => "parse_error",
            Self::SchemaLookupError => "schema_lookup_error",
            Self::NotFound => "not_found",
            Self::IoError => "io_error",
        }
    }

    /// Taxonomy category: field-level kinds are all `validation_error`.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::MissingField | Self::OutOfRange | Self::WrongType => "validation_error",
            Self::ParseError => "parse_error",
            Self::SchemaLookupError => "schema_lookup_error",
            Self::NotFound => "not_found",
            Self::IoError => "io_error",
        }
    }

    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::MissingField | Self::OutOfRange | Self::WrongType => ErrorCode::ValidationFailed,
            Self::ParseError => ErrorCode::DocumentParseFailed,
            Self::SchemaLookupError => ErrorCode::SchemaLookupFailed,
            Self::NotFound => ErrorCode::FileNotFound,
            Self::IoError => ErrorCode::InternalUnexpected,
        }
    }
}

impl fmt::Display for SchemaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation problem, located within the structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaError {
    /// Dotted/indexed location such as `learnings[2].confidence`; empty for
    /// whole-file problems.
    pub path: String,
    pub message: String,
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub fn new(kind: SchemaErrorKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.kind.code()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "{}: {}: {}", self.kind, self.path, self.message)
        }
    }
}

impl std::error::Error for SchemaError {}

/// Validation result for one file of a bulk check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileValidation {
    pub path: PathBuf,
    pub schema: &'static str,
    pub errors: Vec<SchemaError>,
}

impl FileValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Typed model bound to exactly one registered schema.
pub trait CanonicalModel: DeserializeOwned {
    const SCHEMA: &'static Schema;
}

/// Resolves canonical file names to schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    by_name: BTreeMap<String, &'static Schema>,
}

impl SchemaRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in canonical schema.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for schema in builtin::ALL {
            registry.register(schema);
        }
        registry
    }

    /// Register `schema` under its name and its `.yaml`/`.yml` file names.
    pub fn register(&mut self, schema: &'static Schema) {
        for key in [
            schema.name.to_string(),
            format!("{}.yaml", schema.name),
            format!("{}.yml", schema.name),
        ] {
            self.by_name.insert(key, schema);
        }
    }

    /// Registered schemas, one entry per schema.
    pub fn schemas(&self) -> impl Iterator<Item = &'static Schema> + '_ {
        self.by_name
            .iter()
            .filter(|(key, schema)| key.as_str() == schema.name)
            .map(|(_, schema)| *schema)
    }

    /// Resolve a file name: exact registered name, then basename, then stem.
    #[must_use]
    pub fn schema_for(&self, filename: &str) -> Option<&'static Schema> {
        if let Some(schema) = self.by_name.get(filename) {
            return Some(*schema);
        }
        let path = Path::new(filename);
        let basename = path.file_name().and_then(|n| n.to_str());
        if let Some(schema) = basename.and_then(|b| self.by_name.get(b)) {
            return Some(*schema);
        }
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| self.by_name.get(stem))
            .copied()
    }

    /// Validate the file at `path`; an empty list means valid.
    #[must_use]
    pub fn validate(&self, path: &Path) -> Vec<SchemaError> {
        match self.check_file(path) {
            Ok((_, _, errors)) => errors,
            Err(err) => vec![err],
        }
    }

    /// Validate in-memory YAML as if it were the file `filename`.
    #[must_use]
    pub fn validate_text(&self, filename: &str, text: &str) -> Vec<SchemaError> {
        let Some(schema) = self.schema_for(filename) else {
            return vec![lookup_error(filename)];
        };
        match parse_structure(text) {
            Ok(value) => validate_value(schema, &value).1,
            Err(err) => vec![err],
        }
    }

    /// Validate and deserialize `path` into its typed model.
    ///
    /// On failure the first validation problem is returned.
    pub fn load<M: CanonicalModel>(&self, path: &Path) -> Result<M, SchemaError> {
        let (schema, normalized, mut errors) = self.check_file(path)?;
        if schema.name != M::SCHEMA.name {
            return Err(SchemaError::new(
                SchemaErrorKind::SchemaLookupError,
                "",
                format!(
                    "{} holds a '{}' document, not '{}'",
                    path.display(),
                    schema.name,
                    M::SCHEMA.name
                ),
            ));
        }
        if !errors.is_empty() {
            return Err(errors.swap_remove(0));
        }
        serde_yaml::from_value(normalized)
            .map_err(|err| SchemaError::new(SchemaErrorKind::WrongType, "", err.to_string()))
    }

    /// Validate every canonical file present in `dir`.
    ///
    /// Only `.yaml`/`.yml` files whose name resolves to a schema are checked.
    pub fn validate_state_dir(&self, dir: &Path) -> Result<Vec<FileValidation>, SchemaError> {
        let entries = fs::read_dir(dir).map_err(|err| io_error(dir, &err))?;
        let mut results = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| io_error(dir, &err))?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yaml" || e == "yml");
            if !is_yaml || !path.is_file() {
                continue;
            }
            let Some(schema) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.by_name.get(n))
            else {
                debug!(path = %path.display(), "skipping file with no registered schema");
                continue;
            };
            let errors = self.validate(&path);
            results.push(FileValidation {
                path,
                schema: schema.name,
                errors,
            });
        }
        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    fn check_file(
        &self,
        path: &Path,
    ) -> Result<(&'static Schema, Value, Vec<SchemaError>), SchemaError> {
        let name = path.to_string_lossy();
        let schema = self.schema_for(&name).ok_or_else(|| lookup_error(&name))?;
        let text = fs::read_to_string(path).map_err(|err| io_error(path, &err))?;
        let value = parse_structure(&text)?;
        let (normalized, errors) = validate_value(schema, &value);
        debug!(
            path = %path.display(),
            schema = schema.name,
            errors = errors.len(),
            "validated canonical file"
        );
        Ok((schema, normalized, errors))
    }
}

fn lookup_error(filename: &str) -> SchemaError {
    SchemaError::new(
        SchemaErrorKind::SchemaLookupError,
        "",
        format!("no schema registered for '{filename}'"),
    )
}

fn io_error(path: &Path, err: &io::Error) -> SchemaError {
    let kind = if err.kind() == io::ErrorKind::NotFound {
        SchemaErrorKind::NotFound
    } else {
        SchemaErrorKind::IoError
    };
    SchemaError::new(kind, "", format!("{}: {err}", path.display()))
}

fn parse_structure(text: &str) -> Result<Value, SchemaError> {
    document::parse_yaml_mapping(text)
        .map(Value::Mapping)
        .map_err(|err| SchemaError::new(SchemaErrorKind::ParseError, "", err.to_string()))
}

/// Validate `value` against `schema`.
///
/// Returns the normalized value together with the complete list of problems.
#[must_use]
pub fn validate_value(schema: &Schema, value: &Value) -> (Value, Vec<SchemaError>) {
    let mut errors = Vec::new();
    let mut normalized = value.clone();
    match &mut normalized {
        Value::Mapping(mapping) => validate_fields(schema.fields, mapping, "", &mut errors),
        other => errors.push(SchemaError::new(
            SchemaErrorKind::WrongType,
            "",
            format!("expected a mapping at the top level, found {}", value_kind(other)),
        )),
    }
    (normalized, errors)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn validate_fields(
    fields: &[FieldSpec],
    mapping: &mut Mapping,
    prefix: &str,
    errors: &mut Vec<SchemaError>,
) {
    for field in fields {
        let path = join(prefix, field.name);
        let key = Value::String(field.name.to_string());
        let current = mapping.get(&key).filter(|v| !v.is_null()).cloned();

        let Some(value) = current else {
            if let FieldKind::Text { default: Some(default) } = field.kind {
                mapping.insert(key, Value::String(default.to_string()));
            } else if field.required {
                let message = if mapping.contains_key(&key) {
                    "required field is null"
                } else {
                    "required field is missing"
                };
                errors.push(SchemaError::new(SchemaErrorKind::MissingField, path, message));
            }
            continue;
        };

        if let Some(replacement) = check_value(field.kind, value, &path, errors) {
            mapping.insert(key, replacement);
        }
    }
}

fn wrong_type(path: &str, expected: &str, found: &Value) -> SchemaError {
    SchemaError::new(
        SchemaErrorKind::WrongType,
        path,
        format!("expected {expected}, found {}", value_kind(found)),
    )
}

/// Check one present value; returns a replacement when normalization changed it.
fn check_value(
    kind: FieldKind,
    value: Value,
    path: &str,
    errors: &mut Vec<SchemaError>,
) -> Option<Value> {
    match kind {
        FieldKind::Text { .. } => {
            if !value.is_string() {
                errors.push(wrong_type(path, "text", &value));
            }
            None
        }
        FieldKind::Bool => {
            if !value.is_bool() {
                errors.push(wrong_type(path, "a boolean", &value));
            }
            None
        }
        FieldKind::Timestamp => {
            match value.as_str() {
                Some(text) if parse_timestamp(text).is_some() => {}
                Some(text) => errors.push(SchemaError::new(
                    SchemaErrorKind::ParseError,
                    path,
                    format!("unparseable timestamp '{text}'"),
                )),
                None => errors.push(wrong_type(path, "a timestamp", &value)),
            }
            None
        }
        FieldKind::Integer { min, max } => {
            match value.as_i64() {
                Some(n) => check_range(path, n, min, max, errors),
                None => errors.push(wrong_type(path, "an integer", &value)),
            }
            None
        }
        FieldKind::Number { min, max } => {
            let (number, coerced) = match &value {
                Value::Number(n) => (n.as_f64(), false),
                Value::String(text) => (coerce_bare_decimal(text), true),
                _ => (None, false),
            };
            let Some(number) = number else {
                errors.push(wrong_type(path, "a number", &value));
                return None;
            };
            if number.is_nan() {
                errors.push(SchemaError::new(SchemaErrorKind::OutOfRange, path, "value is not a number"));
                return None;
            }
            check_range(path, number, min, max, errors);
            coerced.then(|| Value::Number(serde_yaml::Number::from(number)))
        }
        FieldKind::TextList => {
            let Value::Sequence(items) = &value else {
                errors.push(wrong_type(path, "a list of text", &value));
                return None;
            };
            for (index, item) in items.iter().enumerate() {
                if !item.is_string() {
                    errors.push(wrong_type(&format!("{path}[{index}]"), "text", item));
                }
            }
            None
        }
        FieldKind::Records(fields) => {
            let mut items = match value {
                Value::Sequence(items) => items,
                other => {
                    errors.push(wrong_type(path, "a list of records", &other));
                    return None;
                }
            };
            for (index, item) in items.iter_mut().enumerate() {
                let item_path = format!("{path}[{index}]");
                match item {
                    Value::Mapping(record) => validate_fields(fields, record, &item_path, errors),
                    other => errors.push(wrong_type(&item_path, "a record", other)),
                }
            }
            Some(Value::Sequence(items))
        }
    }
}

fn check_range<T>(path: &str, n: T, min: Option<T>, max: Option<T>, errors: &mut Vec<SchemaError>)
where
    T: PartialOrd + fmt::Display + Copy,
{
    if let Some(min) = min.filter(|min| n < *min) {
        errors.push(SchemaError::new(
            SchemaErrorKind::OutOfRange,
            path,
            format!("value {n} is below the minimum {min}"),
        ));
    }
    if let Some(max) = max.filter(|max| n > *max) {
        errors.push(SchemaError::new(
            SchemaErrorKind::OutOfRange,
            path,
            format!("value {n} is above the maximum {max}"),
        ));
    }
}

/// Coerce a bare decimal with no leading digit (`.5`, `-.25`) to a number.
///
/// Only this spelling is coerced; other numeric-looking strings stay text
/// and fail the type check.
#[must_use]
pub fn coerce_bare_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);
    let digits = unsigned.strip_prefix('.')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
