//! Output modes and rendering shared by every command.
//!
//! Mode selection, first match wins: `--format`, then `--json`, then the
//! `FORMAT` environment variable, then pretty for a terminal and text for a
//! pipe. Results are written to stdout, errors to stderr.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use wrk_core::ErrorCode;

const RULE_WIDTH: usize = 72;
const KEY_WIDTH: usize = 12;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))
}

/// Heading line underlined by a rule.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<KEY_WIDTH$} {}", value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and rules for a person at a terminal.
    Pretty,
    /// One fact per line, for scripts and agents.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputMode {
    fn from_env_value(raw: &str) -> Option<Self> {
        Self::from_str(raw.trim(), true).ok()
    }
}

fn pick_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    stdout_is_tty: bool,
) -> OutputMode {
    format_flag
        .or_else(|| json_flag.then_some(OutputMode::Json))
        .or_else(|| format_env.and_then(OutputMode::from_env_value))
        .unwrap_or(if stdout_is_tty {
            OutputMode::Pretty
        } else {
            OutputMode::Text
        })
}

pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let format_env = std::env::var("FORMAT").ok();
    pick_mode(
        format_flag,
        json_flag,
        format_env.as_deref(),
        io::stdout().is_terminal(),
    )
}

fn write_json<T: Serialize + ?Sized>(w: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

/// Write `value` in `mode`, using `text` or `pretty` for the human modes.
pub fn render_mode_to<T: Serialize>(
    w: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => write_json(w, value)?,
        OutputMode::Text => text(value, w)?,
        OutputMode::Pretty => pretty(value, w)?,
    }
    Ok(())
}

pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    render_mode_to(&mut io::stdout().lock(), mode, value, text, pretty)
}

/// Like [`render_mode`] when text and pretty output are the same.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl Fn(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    render_mode(mode, value, &human, &human)
}

/// Failure shown to the user, carrying the stable code of the core error.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// `E####`
    pub error_code: String,
    pub kind: String,
}

impl CliError {
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: code.code().to_string(),
            kind: code.kind().to_string(),
        }
    }
}

/// `error: ...` plus an optional suggestion line, or `{"error": {...}}` in JSON mode.
pub fn render_error_to(w: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        return write_json(w, &serde_json::json!({ "error": error }));
    }
    writeln!(w, "error: {}", error.message)?;
    if let Some(suggestion) = &error.suggestion {
        writeln!(w, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    render_error_to(&mut io::stderr().lock(), mode, error)
}
