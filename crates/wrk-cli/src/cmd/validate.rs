//! `wrk validate`: check canonical state files against their schemas.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use wrk_core::schema::{SchemaError, SchemaErrorKind, SchemaRegistry};

use super::{Context, Exit};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Files to check. Defaults to every canonical file in the state directory.
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: String,
    pub valid: bool,
    pub errors: Vec<SchemaError>,
}

#[derive(Debug, Serialize)]
pub struct ValidateReport {
    pub valid: bool,
    pub files: Vec<FileReport>,
}

impl ValidateReport {
    fn exit(&self) -> Exit {
        let missing = self
            .files
            .iter()
            .flat_map(|file| &file.errors)
            .any(|err| err.kind == SchemaErrorKind::NotFound);
        if missing {
            Exit::NotFound
        } else {
            Exit::check(self.valid)
        }
    }
}

fn file_report(path: String, errors: Vec<SchemaError>) -> FileReport {
    FileReport {
        valid: errors.is_empty(),
        path,
        errors,
    }
}

pub fn run_validate(args: &ValidateArgs, ctx: &Context) -> anyhow::Result<Exit> {
    let registry = SchemaRegistry::builtin();

    let files: Vec<FileReport> = if args.paths.is_empty() {
        match registry.validate_state_dir(&ctx.state_dir) {
            Ok(results) => results
                .into_iter()
                .map(|r| file_report(r.path.display().to_string(), r.errors))
                .collect(),
            Err(err) => return ctx.fail_with(&err),
        }
    } else {
        args.paths
            .iter()
            .map(|path| file_report(path.display().to_string(), registry.validate(path)))
            .collect()
    };

    let report = ValidateReport {
        valid: files.iter().all(|file| file.valid),
        files,
    };
    let exit = report.exit();

    if let [single] = report.files.as_slice() {
        render_mode(ctx.output, single, render_file_text, render_file_pretty)?;
    } else {
        render_mode(ctx.output, &report, render_report_text, render_report_pretty)?;
    }
    Ok(exit)
}

fn render_file_text(file: &FileReport, w: &mut dyn Write) -> std::io::Result<()> {
    if file.valid {
        writeln!(w, "OK   {}", file.path)
    } else {
        writeln!(w, "FAIL {}", file.path)?;
        for err in &file.errors {
            writeln!(w, "  {err}")?;
        }
        Ok(())
    }
}

fn render_file_pretty(file: &FileReport, w: &mut dyn Write) -> std::io::Result<()> {
    render_file_text(file, w)
}

fn render_report_text(report: &ValidateReport, w: &mut dyn Write) -> std::io::Result<()> {
    for file in &report.files {
        render_file_text(file, w)?;
    }
    if report.files.is_empty() {
        writeln!(w, "validate: no canonical files found")
    } else if report.valid {
        writeln!(w, "validate: success")
    } else {
        writeln!(w, "validate: failed")
    }
}

fn render_report_pretty(report: &ValidateReport, w: &mut dyn Write) -> std::io::Result<()> {
    let failed = report.files.iter().filter(|f| !f.valid).count();
    pretty_section(
        w,
        &format!("Canonical files ({} checked, {failed} invalid)", report.files.len()),
    )?;
    render_report_text(report, w)
}
