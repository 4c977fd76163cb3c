//! `wrk session <ID>`: record what happened in this session.

use std::io::Write;

use chrono::Utc;
use clap::Args;
use serde::Serialize;
use wrk_core::WorkItemId;
use wrk_core::model::SessionState;
use wrk_core::session::{self, SessionUpdate};

use super::{Context, Exit};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Work item ID, e.g. WRK-42.
    pub id: String,

    /// Free-form progress notes.
    #[arg(long, default_value = "")]
    pub notes: String,

    /// Modified file path (repeatable).
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<String>,

    /// Next step (repeatable).
    #[arg(long = "next", value_name = "STEP")]
    pub next_steps: Vec<String>,

    /// Recent commit summary text.
    #[arg(long, default_value = "")]
    pub commits: String,
}

#[derive(Debug, Serialize)]
pub struct SessionRecorded {
    pub id: WorkItemId,
    pub session_state: SessionState,
}

pub fn run_session(args: &SessionArgs, ctx: &Context) -> anyhow::Result<Exit> {
    let id = match ctx.parse_id(&args.id)? {
        Ok(id) => id,
        Err(exit) => return Ok(exit),
    };
    let queue = match ctx.queue() {
        Ok(queue) => queue,
        Err(err) => return ctx.fail_with(&err),
    };

    let update = SessionUpdate {
        progress_notes: args.notes.clone(),
        modified_files: args.files.clone(),
        next_steps: args.next_steps.clone(),
        recent_commits: args.commits.clone(),
    };
    let session_state = match session::record(&queue, id, Utc::now(), &update) {
        Ok(snapshot) => snapshot,
        Err(err) => return ctx.fail_with(&err),
    };

    let recorded = SessionRecorded { id, session_state };
    render_mode(ctx.output, &recorded, render_session_text, |r, w| {
        pretty_section(w, &format!("Session recorded for {}", r.id))?;
        render_snapshot(&r.session_state, w)
    })?;
    Ok(Exit::Success)
}

fn render_session_text(recorded: &SessionRecorded, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "session: {} updated at {} ({} files, {} next steps)",
        recorded.id,
        recorded.session_state.last_updated,
        recorded.session_state.modified_files.len(),
        recorded.session_state.next_steps.len()
    )
}

/// Human rendering of a snapshot, shared with `wrk show`.
pub fn render_snapshot(state: &SessionState, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "updated", &state.last_updated)?;
    pretty_kv(w, "notes", &state.progress_notes)?;
    if !state.modified_files.is_empty() {
        pretty_kv(w, "files", state.modified_files.join(", "))?;
    }
    for step in &state.next_steps {
        pretty_kv(w, "next", step)?;
    }
    if !state.recent_commits.is_empty() {
        pretty_kv(w, "commits", "")?;
        for line in state.recent_commits.lines() {
            writeln!(w, "  {line}")?;
        }
    }
    Ok(())
}
