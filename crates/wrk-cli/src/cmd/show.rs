//! `wrk show <ID>`: summary of one work item.

use std::io::Write;

use clap::Args;
use serde::Serialize;
use wrk_core::document;
use wrk_core::model::{SessionState, StatusReading};
use wrk_core::session;
use wrk_core::{Location, WorkItemId};

use super::session::render_snapshot;
use super::{Context, Exit};
use crate::output::{pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Work item ID, e.g. WRK-42.
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ShowItem {
    pub id: WorkItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub location: Location,
    /// Whether `status` agrees with the directory.
    pub consistent: bool,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub what: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<SessionState>,
}

pub fn run_show(args: &ShowArgs, ctx: &Context) -> anyhow::Result<Exit> {
    let id = match ctx.parse_id(&args.id)? {
        Ok(id) => id,
        Err(exit) => return Ok(exit),
    };
    let queue = match ctx.queue() {
        Ok(queue) => queue,
        Err(err) => return ctx.fail_with(&err),
    };
    let item = match queue.load(id) {
        Ok(item) => item,
        Err(err) => return ctx.fail_with(&err),
    };
    let session_state = match session::session_of(&item) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(%id, error = %err, "ignoring unreadable session_state");
            None
        }
    };

    let show = ShowItem {
        id,
        title: item.document.get_str("title").map(str::to_string),
        status: item.raw_status().map(str::to_string),
        location: item.location,
        consistent: item
            .status()
            .and_then(StatusReading::status)
            .is_some_and(|status| status == item.location.status()),
        path: item.path.display().to_string(),
        what: document::section(&item.document.body, "What")
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        session_state,
    };

    render_mode(ctx.output, &show, render_show_text, render_show_pretty)?;
    Ok(Exit::Success)
}

fn render_show_text(item: &ShowItem, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{}  {}  {}/  {}",
        item.id,
        item.status.as_deref().unwrap_or("-"),
        item.location,
        item.title.as_deref().unwrap_or("")
    )?;
    if let Some(ref what) = item.what {
        writeln!(w, "{what}")?;
    }
    if let Some(ref state) = item.session_state {
        writeln!(w, "session: {} {}", state.last_updated, state.progress_notes)?;
    }
    Ok(())
}

fn render_show_pretty(item: &ShowItem, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Item {}", item.id))?;
    if let Some(ref title) = item.title {
        writeln!(w, "{title}")?;
        pretty_rule(w)?;
    }
    pretty_kv(w, "status", item.status.as_deref().unwrap_or("<none>"))?;
    pretty_kv(w, "location", format!("{}/", item.location))?;
    if !item.consistent {
        pretty_kv(w, "note", "status disagrees with location; run `wrk reconcile`")?;
    }
    pretty_kv(w, "path", &item.path)?;

    if let Some(ref what) = item.what {
        writeln!(w)?;
        pretty_section(w, "What")?;
        for line in what.lines() {
            writeln!(w, "{line}")?;
        }
    }

    if let Some(ref state) = item.session_state {
        writeln!(w)?;
        pretty_section(w, "Session")?;
        render_snapshot(state, w)?;
    }
    Ok(())
}
