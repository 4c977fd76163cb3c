//! `wrk create`: allocate the next ID and add a pending item.

use std::io::Write;

use chrono::Utc;
use clap::Args;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use wrk_core::queue::NewItem;
use wrk_core::schema::SchemaRegistry;
use wrk_core::schema::models::QueueState;
use wrk_core::{Location, WorkItemId};

use super::{Context, Exit};
use crate::output::render;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Short title.
    #[arg(long)]
    pub title: String,

    /// Executive summary for the `What` section. Defaults to the title.
    #[arg(long)]
    pub summary: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub complexity: Option<String>,

    #[arg(long)]
    pub route: Option<String>,

    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedItem {
    pub id: WorkItemId,
    pub location: Location,
    pub path: String,
}

impl CreateArgs {
    fn fields(&self) -> Mapping {
        let mut fields = Mapping::new();
        for (key, value) in [
            ("priority", &self.priority),
            ("complexity", &self.complexity),
            ("route", &self.route),
            ("provider", &self.provider),
        ] {
            if let Some(value) = value {
                fields.insert(key.into(), Value::String(value.clone()));
            }
        }
        fields
    }
}

const LEDGER_NAMES: [&str; 2] = ["state.yaml", "state.yml"];

/// `last_id` from the queue statistics ledger, when present and valid.
fn ledger_last_id(ctx: &Context) -> Option<u64> {
    let path = LEDGER_NAMES
        .iter()
        .map(|name| ctx.state_dir.join(name))
        .find(|path| path.is_file())?;
    match SchemaRegistry::builtin().load::<QueueState>(&path) {
        Ok(state) => Some(state.last_id),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring invalid queue state");
            None
        }
    }
}

pub fn run_create(args: &CreateArgs, ctx: &Context) -> anyhow::Result<Exit> {
    if args.title.trim().is_empty() {
        return ctx.fail(wrk_core::ErrorCode::ValidationFailed, "title must not be empty");
    }
    let queue = match ctx.queue() {
        Ok(queue) => queue,
        Err(err) => return ctx.fail_with(&err),
    };

    let draft = NewItem {
        title: args.title.trim().to_string(),
        summary: args.summary.clone(),
        created_at: Utc::now(),
        last_known_id: ledger_last_id(ctx),
        fields: args.fields(),
    };
    let item = match queue.create(&draft) {
        Ok(item) => item,
        Err(err) => return ctx.fail_with(&err),
    };

    let created = CreatedItem {
        id: item.id,
        location: item.location,
        path: item.path.display().to_string(),
    };
    render(ctx.output, &created, |c, w| {
        writeln!(w, "created {} in {}/ ({})", c.id, c.location, c.path)
    })?;
    Ok(Exit::Success)
}
