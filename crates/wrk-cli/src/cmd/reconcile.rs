//! `wrk reconcile` and `wrk migrate`: align item status with its directory.

use std::io::Write;

use clap::Args;
use wrk_core::lifecycle::{self, ReconcileAction, ReconcileOutcome, ReconcilePolicy};

use super::{Context, Exit};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Only this item. Defaults to the whole queue.
    pub id: Option<String>,

    /// Report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run_reconcile(args: &ReconcileArgs, ctx: &Context) -> anyhow::Result<Exit> {
    let policy = ReconcilePolicy {
        normalize_synonyms: ctx.config.reconcile.normalize_synonyms,
    };
    let queue = match ctx.queue() {
        Ok(queue) => queue,
        Err(err) => return ctx.fail_with(&err),
    };

    let result = match &args.id {
        Some(raw) => match ctx.parse_id(raw)? {
            Ok(id) => lifecycle::reconcile_id(&queue, id, policy, args.dry_run).map(|o| vec![o]),
            Err(exit) => return Ok(exit),
        },
        None => lifecycle::reconcile_queue(&queue, policy, args.dry_run),
    };

    match result {
        Ok(outcomes) => finish(ctx, &outcomes, args.dry_run),
        Err(err) => ctx.fail_with(&err),
    }
}

pub fn run_migrate(args: &MigrateArgs, ctx: &Context) -> anyhow::Result<Exit> {
    let queue = match ctx.queue() {
        Ok(queue) => queue,
        Err(err) => return ctx.fail_with(&err),
    };
    match lifecycle::migrate_queue(&queue, args.dry_run) {
        Ok(outcomes) => finish(ctx, &outcomes, args.dry_run),
        Err(err) => ctx.fail_with(&err),
    }
}

fn finish(ctx: &Context, outcomes: &[ReconcileOutcome], dry_run: bool) -> anyhow::Result<Exit> {
    render_mode(
        ctx.output,
        &outcomes,
        |o, w| render_outcomes_text(o, dry_run, w),
        |o, w| {
            pretty_section(w, if dry_run { "Reconcile (dry run)" } else { "Reconcile" })?;
            render_outcomes_text(o, dry_run, w)
        },
    )?;
    Ok(Exit::check(!outcomes.iter().any(ReconcileOutcome::is_failed)))
}

const fn action_label(action: ReconcileAction) -> &'static str {
    match action {
        ReconcileAction::Unchanged => "unchanged",
        ReconcileAction::Synthesized => "synthesized",
        ReconcileAction::Repaired => "repaired",
        ReconcileAction::Normalized => "normalized",
        ReconcileAction::Skipped => "skipped",
        ReconcileAction::Failed => "failed",
    }
}

fn render_outcomes_text(
    outcomes: &[ReconcileOutcome],
    dry_run: bool,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    let mut changed = 0;
    let mut failed = 0;
    for outcome in outcomes {
        if let Some(error) = &outcome.error {
            failed += 1;
            writeln!(
                w,
                "FAIL {:<8} {}/ {} ({})",
                outcome.id.to_string(),
                outcome.location,
                error.message,
                error.error_code
            )?;
            continue;
        }
        let mark = match outcome.action {
            ReconcileAction::Unchanged => continue,
            ReconcileAction::Skipped => "SKIP",
            _ if dry_run => "PLAN",
            _ => "FIX ",
        };
        if outcome.changed {
            changed += 1;
        }
        writeln!(
            w,
            "{mark} {:<8} {}/ {} -> {} ({})",
            outcome.id.to_string(),
            outcome.location,
            outcome.previous.as_deref().unwrap_or("<none>"),
            outcome.status,
            action_label(outcome.action)
        )?;
    }
    let verb = if dry_run { "would change" } else { "changed" };
    write!(w, "reconcile: {verb} {changed} of {} items", outcomes.len())?;
    if failed > 0 {
        write!(w, ", {failed} failed")?;
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrk_core::lifecycle::ReconcileFailure;
    use wrk_core::{Location, Status, WorkItemId};

    fn outcome(id: u64, action: ReconcileAction) -> ReconcileOutcome {
        ReconcileOutcome {
            id: WorkItemId::new(id),
            location: Location::Done,
            previous: Some("working".into()),
            status: Status::Done,
            action,
            changed: !matches!(action, ReconcileAction::Unchanged | ReconcileAction::Skipped),
            written: false,
            error: None,
        }
    }

    #[test]
    fn unchanged_items_are_summarized_only() {
        let outcomes = [
            outcome(1, ReconcileAction::Repaired),
            outcome(2, ReconcileAction::Unchanged),
            outcome(3, ReconcileAction::Skipped),
        ];
        let mut buf = Vec::new();
        render_outcomes_text(&outcomes, true, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("PLAN WRK-1    done/ working -> done (repaired)"));
        assert!(text.contains("SKIP WRK-3"));
        assert!(!text.contains("WRK-2"));
        assert!(text.ends_with("reconcile: would change 1 of 3 items\n"));
    }

    #[test]
    fn failed_items_are_listed_and_counted() {
        let mut locked = outcome(2, ReconcileAction::Failed);
        locked.changed = false;
        locked.error = Some(ReconcileFailure {
            error_code: "E5002",
            message: "could not lock .locks/WRK-2.lock within 30ms".into(),
        });
        let outcomes = [outcome(1, ReconcileAction::Repaired), locked];
        let mut buf = Vec::new();
        render_outcomes_text(&outcomes, false, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("FIX  WRK-1"));
        assert!(text.contains("FAIL WRK-2    done/ could not lock"));
        assert!(text.contains("(E5002)"));
        assert!(text.ends_with("reconcile: changed 1 of 2 items, 1 failed\n"));
    }
}
