//! `wrk gates <ID>`: report process gate evidence for one item.

use std::io::Write;

use clap::Args;
use wrk_core::gates::{GateReport, Verifier};

use super::{Context, Exit};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct GatesArgs {
    /// Work item ID, e.g. WRK-42.
    pub id: String,
}

pub fn run_gates(args: &GatesArgs, ctx: &Context) -> anyhow::Result<Exit> {
    let id = match ctx.parse_id(&args.id)? {
        Ok(id) => id,
        Err(exit) => return Ok(exit),
    };
    let queue = match ctx.queue() {
        Ok(queue) => queue,
        Err(err) => return ctx.fail_with(&err),
    };
    let report = match Verifier::standard().verify(&queue, id) {
        Ok(report) => report,
        Err(err) => return ctx.fail_with(&err),
    };

    render_mode(ctx.output, &report, render_gates_text, render_gates_pretty)?;
    Ok(Exit::check(report.ok))
}

fn render_gates_text(report: &GateReport, w: &mut dyn Write) -> std::io::Result<()> {
    for gate in &report.gates {
        let mark = if gate.satisfied { "OK  " } else { "FAIL" };
        writeln!(w, "{mark} {:<22} {}", gate.gate, gate.details)?;
    }
    let failed = report.gates.iter().filter(|g| !g.satisfied).count();
    if report.ok {
        writeln!(w, "gates: {} passed", report.id)
    } else {
        writeln!(w, "gates: {} has {failed} of {} unsatisfied", report.id, report.gates.len())
    }
}

fn render_gates_pretty(report: &GateReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Gates for {}", report.id))?;
    render_gates_text(report, w)
}
