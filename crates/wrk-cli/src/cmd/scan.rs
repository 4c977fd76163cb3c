//! `wrk scan`: audit the queue for stale and incomplete items.

use std::io::Write;

use chrono::Utc;
use clap::Args;
use wrk_core::scan::{self, ScanPolicy, ScanReport, StaleFinding};

use super::{Context, Exit};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Override the working-item staleness threshold in days.
    #[arg(long)]
    pub working_days: Option<u32>,

    /// Override the blocked-item staleness threshold in days.
    #[arg(long)]
    pub blocked_days: Option<u32>,
}

pub fn run_scan(args: &ScanArgs, ctx: &Context) -> anyhow::Result<Exit> {
    let mut policy = ScanPolicy::from(&ctx.config.scan);
    if let Some(days) = args.working_days {
        policy.working_stale_days = days;
    }
    if let Some(days) = args.blocked_days {
        policy.blocked_stale_days = days;
    }

    let queue = match ctx.queue() {
        Ok(queue) => queue,
        Err(err) => return ctx.fail_with(&err),
    };
    let report = match scan::scan(&queue, Utc::now(), &policy) {
        Ok(report) => report,
        Err(err) => return ctx.fail_with(&err),
    };

    render_mode(ctx.output, &report, render_scan_text, render_scan_pretty)?;
    Ok(Exit::check(report.is_clean()))
}

fn stale_line(kind: &str, finding: &StaleFinding, w: &mut dyn Write) -> std::io::Result<()> {
    let source = match finding.age_source {
        scan::AgeSource::CreatedAt => "created_at",
        scan::AgeSource::Modified => "mtime",
    };
    writeln!(
        w,
        "{kind:<14} {:<8} {} days (by {source})",
        finding.id.to_string(),
        finding.age_days
    )
}

fn render_scan_text(report: &ScanReport, w: &mut dyn Write) -> std::io::Result<()> {
    for finding in &report.stale_working {
        stale_line("stale_working", finding, w)?;
    }
    for finding in &report.stale_blocked {
        stale_line("stale_blocked", finding, w)?;
    }
    for finding in &report.missing_fields {
        writeln!(
            w,
            "{:<14} {:<8} {}/ missing {}",
            "missing_fields",
            finding.id.to_string(),
            finding.location,
            finding.missing.join(", ")
        )?;
    }
    for path in &report.unreadable {
        writeln!(w, "{:<14} {}", "unreadable", path.display())?;
    }
    writeln!(
        w,
        "scan: {} findings across {} active items",
        report.finding_count(),
        report.scanned
    )
}

fn render_scan_pretty(report: &ScanReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!("Queue audit {}", report.generated_at.format("%Y-%m-%d %H:%M UTC")),
    )?;
    render_scan_text(report, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wrk_core::scan::{AgeSource, MissingFieldsFinding};
    use wrk_core::{Location, WorkItemId};

    #[test]
    fn text_has_one_line_per_finding() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let report = ScanReport {
            generated_at: at,
            scanned: 4,
            stale_working: vec![StaleFinding {
                id: WorkItemId::new(2),
                location: Location::Working,
                since: at,
                age_days: 9,
                age_source: AgeSource::Modified,
            }],
            stale_blocked: Vec::new(),
            missing_fields: vec![MissingFieldsFinding {
                id: WorkItemId::new(5),
                location: Location::Pending,
                missing: vec!["route".into(), "provider".into()],
            }],
            unreadable: Vec::new(),
        };
        let mut buf = Vec::new();
        render_scan_text(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("WRK-2") && lines[0].ends_with("9 days (by mtime)"));
        assert!(lines[1].ends_with("pending/ missing route, provider"));
        assert_eq!(lines[2], "scan: 2 findings across 4 active items");
    }
}
