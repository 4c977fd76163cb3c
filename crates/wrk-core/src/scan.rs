//! Queue audit: stale active items and items missing routing metadata.
//!
//! Read-only. No locks are taken; a file being rewritten concurrently is
//! either seen before or after its rename.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::dates::parse_timestamp;
use crate::gates::builtin::is_filled;
use crate::model::{Location, WorkItemId};
use crate::queue::{Queue, QueueError, WorkItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    pub working_stale_days: u32,
    pub blocked_stale_days: u32,
    pub required_fields: Vec<String>,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanPolicy {
    fn from(config: &ScanConfig) -> Self {
        Self {
            working_stale_days: config.working_stale_days,
            blocked_stale_days: config.blocked_stale_days,
            required_fields: config.required_fields.clone(),
        }
    }
}

impl ScanPolicy {
    fn threshold(&self, location: Location) -> Option<u32> {
        match location {
            Location::Working => Some(self.working_stale_days),
            Location::Blocked => Some(self.blocked_stale_days),
            _ => None,
        }
    }
}

/// Where an item's age was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeSource {
    CreatedAt,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleFinding {
    pub id: WorkItemId,
    pub location: Location,
    pub since: DateTime<Utc>,
    pub age_days: i64,
    pub age_source: AgeSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFieldsFinding {
    pub id: WorkItemId,
    pub location: Location,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub scanned: usize,
    pub stale_working: Vec<StaleFinding>,
    pub stale_blocked: Vec<StaleFinding>,
    pub missing_fields: Vec<MissingFieldsFinding>,
    /// Files that could not be read.
    pub unreadable: Vec<PathBuf>,
}

impl ScanReport {
    /// No findings in any category.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.stale_working.is_empty() && self.stale_blocked.is_empty() && self.missing_fields.is_empty()
    }

    #[must_use]
    pub fn finding_count(&self) -> usize {
        self.stale_working.len() + self.stale_blocked.len() + self.missing_fields.len()
    }
}

/// `created_at` when it parses, otherwise the file's modification time.
fn item_age(item: &WorkItem) -> Option<(DateTime<Utc>, AgeSource)> {
    item.document
        .get_str("created_at")
        .and_then(parse_timestamp)
        .map(|at| (at, AgeSource::CreatedAt))
        .or_else(|| item.modified.map(|at| (DateTime::<Utc>::from(at), AgeSource::Modified)))
}

fn missing_fields(item: &WorkItem, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|field| !item.document.get(field).is_some_and(is_filled))
        .cloned()
        .collect()
}

/// Audit the active status directories as of `now`.
pub fn scan(queue: &Queue, now: DateTime<Utc>, policy: &ScanPolicy) -> Result<ScanReport, QueueError> {
    let mut report = ScanReport {
        generated_at: now,
        scanned: 0,
        stale_working: Vec::new(),
        stale_blocked: Vec::new(),
        missing_fields: Vec::new(),
        unreadable: Vec::new(),
    };

    for location in Location::ACTIVE {
        for entry in queue.items_in(location)? {
            let item = match queue.read(&entry) {
                Ok(item) => item,
                Err(err) => {
                    warn!(path = %entry.path.display(), error = %err, "skipping unreadable item");
                    report.unreadable.push(entry.path);
                    continue;
                }
            };
            report.scanned += 1;

            if let Some(days) = policy.threshold(location) {
                match item_age(&item) {
                    Some((since, age_source)) if now - since > Duration::days(i64::from(days)) => {
                        let finding = StaleFinding {
                            id: item.id,
                            location,
                            since,
                            age_days: (now - since).num_days(),
                            age_source,
                        };
                        debug!(id = %item.id, %location, age_days = finding.age_days, "stale item");
                        if location == Location::Working {
                            report.stale_working.push(finding);
                        } else {
                            report.stale_blocked.push(finding);
                        }
                    }
                    Some(_) => {}
                    None => warn!(id = %item.id, "no usable created_at or modification time"),
                }
            }

            let missing = missing_fields(&item, &policy.required_fields);
            if !missing.is_empty() {
                report.missing_fields.push(MissingFieldsFinding {
                    id: item.id,
                    location,
                    missing,
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SecondsFormat, TimeZone};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const ROUTED: &str = "priority: high\ncomplexity: medium\nroute: b\nprovider: claude\n";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> String {
        (now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn seed(root: &Path, location: &str, id: u64, metadata: &str) {
        let dir = root.join(location);
        fs::create_dir_all(&dir).expect("dir");
        fs::write(dir.join(format!("WRK-{id}.md")), format!("---\n{metadata}---\n")).expect("write");
    }

    #[test]
    fn working_item_is_stale_after_threshold() {
        let tmp = TempDir::new().expect("tmp");
        seed(tmp.path(), "working", 1, &format!("created_at: {}\n{ROUTED}", days_ago(10)));
        seed(tmp.path(), "working", 2, &format!("created_at: {}\n{ROUTED}", days_ago(3)));
        let queue = Queue::open(tmp.path()).expect("open");

        let report = scan(&queue, now(), &ScanPolicy::default()).expect("scan");
        assert_eq!(report.scanned, 2);
        assert_eq!(report.stale_working.len(), 1);
        let finding = &report.stale_working[0];
        assert_eq!(finding.id, WorkItemId::new(1));
        assert_eq!(finding.age_days, 10);
        assert_eq!(finding.age_source, AgeSource::CreatedAt);
        assert!(report.missing_fields.is_empty());
    }

    #[test]
    fn blocked_uses_its_own_threshold() {
        let tmp = TempDir::new().expect("tmp");
        seed(tmp.path(), "blocked", 1, &format!("created_at: {}\n{ROUTED}", days_ago(10)));
        seed(tmp.path(), "blocked", 2, &format!("created_at: '{}'\n{ROUTED}", days_ago(15)));
        let queue = Queue::open(tmp.path()).expect("open");

        let report = scan(&queue, now(), &ScanPolicy::default()).expect("scan");
        let ids: Vec<u64> = report.stale_blocked.iter().map(|f| f.id.number()).collect();
        assert_eq!(ids, [2]);
        assert!(report.stale_working.is_empty());
    }

    #[test]
    fn unparseable_created_at_falls_back_to_mtime() {
        let tmp = TempDir::new().expect("tmp");
        seed(tmp.path(), "working", 1, &format!("created_at: last tuesday\n{ROUTED}"));
        let queue = Queue::open(tmp.path()).expect("open");

        let far_future = Utc::now() + Duration::days(30);
        let report = scan(&queue, far_future, &ScanPolicy::default()).expect("scan");
        assert_eq!(report.stale_working.len(), 1);
        assert_eq!(report.stale_working[0].age_source, AgeSource::Modified);
    }

    #[test]
    fn missing_and_blank_fields_are_reported_for_active_items_only() {
        let tmp = TempDir::new().expect("tmp");
        seed(tmp.path(), "pending", 1, "priority: high\nroute: ''\nprovider: ~\n");
        seed(tmp.path(), "done", 2, "status: done\n");
        let queue = Queue::open(tmp.path()).expect("open");

        let report = scan(&queue, now(), &ScanPolicy::default()).expect("scan");
        assert_eq!(report.scanned, 1);
        assert_eq!(report.missing_fields.len(), 1);
        assert_eq!(report.missing_fields[0].missing, ["complexity", "route", "provider"]);
        assert!(!report.is_clean());
        assert_eq!(report.finding_count(), 1);
    }

    #[test]
    fn policy_follows_config() {
        let config = ScanConfig {
            working_stale_days: 2,
            blocked_stale_days: 5,
            required_fields: vec!["owner".into()],
        };
        let tmp = TempDir::new().expect("tmp");
        seed(tmp.path(), "working", 1, &format!("created_at: {}\nowner: kai\n", days_ago(3)));
        let queue = Queue::open(tmp.path()).expect("open");

        let report = scan(&queue, now(), &ScanPolicy::from(&config)).expect("scan");
        assert_eq!(report.stale_working.len(), 1);
        assert!(report.missing_fields.is_empty());
    }

    #[test]
    fn empty_queue_is_clean() {
        let tmp = TempDir::new().expect("tmp");
        let queue = Queue::open(tmp.path()).expect("open");
        let report = scan(&queue, now(), &ScanPolicy::default()).expect("scan");
        assert!(report.is_clean());
        assert_eq!(report.scanned, 0);
    }
}
