use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::{FilePredicate, Gate, GateCheck, GateContext};

/// Plan file looked up in the asset directory when `plan_artifact` is unset.
pub const DEFAULT_PLAN_FILE: &str = "plan.md";

pub const REVIEW_FILES: FilePredicate = FilePredicate::Named(&[
    "review.html",
    "review.md",
    "cross-review.md",
    "review-summary.md",
    "results.md",
]);

pub const TEST_FILES: FilePredicate = FilePredicate::NameContains("test");

pub const LEGAL_SCAN_FILE: &str = "legal-scan.md";

pub(super) fn standard_gates() -> Vec<Box<dyn Gate>> {
    vec![
        Box::new(PlanGate),
        Box::new(WorkstationGate),
        Box::new(EvidenceFileGate::new("cross_review", REVIEW_FILES)),
        Box::new(EvidenceFileGate::new("tdd", TEST_FILES)),
        Box::new(LegalGate),
    ]
}

/// `plan_reviewed` and `plan_approved` are true and the plan file exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanGate;

impl Gate for PlanGate {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn check(&self, ctx: &GateContext<'_>) -> GateCheck {
        let mut problems = Vec::new();
        for flag in ["plan_reviewed", "plan_approved"] {
            if !matches!(ctx.field(flag), Some(Value::Bool(true))) {
                problems.push(format!("{flag} is not true"));
            }
        }

        let artifact = match ctx.field("plan_artifact") {
            None | Some(Value::Null) => {
                let default = ctx.asset_dir.join(DEFAULT_PLAN_FILE);
                default.is_file().then_some(default).ok_or_else(|| {
                    format!("no plan_artifact set and {DEFAULT_PLAN_FILE} missing from assets")
                })
            }
            Some(Value::String(reference)) if !reference.trim().is_empty() => {
                resolve_artifact(ctx, reference.trim())
                    .ok_or_else(|| format!("plan artifact '{}' not found", reference.trim()))
            }
            Some(_) => Err("plan_artifact is not a path".to_string()),
        };

        match artifact {
            Ok(path) if problems.is_empty() => {
                GateCheck::pass(format!("plan reviewed and approved ({})", display_name(&path)))
            }
            Ok(_) => GateCheck::fail(problems.join("; ")),
            Err(missing) => {
                problems.push(missing);
                GateCheck::fail(problems.join("; "))
            }
        }
    }
}

/// Absolute, then relative to the asset directory, then to the queue root.
fn resolve_artifact(ctx: &GateContext<'_>, reference: &str) -> Option<PathBuf> {
    let given = Path::new(reference);
    if given.is_absolute() {
        return given.is_file().then(|| given.to_path_buf());
    }
    [ctx.asset_dir.join(given), ctx.queue_root.join(given)]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// `plan_workstations` and `execution_workstations` are present and non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkstationGate;

const WORKSTATION_FIELDS: [&str; 2] = ["plan_workstations", "execution_workstations"];

impl Gate for WorkstationGate {
    fn name(&self) -> &'static str {
        "workstation_contract"
    }

    fn check(&self, ctx: &GateContext<'_>) -> GateCheck {
        let missing: Vec<&str> = WORKSTATION_FIELDS
            .into_iter()
            .filter(|field| !ctx.field(field).is_some_and(is_filled))
            .collect();

        if missing.is_empty() {
            GateCheck::pass("plan and execution workstations recorded")
        } else {
            GateCheck::fail(format!("missing or empty: {}", missing.join(", ")))
        }
    }
}

/// Whether a metadata value counts as supplied.
///
/// Lists need at least one non-blank entry; scalars other than blank text count.
#[must_use]
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Sequence(items) => items.iter().any(is_filled),
        Value::Mapping(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
        Value::Tagged(tagged) => is_filled(&tagged.value),
    }
}

/// Passes when some asset file matches a filename convention.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceFileGate {
    name: &'static str,
    predicate: FilePredicate,
}

impl EvidenceFileGate {
    #[must_use]
    pub const fn new(name: &'static str, predicate: FilePredicate) -> Self {
        Self { name, predicate }
    }
}

impl Gate for EvidenceFileGate {
    fn name(&self) -> &'static str {
        self.name
    }

    fn check(&self, ctx: &GateContext<'_>) -> GateCheck {
        ctx.find(&self.predicate).map_or_else(
            || GateCheck::fail(format!("expected {} in assets", self.predicate.describe())),
            |found| GateCheck::pass(format!("found {found}")),
        )
    }
}

/// `legal-scan.md` exists and its `result:` line says pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegalGate;

impl Gate for LegalGate {
    fn name(&self) -> &'static str {
        "legal"
    }

    fn check(&self, ctx: &GateContext<'_>) -> GateCheck {
        let path = ctx.asset_dir.join(LEGAL_SCAN_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return GateCheck::fail(format!("{LEGAL_SCAN_FILE} missing"));
            }
            Err(err) => return GateCheck::fail(format!("{LEGAL_SCAN_FILE} unreadable: {err}")),
        };

        match scan_result(&text) {
            Some(result) if result.to_ascii_lowercase().contains("pass") => {
                GateCheck::pass(format!("legal scan result: {result}"))
            }
            Some(result) => GateCheck::fail(format!("legal scan result is '{result}'")),
            None => GateCheck::fail(format!("{LEGAL_SCAN_FILE} has no result: line")),
        }
    }
}

/// Value of the first `result:` line, tolerating list and bold markers.
#[must_use]
pub fn scan_result(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let line = line.trim().trim_start_matches(['-', '*', '+', ' ', '\t']);
        let key = line.get(..6)?;
        if !key.eq_ignore_ascii_case("result") {
            return None;
        }
        let rest = line[6..].trim_start_matches('*').strip_prefix(':')?;
        Some(rest.trim_start_matches('*').trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        metadata: Mapping,
    }

    impl Fixture {
        fn new(metadata: &str) -> Self {
            let dir = TempDir::new().expect("tmp");
            fs::create_dir_all(dir.path().join("assets")).expect("assets");
            Self {
                dir,
                metadata: serde_yaml::from_str(metadata).expect("yaml"),
            }
        }

        fn asset(&self, name: &str, text: &str) -> &Self {
            fs::write(self.assets().join(name), text).expect("write");
            self
        }

        fn assets(&self) -> PathBuf {
            self.dir.path().join("assets")
        }

        fn check(&self, gate: &dyn Gate) -> GateCheck {
            let assets = self.assets();
            let mut files: Vec<String> = fs::read_dir(&assets)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            files.sort();
            let ctx = GateContext {
                id: crate::model::WorkItemId::new(1),
                metadata: &self.metadata,
                queue_root: self.dir.path(),
                asset_dir: &assets,
                asset_files: files,
            };
            gate.check(&ctx)
        }
    }

    #[test]
    fn plan_needs_both_flags_and_default_artifact() {
        let fx = Fixture::new("plan_reviewed: true\nplan_approved: true\n");
        let check = fx.check(&PlanGate);
        assert!(!check.satisfied);
        assert!(check.details.contains("plan.md"));

        fx.asset("plan.md", "# plan\n");
        assert!(fx.check(&PlanGate).satisfied);

        let fx = Fixture::new("plan_reviewed: true\nplan_approved: 'true'\n");
        fx.asset("plan.md", "# plan\n");
        let check = fx.check(&PlanGate);
        assert!(!check.satisfied);
        assert_eq!(check.details, "plan_approved is not true");
    }

    #[test]
    fn plan_artifact_resolves_against_queue_root() {
        let fx = Fixture::new("plan_reviewed: true\nplan_approved: true\nplan_artifact: specs/wrk-1.md\n");
        let check = fx.check(&PlanGate);
        assert!(check.details.contains("specs/wrk-1.md"));

        fs::create_dir_all(fx.dir.path().join("specs")).unwrap();
        fs::write(fx.dir.path().join("specs/wrk-1.md"), "plan").unwrap();
        let check = fx.check(&PlanGate);
        assert!(check.satisfied, "{}", check.details);
    }

    #[test]
    fn workstation_fields_need_real_content() {
        let fx = Fixture::new("plan_workstations: [ace-linux-1]\nexecution_workstations: ['  ', '']\n");
        let check = fx.check(&WorkstationGate);
        assert!(!check.satisfied);
        assert_eq!(check.details, "missing or empty: execution_workstations");

        let fx = Fixture::new("plan_workstations: ace-linux-1\nexecution_workstations: 2\n");
        assert!(fx.check(&WorkstationGate).satisfied);
    }

    #[test]
    fn is_filled_handles_every_shape() {
        let cases = [
            ("~", false),
            ("''", false),
            ("[]", false),
            ("['', ' ']", false),
            ("{}", false),
            ("{a: 1}", true),
            ("false", true),
            ("0", true),
            ("[x]", true),
        ];
        for (text, expected) in cases {
            let value: Value = serde_yaml::from_str(text).unwrap();
            assert_eq!(is_filled(&value), expected, "{text}");
        }
    }

    #[test]
    fn review_and_tdd_follow_filename_conventions() {
        let fx = Fixture::new("{}");
        let review = EvidenceFileGate::new("cross_review", REVIEW_FILES);
        let tdd = EvidenceFileGate::new("tdd", TEST_FILES);
        fx.asset("notes.md", "");
        assert!(!fx.check(&review).satisfied);
        assert!(!fx.check(&tdd).satisfied);

        fx.asset("review-summary.md", "").asset("Unit-Test-Log.txt", "");
        assert_eq!(fx.check(&review).details, "found review-summary.md");
        assert_eq!(fx.check(&tdd).details, "found Unit-Test-Log.txt");
    }

    #[test]
    fn legal_scan_result_parsing() {
        assert_eq!(scan_result("# Scan\nresult: PASS\n"), Some("PASS"));
        assert_eq!(scan_result("- **Result:** passed, 0 findings"), Some("passed, 0 findings"));
        assert_eq!(scan_result("**Result**: fail"), Some("fail"));
        assert_eq!(scan_result("results pending\nsummary: pass"), None);
        assert_eq!(scan_result("résumé\n"), None);
    }

    #[test]
    fn legal_gate_outcomes() {
        let fx = Fixture::new("{}");
        assert_eq!(fx.check(&LegalGate).details, "legal-scan.md missing");

        fx.asset(LEGAL_SCAN_FILE, "Summary only\n");
        assert!(!fx.check(&LegalGate).satisfied);

        fx.asset(LEGAL_SCAN_FILE, "result: FAIL (2 findings)\n");
        assert!(!fx.check(&LegalGate).satisfied);

        fx.asset(LEGAL_SCAN_FILE, "* Result: Pass\n");
        assert!(fx.check(&LegalGate).satisfied);
    }
}
