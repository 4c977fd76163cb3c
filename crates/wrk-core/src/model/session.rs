use serde::{Deserialize, Serialize};

/// Metadata key holding the session snapshot.
pub const SESSION_STATE_KEY: &str = "session_state";

/// Placeholder stored when a session is recorded without notes.
pub const DEFAULT_PROGRESS_NOTES: &str = "No progress notes recorded.";

/// Snapshot of what happened in the most recent session on an item.
///
/// Replaced wholesale on every record; it is not an append log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub last_updated: String,
    #[serde(default = "default_progress_notes")]
    pub progress_notes: String,
    #[serde(default)]
    pub modified_files: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub recent_commits: String,
}

impl SessionState {
    /// Build a normalized snapshot.
    ///
    /// Blank list entries are dropped, `modified_files` keeps the first
    /// occurrence of each path, and empty notes fall back to the placeholder.
    #[must_use]
    pub fn normalized(
        last_updated: impl Into<String>,
        progress_notes: &str,
        modified_files: &[String],
        next_steps: &[String],
        recent_commits: &str,
    ) -> Self {
        let notes = progress_notes.trim();
        let mut files: Vec<String> = Vec::with_capacity(modified_files.len());
        for path in non_blank(modified_files) {
            if !files.contains(&path) {
                files.push(path);
            }
        }

        Self {
            last_updated: last_updated.into(),
            progress_notes: if notes.is_empty() {
                DEFAULT_PROGRESS_NOTES.to_string()
            } else {
                notes.to_string()
            },
            modified_files: files,
            next_steps: non_blank(next_steps).collect(),
            recent_commits: recent_commits.trim_end().to_string(),
        }
    }
}

fn non_blank(entries: &[String]) -> impl Iterator<Item = String> + '_ {
    entries
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
}

fn default_progress_notes() -> String {
    DEFAULT_PROGRESS_NOTES.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn blank_notes_use_placeholder() {
        let state = SessionState::normalized("2026-01-01T00:00:00Z", "   \n", &[], &[], "");
        assert_eq!(state.progress_notes, DEFAULT_PROGRESS_NOTES);
    }

    #[test]
    fn lists_drop_blanks_and_files_dedupe() {
        let state = SessionState::normalized(
            "2026-01-01T00:00:00Z",
            "wired the parser",
            &strings(&["src/a.rs", "", "  ", "src/b.rs", "src/a.rs"]),
            &strings(&["", "write tests", " "]),
            "abc123 parser\n",
        );
        assert_eq!(state.modified_files, strings(&["src/a.rs", "src/b.rs"]));
        assert_eq!(state.next_steps, strings(&["write tests"]));
        assert_eq!(state.recent_commits, "abc123 parser");
    }

    #[test]
    fn missing_optional_keys_deserialize_with_defaults() {
        let state: SessionState =
            serde_yaml::from_str("last_updated: '2026-01-01T00:00:00Z'\n").unwrap();
        assert_eq!(state.progress_notes, DEFAULT_PROGRESS_NOTES);
        assert!(state.modified_files.is_empty());
    }
}
