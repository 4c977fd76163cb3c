use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Prefix shared by every work item identifier.
pub const ID_PREFIX: &str = "WRK-";

/// Immutable work item identifier of the form `WRK-<integer>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItemId(u64);

impl WorkItemId {
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    #[must_use]
    pub const fn number(self) -> u64 {
        self.0
    }

    /// The identifier that follows this one, or `None` at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(number) => Some(Self(number)),
            None => None,
        }
    }

    /// File name of the item document (`WRK-12.md`).
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{self}.md")
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ID_PREFIX}{}", self.0)
    }
}

impl FromStr for WorkItemId {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix(ID_PREFIX)
            .or_else(|| trimmed.strip_prefix("wrk-"))
            .unwrap_or("");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseEnumError {
                expected: "work item id (WRK-<number>)",
                got: s.to_string(),
            });
        }
        digits.parse().map(Self).map_err(|_| ParseEnumError {
            expected: "work item id (WRK-<number>)",
            got: s.to_string(),
        })
    }
}

impl Serialize for WorkItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WorkItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The six canonical lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Working,
    Blocked,
    Done,
    Archived,
    Failed,
}

impl Status {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Working,
        Self::Blocked,
        Self::Done,
        Self::Archived,
        Self::Failed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Working => "working",
            Self::Blocked => "blocked",
            Self::Done => "done",
            Self::Archived => "archived",
            Self::Failed => "failed",
        }
    }
}

/// How a raw `status:` value relates to the canonical set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReading {
    /// Already one of the canonical values.
    Canonical(Status),
    /// A historical synonym, accepted only as migration input.
    Synonym(Status),
    /// Not a recognized status at all.
    Unknown,
}

impl StatusReading {
    /// Canonical status this reading maps to, if any.
    #[must_use]
    pub const fn status(self) -> Option<Status> {
        match self {
            Self::Canonical(status) | Self::Synonym(status) => Some(status),
            Self::Unknown => None,
        }
    }
}

/// Classify a raw status string, recognizing historical synonyms.
#[must_use]
pub fn read_status(raw: &str) -> StatusReading {
    let normalized = normalize(raw);
    if let Ok(status) = normalized.parse::<Status>() {
        return StatusReading::Canonical(status);
    }
    match normalized.as_str() {
        "complete" | "completed" | "closed" | "merged" => StatusReading::Synonym(Status::Done),
        _ => StatusReading::Unknown,
    }
}

/// Status directories under the queue root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Pending,
    Working,
    Blocked,
    Done,
    Archived,
}

impl Location {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Working,
        Self::Blocked,
        Self::Done,
        Self::Archived,
    ];

    /// Locations audited by the remediation scanner.
    pub const ACTIVE: [Self; 3] = [Self::Pending, Self::Working, Self::Blocked];

    /// Directory name under the queue root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Working => "working",
            Self::Blocked => "blocked",
            Self::Done => "done",
            Self::Archived => "archived",
        }
    }

    /// The single status a file in this directory must carry.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Pending => Status::Pending,
            Self::Working => Status::Working,
            Self::Blocked => Status::Blocked,
            Self::Done => Status::Done,
            Self::Archived => Status::Archived,
        }
    }

    /// Map a directory name back to its location.
    #[must_use]
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|loc| loc.dir_name() == name)
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "status",
                got: s.to_string(),
            })
    }
}

impl FromStr for Location {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::from_dir_name(normalized.trim_end_matches('/')).ok_or_else(|| ParseEnumError {
            expected: "location",
            got: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Location, Status, StatusReading, WorkItemId, read_status};
    use std::str::FromStr;

    #[test]
    fn work_item_id_parses_and_displays() {
        let id = WorkItemId::from_str("WRK-42").unwrap();
        assert_eq!(id.number(), 42);
        assert_eq!(id.to_string(), "WRK-42");
        assert_eq!(id.file_name(), "WRK-42.md");
        assert_eq!(id.next().map(|next| next.to_string()).as_deref(), Some("WRK-43"));
        assert_eq!(WorkItemId::new(u64::MAX).next(), None);
    }

    #[test]
    fn work_item_id_rejects_malformed_values() {
        for bad in ["WRK-", "WRK-abc", "42", "BN-1", "WRK--1", "WRK-1.2"] {
            assert!(WorkItemId::from_str(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn work_item_ids_order_numerically() {
        let mut ids: Vec<WorkItemId> = ["WRK-10", "WRK-9", "WRK-100"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["WRK-9", "WRK-10", "WRK-100"]);
    }

    #[test]
    fn status_display_parse_roundtrips() {
        for status in Status::ALL {
            assert_eq!(Status::from_str(&status.to_string()).unwrap(), status);
        }
        assert_eq!(Status::from_str(" Working ").unwrap(), Status::Working);
    }

    #[test]
    fn synonyms_map_to_done_but_are_not_canonical() {
        for synonym in ["complete", "completed", "closed", "merged", "Completed"] {
            assert_eq!(read_status(synonym), StatusReading::Synonym(Status::Done));
            assert!(Status::from_str(synonym).is_err());
        }
        assert_eq!(read_status("done"), StatusReading::Canonical(Status::Done));
        assert_eq!(read_status("in-flight"), StatusReading::Unknown);
    }

    #[test]
    fn every_location_maps_to_one_status() {
        for location in Location::ALL {
            assert_eq!(location.status().as_str(), location.dir_name());
            assert_eq!(Location::from_dir_name(location.dir_name()), Some(location));
        }
        assert_eq!(Location::from_str("done/").unwrap(), Location::Done);
        assert!(Location::from_dir_name("failed").is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Blocked).unwrap(), "\"blocked\"");
        assert_eq!(
            serde_json::to_string(&WorkItemId::new(5)).unwrap(),
            "\"WRK-5\""
        );
    }
}
