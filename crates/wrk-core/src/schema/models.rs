//! Typed views of the canonical state files.
//!
//! Each model keeps keys its schema does not name in `extra`, so loading and
//! re-serializing a ledger never drops extension fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use super::{CanonicalModel, Schema, builtin};
use crate::dates::parse_timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectState {
    pub last_run: String,
    pub last_status: String,
    pub repositories: String,
    #[serde(default)]
    pub patterns_found: Option<u64>,
    #[serde(default)]
    pub learnings_extracted: Option<u64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl ReflectState {
    #[must_use]
    pub fn last_run_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.last_run)
    }

    /// Repository names from the comma-separated `repositories` field.
    #[must_use]
    pub fn repository_names(&self) -> Vec<&str> {
        self.repositories
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

impl CanonicalModel for ReflectState {
    const SCHEMA: &'static Schema = &builtin::REFLECT_STATE;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    pub id: String,
    pub text: String,
    pub confidence: f64,
    pub source: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learnings {
    #[serde(default)]
    pub last_updated: Option<String>,
    pub learnings: Vec<Learning>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl CanonicalModel for Learnings {
    const SCHEMA: &'static Schema = &builtin::LEARNINGS;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub last_id: u64,
    #[serde(default)]
    pub total_created: Option<u64>,
    #[serde(default)]
    pub total_completed: Option<u64>,
    #[serde(default)]
    pub total_archived: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl CanonicalModel for QueueState {
    const SCHEMA: &'static Schema = &builtin::QUEUE_STATE;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub category: String,
    pub text: String,
    pub score: f64,
    #[serde(default)]
    pub occurrences: Option<u64>,
    pub repositories: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInsights {
    #[serde(default)]
    pub last_analyzed: Option<String>,
    #[serde(default)]
    pub sessions_analyzed: Option<u64>,
    pub insights: Vec<Insight>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl CanonicalModel for UserInsights {
    const SCHEMA: &'static Schema = &builtin::USER_INSIGHTS;
}
