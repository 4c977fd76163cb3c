//! Schemas for the canonical workspace ledgers.

use super::{FieldKind, FieldSpec, Schema};

const UNIT_INTERVAL: FieldKind = FieldKind::Number {
    min: Some(0.0),
    max: Some(1.0),
};
const COUNT: FieldKind = FieldKind::Integer {
    min: Some(0),
    max: None,
};
const TEXT: FieldKind = FieldKind::Text { default: None };
const TEXT_OR_EMPTY: FieldKind = FieldKind::Text { default: Some("") };

/// Reflection run bookkeeping (`reflect-state.yaml`).
pub static REFLECT_STATE: Schema = Schema {
    name: "reflect-state",
    description: "last reflection run and what it extracted",
    fields: &[
        FieldSpec::required("last_run", FieldKind::Timestamp),
        FieldSpec::optional("last_status", FieldKind::Text { default: Some("unknown") }),
        FieldSpec::optional("repositories", TEXT_OR_EMPTY),
        FieldSpec::optional("patterns_found", COUNT),
        FieldSpec::optional("learnings_extracted", COUNT),
        FieldSpec::optional("score", UNIT_INTERVAL),
    ],
};

const LEARNING: &[FieldSpec] = &[
    FieldSpec::required("id", TEXT),
    FieldSpec::required("text", TEXT),
    FieldSpec::required("confidence", UNIT_INTERVAL),
    FieldSpec::optional("source", TEXT_OR_EMPTY),
    FieldSpec::optional("created_at", FieldKind::Timestamp),
    FieldSpec::optional("tags", FieldKind::TextList),
];

/// Accumulated learnings ledger (`learnings.yaml`).
pub static LEARNINGS: Schema = Schema {
    name: "learnings",
    description: "learnings extracted from completed work",
    fields: &[
        FieldSpec::optional("last_updated", FieldKind::Timestamp),
        FieldSpec::required("learnings", FieldKind::Records(LEARNING)),
    ],
};

/// Queue statistics (`state.yaml`).
pub static QUEUE_STATE: Schema = Schema {
    name: "state",
    description: "work queue id allocation and counters",
    fields: &[
        FieldSpec::required("last_id", COUNT),
        FieldSpec::optional("total_created", COUNT),
        FieldSpec::optional("total_completed", COUNT),
        FieldSpec::optional("total_archived", COUNT),
        FieldSpec::optional("last_updated", FieldKind::Timestamp),
    ],
};

const INSIGHT: &[FieldSpec] = &[
    FieldSpec::required("category", TEXT),
    FieldSpec::required("text", TEXT),
    FieldSpec::required("score", UNIT_INTERVAL),
    FieldSpec::optional(
        "occurrences",
        FieldKind::Integer {
            min: Some(1),
            max: None,
        },
    ),
    FieldSpec::optional("repositories", TEXT_OR_EMPTY),
];

/// Review insights distilled from sessions (`cc-user-insights.yaml`).
pub static USER_INSIGHTS: Schema = Schema {
    name: "cc-user-insights",
    description: "recurring review insights with confidence scores",
    fields: &[
        FieldSpec::optional("last_analyzed", FieldKind::Timestamp),
        FieldSpec::optional("sessions_analyzed", COUNT),
        FieldSpec::required("insights", FieldKind::Records(INSIGHT)),
    ],
};

/// Every built-in schema.
pub static ALL: [&Schema; 4] = [&REFLECT_STATE, &LEARNINGS, &QUEUE_STATE, &USER_INSIGHTS];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaErrorKind, validate_value};
    use serde_yaml::Value;

    fn check(schema: &Schema, text: &str) -> Vec<(String, SchemaErrorKind)> {
        let value: Value = serde_yaml::from_str(text).unwrap();
        validate_value(schema, &value)
            .1
            .into_iter()
            .map(|e| (e.path, e.kind))
            .collect()
    }

    #[test]
    fn negative_last_id_is_out_of_range() {
        assert_eq!(
            check(&QUEUE_STATE, "last_id: -1\n"),
            [("last_id".to_string(), SchemaErrorKind::OutOfRange)]
        );
        assert!(check(&QUEUE_STATE, "last_id: 0\n").is_empty());
    }

    #[test]
    fn nested_record_errors_carry_indexed_paths() {
        let text = "learnings:\n  - id: L1\n    text: ok\n    confidence: 0.9\n  - id: L2\n    confidence: 1.2\n";
        assert_eq!(
            check(&LEARNINGS, text),
            [
                ("learnings[1].text".to_string(), SchemaErrorKind::MissingField),
                ("learnings[1].confidence".to_string(), SchemaErrorKind::OutOfRange),
            ]
        );
    }

    #[test]
    fn insight_occurrences_must_be_positive() {
        let text = "insights:\n  - category: tests\n    text: t\n    score: .5\n    occurrences: 0\n";
        assert_eq!(
            check(&USER_INSIGHTS, text),
            [("insights[0].occurrences".to_string(), SchemaErrorKind::OutOfRange)]
        );
    }

    #[test]
    fn reflect_state_requires_parseable_last_run() {
        assert_eq!(
            check(&REFLECT_STATE, "last_run: soon\n"),
            [("last_run".to_string(), SchemaErrorKind::ParseError)]
        );
        assert!(check(&REFLECT_STATE, "last_run: 2026-05-01T10:00:00Z\nrepositories: ~\n").is_empty());
    }
}
