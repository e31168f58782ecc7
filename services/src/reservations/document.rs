//! The persisted reservation document and its in-memory mutations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record key holding the reservation date.
pub const DATE_KEY: &str = "data";
/// Record key holding the recurrence-group identifier.
pub const RECURRENCE_KEY: &str = "idRepeticao";

/// A single booking entry. The contents belong to the client.
pub type ReservationRecord = Map<String, Value>;

/// The whole persisted document: `{"reservations": [ ... ]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationDocument {
    #[serde(alias = "reservas")]
    pub reservations: Vec<ReservationRecord>,
    /// Top-level keys other than `reservations`, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReservationDocument {
    pub fn new(reservations: Vec<ReservationRecord>) -> Self {
        Self {
            reservations,
            extra: Map::new(),
        }
    }

    /// Parses a stored document, substituting the empty document for
    /// anything that is not a mapping with a `reservations` sequence of records.
    pub fn from_slice_or_default(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Stored reservation document is malformed, using an empty one"
                );
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Appends the payload's records in order and returns how many were added.
    pub fn add_records(&mut self, payload: RecordPayload) -> usize {
        match payload {
            RecordPayload::One(record) => {
                self.reservations.push(record);
                1
            }
            RecordPayload::Many(records) => {
                let added = records.len();
                self.reservations.extend(records);
                added
            }
        }
    }

    /// Removes every record whose `data` or `idRepeticao` equals `identifier`
    /// and returns how many were removed.
    pub fn delete_by_identifier(&mut self, identifier: &Value) -> usize {
        let before = self.reservations.len();
        self.reservations.retain(|record| {
            record.get(DATE_KEY) != Some(identifier)
                && record.get(RECURRENCE_KEY) != Some(identifier)
        });
        before - self.reservations.len()
    }
}

/// Records sent by a client: a single object or a list of objects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecordPayload {
    One(ReservationRecord),
    Many(Vec<ReservationRecord>),
}

impl RecordPayload {
    /// Parses a request body. Returns `None` for invalid JSON, for JSON that is
    /// not an object or a list of objects, and for an empty object or list.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let payload: Self = serde_json::from_slice(bytes).ok()?;
        let empty = match &payload {
            Self::One(record) => record.is_empty(),
            Self::Many(records) => records.is_empty(),
        };
        (!empty).then_some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ReservationRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn sample() -> ReservationDocument {
        ReservationDocument::new(vec![
            record(json!({"data": "2024-01-01", "idRepeticao": null, "sala": "A"})),
            record(json!({"data": "2024-01-02", "idRepeticao": "g1", "sala": "B"})),
        ])
    }

    #[test]
    fn add_single_record_appends_at_end() {
        let mut document = sample();
        let new = record(json!({"data": "2024-03-01", "idRepeticao": null}));

        let added = document.add_records(RecordPayload::One(new.clone()));

        assert_eq!(added, 1);
        assert_eq!(document.len(), 3);
        assert_eq!(document.reservations.last(), Some(&new));
    }

    #[test]
    fn add_list_extends_in_order() {
        let mut document = sample();
        let batch = vec![
            record(json!({"data": "2024-04-01", "idRepeticao": "g2"})),
            record(json!({"data": "2024-04-08", "idRepeticao": "g2"})),
            record(json!({"data": "2024-04-15", "idRepeticao": "g2"})),
        ];

        let added = document.add_records(RecordPayload::Many(batch.clone()));

        assert_eq!(added, 3);
        assert_eq!(document.len(), 5);
        assert_eq!(&document.reservations[2..], batch.as_slice());
    }

    #[test]
    fn add_does_not_deduplicate() {
        let mut document = ReservationDocument::default();
        let same = record(json!({"data": "2024-01-01"}));
        document.add_records(RecordPayload::One(same.clone()));
        document.add_records(RecordPayload::One(same));
        assert_eq!(document.len(), 2);
    }

    #[test]
    fn delete_matches_recurrence_group() {
        let mut document = sample();
        let removed = document.delete_by_identifier(&json!("g1"));

        assert_eq!(removed, 1);
        assert_eq!(document.len(), 1);
        assert_eq!(document.reservations[0]["data"], json!("2024-01-01"));
    }

    #[test]
    fn delete_matches_date() {
        let mut document = sample();
        let removed = document.delete_by_identifier(&json!("2024-01-01"));

        assert_eq!(removed, 1);
        assert_eq!(document.reservations[0]["idRepeticao"], json!("g1"));
    }

    #[test]
    fn delete_removes_every_member_of_a_group() {
        let mut document = sample();
        document.add_records(RecordPayload::Many(vec![
            record(json!({"data": "2024-01-09", "idRepeticao": "g1"})),
            record(json!({"data": "2024-01-16", "idRepeticao": "g1"})),
        ]));

        assert_eq!(document.delete_by_identifier(&json!("g1")), 3);
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn delete_without_match_is_a_no_op() {
        let mut document = sample();
        let before = document.clone();

        assert_eq!(document.delete_by_identifier(&json!("2099-12-31")), 0);
        assert_eq!(document, before);
    }

    #[test]
    fn malformed_documents_heal_to_empty() {
        for raw in [
            &b""[..],
            b"not json",
            b"[]",
            b"{}",
            b"{\"reservations\": 3}",
            b"{\"reservations\": [1, 2]}",
            b"null",
        ] {
            assert_eq!(
                ReservationDocument::from_slice_or_default(raw),
                ReservationDocument::default(),
                "input {:?} should heal",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn legacy_key_is_read_and_rewritten() {
        let raw = br#"{"reservas": [{"data": "2024-01-01"}]}"#;
        let document = ReservationDocument::from_slice_or_default(raw);
        assert_eq!(document.len(), 1);

        let written = serde_json::to_value(&document).unwrap();
        assert_eq!(written, json!({"reservations": [{"data": "2024-01-01"}]}));
    }

    #[test]
    fn unknown_top_level_keys_survive() {
        let document = ReservationDocument::from_slice_or_default(
            br#"{"reservations": [], "updatedBy": "admin"}"#,
        );
        let written = serde_json::to_value(&document).unwrap();
        assert_eq!(written, json!({"reservations": [], "updatedBy": "admin"}));
    }

    #[test]
    fn payload_accepts_object_and_list() {
        assert!(matches!(
            RecordPayload::from_slice(br#"{"data": "2024-03-01", "idRepeticao": null}"#),
            Some(RecordPayload::One(_))
        ));
        assert!(matches!(
            RecordPayload::from_slice(br#"[{"data": "2024-03-01"}, {"data": "2024-03-08"}]"#),
            Some(RecordPayload::Many(records)) if records.len() == 2
        ));
    }

    #[test]
    fn payload_rejects_empty_and_non_records() {
        for raw in [
            &b""[..],
            b"not json",
            b"\"not json\"",
            b"{}",
            b"[]",
            b"null",
            b"42",
            b"[1, 2]",
        ] {
            assert!(
                RecordPayload::from_slice(raw).is_none(),
                "input {:?} should be rejected",
                String::from_utf8_lossy(raw)
            );
        }
    }
}
