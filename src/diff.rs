//! Snapshot diffing for Watch mode.
//!
//! Compares successive resource snapshots and emits typed changes. The
//! engine retains only the previous snapshot; change lists are ephemeral,
//! consumed immediately by the printer.

use std::collections::HashMap;

use serde_json::Value;

/// Resource fields tried, in order, as the diff identity key.
const IDENTITY_KEYS: &[&str] = &["id", "_id", "name"];

/// The type of change observed for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Prefix used when rendering changes (`+`, `~`, `-`).
    pub fn prefix(&self) -> char {
        match self {
            ChangeKind::Added => '+',
            ChangeKind::Modified => '~',
            ChangeKind::Deleted => '-',
        }
    }
}

/// One modified field with its old and new values.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// A single observed change, produced per poll cycle and never retained.
#[derive(Debug, Clone)]
pub struct Change {
    pub kind: ChangeKind,
    /// Snapshot of the resource (the new state, or the old state for
    /// deletions).
    pub resource: Value,
    /// Per-field old/new metadata; populated for Modified only.
    pub fields: Vec<FieldChange>,
}

/// Compares successive snapshots of a resource list.
///
/// The first snapshot seeds the engine and produces no changes; subsequent
/// snapshots yield Added/Modified/Deleted entries keyed by resource
/// identity.
#[derive(Debug, Default)]
pub struct DiffEngine {
    previous: Option<Vec<Value>>,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the engine has seen its first snapshot yet.
    pub fn is_seeded(&self) -> bool {
        self.previous.is_some()
    }

    /// Diff the new snapshot against the previous one.
    ///
    /// The first call seeds the engine and returns an empty list - the
    /// initial state is never reported as Added.
    pub fn diff(&mut self, records: &[Value]) -> Vec<Change> {
        let Some(previous) = self.previous.replace(records.to_vec()) else {
            return Vec::new();
        };

        let prev_by_key: HashMap<String, &Value> =
            previous.iter().map(|r| (resource_key(r), r)).collect();
        let new_keys: HashMap<String, ()> =
            records.iter().map(|r| (resource_key(r), ())).collect();

        let mut changes = Vec::new();

        for record in records {
            let key = resource_key(record);
            match prev_by_key.get(&key) {
                None => changes.push(Change {
                    kind: ChangeKind::Added,
                    resource: record.clone(),
                    fields: Vec::new(),
                }),
                Some(old) if *old != record => changes.push(Change {
                    kind: ChangeKind::Modified,
                    resource: record.clone(),
                    fields: field_changes(old, record),
                }),
                Some(_) => {}
            }
        }

        for record in &previous {
            if !new_keys.contains_key(&resource_key(record)) {
                changes.push(Change {
                    kind: ChangeKind::Deleted,
                    resource: record.clone(),
                    fields: Vec::new(),
                });
            }
        }

        changes
    }
}

/// Identity key for a resource: first of the identity fields present,
/// else the serialized resource itself.
fn resource_key(resource: &Value) -> String {
    if let Value::Object(map) = resource {
        for key in IDENTITY_KEYS {
            if let Some(v) = map.get(*key) {
                return format!("{}={}", key, v);
            }
        }
    }
    resource.to_string()
}

/// Per-field differences between two object snapshots of the same resource.
fn field_changes(old: &Value, new: &Value) -> Vec<FieldChange> {
    let (Value::Object(old_map), Value::Object(new_map)) = (old, new) else {
        return vec![FieldChange {
            field: String::new(),
            old: old.clone(),
            new: new.clone(),
        }];
    };

    let mut changes = Vec::new();
    for (field, new_value) in new_map {
        let old_value = old_map.get(field).unwrap_or(&Value::Null);
        if old_value != new_value {
            changes.push(FieldChange {
                field: field.clone(),
                old: old_value.clone(),
                new: new_value.clone(),
            });
        }
    }
    for (field, old_value) in old_map {
        if !new_map.contains_key(field) {
            changes.push(FieldChange {
                field: field.clone(),
                old: old_value.clone(),
                new: Value::Null,
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_snapshot_seeds_without_changes() {
        let mut engine = DiffEngine::new();
        assert!(!engine.is_seeded());

        let changes = engine.diff(&[json!({"id": 1, "status": "ok"})]);
        assert!(changes.is_empty());
        assert!(engine.is_seeded());
    }

    #[test]
    fn test_added_resource() {
        let mut engine = DiffEngine::new();
        engine.diff(&[json!({"id": 1, "status": "ok"})]);

        let changes = engine.diff(&[
            json!({"id": 1, "status": "ok"}),
            json!({"id": 2, "status": "new"}),
        ]);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[0].resource["id"], json!(2));
    }

    #[test]
    fn test_modified_resource_reports_fields() {
        let mut engine = DiffEngine::new();
        engine.diff(&[json!({"id": 1, "status": "ok", "count": 3})]);

        let changes = engine.diff(&[json!({"id": 1, "status": "degraded", "count": 3})]);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(changes[0].fields.len(), 1);
        assert_eq!(changes[0].fields[0].field, "status");
        assert_eq!(changes[0].fields[0].old, json!("ok"));
        assert_eq!(changes[0].fields[0].new, json!("degraded"));
    }

    #[test]
    fn test_deleted_resource() {
        let mut engine = DiffEngine::new();
        engine.diff(&[json!({"id": 1}), json!({"id": 2})]);

        let changes = engine.diff(&[json!({"id": 1})]);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Deleted);
        assert_eq!(changes[0].resource["id"], json!(2));
    }

    #[test]
    fn test_unchanged_snapshot_yields_nothing() {
        let mut engine = DiffEngine::new();
        let snapshot = [json!({"id": 1, "status": "ok"})];
        engine.diff(&snapshot);
        assert!(engine.diff(&snapshot).is_empty());
    }

    #[test]
    fn test_identity_falls_back_to_name_then_value() {
        let mut engine = DiffEngine::new();
        engine.diff(&[json!({"name": "alpha"}), json!("bare")]);

        let changes = engine.diff(&[json!({"name": "alpha"}), json!("bare"), json!("other")]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Added);
    }

    #[test]
    fn test_removed_field_reported_with_null_new_value() {
        let mut engine = DiffEngine::new();
        engine.diff(&[json!({"id": 1, "note": "x"})]);

        let changes = engine.diff(&[json!({"id": 1})]);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(changes[0].fields[0].field, "note");
        assert_eq!(changes[0].fields[0].new, Value::Null);
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(ChangeKind::Added.prefix(), '+');
        assert_eq!(ChangeKind::Modified.prefix(), '~');
        assert_eq!(ChangeKind::Deleted.prefix(), '-');
    }
}
