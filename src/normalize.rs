//! Normalization of NetBox results
//!
//! Pruning of semantically-empty values and aggregation of extracted
//! records into per-field value lists.

use serde_json::{Map, Value};

/// One flat record per matched NetBox object
pub type ExtractedRecord = Map<String, Value>;

/// One list per field name, in first-seen field order
pub type AggregatedResult = Map<String, Value>;

/// Recursively drop null, empty and "Unspecified" values from lists and maps
pub fn crush(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(crush)
                .filter(|v| !is_blank(v))
                .collect(),
        ),
        Value::Object(map) => Value::Object(crush_map(map)),
        scalar => scalar,
    }
}

fn crush_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k, crush(v)))
        .filter(|(_, v)| !is_blank(v))
        .collect()
}

/// Exact-case match on the "Unspecified" spellings only
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty() || s == "Unspecified" || s == "unspecified",
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Crush each record, dropping records left empty
pub fn crush_records(records: Vec<ExtractedRecord>) -> Vec<ExtractedRecord> {
    records
        .into_iter()
        .map(crush_map)
        .filter(|r| !r.is_empty())
        .collect()
}

/// Remove structurally identical records, keeping first-seen order
pub fn dedup_records(records: Vec<ExtractedRecord>) -> Vec<ExtractedRecord> {
    let mut unique: Vec<ExtractedRecord> = Vec::with_capacity(records.len());
    for record in records {
        if !unique.contains(&record) {
            unique.push(record);
        }
    }
    unique
}

/// Aggregate unique records into one list per field.
///
/// Lists are not padded: a record without a field contributes nothing to
/// that field's list, so lists of different fields need not line up.
pub fn collect_values(records: Vec<ExtractedRecord>) -> AggregatedResult {
    let mut result = AggregatedResult::new();
    for record in dedup_records(records) {
        for (field, value) in record {
            if let Value::Array(values) = result
                .entry(field)
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                values.push(value);
            }
        }
    }
    result
}

/// `name` when present and non-null, else `display`
///
/// A `name` that is present but explicitly null falls through to
/// `display` rather than being returned as null. Results are crushed
/// afterwards, so a null name would be pruned from the output anyway.
pub fn name_or_display(obj: &Value) -> Option<&Value> {
    let obj = obj.as_object()?;
    obj.get("name")
        .filter(|v| !v.is_null())
        .or_else(|| obj.get("display"))
        .filter(|v| !v.is_null())
}
