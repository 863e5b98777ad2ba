//! Records flowing through the enrichment pipeline
//!
//! The pipeline owns its records; the engine only needs to read the lookup
//! key and write the result, addressed by [`FieldPath`].

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// A nested field reference: `[a][b]`, `a.b` or `a`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(reference: &str) -> Result<Self, ConfigError> {
        let reference = reference.trim();
        let segments: Vec<String> = if reference.starts_with('[') {
            let inner = reference
                .strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .ok_or_else(|| ConfigError::InvalidFieldPath(reference.to_string()))?;
            inner.split("][").map(str::to_string).collect()
        } else {
            reference.split('.').map(str::to_string).collect()
        };

        if segments.iter().any(|s| s.is_empty() || s.contains(['[', ']'])) {
            return Err(ConfigError::InvalidFieldPath(reference.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            write!(f, "[{}]", segment)?;
        }
        Ok(())
    }
}

/// Field access the engine needs from a pipeline record
pub trait Record {
    fn get_field(&self, path: &FieldPath) -> Option<&Value>;

    fn set_field(&mut self, path: &FieldPath, value: Value);
}

impl Record for Value {
    fn get_field(&self, path: &FieldPath) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(self, |current, segment| current.get(segment.as_str()))
    }

    fn set_field(&mut self, path: &FieldPath, value: Value) {
        if path.segments().is_empty() {
            return;
        }
        insert_at(self, path.segments(), value);
    }
}

/// Write `value` below `target`, replacing non-object intermediates with
/// empty objects
fn insert_at(target: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Some(map) = target.as_object_mut() {
        let slot = map.entry(first.clone()).or_insert(Value::Null);
        insert_at(slot, rest, value);
    }
}

/// The lookup key held at `path`: only a non-empty string qualifies
pub fn lookup_key<'a>(record: &'a impl Record, path: &FieldPath) -> Option<&'a str> {
    record
        .get_field(path)
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
}
