//! Writing lookup results into records

use serde_json::Value;

use crate::normalize::AggregatedResult;
use crate::record::{FieldPath, Record};

pub struct ResultPublisher {
    target: FieldPath,
    url_base: String,
}

impl ResultPublisher {
    pub fn new(target: FieldPath, url_base: impl Into<String>) -> Self {
        Self {
            target,
            url_base: url_base.into(),
        }
    }

    /// Write `result` to the target field with its URLs made relative.
    ///
    /// Empty or missing results leave the record untouched. Returns whether
    /// the record was written.
    pub fn publish(&self, result: Option<&AggregatedResult>, record: &mut impl Record) -> bool {
        let Some(result) = result.filter(|r| !r.is_empty()) else {
            return false;
        };

        let mut published = result.clone();
        if let Some(Value::Array(urls)) = published.get_mut("url") {
            for url in urls.iter_mut() {
                if let Some(relative) = url.as_str().and_then(|u| u.strip_prefix(&self.url_base)) {
                    *url = Value::String(relative.to_string());
                }
            }
        }

        record.set_field(&self.target, Value::Object(published));
        true
    }
}
