//! On-disk document representation for the file backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DocumentBody, DocumentMeta, StoredDocument};

/// A document file: the caller's body plus store metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_cas")]
    pub cas: u64,

    #[serde(rename = "_created_at")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "_modified_at")]
    pub modified_at: DateTime<Utc>,

    /// The caller's document
    pub value: DocumentBody,
}

impl Document {
    pub fn new(id: &str, value: DocumentBody) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            cas: next_cas(0),
            created_at: now,
            modified_at: now,
            value,
        }
    }

    /// Replace the body, keeping creation time
    pub fn replace(&mut self, value: DocumentBody) {
        self.value = value;
        self.modified_at = Utc::now();
        self.cas = next_cas(self.cas);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            cas: self.cas,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

impl From<Document> for StoredDocument {
    fn from(doc: Document) -> Self {
        let meta = doc.meta();
        StoredDocument {
            id: doc.id,
            body: doc.value,
            meta,
        }
    }
}

/// Wall-clock nanos, forced strictly above `previous`
fn next_cas(previous: u64) -> u64 {
    let now = Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n.max(0) as u64)
        .unwrap_or(0);
    now.max(previous.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> DocumentBody {
        match v {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_replace_bumps_cas() {
        let mut doc = Document::new("u1", body(json!({"name": "test", "value": 42})));
        assert_eq!(doc.get("name"), Some(&json!("test")));

        let before = doc.cas;
        let created = doc.created_at;
        doc.replace(body(json!({"name": "changed"})));
        assert!(doc.cas > before);
        assert_eq!(doc.created_at, created);
        assert_eq!(doc.get("value"), None);
    }

    #[test]
    fn test_body_keys_do_not_clash_with_metadata() {
        let doc = Document::new("u1", body(json!({"_id": "spoof", "_cas": 1})));
        let text = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(back.id, "u1");
        assert_eq!(back.get("_id"), Some(&json!("spoof")));
    }
}
