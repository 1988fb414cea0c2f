//! Query language for the file backend
//!
//! Queries are JSON documents, e.g.
//! `{"select": ["name"], "filters": [{"field": "age", "op": {"gte": 30}}], "limit": 10}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::document::Document;
use super::QueryRows;
use crate::engine::error::{Result, StoreError};

/// Filter operators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// String contains
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Field presence
    Exists(bool),
}

/// A single filter condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self { field: field.to_string(), op: FilterOp::Eq(value.into()) }
    }

    /// Check if a document matches this filter
    pub fn matches(&self, doc: &Document) -> bool {
        let id;
        let value = match self.field.as_str() {
            "_id" => {
                id = Value::String(doc.id.clone());
                Some(&id)
            }
            _ => doc.value.get(&self.field),
        };

        match (&self.op, value) {
            (FilterOp::Exists(should_exist), val) => val.is_some() == *should_exist,
            (_, None) => false,
            (FilterOp::Eq(expected), Some(actual)) => actual == expected,
            (FilterOp::Ne(expected), Some(actual)) => actual != expected,
            (FilterOp::Gt(expected), Some(actual)) => {
                compare_values(actual, expected) == Some(Ordering::Greater)
            }
            (FilterOp::Gte(expected), Some(actual)) => {
                matches!(compare_values(actual, expected), Some(Ordering::Greater | Ordering::Equal))
            }
            (FilterOp::Lt(expected), Some(actual)) => {
                compare_values(actual, expected) == Some(Ordering::Less)
            }
            (FilterOp::Lte(expected), Some(actual)) => {
                matches!(compare_values(actual, expected), Some(Ordering::Less | Ordering::Equal))
            }
            (FilterOp::Contains(substr), Some(Value::String(s))) => s.contains(substr.as_str()),
            (FilterOp::StartsWith(prefix), Some(Value::String(s))) => s.starts_with(prefix.as_str()),
            (FilterOp::EndsWith(suffix), Some(Value::String(s))) => s.ends_with(suffix.as_str()),
            (FilterOp::In(values), Some(actual)) => values.contains(actual),
            (FilterOp::NotIn(values), Some(actual)) => !values.contains(actual),
            _ => false,
        }
    }
}

/// Compare two JSON values of the same kind
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64()?;
            let b = b.as_f64()?;
            a.partial_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Query with filters, projection and paging
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Query {
    /// Fields to return; all fields plus `_id` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,

    /// All filters must match (AND)
    #[serde(default)]
    pub filters: Vec<Filter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    #[serde(default)]
    pub sort_desc: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default)]
    pub skip: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse query text
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| StoreError::Query(e.to_string()))
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn sort(mut self, field: &str, desc: bool) -> Self {
        self.sort_by = Some(field.to_string());
        self.sort_desc = desc;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Run against a document stream. Without `sort_by` documents are
    /// consumed lazily; sorting has to read them all first. A read error is
    /// yielded as a row and stops nothing by itself.
    pub fn execute<I>(self, docs: I) -> QueryRows
    where
        I: Iterator<Item = Result<Document>> + 'static,
    {
        let filters = self.filters;
        let matched = docs.filter(move |doc| match doc {
            Ok(doc) => filters.iter().all(|f| f.matches(doc)),
            Err(_) => true,
        });

        let ordered: Box<dyn Iterator<Item = Result<Document>>> = match self.sort_by {
            Some(field) => match matched.collect::<Result<Vec<Document>>>() {
                Ok(mut docs) => {
                    sort_documents(&mut docs, &field, self.sort_desc);
                    Box::new(docs.into_iter().map(Ok))
                }
                Err(e) => Box::new(std::iter::once(Err(e))),
            },
            None => Box::new(matched),
        };

        let select = self.select;
        let rows = ordered
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(move |doc| doc.map(|d| to_row(d, select.as_deref())));

        QueryRows::new(rows)
    }
}

fn sort_documents(docs: &mut [Document], field: &str, desc: bool) {
    docs.sort_by(|a, b| {
        let ordering = match (a.get(field), b.get(field)) {
            (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if desc { ordering.reverse() } else { ordering }
    });
}

/// Shape a matched document as a result row
fn to_row(doc: Document, select: Option<&[String]>) -> Value {
    let mut row = Map::new();
    match select {
        Some(fields) => {
            for field in fields {
                if field == "_id" {
                    row.insert(field.clone(), Value::String(doc.id.clone()));
                } else if let Some(value) = doc.value.get(field) {
                    row.insert(field.clone(), value.clone());
                }
            }
        }
        None => {
            row.insert("_id".to_string(), Value::String(doc.id));
            for (key, value) in doc.value {
                if key != "_id" {
                    row.insert(key, value);
                }
            }
        }
    }
    Value::Object(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, v: Value) -> Document {
        match v {
            Value::Object(map) => Document::new(id, map),
            _ => panic!("expected object"),
        }
    }

    fn people() -> Vec<Result<Document>> {
        vec![
            Ok(doc("a", json!({"name": "Alice", "age": 30}))),
            Ok(doc("b", json!({"name": "Bob", "age": 25}))),
            Ok(doc("c", json!({"name": "Charlie", "age": 35}))),
        ]
    }

    #[test]
    fn test_filter_eq() {
        let d = doc("a", json!({"name": "Alice", "age": 30}));

        assert!(Filter::eq("name", "Alice").matches(&d));
        assert!(!Filter::eq("name", "Bob").matches(&d));
        assert!(Filter::eq("age", 30).matches(&d));
        assert!(Filter::eq("_id", "a").matches(&d));
    }

    #[test]
    fn test_query_execution() {
        let rows: Vec<Value> = Query::new()
            .filter(Filter { field: "age".to_string(), op: FilterOp::Gte(json!(30)) })
            .sort("age", true)
            .execute(people().into_iter())
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("Charlie"));
        assert_eq!(rows[1]["_id"], json!("a"));
    }

    #[test]
    fn test_projection_and_paging() {
        let rows: Vec<Value> = Query::new()
            .select(&["_id", "name", "missing"])
            .sort("name", false)
            .skip(1)
            .limit(1)
            .execute(people().into_iter())
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows, vec![json!({"_id": "b", "name": "Bob"})]);
    }

    #[test]
    fn test_parse_query_text() {
        let q = Query::parse(r#"{"filters": [{"field": "name", "op": {"starts_with": "Ch"}}]}"#).unwrap();
        let rows: Vec<Value> = q.execute(people().into_iter()).collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 1);

        assert!(matches!(Query::parse("SELECT * FROM x"), Err(StoreError::Query(_))));
        assert!(matches!(Query::parse(r#"{"wher": []}"#), Err(StoreError::Query(_))));
    }

    #[test]
    fn test_read_error_surfaces() {
        let docs: Vec<Result<Document>> = vec![
            Ok(doc("a", json!({"x": 1}))),
            Err(StoreError::Query("broken".into())),
        ];
        let mut rows = Query::new().execute(docs.into_iter());
        assert!(rows.next().unwrap().is_ok());
        assert!(rows.next().unwrap().is_err());
    }
}
