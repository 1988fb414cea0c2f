//! Tabular results
//!
//! Pairs column names with row tuples and turns each row into an ordered
//! JSON record.

use serde_json::{Map, Value};

use super::adapter::{ResultSet, SqlValue};
use super::error::{Result, StoreError};

/// One converted row, keys in column order
pub type Record = Map<String, Value>;

/// Column names and rows from a single relational execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl TabularResult {
    /// Every row must have exactly one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(StoreError::Query(format!(
                "row {} has {} values but there are {} columns",
                index,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert every row into a record.
    ///
    /// `extra` is copied into each record before the columns, so a column
    /// with the same name wins. Date cells become epoch milliseconds at
    /// midnight UTC.
    pub fn to_records(&self, extra: Option<&Record>) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = extra.cloned().unwrap_or_default();
                for (column, value) in self.columns.iter().zip(row) {
                    record.insert(column.clone(), value.to_json());
                }
                record
            })
            .collect()
    }

    /// Records as a JSON array
    pub fn to_json(&self, extra: Option<&Record>) -> Value {
        Value::Array(self.to_records(extra).into_iter().map(Value::Object).collect())
    }
}

impl TryFrom<ResultSet> for TabularResult {
    type Error = StoreError;

    fn try_from(set: ResultSet) -> Result<Self> {
        Self::new(set.columns, set.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn employee_extra() -> Record {
        let mut extra = Record::new();
        extra.insert("documentType".into(), json!("employee"));
        extra
    }

    #[test]
    fn test_employee_example() {
        let hired = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let result = TabularResult::new(
            cols(&["id", "hired"]),
            vec![vec![SqlValue::Integer(1), SqlValue::from(hired)]],
        )
        .unwrap();

        let records = result.to_records(Some(&employee_extra()));
        assert_eq!(
            Value::Object(records[0].clone()),
            json!({"documentType": "employee", "id": 1, "hired": 1577836800000i64})
        );

        let keys: Vec<&str> = records[0].keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["documentType", "id", "hired"]);
    }

    #[test]
    fn test_column_overrides_extra() {
        let result = TabularResult::new(
            cols(&["documentType", "id"]),
            vec![vec![SqlValue::from("manager"), SqlValue::Integer(2)]],
        )
        .unwrap();

        let records = result.to_records(Some(&employee_extra()));
        assert_eq!(records[0]["documentType"], json!("manager"));
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn test_shape_matches_input() {
        let rows = vec![
            vec![SqlValue::Integer(1), SqlValue::from("a"), SqlValue::Null],
            vec![SqlValue::Integer(2), SqlValue::from("b"), SqlValue::Real(1.5)],
            vec![SqlValue::Integer(3), SqlValue::from("c"), SqlValue::from(false)],
        ];
        let result = TabularResult::new(cols(&["id", "name", "score"]), rows).unwrap();
        assert_eq!(result.row_count(), 3);

        let records = result.to_records(Some(&employee_extra()));
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.len(), 4);
            assert_eq!(record["documentType"], json!("employee"));
        }
        assert_eq!(records[0]["score"], Value::Null);
        assert_eq!(records[1]["score"], json!(1.5));
        assert_eq!(records[2]["score"], json!(false));
    }

    #[test]
    fn test_empty_inputs() {
        let no_rows = TabularResult::new(cols(&["id"]), vec![]).unwrap();
        assert!(no_rows.is_empty());
        assert!(no_rows.to_records(Some(&employee_extra())).is_empty());
        assert_eq!(no_rows.to_json(None), json!([]));

        let no_columns = TabularResult::new(vec![], vec![vec![], vec![]]).unwrap();
        let plain = no_columns.to_records(None);
        assert_eq!(plain.len(), 2);
        assert!(plain.iter().all(|r| r.is_empty()));

        let with_extra = no_columns.to_records(Some(&employee_extra()));
        assert!(with_extra.iter().all(|r| r == &employee_extra()));
    }

    #[test]
    fn test_extra_is_copied_per_row() {
        let result = TabularResult::new(
            cols(&["id"]),
            vec![vec![SqlValue::Integer(1)], vec![SqlValue::Integer(2)]],
        )
        .unwrap();

        let mut records = result.to_records(Some(&employee_extra()));
        records[0].insert("documentType".into(), json!("changed"));
        assert_eq!(records[1]["documentType"], json!("employee"));
    }

    #[test]
    fn test_non_date_values_untouched() {
        let at = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let result = TabularResult::new(
            cols(&["label", "at"]),
            vec![vec![SqlValue::from("2020-01-01"), SqlValue::from(at)]],
        )
        .unwrap();

        let records = result.to_records(None);
        assert_eq!(records[0]["label"], json!("2020-01-01"));
        assert_eq!(records[0]["at"], json!("2020-01-01T12:00:00"));
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let err = TabularResult::new(
            cols(&["a", "b"]),
            vec![vec![SqlValue::Integer(1), SqlValue::Integer(2)], vec![SqlValue::Integer(3)]],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Query(ref m) if m.contains("row 1")));
    }
}
