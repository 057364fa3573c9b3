//! Captured table rows.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::QualifiedName;

/// A single captured cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean / bit.
    Bool(bool),
    /// Any integer type.
    Int(i64),
    /// Approximate numeric.
    Float(f64),
    /// Exact numeric.
    Decimal(Decimal),
    /// Character data.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Timestamp without zone.
    Timestamp(NaiveDateTime),
    /// Timestamp with offset.
    TimestampTz(DateTime<FixedOffset>),
    /// UUID / uniqueidentifier.
    Uuid(uuid::Uuid),
    /// JSON document.
    Json(serde_json::Value),
}

impl Value {
    /// Check for NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check for binary data.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Rows captured for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Table the rows belong to.
    pub table: QualifiedName,
    /// Columns selected for scripting, in row order.
    pub columns: Vec<SmolStr>,
    /// Row values, one entry per selected column.
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    /// Create an empty row set.
    pub fn new(table: QualifiedName, columns: &[&str]) -> Self {
        Self {
            table,
            columns: columns.iter().map(|c| SmolStr::new(c)).collect(),
            rows: vec![],
        }
    }

    /// Append a row.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Position of a column in each row.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Whether any row carries binary data.
    pub fn has_binary(&self) -> bool {
        self.rows.iter().flatten().any(Value::is_binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_into_value() {
        let none: Option<i64> = None;
        assert!(Value::from(none).is_null());
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn test_value_serde_is_tagged() {
        let json = serde_json::to_string(&Value::Int(5)).unwrap();
        assert_eq!(json, r#"{"int":5}"#);
        let back: Value = serde_json::from_str(r#""null""#).unwrap();
        assert!(back.is_null());
    }

    #[test]
    fn test_has_binary() {
        let data = TableData::new(QualifiedName::new("dbo", "files"), &["id", "body"])
            .with_row(vec![Value::Int(1), Value::Bytes(vec![0xde, 0xad])]);
        assert!(data.has_binary());
        assert_eq!(data.position("body"), Some(1));
    }
}
