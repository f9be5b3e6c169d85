//! Query result types for health-ask.
//!
//! Rows leave the executor as JSON-safe scalars only. Arbitrary-precision
//! decimals are converted to `f64` on the way out, which is lossy for values
//! beyond `f64` precision; that trade-off is acceptable for this dataset.

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Represents the result of executing a SQL query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in select-list order.
    pub columns: Vec<String>,

    /// Rows of data.
    pub rows: Vec<ResultRow>,

    /// Time taken to execute the query.
    pub execution_time: Duration,

    /// Rows read from the server. Reading stops one row past the cap, so
    /// when the result is truncated this is `max_rows + 1`, not the full count.
    pub total_rows: usize,

    /// Whether the result was truncated to the configured row cap.
    pub was_truncated: bool,
}

impl ResultSet {
    /// Creates a new empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result set with the given columns and rows.
    pub fn with_rows(columns: Vec<String>, rows: Vec<ResultRow>) -> Self {
        let total_rows = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            total_rows,
            was_truncated: false,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Serializes as a bare JSON array of row objects.
impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

/// An ordered mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    fields: Vec<(String, Value)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping select-list order.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Returns the value of the first field named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),
}

impl Value {
    /// Attempts to convert the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

/// Serializes as a plain JSON scalar. Non-finite floats become `null`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// Converts an arbitrary-precision decimal to floating point.
///
/// Digits beyond `f64` precision are rounded away. Magnitudes outside the
/// `f64` range serialize as NULL rather than failing the row.
pub fn decimal_to_value(decimal: &BigDecimal) -> Value {
    decimal.to_f64().map(Value::Float).unwrap_or(Value::Null)
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        decimal_to_value(&v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_decimal_round_trip_to_float() {
        let decimal = BigDecimal::from_str("12.50").unwrap();
        assert_eq!(decimal_to_value(&decimal), Value::Float(12.5));
        assert_eq!(Value::from(BigDecimal::from_str("-0.001").unwrap()), Value::Float(-0.001));
        assert_eq!(Value::from(BigDecimal::from(42)), Value::Float(42.0));
    }

    #[test]
    fn test_decimal_beyond_fixed_precision_range() {
        fn as_float(value: Value) -> f64 {
            match value {
                Value::Float(f) => f,
                other => panic!("expected a float, got {other:?}"),
            }
        }

        let big = as_float(decimal_to_value(&BigDecimal::from_str("1e30").unwrap()));
        assert!((big / 1e30 - 1.0).abs() < 1e-12);

        let fine = BigDecimal::from_str("1.0000000000000000000000000000001").unwrap();
        assert!((as_float(decimal_to_value(&fine)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_display_string(), "NULL");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Int(42).to_display_string(), "42");
        assert_eq!(Value::Float(2.71).to_display_string(), "2.71");
        assert_eq!(Value::from("hello").to_display_string(), "hello");
    }

    #[test]
    fn test_value_from_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42i64), Value::Int(42));
        assert_eq!(Value::from(2.71f64), Value::Float(2.71));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(42i32)), Value::Int(42));
    }

    #[test]
    fn test_value_serializes_as_scalar() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Bool(false),
            Value::Int(7),
            Value::Float(12.5),
            Value::from("x"),
            Value::Float(f64::NAN),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,false,7,12.5,"x",null]"#);
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let row = ResultRow::new()
            .with("Sex", 1)
            .with("BMI", 23.5)
            .with("Age", Value::Null);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Sex":1,"BMI":23.5,"Age":null}"#);
        assert_eq!(row.get("BMI"), Some(&Value::Float(23.5)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_result_set_serializes_as_rows() {
        let set = ResultSet::with_rows(
            vec!["n".to_string()],
            vec![ResultRow::new().with("n", 1), ResultRow::new().with("n", 2)],
        );
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"[{"n":1},{"n":2}]"#);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_rows, 2);
        assert!(!set.is_empty());
        assert!(ResultSet::new().is_empty());
    }

    #[test]
    fn test_result_set_with_execution_time() {
        let set = ResultSet::new().with_execution_time(Duration::from_millis(100));
        assert_eq!(set.execution_time, Duration::from_millis(100));
    }
}
