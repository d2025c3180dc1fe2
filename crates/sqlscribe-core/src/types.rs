//! Value, row and result types returned by connections

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A database value decoded from a result column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Decimal/Numeric kept as text so no precision is lost
    Decimal(String),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64, widening the smaller integer variants
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Convert into a JSON value for handing result rows to the language model.
    ///
    /// Numbers stay numbers where JSON can carry them exactly. Temporal values,
    /// decimals and binary payloads become strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int16(v) => Json::from(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int64(v) => Json::from(*v),
            Value::Float32(v) => serde_json::Number::from_f64(*v as f64)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(v.to_string())),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(v.to_string())),
            Value::Json(v) => v.clone(),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            other => Json::String(other.to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Json(v) => write!(f, "{}", v),
            Value::Array(v) => {
                let items: Vec<String> = v.iter().map(|item| item.to_string()).collect();
                write!(f, "{{{}}}", items.join(","))
            }
        }
    }
}

/// Metadata for one column of a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Driver-reported type name (e.g. `int4`, `varchar`)
    pub data_type: String,
    pub ordinal: usize,
}

/// A row from a query result
#[derive(Debug, Clone)]
pub struct Row {
    pub values: Vec<Value>,
    columns: Vec<String>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Convert to a JSON object keyed by column name
    pub fn to_json_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

/// Query result
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in result order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
