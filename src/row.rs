// row.rs - Dynamically typed result rows
//
// A `Row` is an ordered mapping from column name to `Value`, decoded from
// whatever the query returned. Tests build expected rows with the `row!`
// macro and compare them structurally, so a query's shape does not need a
// dedicated struct.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// A single column value
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(Decimal),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    /// Equality that lets floats differ by a relative `tolerance`
    ///
    /// Every other variant compares exactly, and an `Int` never equals a
    /// `Float` even when the numbers coincide.
    pub fn approx_eq(&self, other: &Value, tolerance: f64) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => {
                if a == b {
                    return true;
                }
                let scale = a.abs().max(b.abs());
                (a - b).abs() <= tolerance * scale
            }
            _ => self == other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
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

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Numeric(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One result row, columns kept in query order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; a repeated name replaces the earlier value in place
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Decode a driver row, column by column
    pub fn from_pg_row(pg_row: &PgRow) -> Result<Self> {
        let mut row = Row::new();
        for column in pg_row.columns() {
            let value = decode_column(pg_row, column.ordinal(), column.name())?;
            row.columns.push((column.name().to_string(), value));
        }
        Ok(row)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn decode_column(row: &PgRow, index: usize, name: &str) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| Error::query(format!("reading column `{name}`"), e))?;
    let type_name = raw.type_info().name().to_string();
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let decoded = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool),
        "INT2" => row.try_get::<i16, _>(index).map(|v| Value::Int(i64::from(v))),
        "INT4" => row.try_get::<i32, _>(index).map(|v| Value::Int(i64::from(v))),
        "INT8" => row.try_get::<i64, _>(index).map(Value::Int),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Value::Float(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(index).map(Value::Float),
        "NUMERIC" => row.try_get::<Decimal, _>(index).map(Value::Numeric),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row.try_get::<String, _>(index).map(Value::Text),
        "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(index).map(Value::Json),
        _ => {
            return Err(Error::UnsupportedColumnType {
                column: name.to_string(),
                type_name,
            })
        }
    };

    decoded.map_err(|e| Error::query(format!("decoding column `{name}` as {type_name}"), e))
}

/// Build a `Row` literal: `row! { "id" => 1, "name" => "HQ" }`
#[macro_export]
macro_rules! row {
    () => {
        $crate::row::Row::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {
        $crate::row::Row::new()$(.with($column, $value))+
    };
}
