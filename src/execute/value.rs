//! Row values and per-column decoding (§4.9 "normalizes rows through
//! per-column decoders").
//!
//! The `sqlx::Any` driver exposes only a handful of primitive Rust types;
//! everything else (dates, decimals, and the JSON blobs the serializer
//! builds for nested-list/aggregate selections) is decoded as text and
//! parsed against the column's [`Domain`].

use sqlx::any::AnyRow;
use sqlx::{Row, ValueRef};

use crate::domain::Domain;
use crate::error::{Error, Result};

/// A single decoded cell. Mirrors [`Domain`]'s scalar/structured split;
/// `Record`/`List` cells arrive as JSON from the dialect's nested-select
/// machinery and are re-parsed into nested `Value`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Decimal(String),
    Text(String),
    Date(String),
    Time(String),
    DateTime(String),
    List(Vec<Value>),
    Record(Vec<(String, Value)>),
}

pub type RowValues = Vec<Value>;

pub fn decode_row(row: &AnyRow, columns: &[Domain]) -> Result<RowValues> {
    columns
        .iter()
        .enumerate()
        .map(|(index, domain)| decode_cell(row, index, domain))
        .collect()
}

fn decode_cell(row: &AnyRow, index: usize, domain: &Domain) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| Error::engine(format!("failed to read column {index}: {e}")))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match domain {
        Domain::Boolean => Ok(Value::Boolean(decode_bool(row, index)?)),
        Domain::Integer => Ok(Value::Integer(decode_integer(row, index)?)),
        Domain::Float => Ok(Value::Float(decode_float(row, index)?)),
        Domain::Decimal => Ok(Value::Decimal(decode_text(row, index)?)),
        Domain::Text | Domain::Enum { .. } | Domain::Identity { .. } => {
            Ok(Value::Text(decode_text(row, index)?))
        }
        Domain::Date => Ok(Value::Date(decode_text(row, index)?)),
        Domain::Time => Ok(Value::Time(decode_text(row, index)?)),
        Domain::DateTime => Ok(Value::DateTime(decode_text(row, index)?)),
        Domain::List { item } => decode_json_list(row, index, item),
        Domain::Record { fields } => decode_json_record(row, index, fields),
        Domain::Void | Domain::Untyped => Ok(Value::Null),
    }
}

fn decode_bool(row: &AnyRow, index: usize) -> Result<bool> {
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(v != 0);
    }
    row.try_get::<i32, _>(index)
        .map(|v| v != 0)
        .map_err(|e| Error::engine(format!("failed to decode boolean column {index}: {e}")))
}

fn decode_integer(row: &AnyRow, index: usize) -> Result<i64> {
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(v);
    }
    row.try_get::<i32, _>(index)
        .map(i64::from)
        .map_err(|e| Error::engine(format!("failed to decode integer column {index}: {e}")))
}

fn decode_float(row: &AnyRow, index: usize) -> Result<f64> {
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(v);
    }
    row.try_get::<f32, _>(index)
        .map(f64::from)
        .map_err(|e| Error::engine(format!("failed to decode float column {index}: {e}")))
}

fn decode_text(row: &AnyRow, index: usize) -> Result<String> {
    row.try_get::<String, _>(index)
        .map_err(|e| Error::engine(format!("failed to decode text column {index}: {e}")))
}

fn decode_json_list(row: &AnyRow, index: usize, item: &Domain) -> Result<Value> {
    let text = decode_text(row, index)?;
    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Error::engine(format!("malformed nested-list JSON in column {index}: {e}")))?;
    let items = parsed
        .as_array()
        .ok_or_else(|| Error::engine(format!("expected a JSON array in column {index}")))?;
    let decoded = items
        .iter()
        .map(|element| json_to_value(element, item))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::List(decoded))
}

fn decode_json_record(row: &AnyRow, index: usize, fields: &[crate::domain::RecordField]) -> Result<Value> {
    let text = decode_text(row, index)?;
    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Error::engine(format!("malformed record JSON in column {index}: {e}")))?;
    record_from_json(&parsed, fields)
}

fn json_to_value(json: &serde_json::Value, domain: &Domain) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    match domain {
        Domain::Record { fields } => record_from_json(json, fields),
        Domain::List { item } => {
            let items = json
                .as_array()
                .ok_or_else(|| Error::engine("expected a JSON array"))?;
            let decoded = items
                .iter()
                .map(|element| json_to_value(element, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(decoded))
        }
        Domain::Boolean => Ok(Value::Boolean(json.as_bool().unwrap_or_default())),
        Domain::Integer => Ok(Value::Integer(json.as_i64().unwrap_or_default())),
        Domain::Float | Domain::Decimal => Ok(Value::Float(json.as_f64().unwrap_or_default())),
        _ => Ok(Value::Text(json.as_str().map(str::to_string).unwrap_or_else(|| json.to_string()))),
    }
}

fn record_from_json(json: &serde_json::Value, fields: &[crate::domain::RecordField]) -> Result<Value> {
    let object = json
        .as_object()
        .ok_or_else(|| Error::engine("expected a JSON object"))?;
    let decoded = fields
        .iter()
        .map(|field| {
            let value = object.get(&field.name).unwrap_or(&serde_json::Value::Null);
            json_to_value(value, &field.domain).map(|v| (field.name.clone(), v))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Record(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_value_decodes_a_flat_record() {
        let json: serde_json::Value = serde_json::from_str(r#"{"code":"CS","name":"Computer Science"}"#).unwrap();
        let fields = vec![
            crate::domain::RecordField { name: "code".to_string(), domain: Domain::Untyped },
            crate::domain::RecordField { name: "name".to_string(), domain: Domain::Untyped },
        ];
        let value = record_from_json(&json, &fields).unwrap();
        match value {
            Value::Record(pairs) => {
                assert_eq!(pairs[0], ("code".to_string(), Value::Text("CS".to_string())));
                assert_eq!(pairs[1], ("name".to_string(), Value::Text("Computer Science".to_string())));
            }
            other => panic!("expected a Record, got {other:?}"),
        }
    }

    #[test]
    fn json_to_value_treats_json_null_as_value_null() {
        assert_eq!(json_to_value(&serde_json::Value::Null, &Domain::Text).unwrap(), Value::Null);
    }
}
