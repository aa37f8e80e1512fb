use crate::common::{Value, DATE_TAG};
use crate::document::{check_key, Document};
use crate::errors::{ErrorKind, NedbError, NedbResult};
use chrono::DateTime;
use serde_json::{Map, Number};

/// Serializes a document to one line of JSON.
///
/// Dates are written as `{"$$date": <milliseconds since epoch>}`. Every key is
/// validated on the way out, so a document carrying a field such as `$where`
/// or `a.b` cannot reach the datafile.
pub fn serialize_document(doc: &Document) -> NedbResult<String> {
    let json = document_to_json(doc)?;
    Ok(serde_json::to_string(&json)?)
}

pub fn serialize_value(value: &Value) -> NedbResult<String> {
    let json = to_json(value)?;
    Ok(serde_json::to_string(&json)?)
}

/// Parses one line of JSON into a document, turning `$$date` objects back into dates.
pub fn deserialize_document(line: &str) -> NedbResult<Document> {
    let json: serde_json::Value = serde_json::from_str(line)?;
    match from_json(json)? {
        Value::Document(doc) => Ok(doc),
        other => {
            log::error!("Expected a JSON object, found {}", other.type_name());
            Err(NedbError::new(
                &format!("Expected a JSON object, found {}", other.type_name()),
                ErrorKind::EncodingError,
            ))
        }
    }
}

fn document_to_json(doc: &Document) -> NedbResult<serde_json::Value> {
    let mut map = Map::with_capacity(doc.len());
    for (key, value) in doc.iter() {
        check_key(key, value)?;
        map.insert(key.clone(), to_json(value)?);
    }
    Ok(serde_json::Value::Object(map))
}

pub(crate) fn to_json(value: &Value) -> NedbResult<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::I64(n) => serde_json::Value::Number(Number::from(*n)),
        // non finite floats have no JSON form and become null
        Value::F64(n) => Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => {
            let mut map = Map::with_capacity(1);
            map.insert(
                DATE_TAG.to_string(),
                serde_json::Value::Number(Number::from(d.timestamp_millis())),
            );
            serde_json::Value::Object(map)
        }
        Value::Array(items) => serde_json::Value::Array(
            items.iter().map(to_json).collect::<NedbResult<Vec<_>>>()?,
        ),
        Value::Document(doc) => document_to_json(doc)?,
    })
}

pub(crate) fn from_json(json: serde_json::Value) -> NedbResult<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::I64(i),
            None => Value::F64(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_json)
                .collect::<NedbResult<Vec<_>>>()?,
        ),
        serde_json::Value::Object(map) => {
            if let Some(millis) = map.get(DATE_TAG).and_then(|v| v.as_f64()) {
                return date_from_millis(millis);
            }
            let mut doc = Document::new();
            for (key, value) in map {
                doc.put(key, from_json(value)?);
            }
            Value::Document(doc)
        }
    })
}

fn date_from_millis(millis: f64) -> NedbResult<Value> {
    match DateTime::from_timestamp_millis(millis as i64) {
        Some(date) => Ok(Value::Date(date)),
        None => {
            log::error!("Date {} is out of range", millis);
            Err(NedbError::new(
                &format!("Date {} is out of range", millis),
                ErrorKind::EncodingError,
            ))
        }
    }
}
