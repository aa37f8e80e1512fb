use crate::common::{Value, DATE_TAG, DELETED_MARKER, INDEX_CREATED_MARKER, INDEX_REMOVED_MARKER};
use crate::document::Document;
use crate::errors::{ErrorKind, NedbError, NedbResult};

/// Validates a single field name.
///
/// Names may not contain `.` and may not start with `$`, except for the
/// markers the datafile itself uses: `$$date` holding a number, `$$deleted`
/// holding `true`, `$$indexCreated` and `$$indexRemoved`.
pub fn check_key(key: &str, value: &Value) -> NedbResult<()> {
    if key.starts_with('$') {
        let allowed = match key {
            DATE_TAG => value.is_number(),
            DELETED_MARKER => matches!(value, Value::Bool(true)),
            INDEX_CREATED_MARKER | INDEX_REMOVED_MARKER => true,
            _ => false,
        };
        if !allowed {
            log::error!("Field names cannot begin with the $ character: {}", key);
            return Err(NedbError::new(
                &format!("Field names cannot begin with the $ character: {}", key),
                ErrorKind::InvalidDocument,
            ));
        }
    }

    if key.contains('.') {
        log::error!("Field names cannot contain a .: {}", key);
        return Err(NedbError::new(
            &format!("Field names cannot contain a .: {}", key),
            ErrorKind::InvalidDocument,
        ));
    }
    Ok(())
}

/// Recursively validates every field name of a document, including documents
/// nested inside arrays.
pub fn check_object(doc: &Document) -> NedbResult<()> {
    for (key, value) in doc.iter() {
        check_key(key, value)?;
        check_value(value)?;
    }
    Ok(())
}

fn check_value(value: &Value) -> NedbResult<()> {
    match value {
        Value::Document(doc) => check_object(doc),
        Value::Array(items) => items.iter().try_for_each(check_value),
        _ => Ok(()),
    }
}

/// Deep copy that drops every key starting with `$` or containing `.`, at any depth.
///
/// Used to turn an upsert query into the base of the document it creates.
pub fn deep_copy_strict(doc: &Document) -> Document {
    doc.iter()
        .filter(|(key, _)| !key.starts_with('$') && !key.contains('.'))
        .map(|(key, value)| (key.clone(), copy_value_strict(value)))
        .collect()
}

fn copy_value_strict(value: &Value) -> Value {
    match value {
        Value::Document(doc) => Value::Document(deep_copy_strict(doc)),
        Value::Array(items) => Value::Array(items.iter().map(copy_value_strict).collect()),
        other => other.clone(),
    }
}
