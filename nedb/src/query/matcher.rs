use crate::common::{are_comparable, are_things_equal, compare_things, Value};
use crate::document::Document;
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::query::{ComparisonOperator, LogicalOperator};
use regex::Regex;
use std::cmp::Ordering;

/// Tests a document against a query document.
///
/// Every top level entry must hold. Entries whose key starts with `$` are logical
/// operators, the others are field paths matched with [`match_query_part`].
pub fn match_document(doc: &Document, query: &Document) -> NedbResult<bool> {
    for (key, query_value) in query.iter() {
        let matched = if key.starts_with('$') {
            match_logical(doc, LogicalOperator::parse(key)?, query_value)?
        } else {
            match_query_part(doc, key, query_value)?
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Tests any value against a query value, the way `$elemMatch` sees array elements.
pub(crate) fn match_value(value: &Value, query: &Value) -> NedbResult<bool> {
    match (value, query) {
        (Value::Document(doc), Value::Document(q)) => match_document(doc, q),
        _ => match_field(Some(value), query, false),
    }
}

fn match_logical(doc: &Document, operator: LogicalOperator, query_value: &Value) -> NedbResult<bool> {
    match operator {
        LogicalOperator::Or => {
            for sub_query in sub_queries(query_value, "$or")? {
                if match_document(doc, sub_query)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        LogicalOperator::And => {
            for sub_query in sub_queries(query_value, "$and")? {
                if !match_document(doc, sub_query)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        LogicalOperator::Not => match query_value {
            Value::Document(sub_query) => Ok(!match_document(doc, sub_query)?),
            _ => Err(invalid_query("$not operator used without a query document")),
        },
    }
}

fn sub_queries<'a>(query_value: &'a Value, operator: &str) -> NedbResult<Vec<&'a Document>> {
    let items = query_value
        .as_array()
        .ok_or_else(|| invalid_query(&format!("{} operator used without an array", operator)))?;
    items
        .iter()
        .map(|item| {
            item.as_document().ok_or_else(|| {
                invalid_query(&format!("{} operator expects an array of query documents", operator))
            })
        })
        .collect()
}

/// Matches the value at `key` (a dot path) against one query value.
pub fn match_query_part(doc: &Document, key: &str, query_value: &Value) -> NedbResult<bool> {
    let field_value = doc.get_dot_value(key);
    match_field(field_value.as_ref(), query_value, false)
}

fn match_field(field_value: Option<&Value>, query_value: &Value, treat_as_value: bool) -> NedbResult<bool> {
    if let (Some(Value::Array(elements)), false) = (field_value, treat_as_value) {
        // an array query asks for an exact match of the whole array
        if query_value.is_array() {
            return match_field(field_value, query_value, true);
        }

        if let Value::Document(operators) = query_value {
            if operators.keys().any(|k| ComparisonOperator::is_array_operator(k)) {
                return match_field(field_value, query_value, true);
            }
        }

        for element in elements {
            if match_field(Some(element), query_value, false)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    if let Value::Document(operators) = query_value {
        let dollar_keys = operators.keys().filter(|k| k.starts_with('$')).count();
        if dollar_keys != 0 && dollar_keys != operators.len() {
            return Err(invalid_query("You cannot mix operators and normal fields"));
        }

        if dollar_keys > 0 {
            for (name, operand) in operators.iter() {
                let operator = ComparisonOperator::parse(name)?;
                if !compare(operator, field_value, operand)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }

    Ok(are_things_equal(field_value, Some(query_value)))
}

fn compare(operator: ComparisonOperator, field_value: Option<&Value>, operand: &Value) -> NedbResult<bool> {
    Ok(match operator {
        ComparisonOperator::Lt => ordered(field_value, operand, |o| o == Ordering::Less),
        ComparisonOperator::Lte => ordered(field_value, operand, |o| o != Ordering::Greater),
        ComparisonOperator::Gt => ordered(field_value, operand, |o| o == Ordering::Greater),
        ComparisonOperator::Gte => ordered(field_value, operand, |o| o != Ordering::Less),
        ComparisonOperator::Ne => {
            field_value.is_none() || !are_things_equal(field_value, Some(operand))
        }
        ComparisonOperator::In => is_in(field_value, operand, "$in")?,
        ComparisonOperator::Nin => !is_in(field_value, operand, "$nin")?,
        ComparisonOperator::Regex => {
            let pattern = operand.as_str().ok_or_else(|| {
                invalid_query("$regex operator called with non regular expression")
            })?;
            let regex = Regex::new(pattern).map_err(|e| {
                invalid_query(&format!("$regex operator called with invalid pattern: {}", e))
            })?;
            match field_value {
                Some(Value::String(s)) => regex.is_match(s),
                _ => false,
            }
        }
        ComparisonOperator::Exists => field_value.is_some() == operand.is_truthy(),
        ComparisonOperator::Size => match field_value {
            Some(Value::Array(items)) => {
                let size = operand
                    .as_f64()
                    .filter(|n| n.fract() == 0.0)
                    .ok_or_else(|| invalid_query("$size operator called without an integer"))?;
                items.len() as f64 == size
            }
            _ => false,
        },
        ComparisonOperator::ElemMatch => match field_value {
            Some(Value::Array(items)) => {
                for item in items {
                    if match_value(item, operand)? {
                        return Ok(true);
                    }
                }
                false
            }
            _ => false,
        },
    })
}

/// `$lt` and friends only hold between two numbers, two strings or two dates.
fn ordered(field_value: Option<&Value>, operand: &Value, test: impl Fn(Ordering) -> bool) -> bool {
    let value = match field_value {
        Some(value) if are_comparable(value, operand) => value,
        _ => return false,
    };

    let ordering = match (value, operand) {
        (Value::I64(a), Value::I64(b)) => Some(a.cmp(b)),
        (Value::I64(_) | Value::F64(_), _) => value
            .as_f64()
            .and_then(|a| operand.as_f64().and_then(|b| a.partial_cmp(&b))),
        _ => Some(compare_things(Some(value), Some(operand))),
    };
    ordering.map(test).unwrap_or(false)
}

fn is_in(field_value: Option<&Value>, operand: &Value, operator: &str) -> NedbResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| invalid_query(&format!("{} operator called with a non-array", operator)))?;
    Ok(candidates
        .iter()
        .any(|candidate| are_things_equal(field_value, Some(candidate))))
}

fn invalid_query(message: &str) -> NedbError {
    log::error!("{}", message);
    NedbError::new(message, ErrorKind::InvalidQuery)
}
