use crate::common::truncate_to_millis;
use crate::document::{serialize_value, Document};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A value stored in a [Document].
///
/// Values are JSON-like: scalars, dates, arrays and nested documents. A field that
/// is absent is represented by `Option::<Value>::None` wherever the distinction
/// matters (queries, indexes, comparisons), never by a variant of this enum.
///
/// Integers and floats are distinct variants but compare and match numerically, so
/// `Value::I64(1) == Value::F64(1.0)`.
///
/// Dates are kept with millisecond precision, the precision they are persisted with.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::I64(_) | Value::F64(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Value::Date(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    /// Scalars that can be looked up directly in an index.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Document(_))
    }

    /// Truthiness in the JavaScript sense, minus the empty string which counts as `true`.
    ///
    /// Used by `$exists`, where only `false`, `null` and `0` mean "must not exist".
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::I64(n) => *n != 0,
            Value::F64(n) => *n != 0.0 && !n.is_nan(),
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(n) => Some(*n),
            Value::F64(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I64(n) => Some(*n as f64),
            Value::F64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::I64(_) | Value::F64(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Document(_) => "object",
        }
    }

    /// Adds two numbers, staying integral while it fits.
    pub(crate) fn add_numbers(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::I64(a), Value::I64(b)) => Some(
                a.checked_add(*b)
                    .map(Value::I64)
                    .unwrap_or(Value::F64(*a as f64 + *b as f64)),
            ),
            _ => Some(Value::F64(self.as_f64()? + other.as_f64()?)),
        }
    }
}

/// Rank of each type in the cross-type ordering:
/// undefined < null < numbers < strings < booleans < dates < arrays < objects.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::I64(_)) | Some(Value::F64(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Bool(_)) => 4,
        Some(Value::Date(_)) => 5,
        Some(Value::Array(_)) => 6,
        Some(Value::Document(_)) => 7,
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::I64(x), Value::I64(y)) => x.cmp(y),
        _ => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
        }
    }
}

/// Total order over values, absent values first, using plain code point order for strings.
pub fn compare_things(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    compare_things_with(a, b, &|x: &str, y: &str| x.cmp(y))
}

/// Total order over values with a caller supplied string comparison.
pub fn compare_things_with<F>(a: Option<&Value>, b: Option<&Value>, compare_strings: &F) -> Ordering
where
    F: Fn(&str, &str) -> Ordering + ?Sized,
{
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    match (a, b) {
        (Some(x), Some(y)) => match (x, y) {
            (Value::I64(_) | Value::F64(_), _) => compare_numbers(x, y),
            (Value::String(s), Value::String(t)) => compare_strings(s, t),
            (Value::Bool(p), Value::Bool(q)) => p.cmp(q),
            (Value::Date(d), Value::Date(e)) => d.cmp(e),
            (Value::Array(p), Value::Array(q)) => {
                for (left, right) in p.iter().zip(q.iter()) {
                    let ordering = compare_things_with(Some(left), Some(right), compare_strings);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                p.len().cmp(&q.len())
            }
            (Value::Document(p), Value::Document(q)) => {
                let mut p_keys: Vec<&String> = p.keys().collect();
                let mut q_keys: Vec<&String> = q.keys().collect();
                p_keys.sort();
                q_keys.sort();
                for (pk, qk) in p_keys.iter().zip(q_keys.iter()) {
                    let ordering = compare_things_with(p.get(pk), q.get(qk), compare_strings);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                p_keys.len().cmp(&q_keys.len())
            }
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

/// Deep equality used by implicit equality queries, `$in` and `$ne`.
///
/// Absent values are never equal to anything, and an array never equals a
/// non-array.
pub fn are_things_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };

    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::I64(x), Value::I64(y)) => x == y,
        (Value::I64(_) | Value::F64(_), Value::I64(_) | Value::F64(_)) => {
            a.as_f64() == b.as_f64()
        }
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(p, q)| are_things_equal(Some(p), Some(q)))
        }
        (Value::Document(x), Value::Document(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| are_things_equal(Some(value), y.get(key)))
        }
        _ => false,
    }
}

/// `$lt`-style operators only apply between two strings, two numbers or two dates.
pub fn are_comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::String(_), Value::String(_))
            | (Value::I64(_) | Value::F64(_), Value::I64(_) | Value::F64(_))
            | (Value::Date(_), Value::Date(_))
    )
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        are_things_equal(Some(self), Some(other))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match serialize_value(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value)
            .map(Value::I64)
            .unwrap_or(Value::F64(value as f64))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(truncate_to_millis(value))
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}
