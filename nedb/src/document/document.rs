use crate::common::{are_things_equal, Value, DOC_ID};
use crate::document::serialize_document;
use indexmap::map::{IntoIter, Iter, Keys};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt::{Debug, Display};

/// A schemaless record: string keys mapped to [Value]s, in insertion order.
///
/// Nested documents are addressed with dot paths (`"address.city"`) through
/// [`Document::get_dot_value`]; plain [`Document::get`] only looks at top level
/// keys. The `_id` field is the primary key once the document is stored.
///
/// Cloning a document is a deep copy.
///
/// # Examples
///
/// ```ignore
/// let doc = doc! {
///     planet: "Earth",
///     satellites: [{ name: "Moon" }],
/// };
/// assert_eq!(doc.get_dot_value("satellites.0.name"), Some(Value::from("Moon")));
/// ```
#[derive(Clone, Default)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Sets a top level key, replacing any previous value in place.
    ///
    /// Keys are stored verbatim; validity of field names is checked when the
    /// document is inserted or serialized, not here.
    pub fn put<'a, T: Into<Value>>(&mut self, key: impl Into<Cow<'a, str>>, value: T) {
        self.data.insert(key.into().into_owned(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Removes a top level key, keeping the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> Keys<'_, String, Value> {
        self.data.keys()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.data.iter()
    }

    pub fn id(&self) -> Option<&Value> {
        self.data.get(DOC_ID)
    }

    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Resolves a dot path against this document.
    ///
    /// A numeric segment following an array selects that element; any other
    /// segment following an array is resolved against every element and the
    /// results are collected into a new array. Elements where the rest of the
    /// path is missing are left out of that array.
    ///
    /// Returns `None` when the path does not exist.
    pub fn get_dot_value(&self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.split('.').collect();
        let (first, rest) = parts.split_first()?;
        descend(self.data.get(*first)?, rest)
    }
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Document(doc) => doc.get(key),
        Value::Array(items) => array_index(key).and_then(|i| items.get(i)),
        _ => None,
    }
}

pub(crate) fn array_index(segment: &str) -> Option<usize> {
    segment.parse::<usize>().ok()
}

/// Follows `parts` below a value that was reached through a field name.
fn descend(value: &Value, parts: &[&str]) -> Option<Value> {
    let Some((first, rest)) = parts.split_first() else {
        return Some(value.clone());
    };
    if let Value::Array(items) = value {
        if array_index(first).is_none() {
            let spread = items
                .iter()
                .filter_map(|el| descend(child(el, first)?, rest))
                .collect();
            return Some(Value::Array(spread));
        }
    }
    descend(child(value, first)?, rest)
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .all(|(key, value)| are_things_equal(Some(value), other.data.get(key)))
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serialize_document(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

/// Strips the quotes `stringify!` leaves around string literal keys.
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Keys are identifiers or string literals; string literals are needed for keys
/// such as `"$set"` or `"a.b"`. Values are literals, nested `{ .. }` documents,
/// `[ .. ]` arrays or parenthesized expressions. Negative numbers need
/// parentheses: `(-1)`.
///
/// # Examples
///
/// ```rust
/// use nedb::doc;
///
/// let empty = doc! {};
/// let update = doc! {
///     "$set": { "address.city": "Paris" },
///     "$inc": { visits: 1 },
/// };
/// let sort = doc! { age: (-1) };
/// assert!(empty.is_empty());
/// assert_eq!(update.len(), 2);
/// assert_eq!(sort.len(), 1);
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::document::Document::new()
    };

    () => {
        $crate::document::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::document::Document::new();
            $(
                doc.put($crate::document::normalize(stringify!($key)), $crate::doc_value!($value));
            )*
            doc
        }
    };
}

/// Converts one value position of the [doc!] macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
