use crate::document::Document;
use crate::errors::NedbResult;
use crate::query::match_document;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Predicate evaluated against whole documents, the `$where` of a query.
pub trait WherePredicate: Send + Sync + Fn(&Document) -> bool {}

impl<F> WherePredicate for F where F: Send + Sync + Fn(&Document) -> bool {}

/// A selection of documents: a query document, optionally combined with an
/// arbitrary predicate.
///
/// The query document uses field paths mapped to values or operator documents,
/// plus the logical operators `$or`, `$and` and `$not`. Both parts must hold for
/// a document to match.
///
/// # Examples
///
/// ```rust
/// use nedb::doc;
/// use nedb::query::Query;
///
/// let all = Query::all();
/// let adults = Query::new(doc! { age: { "$gte": 18 } });
/// let even = Query::new(doc! {}).with_where(|doc| {
///     doc.get("age").and_then(|v| v.as_i64()).map(|n| n % 2 == 0).unwrap_or(false)
/// });
/// assert!(all.filter().is_empty());
/// assert!(adults.matches(&doc! { age: 20 }).unwrap());
/// assert!(!even.matches(&doc! { age: 21 }).unwrap());
/// ```
#[derive(Clone, Default)]
pub struct Query {
    filter: Document,
    predicate: Option<Arc<dyn WherePredicate>>,
}

impl Query {
    pub fn new(filter: Document) -> Self {
        Query {
            filter,
            predicate: None,
        }
    }

    /// Matches every document.
    pub fn all() -> Self {
        Query::default()
    }

    pub fn with_where(mut self, predicate: impl WherePredicate + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn filter(&self) -> &Document {
        &self.filter
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    /// Returns whether the document satisfies the query.
    ///
    /// Fails on malformed queries, for example an unknown operator or a `$in`
    /// operand that is not an array. Malformed parts are only detected when
    /// they are evaluated.
    pub fn matches(&self, doc: &Document) -> NedbResult<bool> {
        if !match_document(doc, &self.filter)? {
            return Ok(false);
        }
        Ok(match &self.predicate {
            Some(predicate) => predicate(doc),
            None => true,
        })
    }
}

impl From<Document> for Query {
    fn from(filter: Document) -> Self {
        Query::new(filter)
    }
}

impl Debug for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("filter", &self.filter)
            .field("where", &self.predicate.is_some())
            .finish()
    }
}
