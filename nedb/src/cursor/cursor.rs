use crate::common::SortOrder;
use crate::cursor::{sort_documents, Projection, StringComparator};
use crate::datastore::Datastore;
use crate::document::Document;
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::query::Query;
use itertools::process_results;
use std::sync::Arc;

/// Paging, ordering and shaping applied to the documents a query matches.
#[derive(Debug, Clone, Default)]
pub struct CursorOptions {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub sort: Vec<(String, SortOrder)>,
    pub projection: Option<Document>,
}

/// A lazily executed query.
///
/// Nothing runs until [`Cursor::exec`]; the builder methods only record the
/// options. Errors found while building (an invalid sort direction) are kept
/// and returned by `exec`.
///
/// ```ignore
/// let planets = datastore
///     .find(doc! { system: "solar" })
///     .sort("name", SortOrder::Ascending)
///     .skip(1)
///     .limit(2)
///     .projection(doc! { name: 1, _id: 0 })
///     .exec()?;
/// ```
#[must_use = "a cursor does nothing until exec() is called"]
pub struct Cursor<T> {
    datastore: Datastore,
    query: Query,
    options: CursorOptions,
    finalizer: fn(Vec<Document>) -> T,
    error: Option<NedbError>,
}

impl<T> Cursor<T> {
    pub(crate) fn new(datastore: Datastore, query: Query, finalizer: fn(Vec<Document>) -> T) -> Self {
        Cursor {
            datastore,
            query,
            options: CursorOptions::default(),
            finalizer,
            error: None,
        }
    }

    /// Returns at most `limit` documents; `0` means no limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit).filter(|l| *l > 0);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip).filter(|s| *s > 0);
        self
    }

    /// Adds a sort criterion; earlier criteria take precedence.
    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        self.options.sort.push((field.to_string(), order));
        self
    }

    /// Adds the criteria of a sort document such as `{ age: -1, name: 1 }`.
    pub fn sort_by(mut self, spec: Document) -> Self {
        for (field, direction) in spec.iter() {
            match direction.as_f64() {
                Some(direction) if direction != 0.0 => {
                    self.options.sort.push((field.clone(), SortOrder::from_direction(direction)));
                }
                _ => {
                    log::error!("Invalid sort direction for {}: {}", field, direction);
                    if self.error.is_none() {
                        self.error = Some(NedbError::new(
                            &format!("Invalid sort direction for {}: {}, expected 1 or -1", field, direction),
                            ErrorKind::InvalidQuery,
                        ));
                    }
                }
            }
        }
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.options.projection = Some(projection).filter(|p| !p.is_empty());
        self
    }

    pub fn options(&self) -> &CursorOptions {
        &self.options
    }

    /// Runs the query through the datastore's queue and returns its result.
    pub fn exec(self) -> NedbResult<T> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let docs = self.datastore.run_cursor(self.query, self.options)?;
        Ok((self.finalizer)(docs))
    }
}

/// Filters the candidates, then sorts, pages and projects the matches.
///
/// Without sort criteria the scan stops as soon as the page is full. With
/// sort criteria every match is collected and sorted first. Only the final
/// page is cloned out of the index and projected.
pub(crate) fn execute_cursor(
    candidates: Vec<Arc<Document>>,
    query: &Query,
    options: &CursorOptions,
    comparator: Option<&StringComparator>,
) -> NedbResult<Vec<Document>> {
    let projection = match &options.projection {
        Some(spec) => Projection::parse(spec)?,
        None => None,
    };
    let skip = options.skip.unwrap_or(0);
    let limit = options.limit.unwrap_or(usize::MAX);

    let matching = candidates.into_iter().filter_map(|doc| match query.matches(&doc) {
        Ok(true) => Some(Ok(doc)),
        Ok(false) => None,
        Err(e) => Some(Err(e)),
    });

    let page: Vec<Arc<Document>> = if options.sort.is_empty() {
        process_results(matching, |docs| docs.skip(skip).take(limit).collect())?
    } else {
        let mut matched: Vec<Arc<Document>> = matching.collect::<NedbResult<_>>()?;
        sort_documents(&mut matched, &options.sort, comparator)?;
        matched.into_iter().skip(skip).take(limit).collect()
    };

    page.iter()
        .map(|doc| match &projection {
            Some(projection) => projection.apply(doc),
            None => Ok(Document::clone(doc)),
        })
        .collect()
}

pub(crate) fn first_document(docs: Vec<Document>) -> Option<Document> {
    docs.into_iter().next()
}

pub(crate) fn document_count(docs: Vec<Document>) -> usize {
    docs.len()
}

pub(crate) fn all_documents(docs: Vec<Document>) -> Vec<Document> {
    docs
}
