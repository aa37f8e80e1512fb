use crate::common::{compare_things, Value};
use crate::document::Document;
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::index::IndexOptions;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

type Bucket = SmallVec<[Arc<Document>; 1]>;

/// Key of an index entry. `None` stands for documents lacking the field,
/// which non-sparse indexes keep under the smallest key.
#[derive(Clone, Debug)]
pub struct IndexKey(pub Option<Value>);

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_things(self.0.as_ref(), other.0.as_ref())
    }
}

impl IndexKey {
    fn describe(&self) -> String {
        match &self.0 {
            Some(value) => value.to_string(),
            None => "undefined".to_string(),
        }
    }
}

/// Ordered lookup of documents by the value of one field.
///
/// Documents are shared with the other indexes of a datastore; membership is
/// decided by pointer identity, so the same `Arc<Document>` must be used to
/// insert and later remove a document.
///
/// An array field indexes the document once under each distinct element. Every
/// mutating call either succeeds completely or leaves the index as it was.
pub struct Index {
    options: IndexOptions,
    tree: BTreeMap<IndexKey, Bucket>,
}

impl Index {
    pub fn new(options: IndexOptions) -> Self {
        Index {
            options,
            tree: BTreeMap::new(),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.options.field_name
    }

    pub fn is_unique(&self) -> bool {
        self.options.unique
    }

    pub fn is_sparse(&self) -> bool {
        self.options.sparse
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn number_of_keys(&self) -> usize {
        self.tree.len()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Clears the index and, when documents are given, indexes them all.
    pub fn reset(&mut self, docs: Option<&[Arc<Document>]>) -> NedbResult<()> {
        self.clear();
        match docs {
            Some(docs) => self.insert_many(docs),
            None => Ok(()),
        }
    }

    pub fn insert(&mut self, doc: &Arc<Document>) -> NedbResult<()> {
        let keys = self.keys_of(doc);
        for (position, key) in keys.iter().enumerate() {
            if let Err(e) = self.insert_key(key, doc) {
                for inserted in &keys[..position] {
                    self.delete_key(inserted, doc);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Inserts every document or none of them.
    pub fn insert_many(&mut self, docs: &[Arc<Document>]) -> NedbResult<()> {
        for (position, doc) in docs.iter().enumerate() {
            if let Err(e) = self.insert(doc) {
                for inserted in &docs[..position] {
                    self.remove(inserted);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Removes a document; removing a document that is not indexed does nothing.
    pub fn remove(&mut self, doc: &Arc<Document>) {
        for key in self.keys_of(doc) {
            self.delete_key(&key, doc);
        }
    }

    pub fn remove_many(&mut self, docs: &[Arc<Document>]) {
        for doc in docs {
            self.remove(doc);
        }
    }

    /// Replaces `old_doc` by `new_doc`, restoring `old_doc` if the new one cannot be indexed.
    pub fn update(&mut self, old_doc: &Arc<Document>, new_doc: &Arc<Document>) -> NedbResult<()> {
        self.remove(old_doc);
        if let Err(e) = self.insert(new_doc) {
            self.restore(old_doc);
            return Err(e);
        }
        Ok(())
    }

    /// Applies a batch of `(old, new)` replacements as one unit.
    pub fn update_many(&mut self, pairs: &[(Arc<Document>, Arc<Document>)]) -> NedbResult<()> {
        for (old_doc, _) in pairs {
            self.remove(old_doc);
        }

        for (position, (_, new_doc)) in pairs.iter().enumerate() {
            if let Err(e) = self.insert(new_doc) {
                for (_, inserted) in &pairs[..position] {
                    self.remove(inserted);
                }
                for (old_doc, _) in pairs {
                    self.restore(old_doc);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Undoes a successful [`Index::update_many`] with the same pairs.
    pub fn revert_update_many(&mut self, pairs: &[(Arc<Document>, Arc<Document>)]) -> NedbResult<()> {
        let reverted: Vec<(Arc<Document>, Arc<Document>)> = pairs
            .iter()
            .map(|(old_doc, new_doc)| (Arc::clone(new_doc), Arc::clone(old_doc)))
            .collect();
        self.update_many(&reverted)
    }

    /// Documents whose key equals `value`. An array value returns the union of
    /// the matches of its elements, each document once.
    pub fn get_matching(&self, value: &Value) -> Vec<Arc<Document>> {
        match value {
            Value::Array(values) => {
                let mut result: Vec<Arc<Document>> = Vec::new();
                for value in values {
                    for doc in self.lookup(value) {
                        if !result.iter().any(|seen| Arc::ptr_eq(seen, doc)) {
                            result.push(Arc::clone(doc));
                        }
                    }
                }
                result
            }
            other => self.lookup(other).cloned().collect(),
        }
    }

    /// Documents whose key lies within the `$gt`/`$gte`/`$lt`/`$lte` bounds of
    /// `bounds`, in key order. Other entries of `bounds` are ignored and a
    /// missing side is unbounded.
    pub fn get_between_bounds(&self, bounds: &Document) -> Vec<Arc<Document>> {
        let lower = stricter_bound(bounds.get("$gt"), bounds.get("$gte"), Ordering::Greater);
        let upper = stricter_bound(bounds.get("$lt"), bounds.get("$lte"), Ordering::Less);

        if let (Some((low, low_inclusive)), Some((high, high_inclusive))) = (&lower, &upper) {
            match compare_things(Some(low), Some(high)) {
                Ordering::Greater => return Vec::new(),
                Ordering::Equal if !(*low_inclusive && *high_inclusive) => return Vec::new(),
                _ => {}
            }
        }

        let range = (to_bound(lower), to_bound(upper));
        distinct(self.tree.range(range).flat_map(|(_, bucket)| bucket.iter()))
    }

    /// Every indexed document in key order.
    pub fn get_all(&self) -> Vec<Arc<Document>> {
        distinct(self.tree.values().flat_map(|bucket| bucket.iter()))
    }

    fn lookup(&self, value: &Value) -> impl Iterator<Item = &Arc<Document>> {
        self.tree
            .get(&IndexKey(Some(value.clone())))
            .into_iter()
            .flat_map(|bucket| bucket.iter())
    }

    fn keys_of(&self, doc: &Document) -> Vec<IndexKey> {
        match doc.get_dot_value(&self.options.field_name) {
            None if self.options.sparse => Vec::new(),
            Some(Value::Array(elements)) => {
                let mut keys: Vec<IndexKey> = Vec::with_capacity(elements.len());
                for element in elements {
                    let key = IndexKey(Some(element));
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys
            }
            other => vec![IndexKey(other)],
        }
    }

    fn insert_key(&mut self, key: &IndexKey, doc: &Arc<Document>) -> NedbResult<()> {
        let unique = self.options.unique;
        let bucket = self.tree.entry(key.clone()).or_default();
        if bucket.iter().any(|existing| Arc::ptr_eq(existing, doc)) {
            return Ok(());
        }

        if unique && !bucket.is_empty() {
            let key = key.describe();
            log::error!(
                "Can't insert key {}, it violates the unique constraint on {}",
                key,
                self.options.field_name
            );
            return Err(NedbError::new(
                &format!(
                    "Can't insert key {}, it violates the unique constraint on {}",
                    key, self.options.field_name
                ),
                ErrorKind::UniqueConstraintViolated {
                    field: self.options.field_name.clone(),
                    key,
                },
            ));
        }

        bucket.push(Arc::clone(doc));
        Ok(())
    }

    fn delete_key(&mut self, key: &IndexKey, doc: &Arc<Document>) {
        if let Some(bucket) = self.tree.get_mut(key) {
            bucket.retain(|existing| !Arc::ptr_eq(existing, doc));
            if bucket.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Re-inserts a document that was indexed before the current call.
    fn restore(&mut self, doc: &Arc<Document>) {
        if let Err(e) = self.insert(doc) {
            log::error!(
                "Failed to restore a document into index {}: {}",
                self.options.field_name,
                e
            );
        }
    }
}

/// Picks the stricter of an exclusive and an inclusive bound on the same side.
/// `tighter` is the ordering that makes a bound stricter on that side.
fn stricter_bound(
    exclusive: Option<&Value>,
    inclusive: Option<&Value>,
    tighter: Ordering,
) -> Option<(Value, bool)> {
    match (exclusive, inclusive) {
        (Some(ex), Some(inc)) => {
            if compare_things(Some(inc), Some(ex)) == tighter {
                Some((inc.clone(), true))
            } else {
                Some((ex.clone(), false))
            }
        }
        (Some(ex), None) => Some((ex.clone(), false)),
        (None, Some(inc)) => Some((inc.clone(), true)),
        (None, None) => None,
    }
}

fn to_bound(bound: Option<(Value, bool)>) -> Bound<IndexKey> {
    match bound {
        Some((value, true)) => Bound::Included(IndexKey(Some(value))),
        Some((value, false)) => Bound::Excluded(IndexKey(Some(value))),
        None => Bound::Unbounded,
    }
}

/// Documents filed under several keys are returned once, at their first key.
fn distinct<'a>(docs: impl Iterator<Item = &'a Arc<Document>>) -> Vec<Arc<Document>> {
    let mut seen: HashSet<*const Document> = HashSet::new();
    docs.filter(|doc| seen.insert(Arc::as_ptr(doc)))
        .cloned()
        .collect()
}
