use crate::document::Document;

/// Options of [`Datastore::update`](crate::datastore::Datastore::update).
///
/// # Examples
///
/// ```rust,ignore
/// use nedb::datastore::{UpdateOptions, multi, upsert};
///
/// // Update every match
/// let options = multi();
///
/// // Insert when nothing matches
/// let options = upsert();
///
/// // Update every match and return the new versions
/// let options = UpdateOptions::new(true, false).return_updated_docs(true);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    multi: bool,
    upsert: bool,
    return_updated_docs: bool,
}

impl UpdateOptions {
    pub fn new(multi: bool, upsert: bool) -> Self {
        UpdateOptions {
            multi,
            upsert,
            return_updated_docs: false,
        }
    }

    /// Also return copies of the updated documents.
    pub fn return_updated_docs(mut self, return_updated_docs: bool) -> Self {
        self.return_updated_docs = return_updated_docs;
        self
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert
    }

    pub fn is_return_updated_docs(&self) -> bool {
        self.return_updated_docs
    }
}

/// Update every matching document instead of the first one.
pub fn multi() -> UpdateOptions {
    UpdateOptions::new(true, false)
}

/// Insert a new document when nothing matches.
pub fn upsert() -> UpdateOptions {
    UpdateOptions::new(false, true)
}

/// Options of [`Datastore::remove`](crate::datastore::Datastore::remove).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    multi: bool,
}

impl RemoveOptions {
    pub fn new(multi: bool) -> Self {
        RemoveOptions { multi }
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }
}

/// Remove every matching document instead of the first one.
pub fn remove_all() -> RemoveOptions {
    RemoveOptions::new(true)
}

/// Documents reported back by an update.
#[derive(Debug, Clone, PartialEq)]
pub enum AffectedDocuments {
    /// The single updated or upserted document.
    One(Document),
    /// Every updated document of a `multi` update.
    Many(Vec<Document>),
}

impl AffectedDocuments {
    pub fn into_vec(self) -> Vec<Document> {
        match self {
            AffectedDocuments::One(doc) => vec![doc],
            AffectedDocuments::Many(docs) => docs,
        }
    }
}

/// Outcome of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub num_affected: usize,
    /// Set for upserts, and for updates asking for `return_updated_docs`.
    pub affected_documents: Option<AffectedDocuments>,
    /// Whether the document was inserted rather than updated.
    pub upsert: bool,
}
