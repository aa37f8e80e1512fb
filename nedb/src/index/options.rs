use crate::common::Value;
use crate::document::{from_json, to_json};
use crate::errors::NedbResult;
use serde::{Deserialize, Serialize};

/// Options of a field index, as passed to `ensure_index` and as recorded in
/// `$$indexCreated` datafile markers.
///
/// On disk the options are written in camelCase:
/// `{"fieldName":"age","unique":false,"sparse":false,"expireAfterSeconds":3600}`.
/// A `fieldName` that is absent or empty means the options are unusable.
///
/// # Usage
///
/// ```ignore
/// datastore.ensure_index(IndexOptions::new("email").unique(true))?;
/// datastore.ensure_index(IndexOptions::new("createdAt").expire_after_seconds(3600.0))?;
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<f64>,
}

impl IndexOptions {
    pub fn new(field_name: &str) -> IndexOptions {
        IndexOptions {
            field_name: field_name.to_string(),
            ..IndexOptions::default()
        }
    }

    pub fn unique(mut self, unique: bool) -> IndexOptions {
        self.unique = unique;
        self
    }

    pub fn sparse(mut self, sparse: bool) -> IndexOptions {
        self.sparse = sparse;
        self
    }

    /// Registers the field for expiry: documents whose field holds a date older
    /// than this many seconds are removed the next time they are read.
    pub fn expire_after_seconds(mut self, seconds: f64) -> IndexOptions {
        self.expire_after_seconds = Some(seconds);
        self
    }

    pub(crate) fn to_value(&self) -> NedbResult<Value> {
        from_json(serde_json::to_value(self)?)
    }

    pub(crate) fn from_value(value: &Value) -> NedbResult<IndexOptions> {
        Ok(serde_json::from_value(to_json(value)?)?)
    }
}

/// Options for a unique index on `field_name`.
pub fn unique_index(field_name: &str) -> IndexOptions {
    IndexOptions::new(field_name).unique(true)
}

/// Options for a plain index on `field_name`.
pub fn non_unique_index(field_name: &str) -> IndexOptions {
    IndexOptions::new(field_name)
}
