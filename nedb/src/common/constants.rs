use std::time::Duration;

// doc constants
pub const DOC_ID: &str = "_id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";
pub const ID_LENGTH: usize = 16;

// datafile markers
pub const DELETED_MARKER: &str = "$$deleted";
pub const INDEX_CREATED_MARKER: &str = "$$indexCreated";
pub const INDEX_REMOVED_MARKER: &str = "$$indexRemoved";
pub const DATE_TAG: &str = "$$date";
pub const RESERVED_DOLLAR_KEYS: [&str; 4] = [
    DATE_TAG,
    DELETED_MARKER,
    INDEX_CREATED_MARKER,
    INDEX_REMOVED_MARKER,
];

// persistence constants
pub const TEMP_FILE_SUFFIX: &str = "~";
pub const DEFAULT_CORRUPT_ALERT_THRESHOLD: f64 = 0.1;
pub const MIN_AUTOCOMPACTION_INTERVAL: Duration = Duration::from_millis(5000);

// event constants
pub const NEDB_EVENT: &str = "nedb_event";

pub const NEDB_VERSION: &str = env!("CARGO_PKG_VERSION");
