//! # NeDB - Embedded Document Datastore
//!
//! An embedded, single-process document database. Documents are JSON-like
//! trees kept in memory behind field indexes; a persistent datastore also
//! appends every change to a line-oriented datafile and compacts it on load.
//!
//! ## Key Features
//!
//! - **Embedded**: no server, the datastore lives in your process
//! - **MongoDB-style queries**: comparison, array and logical operators plus `$where` predicates
//! - **Update modifiers**: `$set`, `$unset`, `$inc`, `$push`, `$addToSet`, `$pop`, `$pull`, `$min`, `$max`
//! - **Indexes**: unique, sparse and TTL indexes on any dotted field path
//! - **Crash safety**: compaction rewrites the datafile through a temporary file
//! - **Serialized execution**: every operation runs to completion before the next starts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nedb::datastore::{Datastore, multi};
//! use nedb::doc;
//! use nedb::index::unique_index;
//!
//! let db = Datastore::builder()
//!     .filename("data/users.db")
//!     .timestamp_data(true)
//!     .autoload(true)
//!     .open()?;
//!
//! db.ensure_index(unique_index("email"))?;
//! db.insert(doc! { name: "Ada", email: "ada@example.com", visits: 0 })?;
//! db.update(doc! { name: "Ada" }, doc! { "$inc": { visits: 1 } }, multi())?;
//!
//! let users = db.find(doc! { visits: { "$gte": 1 } }).sort_by(doc! { name: 1 }).exec()?;
//! ```
//!
//! ## Design Pattern
//!
//! Public handles ([`datastore::Datastore`], [`persistence::Persistence`],
//! [`executor::Executor`]) wrap an `Arc` to their private state, so cloning a
//! handle is cheap and every clone sees the same datastore.
//!
//! ## Module Organization
//!
//! - [`common`] - Values, ordering, constants and shared utilities
//! - [`cursor`] - Query cursors with sort, skip, limit and projection
//! - [`datastore`] - The datastore, its builder and options
//! - [`document`] - Documents, the `doc!` macro, validation and serialization
//! - [`errors`] - Error types and result definitions
//! - [`executor`] - Serialized task queue with a startup buffer
//! - [`index`] - Ordered field indexes
//! - [`persistence`] - Datafile format, storage backends and serialization hooks
//! - [`query`] - Query documents and matching
//! - [`update`] - Update modifiers

pub mod common;
pub mod cursor;
pub mod datastore;
pub mod document;
pub mod errors;
pub mod executor;
pub mod index;
pub mod persistence;
pub mod query;
pub mod update;

pub(crate) use common::{atomic, Atomic};
