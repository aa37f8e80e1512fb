mod datastore;
mod datastore_builder;
mod datastore_config;
mod event;
mod id_generator;
mod options;

pub use datastore::*;
pub use datastore_builder::*;
pub use datastore_config::*;
pub use event::*;
pub use id_generator::*;
pub use options::*;
