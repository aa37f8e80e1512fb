mod matcher;
mod operators;
mod query;

pub use matcher::*;
pub use operators::*;
pub use query::*;
