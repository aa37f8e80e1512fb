mod index;
mod options;

pub use index::*;
pub use options::*;
