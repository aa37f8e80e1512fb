mod checks;
mod document;
mod serializer;

pub use checks::*;
pub use document::*;
pub use serializer::*;
