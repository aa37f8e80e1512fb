mod cursor;
mod projection;
mod sort;

pub use cursor::*;
pub use projection::*;
pub use sort::*;
