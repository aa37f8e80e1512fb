mod modifier;

pub use modifier::*;
