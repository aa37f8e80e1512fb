mod executor;

pub use executor::*;
