mod date_utils;
mod random;
mod task_util;
mod type_utils;

pub use date_utils::*;
pub use random::*;
pub(crate) use task_util::*;
pub use type_utils::*;
