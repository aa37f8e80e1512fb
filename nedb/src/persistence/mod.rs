mod file_storage;
mod hooks;
mod memory_storage;
mod persistence;
mod storage;

pub use file_storage::*;
pub use hooks::*;
pub use memory_storage::*;
pub use persistence::*;
pub use storage::*;
