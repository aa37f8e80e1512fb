use crate::common::{random_string, ID_LENGTH};

/// Source of `_id` values for inserted documents that do not carry one.
///
/// The datastore retries when a generated id is already taken, so an
/// implementation only needs to make collisions unlikely.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Generates 16 random alphanumeric characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        random_string(ID_LENGTH)
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}
