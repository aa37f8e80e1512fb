use crate::common::random_string;
use crate::errors::{ErrorKind, NedbError, NedbResult};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Transforms one serialized datafile line.
pub type SerializationHook = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Pair of line transforms applied around serialization, e.g. to encrypt the datafile.
///
/// `after_serialization` runs on every line before it is written and
/// `before_deserialization` on every line read back; the second must undo the
/// first.
#[derive(Clone)]
pub struct SerializationHooks {
    after_serialization: SerializationHook,
    before_deserialization: SerializationHook,
}

impl Default for SerializationHooks {
    fn default() -> Self {
        SerializationHooks::identity()
    }
}

impl SerializationHooks {
    pub fn new<A, B>(after_serialization: A, before_deserialization: B) -> SerializationHooks
    where
        A: Fn(&str) -> String + Send + Sync + 'static,
        B: Fn(&str) -> String + Send + Sync + 'static,
    {
        SerializationHooks {
            after_serialization: Arc::new(after_serialization),
            before_deserialization: Arc::new(before_deserialization),
        }
    }

    pub fn identity() -> SerializationHooks {
        SerializationHooks::new(|s: &str| s.to_string(), |s: &str| s.to_string())
    }

    /// Builds the hooks from the optional pair given to the datastore builder
    /// and verifies them.
    pub(crate) fn from_parts(
        after_serialization: Option<SerializationHook>,
        before_deserialization: Option<SerializationHook>,
    ) -> NedbResult<SerializationHooks> {
        let hooks = match (after_serialization, before_deserialization) {
            (None, None) => return Ok(SerializationHooks::identity()),
            (Some(after_serialization), Some(before_deserialization)) => SerializationHooks {
                after_serialization,
                before_deserialization,
            },
            _ => {
                log::error!("Serialization hook defined but deserialization hook undefined, or the other way around");
                return Err(NedbError::new(
                    "Serialization hook defined but deserialization hook undefined, or the other way around; cautiously refusing to start to prevent data loss",
                    ErrorKind::SerializationHooksAsymmetric,
                ));
            }
        };
        hooks.verify()?;
        Ok(hooks)
    }

    /// Checks that `before_deserialization` undoes `after_serialization` on
    /// random strings of increasing length.
    pub fn verify(&self) -> NedbResult<()> {
        for len in 1..30 {
            for _ in 0..10 {
                let sample = random_string(len);
                let restored = self.before_deserialization(&self.after_serialization(&sample));
                if restored != sample {
                    log::error!("beforeDeserialization does not undo afterSerialization for '{}'", sample);
                    return Err(NedbError::new(
                        "The deserialization hook is not the reverse of the serialization hook; cautiously refusing to start to prevent data loss",
                        ErrorKind::SerializationHooksNotInverse,
                    ));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn after_serialization(&self, line: &str) -> String {
        (self.after_serialization)(line)
    }

    #[inline]
    pub fn before_deserialization(&self, line: &str) -> String {
        (self.before_deserialization)(line)
    }
}

impl Debug for SerializationHooks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SerializationHooks")
    }
}
