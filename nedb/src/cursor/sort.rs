use crate::common::{compare_things_with, SortOrder};
use crate::document::Document;
use crate::errors::{ErrorKind, NedbError, NedbResult};
use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorPreferences};
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Custom string ordering used when sorting.
pub trait StringCompareFn: Send + Sync + Fn(&str, &str) -> Ordering {}

impl<F> StringCompareFn for F where F: Send + Sync + Fn(&str, &str) -> Ordering {}

/// How strings are ordered when a cursor sorts its results.
///
/// Without a comparator strings sort by code point. Indexes and queries always
/// use code point order; the comparator only affects sorting.
#[derive(Clone)]
pub enum StringComparator {
    Custom(Arc<dyn StringCompareFn>),
    Collation {
        preferences: CollatorPreferences,
        options: CollatorOptions,
    },
}

impl StringComparator {
    pub fn custom(compare: impl StringCompareFn + 'static) -> Self {
        StringComparator::Custom(Arc::new(compare))
    }

    pub fn collation(preferences: CollatorPreferences, options: CollatorOptions) -> Self {
        StringComparator::Collation {
            preferences,
            options,
        }
    }

    /// Builds the comparison function used for one sort.
    pub(crate) fn compare_fn(&self) -> NedbResult<Box<dyn Fn(&str, &str) -> Ordering>> {
        match self {
            StringComparator::Custom(compare) => {
                let compare = Arc::clone(compare);
                Ok(Box::new(move |a: &str, b: &str| compare(a, b)))
            }
            StringComparator::Collation {
                preferences,
                options,
            } => {
                let collator = Collator::try_new(preferences.clone(), options.clone()).map_err(|e| {
                    log::error!("Failed to create collator for sorting: {}", e);
                    NedbError::new(
                        "Failed to create collator for sorting - check collator preferences and options",
                        ErrorKind::InvalidOperation,
                    )
                })?;
                Ok(Box::new(move |a: &str, b: &str| collator.compare(a, b)))
            }
        }
    }
}

impl Debug for StringComparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StringComparator::Custom(_) => f.write_str("StringComparator::Custom"),
            StringComparator::Collation { .. } => f.write_str("StringComparator::Collation"),
        }
    }
}

/// Sorts documents by an ordered list of criteria; later criteria break ties of earlier ones.
pub(crate) fn sort_documents(
    docs: &mut [Arc<Document>],
    criteria: &[(String, SortOrder)],
    comparator: Option<&StringComparator>,
) -> NedbResult<()> {
    if criteria.is_empty() {
        return Ok(());
    }

    let compare_strings: Box<dyn Fn(&str, &str) -> Ordering> = match comparator {
        Some(comparator) => comparator.compare_fn()?,
        None => Box::new(|a: &str, b: &str| a.cmp(b)),
    };

    docs.sort_by(|a, b| {
        for (field, order) in criteria {
            let left = a.get_dot_value(field);
            let right = b.get_dot_value(field);
            let ordering = order.apply(compare_things_with(left.as_ref(), right.as_ref(), &*compare_strings));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(())
}
