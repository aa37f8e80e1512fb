use std::cmp::Ordering;

/// Direction of one sort criterion on a cursor.
///
/// A sort document encodes the direction as `1` for ascending and `-1` for
/// descending, see [`SortOrder::from_direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first, following the cross-type value ordering
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    /// Maps a numeric direction to an order: negative means descending.
    pub fn from_direction(direction: f64) -> SortOrder {
        if direction < 0.0 {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }

    #[inline]
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}
