use crate::errors::{ErrorKind, NedbError, NedbResult};

/// Operators applied to the value found at a field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Lt,
    Lte,
    Gt,
    Gte,
    Ne,
    In,
    Nin,
    Regex,
    Exists,
    Size,
    ElemMatch,
}

impl ComparisonOperator {
    pub fn parse(name: &str) -> NedbResult<ComparisonOperator> {
        Ok(match name {
            "$lt" => ComparisonOperator::Lt,
            "$lte" => ComparisonOperator::Lte,
            "$gt" => ComparisonOperator::Gt,
            "$gte" => ComparisonOperator::Gte,
            "$ne" => ComparisonOperator::Ne,
            "$in" => ComparisonOperator::In,
            "$nin" => ComparisonOperator::Nin,
            "$regex" => ComparisonOperator::Regex,
            "$exists" => ComparisonOperator::Exists,
            "$size" => ComparisonOperator::Size,
            "$elemMatch" => ComparisonOperator::ElemMatch,
            _ => {
                log::error!("Unknown comparison function {}", name);
                return Err(NedbError::new(
                    &format!("Unknown comparison function {}", name),
                    ErrorKind::InvalidQuery,
                ));
            }
        })
    }

    /// Operators that look at an array field as a whole instead of at its elements.
    pub fn is_array_operator(name: &str) -> bool {
        matches!(name, "$size" | "$elemMatch")
    }
}

/// Operators combining whole sub-queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    Or,
    And,
    Not,
}

impl LogicalOperator {
    pub fn parse(name: &str) -> NedbResult<LogicalOperator> {
        Ok(match name {
            "$or" => LogicalOperator::Or,
            "$and" => LogicalOperator::And,
            "$not" => LogicalOperator::Not,
            "$where" => {
                log::error!("$where cannot be expressed inside a query document");
                return Err(NedbError::new(
                    "$where cannot be expressed inside a query document, use Query::with_where",
                    ErrorKind::InvalidQuery,
                ));
            }
            _ => {
                log::error!("Unknown logical operator {}", name);
                return Err(NedbError::new(
                    &format!("Unknown logical operator {}", name),
                    ErrorKind::InvalidQuery,
                ));
            }
        })
    }
}
