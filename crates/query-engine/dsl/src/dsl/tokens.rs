//! Keywords of the query language.

use enum_iterator::Sequence;

// Request sections //

pub const ROOTS: &str = "$roots";
pub const QUERY: &str = "$query";
pub const FILTER: &str = "$filter";
pub const PROJECTION: &str = "$projection";
pub const FACETS: &str = "$facets";
pub const DATA: &str = "$data";
pub const ACTION: &str = "$action";

// Depth qualifiers //

pub const DEPTH: &str = "$depth";
pub const EXACT_DEPTH: &str = "$exactdepth";

/// Deepest level of the archival graph a qualifier can reach, in either direction.
pub const MAX_DEPTH: u32 = 100;

// Filter //

pub const OFFSET: &str = "$offset";
pub const LIMIT: &str = "$limit";
pub const ORDER_BY: &str = "$orderby";
pub const HINT: &str = "$hint";
pub const SCROLL_ID: &str = "$scrollId";
pub const SCROLL_TIMEOUT: &str = "$scrollTimeout";
pub const MULT: &str = "$mult";

// Projection //

pub const FIELDS: &str = "$fields";
pub const USAGE: &str = "$usage";
pub const SLICE: &str = "$slice";

// Facets //

pub const NAME: &str = "$name";
pub const FIELD: &str = "$field";
pub const SIZE: &str = "$size";
pub const ORDER: &str = "$order";
pub const SUBOBJECT: &str = "$subobject";
pub const FORMAT: &str = "$format";
pub const RANGES: &str = "$ranges";
pub const FROM: &str = "$from";
pub const TO: &str = "$to";
pub const QUERY_FILTERS: &str = "$query_filters";

// Array actions //

pub const EACH: &str = "$each";

// Hints //

pub const HINT_CACHE: &str = "cache";
pub const HINT_NO_CACHE: &str = "nocache";
pub const HINT_NO_TIMEOUT: &str = "notimeout";

// Reserved projection fields //

/// Selects every field of a document.
pub const ALL_FIELDS: &str = "#all";
/// The identifier of a document.
pub const ID: &str = "#id";

/// Operators that may head a query node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence)]
pub enum QueryOperator {
    Exists,
    Missing,
    IsNull,
    In,
    Nin,
    Size,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
    Range,
    Term,
    Regex,
    And,
    Or,
    Not,
    Path,
}

impl QueryOperator {
    pub fn token(self) -> &'static str {
        match self {
            Self::Exists => "$exists",
            Self::Missing => "$missing",
            Self::IsNull => "$isNull",
            Self::In => "$in",
            Self::Nin => "$nin",
            Self::Size => "$size",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Range => "$range",
            Self::Term => "$term",
            Self::Regex => "$regex",
            Self::And => "$and",
            Self::Or => "$or",
            Self::Not => "$not",
            Self::Path => "$path",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|operator| operator.token() == token)
    }
}

/// The bounds a `$range` node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence)]
pub enum RangeOperator {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOperator {
    pub fn token(self) -> &'static str {
        match self {
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|operator| operator.token() == token)
    }

    /// Whether this bound limits values from below.
    pub fn is_lower(self) -> bool {
        matches!(self, Self::Gt | Self::Gte)
    }
}

/// Update actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence)]
pub enum ActionOperator {
    Set,
    Unset,
    Inc,
    Min,
    Max,
    Rename,
    Push,
    Add,
    Pop,
    Pull,
}

impl ActionOperator {
    pub fn token(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::Unset => "$unset",
            Self::Inc => "$inc",
            Self::Min => "$min",
            Self::Max => "$max",
            Self::Rename => "$rename",
            Self::Push => "$push",
            Self::Add => "$add",
            Self::Pop => "$pop",
            Self::Pull => "$pull",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|operator| operator.token() == token)
    }
}

/// Facet kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence)]
pub enum FacetKind {
    Terms,
    DateRange,
    Filters,
}

impl FacetKind {
    pub fn token(self) -> &'static str {
        match self {
            Self::Terms => "$terms",
            Self::DateRange => "$date_range",
            Self::Filters => "$filters",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|kind| kind.token() == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_query_operator_tokens_are_distinct() {
        let tokens = enum_iterator::all::<QueryOperator>()
            .map(QueryOperator::token)
            .collect::<BTreeSet<&str>>();
        assert_eq!(tokens.len(), enum_iterator::cardinality::<QueryOperator>());

        for operator in enum_iterator::all::<QueryOperator>() {
            assert_eq!(QueryOperator::from_token(operator.token()), Some(operator));
        }
    }

    #[test]
    fn test_range_operators_are_a_subset_of_query_operators() {
        for bound in enum_iterator::all::<RangeOperator>() {
            assert!(
                QueryOperator::from_token(bound.token()).is_some(),
                "The bound {bound:?} has no comparison counterpart."
            );
        }
    }

    #[test]
    fn test_unknown_tokens_are_rejected() {
        assert_eq!(QueryOperator::from_token("$like"), None);
        assert_eq!(ActionOperator::from_token("$addToSet"), None);
        assert_eq!(FacetKind::from_token("$histogram"), None);
    }
}
