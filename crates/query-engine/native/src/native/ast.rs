//! Type definitions of the document store's native query representation.

use serde_json::Value;

/// The name of a field as stored in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldName(pub String);

/// A predicate over documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    /// Matches documents matching none of the expressions.
    Nor(Vec<Expression>),
    /// Matches every document.
    True,
    Exists {
        field: FieldName,
        exists: bool,
    },
    Comparison {
        field: FieldName,
        operator: ComparisonOperator,
        value: Value,
    },
    ArrayComparison {
        field: FieldName,
        operator: ArrayOperator,
        values: Vec<Value>,
    },
    Size {
        field: FieldName,
        size: u64,
    },
    /// Bounds on a single field. Lower and upper bounds are optional but not both absent.
    Range {
        field: FieldName,
        bounds: Vec<(ComparisonOperator, Value)>,
    },
    Regex {
        field: FieldName,
        pattern: String,
    },
    /// Exact match on the indexed form of a field.
    Term {
        field: FieldName,
        value: String,
    },
    /// The field holds one of the identifiers of the set.
    InIds {
        field: FieldName,
        ids: IdSet,
    },
}

/// A comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

/// An operator comparing a field with a list of values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOperator {
    In,
    NotIn,
}

/// A set of unit identifiers a step is anchored on.
#[derive(Debug, Clone, PartialEq)]
pub enum IdSet {
    /// Identifiers known when the request is compiled.
    Literal(Vec<String>),
    /// Identifiers matched by an earlier step of the same request. The driver substitutes them
    /// once that step has run.
    StepResult(usize),
    /// Ancestors of the units of a set, up to `max_distance` levels above them.
    Ancestors { of: Box<IdSet>, max_distance: u32 },
}

/// Sorting of the results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

/// A single element of the sort
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub field: FieldName,
    pub direction: OrderByDirection,
}

/// A direction for a single sort element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// How many results to skip and return.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Limit {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// A cursor continuing an earlier select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scroll {
    pub id: String,
    pub timeout: Option<u64>,
}

/// Paging of the results. A scroll replaces the offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paging {
    pub limit: Limit,
    pub scroll: Option<Scroll>,
}

/// Fields returned by a select. An empty projection returns whole documents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub fields: Vec<(FieldName, ProjectionValue)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionValue {
    Exclude,
    Include,
    Slice(i64),
    SliceSkipLimit { skip: i64, limit: u64 },
}

/// Update operators of the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperator {
    Set,
    Unset,
    Inc,
    Min,
    Max,
    Rename,
    Push,
    AddToSet,
    Pop,
    PullAll,
}

/// One update operator applied to a set of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    pub operator: UpdateOperator,
    pub fields: Vec<(FieldName, Value)>,
}

/// An update document, one entry per operator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    pub operations: Vec<UpdateOperation>,
}

/// A named aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub name: String,
    pub kind: AggregationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    Terms {
        field: FieldName,
        size: u32,
        order: OrderByDirection,
    },
    DateRange {
        field: FieldName,
        format: String,
        ranges: Vec<DateRangeBucket>,
    },
    Filters {
        filters: Vec<(String, Expression)>,
    },
    /// Runs the inner aggregation over the sub-documents found at `path`.
    Nested {
        path: FieldName,
        aggregation: Box<Aggregation>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangeBucket {
    pub from: Option<String>,
    pub to: Option<String>,
}
