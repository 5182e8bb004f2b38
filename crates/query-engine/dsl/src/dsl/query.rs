//! Query nodes and their depth qualifiers.

use std::fmt;

use nonempty::NonEmpty;
use serde_json::{Map, Value};

use super::error::Error;
use super::tokens::{self, QueryOperator, RangeOperator};

/// The name of a document field. Dotted names address sub-documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldName(pub String);

impl FieldName {
    /// Validate a field name. `context` names the construct the field belongs to.
    pub fn new(context: &str, name: &str) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() {
            Err(Error::validation(context, "field name is empty"))
        } else {
            Ok(FieldName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let FieldName(name) = self;
        write!(f, "{name}")
    }
}

/// Graph distance between the candidates of a step and the scope it starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// `$depth`: hops below the previous scope. Zero means the scope itself, negative values
    /// search upwards.
    Relative(i32),
    /// `$exactdepth`: absolute depth counted from the top of the graph.
    Exact(u32),
}

/// Operators comparing a field with a single literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOperator {
    pub fn query_operator(self) -> QueryOperator {
        match self {
            Self::Eq => QueryOperator::Eq,
            Self::Ne => QueryOperator::Ne,
            Self::Gt => QueryOperator::Gt,
            Self::Gte => QueryOperator::Gte,
            Self::Lt => QueryOperator::Lt,
            Self::Lte => QueryOperator::Lte,
        }
    }

    pub fn from_query_operator(operator: QueryOperator) -> Option<Self> {
        match operator {
            QueryOperator::Eq => Some(Self::Eq),
            QueryOperator::Ne => Some(Self::Ne),
            QueryOperator::Gt => Some(Self::Gt),
            QueryOperator::Gte => Some(Self::Gte),
            QueryOperator::Lt => Some(Self::Lt),
            QueryOperator::Lte => Some(Self::Lte),
            _ => None,
        }
    }
}

/// One side of a `$range`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub operator: RangeOperator,
    pub value: Value,
}

/// The operator of a query and its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Exists(FieldName),
    Missing(FieldName),
    IsNull(FieldName),
    In {
        field: FieldName,
        values: NonEmpty<Value>,
    },
    Nin {
        field: FieldName,
        values: NonEmpty<Value>,
    },
    Size {
        field: FieldName,
        size: u64,
    },
    Comparison {
        field: FieldName,
        operator: ComparisonOperator,
        value: Value,
    },
    Range {
        field: FieldName,
        bounds: NonEmpty<RangeBound>,
    },
    /// Match against the analyzed form of a text field.
    Term {
        field: FieldName,
        value: String,
    },
    Regex {
        field: FieldName,
        pattern: String,
    },
    And(NonEmpty<Query>),
    Or(NonEmpty<Query>),
    /// Negates the conjunction of its children.
    Not(NonEmpty<Query>),
    /// Identifiers of units, each one a parent of the next.
    Path(NonEmpty<String>),
}

impl QueryNode {
    pub fn operator(&self) -> QueryOperator {
        match self {
            QueryNode::Exists(_) => QueryOperator::Exists,
            QueryNode::Missing(_) => QueryOperator::Missing,
            QueryNode::IsNull(_) => QueryOperator::IsNull,
            QueryNode::In { .. } => QueryOperator::In,
            QueryNode::Nin { .. } => QueryOperator::Nin,
            QueryNode::Size { .. } => QueryOperator::Size,
            QueryNode::Comparison { operator, .. } => operator.query_operator(),
            QueryNode::Range { .. } => QueryOperator::Range,
            QueryNode::Term { .. } => QueryOperator::Term,
            QueryNode::Regex { .. } => QueryOperator::Regex,
            QueryNode::And(_) => QueryOperator::And,
            QueryNode::Or(_) => QueryOperator::Or,
            QueryNode::Not(_) => QueryOperator::Not,
            QueryNode::Path(_) => QueryOperator::Path,
        }
    }
}

/// A query node together with the depth qualifier it was declared with.
///
/// Only the qualifier of a step's outermost node is meaningful; nested qualifiers are kept
/// but have no effect on the compiled scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    node: Box<QueryNode>,
    depth: Option<Depth>,
}

impl Query {
    fn new(node: QueryNode) -> Self {
        Query {
            node: Box::new(node),
            depth: None,
        }
    }

    pub fn exists(field: &str) -> Result<Self, Error> {
        let field = FieldName::new(QueryOperator::Exists.token(), field)?;
        Ok(Self::new(QueryNode::Exists(field)))
    }

    pub fn missing(field: &str) -> Result<Self, Error> {
        let field = FieldName::new(QueryOperator::Missing.token(), field)?;
        Ok(Self::new(QueryNode::Missing(field)))
    }

    pub fn is_null(field: &str) -> Result<Self, Error> {
        let field = FieldName::new(QueryOperator::IsNull.token(), field)?;
        Ok(Self::new(QueryNode::IsNull(field)))
    }

    pub fn is_in(field: &str, values: Vec<Value>) -> Result<Self, Error> {
        let context = QueryOperator::In.token();
        Ok(Self::new(QueryNode::In {
            field: FieldName::new(context, field)?,
            values: literals(context, values)?,
        }))
    }

    pub fn not_in(field: &str, values: Vec<Value>) -> Result<Self, Error> {
        let context = QueryOperator::Nin.token();
        Ok(Self::new(QueryNode::Nin {
            field: FieldName::new(context, field)?,
            values: literals(context, values)?,
        }))
    }

    pub fn size(field: &str, size: i64) -> Result<Self, Error> {
        let context = QueryOperator::Size.token();
        let field = FieldName::new(context, field)?;
        let size = u64::try_from(size)
            .map_err(|_| Error::validation(context, format!("size {size} is negative")))?;
        Ok(Self::new(QueryNode::Size { field, size }))
    }

    pub fn compare(operator: ComparisonOperator, field: &str, value: Value) -> Result<Self, Error> {
        let context = operator.query_operator().token();
        Ok(Self::new(QueryNode::Comparison {
            field: FieldName::new(context, field)?,
            operator,
            value: literal(context, value)?,
        }))
    }

    pub fn eq(field: &str, value: Value) -> Result<Self, Error> {
        Self::compare(ComparisonOperator::Eq, field, value)
    }

    pub fn range(field: &str, bounds: Vec<(RangeOperator, Value)>) -> Result<Self, Error> {
        let context = QueryOperator::Range.token();
        let field = FieldName::new(context, field)?;
        let mut lower = None;
        let mut upper = None;
        let mut checked = Vec::with_capacity(bounds.len());
        for (operator, value) in bounds {
            let side = if operator.is_lower() {
                &mut lower
            } else {
                &mut upper
            };
            if let Some(previous) = side.replace(operator) {
                return Err(Error::validation(
                    context,
                    format!(
                        "{} conflicts with {} on field {field}",
                        operator.token(),
                        RangeOperator::token(previous)
                    ),
                ));
            }
            checked.push(RangeBound {
                operator,
                value: literal(context, value)?,
            });
        }
        let bounds = NonEmpty::from_vec(checked)
            .ok_or_else(|| Error::validation(context, "at least one bound is required"))?;
        Ok(Self::new(QueryNode::Range { field, bounds }))
    }

    pub fn term(field: &str, value: &str) -> Result<Self, Error> {
        let field = FieldName::new(QueryOperator::Term.token(), field)?;
        Ok(Self::new(QueryNode::Term {
            field,
            value: value.to_string(),
        }))
    }

    pub fn regex(field: &str, pattern: &str) -> Result<Self, Error> {
        let context = QueryOperator::Regex.token();
        let field = FieldName::new(context, field)?;
        if pattern.is_empty() {
            return Err(Error::validation(context, "pattern is empty"));
        }
        Ok(Self::new(QueryNode::Regex {
            field,
            pattern: pattern.to_string(),
        }))
    }

    pub fn and(children: Vec<Query>) -> Result<Self, Error> {
        Ok(Self::new(QueryNode::And(children_of(
            QueryOperator::And,
            children,
        )?)))
    }

    pub fn or(children: Vec<Query>) -> Result<Self, Error> {
        Ok(Self::new(QueryNode::Or(children_of(
            QueryOperator::Or,
            children,
        )?)))
    }

    pub fn not(children: Vec<Query>) -> Result<Self, Error> {
        Ok(Self::new(QueryNode::Not(children_of(
            QueryOperator::Not,
            children,
        )?)))
    }

    pub fn path(ids: Vec<String>) -> Result<Self, Error> {
        let context = QueryOperator::Path.token();
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(Error::validation(context, "identifiers cannot be empty"));
        }
        let ids = NonEmpty::from_vec(ids)
            .ok_or_else(|| Error::validation(context, "at least one identifier is required"))?;
        Ok(Self::new(QueryNode::Path(ids)))
    }

    /// Attach a `$depth` qualifier, at most [`tokens::MAX_DEPTH`] hops either way.
    pub fn with_depth(self, depth: i64) -> Result<Self, Error> {
        let depth = i32::try_from(depth)
            .ok()
            .filter(|depth| depth.unsigned_abs() <= tokens::MAX_DEPTH)
            .ok_or_else(|| out_of_range(tokens::DEPTH, depth))?;
        self.qualify(tokens::DEPTH, Depth::Relative(depth))
    }

    /// Attach an `$exactdepth` qualifier.
    pub fn with_exact_depth(self, depth: i64) -> Result<Self, Error> {
        let depth = u32::try_from(depth)
            .ok()
            .filter(|depth| *depth <= tokens::MAX_DEPTH)
            .ok_or_else(|| out_of_range(tokens::EXACT_DEPTH, depth))?;
        self.qualify(tokens::EXACT_DEPTH, Depth::Exact(depth))
    }

    fn qualify(mut self, token: &str, depth: Depth) -> Result<Self, Error> {
        if let QueryNode::Path(_) = *self.node {
            return Err(Error::validation(
                token,
                "a $path query cannot carry a depth qualifier",
            ));
        }
        match self.depth {
            Some(Depth::Relative(_)) => Err(Error::validation(
                token,
                "the query already carries a $depth",
            )),
            Some(Depth::Exact(_)) => Err(Error::validation(
                token,
                "the query already carries an $exactdepth",
            )),
            None => {
                self.depth = Some(depth);
                Ok(self)
            }
        }
    }

    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    pub fn depth(&self) -> Option<Depth> {
        self.depth
    }

    pub fn operator(&self) -> QueryOperator {
        self.node.operator()
    }

    /// Whether this query, or any of its children, needs the full-text index.
    pub fn is_full_text(&self) -> bool {
        match self.node.as_ref() {
            QueryNode::Term { .. } | QueryNode::Regex { .. } => true,
            QueryNode::And(children) | QueryNode::Or(children) | QueryNode::Not(children) => {
                children.iter().any(Query::is_full_text)
            }
            _ => false,
        }
    }

    /// The query in its request form.
    pub fn to_json(&self) -> Value {
        let operator = self.operator().token();
        let operand = match self.node.as_ref() {
            QueryNode::Exists(field) | QueryNode::Missing(field) | QueryNode::IsNull(field) => {
                Value::String(field.to_string())
            }
            QueryNode::In { field, values } | QueryNode::Nin { field, values } => {
                single(field.as_str(), Value::Array(values.iter().cloned().collect()))
            }
            QueryNode::Size { field, size } => single(field.as_str(), Value::from(*size)),
            QueryNode::Comparison { field, value, .. } => single(field.as_str(), value.clone()),
            QueryNode::Range { field, bounds } => {
                let bounds = bounds
                    .iter()
                    .map(|bound| (bound.operator.token().to_string(), bound.value.clone()))
                    .collect::<Map<String, Value>>();
                single(field.as_str(), Value::Object(bounds))
            }
            QueryNode::Term { field, value } => {
                single(field.as_str(), Value::String(value.clone()))
            }
            QueryNode::Regex { field, pattern } => {
                single(field.as_str(), Value::String(pattern.clone()))
            }
            QueryNode::And(children) | QueryNode::Or(children) | QueryNode::Not(children) => {
                Value::Array(children.iter().map(Query::to_json).collect())
            }
            QueryNode::Path(ids) => Value::Array(ids.iter().cloned().map(Value::String).collect()),
        };
        let mut object = Map::new();
        object.insert(operator.to_string(), operand);
        match self.depth {
            Some(Depth::Relative(depth)) => {
                object.insert(tokens::DEPTH.to_string(), Value::from(depth));
            }
            Some(Depth::Exact(depth)) => {
                object.insert(tokens::EXACT_DEPTH.to_string(), Value::from(depth));
            }
            None => {}
        }
        Value::Object(object)
    }
}

fn out_of_range(token: &str, depth: i64) -> Error {
    Error::validation(
        token,
        format!("{depth} is outside of -{max}..={max}", max = tokens::MAX_DEPTH),
    )
}

/// A single-entry JSON object.
pub fn single(key: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Value::Object(object)
}

/// Literals are JSON scalars.
fn literal(context: &str, value: Value) -> Result<Value, Error> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(Error::validation(
            context,
            format!("expected a literal value, got {value}"),
        )),
        scalar => Ok(scalar),
    }
}

fn literals(context: &str, values: Vec<Value>) -> Result<NonEmpty<Value>, Error> {
    let values = values
        .into_iter()
        .map(|value| literal(context, value))
        .collect::<Result<Vec<Value>, Error>>()?;
    NonEmpty::from_vec(values).ok_or_else(|| Error::validation(context, "no values given"))
}

fn children_of(operator: QueryOperator, children: Vec<Query>) -> Result<NonEmpty<Query>, Error> {
    if children
        .iter()
        .any(|child| child.operator() == QueryOperator::Path)
    {
        return Err(Error::validation(
            operator.token(),
            "a $path query cannot be nested",
        ));
    }
    NonEmpty::from_vec(children)
        .ok_or_else(|| Error::validation(operator.token(), "at least one sub-query is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_depth_qualifiers_are_exclusive() {
        let query = Query::exists("title")
            .and_then(|query| query.with_depth(2))
            .unwrap();
        assert_eq!(query.depth(), Some(Depth::Relative(2)));

        let error = query.with_exact_depth(3).unwrap_err();
        assert!(matches!(error, Error::Validation { field, .. } if field == "$exactdepth"));
    }

    #[test]
    fn test_path_refuses_depth() {
        let path = Query::path(vec!["id1".into(), "id2".into()]).unwrap();
        assert!(path.clone().with_depth(1).is_err());
        assert!(path.with_exact_depth(1).is_err());
    }

    #[test]
    fn test_negative_exact_depth_is_rejected() {
        assert!(Query::exists("title").unwrap().with_exact_depth(-1).is_err());
    }

    #[test]
    fn test_one_qualifier_per_query() {
        let query = Query::exists("title").unwrap().with_depth(2).unwrap();
        let error = query.clone().with_depth(3).unwrap_err();
        assert!(matches!(error, Error::Validation { field, .. } if field == "$depth"));
        assert_eq!(query.depth(), Some(Depth::Relative(2)));

        let exact = Query::exists("title").unwrap().with_exact_depth(1).unwrap();
        assert!(exact.with_exact_depth(2).is_err());
    }

    #[test]
    fn test_depth_is_bounded() {
        let max = i64::from(tokens::MAX_DEPTH);
        let query = Query::exists("title").unwrap();
        assert!(query.clone().with_depth(max).is_ok());
        assert!(query.clone().with_depth(-max).is_ok());
        assert!(query.clone().with_exact_depth(max).is_ok());

        for depth in [max + 1, -max - 1, 50_000_000, i64::MAX] {
            let error = query.clone().with_depth(depth).unwrap_err();
            assert!(matches!(error, Error::Validation { field, .. } if field == "$depth"));
        }
        assert!(query.with_exact_depth(max + 1).is_err());
    }

    #[test]
    fn test_empty_operands_are_rejected() {
        assert!(Query::and(vec![]).is_err());
        assert!(Query::is_in("field", vec![]).is_err());
        assert!(Query::path(vec![]).is_err());
        assert!(Query::range("field", vec![]).is_err());
        assert!(Query::exists("  ").is_err());
        assert!(Query::size("field", -1).is_err());
    }

    #[test]
    fn test_literals_must_be_scalars() {
        assert!(Query::eq("field", json!([1, 2])).is_err());
        assert!(Query::is_in("field", vec![json!(1), json!({"a": 1})]).is_err());
        assert!(Query::eq("field", json!(null)).is_ok());
    }

    #[test]
    fn test_range_bounds_cannot_overlap() {
        let error = Query::range(
            "date",
            vec![(RangeOperator::Gt, json!(1)), (RangeOperator::Gte, json!(2))],
        );
        assert!(error.is_err());

        let range = Query::range(
            "date",
            vec![(RangeOperator::Gte, json!(1)), (RangeOperator::Lt, json!(5))],
        )
        .unwrap();
        assert_eq!(
            range.to_json(),
            json!({"$range": {"date": {"$gte": 1, "$lt": 5}}})
        );
    }

    #[test]
    fn test_full_text_is_found_in_children() {
        let query = Query::or(vec![
            Query::exists("a").unwrap(),
            Query::not(vec![Query::regex("title", "^arch").unwrap()]).unwrap(),
        ])
        .unwrap();
        assert!(query.is_full_text());
        assert!(!Query::exists("a").unwrap().is_full_text());
    }

    #[test]
    fn test_to_json_keeps_depth() {
        let query = Query::and(vec![
            Query::exists("mavar1").unwrap(),
            Query::missing("mavar2").unwrap(),
        ])
        .and_then(|query| query.with_depth(-1))
        .unwrap();
        assert_eq!(
            query.to_json(),
            json!({"$and": [{"$exists": "mavar1"}, {"$missing": "mavar2"}], "$depth": -1})
        );
    }
}
