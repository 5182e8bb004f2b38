//! Helpers for building native::ast types in certain shapes and patterns.

use super::ast::*;
use serde_json::Value;

// Empty clauses //

/// A predicate matching everything.
pub fn true_expr() -> Expression {
    Expression::True
}

/// An empty sort.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// No offset and no limit.
pub fn empty_limit() -> Limit {
    Limit {
        limit: None,
        offset: None,
    }
}

/// A projection returning whole documents.
pub fn empty_projection() -> Projection {
    Projection { fields: vec![] }
}

/// An update changing nothing.
pub fn empty_update() -> Update {
    Update { operations: vec![] }
}

// Fields //

pub fn make_field(name: &str) -> FieldName {
    FieldName(name.to_string())
}

/// A field of a sub-document, such as `_uds.2`.
pub fn make_sub_field(parent: &FieldName, child: &str) -> FieldName {
    FieldName(format!("{}.{child}", parent.0))
}

// Boolean combinators //

/// Conjunction of expressions. Nested conjunctions are flattened and trivially true
/// members dropped.
pub fn make_and(expressions: Vec<Expression>) -> Expression {
    let mut flat = Vec::with_capacity(expressions.len());
    for expression in expressions {
        match expression {
            Expression::True => {}
            Expression::And(children) => flat.extend(children),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => true_expr(),
        1 => flat.remove(0),
        _ => Expression::And(flat),
    }
}

/// Disjunction of expressions. Nested disjunctions are flattened, a trivially true member
/// makes the whole disjunction true, and a single member is returned as is.
pub fn make_or(expressions: Vec<Expression>) -> Expression {
    let mut flat = Vec::with_capacity(expressions.len());
    for expression in expressions {
        match expression {
            Expression::True => return true_expr(),
            Expression::Or(children) => flat.extend(children),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => false_expr(),
        1 => flat.remove(0),
        _ => Expression::Or(flat),
    }
}

/// A predicate matching nothing. The store refuses an empty `$or`.
pub fn false_expr() -> Expression {
    Expression::Nor(vec![true_expr()])
}

// Predicates //

pub fn in_ids(field: FieldName, ids: IdSet) -> Expression {
    Expression::InIds { field, ids }
}

pub fn compare(field: FieldName, operator: ComparisonOperator, value: Value) -> Expression {
    Expression::Comparison {
        field,
        operator,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_and_flattens() {
        let a = compare(make_field("a"), ComparisonOperator::Equal, Value::from(1));
        let b = compare(make_field("b"), ComparisonOperator::Equal, Value::from(2));
        let nested = make_and(vec![a.clone(), true_expr()]);
        assert_eq!(nested, a);

        let flat = make_and(vec![Expression::And(vec![a.clone()]), b.clone()]);
        assert_eq!(flat, Expression::And(vec![a, b]));

        assert_eq!(make_and(vec![]), Expression::True);
    }

    #[test]
    fn test_make_or_flattens() {
        let a = in_ids(make_field("_id"), IdSet::Literal(vec!["id0".to_string()]));
        let b = in_ids(make_field("_uds.1"), IdSet::Literal(vec!["id0".to_string()]));
        let c = in_ids(make_field("_uds.2"), IdSet::Literal(vec!["id0".to_string()]));
        assert_eq!(
            make_or(vec![a.clone(), Expression::Or(vec![b.clone(), c.clone()])]),
            Expression::Or(vec![a.clone(), b, c])
        );
        assert_eq!(make_or(vec![a.clone()]), a);
    }

    #[test]
    fn test_make_or_edge_cases() {
        let a = in_ids(make_field("_id"), IdSet::Literal(vec!["id0".to_string()]));
        assert_eq!(make_or(vec![a, true_expr()]), Expression::True);
        assert_eq!(make_or(vec![]), false_expr());
        assert_eq!(
            make_or(vec![Expression::Or(vec![])]).to_json(),
            serde_json::json!({"$nor": [{}]})
        );
    }

    #[test]
    fn test_sub_field() {
        assert_eq!(make_sub_field(&make_field("_uds"), "2").0, "_uds.2");
    }
}
