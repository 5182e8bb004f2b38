//! Handle the translation of query nodes into native predicates.

use nonempty::NonEmpty;
use query_engine_dsl::dsl;
use query_engine_dsl::dsl::query::{ComparisonOperator, Query, QueryNode};
use query_engine_dsl::dsl::tokens::RangeOperator;
use query_engine_native::native;
use serde_json::Value;

use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// Translate a query node, and its children, into a native predicate.
/// Depth qualifiers are not part of the predicate; see 'scope'.
pub fn translate_expression(env: &Env, query: &Query) -> Result<native::ast::Expression, Error> {
    match query.node() {
        QueryNode::Exists(field) => Ok(native::ast::Expression::Exists {
            field: env.lookup_queried_field(field)?,
            exists: true,
        }),
        QueryNode::Missing(field) => {
            warn_unindexed(query, field);
            Ok(native::ast::Expression::Exists {
                field: env.lookup_queried_field(field)?,
                exists: false,
            })
        }
        QueryNode::IsNull(field) => {
            warn_unindexed(query, field);
            Ok(native::helpers::compare(
                env.lookup_queried_field(field)?,
                native::ast::ComparisonOperator::Equal,
                Value::Null,
            ))
        }
        QueryNode::In { field, values } => Ok(native::ast::Expression::ArrayComparison {
            field: env.lookup_queried_field(field)?,
            operator: native::ast::ArrayOperator::In,
            values: values.iter().cloned().collect(),
        }),
        QueryNode::Nin { field, values } => Ok(native::ast::Expression::ArrayComparison {
            field: env.lookup_queried_field(field)?,
            operator: native::ast::ArrayOperator::NotIn,
            values: values.iter().cloned().collect(),
        }),
        QueryNode::Size { field, size } => {
            warn_unindexed(query, field);
            Ok(native::ast::Expression::Size {
                field: env.lookup_queried_field(field)?,
                size: *size,
            })
        }
        QueryNode::Comparison {
            field,
            operator,
            value,
        } => Ok(native::helpers::compare(
            env.lookup_queried_field(field)?,
            translate_comparison_operator(*operator),
            value.clone(),
        )),
        QueryNode::Range { field, bounds } => Ok(native::ast::Expression::Range {
            field: env.lookup_queried_field(field)?,
            bounds: bounds
                .iter()
                .map(|bound| (translate_range_operator(bound.operator), bound.value.clone()))
                .collect(),
        }),
        QueryNode::Term { field, value } => Ok(native::ast::Expression::Term {
            field: env.lookup_queried_field(field)?,
            value: value.clone(),
        }),
        QueryNode::Regex { field, pattern } => {
            let field = env.lookup_queried_field(field)?;
            if field == env.id_field() {
                tracing::warn!(
                    field = %field.0,
                    "regular expression on the identifier scans the whole collection"
                );
            }
            Ok(native::ast::Expression::Regex {
                field,
                pattern: pattern.clone(),
            })
        }
        QueryNode::And(children) => Ok(native::ast::Expression::And(translate_children(
            env, children,
        )?)),
        QueryNode::Or(children) => Ok(native::ast::Expression::Or(translate_children(
            env, children,
        )?)),
        // Negate the conjunction of the children, not each child.
        QueryNode::Not(children) => {
            let mut children = translate_children(env, children)?;
            let negated = if children.len() == 1 {
                children.remove(0)
            } else {
                native::ast::Expression::And(children)
            };
            Ok(native::ast::Expression::Nor(vec![negated]))
        }
        QueryNode::Path(ids) => Ok(translate_path(env, ids.iter().map(String::as_str).collect())),
    }
}

fn translate_children(
    env: &Env,
    children: &NonEmpty<Query>,
) -> Result<Vec<native::ast::Expression>, Error> {
    children
        .iter()
        .map(|child| translate_expression(env, child))
        .collect()
}

/// A path `[a, .., y, z]` selects `z`, provided `y` is its parent, and so on up to `a`.
pub fn translate_path(env: &Env, ids: Vec<&str>) -> native::ast::Expression {
    let mut ids = ids.into_iter().rev();
    let mut conditions = vec![];
    if let Some(last) = ids.next() {
        conditions.push(native::helpers::in_ids(
            env.id_field(),
            native::ast::IdSet::Literal(vec![last.to_string()]),
        ));
    }
    for (distance, ancestor) in (1..).zip(ids) {
        conditions.push(native::helpers::in_ids(
            env.ancestors_at_field(distance),
            native::ast::IdSet::Literal(vec![ancestor.to_string()]),
        ));
    }
    native::helpers::make_and(conditions)
}

fn translate_comparison_operator(operator: ComparisonOperator) -> native::ast::ComparisonOperator {
    match operator {
        ComparisonOperator::Eq => native::ast::ComparisonOperator::Equal,
        ComparisonOperator::Ne => native::ast::ComparisonOperator::NotEqual,
        ComparisonOperator::Gt => native::ast::ComparisonOperator::GreaterThan,
        ComparisonOperator::Gte => native::ast::ComparisonOperator::GreaterThanOrEqualTo,
        ComparisonOperator::Lt => native::ast::ComparisonOperator::LessThan,
        ComparisonOperator::Lte => native::ast::ComparisonOperator::LessThanOrEqualTo,
    }
}

fn translate_range_operator(operator: RangeOperator) -> native::ast::ComparisonOperator {
    match operator {
        RangeOperator::Gt => native::ast::ComparisonOperator::GreaterThan,
        RangeOperator::Gte => native::ast::ComparisonOperator::GreaterThanOrEqualTo,
        RangeOperator::Lt => native::ast::ComparisonOperator::LessThan,
        RangeOperator::Lte => native::ast::ComparisonOperator::LessThanOrEqualTo,
    }
}

/// These commands cannot use an index on the document store.
fn warn_unindexed(query: &Query, field: &dsl::query::FieldName) {
    tracing::warn!(
        operator = query.operator().token(),
        field = %field,
        "command cannot use an index"
    );
}
