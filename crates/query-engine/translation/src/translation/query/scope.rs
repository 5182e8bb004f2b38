//! Scopes: how the candidates of a step relate to the roots or to the previous step.
//!
//! Every unit carries its graph position: its parents, all its ancestors, its ancestors
//! grouped by distance and the smallest and largest depth it sits at, top level units being
//! at depth 0. Scopes are predicates over these fields.

use query_engine_dsl::dsl::query::{Depth, Query};
use query_engine_dsl::dsl::tokens::QueryOperator;
use query_engine_native::native;
use serde_json::Value;

use crate::translation::helpers::Env;

/// The scope of the first step, from the roots of the request.
///
/// Without roots, nothing but depth restricts the first step. With roots, the roots
/// themselves are candidates, as are their descendants within the first step's depth.
pub fn translate_roots(env: &Env, roots: &[String], first: Option<&Query>) -> native::ast::Expression {
    let depth = first.and_then(Query::depth);
    if roots.is_empty() {
        return match first {
            Some(query) if query.operator() == QueryOperator::Path => native::helpers::true_expr(),
            Some(_) => top_level_scope(env, depth),
            None => native::helpers::true_expr(),
        };
    }

    let anchor = native::ast::IdSet::Literal(roots.to_vec());
    let own = native::helpers::in_ids(env.id_field(), anchor.clone());
    match (first, depth) {
        (None, _) => own,
        (Some(query), _) if query.operator() == QueryOperator::Path => {
            native::helpers::make_or(vec![own, native::helpers::in_ids(env.ancestors_field(), anchor)])
        }
        // these already include the anchor itself
        (Some(_), Some(Depth::Relative(distance))) if distance <= 0 => {
            relative_scope(env, anchor, distance)
        }
        (Some(_), Some(Depth::Exact(depth))) => native::helpers::make_and(vec![
            depth_range(env, depth),
            native::helpers::make_or(vec![
                own,
                native::helpers::in_ids(env.ancestors_field(), anchor),
            ]),
        ]),
        (Some(_), depth) => native::helpers::make_or(vec![own, step_scope(env, anchor, depth)]),
    }
}

/// The scope of a step from the units matched by the step before it.
pub fn translate_step_scope(
    env: &Env,
    previous_step: usize,
    depth: Option<Depth>,
) -> native::ast::Expression {
    step_scope(env, native::ast::IdSet::StepResult(previous_step), depth)
}

fn step_scope(
    env: &Env,
    anchor: native::ast::IdSet,
    depth: Option<Depth>,
) -> native::ast::Expression {
    match depth {
        None => native::helpers::in_ids(env.ancestors_field(), anchor),
        Some(Depth::Relative(distance)) => relative_scope(env, anchor, distance),
        Some(Depth::Exact(depth)) => native::helpers::make_and(vec![
            depth_range(env, depth),
            native::helpers::in_ids(env.ancestors_field(), anchor),
        ]),
    }
}

fn relative_scope(env: &Env, anchor: native::ast::IdSet, distance: i32) -> native::ast::Expression {
    match distance {
        0 => native::helpers::in_ids(env.id_field(), anchor),
        1 => native::helpers::in_ids(env.parents_field(), anchor),
        // the anchor or one of its ancestors
        distance if distance < 0 => native::helpers::make_or(vec![
            native::helpers::in_ids(env.id_field(), anchor.clone()),
            native::helpers::in_ids(
                env.id_field(),
                native::ast::IdSet::Ancestors {
                    of: Box::new(anchor),
                    max_distance: distance.unsigned_abs(),
                },
            ),
        ]),
        // any descendant at most `distance` levels below the anchor
        distance => native::helpers::make_or(
            (1..=distance.unsigned_abs())
                .map(|level| native::helpers::in_ids(env.ancestors_at_field(level), anchor.clone()))
                .collect(),
        ),
    }
}

/// Without roots, relative depths count from the top of the graph.
fn top_level_scope(env: &Env, depth: Option<Depth>) -> native::ast::Expression {
    match depth {
        None => native::helpers::true_expr(),
        Some(Depth::Exact(depth)) => depth_range(env, depth),
        Some(Depth::Relative(distance)) => native::helpers::compare(
            env.min_depth_field(),
            native::ast::ComparisonOperator::LessThanOrEqualTo,
            Value::from((i64::from(distance) - 1).max(0)),
        ),
    }
}

/// Units that can sit at `depth`: one of their paths from the top is that long.
fn depth_range(env: &Env, depth: u32) -> native::ast::Expression {
    native::ast::Expression::And(vec![
        native::helpers::compare(
            env.min_depth_field(),
            native::ast::ComparisonOperator::LessThanOrEqualTo,
            Value::from(depth),
        ),
        native::helpers::compare(
            env.max_depth_field(),
            native::ast::ComparisonOperator::GreaterThanOrEqualTo,
            Value::from(depth),
        ),
    ])
}

/// The depth reached after a step, given the depth reached before it.
///
/// A path ends as deep as it is long, an exact depth resets the count, a relative depth
/// adds to it and an unqualified step counts as one level.
pub fn next_depth(last_depth: i64, query: &Query) -> i64 {
    if let query_engine_dsl::dsl::query::QueryNode::Path(ids) = query.node() {
        return i64::try_from(ids.len()).unwrap_or(i64::MAX);
    }
    match query.depth() {
        Some(Depth::Exact(depth)) => i64::from(depth),
        Some(Depth::Relative(distance)) => last_depth + i64::from(distance),
        None => last_depth + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_query_configuration::Configuration;
    use serde_json::json;

    fn exists() -> Query {
        Query::exists("Title").unwrap()
    }

    #[test]
    fn test_relative_depths() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);

        let same = translate_step_scope(&env, 0, Some(Depth::Relative(0)));
        assert_eq!(same.to_json(), json!({"_id": {"$in": {"$step": 0}}}));

        let children = translate_step_scope(&env, 0, Some(Depth::Relative(1)));
        assert_eq!(children.to_json(), json!({"_up": {"$in": {"$step": 0}}}));

        let within_two = translate_step_scope(&env, 1, Some(Depth::Relative(2)));
        assert_eq!(
            within_two.to_json(),
            json!({"$or": [
                {"_uds.1": {"$in": {"$step": 1}}},
                {"_uds.2": {"$in": {"$step": 1}}}
            ]})
        );

        let unrestricted = translate_step_scope(&env, 0, None);
        assert_eq!(unrestricted.to_json(), json!({"_us": {"$in": {"$step": 0}}}));
    }

    #[test]
    fn test_negative_depth_searches_at_or_above() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let scope = translate_step_scope(&env, 0, Some(Depth::Relative(-1)));
        assert_eq!(
            scope.to_json(),
            json!({"$or": [
                {"_id": {"$in": {"$step": 0}}},
                {"_id": {"$in": {"$ancestors": {"$of": {"$step": 0}, "$depth": 1}}}}
            ]})
        );
    }

    #[test]
    fn test_exact_depth_ignores_previous_depth() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let scope = translate_step_scope(&env, 2, Some(Depth::Exact(4)));
        assert_eq!(
            scope.to_json(),
            json!({"$and": [
                {"_min": {"$lte": 4}},
                {"_max": {"$gte": 4}},
                {"_us": {"$in": {"$step": 2}}}
            ]})
        );
    }

    #[test]
    fn test_roots_without_query() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let scope = translate_roots(&env, &["id0".to_string()], None);
        assert_eq!(scope.to_json(), json!({"_id": {"$in": ["id0"]}}));
        assert_eq!(translate_roots(&env, &[], None), native::ast::Expression::True);
    }

    #[test]
    fn test_no_roots_counts_from_the_top() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let first = exists().with_depth(2).unwrap();
        assert_eq!(
            translate_roots(&env, &[], Some(&first)).to_json(),
            json!({"_min": {"$lte": 1}})
        );
        assert_eq!(
            translate_roots(&env, &[], Some(&exists())),
            native::ast::Expression::True
        );
    }

    #[test]
    fn test_next_depth() {
        let path = Query::path(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        assert_eq!(next_depth(0, &path), 3);
        assert_eq!(next_depth(3, &exists()), 4);
        assert_eq!(next_depth(4, &exists().with_depth(-2).unwrap()), 2);
        assert_eq!(next_depth(7, &exists().with_exact_depth(2).unwrap()), 2);
    }
}
