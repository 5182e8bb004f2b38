//! Build requests from their JSON form.
//!
//! Shape problems (a string where an object is expected, unknown keywords) are reported as
//! parse errors; everything else is checked by the constructors the reader calls.

use serde_json::{Map, Value};

use super::action::Action;
use super::error::Error;
use super::facet::{BucketOrder, DateRange, Facet};
use super::filter::{Direction, Filter};
use super::projection::{FieldProjection, Projection, Slice};
use super::query::{ComparisonOperator, Query};
use super::request::{Request, RequestKind};
use super::tokens::{self, ActionOperator, FacetKind, QueryOperator, RangeOperator};

/// Read a whole request of the given kind.
pub fn request(kind: RequestKind, value: &Value) -> Result<Request, Error> {
    let object = as_object("request", value)?;
    let sections: &[&str] = match kind {
        RequestKind::Select => &[
            tokens::ROOTS,
            tokens::QUERY,
            tokens::FILTER,
            tokens::PROJECTION,
            tokens::FACETS,
        ],
        RequestKind::Insert => &[tokens::ROOTS, tokens::QUERY, tokens::FILTER, tokens::DATA],
        RequestKind::Update => &[tokens::ROOTS, tokens::QUERY, tokens::FILTER, tokens::ACTION],
        RequestKind::Delete => &[tokens::ROOTS, tokens::QUERY, tokens::FILTER],
    };
    if let Some(unknown) = object.keys().find(|key| !sections.contains(&key.as_str())) {
        return Err(Error::parse(
            "request",
            format!("unexpected section {unknown} in a {kind:?} request"),
        ));
    }

    let mut request = Request::new(kind);
    if let Some(roots) = object.get(tokens::ROOTS) {
        let roots = as_array(tokens::ROOTS, roots)?
            .iter()
            .map(|root| as_str(tokens::ROOTS, root))
            .collect::<Result<Vec<&str>, Error>>()?;
        request.core_mut().add_roots(roots)?;
    }
    if let Some(queries) = object.get(tokens::QUERY) {
        for step in one_or_many(queries) {
            request.core_mut().add_query(query(step)?)?;
        }
    }
    if let Some(filter) = object.get(tokens::FILTER) {
        request.parse_filter(filter)?;
    }

    match &mut request {
        Request::Select(select) => {
            if let Some(value) = object.get(tokens::PROJECTION) {
                select.set_projection(projection(value)?);
            }
            if let Some(facets) = object.get(tokens::FACETS) {
                for value in as_array(tokens::FACETS, facets)? {
                    select.add_facet(facet(value)?)?;
                }
            }
        }
        Request::Insert(insert) => {
            if let Some(data) = object.get(tokens::DATA) {
                insert.set_data(data.clone())?;
            }
        }
        Request::Update(update) => {
            if let Some(value) = object.get(tokens::ACTION) {
                for action in actions(value)? {
                    update.add_action(action);
                }
            }
        }
        Request::Delete(_) => {}
    }
    request.check_complete()?;
    tracing::debug!(
        kind = kind.name(),
        nb_queries = request.core().nb_queries(),
        "request parsed"
    );
    Ok(request)
}

/// Read one query step: a single operator, optionally qualified with `$depth` or
/// `$exactdepth`.
pub fn query(value: &Value) -> Result<Query, Error> {
    let object = as_object(tokens::QUERY, value)?;
    let mut operator = None;
    let mut depth = None;
    let mut exact_depth = None;
    for (key, operand) in object {
        match key.as_str() {
            tokens::DEPTH => depth = Some(as_i64(tokens::DEPTH, operand)?),
            tokens::EXACT_DEPTH => exact_depth = Some(as_i64(tokens::EXACT_DEPTH, operand)?),
            token => {
                let found = QueryOperator::from_token(token).ok_or_else(|| {
                    Error::parse(tokens::QUERY, format!("unknown operator {token}"))
                })?;
                if operator.replace((found, operand)).is_some() {
                    return Err(Error::parse(
                        tokens::QUERY,
                        "a query holds exactly one operator",
                    ));
                }
            }
        }
    }
    let (operator, operand) =
        operator.ok_or_else(|| Error::parse(tokens::QUERY, "no operator found"))?;

    let mut query = node(operator, operand)?;
    if let Some(depth) = depth {
        query = query.with_depth(depth)?;
    }
    if let Some(exact_depth) = exact_depth {
        query = query.with_exact_depth(exact_depth)?;
    }
    Ok(query)
}

fn node(operator: QueryOperator, operand: &Value) -> Result<Query, Error> {
    let context = operator.token();
    match operator {
        QueryOperator::Exists => Query::exists(as_str(context, operand)?),
        QueryOperator::Missing => Query::missing(as_str(context, operand)?),
        QueryOperator::IsNull => Query::is_null(as_str(context, operand)?),
        QueryOperator::In | QueryOperator::Nin => {
            let (field, values) = single_entry(context, operand)?;
            let values = as_array(context, values)?.clone();
            if operator == QueryOperator::In {
                Query::is_in(field, values)
            } else {
                Query::not_in(field, values)
            }
        }
        QueryOperator::Size => {
            let (field, size) = single_entry(context, operand)?;
            Query::size(field, as_i64(context, size)?)
        }
        QueryOperator::Eq
        | QueryOperator::Ne
        | QueryOperator::Gt
        | QueryOperator::Gte
        | QueryOperator::Lt
        | QueryOperator::Lte => {
            let (field, value) = single_entry(context, operand)?;
            let comparison = ComparisonOperator::from_query_operator(operator)
                .ok_or_else(|| Error::parse(context, "not a comparison"))?;
            Query::compare(comparison, field, value.clone())
        }
        QueryOperator::Range => {
            let (field, bounds) = single_entry(context, operand)?;
            let bounds = as_object(context, bounds)?
                .iter()
                .map(|(token, value)| {
                    RangeOperator::from_token(token)
                        .map(|bound| (bound, value.clone()))
                        .ok_or_else(|| Error::parse(context, format!("unknown bound {token}")))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Query::range(field, bounds)
        }
        QueryOperator::Term => {
            let (field, value) = single_entry(context, operand)?;
            Query::term(field, as_str(context, value)?)
        }
        QueryOperator::Regex => {
            let (field, pattern) = single_entry(context, operand)?;
            Query::regex(field, as_str(context, pattern)?)
        }
        QueryOperator::And | QueryOperator::Or | QueryOperator::Not => {
            let children = one_or_many(operand)
                .map(query)
                .collect::<Result<Vec<_>, Error>>()?;
            match operator {
                QueryOperator::And => Query::and(children),
                QueryOperator::Or => Query::or(children),
                _ => Query::not(children),
            }
        }
        QueryOperator::Path => {
            let ids = as_array(context, operand)?
                .iter()
                .map(|id| as_str(context, id).map(str::to_string))
                .collect::<Result<Vec<_>, Error>>()?;
            Query::path(ids)
        }
    }
}

/// Read a `$filter` object, accepting only the `allowed` keywords.
pub fn filter(value: &Value, allowed: &[&str]) -> Result<Filter, Error> {
    let object = as_object(tokens::FILTER, value)?;
    let mut filter = Filter::default();
    let mut scroll_id = None;
    let mut scroll_timeout = None;
    for (key, operand) in object {
        let key = key.as_str();
        if !RequestKind::Select.filter_tokens().contains(&key) {
            return Err(Error::parse(
                tokens::FILTER,
                format!("unknown keyword {key}"),
            ));
        }
        if !allowed.contains(&key) {
            return Err(Error::validation(
                tokens::FILTER,
                format!("{key} is not allowed in this request"),
            ));
        }
        match key {
            tokens::OFFSET => filter.offset = Some(as_u64(key, operand)?),
            tokens::LIMIT => filter.limit = Some(as_u64(key, operand)?),
            tokens::ORDER_BY => {
                for (field, direction) in as_object(key, operand)? {
                    let direction = Direction::from_number(field, as_i64(key, direction)?)?;
                    filter.add_order_by(field, direction)?;
                }
            }
            tokens::HINT => {
                for hint in one_or_many(operand) {
                    filter.add_hint(as_str(key, hint)?)?;
                }
            }
            tokens::SCROLL_ID => scroll_id = Some(as_str(key, operand)?),
            tokens::SCROLL_TIMEOUT => scroll_timeout = Some(as_u64(key, operand)?),
            tokens::MULT => {
                filter.multiple = Some(
                    operand
                        .as_bool()
                        .ok_or_else(|| Error::parse(key, format!("{operand} is not a boolean")))?,
                );
            }
            _ => {}
        }
    }
    match (scroll_id, scroll_timeout) {
        (Some(id), timeout) => filter.set_scroll(id, timeout)?,
        (None, Some(_)) => {
            return Err(Error::validation(
                tokens::SCROLL_TIMEOUT,
                "a scroll timeout needs a scroll id",
            ))
        }
        (None, None) => {}
    }
    Ok(filter)
}

/// Read a `$projection` object.
pub fn projection(value: &Value) -> Result<Projection, Error> {
    let object = as_object(tokens::PROJECTION, value)?;
    let mut projection = Projection::default();
    for (key, operand) in object {
        match key.as_str() {
            tokens::FIELDS => {
                for (field, flag) in as_object(tokens::FIELDS, operand)? {
                    projection.add_field(field, field_projection(flag)?)?;
                }
            }
            tokens::USAGE => {
                projection.usage = Some(as_str(tokens::USAGE, operand)?.to_string());
            }
            other => {
                return Err(Error::parse(
                    tokens::PROJECTION,
                    format!("unknown keyword {other}"),
                ))
            }
        }
    }
    Ok(projection)
}

fn field_projection(value: &Value) -> Result<FieldProjection, Error> {
    match value {
        Value::Number(number) => {
            let positive = number
                .as_i64()
                .map(|flag| flag > 0)
                .or_else(|| number.as_f64().map(|flag| flag > 0.0))
                .unwrap_or(true);
            Ok(FieldProjection::from_flag(i64::from(positive)))
        }
        Value::Bool(flag) => Ok(FieldProjection::from_flag(i64::from(*flag))),
        Value::Object(object) => match (object.len(), object.get(tokens::SLICE)) {
            (1, Some(Value::Number(count))) => count
                .as_i64()
                .map(|count| FieldProjection::Slice(Slice::Count(count)))
                .ok_or_else(|| Error::parse(tokens::SLICE, format!("{count} is not an integer"))),
            (1, Some(Value::Array(bounds))) => match bounds.as_slice() {
                [skip, limit] => {
                    let skip = as_i64(tokens::SLICE, skip)?;
                    let limit = as_i64(tokens::SLICE, limit)?;
                    FieldProjection::slice(skip, limit)
                        .map_err(|error| Error::parse(tokens::SLICE, error.to_string()))
                }
                _ => Err(Error::parse(
                    tokens::SLICE,
                    "expected [skip, limit]",
                )),
            },
            _ => Err(Error::parse(
                tokens::FIELDS,
                format!("unsupported projection {value}"),
            )),
        },
        other => Err(Error::parse(
            tokens::FIELDS,
            format!("unsupported projection {other}"),
        )),
    }
}

/// Read one facet: `{"$name": .., "$<kind>": {..}}`.
pub fn facet(value: &Value) -> Result<Facet, Error> {
    let object = as_object(tokens::FACETS, value)?;
    let name = match object.get(tokens::NAME) {
        Some(name) => as_str(tokens::NAME, name)?,
        None => "",
    };
    let mut body = None;
    for (key, operand) in object {
        if key == tokens::NAME {
            continue;
        }
        let kind = FacetKind::from_token(key)
            .ok_or_else(|| Error::parse(tokens::FACETS, format!("unknown facet kind {key}")))?;
        if body.replace((kind, operand)).is_some() {
            return Err(Error::parse(
                tokens::FACETS,
                "a facet holds exactly one kind",
            ));
        }
    }
    let (kind, body) = body.ok_or_else(|| Error::parse(tokens::FACETS, "no facet kind found"))?;
    let context = kind.token();
    let body = as_object(context, body)?;
    let field = optional_str(context, body, tokens::FIELD)?.unwrap_or_default();
    let nested = optional_str(context, body, tokens::SUBOBJECT)?;

    match kind {
        FacetKind::Terms => {
            let size = match body.get(tokens::SIZE) {
                Some(size) => as_i64(tokens::SIZE, size)?,
                None => 0,
            };
            let order = optional_str(context, body, tokens::ORDER)?
                .map(|order| {
                    BucketOrder::from_token(order).ok_or_else(|| {
                        Error::parse(tokens::ORDER, format!("{order} is not ASC or DESC"))
                    })
                })
                .transpose()?;
            Facet::terms(name, field, nested, size, order)
        }
        FacetKind::DateRange => {
            let format = optional_str(context, body, tokens::FORMAT)?.unwrap_or_default();
            let ranges = match body.get(tokens::RANGES) {
                Some(ranges) => as_array(tokens::RANGES, ranges)?
                    .iter()
                    .map(|range| {
                        let range = as_object(tokens::RANGES, range)?;
                        DateRange::new(
                            optional_str(tokens::RANGES, range, tokens::FROM)?.map(str::to_string),
                            optional_str(tokens::RANGES, range, tokens::TO)?.map(str::to_string),
                        )
                    })
                    .collect::<Result<Vec<_>, Error>>()?,
                None => vec![],
            };
            Facet::date_range(name, field, nested, format, ranges)
        }
        FacetKind::Filters => {
            let filters = match body.get(tokens::QUERY_FILTERS) {
                Some(filters) => as_array(tokens::QUERY_FILTERS, filters)?
                    .iter()
                    .map(|filter| -> Result<(String, Query), Error> {
                        let filter = as_object(tokens::QUERY_FILTERS, filter)?;
                        let filter_name = optional_str(tokens::QUERY_FILTERS, filter, tokens::NAME)?
                            .unwrap_or_default()
                            .to_string();
                        let filter_query = filter.get(tokens::QUERY).ok_or_else(|| {
                            Error::validation(tokens::QUERY_FILTERS, "filter without $query")
                        })?;
                        Ok((filter_name, query(filter_query)?))
                    })
                    .collect::<Result<Vec<_>, Error>>()?,
                None => vec![],
            };
            Facet::filters(name, filters)
        }
    }
}

/// Read an `$action` section: one or more objects keyed by action operators.
pub fn actions(value: &Value) -> Result<Vec<Action>, Error> {
    let mut actions = vec![];
    for entry in one_or_many(value) {
        for (key, operand) in as_object(tokens::ACTION, entry)? {
            let operator = ActionOperator::from_token(key)
                .ok_or_else(|| Error::parse(tokens::ACTION, format!("unknown action {key}")))?;
            actions.push(action(operator, operand)?);
        }
    }
    Ok(actions)
}

fn action(operator: ActionOperator, operand: &Value) -> Result<Action, Error> {
    let context = operator.token();
    let entries = || -> Result<Vec<(String, Value)>, Error> {
        Ok(as_object(context, operand)?
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect())
    };
    match operator {
        ActionOperator::Set => Action::set(entries()?),
        ActionOperator::Inc => Action::inc(entries()?),
        ActionOperator::Min => Action::min(entries()?),
        ActionOperator::Max => Action::max(entries()?),
        ActionOperator::Unset => {
            let fields = one_or_many(operand)
                .map(|field| as_str(context, field).map(str::to_string))
                .collect::<Result<Vec<_>, Error>>()?;
            Action::unset(fields)
        }
        ActionOperator::Rename => {
            let renames = as_object(context, operand)?
                .iter()
                .map(|(field, target)| -> Result<(String, String), Error> {
                    Ok((field.clone(), as_str(context, target)?.to_string()))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Action::rename(renames)
        }
        ActionOperator::Pop => {
            let ends = as_object(context, operand)?
                .iter()
                .map(|(field, end)| -> Result<(String, i64), Error> {
                    Ok((field.clone(), as_i64(context, end)?))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Action::pop(ends)
        }
        ActionOperator::Push | ActionOperator::Add | ActionOperator::Pull => {
            let values = as_object(context, operand)?
                .iter()
                .map(|(field, each)| -> Result<(String, Vec<Value>), Error> {
                    let (key, values) = single_entry(context, each)?;
                    if key != tokens::EACH {
                        return Err(Error::parse(context, format!("expected $each, got {key}")));
                    }
                    Ok((field.clone(), as_array(context, values)?.clone()))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            match operator {
                ActionOperator::Push => Action::push(values),
                ActionOperator::Add => Action::add(values),
                _ => Action::pull(values),
            }
        }
    }
}

// Shape helpers //

fn as_object<'a>(context: &str, value: &'a Value) -> Result<&'a Map<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| Error::parse(context, format!("expected an object, got {value}")))
}

fn as_array<'a>(context: &str, value: &'a Value) -> Result<&'a Vec<Value>, Error> {
    value
        .as_array()
        .ok_or_else(|| Error::parse(context, format!("expected an array, got {value}")))
}

fn as_str<'a>(context: &str, value: &'a Value) -> Result<&'a str, Error> {
    value
        .as_str()
        .ok_or_else(|| Error::parse(context, format!("expected a string, got {value}")))
}

fn as_i64(context: &str, value: &Value) -> Result<i64, Error> {
    value
        .as_i64()
        .ok_or_else(|| Error::parse(context, format!("expected an integer, got {value}")))
}

fn as_u64(context: &str, value: &Value) -> Result<u64, Error> {
    value.as_u64().ok_or_else(|| {
        Error::parse(
            context,
            format!("expected a non-negative integer, got {value}"),
        )
    })
}

fn optional_str<'a>(
    context: &str,
    object: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, Error> {
    object
        .get(key)
        .map(|value| as_str(context, value))
        .transpose()
}

/// An object with exactly one entry, like `{"field": operand}`.
fn single_entry<'a>(context: &str, value: &'a Value) -> Result<(&'a str, &'a Value), Error> {
    let object = as_object(context, value)?;
    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some((key, operand)), None) => Ok((key.as_str(), operand)),
        _ => Err(Error::parse(
            context,
            format!("expected a single entry, got {value}"),
        )),
    }
}

/// Arrays yield their elements, anything else yields itself.
fn one_or_many(value: &Value) -> impl Iterator<Item = &Value> {
    match value {
        Value::Array(values) => values.iter().collect::<Vec<_>>().into_iter(),
        other => vec![other].into_iter(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::query::{Depth, QueryNode};
    use serde_json::json;

    #[test]
    fn test_query_with_depth() {
        let query = query(&json!({"$eq": {"title": "x"}, "$depth": 3})).unwrap();
        assert_eq!(query.depth(), Some(Depth::Relative(3)));
        assert_eq!(query.operator(), QueryOperator::Eq);
    }

    #[test]
    fn test_both_depths_are_refused() {
        let error = query(&json!({"$exists": "a", "$depth": 1, "$exactdepth": 2})).unwrap_err();
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[test]
    fn test_unknown_operator_is_a_parse_error() {
        let error = query(&json!({"$like": {"a": "b"}})).unwrap_err();
        assert!(matches!(error, Error::Parse { .. }));
        let error = query(&json!({"$exists": "a", "$missing": "b"})).unwrap_err();
        assert!(matches!(error, Error::Parse { .. }));
    }

    #[test]
    fn test_not_keeps_all_children() {
        let query = query(&json!({"$not": [{"$size": {"mavar5": 5}}, {"$gt": {"mavar6": 7}}]}))
            .unwrap();
        match query.node() {
            QueryNode::Not(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_filter() {
        let filter = filter(
            &json!({
                "$offset": 100,
                "$limit": 1000,
                "$orderby": {"maclef": -1},
                "$hint": ["cache"],
            }),
            RequestKind::Select.filter_tokens(),
        )
        .unwrap();
        assert_eq!(filter.offset, Some(100));
        assert_eq!(filter.limit, Some(1000));
        assert!(filter.hint_cache());
        assert_eq!(filter.order_by.len(), 1);
    }

    #[test]
    fn test_filter_rejects_unknown_keywords() {
        let error = filter(&json!({"$skip": 1}), RequestKind::Select.filter_tokens()).unwrap_err();
        assert!(matches!(error, Error::Parse { .. }));
        let error = filter(
            &json!({"$scrollTimeout": 10}),
            RequestKind::Select.filter_tokens(),
        )
        .unwrap_err();
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[test]
    fn test_projection_slices() {
        let projection = projection(&json!({
            "$fields": {"#dua": 1, "#all": -1, "Tags": {"$slice": [1, 2]}},
            "$usage": "BinaryMaster",
        }))
        .unwrap();
        assert_eq!(projection.fields.len(), 3);
        assert_eq!(projection.usage.as_deref(), Some("BinaryMaster"));

        let error = super::projection(&json!({"$fields": {"Tags": {"$slice": [1, 0]}}}));
        assert!(matches!(error, Err(Error::Parse { .. })));
        let error = super::projection(&json!({"$fields": {"Tags": {"$slice": "a"}}}));
        assert!(matches!(error, Err(Error::Parse { .. })));
    }

    #[test]
    fn test_facets() {
        let terms = facet(&json!({
            "$name": "levels",
            "$terms": {"$field": "DescriptionLevel", "$size": 5, "$order": "ASC"}
        }))
        .unwrap();
        assert_eq!(terms.kind(), FacetKind::Terms);

        let missing_order = facet(&json!({
            "$name": "levels",
            "$terms": {"$field": "DescriptionLevel", "$size": 5}
        }));
        assert!(matches!(missing_order, Err(Error::Validation { .. })));

        let filters = facet(&json!({
            "$name": "has_title",
            "$filters": {"$query_filters": [{"$name": "yes", "$query": {"$exists": "Title"}}]}
        }))
        .unwrap();
        assert_eq!(filters.name(), "has_title");
    }

    #[test]
    fn test_actions() {
        let actions = actions(&json!([
            {"$set": {"Title": "x"}},
            {"$push": {"Tags": {"$each": ["a"]}}, "$inc": {"Count": 1}},
        ]))
        .unwrap();
        assert_eq!(actions.len(), 3);

        let error = super::actions(&json!({"$push": {"Tags": ["a"]}}));
        assert!(error.is_err());
    }

    #[test]
    fn test_request_round_trip() {
        let input = json!({
            "$roots": ["id0"],
            "$query": [
                {"$path": ["id1", "id2"]},
                {"$and": [{"$exists": "mavar1"}, {"$missing": "mavar2"}]}
            ],
            "$filter": {"$offset": 100, "$limit": 1000},
            "$projection": {}
        });
        let request = request(RequestKind::Select, &input).unwrap();
        assert_eq!(request.core().nb_queries(), 2);
        similar_asserts::assert_eq!(request.to_json(), input);
    }

    #[test]
    fn test_missing_payload_is_refused_when_parsed() {
        let error = request(RequestKind::Update, &json!({"$query": [{"$exists": "a"}]}))
            .unwrap_err();
        assert!(matches!(error, Error::Validation { field, .. } if field == "$action"));

        let error = request(RequestKind::Insert, &json!({"$roots": ["id0"]})).unwrap_err();
        assert!(matches!(error, Error::Validation { field, .. } if field == "$data"));

        let error = request(RequestKind::Insert, &json!({"$data": {}})).unwrap_err();
        assert!(matches!(error, Error::Validation { field, .. } if field == "$data"));
    }

    #[test]
    fn test_large_depth_is_refused() {
        let error = query(&json!({"$exists": "b", "$depth": 50_000_000})).unwrap_err();
        assert!(matches!(error, Error::Validation { field, .. } if field == "$depth"));
        let error = query(&json!({"$exists": "b", "$exactdepth": 101})).unwrap_err();
        assert!(matches!(error, Error::Validation { field, .. } if field == "$exactdepth"));
    }

    #[test]
    fn test_sections_depend_on_kind() {
        let error = request(RequestKind::Delete, &json!({"$projection": {}})).unwrap_err();
        assert!(matches!(error, Error::Parse { .. }));
    }
}
