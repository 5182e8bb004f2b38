//! Render native AST fragments in the document store's JSON wire format.

use serde_json::{Map, Value};

use super::ast::*;

fn object<K: Into<String>>(key: K, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.into(), value);
    Value::Object(map)
}

impl FieldName {
    fn to_key(&self) -> String {
        self.0.clone()
    }
}

impl ComparisonOperator {
    pub fn to_token(self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "$eq",
            ComparisonOperator::NotEqual => "$ne",
            ComparisonOperator::GreaterThan => "$gt",
            ComparisonOperator::GreaterThanOrEqualTo => "$gte",
            ComparisonOperator::LessThan => "$lt",
            ComparisonOperator::LessThanOrEqualTo => "$lte",
        }
    }
}

impl ArrayOperator {
    pub fn to_token(self) -> &'static str {
        match self {
            ArrayOperator::In => "$in",
            ArrayOperator::NotIn => "$nin",
        }
    }
}

impl Expression {
    pub fn to_json(&self) -> Value {
        match self {
            Expression::And(expressions) => object("$and", list(expressions)),
            Expression::Or(expressions) => object("$or", list(expressions)),
            Expression::Nor(expressions) => object("$nor", list(expressions)),
            Expression::True => Value::Object(Map::new()),
            Expression::Exists { field, exists } => {
                object(field.to_key(), object("$exists", Value::Bool(*exists)))
            }
            Expression::Comparison {
                field,
                operator,
                value,
            } => object(field.to_key(), object(operator.to_token(), value.clone())),
            Expression::ArrayComparison {
                field,
                operator,
                values,
            } => object(
                field.to_key(),
                object(operator.to_token(), Value::Array(values.clone())),
            ),
            Expression::Size { field, size } => {
                object(field.to_key(), object("$size", Value::from(*size)))
            }
            Expression::Range { field, bounds } => {
                let bounds = bounds
                    .iter()
                    .map(|(operator, value)| (operator.to_token().to_string(), value.clone()))
                    .collect::<Map<String, Value>>();
                object(field.to_key(), Value::Object(bounds))
            }
            Expression::Regex { field, pattern } => object(
                field.to_key(),
                object("$regex", Value::String(pattern.clone())),
            ),
            Expression::Term { field, value } => {
                object(field.to_key(), Value::String(value.clone()))
            }
            Expression::InIds { field, ids } => {
                object(field.to_key(), object("$in", ids.to_json()))
            }
        }
    }
}

fn list(expressions: &[Expression]) -> Value {
    Value::Array(expressions.iter().map(Expression::to_json).collect())
}

impl IdSet {
    /// Literal sets render as arrays. Sets only known at run time render as placeholders
    /// the driver replaces.
    pub fn to_json(&self) -> Value {
        match self {
            IdSet::Literal(ids) => Value::Array(ids.iter().cloned().map(Value::String).collect()),
            IdSet::StepResult(step) => object("$step", Value::from(*step)),
            IdSet::Ancestors { of, max_distance } => {
                let mut ancestors = Map::new();
                ancestors.insert("$of".to_string(), of.to_json());
                ancestors.insert("$depth".to_string(), Value::from(*max_distance));
                object("$ancestors", Value::Object(ancestors))
            }
        }
    }
}

impl OrderBy {
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.elements
                .iter()
                .map(|element| {
                    let direction = match element.direction {
                        OrderByDirection::Asc => 1,
                        OrderByDirection::Desc => -1,
                    };
                    (element.field.to_key(), Value::from(direction))
                })
                .collect(),
        )
    }
}

impl Paging {
    pub fn to_json(&self) -> Value {
        let mut paging = Map::new();
        if let Some(limit) = self.limit.limit {
            paging.insert("$limit".to_string(), Value::from(limit));
        }
        if let Some(offset) = self.limit.offset {
            paging.insert("$skip".to_string(), Value::from(offset));
        }
        if let Some(scroll) = &self.scroll {
            paging.insert("$scrollId".to_string(), Value::String(scroll.id.clone()));
            if let Some(timeout) = scroll.timeout {
                paging.insert("$scrollTimeout".to_string(), Value::from(timeout));
            }
        }
        Value::Object(paging)
    }
}

impl Projection {
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(field, value)| {
                    let value = match value {
                        ProjectionValue::Exclude => Value::from(0),
                        ProjectionValue::Include => Value::from(1),
                        ProjectionValue::Slice(count) => object("$slice", Value::from(*count)),
                        ProjectionValue::SliceSkipLimit { skip, limit } => object(
                            "$slice",
                            Value::Array(vec![Value::from(*skip), Value::from(*limit)]),
                        ),
                    };
                    (field.to_key(), value)
                })
                .collect(),
        )
    }
}

impl UpdateOperator {
    pub fn to_token(self) -> &'static str {
        match self {
            UpdateOperator::Set => "$set",
            UpdateOperator::Unset => "$unset",
            UpdateOperator::Inc => "$inc",
            UpdateOperator::Min => "$min",
            UpdateOperator::Max => "$max",
            UpdateOperator::Rename => "$rename",
            UpdateOperator::Push => "$push",
            UpdateOperator::AddToSet => "$addToSet",
            UpdateOperator::Pop => "$pop",
            UpdateOperator::PullAll => "$pullAll",
        }
    }
}

impl Update {
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.operations
                .iter()
                .map(|operation| {
                    let fields = operation
                        .fields
                        .iter()
                        .map(|(field, value)| (field.to_key(), value.clone()))
                        .collect::<Map<String, Value>>();
                    (
                        operation.operator.to_token().to_string(),
                        Value::Object(fields),
                    )
                })
                .collect(),
        )
    }
}

impl Aggregation {
    /// `{name: body}`.
    pub fn to_json(&self) -> Value {
        object(self.name.clone(), self.kind.to_json())
    }
}

impl AggregationKind {
    pub fn to_json(&self) -> Value {
        match self {
            AggregationKind::Terms { field, size, order } => {
                let order = match order {
                    OrderByDirection::Asc => "asc",
                    OrderByDirection::Desc => "desc",
                };
                let mut terms = Map::new();
                terms.insert("field".to_string(), Value::String(field.to_key()));
                terms.insert("size".to_string(), Value::from(*size));
                terms.insert("order".to_string(), object("_count", Value::from(order)));
                object("terms", Value::Object(terms))
            }
            AggregationKind::DateRange {
                field,
                format,
                ranges,
            } => {
                let ranges = ranges
                    .iter()
                    .map(|range| {
                        let mut bucket = Map::new();
                        if let Some(from) = &range.from {
                            bucket.insert("from".to_string(), Value::String(from.clone()));
                        }
                        if let Some(to) = &range.to {
                            bucket.insert("to".to_string(), Value::String(to.clone()));
                        }
                        Value::Object(bucket)
                    })
                    .collect();
                let mut date_range = Map::new();
                date_range.insert("field".to_string(), Value::String(field.to_key()));
                date_range.insert("format".to_string(), Value::String(format.clone()));
                date_range.insert("ranges".to_string(), Value::Array(ranges));
                object("date_range", Value::Object(date_range))
            }
            AggregationKind::Filters { filters } => {
                let filters = filters
                    .iter()
                    .map(|(name, expression)| (name.clone(), expression.to_json()))
                    .collect::<Map<String, Value>>();
                object("filters", object("filters", Value::Object(filters)))
            }
            AggregationKind::Nested { path, aggregation } => {
                let mut nested = Map::new();
                nested.insert(
                    "nested".to_string(),
                    object("path", Value::String(path.to_key())),
                );
                nested.insert("aggs".to_string(), aggregation.to_json());
                Value::Object(nested)
            }
        }
    }
}

/// All aggregations of a select, keyed by name.
pub fn aggregations_to_json(aggregations: &[Aggregation]) -> Value {
    Value::Object(
        aggregations
            .iter()
            .map(|aggregation| (aggregation.name.clone(), aggregation.kind.to_json()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::helpers;
    use serde_json::json;

    #[test]
    fn test_scope_placeholders() {
        let scope = helpers::in_ids(
            helpers::make_field("_id"),
            IdSet::Ancestors {
                of: Box::new(IdSet::StepResult(0)),
                max_distance: 2,
            },
        );
        similar_asserts::assert_eq!(
            scope.to_json(),
            json!({"_id": {"$in": {"$ancestors": {"$of": {"$step": 0}, "$depth": 2}}}})
        );
    }

    #[test]
    fn test_nor_of_conjunction() {
        let expression = Expression::Nor(vec![Expression::And(vec![
            Expression::Size {
                field: helpers::make_field("mavar5"),
                size: 5,
            },
            helpers::compare(
                helpers::make_field("mavar6"),
                ComparisonOperator::GreaterThan,
                json!(7),
            ),
        ])]);
        similar_asserts::assert_eq!(
            expression.to_json(),
            json!({"$nor": [{"$and": [
                {"mavar5": {"$size": 5}},
                {"mavar6": {"$gt": 7}}
            ]}]})
        );
    }

    #[test]
    fn test_nested_terms_aggregation() {
        let aggregation = Aggregation {
            name: "by_tag".to_string(),
            kind: AggregationKind::Nested {
                path: helpers::make_field("Tags"),
                aggregation: Box::new(Aggregation {
                    name: "by_tag".to_string(),
                    kind: AggregationKind::Terms {
                        field: helpers::make_field("Tags.Value"),
                        size: 10,
                        order: OrderByDirection::Desc,
                    },
                }),
            },
        };
        similar_asserts::assert_eq!(
            aggregations_to_json(&[aggregation]),
            json!({"by_tag": {
                "nested": {"path": "Tags"},
                "aggs": {"by_tag": {"terms": {
                    "field": "Tags.Value",
                    "size": 10,
                    "order": {"_count": "desc"}
                }}}
            }})
        );
    }

    #[test]
    fn test_paging_and_sort() {
        let paging = Paging {
            limit: Limit {
                limit: Some(1000),
                offset: Some(100),
            },
            scroll: None,
        };
        assert_eq!(paging.to_json(), json!({"$limit": 1000, "$skip": 100}));
        assert_eq!(helpers::empty_order_by().to_json(), json!({}));
    }
}
