//! Translate the facets of a select into native aggregations.

use query_engine_dsl::dsl;
use query_engine_dsl::dsl::facet::{BucketOrder, FacetBody};
use query_engine_native::native;

use super::filtering;
use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// Translate all facets, keeping their order.
pub fn translate(
    env: &Env,
    facets: &[dsl::facet::Facet],
) -> Result<Vec<native::ast::Aggregation>, Error> {
    facets
        .iter()
        .map(|facet| translate_facet(env, facet))
        .collect()
}

fn translate_facet(env: &Env, facet: &dsl::facet::Facet) -> Result<native::ast::Aggregation, Error> {
    let name = facet.name().to_string();
    match facet.body() {
        FacetBody::Terms(terms) => {
            let kind = native::ast::AggregationKind::Terms {
                field: env.lookup_field(&terms.field),
                size: terms.size,
                order: match terms.order {
                    BucketOrder::Asc => native::ast::OrderByDirection::Asc,
                    BucketOrder::Desc => native::ast::OrderByDirection::Desc,
                },
            };
            wrap_nested(env, name, &terms.field, terms.nested.as_ref(), kind)
        }
        FacetBody::DateRange(date_range) => {
            let kind = native::ast::AggregationKind::DateRange {
                field: env.lookup_field(&date_range.field),
                format: date_range.format.clone(),
                ranges: date_range
                    .ranges
                    .iter()
                    .map(|range| native::ast::DateRangeBucket {
                        from: range.from().map(str::to_string),
                        to: range.to().map(str::to_string),
                    })
                    .collect(),
            };
            wrap_nested(env, name, &date_range.field, date_range.nested.as_ref(), kind)
        }
        FacetBody::Filters(filters) => {
            let filters = filters
                .filters
                .iter()
                .map(|(name, query)| {
                    Ok((name.clone(), filtering::translate_expression(env, query)?))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(native::ast::Aggregation {
                name,
                kind: native::ast::AggregationKind::Filters { filters },
            })
        }
    }
}

/// Aggregations over sub-documents run inside a nested aggregation of the same name.
/// The aggregated field must live under the nested path.
fn wrap_nested(
    env: &Env,
    name: String,
    field: &dsl::query::FieldName,
    nested: Option<&dsl::query::FieldName>,
    kind: native::ast::AggregationKind,
) -> Result<native::ast::Aggregation, Error> {
    let Some(path) = nested else {
        return Ok(native::ast::Aggregation { name, kind });
    };
    if !field.as_str().starts_with(&format!("{path}.")) {
        return Err(Error::Untranslatable(format!(
            "facet {name}: field {field} is not under the nested path {path}"
        )));
    }
    Ok(native::ast::Aggregation {
        name: name.clone(),
        kind: native::ast::AggregationKind::Nested {
            path: env.lookup_field(path),
            aggregation: Box::new(native::ast::Aggregation { name, kind }),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_query_configuration::Configuration;
    use serde_json::json;

    #[test]
    fn test_nested_terms() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let facet = dsl::facet::Facet::terms(
            "by_type",
            "Addressee.Type",
            Some("Addressee"),
            5,
            Some(BucketOrder::Desc),
        )
        .unwrap();

        let aggregations = translate(&env, &[facet]).unwrap();
        similar_asserts::assert_eq!(
            native::convert::aggregations_to_json(&aggregations),
            json!({
                "by_type": {
                    "nested": {"path": "Addressee"},
                    "aggs": {
                        "by_type": {
                            "terms": {
                                "field": "Addressee.Type",
                                "size": 5,
                                "order": {"_count": "desc"}
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_nested_field_outside_path() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let facet = dsl::facet::Facet::terms(
            "by_type",
            "Type",
            Some("Addressee"),
            5,
            Some(BucketOrder::Asc),
        )
        .unwrap();
        assert!(matches!(
            translate(&env, &[facet]),
            Err(Error::Untranslatable(_))
        ));
    }

    #[test]
    fn test_filters_use_the_query_compiler() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let facet = dsl::facet::Facet::filters(
            "has_title",
            vec![(
                "with".to_string(),
                dsl::query::Query::exists("Title").unwrap(),
            )],
        )
        .unwrap();

        let aggregations = translate(&env, &[facet]).unwrap();
        assert_eq!(
            aggregations[0].to_json(),
            json!({"has_title": {"filters": {"filters": {"with": {"Title": {"$exists": true}}}}}})
        );
    }
}
