//! Translate the `$projection` of a select.

use query_engine_dsl::dsl;
use query_engine_dsl::dsl::projection::{FieldProjection, Slice};
use query_engine_native::native;

use crate::translation::helpers::Env;

/// Convert the projected fields, in request order. Flags were normalized on parse, so every
/// field is either included, excluded or sliced.
pub fn translate_projection(
    env: &Env,
    projection: &dsl::projection::Projection,
) -> native::ast::Projection {
    let fields = projection
        .fields
        .iter()
        .map(|(field, value)| {
            let value = match value {
                FieldProjection::Included => native::ast::ProjectionValue::Include,
                FieldProjection::Excluded => native::ast::ProjectionValue::Exclude,
                FieldProjection::Slice(Slice::Count(count)) => {
                    native::ast::ProjectionValue::Slice(*count)
                }
                FieldProjection::Slice(Slice::SkipLimit { skip, limit }) => {
                    native::ast::ProjectionValue::SliceSkipLimit {
                        skip: *skip,
                        limit: *limit,
                    }
                }
            };
            (env.lookup_field(field), value)
        })
        .collect();
    native::ast::Projection { fields }
}
