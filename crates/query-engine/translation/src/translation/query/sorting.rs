//! Translate the `$filter` section into sort and paging directives.

use query_engine_dsl::dsl;
use query_engine_dsl::dsl::request::RequestKind;
use query_engine_native::native;

use crate::translation::helpers::Env;

/// Convert the order by fields to a native sort, in request order.
pub fn translate_order_by(env: &Env, filter: &dsl::filter::Filter) -> native::ast::OrderBy {
    native::ast::OrderBy {
        elements: filter
            .order_by
            .iter()
            .map(|(field, direction)| native::ast::OrderByElement {
                field: env.lookup_field(field),
                direction: match direction {
                    dsl::filter::Direction::Ascending => native::ast::OrderByDirection::Asc,
                    dsl::filter::Direction::Descending => native::ast::OrderByDirection::Desc,
                },
            })
            .collect(),
    }
}

/// Convert offset, limit and scroll to native paging.
///
/// Selects without a limit get the configured default one. A scroll continues from its
/// cursor, so it replaces the offset.
pub fn translate_paging(
    env: &Env,
    kind: RequestKind,
    filter: &dsl::filter::Filter,
) -> native::ast::Paging {
    let limit = match (kind, filter.limit) {
        (_, Some(limit)) => Some(limit),
        (RequestKind::Select, None) => Some(env.default_limit()),
        (_, None) => None,
    };
    let scroll = filter.scroll.as_ref().map(|scroll| native::ast::Scroll {
        id: scroll.id.clone(),
        timeout: scroll.timeout,
    });
    let offset = if scroll.is_some() {
        None
    } else {
        filter.offset
    };
    native::ast::Paging {
        limit: native::ast::Limit { limit, offset },
        scroll,
    }
}
