//! Translate an incoming request into a compiled plan of native fragments.

pub mod actions;
pub mod aggregates;
pub mod filtering;
pub mod projection;
pub mod scope;
pub mod sorting;

use archive_query_configuration::Configuration;
use query_engine_dsl::dsl;
use query_engine_dsl::dsl::request::{Request, RequestKind};
use query_engine_native::native;
use serde_json::{Map, Value};

use crate::translation::error::{Error, ProgrammerError};
use crate::translation::helpers::Env;

/// One step of the query chain: the predicate its results match, and the scope linking them
/// to the roots or to the previous step.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStep {
    pub scope: native::ast::Expression,
    pub query: native::ast::Expression,
}

/// The part of a plan shared by every kind of request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCore {
    initial_roots: native::ast::Expression,
    steps: Vec<CompiledStep>,
    last_depth: i64,
    hint_cache: bool,
    hint_no_timeout: bool,
    has_full_text: bool,
    multiple: bool,
}

impl CompiledCore {
    pub fn nb_queries(&self) -> usize {
        self.steps.len()
    }

    fn nth_step(&self, index: usize) -> Result<&CompiledStep, ProgrammerError> {
        self.steps
            .get(index)
            .ok_or(ProgrammerError::StepOutOfBounds {
                index,
                nb_queries: self.steps.len(),
            })
    }

    /// The predicate of step `index`.
    pub fn nth_query(&self, index: usize) -> Result<&native::ast::Expression, ProgrammerError> {
        Ok(&self.nth_step(index)?.query)
    }

    /// The scope of step `index`.
    pub fn nth_scope(&self, index: usize) -> Result<&native::ast::Expression, ProgrammerError> {
        Ok(&self.nth_step(index)?.scope)
    }

    /// The full predicate of step `index`: its scope and its own predicate.
    pub fn nth_request(&self, index: usize) -> Result<native::ast::Expression, ProgrammerError> {
        let step = self.nth_step(index)?;
        Ok(get_request(&step.scope, &step.query))
    }

    /// The scope of the first step, or the roots themselves when there is no step.
    pub fn initial_roots(&self) -> &native::ast::Expression {
        &self.initial_roots
    }

    /// How deep in the graph the last step ends up.
    pub fn last_depth(&self) -> i64 {
        self.last_depth
    }

    pub fn has_full_text_query(&self) -> bool {
        self.has_full_text
    }

    pub fn hint_cache(&self) -> bool {
        self.hint_cache
    }

    pub fn hint_no_timeout(&self) -> bool {
        self.hint_no_timeout
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    fn to_json(&self, object: &mut Map<String, Value>) {
        object.insert("$roots".into(), self.initial_roots.to_json());
        object.insert(
            "$steps".into(),
            Value::Array(
                self.steps
                    .iter()
                    .map(|step| {
                        let mut compiled = Map::new();
                        compiled.insert("$scope".into(), step.scope.to_json());
                        compiled.insert("$query".into(), step.query.to_json());
                        Value::Object(compiled)
                    })
                    .collect(),
            ),
        );
        object.insert("$lastDepth".into(), Value::from(self.last_depth));
        object.insert("$multiple".into(), Value::from(self.multiple));
        object.insert("$fullText".into(), Value::from(self.has_full_text));
        let mut hints = vec![];
        if self.hint_cache {
            hints.push(Value::from(dsl::tokens::HINT_CACHE));
        }
        if self.hint_no_timeout {
            hints.push(Value::from(dsl::tokens::HINT_NO_TIMEOUT));
        }
        object.insert("$hints".into(), Value::Array(hints));
    }
}

/// Combine two fragments into one predicate.
pub fn get_request(
    root: &native::ast::Expression,
    step: &native::ast::Expression,
) -> native::ast::Expression {
    native::helpers::make_and(vec![root.clone(), step.clone()])
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSelect {
    pub core: CompiledCore,
    pub sort: native::ast::OrderBy,
    pub paging: native::ast::Paging,
    pub projection: native::ast::Projection,
    /// Whether every field of the documents is returned.
    pub all_projection: bool,
    pub usage: Option<String>,
    pub aggregations: Vec<native::ast::Aggregation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInsert {
    pub core: CompiledCore,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUpdate {
    pub core: CompiledCore,
    pub update: native::ast::Update,
    pub paging: native::ast::Paging,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDelete {
    pub core: CompiledCore,
    pub paging: native::ast::Paging,
}

/// A compiled plan, of the same kind as the request it was compiled from.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledRequest {
    Select(CompiledSelect),
    Insert(CompiledInsert),
    Update(CompiledUpdate),
    Delete(CompiledDelete),
}

impl CompiledRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            CompiledRequest::Select(_) => RequestKind::Select,
            CompiledRequest::Insert(_) => RequestKind::Insert,
            CompiledRequest::Update(_) => RequestKind::Update,
            CompiledRequest::Delete(_) => RequestKind::Delete,
        }
    }

    pub fn core(&self) -> &CompiledCore {
        match self {
            CompiledRequest::Select(select) => &select.core,
            CompiledRequest::Insert(insert) => &insert.core,
            CompiledRequest::Update(update) => &update.core,
            CompiledRequest::Delete(delete) => &delete.core,
        }
    }

    /// The paging of the plan. Inserts are not paged.
    pub fn paging(&self) -> Option<&native::ast::Paging> {
        match self {
            CompiledRequest::Select(select) => Some(&select.paging),
            CompiledRequest::Update(update) => Some(&update.paging),
            CompiledRequest::Delete(delete) => Some(&delete.paging),
            CompiledRequest::Insert(_) => None,
        }
    }

    /// The whole plan in the store's JSON shape.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("$kind".into(), Value::from(self.kind().name()));
        self.core().to_json(&mut object);
        if let Some(paging) = self.paging() {
            object.insert("$paging".into(), paging.to_json());
        }
        match self {
            CompiledRequest::Select(select) => {
                object.insert("$orderby".into(), select.sort.to_json());
                object.insert("$projection".into(), select.projection.to_json());
                object.insert("$allProjection".into(), Value::from(select.all_projection));
                if let Some(usage) = &select.usage {
                    object.insert("$usage".into(), Value::from(usage.as_str()));
                }
                if !select.aggregations.is_empty() {
                    object.insert(
                        "$aggregations".into(),
                        native::convert::aggregations_to_json(&select.aggregations),
                    );
                }
            }
            CompiledRequest::Insert(insert) => {
                object.insert("$data".into(), Value::Object(insert.data.clone()));
            }
            CompiledRequest::Update(update) => {
                object.insert("$update".into(), update.update.to_json());
            }
            CompiledRequest::Delete(_) => {}
        }
        Value::Object(object)
    }
}

/// Translate a request into a plan of the same kind.
pub fn translate(configuration: &Configuration, request: &Request) -> Result<CompiledRequest, Error> {
    let env = Env::new(configuration);
    tracing::info!(
        kind = request.kind().name(),
        nb_queries = request.core().nb_queries(),
        "translating request"
    );
    let core = translate_core(&env, request)?;
    let filter = request.core().filter();

    match request {
        Request::Select(select) => {
            let requested = select.projection();
            Ok(CompiledRequest::Select(CompiledSelect {
                core,
                sort: sorting::translate_order_by(&env, filter),
                paging: sorting::translate_paging(&env, RequestKind::Select, filter),
                projection: projection::translate_projection(&env, requested),
                all_projection: requested.is_all_projection(),
                usage: requested.usage.clone(),
                aggregations: aggregates::translate(&env, select.facets())?,
            }))
        }
        Request::Insert(insert) => Ok(CompiledRequest::Insert(CompiledInsert {
            core,
            data: insert.data().clone(),
        })),
        Request::Update(update) => Ok(CompiledRequest::Update(CompiledUpdate {
            core,
            update: actions::translate(&env, update.actions()),
            paging: sorting::translate_paging(&env, RequestKind::Update, filter),
        })),
        Request::Delete(_) => Ok(CompiledRequest::Delete(CompiledDelete {
            core,
            paging: sorting::translate_paging(&env, RequestKind::Delete, filter),
        })),
    }
}

fn translate_core(env: &Env, request: &Request) -> Result<CompiledCore, Error> {
    let core = request.core();
    let roots: Vec<String> = core.roots().iter().cloned().collect();
    let queries = core.queries();
    let initial_roots = scope::translate_roots(env, &roots, queries.first());

    let mut steps = Vec::with_capacity(queries.len());
    let mut last_depth = 0;
    for (rank, query) in queries.iter().enumerate() {
        let scope = if rank == 0 {
            initial_roots.clone()
        } else {
            scope::translate_step_scope(env, rank - 1, query.depth())
        };
        let compiled = filtering::translate_expression(env, query)?;
        last_depth = scope::next_depth(last_depth, query);
        tracing::debug!(
            rank,
            operator = query.operator().token(),
            depth = ?query.depth(),
            last_depth,
            "compiled step"
        );
        steps.push(CompiledStep {
            scope,
            query: compiled,
        });
    }

    let filter = core.filter();
    Ok(CompiledCore {
        initial_roots,
        steps,
        last_depth,
        hint_cache: filter.hint_cache(),
        hint_no_timeout: filter.hint_no_timeout(),
        has_full_text: request.is_full_text(),
        multiple: filter.is_multiple(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(kind: RequestKind, request: Value) -> Request {
        dsl::parse::request(kind, &request).unwrap()
    }

    #[test]
    fn test_end_to_end() {
        let configuration = Configuration::default();
        let request = parse(
            RequestKind::Select,
            json!({
                "$roots": ["id0"],
                "$query": [
                    {"$path": ["id1", "id2"]},
                    {"$and": [{"$exists": "mavar1"}, {"$missing": "mavar2"}]}
                ],
                "$filter": {"$offset": 100, "$limit": 1000}
            }),
        );

        let plan = translate(&configuration, &request).unwrap();
        let core = plan.core();
        assert_eq!(core.nb_queries(), 2);
        assert_eq!(
            core.nth_query(0).unwrap().to_json(),
            json!({"$and": [
                {"_id": {"$in": ["id2"]}},
                {"_uds.1": {"$in": ["id1"]}}
            ]})
        );
        assert_eq!(
            core.nth_query(1).unwrap().to_json(),
            json!({"$and": [
                {"mavar1": {"$exists": true}},
                {"mavar2": {"$exists": false}}
            ]})
        );
        assert_eq!(
            core.nth_scope(0).unwrap().to_json(),
            json!({"$or": [{"_id": {"$in": ["id0"]}}, {"_us": {"$in": ["id0"]}}]})
        );
        assert_eq!(
            core.nth_scope(1).unwrap().to_json(),
            json!({"_us": {"$in": {"$step": 0}}})
        );
        assert_eq!(core.last_depth(), 3);
        assert_eq!(
            plan.paging().unwrap().to_json(),
            json!({"$limit": 1000, "$skip": 100})
        );
    }

    #[test]
    fn test_out_of_bounds_step() {
        let configuration = Configuration::default();
        let request = parse(RequestKind::Select, json!({"$query": [{"$exists": "a"}]}));
        let plan = translate(&configuration, &request).unwrap();
        let core = plan.core();
        assert_eq!(
            core.nth_query(core.nb_queries()),
            Err(ProgrammerError::StepOutOfBounds {
                index: 1,
                nb_queries: 1
            })
        );
        assert!(core.nth_scope(1).is_err());
        assert!(core.nth_request(1).is_err());
    }

    #[test]
    fn test_nth_request_combines_scope_and_query() {
        let configuration = Configuration::default();
        let request = parse(
            RequestKind::Select,
            json!({"$roots": ["id0"], "$query": [{"$eq": {"Title": "x"}, "$depth": 1}]}),
        );
        let plan = translate(&configuration, &request).unwrap();
        assert_eq!(
            plan.core().nth_request(0).unwrap().to_json(),
            json!({"$and": [
                {"$or": [{"_id": {"$in": ["id0"]}}, {"_up": {"$in": ["id0"]}}]},
                {"Title": {"$eq": "x"}}
            ]})
        );
    }

    #[test]
    fn test_insert_without_steps() {
        let configuration = Configuration::default();
        let request = parse(
            RequestKind::Insert,
            json!({"$roots": ["id0"], "$data": {"Title": "new unit"}}),
        );
        let plan = translate(&configuration, &request).unwrap();
        assert_eq!(plan.kind(), RequestKind::Insert);
        assert_eq!(plan.core().nb_queries(), 0);
        assert_eq!(
            plan.core().initial_roots().to_json(),
            json!({"_id": {"$in": ["id0"]}})
        );
        let CompiledRequest::Insert(insert) = plan else {
            panic!("expected an insert plan");
        };
        assert_eq!(insert.data.get("Title"), Some(&json!("new unit")));
    }

    #[test]
    fn test_built_insert_is_passed_through() {
        let configuration = Configuration::default();
        let mut request = Request::new(RequestKind::Insert);
        if let Request::Insert(insert) = &mut request {
            insert.set_data(json!({"Title": "built"})).unwrap();
        }
        let plan = translate(&configuration, &request).unwrap();
        assert_eq!(plan.to_json()["$data"], json!({"Title": "built"}));
    }
}
