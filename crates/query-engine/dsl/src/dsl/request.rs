//! Requests: a shared core of roots, query steps and filter, plus what each kind of request
//! needs on top of it.

use enum_iterator::Sequence;
use indexmap::IndexSet;
use serde_json::{Map, Value};

use super::action::Action;
use super::error::Error;
use super::facet::Facet;
use super::filter::Filter;
use super::parse;
use super::projection::{FieldProjection, Projection};
use super::query::Query;
use super::tokens::{self, QueryOperator};

/// Kinds of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum RequestKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl RequestKind {
    pub fn name(self) -> &'static str {
        match self {
            RequestKind::Select => "select",
            RequestKind::Insert => "insert",
            RequestKind::Update => "update",
            RequestKind::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|kind| kind.name() == name)
    }

    /// Filter keywords the kind accepts.
    pub fn filter_tokens(self) -> &'static [&'static str] {
        match self {
            RequestKind::Select => &[
                tokens::OFFSET,
                tokens::LIMIT,
                tokens::ORDER_BY,
                tokens::HINT,
                tokens::SCROLL_ID,
                tokens::SCROLL_TIMEOUT,
                tokens::MULT,
            ],
            RequestKind::Update | RequestKind::Delete => {
                &[tokens::LIMIT, tokens::HINT, tokens::MULT]
            }
            RequestKind::Insert => &[tokens::HINT, tokens::MULT],
        }
    }
}

/// Roots, query steps and filter shared by every kind of request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestCore {
    roots: IndexSet<String>,
    queries: Vec<Query>,
    filter: Filter,
}

impl RequestCore {
    pub fn roots(&self) -> &IndexSet<String> {
        &self.roots
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn nb_queries(&self) -> usize {
        self.queries.len()
    }

    /// The filter, empty if none was set.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn add_roots<I, S>(&mut self, roots: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for root in roots {
            let root = root.into();
            if root.trim().is_empty() {
                return Err(Error::validation(tokens::ROOTS, "root identifier is empty"));
            }
            self.roots.insert(root);
        }
        Ok(())
    }

    pub fn add_query(&mut self, query: Query) -> Result<(), Error> {
        check_path_position(self.queries.len(), &query)?;
        self.queries.push(query);
        Ok(())
    }

    /// Replace the step at `index`.
    pub fn set_query(&mut self, index: usize, query: Query) -> Result<(), Error> {
        check_path_position(index, &query)?;
        let nb_queries = self.queries.len();
        let slot = self.queries.get_mut(index).ok_or_else(|| {
            Error::validation(
                tokens::QUERY,
                format!("no step {index} in a request of {nb_queries} steps"),
            )
        })?;
        *slot = query;
        Ok(())
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn add_hint(&mut self, hint: &str) -> Result<(), Error> {
        self.filter.add_hint(hint)
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.filter.limit = Some(limit);
    }

    pub fn set_multiple(&mut self, multiple: bool) {
        self.filter.multiple = Some(multiple);
    }

    pub fn reset_roots(&mut self) {
        self.roots.clear();
    }

    pub fn reset_queries(&mut self) {
        self.queries.clear();
    }

    pub fn reset_hints(&mut self) {
        self.filter.hints.clear();
    }

    pub fn reset_limit(&mut self) {
        self.filter.offset = None;
        self.filter.limit = None;
    }

    pub fn reset_order_by(&mut self) {
        self.filter.order_by.clear();
    }

    pub fn reset_filter(&mut self) {
        self.filter = Filter::default();
    }

    pub fn is_full_text(&self) -> bool {
        self.queries.iter().any(Query::is_full_text)
    }

    fn to_json(&self, object: &mut Map<String, Value>) {
        object.insert(
            tokens::ROOTS.into(),
            Value::Array(self.roots.iter().cloned().map(Value::String).collect()),
        );
        object.insert(
            tokens::QUERY.into(),
            Value::Array(self.queries.iter().map(Query::to_json).collect()),
        );
        object.insert(tokens::FILTER.into(), self.filter.to_json());
    }
}

fn check_path_position(index: usize, query: &Query) -> Result<(), Error> {
    if index > 0 && query.operator() == QueryOperator::Path {
        Err(Error::validation(
            QueryOperator::Path.token(),
            "only the first step can be a $path",
        ))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub core: RequestCore,
    projection: Projection,
    facets: Vec<Facet>,
}

impl Select {
    /// The projection, empty if none was set.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn add_projection(&mut self, field: &str, projection: FieldProjection) -> Result<(), Error> {
        self.projection.add_field(field, projection)
    }

    pub fn set_usage(&mut self, usage: &str) {
        self.projection.usage = Some(usage.to_string());
    }

    pub fn reset_projection_fields(&mut self) {
        self.projection.fields.clear();
    }

    pub fn reset_usage(&mut self) {
        self.projection.usage = None;
    }

    pub fn add_facet(&mut self, facet: Facet) -> Result<(), Error> {
        if self.facets.iter().any(|known| known.name() == facet.name()) {
            return Err(Error::validation(
                tokens::FACETS,
                format!("facet {} is declared twice", facet.name()),
            ));
        }
        self.facets.push(facet);
        Ok(())
    }

    pub fn reset_facets(&mut self) {
        self.facets.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Insert {
    pub core: RequestCore,
    data: Map<String, Value>,
}

impl Insert {
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The document to insert. It is passed through as is.
    pub fn set_data(&mut self, data: Value) -> Result<(), Error> {
        match data {
            Value::Object(data) => {
                self.data = data;
                Ok(())
            }
            other => Err(Error::validation(
                tokens::DATA,
                format!("expected an object, got {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    pub core: RequestCore,
    actions: Vec<Action>,
}

impl Update {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn reset_actions(&mut self) {
        self.actions.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Delete {
    pub core: RequestCore,
}

/// A request of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Request {
    pub fn new(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Select => Request::Select(Select::default()),
            RequestKind::Insert => Request::Insert(Insert::default()),
            RequestKind::Update => Request::Update(Update::default()),
            RequestKind::Delete => Request::Delete(Delete::default()),
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Select(_) => RequestKind::Select,
            Request::Insert(_) => RequestKind::Insert,
            Request::Update(_) => RequestKind::Update,
            Request::Delete(_) => RequestKind::Delete,
        }
    }

    pub fn core(&self) -> &RequestCore {
        match self {
            Request::Select(Select { core, .. })
            | Request::Insert(Insert { core, .. })
            | Request::Update(Update { core, .. })
            | Request::Delete(Delete { core }) => core,
        }
    }

    pub fn core_mut(&mut self) -> &mut RequestCore {
        match self {
            Request::Select(Select { core, .. })
            | Request::Insert(Insert { core, .. })
            | Request::Update(Update { core, .. })
            | Request::Delete(Delete { core }) => core,
        }
    }

    /// Check the sections a kind of request cannot do without: the document of an insert and
    /// the actions of an update.
    pub fn check_complete(&self) -> Result<(), Error> {
        match self {
            Request::Insert(insert) if insert.data.is_empty() => {
                Err(Error::validation(tokens::DATA, "nothing to insert"))
            }
            Request::Update(update) if update.actions.is_empty() => Err(Error::validation(
                tokens::ACTION,
                "an update needs at least one action",
            )),
            Request::Select(_) | Request::Insert(_) | Request::Update(_) | Request::Delete(_) => {
                Ok(())
            }
        }
    }

    /// Replace the filter with the one described by a `$filter` object. Keywords the kind of
    /// request does not accept are refused.
    pub fn parse_filter(&mut self, filter: &Value) -> Result<(), Error> {
        let filter = parse::filter(filter, self.kind().filter_tokens())?;
        self.core_mut().set_filter(filter);
        Ok(())
    }

    /// The projection of a select, or an empty one.
    pub fn projection(&self) -> Projection {
        match self {
            Request::Select(select) => select.projection.clone(),
            Request::Insert(_) | Request::Update(_) | Request::Delete(_) => Projection::default(),
        }
    }

    /// Whether any step, or any facet filter, needs the full-text index.
    pub fn is_full_text(&self) -> bool {
        self.core().is_full_text()
            || match self {
                Request::Select(select) => select.facets.iter().any(Facet::is_full_text),
                Request::Insert(_) | Request::Update(_) | Request::Delete(_) => false,
            }
    }

    /// The request in its JSON form.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        self.core().to_json(&mut object);
        match self {
            Request::Select(select) => {
                object.insert(tokens::PROJECTION.into(), select.projection.to_json());
                if !select.facets.is_empty() {
                    object.insert(
                        tokens::FACETS.into(),
                        Value::Array(select.facets.iter().map(Facet::to_json).collect()),
                    );
                }
            }
            Request::Insert(insert) => {
                object.insert(tokens::DATA.into(), Value::Object(insert.data.clone()));
            }
            Request::Update(update) => {
                object.insert(
                    tokens::ACTION.into(),
                    Value::Array(update.actions.iter().map(Action::to_json).collect()),
                );
            }
            Request::Delete(_) => {}
        }
        Value::Object(object)
    }
}
