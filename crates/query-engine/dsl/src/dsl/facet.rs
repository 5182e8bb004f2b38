//! Facets: named aggregations requested alongside a select.

use indexmap::IndexMap;
use nonempty::NonEmpty;
use serde_json::{Map, Value};

use super::error::Error;
use super::query::{FieldName, Query};
use super::tokens::{self, FacetKind};

/// Order of the buckets of a terms facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOrder {
    Asc,
    Desc,
}

impl BucketOrder {
    pub fn token(self) -> &'static str {
        match self {
            BucketOrder::Asc => "ASC",
            BucketOrder::Desc => "DESC",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ASC" => Some(BucketOrder::Asc),
            "DESC" => Some(BucketOrder::Desc),
            _ => None,
        }
    }
}

/// Count the distinct values of a field.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsFacet {
    pub field: FieldName,
    /// Path of the nested document holding `field`, if any.
    pub nested: Option<FieldName>,
    pub size: u32,
    pub order: BucketOrder,
}

/// One bucket of a date range facet. At least one bound is present.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    from: Option<String>,
    to: Option<String>,
}

impl DateRange {
    pub fn new(from: Option<String>, to: Option<String>) -> Result<Self, Error> {
        if from.is_none() && to.is_none() {
            return Err(Error::validation(
                tokens::RANGES,
                "a range needs at least one of $from and $to",
            ));
        }
        Ok(DateRange { from, to })
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }
}

/// Count documents per date range.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRangeFacet {
    pub field: FieldName,
    pub nested: Option<FieldName>,
    pub format: String,
    pub ranges: NonEmpty<DateRange>,
}

/// Count documents per named query.
#[derive(Debug, Clone, PartialEq)]
pub struct FiltersFacet {
    pub filters: IndexMap<String, Query>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetBody {
    Terms(TermsFacet),
    DateRange(DateRangeFacet),
    Filters(FiltersFacet),
}

/// A named aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    name: String,
    body: FacetBody,
}

impl Facet {
    pub fn terms(
        name: &str,
        field: &str,
        nested: Option<&str>,
        size: i64,
        order: Option<BucketOrder>,
    ) -> Result<Self, Error> {
        let context = FacetKind::Terms.token();
        let name = facet_name(name)?;
        let field = FieldName::new(context, field)?;
        let nested = nested_path(context, nested)?;
        let size = u32::try_from(size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                Error::validation(tokens::SIZE, format!("{size} is not a positive size"))
            })?;
        let order = order.ok_or_else(|| Error::validation(tokens::ORDER, "order is required"))?;
        Ok(Facet {
            name,
            body: FacetBody::Terms(TermsFacet {
                field,
                nested,
                size,
                order,
            }),
        })
    }

    pub fn date_range(
        name: &str,
        field: &str,
        nested: Option<&str>,
        format: &str,
        ranges: Vec<DateRange>,
    ) -> Result<Self, Error> {
        let context = FacetKind::DateRange.token();
        let name = facet_name(name)?;
        let field = FieldName::new(context, field)?;
        let nested = nested_path(context, nested)?;
        if format.trim().is_empty() {
            return Err(Error::validation(tokens::FORMAT, "date format is empty"));
        }
        let ranges = NonEmpty::from_vec(ranges)
            .ok_or_else(|| Error::validation(tokens::RANGES, "at least one range is required"))?;
        Ok(Facet {
            name,
            body: FacetBody::DateRange(DateRangeFacet {
                field,
                nested,
                format: format.to_string(),
                ranges,
            }),
        })
    }

    pub fn filters(name: &str, filters: Vec<(String, Query)>) -> Result<Self, Error> {
        let name = facet_name(name)?;
        if filters.is_empty() {
            return Err(Error::validation(
                tokens::QUERY_FILTERS,
                "at least one filter is required",
            ));
        }
        let mut by_name = IndexMap::new();
        for (filter_name, query) in filters {
            if filter_name.trim().is_empty() {
                return Err(Error::validation(tokens::QUERY_FILTERS, "filter name is empty"));
            }
            if by_name.insert(filter_name.clone(), query).is_some() {
                return Err(Error::validation(
                    tokens::QUERY_FILTERS,
                    format!("filter {filter_name} is declared twice"),
                ));
            }
        }
        Ok(Facet {
            name,
            body: FacetBody::Filters(FiltersFacet { filters: by_name }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &FacetBody {
        &self.body
    }

    pub fn kind(&self) -> FacetKind {
        match self.body {
            FacetBody::Terms(_) => FacetKind::Terms,
            FacetBody::DateRange(_) => FacetKind::DateRange,
            FacetBody::Filters(_) => FacetKind::Filters,
        }
    }

    pub fn is_full_text(&self) -> bool {
        match &self.body {
            FacetBody::Filters(filters) => filters.filters.values().any(Query::is_full_text),
            FacetBody::Terms(_) | FacetBody::DateRange(_) => false,
        }
    }

    /// The facet in its request form: `{"$name": .., "$<kind>": {..}}`.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        match &self.body {
            FacetBody::Terms(terms) => {
                body.insert(tokens::FIELD.into(), terms.field.to_string().into());
                body.insert(tokens::SIZE.into(), terms.size.into());
                body.insert(tokens::ORDER.into(), terms.order.token().into());
                if let Some(nested) = &terms.nested {
                    body.insert(tokens::SUBOBJECT.into(), nested.to_string().into());
                }
            }
            FacetBody::DateRange(date_range) => {
                body.insert(tokens::FIELD.into(), date_range.field.to_string().into());
                body.insert(tokens::FORMAT.into(), date_range.format.clone().into());
                let ranges = date_range
                    .ranges
                    .iter()
                    .map(|range| {
                        let mut bounds = Map::new();
                        if let Some(from) = range.from() {
                            bounds.insert(tokens::FROM.into(), from.into());
                        }
                        if let Some(to) = range.to() {
                            bounds.insert(tokens::TO.into(), to.into());
                        }
                        Value::Object(bounds)
                    })
                    .collect();
                body.insert(tokens::RANGES.into(), Value::Array(ranges));
                if let Some(nested) = &date_range.nested {
                    body.insert(tokens::SUBOBJECT.into(), nested.to_string().into());
                }
            }
            FacetBody::Filters(filters) => {
                let query_filters = filters
                    .filters
                    .iter()
                    .map(|(name, query)| {
                        let mut filter = Map::new();
                        filter.insert(tokens::NAME.into(), name.clone().into());
                        filter.insert(tokens::QUERY.into(), query.to_json());
                        Value::Object(filter)
                    })
                    .collect();
                body.insert(tokens::QUERY_FILTERS.into(), Value::Array(query_filters));
            }
        }
        let mut envelope = Map::new();
        envelope.insert(tokens::NAME.into(), self.name.clone().into());
        envelope.insert(self.kind().token().into(), Value::Object(body));
        Value::Object(envelope)
    }
}

fn facet_name(name: &str) -> Result<String, Error> {
    if name.trim().is_empty() {
        Err(Error::validation(tokens::NAME, "facet name is empty"))
    } else {
        Ok(name.to_string())
    }
}

fn nested_path(context: &str, nested: Option<&str>) -> Result<Option<FieldName>, Error> {
    nested.map(|path| FieldName::new(context, path)).transpose()
}
