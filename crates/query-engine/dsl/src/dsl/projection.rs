//! The `$projection` section of a select.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::error::Error;
use super::query::{single, FieldName};
use super::tokens;

/// Part of an array field to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    /// The first `n` elements, or the last `-n` when negative.
    Count(i64),
    /// `limit` elements after skipping `skip`.
    SkipLimit { skip: i64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProjection {
    Excluded,
    Included,
    Slice(Slice),
}

impl FieldProjection {
    /// Positive values include the field, anything else excludes it.
    pub fn from_flag(flag: i64) -> Self {
        if flag > 0 {
            FieldProjection::Included
        } else {
            FieldProjection::Excluded
        }
    }

    pub fn slice(skip: i64, limit: i64) -> Result<Self, Error> {
        let limit = u64::try_from(limit)
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| Error::validation(tokens::SLICE, "slice limit must be positive"))?;
        Ok(FieldProjection::Slice(Slice::SkipLimit { skip, limit }))
    }

    pub fn to_json(self) -> Value {
        match self {
            FieldProjection::Excluded => Value::from(0),
            FieldProjection::Included => Value::from(1),
            FieldProjection::Slice(Slice::Count(count)) => single(tokens::SLICE, count.into()),
            FieldProjection::Slice(Slice::SkipLimit { skip, limit }) => single(
                tokens::SLICE,
                Value::Array(vec![skip.into(), limit.into()]),
            ),
        }
    }
}

/// Fields to return and the usage contract they are read under.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub fields: IndexMap<FieldName, FieldProjection>,
    pub usage: Option<String>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.usage.is_none()
    }

    pub fn add_field(&mut self, field: &str, projection: FieldProjection) -> Result<(), Error> {
        let field = FieldName::new(tokens::FIELDS, field)?;
        self.fields.insert(field, projection);
        Ok(())
    }

    /// Whether every field of the documents is returned.
    pub fn is_all_projection(&self) -> bool {
        self.fields.is_empty()
            || self
                .fields
                .get(&FieldName(tokens::ALL_FIELDS.to_string()))
                .is_some_and(|projection| *projection == FieldProjection::Included)
    }

    /// The projection in its request form.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|(field, projection)| (field.to_string(), projection.to_json()))
                .collect::<Map<String, Value>>();
            object.insert(tokens::FIELDS.into(), Value::Object(fields));
        }
        if let Some(usage) = &self.usage {
            object.insert(tokens::USAGE.into(), usage.clone().into());
        }
        Value::Object(object)
    }
}
