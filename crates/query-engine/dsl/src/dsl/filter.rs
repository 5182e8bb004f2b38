//! The `$filter` section: paging, ordering, scrolling and hints.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use super::error::Error;
use super::query::FieldName;
use super::tokens;

/// Sort direction of an `$orderby` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// `1` is ascending, `-1` descending. Other values are refused.
    pub fn from_number(field: &str, number: i64) -> Result<Self, Error> {
        match number {
            1 => Ok(Direction::Ascending),
            -1 => Ok(Direction::Descending),
            other => Err(Error::validation(
                tokens::ORDER_BY,
                format!("direction of {field} must be 1 or -1, not {other}"),
            )),
        }
    }

    pub fn as_number(self) -> i64 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// A server side cursor continuing a previous select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scroll {
    pub id: String,
    /// Keep-alive of the cursor, in milliseconds.
    pub timeout: Option<u64>,
}

/// Paging, ordering and execution hints of a request. An empty filter is the default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub order_by: IndexMap<FieldName, Direction>,
    pub hints: IndexSet<String>,
    pub scroll: Option<Scroll>,
    /// `$mult`: whether the request may touch more than one document.
    pub multiple: Option<bool>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        *self == Filter::default()
    }

    /// Absent `$mult` means a single document.
    pub fn is_multiple(&self) -> bool {
        self.multiple.unwrap_or(false)
    }

    pub fn hint_cache(&self) -> bool {
        self.hints.contains(tokens::HINT_CACHE)
    }

    pub fn hint_no_timeout(&self) -> bool {
        self.hints.contains(tokens::HINT_NO_TIMEOUT)
    }

    pub fn add_order_by(&mut self, field: &str, direction: Direction) -> Result<(), Error> {
        let field = FieldName::new(tokens::ORDER_BY, field)?;
        self.order_by.insert(field, direction);
        Ok(())
    }

    pub fn add_hint(&mut self, hint: &str) -> Result<(), Error> {
        let hint = hint.trim();
        if hint.is_empty() {
            return Err(Error::validation(tokens::HINT, "hint is empty"));
        }
        self.hints.insert(hint.to_string());
        Ok(())
    }

    pub fn set_scroll(&mut self, id: &str, timeout: Option<u64>) -> Result<(), Error> {
        if id.trim().is_empty() {
            return Err(Error::validation(tokens::SCROLL_ID, "scroll id is empty"));
        }
        self.scroll = Some(Scroll {
            id: id.to_string(),
            timeout,
        });
        Ok(())
    }

    /// The filter in its request form.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        if let Some(offset) = self.offset {
            object.insert(tokens::OFFSET.into(), offset.into());
        }
        if let Some(limit) = self.limit {
            object.insert(tokens::LIMIT.into(), limit.into());
        }
        if !self.order_by.is_empty() {
            let order_by = self
                .order_by
                .iter()
                .map(|(field, direction)| (field.to_string(), direction.as_number().into()))
                .collect::<Map<String, Value>>();
            object.insert(tokens::ORDER_BY.into(), Value::Object(order_by));
        }
        if !self.hints.is_empty() {
            let hints = self.hints.iter().cloned().map(Value::String).collect();
            object.insert(tokens::HINT.into(), Value::Array(hints));
        }
        if let Some(scroll) = &self.scroll {
            object.insert(tokens::SCROLL_ID.into(), scroll.id.clone().into());
            if let Some(timeout) = scroll.timeout {
                object.insert(tokens::SCROLL_TIMEOUT.into(), timeout.into());
            }
        }
        if let Some(multiple) = self.multiple {
            object.insert(tokens::MULT.into(), multiple.into());
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_filter_is_empty() {
        let filter = Filter::default();
        assert!(filter.is_empty());
        assert!(!filter.is_multiple());
        assert_eq!(filter.to_json(), json!({}));
    }

    #[test]
    fn test_hints() {
        let mut filter = Filter::default();
        filter.add_hint("cache").unwrap();
        assert!(filter.hint_cache());
        assert!(!filter.hint_no_timeout());
        assert!(filter.add_hint(" ").is_err());
    }

    #[test]
    fn test_order_by_keeps_insertion_order() {
        let mut filter = Filter::default();
        filter.add_order_by("b", Direction::Descending).unwrap();
        filter.add_order_by("a", Direction::Ascending).unwrap();
        assert_eq!(
            serde_json::to_string(&filter.to_json()).unwrap(),
            r#"{"$orderby":{"b":-1,"a":1}}"#
        );
    }

    #[test]
    fn test_direction_must_be_unit() {
        assert!(Direction::from_number("a", 2).is_err());
        assert_eq!(
            Direction::from_number("a", -1).unwrap(),
            Direction::Descending
        );
    }
}
