//! Update actions.

use indexmap::IndexMap;
use nonempty::NonEmpty;
use serde_json::{Map, Value};

use super::error::Error;
use super::query::{single, FieldName};
use super::tokens::{self, ActionOperator};

/// Which end of an array `$pop` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayEnd {
    First,
    Last,
}

impl ArrayEnd {
    pub fn as_number(self) -> i64 {
        match self {
            ArrayEnd::First => -1,
            ArrayEnd::Last => 1,
        }
    }
}

/// One update action and the fields it applies to. Each action names at least one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set(IndexMap<FieldName, Value>),
    Unset(NonEmpty<FieldName>),
    Inc(IndexMap<FieldName, Value>),
    Min(IndexMap<FieldName, Value>),
    Max(IndexMap<FieldName, Value>),
    Rename(IndexMap<FieldName, FieldName>),
    Push(IndexMap<FieldName, NonEmpty<Value>>),
    /// Add to an array the values it does not already hold.
    Add(IndexMap<FieldName, NonEmpty<Value>>),
    Pop(IndexMap<FieldName, ArrayEnd>),
    Pull(IndexMap<FieldName, NonEmpty<Value>>),
}

impl Action {
    pub fn set(values: Vec<(String, Value)>) -> Result<Self, Error> {
        Ok(Action::Set(fields_of(ActionOperator::Set, values, Ok)?))
    }

    pub fn unset(fields: Vec<String>) -> Result<Self, Error> {
        let context = ActionOperator::Unset.token();
        let fields = fields
            .iter()
            .map(|field| FieldName::new(context, field))
            .collect::<Result<Vec<_>, Error>>()?;
        let fields = NonEmpty::from_vec(fields)
            .ok_or_else(|| Error::validation(context, "at least one field is required"))?;
        Ok(Action::Unset(fields))
    }

    pub fn inc(values: Vec<(String, Value)>) -> Result<Self, Error> {
        let context = ActionOperator::Inc.token();
        Ok(Action::Inc(fields_of(
            ActionOperator::Inc,
            values,
            |value| {
                if value.is_number() {
                    Ok(value)
                } else {
                    Err(Error::validation(context, format!("{value} is not a number")))
                }
            },
        )?))
    }

    pub fn min(values: Vec<(String, Value)>) -> Result<Self, Error> {
        let context = ActionOperator::Min.token();
        Ok(Action::Min(fields_of(ActionOperator::Min, values, |value| {
            scalar(context, value)
        })?))
    }

    pub fn max(values: Vec<(String, Value)>) -> Result<Self, Error> {
        let context = ActionOperator::Max.token();
        Ok(Action::Max(fields_of(ActionOperator::Max, values, |value| {
            scalar(context, value)
        })?))
    }

    pub fn rename(renames: Vec<(String, String)>) -> Result<Self, Error> {
        let context = ActionOperator::Rename.token();
        let renames = renames
            .into_iter()
            .map(|(field, target)| (field, Value::String(target)))
            .collect();
        Ok(Action::Rename(fields_of(
            ActionOperator::Rename,
            renames,
            |target| match target {
                Value::String(target) => FieldName::new(context, &target),
                other => Err(Error::validation(
                    context,
                    format!("{other} is not a field name"),
                )),
            },
        )?))
    }

    pub fn push(values: Vec<(String, Vec<Value>)>) -> Result<Self, Error> {
        Ok(Action::Push(array_fields_of(ActionOperator::Push, values)?))
    }

    pub fn add(values: Vec<(String, Vec<Value>)>) -> Result<Self, Error> {
        Ok(Action::Add(array_fields_of(ActionOperator::Add, values)?))
    }

    pub fn pull(values: Vec<(String, Vec<Value>)>) -> Result<Self, Error> {
        Ok(Action::Pull(array_fields_of(ActionOperator::Pull, values)?))
    }

    /// `1` pops the last element, `-1` the first.
    pub fn pop(ends: Vec<(String, i64)>) -> Result<Self, Error> {
        let context = ActionOperator::Pop.token();
        let ends = ends
            .into_iter()
            .map(|(field, end)| (field, Value::from(end)))
            .collect();
        Ok(Action::Pop(fields_of(
            ActionOperator::Pop,
            ends,
            |end| match end.as_i64() {
                Some(1) => Ok(ArrayEnd::Last),
                Some(-1) => Ok(ArrayEnd::First),
                _ => Err(Error::validation(context, format!("{end} must be 1 or -1"))),
            },
        )?))
    }

    pub fn operator(&self) -> ActionOperator {
        match self {
            Action::Set(_) => ActionOperator::Set,
            Action::Unset(_) => ActionOperator::Unset,
            Action::Inc(_) => ActionOperator::Inc,
            Action::Min(_) => ActionOperator::Min,
            Action::Max(_) => ActionOperator::Max,
            Action::Rename(_) => ActionOperator::Rename,
            Action::Push(_) => ActionOperator::Push,
            Action::Add(_) => ActionOperator::Add,
            Action::Pop(_) => ActionOperator::Pop,
            Action::Pull(_) => ActionOperator::Pull,
        }
    }

    /// The action in its request form.
    pub fn to_json(&self) -> Value {
        let operand = match self {
            Action::Set(values) | Action::Inc(values) | Action::Min(values) | Action::Max(values) => {
                object_of(values, Clone::clone)
            }
            Action::Unset(fields) => {
                Value::Array(fields.iter().map(|field| field.to_string().into()).collect())
            }
            Action::Rename(renames) => object_of(renames, |target| target.to_string().into()),
            Action::Push(values) | Action::Add(values) | Action::Pull(values) => {
                object_of(values, |values| {
                    single(
                        tokens::EACH,
                        Value::Array(values.iter().cloned().collect()),
                    )
                })
            }
            Action::Pop(ends) => object_of(ends, |end| end.as_number().into()),
        };
        single(self.operator().token(), operand)
    }
}

fn object_of<T>(fields: &IndexMap<FieldName, T>, render: impl Fn(&T) -> Value) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(field, value)| (field.to_string(), render(value)))
            .collect::<Map<String, Value>>(),
    )
}

fn fields_of<T>(
    operator: ActionOperator,
    values: Vec<(String, Value)>,
    check: impl Fn(Value) -> Result<T, Error>,
) -> Result<IndexMap<FieldName, T>, Error> {
    let context = operator.token();
    if values.is_empty() {
        return Err(Error::validation(context, "at least one field is required"));
    }
    let mut fields = IndexMap::new();
    for (field, value) in values {
        let field = FieldName::new(context, &field)?;
        let value = check(value)?;
        if fields.insert(field.clone(), value).is_some() {
            return Err(Error::validation(
                context,
                format!("field {field} appears twice"),
            ));
        }
    }
    Ok(fields)
}

fn array_fields_of(
    operator: ActionOperator,
    values: Vec<(String, Vec<Value>)>,
) -> Result<IndexMap<FieldName, NonEmpty<Value>>, Error> {
    let context = operator.token();
    let values = values
        .into_iter()
        .map(|(field, values)| (field, Value::Array(values)))
        .collect();
    fields_of(operator, values, |values| match values {
        Value::Array(values) => NonEmpty::from_vec(values)
            .ok_or_else(|| Error::validation(context, "$each needs at least one value")),
        other => Err(Error::validation(
            context,
            format!("{other} is not an array"),
        )),
    })
}

fn scalar(context: &str, value: Value) -> Result<Value, Error> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(Error::validation(
            context,
            format!("expected a literal value, got {value}"),
        )),
        scalar => Ok(scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actions_need_a_field() {
        assert!(Action::set(vec![]).is_err());
        assert!(Action::unset(vec![]).is_err());
        assert!(Action::push(vec![("tags".into(), vec![])]).is_err());
    }

    #[test]
    fn test_action_operands_are_checked() {
        assert!(Action::inc(vec![("count".into(), json!("a"))]).is_err());
        assert!(Action::pop(vec![("tags".into(), 2)]).is_err());
        assert!(Action::rename(vec![("a".into(), String::new())]).is_err());
        assert!(Action::set(vec![("a".into(), json!(1)), ("a".into(), json!(2))]).is_err());
    }

    #[test]
    fn test_array_actions_use_each() {
        let action = Action::add(vec![("tags".into(), vec![json!("x"), json!("y")])]).unwrap();
        assert_eq!(
            action.to_json(),
            json!({"$add": {"tags": {"$each": ["x", "y"]}}})
        );

        let action = Action::pop(vec![("tags".into(), -1)]).unwrap();
        assert_eq!(action.to_json(), json!({"$pop": {"tags": -1}}));
    }
}
