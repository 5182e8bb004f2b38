//! Translate update actions into native update operations.

use indexmap::IndexMap;
use query_engine_dsl::dsl;
use query_engine_dsl::dsl::action::Action;
use query_engine_dsl::dsl::tokens;
use query_engine_native::native;
use serde_json::Value;

use crate::translation::helpers::Env;

/// Group the actions by native operator, in order of first appearance. Later actions on a
/// field already set by the same operator overwrite the earlier value, except for `$push` and
/// `$addToSet` whose value lists are appended.
pub fn translate(env: &Env, actions: &[Action]) -> native::ast::Update {
    let mut grouped: IndexMap<native::ast::UpdateOperator, IndexMap<native::ast::FieldName, Value>> =
        IndexMap::new();
    for action in actions {
        let (operator, fields) = translate_action(env, action);
        let group = grouped.entry(operator).or_default();
        for (field, value) in fields {
            if is_appending(operator) {
                if let Some(known) = group.get_mut(&field) {
                    append_each(known, value);
                    continue;
                }
            }
            group.insert(field, value);
        }
    }

    native::ast::Update {
        operations: grouped
            .into_iter()
            .map(|(operator, fields)| native::ast::UpdateOperation {
                operator,
                fields: fields.into_iter().collect(),
            })
            .collect(),
    }
}

fn is_appending(operator: native::ast::UpdateOperator) -> bool {
    matches!(
        operator,
        native::ast::UpdateOperator::Push | native::ast::UpdateOperator::AddToSet
    )
}

/// Extend the `$each` list of `known` with the one of `value`.
fn append_each(known: &mut Value, value: Value) {
    let more = match value {
        Value::Object(mut object) => match object.remove(tokens::EACH) {
            Some(Value::Array(values)) => values,
            _ => return,
        },
        _ => return,
    };
    if let Some(Value::Array(values)) = known.get_mut(tokens::EACH) {
        values.extend(more);
    }
}

fn translate_action(
    env: &Env,
    action: &Action,
) -> (native::ast::UpdateOperator, Vec<(native::ast::FieldName, Value)>) {
    let values = |fields: &IndexMap<dsl::query::FieldName, Value>| {
        fields
            .iter()
            .map(|(field, value)| (env.lookup_field(field), value.clone()))
            .collect::<Vec<_>>()
    };
    let each = |fields: &IndexMap<dsl::query::FieldName, nonempty::NonEmpty<Value>>| {
        fields
            .iter()
            .map(|(field, values)| {
                (
                    env.lookup_field(field),
                    dsl::query::single(tokens::EACH, Value::Array(values.iter().cloned().collect())),
                )
            })
            .collect::<Vec<_>>()
    };

    match action {
        Action::Set(fields) => (native::ast::UpdateOperator::Set, values(fields)),
        Action::Inc(fields) => (native::ast::UpdateOperator::Inc, values(fields)),
        Action::Min(fields) => (native::ast::UpdateOperator::Min, values(fields)),
        Action::Max(fields) => (native::ast::UpdateOperator::Max, values(fields)),
        Action::Unset(fields) => (
            native::ast::UpdateOperator::Unset,
            fields
                .iter()
                .map(|field| (env.lookup_field(field), Value::String(String::new())))
                .collect(),
        ),
        Action::Rename(renames) => (
            native::ast::UpdateOperator::Rename,
            renames
                .iter()
                .map(|(field, target)| {
                    (
                        env.lookup_field(field),
                        Value::String(env.lookup_field(target).0),
                    )
                })
                .collect(),
        ),
        Action::Push(fields) => (native::ast::UpdateOperator::Push, each(fields)),
        Action::Add(fields) => (native::ast::UpdateOperator::AddToSet, each(fields)),
        Action::Pop(ends) => (
            native::ast::UpdateOperator::Pop,
            ends.iter()
                .map(|(field, end)| (env.lookup_field(field), Value::from(end.as_number())))
                .collect(),
        ),
        Action::Pull(fields) => (
            native::ast::UpdateOperator::PullAll,
            fields
                .iter()
                .map(|(field, values)| {
                    (
                        env.lookup_field(field),
                        Value::Array(values.iter().cloned().collect()),
                    )
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_query_configuration::Configuration;
    use serde_json::json;

    #[test]
    fn test_same_operator_is_merged() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let actions = vec![
            Action::min(vec![("StartDate".to_string(), json!("2001-01-01"))]).unwrap(),
            Action::set(vec![("Title".to_string(), json!("new title"))]).unwrap(),
            Action::min(vec![("EndDate".to_string(), json!("2010-01-01"))]).unwrap(),
        ];

        let update = translate(&env, &actions);
        assert_eq!(update.operations.len(), 2);
        similar_asserts::assert_eq!(
            update.to_json(),
            json!({
                "$min": {"StartDate": "2001-01-01", "EndDate": "2010-01-01"},
                "$set": {"Title": "new title"}
            })
        );
    }

    #[test]
    fn test_array_operators() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let actions = vec![
            Action::push(vec![("Tags".to_string(), vec![json!("a"), json!("b")])]).unwrap(),
            Action::add(vec![("Keywords".to_string(), vec![json!("x")])]).unwrap(),
            Action::pull(vec![("Old".to_string(), vec![json!(1)])]).unwrap(),
            Action::pop(vec![("Queue".to_string(), -1)]).unwrap(),
            Action::unset(vec!["Draft".to_string()]).unwrap(),
            Action::rename(vec![("Name".to_string(), "Title".to_string())]).unwrap(),
        ];

        let update = translate(&env, &actions);
        similar_asserts::assert_eq!(
            update.to_json(),
            json!({
                "$push": {"Tags": {"$each": ["a", "b"]}},
                "$addToSet": {"Keywords": {"$each": ["x"]}},
                "$pullAll": {"Old": [1]},
                "$pop": {"Queue": -1},
                "$unset": {"Draft": ""},
                "$rename": {"Name": "Title"}
            })
        );
    }

    #[test]
    fn test_repeated_push_appends() {
        let configuration = Configuration::default();
        let env = Env::new(&configuration);
        let actions = vec![
            Action::push(vec![("Tags".to_string(), vec![json!("a")])]).unwrap(),
            Action::add(vec![("Keywords".to_string(), vec![json!("x")])]).unwrap(),
            Action::push(vec![("Tags".to_string(), vec![json!("b"), json!("c")])]).unwrap(),
            Action::add(vec![("Keywords".to_string(), vec![json!("y")])]).unwrap(),
        ];

        let update = translate(&env, &actions);
        similar_asserts::assert_eq!(
            update.to_json(),
            json!({
                "$push": {"Tags": {"$each": ["a", "b", "c"]}},
                "$addToSet": {"Keywords": {"$each": ["x", "y"]}}
            })
        );
    }
}
