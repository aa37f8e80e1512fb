use crate::common::{are_things_equal, compare_things, SortOrder, Value, DOC_ID};
use crate::document::{array_index, check_object, Document};
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::query::match_value;
use std::cmp::Ordering;

/// Update operators accepted as top level keys of an update document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Set,
    Unset,
    Inc,
    Min,
    Max,
    Push,
    Pop,
    AddToSet,
    Pull,
}

impl Modifier {
    pub fn parse(name: &str) -> NedbResult<Modifier> {
        Ok(match name {
            "$set" => Modifier::Set,
            "$unset" => Modifier::Unset,
            "$inc" => Modifier::Inc,
            "$min" => Modifier::Min,
            "$max" => Modifier::Max,
            "$push" => Modifier::Push,
            "$pop" => Modifier::Pop,
            "$addToSet" => Modifier::AddToSet,
            "$pull" => Modifier::Pull,
            _ => {
                log::error!("Unknown modifier {}", name);
                return Err(NedbError::new(
                    &format!("Unknown modifier {}", name),
                    ErrorKind::InvalidUpdate,
                ));
            }
        })
    }
}

/// Returns `true` when the update uses modifiers rather than being a replacement document.
pub fn is_modifier_update(update: &Document) -> bool {
    update.keys().any(|k| k.starts_with('$'))
}

/// Computes the result of applying `update` to `doc`, leaving `doc` untouched.
///
/// An update without `$` keys replaces the whole document but keeps its `_id`.
/// Otherwise every top level key must be a modifier whose operand maps dot paths
/// to arguments. The result is validated like an inserted document, and the
/// `_id` may never change.
pub fn modify(doc: &Document, update: &Document) -> NedbResult<Document> {
    if let Some(new_id) = update.get(DOC_ID) {
        if !are_things_equal(Some(new_id), doc.id()) {
            return Err(invalid_update("You cannot change a document's _id"));
        }
    }

    let dollar_keys = update.keys().filter(|k| k.starts_with('$')).count();
    if dollar_keys != 0 && dollar_keys != update.len() {
        return Err(invalid_update("You cannot mix modifiers and normal fields"));
    }

    let new_doc = if dollar_keys == 0 {
        let mut replacement = update.clone();
        match doc.id() {
            Some(id) => replacement.put(DOC_ID, id.clone()),
            None => {
                replacement.remove(DOC_ID);
            }
        }
        replacement
    } else {
        let mut new_doc = doc.clone();
        for (name, operand) in update.iter() {
            let modifier = Modifier::parse(name)?;
            let fields = operand.as_document().ok_or_else(|| {
                invalid_operand(&format!("Modifier {}'s argument must be an object", name))
            })?;
            for (path, argument) in fields.iter() {
                let parts: Vec<&str> = path.split('.').collect();
                apply_in_document(&mut new_doc, &parts, modifier, argument)?;
            }
        }
        new_doc
    };

    check_object(&new_doc)?;

    let same_id = match (doc.id(), new_doc.id()) {
        (None, None) => true,
        (a, b) => are_things_equal(a, b),
    };
    if !same_id {
        return Err(invalid_update("You can't change a document's _id"));
    }
    Ok(new_doc)
}

fn apply_in_document(doc: &mut Document, parts: &[&str], modifier: Modifier, argument: &Value) -> NedbResult<()> {
    let (field, rest) = match parts.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    if rest.is_empty() {
        let current = doc.get(field).cloned();
        return match apply_last_step(modifier, current, argument)? {
            Some(value) => {
                doc.put(*field, value);
                Ok(())
            }
            None => {
                doc.remove(field);
                Ok(())
            }
        };
    }

    if !doc.contains_key(field) {
        if modifier == Modifier::Unset {
            return Ok(());
        }
        doc.put(*field, Document::new());
    }

    match doc.get_mut(field) {
        Some(child) => apply_in_value(child, field, rest, modifier, argument),
        None => Ok(()),
    }
}

fn apply_in_value(
    value: &mut Value,
    name: &str,
    parts: &[&str],
    modifier: Modifier,
    argument: &Value,
) -> NedbResult<()> {
    match value {
        Value::Document(doc) => apply_in_document(doc, parts, modifier, argument),
        Value::Array(items) => {
            let index = array_index(parts[0]).ok_or_else(|| {
                invalid_operand(&format!(
                    "Cannot use the part '{}' to traverse the array '{}'",
                    parts[0], name
                ))
            })?;
            let rest = &parts[1..];

            if rest.is_empty() {
                let current = items.get(index).cloned();
                match apply_last_step(modifier, current, argument)? {
                    Some(new_value) => {
                        pad_to(items, index);
                        items[index] = new_value;
                    }
                    None => {
                        if let Some(slot) = items.get_mut(index) {
                            *slot = Value::Null;
                        }
                    }
                }
                return Ok(());
            }

            if index >= items.len() {
                if modifier == Modifier::Unset {
                    return Ok(());
                }
                pad_to(items, index);
                items[index] = Value::Document(Document::new());
            }
            apply_in_value(&mut items[index], parts[0], rest, modifier, argument)
        }
        other => Err(invalid_operand(&format!(
            "Cannot create field '{}' in element '{}' of type {}",
            parts[0],
            name,
            other.type_name()
        ))),
    }
}

fn pad_to(items: &mut Vec<Value>, index: usize) {
    while items.len() <= index {
        items.push(Value::Null);
    }
}

/// Applies a modifier to the current value of a field, `None` meaning absent.
/// Returns the new value, `None` meaning the field is removed.
fn apply_last_step(modifier: Modifier, current: Option<Value>, argument: &Value) -> NedbResult<Option<Value>> {
    match modifier {
        Modifier::Set => Ok(Some(argument.clone())),
        Modifier::Unset => Ok(None),
        Modifier::Inc => {
            if !argument.is_number() {
                return Err(invalid_operand(&format!("{} must be a number", argument)));
            }
            match current {
                None => Ok(Some(argument.clone())),
                Some(value) => match value.add_numbers(argument) {
                    Some(sum) if value.is_number() => Ok(Some(sum)),
                    _ => Err(invalid_operand("Don't use the $inc modifier on non-number fields")),
                },
            }
        }
        Modifier::Min | Modifier::Max => {
            let wanted = if modifier == Modifier::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            match current {
                Some(value) if compare_things(Some(argument), Some(&value)) != wanted => Ok(Some(value)),
                _ => Ok(Some(argument.clone())),
            }
        }
        Modifier::Push => {
            let mut items = existing_array(current, true, "Can't $push an element on non-array values")?;
            push(&mut items, argument)?;
            Ok(Some(Value::Array(items)))
        }
        Modifier::AddToSet => {
            let mut items = existing_array(current, true, "Can't $addToSet an element on non-array values")?;
            add_to_set(&mut items, argument)?;
            Ok(Some(Value::Array(items)))
        }
        Modifier::Pop => {
            let mut items = existing_array(current, false, "Can't $pop an element from non-array values")?;
            let direction = argument.as_f64().ok_or_else(|| {
                invalid_operand(&format!("{} isn't an integer, can't use it with $pop", argument))
            })?;
            if direction > 0.0 {
                items.pop();
            } else if direction < 0.0 && !items.is_empty() {
                items.remove(0);
            }
            Ok(Some(Value::Array(items)))
        }
        Modifier::Pull => {
            let items = existing_array(current, false, "Can't $pull an element from non-array values")?;
            let mut kept = Vec::with_capacity(items.len());
            for item in items {
                if !match_value(&item, argument)? {
                    kept.push(item);
                }
            }
            Ok(Some(Value::Array(kept)))
        }
    }
}

fn existing_array(current: Option<Value>, create: bool, message: &str) -> NedbResult<Vec<Value>> {
    match current {
        Some(Value::Array(items)) => Ok(items),
        None if create => Ok(Vec::new()),
        _ => Err(invalid_operand(message)),
    }
}

fn push(items: &mut Vec<Value>, argument: &Value) -> NedbResult<()> {
    let spec = match argument {
        Value::Document(spec) if is_each_spec(spec) => spec,
        other => {
            items.push(other.clone());
            return Ok(());
        }
    };

    if spec
        .keys()
        .any(|k| !matches!(k.as_str(), "$each" | "$slice" | "$position" | "$sort"))
    {
        return Err(invalid_operand(
            "Can only use $slice, $position and $sort in conjunction with $each when $push to array",
        ));
    }

    let each = match spec.get("$each") {
        Some(Value::Array(each)) => each.clone(),
        None => Vec::new(),
        Some(_) => return Err(invalid_operand("$each requires an array value")),
    };

    match spec.get("$position") {
        Some(position) => {
            let position = integer(position, "$position")?;
            let len = items.len() as i64;
            let at = if position < 0 { (len + position).max(0) } else { position.min(len) };
            let tail = items.split_off(at as usize);
            items.extend(each);
            items.extend(tail);
        }
        None => items.extend(each),
    }

    if let Some(order) = spec.get("$sort") {
        sort_elements(items, order)?;
    }

    if let Some(slice) = spec.get("$slice").filter(|s| s.is_number()) {
        let slice = integer(slice, "$slice")?;
        let len = items.len() as i64;
        if slice == 0 {
            items.clear();
        } else if slice < 0 {
            items.drain(..(len + slice).max(0) as usize);
        } else {
            items.truncate(slice.min(len) as usize);
        }
    }
    Ok(())
}

/// A `$push` argument is an `$each` spec when it has `$each`, or a non-zero `$slice`.
fn is_each_spec(spec: &Document) -> bool {
    spec.contains_key("$each")
        || spec
            .get("$slice")
            .map(|slice| slice.is_truthy())
            .unwrap_or(false)
}

fn sort_elements(items: &mut [Value], order: &Value) -> NedbResult<()> {
    match order {
        Value::I64(_) | Value::F64(_) => {
            let direction = SortOrder::from_direction(order.as_f64().unwrap_or(1.0));
            items.sort_by(|a, b| direction.apply(compare_things(Some(a), Some(b))));
            Ok(())
        }
        Value::Document(criteria) => {
            let mut keys = Vec::with_capacity(criteria.len());
            for (field, direction) in criteria.iter() {
                let direction = direction
                    .as_f64()
                    .ok_or_else(|| invalid_operand("$sort directions must be 1 or -1"))?;
                keys.push((field.as_str(), SortOrder::from_direction(direction)));
            }
            items.sort_by(|a, b| {
                for (field, direction) in &keys {
                    let left = a.as_document().and_then(|d| d.get_dot_value(field));
                    let right = b.as_document().and_then(|d| d.get_dot_value(field));
                    let ordering = direction.apply(compare_things(left.as_ref(), right.as_ref()));
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            Ok(())
        }
        _ => Err(invalid_operand("$sort requires a direction or a document of directions")),
    }
}

fn add_to_set(items: &mut Vec<Value>, argument: &Value) -> NedbResult<()> {
    if let Value::Document(spec) = argument {
        if let Some(each) = spec.get("$each") {
            if spec.len() > 1 {
                return Err(invalid_operand("Can't use another field in conjunction with $each"));
            }
            let each = each
                .as_array()
                .ok_or_else(|| invalid_operand("$each requires an array value"))?;
            for value in each {
                add_to_set(items, value)?;
            }
            return Ok(());
        }
    }

    let present = items
        .iter()
        .any(|item| compare_things(Some(item), Some(argument)) == Ordering::Equal);
    if !present {
        items.push(argument.clone());
    }
    Ok(())
}

fn integer(value: &Value, operator: &str) -> NedbResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| invalid_operand(&format!("{} requires an integer", operator)))
}

fn invalid_update(message: &str) -> NedbError {
    log::error!("{}", message);
    NedbError::new(message, ErrorKind::InvalidUpdate)
}

fn invalid_operand(message: &str) -> NedbError {
    log::error!("{}", message);
    NedbError::new(message, ErrorKind::InvalidModifierOperand)
}
