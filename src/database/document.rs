//! Filter matching, projection and ordering over in-memory documents.
//!
//! Query values arrive as strings, so comparisons against numbers and
//! booleans parse the query side first.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::store::{Document, StoreError, ID_FIELD};
use crate::filter::{Projection, QueryOp};

/// Resolve a dotted path such as `address.city`.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

pub fn matches(document: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (field, constraint) in filter {
        let value = lookup(document, field);
        let satisfied = match constraint {
            Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                matches_operators(value, ops)?
            }
            expected => equals(value, expected),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_operators(value: Option<&Value>, ops: &Map<String, Value>) -> Result<bool, StoreError> {
    for (key, operand) in ops {
        let op = QueryOp::from_operator(key)
            .ok_or_else(|| StoreError::InvalidFilter(format!("unsupported operator {}", key)))?;
        let satisfied = match op {
            QueryOp::Eq => equals(value, operand),
            QueryOp::Ne => !equals(value, operand),
            QueryOp::In => candidates(operand).iter().any(|candidate| equals(value, candidate)),
            QueryOp::Nin => !candidates(operand).iter().any(|candidate| equals(value, candidate)),
            QueryOp::Lt => ordered(value, operand, |o| o == Ordering::Less),
            QueryOp::Lte => ordered(value, operand, |o| o != Ordering::Greater),
            QueryOp::Gt => ordered(value, operand, |o| o == Ordering::Greater),
            QueryOp::Gte => ordered(value, operand, |o| o != Ordering::Less),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn candidates(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        Value::String(s) => s.split(',').map(|part| Value::String(part.trim().to_string())).collect(),
        other => vec![other.clone()],
    }
}

fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(|item| scalar_equals(item, expected)),
        Some(actual) => scalar_equals(actual, expected),
    }
}

fn scalar_equals(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::Number(a), Value::String(e)) => match (a.as_f64(), e.trim().parse::<f64>()) {
            (Some(a), Ok(e)) => a == e,
            _ => false,
        },
        (Value::Bool(a), Value::String(e)) => e.trim().parse::<bool>().map_or(false, |e| *a == e),
        (Value::Null, Value::String(e)) => e == "null",
        _ => false,
    }
}

fn ordered(value: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(Value::Array(items)) => items.iter().any(|item| compare_operand(item, operand).is_some_and(&accept)),
        Some(actual) => compare_operand(actual, operand).is_some_and(accept),
        None => false,
    }
}

fn compare_operand(actual: &Value, operand: &Value) -> Option<Ordering> {
    match (actual, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.trim().parse::<f64>().ok()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), Value::Number(b)) => a.trim().parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}

/// Apply an inclusion or exclusion projection to a copy of `document`.
///
/// Inclusion keeps `_id` unless it is excluded explicitly.
pub fn project(document: &Document, projection: &Projection) -> Document {
    let (include, exclude) = split_projection(projection);

    let mut out = if include.is_empty() {
        document.clone()
    } else {
        document
            .iter()
            .filter(|(key, _)| key.as_str() == ID_FIELD || include.iter().any(|field| field == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    };
    for field in &exclude {
        out.remove(field);
    }
    out
}

fn split_projection(projection: &Projection) -> (Vec<String>, Vec<String>) {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut push = |token: &str| match token.strip_prefix('-') {
        Some(field) if !field.is_empty() => exclude.push(field.to_string()),
        Some(_) => {}
        None => include.push(token.to_string()),
    };
    match projection {
        Projection::Text(text) => text.split_whitespace().for_each(&mut push),
        Projection::List(items) => items.iter().map(String::as_str).for_each(&mut push),
        Projection::Fields(fields) => {
            for (field, flag) in fields {
                if *flag == 0 {
                    exclude.push(field.clone());
                } else {
                    include.push(field.clone());
                }
            }
        }
    }
    (include, exclude)
}

/// Parse a sort specification into `(field, ascending)` keys, in priority order.
pub fn sort_keys(sort: &Value) -> Result<Vec<(String, bool)>, StoreError> {
    match sort {
        Value::Null => Ok(vec![]),
        Value::String(text) => Ok(text
            .split_whitespace()
            .map(|token| match token.strip_prefix('-') {
                Some(field) => (field.to_string(), false),
                None => (token.to_string(), true),
            })
            .collect()),
        Value::Object(fields) => fields
            .iter()
            .map(|(field, direction)| match direction.as_i64() {
                Some(1) => Ok((field.clone(), true)),
                Some(-1) => Ok((field.clone(), false)),
                _ => Err(StoreError::InvalidFilter(format!("bad sort direction for {}", field))),
            })
            .collect(),
        other => Err(StoreError::InvalidFilter(format!("unsupported sort {}", other))),
    }
}

pub fn compare_documents(a: &Document, b: &Document, keys: &[(String, bool)]) -> Ordering {
    for (field, ascending) in keys {
        let ordering = compare_for_sort(lookup(a, field), lookup(b, field));
        let ordering = if *ascending { ordering } else { ordering.reverse() };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn sort_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => sort_rank(a).cmp(&sort_rank(b)),
    }
}
