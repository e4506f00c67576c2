//! Bracket-notation query string parsing.
//!
//! `price[gte]=100&tags[]=a&tags[]=b&limit=10` becomes
//! `{"price": {"gte": "100"}, "tags": ["a", "b"], "limit": "10"}`.
//! Values stay strings; a key repeated without brackets collects into an array.

use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::RawQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    /// Empty brackets, `tags[]`
    Push,
}

pub struct QueryString;

impl QueryString {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(raw: &str, max_depth: usize) -> Result<RawQuery, FilterError> {
        let mut query = RawQuery::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            let (root, segments) = Self::split_key(&key)?;
            if segments.len() > max_depth {
                return Err(FilterError::DepthExceeded { key: key.into_owned(), max: max_depth });
            }
            Self::insert(&mut query, &root, &segments, value.into_owned(), &key)?;
        }
        Ok(query)
    }

    fn split_key(key: &str) -> Result<(String, Vec<Segment>), FilterError> {
        let unbalanced = || FilterError::UnbalancedBrackets(key.to_string());

        let Some(open) = key.find('[') else {
            if key.contains(']') {
                return Err(unbalanced());
            }
            return Ok((key.to_string(), vec![]));
        };

        let root = &key[..open];
        if root.is_empty() || root.contains(']') {
            return Err(FilterError::InvalidQuery(format!("query key '{}' has no field name", key)));
        }

        let mut segments = Vec::new();
        let mut rest = &key[open..];
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[').ok_or_else(unbalanced)?;
            let close = inner.find(']').ok_or_else(unbalanced)?;
            let name = &inner[..close];
            if name.contains('[') {
                return Err(unbalanced());
            }
            segments.push(if name.is_empty() { Segment::Push } else { Segment::Key(name.to_string()) });
            rest = &inner[close + 1..];
        }

        Ok((root.to_string(), segments))
    }

    fn insert(
        target: &mut Map<String, Value>,
        key: &str,
        segments: &[Segment],
        value: String,
        full_key: &str,
    ) -> Result<(), FilterError> {
        let conflict = || FilterError::ConflictingKey(full_key.to_string());

        match segments.split_first() {
            None => match target.get_mut(key) {
                None => {
                    target.insert(key.to_string(), Value::String(value));
                    Ok(())
                }
                Some(existing @ Value::String(_)) => {
                    let previous = existing.take();
                    *existing = Value::Array(vec![previous, Value::String(value)]);
                    Ok(())
                }
                Some(Value::Array(items)) => {
                    items.push(Value::String(value));
                    Ok(())
                }
                Some(_) => Err(conflict()),
            },
            Some((Segment::Push, rest)) => {
                if !rest.is_empty() {
                    return Err(FilterError::InvalidQuery(format!(
                        "query key '{}' nests below an array",
                        full_key
                    )));
                }
                match target.get_mut(key) {
                    None => {
                        target.insert(key.to_string(), Value::Array(vec![Value::String(value)]));
                        Ok(())
                    }
                    Some(existing @ Value::String(_)) => {
                        let previous = existing.take();
                        *existing = Value::Array(vec![previous, Value::String(value)]);
                        Ok(())
                    }
                    Some(Value::Array(items)) => {
                        items.push(Value::String(value));
                        Ok(())
                    }
                    Some(_) => Err(conflict()),
                }
            }
            Some((Segment::Key(child), rest)) => {
                let entry = target
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                match entry {
                    Value::Object(map) => Self::insert(map, child, rest, value, full_key),
                    _ => Err(conflict()),
                }
            }
        }
    }
}
