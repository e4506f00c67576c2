use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{OptionKeywords, QueryOp, RawQuery, PROJECTION_KEY};

/// Rewrites bare comparison keywords into storage operators.
///
/// Only object keys nested under a filter field are considered, so a literal
/// value of `"in"` or a field named `gte` is left alone.
pub struct FilterWhere;

impl FilterWhere {
    pub fn rewrite_operators(query: &mut RawQuery, option_keywords: &OptionKeywords) -> Result<(), FilterError> {
        for (field, value) in query.iter_mut() {
            if field == PROJECTION_KEY || option_keywords.contains(field) {
                continue;
            }
            if field.starts_with('$') {
                return Err(FilterError::UnsupportedOperator(field.clone()));
            }
            Self::rewrite_value(value)?;
        }
        Ok(())
    }

    fn rewrite_value(value: &mut Value) -> Result<(), FilterError> {
        match value {
            Value::Object(map) => {
                let source = std::mem::take(map);
                *map = Self::rewrite_map(source)?;
                Ok(())
            }
            Value::Array(items) => items.iter_mut().try_for_each(Self::rewrite_value),
            _ => Ok(()),
        }
    }

    fn rewrite_map(source: Map<String, Value>) -> Result<Map<String, Value>, FilterError> {
        let mut rewritten = Map::new();
        for (key, mut value) in source {
            let key = match QueryOp::from_keyword(&key) {
                Some(op) => op.operator().to_string(),
                None if key.starts_with('$') => {
                    QueryOp::from_operator(&key).ok_or_else(|| FilterError::UnsupportedOperator(key.clone()))?;
                    key
                }
                None => key,
            };
            Self::rewrite_value(&mut value)?;
            if rewritten.insert(key.clone(), value).is_some() {
                return Err(FilterError::InvalidQuery(format!("operator '{}' given twice", key)));
            }
        }
        let operators = rewritten.keys().filter(|key| key.starts_with('$')).count();
        if operators > 0 && operators < rewritten.len() {
            let keys: Vec<&str> = rewritten.keys().map(String::as_str).collect();
            return Err(FilterError::InvalidQuery(format!(
                "operators mixed with plain fields: {}",
                keys.join(", ")
            )));
        }
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rewrite(value: Value) -> Result<Value, FilterError> {
        let mut query = value.as_object().cloned().unwrap_or_default();
        FilterWhere::rewrite_operators(&mut query, &OptionKeywords::default())?;
        Ok(Value::Object(query))
    }

    #[test]
    fn every_keyword_is_prefixed() {
        for op in QueryOp::ALL {
            let out = rewrite(json!({"age": {op.keyword(): "30"}})).unwrap();
            assert_eq!(out, json!({"age": {op.operator(): "30"}}));
        }
    }

    #[test]
    fn literal_values_are_untouched() {
        let out = rewrite(json!({"location": "in", "status": ["lt", "gte"]})).unwrap();
        assert_eq!(out, json!({"location": "in", "status": ["lt", "gte"]}));
    }

    #[test]
    fn top_level_fields_named_like_operators_are_untouched() {
        let out = rewrite(json!({"in": "stock", "gte": {"gte": "1"}})).unwrap();
        assert_eq!(out, json!({"in": "stock", "gte": {"$gte": "1"}}));
    }

    #[test]
    fn option_keywords_are_skipped() {
        let out = rewrite(json!({"sort": {"in": "1"}, "price": {"lt": "5"}})).unwrap();
        assert_eq!(out, json!({"sort": {"in": "1"}, "price": {"$lt": "5"}}));
    }

    #[test]
    fn already_prefixed_operators_pass() {
        let out = rewrite(json!({"price": {"$gte": "1", "lt": "9"}})).unwrap();
        assert_eq!(out, json!({"price": {"$gte": "1", "$lt": "9"}}));
    }

    #[test]
    fn foreign_operators_rejected() {
        assert!(matches!(rewrite(json!({"$where": "1"})), Err(FilterError::UnsupportedOperator(_))));
        assert!(matches!(
            rewrite(json!({"name": {"$regex": ".*"}})),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn operators_cannot_mix_with_plain_fields() {
        assert!(matches!(
            rewrite(json!({"price": {"gte": "1", "foo": "2"}})),
            Err(FilterError::InvalidQuery(_))
        ));
        let out = rewrite(json!({"address": {"city": "Oslo", "zip": "0150"}})).unwrap();
        assert_eq!(out, json!({"address": {"city": "Oslo", "zip": "0150"}}));
    }

    #[test]
    fn duplicate_spellings_rejected() {
        assert!(matches!(
            rewrite(json!({"price": {"gte": "1", "$gte": "2"}})),
            Err(FilterError::InvalidQuery(_))
        ));
    }
}
