use std::collections::BTreeMap;

use serde_json::Value;

use super::error::FilterError;
use super::types::{Projection, VERSION_EXCLUSION, VERSION_FIELD};

/// Keeps the version field hidden unless the caller chose an inclusion projection.
pub struct FilterProjection;

impl FilterProjection {
    pub fn apply(raw: Option<Value>) -> Result<Projection, FilterError> {
        match raw {
            None | Some(Value::Null) => Ok(Projection::default()),
            Some(Value::String(text)) => Ok(Self::from_text(text)),
            Some(Value::Array(items)) => Self::from_list(items).map(Projection::List),
            Some(Value::Object(fields)) => {
                let mut parsed = BTreeMap::new();
                for (field, flag) in fields {
                    let flag = Self::parse_flag(&field, &flag)?;
                    parsed.insert(field, flag);
                }
                Ok(Self::from_fields(parsed))
            }
            Some(other) => Err(FilterError::InvalidProjection(format!("unsupported projection: {}", other))),
        }
    }

    fn from_text(text: String) -> Projection {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Projection::default();
        }
        if !trimmed.starts_with('-') {
            return Projection::Text(text);
        }
        if trimmed.split_whitespace().any(|token| token == VERSION_EXCLUSION) {
            Projection::Text(trimmed.to_string())
        } else {
            Projection::Text(format!("{} {}", trimmed, VERSION_EXCLUSION))
        }
    }

    fn from_list(items: Vec<Value>) -> Result<Vec<String>, FilterError> {
        let mut fields = items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(FilterError::InvalidProjection(format!("projection entries must be strings: {}", other))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclusion_style = fields.first().map_or(true, |first| first.starts_with('-'));
        if exclusion_style && !fields.iter().any(|field| field == VERSION_EXCLUSION) {
            fields.push(VERSION_EXCLUSION.to_string());
        }
        Ok(fields)
    }

    fn from_fields(mut fields: BTreeMap<String, i64>) -> Projection {
        // A zero score means every listed field is excluded
        let score: i64 = fields.values().sum();
        if score == 0 {
            fields.entry(VERSION_FIELD.to_string()).or_insert(0);
        }
        Projection::Fields(fields)
    }

    fn parse_flag(field: &str, flag: &Value) -> Result<i64, FilterError> {
        let invalid = || FilterError::InvalidProjection(format!("'{}' must be 0 or 1, got {}", field, flag));
        let parsed = match flag {
            Value::Number(n) => n.as_i64(),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => match s.trim() {
                "true" => Some(1),
                "false" => Some(0),
                other => other.parse::<i64>().ok(),
            },
            _ => None,
        };
        match parsed {
            Some(flag @ (0 | 1)) => Ok(flag),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, i64)]) -> Projection {
        Projection::Fields(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn missing_projection_hides_version() {
        assert_eq!(FilterProjection::apply(None).unwrap(), Projection::Text("-__v".to_string()));
        assert_eq!(FilterProjection::apply(Some(json!("  "))).unwrap(), Projection::Text("-__v".to_string()));
    }

    #[test]
    fn exclusion_text_gains_version_once() {
        let once = FilterProjection::apply(Some(json!("-password"))).unwrap();
        assert_eq!(once, Projection::Text("-password -__v".to_string()));

        let Projection::Text(text) = once else { unreachable!() };
        let twice = FilterProjection::apply(Some(json!(text))).unwrap();
        assert_eq!(twice, Projection::Text("-password -__v".to_string()));
    }

    #[test]
    fn existing_version_exclusion_is_left_alone() {
        let out = FilterProjection::apply(Some(json!("-__v"))).unwrap();
        assert_eq!(out, Projection::Text("-__v".to_string()));
    }

    #[test]
    fn inclusion_text_untouched() {
        let out = FilterProjection::apply(Some(json!("name price"))).unwrap();
        assert_eq!(out, Projection::Text("name price".to_string()));
    }

    #[test]
    fn exclusion_list_gains_version() {
        let out = FilterProjection::apply(Some(json!(["-password", "-token"]))).unwrap();
        assert_eq!(out, Projection::List(vec!["-password".into(), "-token".into(), "-__v".into()]));

        let again = FilterProjection::apply(Some(json!(["-password", "-__v"]))).unwrap();
        assert_eq!(again, Projection::List(vec!["-password".into(), "-__v".into()]));
    }

    #[test]
    fn inclusion_list_untouched() {
        let out = FilterProjection::apply(Some(json!(["name", "-password"]))).unwrap();
        assert_eq!(out, Projection::List(vec!["name".into(), "-password".into()]));
    }

    #[test]
    fn all_zero_object_gains_version() {
        let out = FilterProjection::apply(Some(json!({"halfStar": "0", "oneStar": "0", "fiveStars": 0}))).unwrap();
        assert_eq!(out, fields(&[("fiveStars", 0), ("halfStar", 0), ("oneStar", 0), ("__v", 0)]));
    }

    #[test]
    fn inclusion_object_untouched() {
        let out = FilterProjection::apply(Some(json!({"name": "1", "rating": 1}))).unwrap();
        assert_eq!(out, fields(&[("name", 1), ("rating", 1)]));
    }

    #[test]
    fn invalid_flags_rejected() {
        assert!(FilterProjection::apply(Some(json!({"name": "yes"}))).is_err());
        assert!(FilterProjection::apply(Some(json!({"name": 2}))).is_err());
        assert!(FilterProjection::apply(Some(json!([1, 2]))).is_err());
        assert!(FilterProjection::apply(Some(json!(5))).is_err());
    }
}
