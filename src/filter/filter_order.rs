use serde_json::{json, Map, Value};

use super::error::FilterError;
use super::types::{DEFAULT_SORT_FIELD, SORT_KEY};

pub struct FilterOrder;

impl FilterOrder {
    /// Newest first.
    pub fn default_sort() -> Value {
        json!({ DEFAULT_SORT_FIELD: -1 })
    }

    /// Fill in the default sort, or normalise the caller's directions to `1`/`-1`.
    pub fn apply(options: &mut Map<String, Value>) -> Result<(), FilterError> {
        let normalized = match options.remove(SORT_KEY) {
            None | Some(Value::Null) => Self::default_sort(),
            Some(Value::String(s)) if s.trim().is_empty() => Self::default_sort(),
            // Storage-native form, e.g. `sort=-createdAt name`
            Some(Value::String(s)) => Value::String(s.trim().to_string()),
            Some(Value::Object(fields)) if fields.is_empty() => Self::default_sort(),
            Some(Value::Object(fields)) => {
                let mut out = Map::new();
                for (field, direction) in fields {
                    let direction = Self::parse_direction(&field, &direction)?;
                    out.insert(field, Value::from(direction));
                }
                Value::Object(out)
            }
            Some(other) => {
                return Err(FilterError::InvalidQuery(format!("unsupported sort specification: {}", other)));
            }
        };
        options.insert(SORT_KEY.to_string(), normalized);
        Ok(())
    }

    fn parse_direction(field: &str, direction: &Value) -> Result<i64, FilterError> {
        let invalid = || FilterError::InvalidSortDirection { field: field.to_string(), value: direction.to_string() };
        match direction {
            Value::Number(n) => match n.as_i64() {
                Some(1) => Ok(1),
                Some(-1) => Ok(-1),
                _ => Err(invalid()),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "asc" | "ascending" => Ok(1),
                "-1" | "desc" | "descending" => Ok(-1),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}
