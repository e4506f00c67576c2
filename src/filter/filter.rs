use serde_json::Map;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_projection::FilterProjection;
use super::filter_where::FilterWhere;
use super::query_string::QueryString;
use super::types::{OptionKeywords, ParsedQuery, RawQuery, PROJECTION_KEY};

/// Turns a raw query object into the `{filter, projection, options}` triple.
pub struct Filter;

impl Filter {
    /// Operator keywords are rewritten before the option/filter partition so
    /// `age[gte]=30` reaches the filter as `{"age": {"$gte": "30"}}`. `limit`
    /// and `skip` stay textual; see [`ParsedQuery::pagination`].
    pub fn translate(raw: &RawQuery, option_keywords: &OptionKeywords) -> Result<ParsedQuery, FilterError> {
        let mut query = raw.clone();
        FilterWhere::rewrite_operators(&mut query, option_keywords)?;

        let projection = query.remove(PROJECTION_KEY);

        let mut filter = Map::new();
        let mut options = Map::new();
        for (key, value) in query {
            if option_keywords.contains(&key) {
                options.insert(key, value);
            } else {
                filter.insert(key, value);
            }
        }

        FilterOrder::apply(&mut options)?;
        let projection = FilterProjection::apply(projection)?;

        Ok(ParsedQuery { filter, projection, options })
    }

    /// Parse a percent-encoded query string and translate it in one step.
    pub fn from_query_string(
        raw: &str,
        option_keywords: &OptionKeywords,
        max_depth: usize,
    ) -> Result<ParsedQuery, FilterError> {
        let query = QueryString::parse(raw, max_depth)?;
        Self::translate(&query, option_keywords)
    }
}
