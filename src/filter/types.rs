use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::FilterError;

/// Query parameters as delivered by the HTTP layer, after bracket expansion
pub type RawQuery = Map<String, Value>;

/// Internal per-document revision counter, hidden unless asked for
pub const VERSION_FIELD: &str = "__v";
pub const VERSION_EXCLUSION: &str = "-__v";

pub const PROJECTION_KEY: &str = "projection";
pub const SORT_KEY: &str = "sort";
pub const LIMIT_KEY: &str = "limit";
pub const SKIP_KEY: &str = "skip";

/// Default sort field, newest first
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryOp {
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$in")] In,
    #[serde(rename = "$nin")] Nin,
}

impl QueryOp {
    pub const ALL: [QueryOp; 8] = [
        QueryOp::Lt,
        QueryOp::Lte,
        QueryOp::Gt,
        QueryOp::Gte,
        QueryOp::Eq,
        QueryOp::Ne,
        QueryOp::In,
        QueryOp::Nin,
    ];

    /// Bare spelling used in query strings, e.g. `price[gte]=100`
    pub fn keyword(&self) -> &'static str {
        match self {
            QueryOp::Lt => "lt",
            QueryOp::Lte => "lte",
            QueryOp::Gt => "gt",
            QueryOp::Gte => "gte",
            QueryOp::Eq => "eq",
            QueryOp::Ne => "ne",
            QueryOp::In => "in",
            QueryOp::Nin => "nin",
        }
    }

    /// Storage-side spelling
    pub fn operator(&self) -> &'static str {
        match self {
            QueryOp::Lt => "$lt",
            QueryOp::Lte => "$lte",
            QueryOp::Gt => "$gt",
            QueryOp::Gte => "$gte",
            QueryOp::Eq => "$eq",
            QueryOp::Ne => "$ne",
            QueryOp::In => "$in",
            QueryOp::Nin => "$nin",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.keyword() == keyword)
    }

    pub fn from_operator(operator: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.operator() == operator)
    }
}

/// Query parameter names that steer execution instead of matching documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionKeywords(BTreeSet<String>);

impl OptionKeywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keywords.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn with(mut self, keyword: impl Into<String>) -> Self {
        self.0.insert(keyword.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for OptionKeywords {
    fn default() -> Self {
        Self::new([SORT_KEY, LIMIT_KEY, SKIP_KEY, PROJECTION_KEY, "newQueryFlag", "totalDocuments"])
    }
}

/// Which fields of a stored document to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Projection {
    /// Space separated, e.g. `-__v -password` or `name price`
    Text(String),
    List(Vec<String>),
    /// Field to 0 (exclude) or 1 (include)
    Fields(BTreeMap<String, i64>),
}

impl Projection {
    pub fn excludes_version(&self) -> bool {
        match self {
            Projection::Text(text) => text.split_whitespace().any(|token| token == VERSION_EXCLUSION),
            Projection::List(items) => items.iter().any(|item| item == VERSION_EXCLUSION),
            Projection::Fields(fields) => fields.get(VERSION_FIELD) == Some(&0),
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Text(VERSION_EXCLUSION.to_string())
    }
}

/// The `{filter, projection, options}` triple handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    pub filter: Map<String, Value>,
    pub projection: Projection,
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Pagination {
    /// Number of pages needed for `total` documents; one page when unbounded.
    pub fn pages(&self, total: u64) -> u64 {
        match self.limit {
            Some(0) | None => 1,
            Some(limit) => total.div_ceil(limit),
        }
    }
}

impl ParsedQuery {
    pub fn sort(&self) -> Option<&Value> {
        self.options.get(SORT_KEY)
    }

    /// Layer constraints over the caller's filter; forced keys win.
    pub fn with_filter_additions(mut self, additions: &Map<String, Value>) -> Self {
        for (key, value) in additions {
            self.filter.insert(key.clone(), value.clone());
        }
        self
    }

    /// Coerce the textual `skip`/`limit` options into numbers, capping `limit`.
    pub fn pagination(&self, max_limit: Option<u64>) -> Result<Pagination, FilterError> {
        let skip = Self::numeric_option(&self.options, SKIP_KEY)?.unwrap_or(0);
        // `limit=0` means "no limit" and so falls under the cap like an absent limit
        let limit = Self::numeric_option(&self.options, LIMIT_KEY)?.filter(|limit| *limit > 0);
        let limit = match (limit, max_limit) {
            (Some(limit), Some(max)) => Some(limit.min(max)),
            (None, Some(max)) => Some(max),
            (limit, None) => limit,
        };
        Ok(Pagination { skip, limit })
    }

    fn numeric_option(options: &Map<String, Value>, key: &str) -> Result<Option<u64>, FilterError> {
        match options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| FilterError::InvalidNumber { key: key.to_string(), value: n.to_string() }),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| FilterError::InvalidNumber { key: key.to_string(), value: s.clone() }),
            Some(other) => Err(FilterError::InvalidNumber { key: key.to_string(), value: other.to_string() }),
        }
    }
}
