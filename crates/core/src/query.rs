use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LokimapError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    And,
    Or,
}

impl FromStr for SearchMode {
    type Err = LokimapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            _ => Err(LokimapError::InvalidArgument(format!(
                "unsupported search mode: {s} (expected \"and\" or \"or\")"
            ))),
        }
    }
}

/// Search terms are a tagged variant rather than a string-or-list runtime
/// branch: a single containment term, or an ordered list with a declared
/// combination mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SearchTerms {
    Single(String),
    Multiple(Vec<String>, SearchMode),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    #[default]
    Backward,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

/// Parameters of one logical (possibly multi-batch) query. Constructed once
/// by the caller and immutable for the duration of the query; filter lists
/// are ordered so the wire format is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySpec {
    pub label_filters: Vec<(String, String)>,
    pub content_filters: Vec<(String, String)>,
    pub search: Option<SearchTerms>,
    pub direction: Direction,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: Option<usize>,
    pub batch_size: usize,
    pub parse_fields: bool,
}

impl QuerySpec {
    /// A spec over `[start, end)` with the default batch size, backward
    /// direction, structured-field parsing on, and no limit.
    pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            label_filters: Vec::new(),
            content_filters: Vec::new(),
            search: None,
            direction: Direction::Backward,
            start,
            end,
            limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
            parse_fields: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_mode_parse() {
        assert_eq!(SearchMode::from_str("and").unwrap(), SearchMode::And);
        assert_eq!(SearchMode::from_str("OR").unwrap(), SearchMode::Or);
    }

    #[test]
    fn search_mode_rejects_unknown_before_any_io() {
        let err = SearchMode::from_str("xor").unwrap_err();
        assert!(matches!(err, LokimapError::InvalidArgument(_)));
    }

    #[test]
    fn direction_wire_names() {
        assert_eq!(Direction::Backward.as_str(), "backward");
        assert_eq!(Direction::Forward.as_str(), "forward");
    }

    #[test]
    fn window_defaults() {
        let now = Utc::now();
        let spec = QuerySpec::window(now, now);
        assert_eq!(spec.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(spec.direction, Direction::Backward);
        assert!(spec.parse_fields);
        assert!(spec.limit.is_none());
    }
}
