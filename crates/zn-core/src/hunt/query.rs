// Activity query parameters shared by every hunt.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use strum::{Display, EnumString};
use tracing::{debug, trace};
use zn_api::{FilterExpr, NetworkFilterCatalog, Query};

use crate::error::CoreError;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Extra filter values given by the caller, keyed by catalog filter id.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraFilter {
    Include(Vec<Value>),
    IncludeExclude {
        include: Vec<Value>,
        exclude: Vec<Value>,
    },
}

/// Time window and options for an activity search.
#[derive(Debug, Clone, PartialEq)]
pub struct HuntQuery {
    /// Epoch milliseconds.
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub search: Option<String>,
    pub entity_id: Option<String>,
    /// Page size.
    pub limit: usize,
    pub order: SortOrder,
    pub extra_filters: IndexMap<String, ExtraFilter>,
}

impl Default for HuntQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            search: None,
            entity_id: None,
            limit: DEFAULT_LIMIT,
            order: SortOrder::Desc,
            extra_filters: IndexMap::new(),
        }
    }
}

impl HuntQuery {
    /// Parse optional `from`/`to` timestamps into a query.
    pub fn between(from: Option<&str>, to: Option<&str>) -> Result<Self, CoreError> {
        Ok(Self {
            from: from.map(parse_timestamp_ms).transpose()?,
            to: to.map(parse_timestamp_ms).transpose()?,
            ..Self::default()
        })
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_filter(mut self, id: impl Into<String>, filter: ExtraFilter) -> Self {
        self.extra_filters.insert(id.into(), filter);
        self
    }

    /// Query-string parameters other than paging and `_filters`.
    pub fn to_query(&self) -> Query {
        Query::new()
            .with("order", self.order)
            .with_opt("from", self.from)
            .with_opt("to", self.to)
            .with_opt("_search", self.search.as_deref().filter(|s| !s.is_empty()))
            .with_opt("_entityId", self.entity_id.as_deref().filter(|s| !s.is_empty()))
    }

    /// Extra filter clauses whose ids the catalog knows. Unknown ids are
    /// dropped.
    pub fn extra_clauses(
        &self,
        catalog: &NetworkFilterCatalog,
    ) -> Result<Vec<FilterExpr>, CoreError> {
        let mut clauses = Vec::new();
        for (id, filter) in &self.extra_filters {
            if !catalog.contains(id) {
                debug!(filter = %id, "ignoring filter not in catalog");
                continue;
            }
            let expr = match filter {
                ExtraFilter::Include(values) => FilterExpr::include(id.as_str(), values.clone())?,
                ExtraFilter::IncludeExclude { include, exclude } => {
                    FilterExpr::new(id.as_str(), include.clone(), exclude.clone())?
                }
            };
            trace!(filter = %id, "extra filter added");
            clauses.push(expr);
        }
        Ok(clauses)
    }
}

/// Parse a timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 / ISO 8601 with `Z` or an offset, naive ISO 8601
/// (treated as UTC), `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DD`, and a bare
/// integer already in milliseconds.
pub fn parse_timestamp_ms(raw: &str) -> Result<i64, CoreError> {
    let s = raw.trim();
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        let midnight = NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0));
        if let Some(naive) = midnight {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    Err(CoreError::validation(format!(
        "invalid timestamp '{raw}': expected ISO 8601, e.g. 2024-01-01T12:00:00Z, \
         2024-01-01T12:00:00+05:00 or 2024-01-01"
    )))
}

/// Epoch milliseconds as an ISO 8601 UTC string.
pub fn iso_from_ms(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}
