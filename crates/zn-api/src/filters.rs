// Filter expressions and the network-activity filter catalog.
//
// List endpoints accept `_filters`, a compact JSON array of
// `{id, includeValues, excludeValues}` objects. The activity filter catalog
// (`GET /activities/network/filters`) names every filterable field and, for
// enumerated fields, the id <-> name pairs of its selections.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::error::Error;
use crate::query::Query;

pub const FILTERS_PARAM: &str = "_filters";

// ── Expressions ──────────────────────────────────────────────────────

/// One filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterExpr {
    pub id: String,
    #[serde(default)]
    pub include_values: Vec<Value>,
    #[serde(default)]
    pub exclude_values: Vec<Value>,
}

impl FilterExpr {
    /// Build a clause. At least one of the value lists must be non-empty.
    pub fn new(
        id: impl Into<String>,
        include_values: Vec<Value>,
        exclude_values: Vec<Value>,
    ) -> Result<Self, Error> {
        let expr = Self {
            id: id.into(),
            include_values,
            exclude_values,
        };
        expr.validate()?;
        Ok(expr)
    }

    pub fn include<I, V>(id: impl Into<String>, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(id, values.into_iter().map(Into::into).collect(), Vec::new())
    }

    pub fn exclude<I, V>(id: impl Into<String>, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(id, Vec::new(), values.into_iter().map(Into::into).collect())
    }

    fn validate(&self) -> Result<(), Error> {
        if self.id.trim().is_empty() {
            return Err(Error::Filter("filter id cannot be empty".into()));
        }
        if self.include_values.is_empty() && self.exclude_values.is_empty() {
            return Err(Error::Filter(format!(
                "filter '{}' needs at least one include or exclude value",
                self.id
            )));
        }
        Ok(())
    }
}

/// An ordered list of clauses, serialized as the `_filters` parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(Vec<FilterExpr>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, expr: FilterExpr) -> Self {
        self.push(expr);
        self
    }

    pub fn push(&mut self, expr: FilterExpr) {
        self.0.push(expr);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterExpr> {
        self.0.iter()
    }

    /// Parse a user-supplied JSON array, validating every clause.
    pub fn parse(json: &str) -> Result<Self, Error> {
        let set: Self = serde_json::from_str(json)
            .map_err(|e| Error::Filter(format!("expected a JSON array of filters: {e}")))?;
        for expr in &set.0 {
            expr.validate()?;
        }
        Ok(set)
    }

    /// Compact JSON, exactly as the API expects it in `_filters`.
    pub fn to_query(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Set `_filters` on `query` when there is anything to send.
    pub fn apply(&self, query: &mut Query) -> Result<(), Error> {
        if !self.is_empty() {
            query.set(FILTERS_PARAM, self.to_query()?);
        }
        Ok(())
    }
}

impl FromIterator<FilterExpr> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterExpr>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Catalog ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub id: Value,
    pub name: String,
}

/// A filterable field as described by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFilter {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub selections: Vec<FilterSelection>,
}

/// Response of `GET /activities/network/filters`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkFiltersResponse {
    #[serde(default)]
    pub filters: Vec<NetworkFilter>,
}

/// A filter plus its selection lookup tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub filter: NetworkFilter,
    pub selections_by_name: HashMap<String, Value>,
    pub selections_by_id: HashMap<String, String>,
}

impl CatalogEntry {
    fn new(filter: NetworkFilter) -> Self {
        let mut selections_by_name = HashMap::new();
        let mut selections_by_id = HashMap::new();
        for sel in &filter.selections {
            selections_by_name.insert(sel.name.clone(), sel.id.clone());
            selections_by_id.insert(selection_key(&sel.id), sel.name.clone());
        }
        Self {
            filter,
            selections_by_name,
            selections_by_id,
        }
    }
}

/// Selection ids arrive as numbers or strings; look them up by their
/// textual form so `2` and `"2"` agree.
fn selection_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Server-provided filters keyed by id, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkFilterCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl NetworkFilterCatalog {
    /// Build from the server's list. Duplicate ids keep the first entry.
    pub fn from_filters(filters: Vec<NetworkFilter>) -> Self {
        let mut entries = IndexMap::new();
        for filter in filters {
            if entries.contains_key(&filter.id) {
                trace!(id = %filter.id, "duplicate network filter ignored");
                continue;
            }
            entries.insert(filter.id.clone(), CatalogEntry::new(filter));
        }
        debug!(count = entries.len(), "network filter catalog built");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Human name for a selection id of filter `filter_id`.
    pub fn selection_name(&self, filter_id: &str, selection_id: &Value) -> Option<&str> {
        self.entries
            .get(filter_id)?
            .selections_by_id
            .get(&selection_key(selection_id))
            .map(String::as_str)
    }

    /// Selection id for a human name of filter `filter_id`.
    pub fn selection_id(&self, filter_id: &str, name: &str) -> Option<&Value> {
        self.entries.get(filter_id)?.selections_by_name.get(name)
    }

    /// Add filters from `{filterId: [{id, name}, ...]}` mappings. Ids the
    /// server already provided are left untouched. Returns how many were
    /// added.
    pub fn merge_supplemental(&mut self, mappings: IndexMap<String, Vec<FilterSelection>>) -> usize {
        let mut added = 0;
        for (id, selections) in mappings {
            if self.entries.contains_key(&id) {
                trace!(%id, "supplemental mapping already provided by server");
                continue;
            }
            let filter = NetworkFilter {
                id: id.clone(),
                name: None,
                selections,
            };
            self.entries.insert(id, CatalogEntry::new(filter));
            added += 1;
        }
        added
    }

    /// [`merge_supplemental`](Self::merge_supplemental) from a JSON file.
    /// A missing file is not an error.
    pub fn merge_supplemental_file(&mut self, path: &Path) -> Result<usize, Error> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no supplemental filter mappings");
                return Ok(0);
            }
            Err(e) => {
                return Err(Error::Filter(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        let mappings: IndexMap<String, Vec<FilterSelection>> = serde_json::from_str(&raw)
            .map_err(|e| Error::Filter(format!("invalid mappings in {}: {e}", path.display())))?;
        let added = self.merge_supplemental(mappings);
        info!(added, path = %path.display(), "loaded supplemental filter mappings");
        Ok(added)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn filter(id: &str, selections: &[(i64, &str)]) -> NetworkFilter {
        NetworkFilter {
            id: id.into(),
            name: None,
            selections: selections
                .iter()
                .map(|(sid, name)| FilterSelection {
                    id: json!(sid),
                    name: (*name).into(),
                })
                .collect(),
        }
    }

    #[test]
    fn both_lists_empty_is_rejected() {
        let err = FilterExpr::new("dstAsset", vec![], vec![]).unwrap_err();
        assert!(matches!(err, Error::Filter(_)));
    }

    #[test]
    fn to_query_is_compact_camel_case() {
        let set = FilterSet::new()
            .with(FilterExpr::include("dstAsset", ["a.example", "b.example"]).unwrap())
            .with(FilterExpr::exclude("dstPort", [443]).unwrap());
        assert_eq!(
            set.to_query().unwrap(),
            r#"[{"id":"dstAsset","includeValues":["a.example","b.example"],"excludeValues":[]},{"id":"dstPort","includeValues":[],"excludeValues":[443]}]"#
        );
    }

    #[test]
    fn apply_skips_empty_sets() {
        let mut q = Query::new();
        FilterSet::new().apply(&mut q).unwrap();
        assert!(q.get(FILTERS_PARAM).is_none());
    }

    #[test]
    fn parse_validates_each_clause() {
        assert!(FilterSet::parse(r#"[{"id":"x","includeValues":[1]}]"#).is_ok());
        assert!(FilterSet::parse(r#"[{"id":"x"}]"#).is_err());
        assert!(FilterSet::parse(r#"{"id":"x"}"#).is_err());
    }

    #[test]
    fn catalog_keeps_first_duplicate() {
        let catalog = NetworkFilterCatalog::from_filters(vec![
            filter("protocolType", &[(6, "TCP"), (17, "UDP")]),
            filter("dstPort", &[]),
            filter("protocolType", &[(6, "Other")]),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.selection_name("protocolType", &json!(6)), Some("TCP"));
        assert_eq!(catalog.selection_name("protocolType", &json!("17")), Some("UDP"));
        assert_eq!(catalog.selection_id("protocolType", "UDP"), Some(&json!(17)));
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["protocolType", "dstPort"]);
    }

    #[test]
    fn supplemental_mappings_never_override() {
        let mut catalog =
            NetworkFilterCatalog::from_filters(vec![filter("trafficType", &[(1, "Server")])]);
        let mut extra = IndexMap::new();
        extra.insert(
            "trafficType".to_owned(),
            vec![FilterSelection { id: json!(1), name: "Overridden".into() }],
        );
        extra.insert(
            "state".to_owned(),
            vec![FilterSelection { id: json!(2), name: "Blocked".into() }],
        );
        assert_eq!(catalog.merge_supplemental(extra), 1);
        assert_eq!(catalog.selection_name("trafficType", &json!(1)), Some("Server"));
        assert_eq!(catalog.selection_name("state", &json!(2)), Some("Blocked"));
    }

    #[test]
    fn supplemental_file_missing_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = NetworkFilterCatalog::default();
        let added = catalog
            .merge_supplemental_file(&dir.path().join("nope.json"))
            .unwrap();
        assert_eq!(added, 0);

        let path = dir.path().join("extra.json");
        std::fs::write(&path, r#"{"assetType":[{"id":1,"name":"Client"}]}"#).unwrap();
        assert_eq!(catalog.merge_supplemental_file(&path).unwrap(), 1);
        assert_eq!(catalog.selection_name("assetType", &json!(1)), Some("Client"));
    }
}
