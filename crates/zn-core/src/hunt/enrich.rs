// Post-processing of hunt results: de-duplication, asset names, and
// selection ids rewritten as their display names.

use std::collections::BTreeSet;

use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};
use zn_api::types::NetworkActivity;
use zn_api::{NetworkFilterCatalog, ZnClient};

use super::fields::Indicator;
use super::query::iso_from_ms;
use crate::error::CoreError;

pub const NOT_AVAILABLE: &str = "N/A";

/// Activity attributes whose names differ from their catalog filter id.
const FIELD_ALIASES: [(&str, &str); 3] = [
    ("protocol", "protocolType"),
    ("networkProtectionState", "srcAssetProtectionState"),
    ("assetType", "srcAssetType"),
];

/// An activity with every indicator type that matched it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorHit {
    pub activity: NetworkActivity,
    pub indicators: BTreeSet<Indicator>,
}

impl IndicatorHit {
    /// `"domain, port"` style label.
    pub fn indicator_label(&self) -> String {
        self.indicators
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Merge tagged activities by `src.eventRecordId`, keeping first-seen
/// order. Activities without a record id are never merged.
pub fn dedupe<I>(tagged: I) -> Vec<IndicatorHit>
where
    I: IntoIterator<Item = (Indicator, NetworkActivity)>,
{
    let mut by_record: IndexMap<String, IndicatorHit> = IndexMap::new();
    let mut anonymous = 0_usize;
    for (indicator, activity) in tagged {
        let key = activity.event_record_id().unwrap_or_else(|| {
            anonymous += 1;
            format!("\0anonymous-{anonymous}")
        });
        by_record
            .entry(key)
            .and_modify(|hit| {
                trace!(%indicator, "merging duplicate activity");
                hit.indicators.insert(indicator);
            })
            .or_insert_with(|| IndicatorHit {
                activity,
                indicators: BTreeSet::from([indicator]),
            });
    }
    debug!(unique = by_record.len(), "activities de-duplicated");
    by_record.into_values().collect()
}

/// Shared read-only state for enrichment; safe to use from many workers.
#[derive(Debug)]
pub struct HuntContext {
    client: ZnClient,
    catalog: NetworkFilterCatalog,
    asset_names: DashMap<String, String>,
}

impl HuntContext {
    pub fn new(client: ZnClient, catalog: NetworkFilterCatalog) -> Self {
        Self {
            client,
            catalog,
            asset_names: DashMap::new(),
        }
    }

    /// Fetch the filter catalog and merge an optional supplemental mapping
    /// file.
    pub async fn load(
        client: ZnClient,
        supplemental: Option<&std::path::Path>,
    ) -> Result<Self, CoreError> {
        let mut catalog = client.network_filters().await?;
        if let Some(path) = supplemental {
            catalog.merge_supplemental_file(path)?;
        }
        Ok(Self::new(client, catalog))
    }

    pub fn client(&self) -> &ZnClient {
        &self.client
    }

    pub fn catalog(&self) -> &NetworkFilterCatalog {
        &self.catalog
    }

    /// Asset display name, cached per id. Unknown assets resolve to `N/A`.
    pub async fn asset_name(&self, asset_id: &str) -> Result<String, CoreError> {
        if asset_id.is_empty() {
            return Ok(NOT_AVAILABLE.to_owned());
        }
        if let Some(name) = self.asset_names.get(asset_id) {
            return Ok(name.clone());
        }
        let name = match self.client.get_asset(asset_id).await {
            Ok(asset) if !asset.name.is_empty() => asset.name,
            Ok(_) => NOT_AVAILABLE.to_owned(),
            Err(e) if e.is_not_found() => {
                warn!(asset = asset_id, "asset id could not be resolved to a name");
                NOT_AVAILABLE.to_owned()
            }
            Err(e) => return Err(e.into()),
        };
        self.asset_names.insert(asset_id.to_owned(), name.clone());
        Ok(name)
    }

    /// Flatten a hit into an export row: selection ids mapped to names,
    /// `iso_timestamp` and `src.srcAssetName` added.
    pub async fn enrich(&self, hit: &IndicatorHit) -> Result<Map<String, Value>, CoreError> {
        let mut row = match serde_json::to_value(&hit.activity)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map_selection_names(&mut row, &self.catalog);

        if let Some(iso) = hit.activity.timestamp.and_then(iso_from_ms) {
            row.insert("iso_timestamp".into(), Value::String(iso));
        }
        let asset_id = hit.activity.src.asset_id.as_deref().unwrap_or_default();
        let name = self.asset_name(asset_id).await?;
        if let Some(Value::Object(src)) = row.get_mut("src") {
            src.insert("srcAssetName".into(), Value::String(name));
        }
        row.insert("indicators".into(), Value::String(hit.indicator_label()));
        Ok(row)
    }
}

fn filter_id_for(key: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(attr, _)| *attr == key)
        .map_or(key, |(_, id)| id)
}

/// Replace scalar values whose key names a catalog filter with the
/// selection's display name. Recurses into nested objects and arrays.
pub fn map_selection_names(data: &mut Map<String, Value>, catalog: &NetworkFilterCatalog) {
    for (key, value) in data.iter_mut() {
        let filter_id = filter_id_for(key);
        match value {
            Value::Object(nested) => map_selection_names(nested, catalog),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(nested) => map_selection_names(nested, catalog),
                        scalar => map_scalar(scalar, filter_id, catalog),
                    }
                }
            }
            scalar => map_scalar(scalar, filter_id, catalog),
        }
    }
}

fn map_scalar(value: &mut Value, filter_id: &str, catalog: &NetworkFilterCatalog) {
    if !matches!(value, Value::Number(_) | Value::String(_)) {
        return;
    }
    if let Some(name) = catalog.selection_name(filter_id, value) {
        trace!(filter = filter_id, from = %value, to = name, "mapped selection");
        *value = Value::String(name.to_owned());
    }
}
