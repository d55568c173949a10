// ── Threat hunting over network activity ──
//
// Field searches against `/activities/network`, indicator-set hunts run
// through the worker pool, and enrichment plus CSV export of the results.

mod catalog;
mod enrich;
mod export;
mod fields;
mod indicators;
mod query;

pub use catalog::fetch_catalog;
pub use enrich::{HuntContext, IndicatorHit, NOT_AVAILABLE, dedupe, map_selection_names};
pub use export::{DEFAULT_EXPORT_FILE, PRIORITY_COLUMNS, export_csv, flatten, tabulate};
pub use fields::{HuntField, Indicator, field_filters, hunt_field};
pub use indicators::{
    DEFAULT_WORKERS, Executables, IndicatorSet, SetHits, hunt_set, hunt_sets, indicator_rows,
    load_sets,
};
pub use query::{DEFAULT_LIMIT, ExtraFilter, HuntQuery, SortOrder, iso_from_ms, parse_timestamp_ms};

use serde_json::{Map, Value};
use tracing::info;

use crate::error::CoreError;

/// Values for an ad-hoc hunt; any combination of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    pub domains: Vec<String>,
    pub ports: Vec<String>,
    pub src_processes: Vec<String>,
    pub dst_processes: Vec<String>,
    pub ips: Vec<String>,
}

impl FieldValues {
    pub fn is_empty(&self) -> bool {
        self.searches().iter().all(|(_, v)| v.is_empty())
    }

    fn searches(&self) -> [(HuntField, &[String]); 5] {
        [
            (HuntField::Domain, self.domains.as_slice()),
            (HuntField::DestinationPort, self.ports.as_slice()),
            (HuntField::SourceProcess, self.src_processes.as_slice()),
            (HuntField::DestinationProcess, self.dst_processes.as_slice()),
            (HuntField::DestinationIp, self.ips.as_slice()),
        ]
    }
}

/// Search each non-empty field and merge the results.
pub async fn hunt_activities(
    ctx: &HuntContext,
    values: &FieldValues,
    query: &HuntQuery,
) -> Result<Vec<IndicatorHit>, CoreError> {
    if values.is_empty() {
        return Err(CoreError::validation(
            "give at least one domain, port, process or IP to hunt for",
        ));
    }
    let mut tagged = Vec::new();
    for (field, list) in values.searches() {
        if list.is_empty() {
            continue;
        }
        let found = hunt_field(ctx.client(), ctx.catalog(), field, list, query).await?;
        tagged.extend(found.into_iter().map(|a| (field.indicator(), a)));
    }
    let hits = dedupe(tagged);
    info!(hits = hits.len(), "activity hunt complete");
    Ok(hits)
}

/// Enrich hits for display or export.
pub async fn activity_rows(
    ctx: &HuntContext,
    hits: &[IndicatorHit],
) -> Result<Vec<Map<String, Value>>, CoreError> {
    let mut rows = Vec::with_capacity(hits.len());
    for hit in hits {
        rows.push(ctx.enrich(hit).await?);
    }
    Ok(rows)
}
