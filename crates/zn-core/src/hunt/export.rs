// CSV export of enriched hunt rows.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde_json::{Map, Value};
use tracing::info;

use crate::csv;
use crate::error::CoreError;

pub const DEFAULT_EXPORT_FILE: &str = "all_indicating_activities.csv";

/// Leading columns, always present and in this order.
pub const PRIORITY_COLUMNS: [&str; 20] = [
    "iso_timestamp",
    "indicator_set",
    "indicator_set_id",
    "indicators",
    "state",
    "src.srcAssetName",
    "src.ip",
    "src.userName",
    "src.assetType",
    "src.networkProtectionState",
    "src.processName",
    "dst.fqdn",
    "dst.ip",
    "protocol",
    "dst.port",
    "dst.assetType",
    "dst.networkProtectionState",
    "dst.processName",
    "trafficType",
    "timestamp",
];

/// Flatten nested objects into dotted keys (`src.ip`). Arrays stay whole.
pub fn flatten(row: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(&mut out, "", row);
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: &str, row: &Map<String, Value>) {
    for (key, value) in row {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(out, &name, nested),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Header and rows: priority columns first, then every other key in
/// first-seen order.
pub fn tabulate(rows: &[Map<String, Value>]) -> (Vec<String>, Vec<Vec<String>>) {
    let flat: Vec<Map<String, Value>> = rows.iter().map(flatten).collect();
    let mut columns: IndexSet<String> = PRIORITY_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
    for row in &flat {
        columns.extend(row.keys().cloned());
    }
    let table = flat
        .iter()
        .map(|row| columns.iter().map(|c| cell(row.get(c))).collect())
        .collect();
    (columns.into_iter().collect(), table)
}

/// Write rows to `path`, or to `path_1`, `path_2`, ... if it exists.
/// Returns the path actually written.
pub fn export_csv(rows: &[Map<String, Value>], path: &Path) -> Result<PathBuf, CoreError> {
    let target = csv::unique_path(path);
    let (headers, table) = tabulate(rows);
    csv::write_table(&target, &headers, table)?;
    info!(rows = rows.len(), path = %target.display(), "hunt results exported");
    Ok(target)
}
