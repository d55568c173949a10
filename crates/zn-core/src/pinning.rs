// ── Deployment cluster pin/unpin workflow ──
//
// Per asset: fetch, gate, mutate. Items are processed one at a time so the
// running counts in the log stay meaningful.

use std::path::Path;

use tracing::{error, info, warn};
use zn_api::ZnClient;
use zn_api::types::MonitoringMethod;

use crate::csv;
use crate::error::CoreError;
use crate::gate::{self, GateContext, GateOp};

pub const ASSET_COLUMN: &str = "AssetId";
pub const CLUSTER_COLUMN: &str = "ClusterId";

/// One asset to pin or unpin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRequest {
    pub asset_id: String,
    /// Cluster id or name. Required for pin, ignored for unpin.
    pub cluster: Option<String>,
}

impl PinRequest {
    pub fn new(asset_id: impl Into<String>, cluster: Option<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            cluster,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PinOptions {
    /// Run every check but skip the mutation.
    pub dry_run: bool,
    pub skip_validation: bool,
    pub stop_on_error: bool,
    pub expected_method: MonitoringMethod,
}

impl Default for PinOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_validation: false,
            stop_on_error: false,
            expected_method: MonitoringMethod::SegmentServer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinFailure {
    pub asset_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinReport {
    pub succeeded: Vec<String>,
    pub skipped_dry_run: Vec<String>,
    pub failures: Vec<PinFailure>,
    /// Remaining items were skipped because of `stop_on_error`.
    pub aborted: bool,
}

impl PinReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.skipped_dry_run.len() + self.failures.len()
    }
}

/// Read `AssetId[,ClusterId]` rows. `default_cluster` fills rows without a
/// cluster column or with a blank cell.
pub fn read_requests(
    path: &Path,
    default_cluster: Option<&str>,
) -> Result<Vec<PinRequest>, CoreError> {
    let table = csv::read_table(path)?;
    let asset_col = table
        .column(ASSET_COLUMN)
        .ok_or_else(|| CoreError::csv(path, format!("missing '{ASSET_COLUMN}' column")))?;
    let cluster_col = table.column(CLUSTER_COLUMN);

    let requests: Vec<PinRequest> = table
        .rows
        .iter()
        .filter_map(|row| {
            let asset = table.cell(row, asset_col)?;
            let cluster = cluster_col
                .and_then(|c| table.cell(row, c))
                .or(default_cluster)
                .map(str::to_owned);
            Some(PinRequest::new(asset, cluster))
        })
        .collect();
    if requests.is_empty() {
        return Err(CoreError::csv(path, "no asset ids found"));
    }
    info!(count = requests.len(), path = %path.display(), "loaded assets from CSV");
    Ok(requests)
}

/// Write the bulk input template for `op`.
pub fn write_template(path: &Path, op: GateOp) -> Result<(), CoreError> {
    let headers: &[&str] = match op {
        GateOp::Pin => &[ASSET_COLUMN, CLUSTER_COLUMN],
        GateOp::Unpin => &[ASSET_COLUMN],
    };
    csv::write_table(path, headers, Vec::<Vec<&str>>::new())?;
    info!(path = %path.display(), "template written");
    Ok(())
}

/// Process `requests` in order and report per-asset results.
pub async fn run(
    client: &ZnClient,
    ctx: &GateContext,
    op: GateOp,
    requests: &[PinRequest],
    opts: &PinOptions,
) -> PinReport {
    let total = requests.len();
    let mut report = PinReport::default();

    for (i, req) in requests.iter().enumerate() {
        match process(client, ctx, op, req, opts).await {
            Ok(Outcome::Applied) => report.succeeded.push(req.asset_id.clone()),
            Ok(Outcome::DryRun) => report.skipped_dry_run.push(req.asset_id.clone()),
            Err(e) => {
                error!(asset = %req.asset_id, error = %e, "{op} failed");
                report.failures.push(PinFailure {
                    asset_id: req.asset_id.clone(),
                    reason: e.to_string(),
                });
                if opts.stop_on_error {
                    report.aborted = i + 1 < total;
                    break;
                }
            }
        }
        info!(
            progress = i + 1,
            total,
            succeeded = report.succeeded.len() + report.skipped_dry_run.len(),
            failed = report.failures.len(),
            "{op} progress"
        );
    }
    if report.aborted {
        warn!(remaining = total - report.processed(), "stopped on first error");
    }
    report
}

enum Outcome {
    Applied,
    DryRun,
}

async fn process(
    client: &ZnClient,
    ctx: &GateContext,
    op: GateOp,
    req: &PinRequest,
    opts: &PinOptions,
) -> Result<Outcome, CoreError> {
    let cluster_id = match op {
        GateOp::Pin => {
            let wanted = req
                .cluster
                .as_deref()
                .ok_or_else(|| CoreError::validation("no deployment cluster given"))?;
            let cluster = ctx.find_cluster(wanted).ok_or_else(|| {
                CoreError::validation(format!("deployment cluster '{wanted}' not found"))
            })?;
            Some(cluster.id.clone())
        }
        GateOp::Unpin => None,
    };

    let asset = client.get_asset(&req.asset_id).await?;
    if opts.skip_validation {
        warn!(asset = %asset.id, "validation skipped");
    } else {
        gate::evaluate(&asset, op, ctx)?;
    }

    if opts.dry_run {
        info!(asset = %asset.id, name = %asset.name, "dry run: would {op}");
        return Ok(Outcome::DryRun);
    }
    match cluster_id {
        Some(cluster_id) => client.pin_asset(&asset.id, &cluster_id).await?,
        None => client.unpin_asset(&asset.id).await?,
    }
    info!(asset = %asset.id, name = %asset.name, "{op} applied");
    Ok(Outcome::Applied)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reads_assets_with_optional_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulk.csv");
        std::fs::write(&path, "assetid,CLUSTERID\na:a:1,East\na:a:2,\n\n").unwrap();
        let requests = read_requests(&path, Some("C:d:9")).unwrap();
        assert_eq!(
            requests,
            vec![
                PinRequest::new("a:a:1", Some("East".into())),
                PinRequest::new("a:a:2", Some("C:d:9".into())),
            ]
        );
    }

    #[test]
    fn missing_asset_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulk.csv");
        std::fs::write(&path, "Name\nsrv\n").unwrap();
        assert!(matches!(read_requests(&path, None), Err(CoreError::Csv { .. })));
    }

    #[test]
    fn template_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.csv");
        write_template(&path, GateOp::Pin).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "AssetId,ClusterId\n");
        write_template(&path, GateOp::Unpin).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "AssetId\n");
    }
}
