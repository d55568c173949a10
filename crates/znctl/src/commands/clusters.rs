//! Deployment cluster command handlers: listing, pin, unpin.

use tabled::Tabled;

use zn_api::types::{DeploymentCluster, MonitoringMethod};
use zn_core::gate::{GateContext, GateOp};
use zn_core::pinning::{self, PinOptions, PinReport, PinRequest};
use zn_core::{EntityId, EntityKind};

use crate::cli::{ClustersArgs, ClustersCommand, GlobalOpts, PinFlags};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Segment Servers")]
    servers: usize,
}

impl From<&DeploymentCluster> for ClusterRow {
    fn from(c: &DeploymentCluster) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            servers: c.segment_server_ids.len(),
        }
    }
}

pub async fn handle(
    session: &Session,
    args: ClustersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ClustersCommand::List => {
            let mut clusters = session.client.list_deployment_clusters().await?;
            clusters.sort_by(|a, b| a.name.cmp(&b.name));
            let out =
                output::render_list(&global.output, &clusters, |c| ClusterRow::from(c), |c| c.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClustersCommand::Pin(pin) => {
            let requests = match (pin.asset, pin.csv) {
                (_, Some(path)) => pinning::read_requests(&path, pin.cluster.as_deref())?,
                (Some(asset), None) => {
                    let cluster = pin.cluster.ok_or_else(|| CliError::Validation {
                        field: "cluster".into(),
                        reason: "--cluster is required when pinning a single asset".into(),
                    })?;
                    vec![PinRequest::new(asset_id(&asset)?, Some(cluster))]
                }
                (None, None) => return Err(no_source()),
            };
            apply(session, GateOp::Pin, &requests, &pin.flags, global).await
        }

        ClustersCommand::Unpin(unpin) => {
            let requests = match (unpin.asset, unpin.csv) {
                (_, Some(path)) => pinning::read_requests(&path, None)?,
                (Some(asset), None) => vec![PinRequest::new(asset_id(&asset)?, None)],
                (None, None) => return Err(no_source()),
            };
            apply(session, GateOp::Unpin, &requests, &unpin.flags, global).await
        }

        ClustersCommand::Template { path, unpin } => write_template(&path, unpin, global),
    }
}

/// Write the bulk input CSV for pin (or unpin).
pub fn write_template(
    path: &std::path::Path,
    unpin: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let op = if unpin { GateOp::Unpin } else { GateOp::Pin };
    pinning::write_template(path, op)?;
    util::status(
        global,
        true,
        &format!("{op} template written to {}", path.display()),
    );
    Ok(())
}

fn asset_id(raw: &str) -> Result<String, CliError> {
    Ok(EntityId::parse_kind(raw, EntityKind::Asset)?.into_inner())
}

fn no_source() -> CliError {
    CliError::Validation {
        field: "asset".into(),
        reason: "give an asset id or --csv".into(),
    }
}

fn options(flags: &PinFlags) -> Result<PinOptions, CliError> {
    let expected_method =
        MonitoringMethod::from_name(&flags.monitored_by).ok_or_else(|| CliError::Validation {
            field: "monitored-by".into(),
            reason: format!(
                "unknown monitoring method '{}' (segment-server, agent, cloud-connector, manual)",
                flags.monitored_by
            ),
        })?;
    Ok(PinOptions {
        dry_run: flags.dry_run,
        skip_validation: flags.skip_validation,
        stop_on_error: flags.stop_on_error,
        expected_method,
    })
}

async fn apply(
    session: &Session,
    op: GateOp,
    requests: &[PinRequest],
    flags: &PinFlags,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let opts = options(flags)?;

    if requests.len() > 1
        && !opts.dry_run
        && !util::confirm(
            &format!("{op} {} assets?", requests.len()),
            &op.to_string(),
            global.yes,
        )?
    {
        return Ok(());
    }

    let pb = util::spinner("Loading clusters and segment servers...", global);
    let ctx = GateContext::load(&session.client, opts.expected_method).await;
    pb.finish_and_clear();
    let ctx = ctx?;

    let report = pinning::run(&session.client, &ctx, op, requests, &opts).await;
    summarize(&report, requests.len(), op, global)
}

fn summarize(
    report: &PinReport,
    total: usize,
    op: GateOp,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    for id in &report.skipped_dry_run {
        util::status(global, true, &format!("{id}: would {op}"));
    }
    for failure in &report.failures {
        util::status(global, false, &format!("{}: {}", failure.asset_id, failure.reason));
    }

    let done = report.succeeded.len() + report.skipped_dry_run.len();
    let label = if report.skipped_dry_run.is_empty() {
        format!("{done} of {total} assets {op}ned")
    } else {
        format!("{done} of {total} assets passed validation (dry run)")
    };
    util::status(global, report.is_success(), &label);
    if report.aborted {
        util::status(
            global,
            false,
            &format!("stopped early, {} assets not processed", total - report.processed()),
        );
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::PartialFailure {
            operation: op.to_string(),
            failed: total - report.succeeded.len() - report.skipped_dry_run.len(),
            total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn pin_flags(args: &[&str]) -> PinFlags {
        let mut argv = vec!["znctl", "clusters", "pin", "a:a:1", "-c", "c1"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Clusters(ClustersArgs {
                command: ClustersCommand::Pin(pin),
            }) => pin.flags,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn default_method_is_segment_server() {
        let opts = options(&pin_flags(&[])).unwrap();
        assert_eq!(opts.expected_method, MonitoringMethod::SegmentServer);
        assert!(!opts.dry_run);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = options(&pin_flags(&["--monitored-by", "carrier-pigeon"])).unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "monitored-by"));
    }

    #[test]
    fn asset_ids_must_be_assets() {
        assert_eq!(asset_id("a:a:abc").unwrap(), "a:a:abc");
        assert!(asset_id("g:c:abc").is_err());
    }

    #[test]
    fn failed_items_are_a_partial_failure() {
        let global = Cli::try_parse_from(["znctl", "-q", "config", "path"]).unwrap().global;
        let report = PinReport {
            succeeded: vec!["a:a:1".into()],
            failures: vec![pinning::PinFailure {
                asset_id: "a:a:2".into(),
                reason: "not monitored by segment server".into(),
            }],
            ..PinReport::default()
        };
        let err = summarize(&report, 2, GateOp::Pin, &global).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 pin operations failed");
    }
}
