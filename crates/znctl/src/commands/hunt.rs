//! Threat hunting over network activity.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use zn_core::hunt::{self, FieldValues, HuntContext, HuntQuery, SortOrder};

use crate::cli::{GlobalOpts, HuntArgs, HuntCommand, HuntIndicatorsArgs, HuntOrder, HuntWindow};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

/// Columns shown in table and plain output; structured formats keep all.
const DISPLAY_COLUMNS: [&str; 8] = [
    "iso_timestamp",
    "indicators",
    "src.srcAssetName",
    "src.processName",
    "dst.fqdn",
    "dst.ip",
    "dst.port",
    "state",
];

pub async fn handle(
    session: &Session,
    args: HuntArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        HuntCommand::Activities(args) => {
            let values = FieldValues {
                domains: args.domains,
                ports: args.ports,
                src_processes: args.src_processes,
                dst_processes: args.dst_processes,
                ips: args.ips,
            };
            if values.is_empty() {
                return Err(CliError::Validation {
                    field: "hunt".into(),
                    reason: "give at least one --domain, --port, --src-process, --dst-process or --ip"
                        .into(),
                });
            }
            let query = build_query(&args.window)?;
            let ctx = load_context(session, &args.window, global).await?;

            let pb = util::spinner("Searching network activity...", global);
            let hits = hunt::hunt_activities(&ctx, &values, &query).await;
            let rows = match hits {
                Ok(hits) => hunt::activity_rows(&ctx, &hits).await,
                Err(e) => Err(e),
            };
            pb.finish_and_clear();
            let rows = rows?;

            match args.export {
                Some(path) => {
                    let written = hunt::export_csv(&rows, &path)?;
                    util::status(
                        global,
                        true,
                        &format!("{} activities written to {}", rows.len(), written.display()),
                    );
                }
                None => {
                    let flat: Vec<Map<String, Value>> = rows.iter().map(hunt::flatten).collect();
                    let out = output::render_rows(&global.output, &flat, &DISPLAY_COLUMNS)?;
                    output::print_output(&out, global.quiet);
                }
            }
            Ok(())
        }

        HuntCommand::Indicators(args) => {
            if args.workers == 0 {
                return Err(CliError::Validation {
                    field: "workers".into(),
                    reason: "must be at least 1".into(),
                });
            }
            let sets = hunt::load_sets(&indicator_source(&args, global).await?)?;
            let query = build_query(&args.window)?;
            let ctx = Arc::new(load_context(session, &args.window, global).await?);

            let pb = util::spinner(&format!("Hunting {} indicator sets...", sets.len()), global);
            let total_sets = sets.len();
            let found = hunt::hunt_sets(Arc::clone(&ctx), sets, &query, args.workers).await;
            let rows = match found {
                Ok(found) => hunt::indicator_rows(&ctx, &found).await,
                Err(e) => Err(e),
            };
            pb.finish_and_clear();
            let rows = rows?;

            let written = hunt::export_csv(&rows, &args.export)?;
            if rows.is_empty() {
                util::status(
                    global,
                    true,
                    &format!(
                        "No indicating activity found across {total_sets} indicator sets \
                         (empty report at {})",
                        written.display()
                    ),
                );
            } else {
                util::status(
                    global,
                    true,
                    &format!(
                        "{} indicating activities written to {}",
                        rows.len(),
                        written.display()
                    ),
                );
            }
            Ok(())
        }
    }
}

/// Indicator file or directory: given directly, or a fresh catalog checkout.
async fn indicator_source(
    args: &HuntIndicatorsArgs,
    global: &GlobalOpts,
) -> Result<PathBuf, CliError> {
    if let Some(ref file) = args.file {
        return Ok(file.clone());
    }
    let Some(ref repo) = args.catalog_repo else {
        return Err(CliError::Validation {
            field: "indicators".into(),
            reason: "give an indicator file or --catalog-repo".into(),
        });
    };
    let pb = util::spinner("Fetching indicator catalog...", global);
    let dir = hunt::fetch_catalog(repo, &args.catalog_dir, args.catalog_branch.as_deref()).await;
    pb.finish_and_clear();
    let dir = dir?;
    util::status(global, true, &format!("Indicator catalog at {}", dir.display()));
    Ok(dir)
}

fn build_query(window: &HuntWindow) -> Result<HuntQuery, CliError> {
    if window.limit == 0 {
        return Err(CliError::Validation {
            field: "limit".into(),
            reason: "must be at least 1".into(),
        });
    }
    let mut query = HuntQuery::between(window.from.as_deref(), window.to.as_deref())?
        .with_limit(window.limit);
    if let Some(ref search) = window.search {
        query = query.with_search(search.clone());
    }
    if let Some(ref entity) = window.entity {
        query = query.with_entity(entity.clone());
    }
    query.order = match window.order {
        HuntOrder::Asc => SortOrder::Asc,
        HuntOrder::Desc => SortOrder::Desc,
    };
    Ok(query)
}

async fn load_context(
    session: &Session,
    window: &HuntWindow,
    global: &GlobalOpts,
) -> Result<HuntContext, CliError> {
    let pb = util::spinner("Loading network filters...", global);
    let ctx = HuntContext::load(session.client.clone(), window.filters_file.as_deref()).await;
    pb.finish_and_clear();
    Ok(ctx?)
}
