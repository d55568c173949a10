//! Asset command handlers.

use tabled::Tabled;

use zn_api::types::Asset;
use zn_api::{FilterSet, PageStrategy, Query, sort_by_name_desc};

use crate::cli::{AssetListArgs, AssetsArgs, AssetsCommand, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct AssetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "FQDN")]
    fqdn: String,
    #[tabled(rename = "Monitored by")]
    monitored_by: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Protection")]
    protection: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
}

impl From<&Asset> for AssetRow {
    fn from(a: &Asset) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            fqdn: output::or_dash(a.fqdn.as_deref()),
            monitored_by: output::or_dash(a.monitored_by),
            health: output::or_dash(a.health_state),
            protection: output::or_dash(a.protection_state),
            cluster: output::or_dash(a.deployments_cluster_id.as_deref()),
        }
    }
}

fn detail(a: &Asset) -> String {
    output::detail_lines(&[
        ("ID", a.id.clone()),
        ("Name", a.name.clone()),
        ("FQDN", output::or_dash(a.fqdn.as_deref())),
        ("Monitored by", output::or_dash(a.monitored_by)),
        ("Health", output::or_dash(a.health_state)),
        ("Protection", output::or_dash(a.protection_state)),
        ("Cluster", output::or_dash(a.deployments_cluster_id.as_deref())),
        ("Cluster source", output::or_dash(a.cluster_source)),
    ])
}

pub async fn handle(
    session: &Session,
    args: AssetsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AssetsCommand::List(list) => {
            let query = list_query(&list)?;
            let strategy =
                PageStrategy::offset(list.page_size.unwrap_or(session.profile.page_size));

            let pb = util::spinner("Fetching assets", global);
            let result = session.client.list_assets(&query, &strategy).await;
            pb.finish_and_clear();
            let mut assets = result?;

            if list.servers_first {
                sort_by_name_desc(&mut assets, |a| a.name.as_str());
            }
            tracing::info!(count = assets.len(), "assets fetched");
            let out = output::render_list(&global.output, &assets, |a| AssetRow::from(a), |a| a.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AssetsCommand::Get { id } => {
            let asset = session.client.get_asset(id.trim()).await?;
            let out = output::render_single(&global.output, &asset, detail, |a| a.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn list_query(args: &AssetListArgs) -> Result<Query, CliError> {
    let mut query = Query::new().with_opt("_search", args.search.as_deref().filter(|s| !s.is_empty()));
    if let Some(ref raw) = args.filter {
        FilterSet::parse(raw)?.apply(&mut query)?;
    }
    Ok(query)
}
