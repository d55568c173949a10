//! Custom group command handlers.

use tabled::Tabled;

use zn_api::types::{Asset, CustomGroup};
use zn_api::{PageStrategy, Query};
use zn_core::{BatchOptions, BatchReport, submit_batches};

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand, MembersArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Members")]
    members: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&CustomGroup> for GroupRow {
    fn from(g: &CustomGroup) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            members: output::or_dash(g.members_count),
            description: g.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "FQDN")]
    fqdn: String,
}

impl From<&Asset> for MemberRow {
    fn from(a: &Asset) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            fqdn: output::or_dash(a.fqdn.as_deref()),
        }
    }
}

fn detail(g: &CustomGroup) -> String {
    output::detail_lines(&[
        ("ID", g.id.clone()),
        ("Name", g.name.clone()),
        ("Description", output::or_dash(g.description.as_deref())),
        ("Members", output::or_dash(g.members_count)),
    ])
}

#[derive(Debug, Clone, Copy)]
enum MemberChange {
    Add,
    Remove,
}

impl MemberChange {
    fn verb(self) -> &'static str {
        match self {
            Self::Add => "add-members",
            Self::Remove => "remove-members",
        }
    }
}

pub async fn handle(
    session: &Session,
    args: GroupsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = &session.client;
    match args.command {
        GroupsCommand::List { search } => {
            let query = Query::new().with_opt("_search", search.as_deref());
            let strategy = PageStrategy::offset(session.profile.page_size);
            let groups = client.list_custom_groups(&query, &strategy).await?;
            let out = output::render_list(&global.output, &groups, |g| GroupRow::from(g), |g| g.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Get { id } => {
            let id = util::custom_group_id(&id)?;
            let group = client.get_custom_group(id.as_str()).await?;
            let out = output::render_single(&global.output, &group, detail, |g| g.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Create { name, description } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "group name cannot be empty".into(),
                });
            }
            let upserted = client.create_custom_group(name, &description).await?;
            if upserted.created {
                util::status(global, true, &format!("Created group '{name}'"));
            } else {
                util::status(global, true, &format!("Group '{name}' already exists, reusing it"));
            }
            let out = output::render_single(&global.output, &upserted.entity, detail, |g| {
                g.id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Members { group } => {
            let id = util::custom_group_id(&group)?;
            let members = client.list_group_members(id.as_str()).await?;
            let out =
                output::render_list(&global.output, &members, |a| MemberRow::from(a), |a| a.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::AddMembers(members) => {
            change_members(session, members, MemberChange::Add, global).await
        }
        GroupsCommand::RemoveMembers(members) => {
            change_members(session, members, MemberChange::Remove, global).await
        }
    }
}

async fn change_members(
    session: &Session,
    args: MembersArgs,
    change: MemberChange,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let group = util::custom_group_id(&args.group)?;
    let ids = util::ids_from(args.ids, args.csv.as_deref())?;
    let opts = BatchOptions {
        chunk_size: args.chunk_size.unwrap_or(session.profile.chunk_size),
        continue_on_error: args.continue_on_error,
        retry: session.batch_retry(),
    };

    if matches!(change, MemberChange::Remove)
        && !util::confirm(
            &format!("Remove {} members from {group}?", ids.len()),
            change.verb(),
            global.yes,
        )?
    {
        return Ok(());
    }

    let client = &session.client;
    let group_id = group.as_str();
    let report = submit_batches(&ids, &opts, move |chunk| async move {
        match change {
            MemberChange::Add => client.add_group_members(group_id, &chunk).await,
            MemberChange::Remove => client.remove_group_members(group_id, &chunk).await,
        }
    })
    .await?;

    summarize(&report, ids.len(), change, global)
}

fn summarize(
    report: &BatchReport,
    total: usize,
    change: MemberChange,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    for failure in &report.failures {
        util::status(
            global,
            false,
            &format!(
                "batch {} ({} ids) failed: {}",
                failure.index + 1,
                failure.ids.len(),
                failure.reason
            ),
        );
    }
    let verb = match change {
        MemberChange::Add => "added",
        MemberChange::Remove => "removed",
    };
    util::status(
        global,
        report.is_success(),
        &format!(
            "{} of {total} members {verb} in {} calls",
            report.succeeded, report.calls
        ),
    );
    if report.aborted {
        util::status(global, false, "stopped after the first failed batch");
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::PartialFailure {
            operation: change.verb().into(),
            failed: total - report.succeeded,
            total,
        })
    }
}
