//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use zn_core::{EntityId, EntityKind, GroupSource};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the action is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// A stderr spinner; hidden in quiet mode or when stderr is not a terminal.
pub fn spinner(message: &str, global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Require a custom group id (`g:c:...`).
pub fn custom_group_id(raw: &str) -> Result<EntityId, CliError> {
    Ok(EntityId::parse_kind(
        raw,
        EntityKind::Group(GroupSource::Custom),
    )?)
}

/// Parse member ids, warning about ids that are neither assets nor
/// identities.
pub fn member_ids(raw: Vec<String>) -> Result<Vec<String>, CliError> {
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let id: EntityId = value.parse()?;
        if !matches!(id.kind(), EntityKind::Asset | EntityKind::Identity) {
            tracing::warn!(id = %id, kind = %id.kind(), "unexpected member id kind");
        }
        ids.push(id.into_inner());
    }
    Ok(ids)
}

/// Ids from positional arguments, or from a CSV `AssetId` column.
pub fn ids_from(args: Vec<String>, csv: Option<&Path>) -> Result<Vec<String>, CliError> {
    let raw = match csv {
        Some(path) => zn_core::csv::read_column(path, zn_core::pinning::ASSET_COLUMN)?,
        None => args,
    };
    if raw.is_empty() {
        return Err(CliError::Validation {
            field: "ids".into(),
            reason: "no ids given".into(),
        });
    }
    member_ids(raw)
}

/// Print a status line to stderr unless quiet.
pub fn status(global: &GlobalOpts, ok: bool, text: &str) {
    if global.quiet {
        return;
    }
    let color = output::should_color(&global.color);
    if ok {
        eprintln!("{}", output::ok_mark(text, color));
    } else {
        eprintln!("{}", output::fail_mark(text, color));
    }
}
