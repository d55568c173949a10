//! Break-glass: run an operator command against many assets at once.

use std::time::Duration;

use zn_core::breakglass::{self, BreakGlassOptions, CommandTemplate, TargetSource};

use crate::cli::{BreakGlassArgs, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

use super::util;

pub async fn handle(
    session: &Session,
    args: BreakGlassArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let template = CommandTemplate::parse(&args.command)?;
    let source = target_source(&args)?;
    let opts = options(session, &args)?;

    let pb = util::spinner("Resolving target assets...", global);
    let resolved = breakglass::resolve_targets(&session.client, &source).await;
    pb.finish_and_clear();
    let resolved = resolved?;
    if resolved.is_empty() {
        util::status(global, true, "No target assets, nothing to run");
        return Ok(());
    }

    if !resolved.targets.is_empty()
        && !util::confirm(
            &format!(
                "Run `{}` against {} assets?",
                template.as_str(),
                resolved.targets.len()
            ),
            "break-glass",
            global.yes,
        )?
    {
        return Ok(());
    }

    let total = resolved.len();
    let pb = util::spinner(
        &format!("Running on {} assets...", resolved.targets.len()),
        global,
    );
    let report = breakglass::run(resolved, &template, &opts).await;
    pb.finish_and_clear();
    let report = report?;

    for outcome in report.outcomes.iter().filter(|o| !o.success) {
        util::status(global, false, &format!("{}: {}", outcome.key, outcome.detail));
    }
    util::status(
        global,
        report.is_success(),
        &format!("{} of {total} commands succeeded", report.log.succeeded),
    );
    util::status(
        global,
        true,
        &format!(
            "Logs: {} and {}",
            report.success_log.display(),
            report.failure_log.display()
        ),
    );

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::PartialFailure {
            operation: "break-glass".into(),
            failed: report.log.failed,
            total,
        })
    }
}

fn target_source(args: &BreakGlassArgs) -> Result<TargetSource, CliError> {
    if let Some(ref group) = args.group {
        return Ok(TargetSource::Group(util::custom_group_id(group)?.into_inner()));
    }
    if let Some(ref path) = args.csv {
        return Ok(TargetSource::Csv(path.clone()));
    }
    if args.assets.is_empty() {
        return Err(CliError::Validation {
            field: "targets".into(),
            reason: "give --asset, --csv or --group".into(),
        });
    }
    Ok(TargetSource::Assets(util::member_ids(args.assets.clone())?))
}

fn options(session: &Session, args: &BreakGlassArgs) -> Result<BreakGlassOptions, CliError> {
    let concurrency = args.concurrency.unwrap_or(session.profile.concurrency);
    if concurrency == 0 {
        return Err(CliError::Validation {
            field: "concurrency".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(BreakGlassOptions {
        concurrency,
        timeout: args
            .command_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
        log_dir: args.log_dir.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn args(extra: &[&str]) -> BreakGlassArgs {
        let mut argv = vec!["znctl", "break-glass", "--command", "ping -c1 {fqdn}"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::BreakGlass(a) => a,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn group_target_needs_a_custom_group() {
        assert!(matches!(
            target_source(&args(&["--group", "g:c:ops"])).unwrap(),
            TargetSource::Group(ref id) if id == "g:c:ops"
        ));
        assert!(target_source(&args(&["--group", "a:a:1"])).is_err());
    }

    #[test]
    fn repeated_assets_are_kept_in_order() {
        let source = target_source(&args(&["--asset", "a:a:1", "--asset", "a:a:2"])).unwrap();
        assert!(matches!(source, TargetSource::Assets(ref ids) if ids == &["a:a:1", "a:a:2"]));
    }

    #[test]
    fn targets_are_required() {
        let argv = ["znctl", "break-glass", "--command", "true"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
