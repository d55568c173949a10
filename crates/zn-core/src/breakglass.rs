// ── Break glass ──
//
// Runs an operator-supplied command once per target asset through the
// worker pool. The command is whatever remote transport the operator
// already uses; this module only renders placeholders, runs the process and
// records the outcome.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};
use zn_api::ZnClient;
use zn_api::types::Asset;

use crate::csv;
use crate::error::CoreError;
use crate::pinning;
use crate::pool::{JobLog, JobOutcome, WorkerPool};

pub const SUCCESS_LOG: &str = "breakglass_success.log";
pub const FAILURE_LOG: &str = "breakglass_failure.log";
pub const DEFAULT_CONCURRENCY: usize = 100;

const PLACEHOLDERS: [&str; 3] = ["{fqdn}", "{name}", "{id}"];

/// Asset a command runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub fqdn: Option<String>,
}

impl Target {
    /// FQDN when known, else the name.
    pub fn host(&self) -> &str {
        self.fqdn.as_deref().unwrap_or(&self.name)
    }
}

impl From<Asset> for Target {
    fn from(asset: Asset) -> Self {
        let fqdn = asset
            .fqdn
            .filter(|f| !f.trim().is_empty())
            .map(|f| f.trim().to_owned());
        Self {
            id: asset.id,
            name: asset.name,
            fqdn,
        }
    }
}

/// Where the target list comes from.
#[derive(Debug, Clone)]
pub enum TargetSource {
    Assets(Vec<String>),
    /// CSV with an `AssetId` column.
    Csv(PathBuf),
    /// Members of a custom group.
    Group(String),
}

/// Targets ready to run, plus the ids that could not be looked up.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTargets {
    pub targets: Vec<Target>,
    /// One failed outcome per unresolvable id, keyed by the id.
    pub unresolved: Vec<JobOutcome>,
}

impl ResolvedTargets {
    pub fn len(&self) -> usize {
        self.targets.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve `source` into concrete assets.
///
/// An id the API rejects (unknown, malformed) becomes a failed outcome and
/// the rest still run. Auth and transport failures abort: they would fail
/// every id the same way.
pub async fn resolve_targets(
    client: &ZnClient,
    source: &TargetSource,
) -> Result<ResolvedTargets, CoreError> {
    let ids = match source {
        TargetSource::Group(group_id) => {
            let members = client.list_group_members(group_id).await?;
            info!(group = %group_id, count = members.len(), "resolved group members");
            return Ok(ResolvedTargets {
                targets: members.into_iter().map(Target::from).collect(),
                unresolved: Vec::new(),
            });
        }
        TargetSource::Assets(ids) => ids.clone(),
        TargetSource::Csv(path) => csv::read_column(path, pinning::ASSET_COLUMN)?,
    };
    let mut resolved = ResolvedTargets::default();
    for id in ids {
        match client.get_asset(&id).await {
            Ok(asset) => resolved.targets.push(Target::from(asset)),
            Err(e) if e.is_auth() || e.is_transient() => return Err(e.into()),
            Err(e) => {
                warn!(asset = %id, error = %e, "cannot resolve target");
                resolved
                    .unresolved
                    .push(JobOutcome::failed(id, format!("lookup failed: {e}")));
            }
        }
    }
    Ok(resolved)
}

/// A shell command with `{fqdn}`, `{name}` and `{id}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::validation("command template cannot be empty"));
        }
        if !PLACEHOLDERS.iter().any(|p| raw.contains(p)) {
            warn!("command template has no placeholders; every target runs the same command");
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute the target's values. Values are inserted unquoted, so
    /// anything outside a conservative hostname alphabet is refused.
    pub fn render(&self, target: &Target) -> Result<String, CoreError> {
        let mut out = self.0.clone();
        for (placeholder, value) in [
            ("{fqdn}", target.host()),
            ("{name}", target.name.as_str()),
            ("{id}", target.id.as_str()),
        ] {
            if !out.contains(placeholder) {
                continue;
            }
            if !is_shell_safe(value) {
                return Err(CoreError::validation(format!(
                    "refusing to substitute unsafe value '{value}' for {placeholder}"
                )));
            }
            out = out.replace(placeholder, value);
        }
        Ok(out)
    }
}

fn is_shell_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'))
}

#[derive(Debug, Clone)]
pub struct BreakGlassOptions {
    pub concurrency: usize,
    /// Per-command limit; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub log_dir: PathBuf,
}

impl Default for BreakGlassOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            log_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakGlassReport {
    pub outcomes: Vec<JobOutcome>,
    pub log: JobLog,
    pub success_log: PathBuf,
    pub failure_log: PathBuf,
}

impl BreakGlassReport {
    pub fn is_success(&self) -> bool {
        self.log.failed == 0
    }
}

/// Run the command against every resolved target, then write both logs.
/// Unresolved ids go to the failure log first.
pub async fn run(
    resolved: ResolvedTargets,
    template: &CommandTemplate,
    opts: &BreakGlassOptions,
) -> Result<BreakGlassReport, CoreError> {
    let ResolvedTargets {
        targets,
        unresolved: mut outcomes,
    } = resolved;
    let pool = WorkerPool::new(opts.concurrency);
    info!(
        targets = targets.len(),
        unresolved = outcomes.len(),
        workers = pool.workers_for(targets.len()),
        "running break glass"
    );

    let template = template.clone();
    let timeout = opts.timeout;
    let ran = pool
        .run(targets, move |target| {
            let template = template.clone();
            async move { run_one(&target, &template, timeout).await }
        })
        .await?;
    outcomes.extend(ran);

    let success_log = opts.log_dir.join(SUCCESS_LOG);
    let failure_log = opts.log_dir.join(FAILURE_LOG);
    let log = JobLog::write(&outcomes, &success_log, &failure_log)?;
    info!(succeeded = log.succeeded, failed = log.failed, "break glass finished");
    Ok(BreakGlassReport {
        outcomes,
        log,
        success_log,
        failure_log,
    })
}

async fn run_one(
    target: &Target,
    template: &CommandTemplate,
    timeout: Option<Duration>,
) -> JobOutcome {
    let key = target.host().to_owned();
    let command = match template.render(target) {
        Ok(command) => command,
        Err(e) => return JobOutcome::failed(key, e.to_string()),
    };
    debug!(target = %key, %command, "spawning");

    let mut cmd = shell(&command);
    cmd.env("ZN_ASSET_ID", &target.id)
        .env("ZN_ASSET_NAME", &target.name)
        .env("ZN_ASSET_FQDN", target.host())
        .stdin(Stdio::null())
        .kill_on_drop(true);
    let output = cmd.output();
    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, output).await {
            Ok(result) => result,
            Err(_) => return JobOutcome::failed(key, format!("timed out after {limit:?}")),
        },
        None => output.await,
    };

    match output {
        Ok(out) if out.status.success() => {
            JobOutcome::ok(key, String::from_utf8_lossy(&out.stdout).trim())
        }
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(target = %key, status = %out.status, "command failed");
            JobOutcome::failed(key, format!("{}: {}", out.status, stderr.trim()))
        }
        Err(e) => JobOutcome::failed(key, format!("failed to spawn: {e}")),
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn target(name: &str, fqdn: Option<&str>) -> Target {
        Target {
            id: "a:a:1".into(),
            name: name.into(),
            fqdn: fqdn.map(Into::into),
        }
    }

    #[test]
    fn renders_placeholders() {
        let t = CommandTemplate::parse("ssh {fqdn} open --asset {id} # {name}").unwrap();
        let rendered = t.render(&target("SRV-01", Some("srv-01.corp.local"))).unwrap();
        assert_eq!(rendered, "ssh srv-01.corp.local open --asset a:a:1 # SRV-01");
    }

    #[test]
    fn fqdn_falls_back_to_name() {
        let t = CommandTemplate::parse("ping {fqdn}").unwrap();
        assert_eq!(t.render(&target("SRV-02", None)).unwrap(), "ping SRV-02");
    }

    #[test]
    fn refuses_unsafe_values() {
        let t = CommandTemplate::parse("ping {name}").unwrap();
        assert!(t.render(&target("x; rm -rf /", None)).is_err());
        assert!(CommandTemplate::parse("  ").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_commands_and_writes_logs() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BreakGlassOptions {
            concurrency: 2,
            timeout: Some(Duration::from_secs(10)),
            log_dir: dir.path().to_path_buf(),
        };
        let template = CommandTemplate::parse("test {name} != bad && echo opened {name}").unwrap();
        let resolved = ResolvedTargets {
            targets: vec![target("good", None), target("bad", None), target("fine", None)],
            unresolved: Vec::new(),
        };
        let report = run(
            resolved,
            &template,
            &opts,
        )
        .await
        .unwrap();

        assert_eq!(report.log, JobLog { succeeded: 2, failed: 1 });
        assert!(!report.is_success());
        let ok = std::fs::read_to_string(&report.success_log).unwrap();
        assert_eq!(ok, "good: opened good\nfine: opened fine\n");
        let failed = std::fs::read_to_string(&report.failure_log).unwrap();
        assert!(failed.starts_with("bad: "));
    }
}
