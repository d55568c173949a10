// Indicator catalog checkout: clone or fast-forward a git repository of
// catalog documents and hand back the directory holding them.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::CoreError;

/// Directory inside the checkout that holds one document per tool.
pub const CATALOG_SUBDIR: &str = "RMMs";

/// Checkout directory name for `repo_url`: its last path segment without
/// a `.git` suffix.
pub fn checkout_name(repo_url: &str) -> Result<String, CoreError> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return Err(CoreError::validation(format!(
            "cannot derive a checkout directory from '{repo_url}'"
        )));
    }
    Ok(name.to_owned())
}

/// `git` arguments that bring `dest` up to date: a fast-forward pull for an
/// existing checkout, otherwise a shallow clone.
fn git_args(repo_url: &str, dest: &Path, branch: Option<&str>, existing: bool) -> Vec<String> {
    let dest = dest.display().to_string();
    if existing {
        return vec!["-C".into(), dest, "pull".into(), "--ff-only".into()];
    }
    let mut args = vec!["clone".into(), "--depth".into(), "1".into()];
    if let Some(branch) = branch {
        args.extend(["--branch".into(), branch.to_owned()]);
    }
    args.extend([repo_url.trim().to_owned(), dest]);
    args
}

/// Clone `repo_url` under `workdir`, or update the checkout already there,
/// and return its catalog directory.
pub async fn fetch_catalog(
    repo_url: &str,
    workdir: &Path,
    branch: Option<&str>,
) -> Result<PathBuf, CoreError> {
    let dest = workdir.join(checkout_name(repo_url)?);
    let existing = dest.join(".git").is_dir();
    if !existing && dest.exists() {
        return Err(CoreError::validation(format!(
            "{} exists and is not a git checkout",
            dest.display()
        )));
    }

    let args = git_args(repo_url, &dest, branch, existing);
    info!(repo = repo_url, dest = %dest.display(), update = existing, "fetching indicator catalog");
    debug!(?args, "running git");
    let output = Command::new("git")
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CoreError::Process {
            message: format!("cannot run git: {e}"),
        })?;
    if !output.status.success() {
        return Err(CoreError::Process {
            message: format!(
                "git {} failed ({}): {}",
                args.first().map_or("", String::as_str),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    catalog_dir(&dest)
}

/// The checkout's catalog directory, refused unless it holds YAML files.
pub fn catalog_dir(checkout: &Path) -> Result<PathBuf, CoreError> {
    let dir = checkout.join(CATALOG_SUBDIR);
    let entries = std::fs::read_dir(&dir).map_err(|e| CoreError::io(&dir, e))?;
    let has_yaml = entries.filter_map(Result::ok).any(|entry| {
        entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "yaml" | "yml"))
    });
    if !has_yaml {
        return Err(CoreError::validation(format!(
            "no catalog documents in {}",
            dir.display()
        )));
    }
    Ok(dir)
}
