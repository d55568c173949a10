// Indicator sets: named lists of domains, ports and executables hunted
// for together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::enrich::{HuntContext, IndicatorHit, dedupe};
use super::fields::{HuntField, hunt_field};
use super::query::HuntQuery;
use crate::error::CoreError;
use crate::pool::WorkerPool;

pub const DEFAULT_WORKERS: usize = 5;

/// Ports too common to say anything about a remote-management tool.
const IGNORED_PORTS: [&str; 2] = ["80", "443"];

const PLATFORMS: [&str; 3] = ["Linux", "MacOS", "Windows"];

/// Executable paths, either flat or grouped by platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Executables {
    Flat(Vec<String>),
    ByPlatform(IndexMap<String, Option<Vec<String>>>),
}

impl Default for Executables {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

impl Executables {
    pub fn paths(&self) -> Vec<String> {
        match self {
            Self::Flat(paths) => paths.clone(),
            Self::ByPlatform(by_os) => by_os.values().flatten().flatten().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndicatorSet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default, deserialize_with = "scalars")]
    pub ports: Vec<String>,
    #[serde(default)]
    pub executables: Executables,
}

impl IndicatorSet {
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.clone()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }

    /// Ports worth hunting: well-formed and not 80/443.
    pub fn hunted_ports(&self) -> Vec<String> {
        self.ports
            .iter()
            .map(|p| p.trim().to_owned())
            .filter(|p| !IGNORED_PORTS.contains(&p.as_str()))
            .filter(|p| {
                let ok = p.parse::<u16>().is_ok_and(|n| n > 0);
                if !ok {
                    warn!(set = %self.id, port = %p, "skipping malformed port");
                }
                ok
            })
            .collect()
    }
}

/// Accept numbers or strings in a YAML list.
fn scalars<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let raw: Option<Vec<serde_yaml::Value>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            serde_yaml::Value::String(s) => Some(s),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

// ── Catalog-style documents ──────────────────────────────────────────
//
// One tool per file, `Meta.ID`, `Executables.<Platform>` and
// `NetConn.{Domains,Ports}`; the file stem is the set name.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogDoc {
    #[serde(default)]
    meta: CatalogMeta,
    #[serde(default)]
    executables: IndexMap<String, serde_yaml::Value>,
    #[serde(default)]
    net_conn: CatalogNetConn,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogMeta {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogNetConn {
    #[serde(default)]
    domains: Option<Vec<String>>,
    #[serde(default, deserialize_with = "scalars")]
    ports: Vec<String>,
}

impl CatalogDoc {
    fn into_set(self, stem: &str) -> IndicatorSet {
        let executables = PLATFORMS
            .iter()
            .filter_map(|os| {
                let paths: Vec<String> = match self.executables.get(*os)? {
                    serde_yaml::Value::Sequence(items) => items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_owned))
                        .collect(),
                    _ => return None,
                };
                Some(((*os).to_owned(), Some(paths)))
            })
            .collect();
        let name = if stem.is_empty() {
            self.meta.description.unwrap_or_default()
        } else {
            stem.to_owned()
        };
        IndicatorSet {
            id: self.meta.id.unwrap_or_else(|| name.clone()),
            name,
            domains: self.net_conn.domains.unwrap_or_default(),
            ports: self.net_conn.ports,
            executables: Executables::ByPlatform(executables),
        }
    }
}

/// Load indicator sets from a YAML list file, a single catalog document,
/// or a directory of catalog documents (`*.yaml`, `*.yml`).
pub fn load_sets(path: &Path) -> Result<Vec<IndicatorSet>, CoreError> {
    let sets = if path.is_dir() {
        load_dir(path)?
    } else {
        load_file(path)?
    };
    if sets.is_empty() {
        return Err(CoreError::validation(format!(
            "no indicator sets found in {}",
            path.display()
        )));
    }
    info!(count = sets.len(), path = %path.display(), "indicator sets loaded");
    Ok(sets)
}

fn load_file(path: &Path) -> Result<Vec<IndicatorSet>, CoreError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    let invalid = |e: serde_yaml::Error| CoreError::Config {
        message: format!("invalid indicator file {}: {e}", path.display()),
    };
    let value: serde_yaml::Value = serde_yaml::from_str(&raw).map_err(invalid)?;
    if value.is_sequence() {
        return serde_yaml::from_value(value).map_err(invalid);
    }
    let doc: CatalogDoc = serde_yaml::from_value(value).map_err(invalid)?;
    Ok(vec![doc.into_set(&file_stem(path))])
}

fn load_dir(dir: &Path) -> Result<Vec<IndicatorSet>, CoreError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| CoreError::io(dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    files.sort();

    let mut sets = Vec::with_capacity(files.len());
    for file in &files {
        let parsed = std::fs::read_to_string(file)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_yaml::from_str::<Option<CatalogDoc>>(&raw).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(doc) => sets.push(doc.unwrap_or_default().into_set(&file_stem(file))),
            Err(e) => error!(file = %file.display(), error = %e, "failed to load indicator file"),
        }
    }
    debug!(files = files.len(), loaded = sets.len(), "indicator directory scanned");
    Ok(sets)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Hits found for one indicator set.
#[derive(Debug, Clone)]
pub struct SetHits {
    pub set: IndicatorSet,
    pub hits: Vec<IndicatorHit>,
}

/// Run the process, domain and port hunts for one set.
pub async fn hunt_set(
    ctx: &HuntContext,
    set: &IndicatorSet,
    query: &HuntQuery,
) -> Result<Vec<IndicatorHit>, CoreError> {
    info!(set = %set.label(), "hunting indicator set");
    let executables = set.executables.paths();
    let ports = set.hunted_ports();
    let mut tagged = Vec::new();

    let searches = [
        (HuntField::SourceProcess, &executables),
        (HuntField::DestinationProcess, &executables),
        (HuntField::Domain, &set.domains),
        (HuntField::DestinationPort, &ports),
    ];
    for (field, values) in searches {
        if values.is_empty() {
            continue;
        }
        let found = hunt_field(ctx.client(), ctx.catalog(), field, values, query).await?;
        tagged.extend(found.into_iter().map(|a| (field.indicator(), a)));
    }
    if !set.ports.is_empty() && ports.is_empty() {
        debug!(set = %set.id, "only common ports listed, port hunt skipped");
    }
    Ok(dedupe(tagged))
}

/// Hunt every set through a worker pool. A set whose hunt fails is logged
/// and left out; sets without hits are dropped.
pub async fn hunt_sets(
    ctx: Arc<HuntContext>,
    sets: Vec<IndicatorSet>,
    query: &HuntQuery,
    workers: usize,
) -> Result<Vec<SetHits>, CoreError> {
    let pool = WorkerPool::new(workers);
    info!(
        sets = sets.len(),
        workers = pool.workers_for(sets.len()),
        "starting indicator hunt"
    );
    let query = query.clone();
    let results = pool
        .run(sets, move |set| {
            let ctx = Arc::clone(&ctx);
            let query = query.clone();
            async move {
                let outcome = hunt_set(&ctx, &set, &query).await;
                (set, outcome)
            }
        })
        .await?;

    let mut found = Vec::new();
    for (set, outcome) in results {
        match outcome {
            Ok(hits) if hits.is_empty() => debug!(set = %set.label(), "no indicators found"),
            Ok(hits) => {
                info!(set = %set.label(), hits = hits.len(), "indicators found");
                found.push(SetHits { set, hits });
            }
            Err(e) => error!(set = %set.label(), error = %e, "indicator hunt failed"),
        }
    }
    info!(with_hits = found.len(), "indicator hunt finished");
    Ok(found)
}

/// Enrich every hit and tag it with its set.
pub async fn indicator_rows(
    ctx: &HuntContext,
    found: &[SetHits],
) -> Result<Vec<Map<String, Value>>, CoreError> {
    let mut rows = Vec::new();
    for entry in found {
        for hit in &entry.hits {
            let mut row = ctx.enrich(hit).await?;
            row.insert("indicator_set".into(), Value::String(entry.set.name.clone()));
            row.insert("indicator_set_id".into(), Value::String(entry.set.id.clone()));
            rows.push(row);
        }
    }
    Ok(rows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn loads_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sets.yaml");
        std::fs::write(
            &path,
            "- id: anydesk\n  name: AnyDesk\n  domains: [anydesk.com]\n  ports: [80, '443', 7070]\n  executables:\n    Windows: ['anydesk.exe']\n    Linux: ~\n",
        )
        .unwrap();
        let sets = load_sets(&path).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].ports, vec!["80", "443", "7070"]);
        assert_eq!(sets[0].hunted_ports(), vec!["7070"]);
        assert_eq!(sets[0].executables.paths(), vec!["anydesk.exe"]);
    }

    #[test]
    fn loads_catalog_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("teamviewer.yaml"),
            "Meta:\n  ID: 2f1b\n  Description: remote support\nExecutables:\n  Windows: [TeamViewer.exe]\n  MacOS: [TeamViewer]\n  SignerID: [ignored]\nNetConn:\n  Domains: ['*.teamviewer.com']\n  Ports: [5938]\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.yml"), "Meta: [unclosed\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let sets = load_sets(dir.path()).unwrap();
        assert_eq!(sets.len(), 1);
        let tv = &sets[0];
        assert_eq!(tv.id, "2f1b");
        assert_eq!(tv.name, "teamviewer");
        assert_eq!(tv.domains, vec!["*.teamviewer.com"]);
        assert_eq!(tv.executables.paths(), vec!["TeamViewer", "TeamViewer.exe"]);
        assert_eq!(tv.label(), "teamviewer (2f1b)");
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_sets(dir.path()).is_err());
    }
}
