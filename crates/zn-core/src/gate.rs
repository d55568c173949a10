// ── Pin/unpin precondition gate ──
//
// Independent predicates evaluated in a fixed order. The first failing
// predicate wins; later ones are not consulted.

use std::collections::{HashMap, HashSet};

use strum::{Display, EnumIter};
use thiserror::Error;
use tracing::debug;
use zn_api::ZnClient;
use zn_api::types::{
    Asset, ClusterAssignmentSource, DeploymentCluster, HealthState, MonitoringMethod,
};

use crate::error::CoreError;

/// Which mutation the gate protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum GateOp {
    Pin,
    Unpin,
}

/// Names of the individual checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum GateCheck {
    NotSegmentServer,
    MonitoredBy,
    Healthy,
    AssignmentSourceEligible,
    NotAlreadyAssigned,
    AlreadyAssigned,
}

impl GateCheck {
    /// The checks run for `op`, in order.
    pub fn sequence(op: GateOp) -> [GateCheck; 5] {
        let last = match op {
            GateOp::Pin => Self::NotAlreadyAssigned,
            GateOp::Unpin => Self::AlreadyAssigned,
        };
        [
            Self::NotSegmentServer,
            Self::MonitoredBy,
            Self::Healthy,
            Self::AssignmentSourceEligible,
            last,
        ]
    }

    fn run(self, asset: &Asset, ctx: &GateContext) -> Result<(), GateFailure> {
        match self {
            Self::NotSegmentServer => {
                if ctx.is_segment_server(&asset.id) {
                    return Err(GateFailure::IsSegmentServer {
                        asset: asset.name.clone(),
                    });
                }
            }
            Self::MonitoredBy => {
                if asset.monitored_by != Some(ctx.expected_method) {
                    return Err(GateFailure::WrongMonitoringMethod {
                        expected: ctx.expected_method,
                        actual: describe(asset.monitored_by),
                    });
                }
            }
            Self::Healthy => {
                if asset.health_state != Some(HealthState::Healthy) {
                    return Err(GateFailure::Unhealthy {
                        state: describe(asset.health_state),
                    });
                }
            }
            Self::AssignmentSourceEligible => match asset.cluster_source {
                None | Some(ClusterAssignmentSource::NotApplicable) => {
                    return Err(GateFailure::AssignmentNotApplicable);
                }
                Some(_) => {}
            },
            Self::NotAlreadyAssigned => {
                if asset.cluster_source == Some(ClusterAssignmentSource::Manual) {
                    return Err(GateFailure::AlreadyAssigned {
                        cluster: ctx.cluster_label(asset.deployments_cluster_id.as_deref()),
                    });
                }
            }
            Self::AlreadyAssigned => {
                if asset.cluster_source != Some(ClusterAssignmentSource::Manual) {
                    return Err(GateFailure::NotAssigned);
                }
            }
        }
        Ok(())
    }
}

fn describe<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_owned(), |v| v.to_string())
}

/// Why an asset was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateFailure {
    #[error("asset {asset} is a segment server")]
    IsSegmentServer { asset: String },

    #[error("asset is monitored by {actual}, expected {expected}")]
    WrongMonitoringMethod {
        expected: MonitoringMethod,
        actual: String,
    },

    #[error("asset health is {state}, expected Healthy")]
    Unhealthy { state: String },

    #[error("asset cluster assignment is not applicable")]
    AssignmentNotApplicable,

    #[error("asset is already assigned to cluster {cluster}")]
    AlreadyAssigned { cluster: String },

    #[error("asset is not assigned to a cluster")]
    NotAssigned,
}

impl GateFailure {
    /// The check that produced this failure.
    pub fn check(&self) -> GateCheck {
        match self {
            Self::IsSegmentServer { .. } => GateCheck::NotSegmentServer,
            Self::WrongMonitoringMethod { .. } => GateCheck::MonitoredBy,
            Self::Unhealthy { .. } => GateCheck::Healthy,
            Self::AssignmentNotApplicable => GateCheck::AssignmentSourceEligible,
            Self::AlreadyAssigned { .. } => GateCheck::NotAlreadyAssigned,
            Self::NotAssigned => GateCheck::AlreadyAssigned,
        }
    }
}

/// Environment facts the checks read: loaded once per run.
#[derive(Debug, Clone)]
pub struct GateContext {
    clusters: HashMap<String, DeploymentCluster>,
    segment_server_assets: HashSet<String>,
    expected_method: MonitoringMethod,
}

impl GateContext {
    pub fn new(
        clusters: Vec<DeploymentCluster>,
        segment_server_assets: impl IntoIterator<Item = String>,
        expected_method: MonitoringMethod,
    ) -> Self {
        Self {
            clusters: clusters.into_iter().map(|c| (c.id.clone(), c)).collect(),
            segment_server_assets: segment_server_assets.into_iter().collect(),
            expected_method,
        }
    }

    /// Fetch clusters and segment servers from the API.
    pub async fn load(
        client: &ZnClient,
        expected_method: MonitoringMethod,
    ) -> Result<Self, CoreError> {
        let clusters = client.list_deployment_clusters().await?;
        let servers = client.list_segment_servers().await?;
        debug!(
            clusters = clusters.len(),
            segment_servers = servers.len(),
            "gate context loaded"
        );
        Ok(Self::new(
            clusters,
            servers.into_iter().filter_map(|s| s.asset_id),
            expected_method,
        ))
    }

    pub fn expected_method(&self) -> MonitoringMethod {
        self.expected_method
    }

    pub fn is_segment_server(&self, asset_id: &str) -> bool {
        self.segment_server_assets.contains(asset_id)
    }

    pub fn cluster(&self, id: &str) -> Option<&DeploymentCluster> {
        self.clusters.get(id)
    }

    /// Resolve a cluster by id, or by case-insensitive name.
    pub fn find_cluster(&self, id_or_name: &str) -> Option<&DeploymentCluster> {
        let needle = id_or_name.trim();
        self.clusters.get(needle).or_else(|| {
            self.clusters
                .values()
                .find(|c| c.name.eq_ignore_ascii_case(needle))
        })
    }

    pub fn clusters(&self) -> impl Iterator<Item = &DeploymentCluster> {
        self.clusters.values()
    }

    fn cluster_label(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => self
                .clusters
                .get(id)
                .map_or_else(|| id.to_owned(), |c| c.name.clone()),
            None => "unknown".to_owned(),
        }
    }
}

/// Run every check for `op` against `asset`, stopping at the first failure.
pub fn evaluate(asset: &Asset, op: GateOp, ctx: &GateContext) -> Result<(), GateFailure> {
    for check in GateCheck::sequence(op) {
        check.run(asset, ctx)?;
    }
    Ok(())
}
