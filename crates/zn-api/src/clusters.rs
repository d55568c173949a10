// Deployment cluster endpoints

use tracing::debug;

use crate::client::ZnClient;
use crate::error::Error;
use crate::pagination::PageStrategy;
use crate::query::Query;
use crate::types::DeploymentCluster;

impl ZnClient {
    /// List every deployment cluster.
    ///
    /// `GET /environments/clusters`
    pub async fn list_deployment_clusters(&self) -> Result<Vec<DeploymentCluster>, Error> {
        debug!("listing deployment clusters");
        self.fetch_all("environments/clusters", &Query::new(), &PageStrategy::default())
            .await
    }
}
