// Asset endpoints

use serde::de::IgnoredAny;
use tracing::debug;

use crate::client::ZnClient;
use crate::error::Error;
use crate::pagination::PageStrategy;
use crate::query::Query;
use crate::types::{Asset, ClusterAssignment, EntityEnvelope, SegmentServer};

impl ZnClient {
    /// List assets matching `query` (`_filters`, `_search`, ...).
    ///
    /// `GET /assets`
    pub async fn list_assets(
        &self,
        query: &Query,
        strategy: &PageStrategy,
    ) -> Result<Vec<Asset>, Error> {
        debug!("listing assets");
        self.fetch_all("assets", query, strategy).await
    }

    /// Fetch a single asset.
    ///
    /// `GET /assets/{id}` (wrapped in `{"entity": ...}`)
    pub async fn get_asset(&self, asset_id: &str) -> Result<Asset, Error> {
        let env: EntityEnvelope<Asset> =
            self.get(&self.segment_path(&["assets", asset_id])?).await?;
        Ok(env.entity)
    }

    /// List every segment server.
    ///
    /// `GET /environments/segment-servers`
    pub async fn list_segment_servers(&self) -> Result<Vec<SegmentServer>, Error> {
        self.fetch_all(
            "environments/segment-servers",
            &Query::new(),
            &PageStrategy::default(),
        )
        .await
    }

    /// Pin an asset to a deployment cluster.
    ///
    /// `PUT /assets/{id}/deployments-cluster` with `{"deploymentsClusterId": ...}`
    pub async fn pin_asset(&self, asset_id: &str, cluster_id: &str) -> Result<(), Error> {
        debug!(asset = asset_id, cluster = cluster_id, "pinning asset");
        let _: IgnoredAny = self
            .put(
                &self.segment_path(&["assets", asset_id, "deployments-cluster"])?,
                &ClusterAssignment {
                    deployments_cluster_id: cluster_id,
                },
            )
            .await?;
        Ok(())
    }

    /// Return an asset to automatic cluster assignment.
    ///
    /// `DELETE /assets/{id}/deployments-cluster`
    pub async fn unpin_asset(&self, asset_id: &str) -> Result<(), Error> {
        debug!(asset = asset_id, "unpinning asset");
        let _: IgnoredAny = self
            .delete(&self.segment_path(&["assets", asset_id, "deployments-cluster"])?)
            .await?;
        Ok(())
    }
}
