// Network activity endpoints

use tracing::{debug, info};

use crate::client::ZnClient;
use crate::error::Error;
use crate::filters::{NetworkFilterCatalog, NetworkFiltersResponse};
use crate::pagination::PageStrategy;
use crate::query::Query;
use crate::types::NetworkActivity;

const ACTIVITIES_PATH: &str = "activities/network";

impl ZnClient {
    /// Collect every network activity matching `query`.
    ///
    /// `GET /activities/network` (cursor pagination on `scrollCursor`)
    pub async fn list_network_activities(
        &self,
        query: &Query,
        page_size: usize,
    ) -> Result<Vec<NetworkActivity>, Error> {
        let activities: Vec<NetworkActivity> = self
            .fetch_all(ACTIVITIES_PATH, query, &PageStrategy::cursor(page_size))
            .await?;
        info!(count = activities.len(), "retrieved network activities");
        Ok(activities)
    }

    /// Fetch the activity filter catalog.
    ///
    /// `GET /activities/network/filters`
    pub async fn network_filters(&self) -> Result<NetworkFilterCatalog, Error> {
        let resp: NetworkFiltersResponse = self.get("activities/network/filters").await?;
        if resp.filters.is_empty() {
            return Err(Error::Filter("server returned no network filters".into()));
        }
        debug!(count = resp.filters.len(), "network filters loaded");
        Ok(NetworkFilterCatalog::from_filters(resp.filters))
    }
}
