// Custom group endpoints

use serde::de::IgnoredAny;
use tracing::{debug, info};

use crate::client::ZnClient;
use crate::error::Error;
use crate::pagination::PageStrategy;
use crate::query::Query;
use crate::types::{
    Asset, CreatedEntity, CustomGroup, CustomGroupCreate, EntityEnvelope, MembersChange,
};

/// Result of a create-if-not-exists call.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    pub entity: T,
    /// `false` when the entity already existed.
    pub created: bool,
}

impl ZnClient {
    /// List custom groups.
    ///
    /// `GET /groups/custom`
    pub async fn list_custom_groups(
        &self,
        query: &Query,
        strategy: &PageStrategy,
    ) -> Result<Vec<CustomGroup>, Error> {
        self.fetch_all("groups/custom", query, strategy).await
    }

    /// `GET /groups/custom/{id}`
    pub async fn get_custom_group(&self, group_id: &str) -> Result<CustomGroup, Error> {
        let env: EntityEnvelope<CustomGroup> =
            self.get(&self.segment_path(&["groups", "custom", group_id])?).await?;
        Ok(env.entity)
    }

    /// Find a custom group by exact name.
    ///
    /// `GET /groups/custom?_search={name}`
    pub async fn find_custom_group(&self, name: &str) -> Result<Option<CustomGroup>, Error> {
        let groups = self
            .list_custom_groups(&Query::new().with("_search", name), &PageStrategy::default())
            .await?;
        Ok(groups.into_iter().find(|g| g.name == name))
    }

    /// Create a custom group, or return the existing one on 409.
    ///
    /// `POST /groups/custom` with `{"name", "description", "membersIds": []}`
    pub async fn create_custom_group(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Upserted<CustomGroup>, Error> {
        let body = CustomGroupCreate {
            name,
            description,
            members_ids: &[],
        };
        match self.post::<CreatedEntity, _>("groups/custom", &body).await {
            Ok(created) => {
                info!(group = %created.id, name, "custom group created");
                let entity = self.get_custom_group(&created.id).await?;
                Ok(Upserted {
                    entity,
                    created: true,
                })
            }
            Err(e) if e.is_conflict() => {
                debug!(name, "custom group already exists, fetching");
                match self.find_custom_group(name).await? {
                    Some(entity) => Ok(Upserted {
                        entity,
                        created: false,
                    }),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Add members to a custom group. Existing members are kept.
    ///
    /// `POST /groups/custom/{id}/members` with `{"membersIds": [...]}`
    pub async fn add_group_members(&self, group_id: &str, member_ids: &[String]) -> Result<(), Error> {
        debug!(group = group_id, count = member_ids.len(), "adding group members");
        let _: IgnoredAny = self
            .post(
                &self.segment_path(&["groups", "custom", group_id, "members"])?,
                &MembersChange {
                    members_ids: member_ids,
                },
            )
            .await?;
        Ok(())
    }

    /// Remove members from a custom group.
    ///
    /// `DELETE /groups/custom/{id}/members` with `{"membersIds": [...]}`
    pub async fn remove_group_members(
        &self,
        group_id: &str,
        member_ids: &[String],
    ) -> Result<(), Error> {
        debug!(group = group_id, count = member_ids.len(), "removing group members");
        let _: IgnoredAny = self
            .delete_with_body(
                &self.segment_path(&["groups", "custom", group_id, "members"])?,
                &MembersChange {
                    members_ids: member_ids,
                },
            )
            .await?;
        Ok(())
    }

    /// List the member assets of a custom group.
    ///
    /// `GET /groups/custom/{id}/members`
    pub async fn list_group_members(&self, group_id: &str) -> Result<Vec<Asset>, Error> {
        self.fetch_all(
            &self.segment_path(&["groups", "custom", group_id, "members"])?,
            &Query::new(),
            &PageStrategy::default(),
        )
        .await
    }
}
