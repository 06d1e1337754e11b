use super::ItemService;
use crate::api::error::AppError;
use crate::entities::{item_groups, prelude::*, users};
use crate::services::audit::{self, AuditEventType};
use crate::services::quota;
use crate::services::storage::spawn_delete;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};

impl ItemService {
    /// Removes an item and returns its usage to every group it was in and
    /// whatever it was charged to its creator.
    pub async fn delete_item(&self, actor: &users::Model, item_id: &str) -> Result<(), AppError> {
        let txn = self.db.begin().await?;

        let item = Items::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

        let links = ItemGroups::find()
            .filter(item_groups::Column::ItemId.eq(&item.id))
            .all(&txn)
            .await?;
        for link in &links {
            quota::release_group_slot(&txn, &link.group_id).await?;
        }

        if item.charged_mb > 0 {
            quota::release_user_usage(&txn, &item.creator_id, item.charged_mb).await?;
        }

        ItemGroups::delete_many()
            .filter(item_groups::Column::ItemId.eq(&item.id))
            .exec(&txn)
            .await?;
        Items::delete_by_id(&item.id).exec(&txn).await?;

        txn.commit().await?;

        spawn_delete(self.store.clone(), item.object_key.clone());
        audit::record(AuditEventType::ItemDelete, Some(&actor.id), Some(&item.id), "success");
        tracing::info!("🗑️  Item {} deleted by {}", item.id, actor.username);
        Ok(())
    }
}
