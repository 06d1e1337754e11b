use super::{ItemService, ItemView};
use crate::api::error::AppError;
use crate::entities::{groups, items, prelude::*};
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, QueryOrder, Set};

impl ItemService {
    /// Every item with the groups it belongs to, newest first.
    pub async fn list_items(&self) -> Result<Vec<ItemView>, AppError> {
        let rows = Items::find()
            .order_by_desc(items::Column::CreatedAt)
            .find_with_related(Groups)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(item, groups)| ItemView { item, groups })
            .collect())
    }

    /// Loads an item and stamps its last access time.
    pub async fn show_item(&self, item_id: &str) -> Result<ItemView, AppError> {
        let item = self.find_item(item_id).await?;

        let mut active: items::ActiveModel = item.into();
        active.last_access = Set(Some(chrono::Utc::now()));
        let item = active.update(&self.db).await?;

        let groups = item
            .find_related(Groups)
            .order_by_asc(groups::Column::GroupName)
            .all(&self.db)
            .await?;
        Ok(ItemView { item, groups })
    }

    pub async fn find_item(&self, item_id: &str) -> Result<items::Model, AppError> {
        Items::find_by_id(item_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    /// Items placed in `group`, newest first.
    pub async fn items_in_group(&self, group: &groups::Model) -> Result<Vec<items::Model>, AppError> {
        Ok(group
            .find_related(Items)
            .order_by_desc(items::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}
