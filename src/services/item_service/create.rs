use super::{ItemService, ItemSubmission, ItemWriteOutcome, UploadedFile};
use super::{item_groups_rows, no_group_admitted, quota_message, write_error};
use crate::api::error::AppError;
use crate::entities::{items, prelude::*, users};
use crate::services::audit::{self, AuditEventType};
use crate::services::membership::MembershipService;
use crate::services::quota;
use crate::services::storage::{StoredObject, spawn_delete};
use crate::utils::validation::{collect_messages, size_in_mb};
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use validator::Validate;

impl ItemService {
    /// Stores the payload, then admits the item against the creator's MB
    /// quota (admins upload uncharged) and each selected group's item quota. Any rejection after the
    /// payload was stored schedules its deletion.
    pub async fn create_item(
        &self,
        actor: &users::Model,
        submission: ItemSubmission,
    ) -> Result<ItemWriteOutcome, AppError> {
        let ItemSubmission {
            details,
            group_ids,
            file,
        } = submission;

        let file = file.ok_or_else(|| AppError::Validation("Please select a file.".to_string()))?;
        self.ensure_within_item_limit(&file).await?;
        details
            .validate()
            .map_err(|e| AppError::Validation(collect_messages(&e)))?;

        let stored = self
            .store
            .put(file.data.clone(), &file.content_type, &file.file_name)
            .await
            .map_err(|e| AppError::Internal(e.context("Failed to store item payload")))?;

        match self
            .admit_new_item(actor, &details.name, &details.description, &group_ids, &file, &stored)
            .await
        {
            Ok(outcome) => {
                audit::record(
                    AuditEventType::ItemCreate,
                    Some(&actor.id),
                    Some(&outcome.item.id),
                    if outcome.is_partial() { "partial" } else { "success" },
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::info!("Item '{}' rejected: {}", details.name, e);
                spawn_delete(self.store.clone(), stored.key);
                Err(e)
            }
        }
    }

    async fn admit_new_item(
        &self,
        actor: &users::Model,
        name: &str,
        description: &str,
        group_ids: &[String],
        file: &UploadedFile,
        stored: &StoredObject,
    ) -> Result<ItemWriteOutcome, AppError> {
        let size = size_in_mb(file.data.len() as u64);
        let requested: Vec<String> = MembershipService::resolve_selection(&self.db, group_ids)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();

        let txn = self.db.begin().await?;

        let owner = Users::find_by_id(&actor.id)
            .one(&txn)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        let charged_mb = if owner.is_admin { 0 } else { size };
        if charged_mb > 0 && !quota::reserve_user_usage(&txn, &owner.id, charged_mb).await? {
            return Err(quota_message(&owner.username, owner.user_limit));
        }

        let placement = quota::place_in_groups(&txn, &requested).await?;
        if placement.admitted.is_empty() {
            return Err(no_group_admitted());
        }

        let now = chrono::Utc::now();
        let item = items::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            object_key: Set(stored.key.clone()),
            url: Set(stored.url.clone()),
            mime_type: Set(file.content_type.clone()),
            file_name: Set(file.file_name.clone()),
            size: Set(size),
            charged_mb: Set(charged_mb),
            creator_id: Set(owner.id.clone()),
            creator_username: Set(owner.username.clone()),
            created_at: Set(now),
            last_access: Set(Some(now)),
        }
        .insert(&txn)
        .await
        .map_err(|e| write_error(e, name))?;

        ItemGroups::insert_many(item_groups_rows(&item, &placement.admitted))
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;

        if placement.is_partial() {
            tracing::warn!(
                "Item {} placed in {} of {} groups",
                item.id,
                placement.admitted.len(),
                requested.len()
            );
        }

        Ok(ItemWriteOutcome {
            item,
            skipped_groups: placement.full,
        })
    }
}
