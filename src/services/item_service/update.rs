use super::{ItemService, ItemSubmission, ItemWriteOutcome, UploadedFile};
use super::{item_groups_rows, no_group_admitted, quota_message, write_error};
use crate::api::error::AppError;
use crate::entities::{item_groups, items, prelude::*, users};
use crate::services::audit::{self, AuditEventType};
use crate::services::membership::MembershipService;
use crate::services::quota;
use crate::services::storage::{StoredObject, spawn_delete};
use crate::utils::validation::{collect_messages, size_in_mb};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use validator::Validate;

/// How the requested groups relate to the ones an item is already in.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct GroupDiff {
    pub kept: Vec<String>,
    pub added: Vec<String>,
    pub dropped: Vec<String>,
}

pub(super) fn diff_groups(current: &[String], requested: &[String]) -> GroupDiff {
    let mut diff = GroupDiff::default();
    for id in requested {
        if current.contains(id) {
            diff.kept.push(id.clone());
        } else {
            diff.added.push(id.clone());
        }
    }
    diff.dropped = current
        .iter()
        .filter(|id| !requested.contains(id))
        .cloned()
        .collect();
    diff
}

impl ItemService {
    /// Replaces an item's payload, details and groups. The previous payload
    /// is deleted only once the new state is committed.
    ///
    /// Admins editing any item are not charged against the creator's quota.
    pub async fn update_item(
        &self,
        actor: &users::Model,
        existing: &items::Model,
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
            .apply_update(actor, existing, &details.name, &details.description, &group_ids, &file, &stored)
            .await
        {
            Ok((outcome, previous_key)) => {
                spawn_delete(self.store.clone(), previous_key);
                audit::record(
                    AuditEventType::ItemUpdate,
                    Some(&actor.id),
                    Some(&outcome.item.id),
                    if outcome.is_partial() { "partial" } else { "success" },
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::info!("Update of item {} rejected: {}", existing.id, e);
                spawn_delete(self.store.clone(), stored.key);
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_update(
        &self,
        actor: &users::Model,
        existing: &items::Model,
        name: &str,
        description: &str,
        group_ids: &[String],
        file: &UploadedFile,
        stored: &StoredObject,
    ) -> Result<(ItemWriteOutcome, String), AppError> {
        let size = size_in_mb(file.data.len() as u64);
        let requested: Vec<String> = MembershipService::resolve_selection(&self.db, group_ids)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();

        let txn = self.db.begin().await?;

        let current = Items::find_by_id(&existing.id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

        // Admin edits leave the creator's charge as it was
        let charged_mb = if actor.is_admin {
            current.charged_mb
        } else {
            let owner = Users::find_by_id(&current.creator_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("No such User Exists!".to_string()))?;
            if !quota::reserve_user_usage(&txn, &owner.id, size - current.charged_mb).await? {
                return Err(quota_message(&owner.username, owner.user_limit));
            }
            size
        };

        let current_groups: Vec<String> = ItemGroups::find()
            .filter(item_groups::Column::ItemId.eq(&current.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|link| link.group_id)
            .collect();

        let diff = diff_groups(&current_groups, &requested);
        let placement = quota::place_in_groups(&txn, &diff.added).await?;

        let mut included = diff.kept.clone();
        included.extend(placement.admitted.iter().cloned());
        if included.is_empty() {
            return Err(no_group_admitted());
        }

        let previous_key = current.object_key.clone();
        let mut active: items::ActiveModel = current.into();
        active.name = Set(name.to_string());
        active.description = Set(description.to_string());
        active.object_key = Set(stored.key.clone());
        active.url = Set(stored.url.clone());
        active.mime_type = Set(file.content_type.clone());
        active.file_name = Set(file.file_name.clone());
        active.size = Set(size);
        active.charged_mb = Set(charged_mb);
        active.last_access = Set(Some(chrono::Utc::now()));
        let item = active.update(&txn).await.map_err(|e| write_error(e, name))?;

        for group_id in &diff.dropped {
            quota::release_group_slot(&txn, group_id).await?;
        }

        ItemGroups::delete_many()
            .filter(item_groups::Column::ItemId.eq(&item.id))
            .exec(&txn)
            .await?;
        ItemGroups::insert_many(item_groups_rows(&item, &included))
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;

        Ok((
            ItemWriteOutcome {
                item,
                skipped_groups: placement.full,
            },
            previous_key,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_groups() {
        let diff = diff_groups(&ids(&["a", "b"]), &ids(&["b", "c"]));
        assert_eq!(diff.kept, ids(&["b"]));
        assert_eq!(diff.added, ids(&["c"]));
        assert_eq!(diff.dropped, ids(&["a"]));
    }

    #[test]
    fn test_diff_groups_unchanged() {
        let diff = diff_groups(&ids(&["a"]), &ids(&["a"]));
        assert_eq!(diff.kept, ids(&["a"]));
        assert!(diff.added.is_empty());
        assert!(diff.dropped.is_empty());
    }
}
