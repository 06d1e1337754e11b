use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::entities::{item_groups, items};
use crate::services::settings::AdminSettingsService;
use crate::services::storage::ObjectStore;
use sea_orm::{DatabaseConnection, DbErr, Set, SqlErr};
use std::sync::Arc;

pub mod create;
pub mod delete;
pub mod read;
pub mod types;
pub mod update;

pub use types::{ItemDetails, ItemSubmission, ItemView, ItemWriteOutcome, UploadedFile};

pub struct ItemService {
    db: DatabaseConnection,
    store: Arc<dyn ObjectStore>,
    config: AppConfig,
}

impl ItemService {
    pub fn new(db: DatabaseConnection, store: Arc<dyn ObjectStore>, config: AppConfig) -> Self {
        Self { db, store, config }
    }

    /// Current per-item ceiling in MB.
    pub async fn item_size_limit_mb(&self) -> Result<i32, AppError> {
        let settings =
            AdminSettingsService::load(&self.db, self.config.default_item_size_limit_mb).await?;
        Ok(settings.item_size_limit_mb)
    }

    async fn ensure_within_item_limit(&self, file: &UploadedFile) -> Result<(), AppError> {
        let limit_mb = self.item_size_limit_mb().await?;
        if file.data.len() as u64 > limit_mb as u64 * 1024 * 1024 {
            return Err(too_large(limit_mb));
        }
        Ok(())
    }
}

pub fn too_large(limit_mb: i32) -> AppError {
    AppError::Validation(format!(
        "File Size Too Large. Current Item Size Limit is {} MB.",
        limit_mb
    ))
}

fn quota_message(username: &str, user_limit: i32) -> AppError {
    AppError::QuotaExceeded(format!(
        "Cannot upload this item as total storage for {} is exceeding user limit of {} MB.",
        username, user_limit
    ))
}

fn no_group_admitted() -> AppError {
    AppError::QuotaExceeded("Group Limits exceeded for all selected groups.".to_string())
}

fn write_error(e: DbErr, name: &str) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Validation(format!("An item named '{}' already exists.", name))
        }
        _ => AppError::Store(e),
    }
}

fn item_groups_rows(item: &items::Model, group_ids: &[String]) -> Vec<item_groups::ActiveModel> {
    group_ids
        .iter()
        .map(|group_id| item_groups::ActiveModel {
            item_id: Set(item.id.clone()),
            group_id: Set(group_id.clone()),
        })
        .collect()
}
