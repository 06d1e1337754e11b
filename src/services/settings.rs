use crate::api::error::AppError;
use crate::config::{MAX_ITEM_SIZE_LIMIT_MB, MIN_ITEM_SIZE_LIMIT_MB};
use crate::entities::{admin_settings, prelude::*};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, Set};

pub const SETTINGS_ROW_ID: i32 = 1;

pub struct AdminSettingsService;

impl AdminSettingsService {
    /// Current settings. Read on every request so a change applies to the
    /// next upload without a restart.
    pub async fn load<C: ConnectionTrait>(
        conn: &C,
        fallback_item_size_limit_mb: i32,
    ) -> Result<admin_settings::Model, DbErr> {
        if let Some(settings) = AdminSettings::find_by_id(SETTINGS_ROW_ID).one(conn).await? {
            return Ok(settings);
        }

        admin_settings::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            item_size_limit_mb: Set(fallback_item_size_limit_mb),
            updated_at: Set(None),
            updated_by: Set(None),
        }
        .insert(conn)
        .await
    }

    pub async fn set_item_size_limit<C: ConnectionTrait>(
        conn: &C,
        item_size_limit_mb: i32,
        admin_username: &str,
        fallback_item_size_limit_mb: i32,
    ) -> Result<admin_settings::Model, AppError> {
        if !(MIN_ITEM_SIZE_LIMIT_MB..=MAX_ITEM_SIZE_LIMIT_MB).contains(&item_size_limit_mb) {
            return Err(AppError::Validation(
                "Incorrect item file size limits.".to_string(),
            ));
        }

        let current = Self::load(conn, fallback_item_size_limit_mb).await?;
        let mut active: admin_settings::ActiveModel = current.into();
        active.item_size_limit_mb = Set(item_size_limit_mb);
        active.updated_at = Set(Some(chrono::Utc::now()));
        active.updated_by = Set(Some(admin_username.to_string()));
        let updated = active.update(conn).await?;

        tracing::info!(
            "⚙️  Item size limit set to {} MB by {}",
            item_size_limit_mb,
            admin_username
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connect_in_memory;

    #[tokio::test]
    async fn test_load_creates_row_once() {
        let db = connect_in_memory().await.unwrap();

        let first = AdminSettingsService::load(&db, 3).await.unwrap();
        assert_eq!(first.item_size_limit_mb, 3);
        let second = AdminSettingsService::load(&db, 7).await.unwrap();
        assert_eq!(second.item_size_limit_mb, 3);
    }

    #[tokio::test]
    async fn test_limit_bounds() {
        let db = connect_in_memory().await.unwrap();

        for bad in [0, 11, -1] {
            let err = AdminSettingsService::set_item_size_limit(&db, bad, "root", 3)
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Incorrect item file size limits.");
        }

        let updated = AdminSettingsService::set_item_size_limit(&db, 10, "root", 3)
            .await
            .unwrap();
        assert_eq!(updated.item_size_limit_mb, 10);
        assert_eq!(updated.updated_by.as_deref(), Some("root"));
    }
}
