use crate::config::{AppConfig, DEFAULT_GROUP_LIMIT, DEFAULT_GROUP_NAME, MAX_USER_LIMIT_MB};
use crate::entities::{admin_settings, groups, prelude::*, users};
use crate::services::membership::MembershipService;
use crate::services::settings::SETTINGS_ROW_ID;
use crate::utils::auth::hash_password;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

/// Idempotent startup data: the default group, the settings row and, when
/// configured, a bootstrap admin account.
pub async fn seed_initial_data(db: &DatabaseConnection, config: &AppConfig) -> anyhow::Result<()> {
    info!("🌱 Seeding initial data...");

    let default_group = Groups::find()
        .filter(groups::Column::GroupName.eq(DEFAULT_GROUP_NAME))
        .one(db)
        .await?;
    if default_group.is_none() {
        groups::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            group_name: Set(DEFAULT_GROUP_NAME.to_string()),
            is_active: Set(true),
            group_limit: Set(DEFAULT_GROUP_LIMIT),
            current_usage: Set(0),
            created_at: Set(Some(chrono::Utc::now())),
        }
        .insert(db)
        .await?;
        info!("   - Created group '{}'", DEFAULT_GROUP_NAME);
    }

    if AdminSettings::find_by_id(SETTINGS_ROW_ID).one(db).await?.is_none() {
        admin_settings::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            item_size_limit_mb: Set(config.default_item_size_limit_mb),
            updated_at: Set(None),
            updated_by: Set(None),
        }
        .insert(db)
        .await?;
        info!(
            "   - Item size limit initialised to {} MB",
            config.default_item_size_limit_mb
        );
    }

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        seed_admin(db, username, password).await?;
    }

    info!("✅ Seeding complete");
    Ok(())
}

async fn seed_admin(db: &DatabaseConnection, username: &str, password: &str) -> anyhow::Result<()> {
    let existing = Users::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?;

    match existing {
        Some(user) if user.is_admin && user.is_active => {}
        Some(user) => {
            let mut active: users::ActiveModel = user.into();
            active.is_admin = Set(true);
            active.is_active = Set(true);
            active.update(db).await?;
            info!("   - Promoted '{}' to admin", username);
        }
        None => {
            users::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                username: Set(username.to_string()),
                actual_name: Set("Administrator".to_string()),
                password_hash: Set(hash_password(password)?),
                is_admin: Set(true),
                is_active: Set(true),
                user_limit: Set(MAX_USER_LIMIT_MB),
                current_usage: Set(0),
                created_at: Set(Some(chrono::Utc::now())),
            }
            .insert(db)
            .await?;
            info!("   - Created admin '{}'", username);
        }
    }

    MembershipService::sync_admin_groups(db).await?;
    Ok(())
}
