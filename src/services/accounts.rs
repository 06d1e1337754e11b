use crate::api::error::AppError;
use crate::config::{
    AppConfig, DEFAULT_USER_LIMIT_MB, MAX_USER_LIMIT_MB, MIN_USER_LIMIT_MB,
};
use crate::entities::{prelude::*, sessions, users};
use crate::services::audit::{self, AuditEventType};
use crate::services::membership::MembershipService;
use crate::utils::auth::{create_session_token, hash_password, validate_session_token, verify_password};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

/// Already-validated registration input.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub actual_name: String,
    pub username: String,
    pub password: String,
    pub group_ids: Vec<String>,
}

/// Admin edit of another account.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub is_active: bool,
    pub is_admin: bool,
    pub user_limit: i32,
    pub group_ids: Vec<String>,
}

/// A freshly opened session and the signed token naming it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: sessions::Model,
    pub token: String,
}

pub struct AccountService;

impl AccountService {
    /// Creates an inactive account with the default user limit, enrolled in
    /// the selected groups plus the default group.
    pub async fn register(db: &DatabaseConnection, input: NewAccount) -> Result<users::Model, AppError> {
        let taken = Users::find()
            .filter(users::Column::Username.eq(&input.username))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(AppError::Validation(
                "A user with the given username is already registered".to_string(),
            ));
        }

        let groups = MembershipService::resolve_selection(db, &input.group_ids).await?;
        let password_hash = hash_password(&input.password)?;

        let txn = db.begin().await?;
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(input.username),
            actual_name: Set(input.actual_name),
            password_hash: Set(password_hash),
            is_admin: Set(false),
            is_active: Set(false),
            user_limit: Set(DEFAULT_USER_LIMIT_MB),
            current_usage: Set(0),
            created_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => AppError::Validation(
                "A user with the given username is already registered".to_string(),
            ),
            _ => AppError::Store(e),
        })?;

        let group_ids: Vec<String> = groups.into_iter().map(|g| g.id).collect();
        MembershipService::replace_memberships(&txn, &user.id, &group_ids).await?;
        txn.commit().await?;

        audit::record(AuditEventType::UserRegister, Some(&user.id), None, "success");
        Ok(user)
    }

    /// `None` when the username is unknown or the password does not match.
    pub async fn authenticate(
        db: &DatabaseConnection,
        username: &str,
        password: &str,
    ) -> Result<Option<users::Model>, AppError> {
        let Some(user) = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(db)
            .await?
        else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn open_session(
        db: &DatabaseConnection,
        config: &AppConfig,
        user: &users::Model,
    ) -> Result<IssuedSession, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(config.session_ttl_minutes);
        let session = sessions::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user.id.clone()),
            created_at: Set(now),
            expires_at: Set(expires_at),
        }
        .insert(db)
        .await?;

        let token = create_session_token(&user.id, &session.id, expires_at, &config.session_secret)?;
        audit::record(AuditEventType::UserLogin, Some(&user.id), Some(&session.id), "success");
        Ok(IssuedSession { session, token })
    }

    /// The user behind a session token, if the token verifies and its
    /// session row is still open.
    pub async fn resolve_session(
        db: &DatabaseConnection,
        config: &AppConfig,
        token: &str,
    ) -> Result<Option<(sessions::Model, users::Model)>, AppError> {
        let Ok(claims) = validate_session_token(token, &config.session_secret) else {
            return Ok(None);
        };

        let Some(session) = Sessions::find_by_id(&claims.jti).one(db).await? else {
            return Ok(None);
        };
        if session.user_id != claims.sub || session.expires_at <= Utc::now() {
            return Ok(None);
        }

        let user = Users::find_by_id(&session.user_id).one(db).await?;
        Ok(user.map(|user| (session, user)))
    }

    pub async fn close_session(db: &DatabaseConnection, session_id: &str) -> Result<(), AppError> {
        Sessions::delete_by_id(session_id).exec(db).await?;
        audit::record(AuditEventType::UserLogout, None, Some(session_id), "success");
        Ok(())
    }

    /// Removes expired session rows. Returns how many were deleted.
    pub async fn purge_expired_sessions(db: &DatabaseConnection) -> Result<u64, AppError> {
        let result = Sessions::delete_many()
            .filter(sessions::Column::ExpiresAt.lte(Utc::now()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Applies an admin's edit to `user_id`. Group selection is validated
    /// like at registration and always keeps the default group.
    pub async fn update_by_admin(
        db: &DatabaseConnection,
        user_id: &str,
        update: AccountUpdate,
        admin_id: &str,
    ) -> Result<users::Model, AppError> {
        if !(MIN_USER_LIMIT_MB..=MAX_USER_LIMIT_MB).contains(&update.user_limit) {
            return Err(AppError::Validation(
                "Incorrect user storage size limits.".to_string(),
            ));
        }

        let user = Users::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("No such User Exists!".to_string()))?;
        let groups = MembershipService::resolve_selection(db, &update.group_ids).await?;

        let txn = db.begin().await?;
        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(update.is_active);
        active.is_admin = Set(update.is_admin);
        active.user_limit = Set(update.user_limit);
        let user = active.update(&txn).await?;

        let group_ids: Vec<String> = groups.into_iter().map(|g| g.id).collect();
        MembershipService::replace_memberships(&txn, &user.id, &group_ids).await?;
        if user.is_admin {
            MembershipService::sync_admin_groups(&txn).await?;
        }
        txn.commit().await?;

        audit::record(AuditEventType::UserUpdate, Some(admin_id), Some(&user.id), "success");
        Ok(user)
    }
}
