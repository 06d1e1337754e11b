use crate::AppState;
use crate::api::error::{AppError, OrRedirect};
use crate::api::flash::{self, FlashRedirect, Page};
use crate::api::middleware::auth::CurrentUser;
use crate::config::MIN_GROUP_LIMIT;
use crate::entities::{admin_settings, groups, prelude::*, users};
use crate::services::accounts::{AccountService, AccountUpdate};
use crate::services::audit::{self, AuditEventType};
use crate::services::membership::MembershipService;
use crate::services::settings::AdminSettingsService;
use axum::{
    Extension,
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::{CookieJar, Form};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Checkbox convention of the admin forms.
fn checked(value: &Option<String>) -> bool {
    value.as_deref() == Some("yes")
}

fn parse_size(raw: &str, message: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(message.to_string()))
}

#[derive(Deserialize, ToSchema)]
pub struct ItemSizeForm {
    /// New global item ceiling in MB (1-10)
    pub item_size: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminUserForm {
    pub is_active: Option<String>,
    pub is_admin: Option<String>,
    /// User storage ceiling in MB (5-25)
    pub item_size: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminGroupForm {
    pub is_active: Option<String>,
    /// Group item ceiling (at least 10)
    pub item_size: String,
}

#[derive(Serialize, ToSchema)]
pub struct AdminDashboardView {
    #[schema(value_type = Vec<Object>)]
    pub users: Vec<users::Model>,
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
    #[schema(value_type = Object)]
    pub settings: admin_settings::Model,
}

#[derive(Serialize, ToSchema)]
pub struct AdminUserView {
    #[schema(value_type = Object)]
    pub user: users::Model,
    pub member_of: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminGroupView {
    #[schema(value_type = Object)]
    pub group: groups::Model,
}

async fn all_groups(state: &AppState) -> Result<Vec<groups::Model>, AppError> {
    Ok(Groups::find()
        .order_by_asc(groups::Column::GroupName)
        .all(&state.db)
        .await?)
}

#[utoipa::path(
    get,
    path = "/admin",
    responses((status = 200, description = "Users, groups and settings", body = AdminDashboardView)),
    tag = "admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Page<AdminDashboardView>, AppError> {
    let users = Users::find()
        .order_by_asc(users::Column::Username)
        .all(&state.db)
        .await?;
    let groups = all_groups(&state).await?;
    let settings =
        AdminSettingsService::load(&state.db, state.config.default_item_size_limit_mb).await?;

    Ok(Page::new(
        "admin/index",
        flash::take(&jar),
        AdminDashboardView {
            users,
            groups,
            settings,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/admin",
    request_body(content = ItemSizeForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /admin")),
    tag = "admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Form(form): Form<ItemSizeForm>,
) -> Result<FlashRedirect, Response> {
    let size = parse_size(&form.item_size, "Incorrect item file size limits.")
        .or_redirect("/admin")?;
    let settings = AdminSettingsService::set_item_size_limit(
        &state.db,
        size,
        &admin.username,
        state.config.default_item_size_limit_mb,
    )
    .await
    .or_redirect("/admin")?;

    audit::record(AuditEventType::SettingsUpdate, Some(&admin.id), None, "success");
    Ok(FlashRedirect::success(
        "/admin",
        format!(
            "Item Size Limit successfully changed to {} MB.",
            settings.item_size_limit_mb
        ),
    ))
}

pub async fn show_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Page<AdminUserView>, Response> {
    let user = Users::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(AppError::from)
        .and_then(|u| u.ok_or_else(|| AppError::NotFound("No such User Exists!".to_string())))
        .or_redirect("/admin")?;
    let member_of = MembershipService::groups_of(&state.db, &user)
        .await
        .map_err(AppError::from)
        .or_redirect("/admin")?
        .into_iter()
        .map(|g| g.id)
        .collect();
    let groups = all_groups(&state).await.or_redirect("/admin")?;

    Ok(Page::new(
        "admin/show",
        flash::take(&jar),
        AdminUserView {
            user,
            member_of,
            groups,
        },
    ))
}

#[utoipa::path(
    put,
    path = "/admin/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body(content = AdminUserForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /admin")),
    tag = "admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Form(form): Form<AdminUserForm>,
) -> Result<FlashRedirect, Response> {
    let back = format!("/admin/{}", id);
    let user_limit = parse_size(&form.item_size, "Incorrect user storage size limits.")
        .or_redirect(&back)?;

    AccountService::update_by_admin(
        &state.db,
        &id,
        AccountUpdate {
            is_active: checked(&form.is_active),
            is_admin: checked(&form.is_admin),
            user_limit,
            group_ids: form.groups,
        },
        &admin.id,
    )
    .await
    .or_redirect(&back)?;

    Ok(FlashRedirect::success("/admin", "Updated User Details."))
}

pub async fn show_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Page<AdminGroupView>, Response> {
    let group = Groups::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(AppError::from)
        .and_then(|g| g.ok_or_else(|| AppError::NotFound("No such Group Exists!".to_string())))
        .or_redirect("/admin")?;

    Ok(Page::new("admin/group", flash::take(&jar), AdminGroupView { group }))
}

#[utoipa::path(
    put,
    path = "/admin/groups/{id}",
    params(("id" = String, Path, description = "Group id")),
    request_body(content = AdminGroupForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /admin")),
    tag = "admin"
)]
pub async fn update_group(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Form(form): Form<AdminGroupForm>,
) -> Result<FlashRedirect, Response> {
    let back = format!("/admin/groups/{}", id);
    let group_limit = parse_size(&form.item_size, "Incorrect group size limits.")
        .and_then(|limit| {
            if limit >= MIN_GROUP_LIMIT {
                Ok(limit)
            } else {
                Err(AppError::Validation("Incorrect group size limits.".to_string()))
            }
        })
        .or_redirect(&back)?;

    let group = Groups::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(AppError::from)
        .and_then(|g| g.ok_or_else(|| AppError::NotFound("No such Group Exists!".to_string())))
        .or_redirect("/admin")?;

    let mut active: groups::ActiveModel = group.into();
    active.is_active = Set(checked(&form.is_active));
    active.group_limit = Set(group_limit);
    let group = active
        .update(&state.db)
        .await
        .map_err(AppError::from)
        .or_redirect(&back)?;

    MembershipService::sync_admin_groups(&state.db)
        .await
        .map_err(AppError::from)
        .or_redirect("/admin")?;

    audit::record(AuditEventType::GroupUpdate, Some(&admin.id), Some(&group.id), "success");
    Ok(FlashRedirect::success("/admin", "Updated Group Details."))
}
