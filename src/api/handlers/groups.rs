use crate::AppState;
use crate::api::error::{AppError, OrRedirect};
use crate::api::flash::{self, FlashRedirect, Page};
use crate::api::middleware::auth::CurrentUser;
use crate::config::DEFAULT_GROUP_LIMIT;
use crate::entities::{groups, items, prelude::*};
use crate::services::audit::{self, AuditEventType};
use crate::services::membership::MembershipService;
use crate::utils::validation::{collect_messages, strip_markup};
use axum::{
    Extension,
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::{CookieJar, Form};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set, SqlErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct GroupForm {
    #[validate(length(min = 1, max = 68, message = "Group name should be 1-68 characters"))]
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct GroupIndexView {
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
    /// Whether any item exists at all
    pub has_items: bool,
}

#[derive(Serialize, ToSchema)]
pub struct GroupShowView {
    #[schema(value_type = Object)]
    pub group: groups::Model,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<items::Model>,
}

#[utoipa::path(
    get,
    path = "/groups",
    responses((status = 200, description = "Group catalog", body = GroupIndexView)),
    tag = "groups"
)]
pub async fn list_groups(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Page<GroupIndexView>, Response> {
    let groups = Groups::find()
        .order_by_asc(groups::Column::GroupName)
        .all(&state.db)
        .await
        .map_err(AppError::from)
        .or_redirect("/home")?;
    let has_items = Items::find()
        .count(&state.db)
        .await
        .map_err(AppError::from)
        .or_redirect("/home")?
        > 0;

    Ok(Page::new(
        "groups/index",
        flash::take(&jar),
        GroupIndexView { groups, has_items },
    ))
}

pub async fn new_group(jar: CookieJar) -> Page<()> {
    Page::new("groups/new", flash::take(&jar), ())
}

#[utoipa::path(
    post,
    path = "/groups",
    request_body(content = GroupForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /groups")),
    tag = "groups"
)]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<GroupForm>,
) -> Result<FlashRedirect, Response> {
    let form = GroupForm {
        name: strip_markup(&form.name),
    };
    form.validate()
        .map_err(|e| AppError::Validation(collect_messages(&e)))
        .or_redirect("/groups/new")?;

    let group = groups::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        group_name: Set(form.name.clone()),
        is_active: Set(user.is_admin),
        group_limit: Set(DEFAULT_GROUP_LIMIT),
        current_usage: Set(0),
        created_at: Set(Some(chrono::Utc::now())),
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Validation(format!("A group named '{}' already exists.", form.name))
        }
        _ => AppError::Store(e),
    })
    .or_redirect("/groups/new")?;

    if user.is_admin {
        MembershipService::sync_admin_groups(&state.db)
            .await
            .map_err(AppError::from)
            .or_redirect("/groups")?;
    }

    audit::record(AuditEventType::GroupCreate, Some(&user.id), Some(&group.id), "success");
    let message = if group.is_active {
        "Group successfully added."
    } else {
        "Group successfully added. Please wait for an admin to accept the group."
    };
    Ok(FlashRedirect::success("/groups", message))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "The group and the items placed in it", body = GroupShowView),
        (status = 303, description = "Group not found")
    ),
    tag = "groups"
)]
pub async fn show_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Page<GroupShowView>, Response> {
    let group = Groups::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(AppError::from)
        .and_then(|g| g.ok_or_else(|| AppError::NotFound("Group not found".to_string())))
        .or_redirect("/groups")?;
    let items = state.items.items_in_group(&group).await.or_redirect("/groups")?;

    Ok(Page::new(
        "groups/show",
        flash::take(&jar),
        GroupShowView { group, items },
    ))
}
