use crate::AppState;
use crate::api::error::AppError;
use crate::api::flash::{self, Page};
use crate::entities::{groups, prelude::*, users};
use crate::services::membership::MembershipService;
use axum::extract::{Path, State};
use axum_extra::extract::CookieJar;
use sea_orm::EntityTrait;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UserProfileView {
    #[schema(value_type = Object)]
    pub user: users::Model,
    /// MB still available before the user limit is reached
    pub remaining_mb: i32,
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Quota, usage and groups of the logged-in user", body = UserProfileView),
        (status = 303, description = "Not the logged-in user")
    ),
    tag = "users"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Page<UserProfileView>, AppError> {
    let user = Users::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No such User Exists!".to_string()))?;
    let groups = MembershipService::groups_of(&state.db, &user).await?;

    Ok(Page::new(
        "users/show",
        flash::take(&jar),
        UserProfileView {
            remaining_mb: (user.user_limit - user.current_usage).max(0),
            user,
            groups,
        },
    ))
}
