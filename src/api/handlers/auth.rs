use crate::AppState;
use crate::api::error::{AppError, OrRedirect};
use crate::api::flash::{self, FlashRedirect, Page};
use crate::api::middleware::auth::{CurrentSession, SESSION_COOKIE};
use crate::entities::{groups, prelude::*};
use crate::services::accounts::{AccountService, NewAccount};
use crate::utils::validation::{collect_messages, password_strength, strip_markup, username_shape};
use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    CookieJar, Form,
    cookie::{Cookie, SameSite},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 2, max = 80, message = "Actual Name must be 2-80 characters long"))]
    pub actual_name: String,
    #[validate(
        length(min = 6, max = 16, message = "Username must be 6-16 characters long"),
        custom(function = "username_shape")
    )]
    pub username: String,
    #[validate(
        length(max = 20, message = "Password can be at most 20 characters long"),
        custom(function = "password_strength")
    )]
    pub password: String,
    pub conf_password: String,
    /// Group ids, repeated
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterView {
    /// Active groups a new account may ask to join
    #[schema(value_type = Vec<Object>)]
    pub groups: Vec<groups::Model>,
}

pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn session_removal() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

pub async fn landing(jar: CookieJar) -> Page<()> {
    Page::new("landing", flash::take(&jar), ())
}

pub async fn register_form(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Page<RegisterView>, AppError> {
    let groups = Groups::find()
        .filter(groups::Column::IsActive.eq(true))
        .order_by_asc(groups::Column::GroupName)
        .all(&state.db)
        .await?;
    Ok(Page::new("auth/register", flash::take(&jar), RegisterView { groups }))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /home on success, back to /register otherwise")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, Response> {
    if form.password != form.conf_password {
        return Err(FlashRedirect::error("/register", "Passwords do not match.").into_response());
    }
    form.validate()
        .map_err(|e| AppError::Validation(collect_messages(&e)))
        .or_redirect("/register")?;

    let user = AccountService::register(
        &state.db,
        NewAccount {
            actual_name: strip_markup(&form.actual_name),
            username: form.username,
            password: form.password,
            group_ids: form.groups,
        },
    )
    .await
    .or_redirect("/register")?;

    let issued = AccountService::open_session(&state.db, &state.config, &user)
        .await
        .or_redirect("/login")?;

    tracing::info!("👤 Registered {}", user.username);
    Ok(FlashRedirect::success(
        "/home",
        format!("Welcome to GroupShare, {}!", user.actual_name),
    )
    .with_cookie(session_cookie(issued.token, state.config.secure_cookies))
    .into_response())
}

pub async fn login_form(jar: CookieJar) -> Page<()> {
    Page::new("auth/login", flash::take(&jar), ())
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /home on success, back to /login otherwise")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, Response> {
    let user = AccountService::authenticate(&state.db, &form.username, &form.password)
        .await
        .or_redirect("/login")?
        .ok_or_else(|| {
            FlashRedirect::error("/login", "Password or username is incorrect").into_response()
        })?;

    let issued = AccountService::open_session(&state.db, &state.config, &user)
        .await
        .or_redirect("/login")?;

    Ok(FlashRedirect::success("/home", "Welcome to GroupShare!")
        .with_cookie(session_cookie(issued.token, state.config.secure_cookies))
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    session: Option<Extension<CurrentSession>>,
) -> FlashRedirect {
    if let Some(Extension(CurrentSession(session))) = session {
        if let Err(e) = AccountService::close_session(&state.db, &session.id).await {
            tracing::warn!("Failed to close session {}: {}", session.id, e.user_message());
        }
    }
    FlashRedirect::success("/", "Logged Out!").with_cookie(session_removal())
}
