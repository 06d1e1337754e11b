use crate::AppState;
use crate::api::error::AppError;
use crate::api::flash::FlashRedirect;
use crate::entities::{items, sessions, users};
use crate::services::accounts::AccountService;
use axum::{
    extract::{Path, Request, State},
    http::header::REFERER,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

pub const SESSION_COOKIE: &str = "session";

/// The logged-in principal, inserted by [`session_loader`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub users::Model);

#[derive(Clone, Debug)]
pub struct CurrentSession(pub sessions::Model);

/// The item named by the route, inserted by [`require_item_owner`].
#[derive(Clone, Debug)]
pub struct OwnedItem(pub items::Model);

/// Resolves the session cookie into a [`CurrentUser`]. Never rejects; an
/// invalid or expired session simply leaves the request anonymous.
pub async fn session_loader(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match AccountService::resolve_session(&state.db, &state.config, cookie.value()).await {
            Ok(Some((session, user))) => {
                req.extensions_mut().insert(CurrentSession(session));
                req.extensions_mut().insert(CurrentUser(user));
            }
            Ok(None) => tracing::debug!("Ignoring stale session cookie"),
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }

    next.run(req).await
}

pub async fn require_login(req: Request, next: Next) -> Response {
    if req.extensions().get::<CurrentUser>().is_none() {
        return AppError::Unauthenticated.into_response();
    }
    next.run(req).await
}

pub async fn require_logged_out(req: Request, next: Next) -> Response {
    if req.extensions().get::<CurrentUser>().is_some() {
        return FlashRedirect::error("/home", "Already logged in.").into_response();
    }
    next.run(req).await
}

/// Accounts wait for an admin to activate them before they can use items.
pub async fn require_active(req: Request, next: Next) -> Response {
    match req.extensions().get::<CurrentUser>() {
        None => AppError::Unauthenticated.into_response(),
        Some(CurrentUser(user)) if !user.is_active => {
            AppError::PendingActivation.into_response()
        }
        Some(_) => next.run(req).await,
    }
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<CurrentUser>() {
        None => AppError::Unauthenticated.into_response(),
        Some(CurrentUser(user)) if !user.is_admin => {
            AppError::Forbidden("You don't have permission to do that".to_string())
                .into_response()
        }
        Some(_) => next.run(req).await,
    }
}

/// Only the creator of the item in the path, or an admin, may pass.
pub async fn require_item_owner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(CurrentUser(user)) = req.extensions().get::<CurrentUser>().cloned() else {
        return AppError::Unauthenticated.into_response();
    };

    let item = match state.items.find_item(&id).await {
        Ok(item) => item,
        Err(e @ AppError::NotFound(_)) => {
            let back = req
                .headers()
                .get(REFERER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("/home")
                .to_string();
            return e.redirect(back);
        }
        Err(e) => return e.redirect("/home"),
    };

    if item.creator_id != user.id && !user.is_admin {
        return AppError::Forbidden("You don't have permission to do that".to_string())
            .redirect(format!("/home/{}", id));
    }

    req.extensions_mut().insert(OwnedItem(item));
    next.run(req).await
}

/// `/user/:id` is only visible to the user it names.
pub async fn require_self(Path(id): Path<String>, req: Request, next: Next) -> Response {
    match req.extensions().get::<CurrentUser>() {
        None => AppError::Unauthenticated.into_response(),
        Some(CurrentUser(user)) if user.id != id => {
            AppError::Forbidden("You don't have permission to do that".to_string())
                .into_response()
        }
        Some(_) => next.run(req).await,
    }
}
