use crate::api::flash::{FlashRedirect, Page};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("You need to be logged in to do that!")]
    Unauthenticated,

    #[error("Your account is waiting for an administrator to activate it.")]
    PendingActivation,

    #[error("Database error: {0}")]
    Store(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

impl AppError {
    /// Message shown to the user. Store and internal failures are logged
    /// here and replaced by a generic message.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Store(e) => {
                tracing::error!("Database error: {:?}", e);
                GENERIC_MESSAGE.to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                GENERIC_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Translate the failure into a redirect carrying a flash message.
    /// `Unauthenticated` always goes to the login form and
    /// `PendingActivation` renders the waiting view instead.
    pub fn redirect(self, to: impl Into<String>) -> Response {
        match self {
            AppError::Unauthenticated => {
                FlashRedirect::error("/login", self.user_message()).into_response()
            }
            AppError::PendingActivation => Page::new(
                "auth/wait",
                None,
                json!({ "message": self.user_message() }),
            )
            .with_status(StatusCode::FORBIDDEN)
            .into_response(),
            other => FlashRedirect::error(to, other.user_message()).into_response(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.redirect("/home")
    }
}

/// Shorthand for handlers: `service_call().await.or_redirect("/home")?`
pub trait OrRedirect<T> {
    fn or_redirect(self, to: &str) -> Result<T, Response>;
}

impl<T> OrRedirect<T> for Result<T, AppError> {
    fn or_redirect(self, to: &str) -> Result<T, Response> {
        self.map_err(|e| e.redirect(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_goes_to_login() {
        let response = AppError::Unauthenticated.redirect("/home");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }

    #[test]
    fn test_pending_activation_renders_wait_view() {
        let response = AppError::PendingActivation.redirect("/home");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_store_error_hides_details() {
        let err = AppError::Store(sea_orm::DbErr::Custom("disk full".to_string()));
        assert_eq!(err.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_domain_errors_redirect_to_target() {
        let response = AppError::QuotaExceeded("full".to_string()).redirect("/home/new");
        assert_eq!(response.headers()["location"], "/home/new");
    }
}
