//! One-shot user-visible messages carried across a redirect in a cookie.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        let kind = match self.kind {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        };
        utf8_percent_encode(&format!("{}:{}", kind, self.message), NON_ALPHANUMERIC).to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        let decoded = percent_decode_str(raw).decode_utf8().ok()?;
        let (kind, message) = decoded.split_once(':')?;
        let kind = match kind {
            "success" => FlashKind::Success,
            "error" => FlashKind::Error,
            _ => return None,
        };
        Some(Self {
            kind,
            message: message.to_string(),
        })
    }

    fn cookie(&self) -> Cookie<'static> {
        Cookie::build((FLASH_COOKIE, self.encode()))
            .path("/")
            .http_only(true)
            .build()
    }
}

/// Reads the pending flash message, if any. The message is cleared by the
/// [`Page`] that displays it.
pub fn take(jar: &CookieJar) -> Option<FlashMessage> {
    jar.get(FLASH_COOKIE)
        .and_then(|cookie| FlashMessage::decode(cookie.value()))
}

fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Dropping unencodable cookie {}: {}", cookie.name(), e),
    }
}

fn clear_flash_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((FLASH_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// `303 See Other` to `to`, queuing `flash` for the next rendered page.
pub struct FlashRedirect {
    to: String,
    flash: FlashMessage,
    cookies: Vec<Cookie<'static>>,
}

impl FlashRedirect {
    pub fn new(to: impl Into<String>, flash: FlashMessage) -> Self {
        Self {
            to: to.into(),
            flash,
            cookies: Vec::new(),
        }
    }

    pub fn success(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(to, FlashMessage::success(message))
    }

    pub fn error(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(to, FlashMessage::error(message))
    }

    /// Attach an extra cookie (session establishment / removal).
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        let mut response = Redirect::to(&self.to).into_response();
        append_cookie(&mut response, &self.flash.cookie());
        for cookie in &self.cookies {
            append_cookie(&mut response, cookie);
        }
        response
    }
}

/// A rendered view: the template name, the pending flash message and the
/// data the template would be given.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(skip)]
    status: StatusCode,
    pub view: &'static str,
    pub flash: Option<FlashMessage>,
    pub data: T,
}

impl<T: Serialize> Page<T> {
    pub fn new(view: &'static str, flash: Option<FlashMessage>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            view,
            flash,
            data,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let consumed_flash = self.flash.is_some();
        let mut response = (self.status, Json(&self)).into_response();
        if consumed_flash {
            append_cookie(&mut response, &clear_flash_cookie());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_cookie_roundtrip_keeps_separators() {
        let flash = FlashMessage::error("Passwords do not match. Try again: twice; please");
        let decoded = FlashMessage::decode(&flash.encode()).unwrap();
        assert_eq!(decoded, flash);
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        assert!(FlashMessage::decode("warning%3Ahello").is_none());
        assert!(FlashMessage::decode("no-separator").is_none());
    }

    #[test]
    fn test_redirect_sets_location_and_cookie() {
        let response = FlashRedirect::success("/home", "Item successfully added.").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/home");
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=success"));
    }

    #[test]
    fn test_page_clears_consumed_flash() {
        let page = Page::new("auth/landing", Some(FlashMessage::success("hi")), ());
        let response = page.into_response();
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=;"));
    }
}
