//! One-shot flash messages, carried to the next rendered page in a
//! short-lived cookie. The value is `level:message` with the message
//! form-urlencoded so it survives cookie value restrictions (RFC 6265).

use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use url::form_urlencoded;

pub const FLASH_COOKIE: &str = "corkboard_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Warning,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
            Level::Warning => "warning",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "success" => Level::Success,
            "warning" => Level::Warning,
            _ => Level::Error,
        }
    }
}

/// A flash message pulled from the request, ready for template rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

/// Set-Cookie value carrying a flash to the next request.
pub fn cookie(level: Level, message: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!(
        "{}={}:{}; HttpOnly; SameSite=Strict; Path=/; Max-Age=60",
        FLASH_COOKIE,
        level.as_str(),
        encoded
    )
}

pub fn clear_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        FLASH_COOKIE
    )
}

/// See-other redirect that carries a flash message.
pub fn redirect(to: &str, level: Level, message: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, to.to_string()),
            (header::SET_COOKIE, cookie(level, message)),
        ],
        "",
    )
        .into_response()
}

/// Parse the flash cookie out of request parts, if present.
pub fn from_parts(parts: &Parts) -> Option<Flash> {
    let raw = crate::extractors::get_cookie_value(parts, FLASH_COOKIE)?;
    let (level, encoded) = raw.split_once(':')?;
    let message = form_urlencoded::parse(format!("m={}", encoded).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())?;
    if message.is_empty() {
        return None;
    }
    Some(Flash {
        level: Level::from_str(level).as_str().to_string(),
        message,
    })
}

/// Extractor form of `from_parts` for page handlers. Never rejects.
pub struct IncomingFlash(pub Option<Flash>);

impl<S> axum::extract::FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(from_parts(parts)))
    }
}
