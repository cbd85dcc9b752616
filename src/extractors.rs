use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use rusqlite::params;

use crate::flash;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

/// Rejection for the auth guards: a request in the wrong state is sent to
/// the login page with a warning flash, never handed the resource or a
/// bare 401.
pub struct AuthRedirect(&'static str);

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        flash::redirect("/login", flash::Level::Warning, self.0)
    }
}

fn lookup_session_user(parts: &Parts, state: &AppState) -> Option<CurrentUser> {
    let token = get_cookie_value(parts, &state.config.auth.cookie_name)?;
    let conn = state.db.get().ok()?;
    conn.query_row(
        "SELECT u.id, u.username, u.is_admin FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(CurrentUser {
                id: row.get(0)?,
                username: row.get(1)?,
                is_admin: row.get(2)?,
            })
        },
    )
    .ok()
}

/// Extractor that requires a live session.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        lookup_session_user(parts, state)
            .ok_or(AuthRedirect("Please log in to view this page"))
    }
}

/// Extractor that requires a live session with the admin flag.
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AuthRedirect("Administrator access required"));
        }
        Ok(AdminUser(user))
    }
}

/// Optional user extractor - returns None instead of redirecting when not
/// authenticated. For pages that merely adapt their chrome to the session.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(lookup_session_user(parts, state)))
    }
}

pub(crate) fn get_cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}
