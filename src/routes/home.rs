use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::flash::{self, Flash, IncomingFlash};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub flash: Option<Flash>,
    pub user_count: i64,
}

#[derive(Template)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub user: Option<CurrentUser>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Render a page; when it just displayed a flash, clear the one-shot
/// cookie so the notice does not reappear.
pub fn page<T: Template>(template: T, had_flash: bool) -> Response {
    let mut response = Html(template).into_response();
    if had_flash {
        if let Ok(value) = flash::clear_cookie().parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

pub async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    IncomingFlash(flash): IncomingFlash,
) -> AppResult<Response> {
    let user_count = state.users.count().await?;
    let had_flash = flash.is_some();
    Ok(page(
        HomeTemplate {
            user: maybe_user.0,
            flash,
            user_count,
        },
        had_flash,
    ))
}

pub async fn about(maybe_user: MaybeUser) -> Response {
    Html(AboutTemplate { user: maybe_user.0 }).into_response()
}
