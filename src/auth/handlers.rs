use askama::Template;
use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::auth::{password, session};
use crate::db::users::NewUser;
use crate::error::{AppError, AppResult};
use crate::extractors::{get_cookie_value, CurrentUser, MaybeUser};
use crate::flash::{self, Flash, IncomingFlash, Level};
use crate::routes::home::page;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub flash: Option<Flash>,
    pub username: String,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub flash: Option<Flash>,
    pub name: String,
    pub surname: String,
    pub username: String,
}

// -- Form types --

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

// -- Login handlers --

/// GET /login - render the login form. An already-authenticated visitor
/// has nothing to do here and is sent to the feed.
pub async fn login_page(maybe_user: MaybeUser, IncomingFlash(flash): IncomingFlash) -> Response {
    if maybe_user.0.is_some() {
        return Redirect::to("/workers").into_response();
    }
    let had_flash = flash.is_some();
    page(
        LoginTemplate {
            user: None,
            flash,
            username: String::new(),
        },
        had_flash,
    )
}

/// POST /login - establish a session on valid credentials; re-render the
/// form with an inline error (entered username preserved) otherwise.
pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = form.username.trim().to_string();

    match password::authenticate(&state.users, &username, &form.password).await {
        Ok(user) => {
            let token =
                session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
            tracing::info!("User {} logged in", user.username);
            Ok((
                StatusCode::SEE_OTHER,
                [(header::LOCATION, "/workers".to_string())],
                AppendHeaders([
                    (
                        header::SET_COOKIE,
                        session_cookie(
                            &state.config.auth.cookie_name,
                            &token,
                            state.config.auth.session_hours,
                        ),
                    ),
                    (
                        header::SET_COOKIE,
                        flash::cookie(
                            Level::Success,
                            &format!("Logged in as {}", user.username),
                        ),
                    ),
                ]),
                "",
            )
                .into_response())
        }
        Err(AppError::InvalidCredentials) => Ok(page(
            LoginTemplate {
                user: None,
                flash: Some(Flash {
                    level: Level::Error.as_str().to_string(),
                    message: AppError::InvalidCredentials.to_string(),
                }),
                username,
            },
            false,
        )),
        Err(e) => Err(e),
    }
}

// -- Register handlers --

/// GET /register
pub async fn register_page(maybe_user: MaybeUser, IncomingFlash(flash): IncomingFlash) -> Response {
    if maybe_user.0.is_some() {
        return Redirect::to("/workers").into_response();
    }
    let had_flash = flash.is_some();
    page(
        RegisterTemplate {
            user: None,
            flash,
            name: String::new(),
            surname: String::new(),
            username: String::new(),
        },
        had_flash,
    )
}

/// POST /register - create the account, or re-render the form with an
/// inline error and the entered values preserved.
pub async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let name = form.name.trim().to_string();
    let surname = form.surname.trim().to_string();
    let username = form.username.trim().to_string();

    let rerender = |message: String| {
        page(
            RegisterTemplate {
                user: None,
                flash: Some(Flash {
                    level: Level::Error.as_str().to_string(),
                    message,
                }),
                name: name.clone(),
                surname: surname.clone(),
                username: username.clone(),
            },
            false,
        )
    };

    if name.is_empty() || surname.is_empty() || username.is_empty() || form.password.is_empty() {
        return Ok(rerender("All fields are required".to_string()));
    }

    if form.password != form.confirm_password {
        return Ok(rerender(AppError::PasswordMismatch.to_string()));
    }

    let password_hash = password::hash(&form.password)?;

    // The first account on a fresh board becomes the admin.
    let is_admin = state.users.count().await? == 0;

    match state
        .users
        .create(NewUser {
            name: name.clone(),
            surname: surname.clone(),
            username: username.clone(),
            password_hash,
            is_admin,
        })
        .await
    {
        Ok(user) => {
            tracing::info!("Registered new user: {}", user.username);
            Ok(flash::redirect(
                "/login",
                Level::Success,
                &format!("Registered new user: {}. Please log in.", user.username),
            ))
        }
        Err(AppError::DuplicateUsername) => Ok(rerender(AppError::DuplicateUsername.to_string())),
        Err(e) => Err(e),
    }
}

// -- Logout handler --

/// GET /logout - delete the session row, clear the cookie, go home.
pub async fn logout(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();

    if let Some(token) = get_cookie_value(&parts, &state.config.auth.cookie_name) {
        let _ = session::delete_session(&state.db, token);
    }

    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, "/".to_string())],
        AppendHeaders([
            (
                header::SET_COOKIE,
                clear_session_cookie(&state.config.auth.cookie_name),
            ),
            (
                header::SET_COOKIE,
                flash::cookie(Level::Success, "You have been logged out"),
            ),
        ]),
        "",
    )
        .into_response())
}
