pub mod admin;
pub mod assets;
pub mod auth;
pub mod home;
pub mod workers;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rusqlite::params;
use tower_http::trace::TraceLayer;

use crate::error::AppResult;
use crate::state::AppState;

/// Assemble the full application router. Shared by `main` and the tests.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(home::index))
        .route("/about", get(home::about))
        .route("/assets/{*path}", get(assets::serve))
        .merge(auth::router())
        .merge(workers::router())
        .merge(admin::router());

    // Test-only seed endpoint: creates an admin user + session
    if std::env::var("CORKBOARD_TEST_SEED").is_ok() {
        router = router.route("/test/seed", get(test_seed));
    }

    router
        // Bounds multipart photo uploads
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Test-only: seed an admin user + session and return the session cookie.
/// Only mounted when CORKBOARD_TEST_SEED env var is set.
async fn test_seed(State(state): State<AppState>) -> AppResult<Response> {
    let password_hash = crate::auth::password::hash("testpass")?;
    let conn = state.db.get()?;
    let user_id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT OR IGNORE INTO users (id, name, surname, username, password_hash, is_admin) \
         VALUES (?1, 'Test', 'Admin', 'testadmin', ?2, 1)",
        params![user_id, password_hash],
    )?;

    // Get the actual user id (may already exist from a previous seed call)
    let uid: String = conn.query_row(
        "SELECT id FROM users WHERE username = 'testadmin'",
        [],
        |r| r.get(0),
    )?;
    drop(conn);

    let token =
        crate::auth::session::create_session(&state.db, &uid, state.config.auth.session_hours)?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600",
        state.config.auth.cookie_name, token
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        serde_json::json!({ "user_id": uid, "username": "testadmin" }).to_string(),
    )
        .into_response())
}
