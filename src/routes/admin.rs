use askama::Template;
use axum::extract::{Form, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::db::models::{Post, User};
use crate::db::posts::PostUpdate;
use crate::db::users::UserUpdate;
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, CurrentUser};
use crate::flash::{self, Flash, IncomingFlash, Level};
use crate::routes::home::page;
use crate::routes::workers::search_url;
use crate::state::AppState;
use crate::uploads;

#[derive(Template)]
#[template(path = "pages/admin.html")]
struct AdminTemplate {
    user: Option<CurrentUser>,
    users: Vec<User>,
    posts: Vec<Post>,
    search: String,
    flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "pages/edit_user.html")]
struct EditUserTemplate {
    user: Option<CurrentUser>,
    target: User,
    flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "pages/edit_post.html")]
struct EditPostTemplate {
    user: Option<CurrentUser>,
    post: Post,
    flash: Option<Flash>,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

#[derive(Deserialize)]
struct SearchForm {
    search: String,
}

/// GET /admin - users and posts listings, both filtered by the same
/// search box.
async fn panel(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(query): Query<SearchQuery>,
    IncomingFlash(flash): IncomingFlash,
) -> AppResult<Response> {
    let search = query.search.unwrap_or_default();
    let users = state.users.list(Some(search.as_str())).await?;
    let posts = state.posts.list(Some(search.as_str())).await?;

    let had_flash = flash.is_some();
    Ok(page(
        AdminTemplate {
            user: Some(user),
            users,
            posts,
            search,
            flash,
        },
        had_flash,
    ))
}

/// POST /admin - search form fallback, canonicalized to the GET query.
async fn panel_search(_admin: AdminUser, Form(form): Form<SearchForm>) -> Response {
    Redirect::to(&search_url("/admin", &form.search)).into_response()
}

/// GET /admin/delete_user/{id} - cascade-deletes the user's posts and
/// sessions; their photo files are removed best-effort afterwards.
async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let target = match state.users.get(&id).await {
        Ok(user) => user,
        Err(AppError::NotFound) => {
            return Ok(flash::redirect("/admin", Level::Error, "User not found"));
        }
        Err(e) => return Err(e),
    };

    // Collect photo paths before the cascade removes the rows.
    let photos: Vec<String> = state
        .posts
        .list_by_user(&target.id)
        .await?
        .into_iter()
        .filter_map(|p| p.photo_path)
        .collect();

    state.users.delete(&target.id).await?;
    for photo in &photos {
        uploads::remove_photo(&state.uploads_dir, photo);
    }

    tracing::info!(
        "Admin {} deleted user {} ({} posts cascaded)",
        admin.username,
        target.username,
        photos.len()
    );
    Ok(flash::redirect(
        "/admin",
        Level::Success,
        &format!("Deleted user {}", target.username),
    ))
}

/// GET/POST /admin/delete_post/{id}
async fn delete_post(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let post = match state.posts.get(&id).await {
        Ok(post) => post,
        Err(AppError::NotFound) => {
            return Ok(flash::redirect("/admin", Level::Error, "Post not found"));
        }
        Err(e) => return Err(e),
    };

    state.posts.delete(&post.id).await?;
    if let Some(ref photo) = post.photo_path {
        uploads::remove_photo(&state.uploads_dir, photo);
    }

    tracing::info!("Admin {} deleted post {}", admin.username, post.id);
    Ok(flash::redirect("/admin", Level::Success, "Post deleted"))
}

#[derive(Deserialize)]
struct EditUserForm {
    name: String,
    surname: String,
    username: String,
}

/// GET /admin/edit_user/{id}
async fn edit_user_page(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let target = match state.users.get(&id).await {
        Ok(target) => target,
        Err(AppError::NotFound) => {
            return Ok(flash::redirect("/admin", Level::Error, "User not found"));
        }
        Err(e) => return Err(e),
    };

    Ok(page(
        EditUserTemplate {
            user: Some(user),
            target,
            flash: None,
        },
        false,
    ))
}

/// POST /admin/edit_user/{id} - name, surname and username only; the
/// admin flag is never editable here.
async fn edit_user_submit(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
    Form(form): Form<EditUserForm>,
) -> AppResult<Response> {
    let mut target = match state.users.get(&id).await {
        Ok(target) => target,
        Err(AppError::NotFound) => {
            return Ok(flash::redirect("/admin", Level::Error, "User not found"));
        }
        Err(e) => return Err(e),
    };

    let name = form.name.trim().to_string();
    let surname = form.surname.trim().to_string();
    let username = form.username.trim().to_string();

    let rerender = |target: User, message: String| {
        page(
            EditUserTemplate {
                user: Some(user.clone()),
                target,
                flash: Some(Flash {
                    level: Level::Error.as_str().to_string(),
                    message,
                }),
            },
            false,
        )
    };

    if name.is_empty() || surname.is_empty() || username.is_empty() {
        return Ok(rerender(target, "All fields are required".to_string()));
    }

    let update = UserUpdate {
        name: name.clone(),
        surname: surname.clone(),
        username: username.clone(),
    };

    match state.users.update(&id, update).await {
        Ok(()) => Ok(flash::redirect(
            "/admin",
            Level::Success,
            &format!("Updated user {}", username),
        )),
        Err(AppError::DuplicateUsername) => {
            // Show the attempted values back in the form
            target.name = name;
            target.surname = surname;
            target.username = username;
            Ok(rerender(target, AppError::DuplicateUsername.to_string()))
        }
        Err(e) => Err(e),
    }
}

#[derive(Deserialize)]
struct EditPostForm {
    name: String,
    surname: String,
    title: String,
    content: String,
}

/// GET /admin/edit_post/{id}
async fn edit_post_page(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let post = match state.posts.get(&id).await {
        Ok(post) => post,
        Err(AppError::NotFound) => {
            return Ok(flash::redirect("/admin", Level::Error, "Post not found"));
        }
        Err(e) => return Err(e),
    };

    Ok(page(
        EditPostTemplate {
            user: Some(user),
            post,
            flash: None,
        },
        false,
    ))
}

/// POST /admin/edit_post/{id}
async fn edit_post_submit(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
    Form(form): Form<EditPostForm>,
) -> AppResult<Response> {
    let mut post = match state.posts.get(&id).await {
        Ok(post) => post,
        Err(AppError::NotFound) => {
            return Ok(flash::redirect("/admin", Level::Error, "Post not found"));
        }
        Err(e) => return Err(e),
    };

    let name = form.name.trim().to_string();
    let surname = form.surname.trim().to_string();
    let title = form.title.trim().to_string();
    let content = form.content.trim().to_string();

    if name.is_empty() || surname.is_empty() || title.is_empty() || content.is_empty() {
        post.name = name;
        post.surname = surname;
        post.title = title;
        post.content = content;
        return Ok(page(
            EditPostTemplate {
                user: Some(user),
                post,
                flash: Some(Flash {
                    level: Level::Error.as_str().to_string(),
                    message: "All fields are required".to_string(),
                }),
            },
            false,
        ));
    }

    state
        .posts
        .update(
            &id,
            PostUpdate {
                name,
                surname,
                title,
                content,
            },
        )
        .await?;

    Ok(flash::redirect("/admin", Level::Success, "Post updated"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(panel).post(panel_search))
        .route("/admin/delete_user/{id}", get(delete_user))
        .route("/admin/delete_post/{id}", get(delete_post).post(delete_post))
        .route(
            "/admin/edit_user/{id}",
            get(edit_user_page).post(edit_user_submit),
        )
        .route(
            "/admin/edit_post/{id}",
            get(edit_post_page).post(edit_post_submit),
        )
}
