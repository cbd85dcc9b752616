use askama::Template;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::auth::policy;
use crate::db::models::Post;
use crate::db::posts::NewPost;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::flash::{self, Flash, IncomingFlash, Level};
use crate::routes::home::{page, Html};
use crate::state::AppState;
use crate::uploads;

#[derive(Template)]
#[template(path = "pages/workers.html")]
struct WorkersTemplate {
    user: Option<CurrentUser>,
    posts: Vec<Post>,
    search: String,
    flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "pages/view_post.html")]
struct ViewPostTemplate {
    user: Option<CurrentUser>,
    post: Post,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

/// GET /workers - the feed, optionally filtered by a case-sensitive
/// substring over author name, surname, title and content.
async fn feed(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
    IncomingFlash(flash): IncomingFlash,
) -> AppResult<Response> {
    let search = query.search.unwrap_or_default();
    let posts = state.posts.list(Some(search.as_str())).await?;

    let had_flash = flash.is_some();
    Ok(page(
        WorkersTemplate {
            user: Some(user),
            posts,
            search,
            flash,
        },
        had_flash,
    ))
}

/// POST /workers - publish a new post, optionally with a photo.
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut title = String::new();
    let mut content = String::new();
    let mut photo: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid form data".into()))?
    {
        match field.name() {
            Some("title") => {
                title = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Invalid form data".into()))?
                    .trim()
                    .to_string();
            }
            Some("content") => {
                content = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Invalid form data".into()))?
                    .trim()
                    .to_string();
            }
            Some("photo") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::BadRequest("Invalid form data".into()))?;
                // Browsers submit an empty file part when no photo was chosen
                if !filename.is_empty() && !data.is_empty() {
                    photo = Some((filename, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    if title.is_empty() || content.is_empty() {
        return Ok(flash::redirect(
            "/workers",
            Level::Error,
            "Title and content are required",
        ));
    }

    // The author's current name and surname are copied onto the post.
    let author = state.users.get(&user.id).await?;

    // Photo file first, row second; the insert failing removes the file
    // again. A crash in between can still orphan a file on disk.
    let photo_path = match photo {
        Some((filename, data)) => {
            match uploads::save_photo(&state.uploads_dir, &filename, &data) {
                Ok(stored) => Some(stored),
                Err(AppError::UnsupportedFileType) => {
                    return Ok(flash::redirect(
                        "/workers",
                        Level::Error,
                        &AppError::UnsupportedFileType.to_string(),
                    ));
                }
                Err(e) => return Err(e),
            }
        }
        None => None,
    };

    let created = state
        .posts
        .create(NewPost {
            user_id: author.id,
            name: author.name,
            surname: author.surname,
            title,
            content,
            photo_path: photo_path.clone(),
        })
        .await;

    match created {
        Ok(post) => {
            tracing::info!("User {} published post {}", user.username, post.id);
            Ok(flash::redirect("/workers", Level::Success, "Post published"))
        }
        Err(e) => {
            if let Some(ref stored) = photo_path {
                uploads::remove_photo(&state.uploads_dir, stored);
            }
            Err(e)
        }
    }
}

/// POST /workers/delete_post/{id} - owner or admin only.
async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let post = match state.posts.get(&id).await {
        Ok(post) => post,
        Err(AppError::NotFound) => {
            return Ok(flash::redirect("/workers", Level::Error, "Post not found"));
        }
        Err(e) => return Err(e),
    };

    if policy::ensure_may_modify_post(&user, &post).is_err() {
        tracing::warn!(
            "User {} denied deleting post {} owned by {}",
            user.username,
            post.id,
            post.user_id
        );
        return Ok(flash::redirect(
            "/workers",
            Level::Error,
            "You can only delete your own posts",
        ));
    }

    state.posts.delete(&post.id).await?;
    if let Some(ref photo) = post.photo_path {
        uploads::remove_photo(&state.uploads_dir, photo);
    }

    Ok(flash::redirect("/workers", Level::Success, "Post deleted"))
}

/// GET /view_post/{id} - public single-post view.
async fn view_post(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let post = match state.posts.get(&id).await {
        Ok(post) => post,
        Err(AppError::NotFound) => {
            let back = if maybe_user.0.is_some() { "/workers" } else { "/" };
            return Ok(flash::redirect(back, Level::Error, "Post not found"));
        }
        Err(e) => return Err(e),
    };

    Ok(Html(ViewPostTemplate {
        user: maybe_user.0,
        post,
    })
    .into_response())
}

/// GET /uploads/{filename} - serve a stored photo from the uploads dir.
async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    if !uploads::is_safe_filename(&filename) {
        return Err(AppError::NotFound);
    }

    let path = state.uploads_dir.join(&filename);
    let data = tokio::fs::read(&path).await.map_err(|_| AppError::NotFound)?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok((
        axum::http::StatusCode::OK,
        [
            (
                axum::http::header::CONTENT_TYPE,
                mime.as_ref().to_string(),
            ),
            (
                axum::http::header::CACHE_CONTROL,
                "public, max-age=86400".to_string(),
            ),
        ],
        data,
    )
        .into_response())
}

pub(crate) fn search_url(base: &str, search: &str) -> String {
    if search.is_empty() {
        return base.to_string();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(search.as_bytes()).collect();
    format!("{}?search={}", base, encoded)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workers", get(feed).post(create_post))
        .route("/workers/delete_post/{id}", post(delete_post))
        .route("/view_post/{id}", get(view_post))
        .route("/uploads/{filename}", get(serve_upload))
}
