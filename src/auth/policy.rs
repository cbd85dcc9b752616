use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

/// A mutation on a post is permitted iff the actor is an admin or the
/// post's owner. Checked server-side on every edit and delete; the
/// rendered view is never trusted to have hidden the control.
pub fn may_modify_post(user: &CurrentUser, post: &Post) -> bool {
    user.is_admin || user.id == post.user_id
}

pub fn ensure_may_modify_post(user: &CurrentUser, post: &Post) -> AppResult<()> {
    if may_modify_post(user, post) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
