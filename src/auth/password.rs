use crate::db::models::User;
use crate::db::users::DynUserRepository;
use crate::error::{AppError, AppResult};

/// Hash a password for storage. Plaintext never touches the database.
pub fn hash(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a plaintext password against a stored hash - constant-time via bcrypt.
pub fn verify(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Look up a user by username and check the password. Unknown usernames
/// and wrong passwords both come back as `InvalidCredentials`.
pub async fn authenticate(
    users: &DynUserRepository,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let user = users
        .find_by_username(username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify(password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}
