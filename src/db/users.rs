// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use rusqlite::params;
use std::sync::Arc;

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Fields an admin may change on an existing user.
pub struct UserUpdate {
    pub name: String,
    pub surname: String,
    pub username: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `DuplicateUsername` if the username
    /// is already taken.
    async fn create(&self, new: NewUser) -> AppResult<User>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Fails with `NotFound` if no user has that id.
    async fn get(&self, id: &str) -> AppResult<User>;

    /// All users in insertion order, optionally restricted to rows whose
    /// name, surname or username contain the case-sensitive substring.
    async fn list(&self, filter: Option<&str>) -> AppResult<Vec<User>>;

    async fn update(&self, id: &str, fields: UserUpdate) -> AppResult<()>;

    async fn delete(&self, id: &str) -> AppResult<()>;

    async fn count(&self) -> AppResult<i64>;
}

pub type DynUserRepository = Arc<dyn UserRepository>;

/// SQLite implementation
pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        username: row.get(3)?,
        password_hash: row.get(4)?,
        is_admin: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const USER_COLUMNS: &str = "id, name, surname, username, password_hash, is_admin, created_at";

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();

        let result = conn.execute(
            "INSERT INTO users (id, name, surname, username, password_hash, is_admin) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                new.name,
                new.surname,
                new.username,
                new.password_hash,
                new.is_admin
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(AppError::DuplicateUsername),
            Err(e) => return Err(e.into()),
        }

        let user = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let conn = self.pool.get()?;
        let result = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            row_to_user,
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &str) -> AppResult<User> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
            other => other.into(),
        })
    }

    async fn list(&self, filter: Option<&str>) -> AppResult<Vec<User>> {
        let conn = self.pool.get()?;
        let users = match filter.filter(|f| !f.is_empty()) {
            // instr() keeps the match case-sensitive; LIKE would fold ASCII case.
            Some(needle) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users \
                     WHERE instr(name, ?1) > 0 \
                        OR instr(surname, ?1) > 0 \
                        OR instr(username, ?1) > 0 \
                     ORDER BY created_at, id"
                ))?;
                let rows = stmt.query_map(params![needle], row_to_user)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
                ))?;
                let rows = stmt.query_map([], row_to_user)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(users)
    }

    async fn update(&self, id: &str, fields: UserUpdate) -> AppResult<()> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            "UPDATE users SET name = ?1, surname = ?2, username = ?3 WHERE id = ?4",
            params![fields.name, fields.surname, fields.username, id],
        );
        match result {
            Ok(0) => Err(AppError::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateUsername),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// In-memory implementation, for tests that exercise logic above the
/// repository seam without a database.
#[cfg(test)]
pub(crate) struct MemoryUserRepository {
    users: std::sync::Mutex<Vec<User>>,
}

#[cfg(test)]
impl MemoryUserRepository {
    pub(crate) fn new() -> Self {
        Self {
            users: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == new.username) {
            return Err(AppError::DuplicateUsername);
        }
        let user = User {
            id: uuid::Uuid::now_v7().to_string(),
            name: new.name,
            surname: new.surname,
            username: new.username,
            password_hash: new.password_hash,
            is_admin: new.is_admin,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn get(&self, id: &str) -> AppResult<User> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn list(&self, filter: Option<&str>) -> AppResult<Vec<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .filter(|u| match filter.filter(|f| !f.is_empty()) {
                Some(needle) => {
                    u.name.contains(needle)
                        || u.surname.contains(needle)
                        || u.username.contains(needle)
                }
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, fields: UserUpdate) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == fields.username && u.id != id)
        {
            return Err(AppError::DuplicateUsername);
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound)?;
        user.name = fields.name;
        user.surname = fields.surname;
        user.username = fields.username;
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.users.lock().unwrap().len() as i64)
    }
}
