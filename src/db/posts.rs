use async_trait::async_trait;
use rusqlite::params;
use std::sync::Arc;

use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub struct NewPost {
    pub user_id: String,
    pub name: String,
    pub surname: String,
    pub title: String,
    pub content: String,
    pub photo_path: Option<String>,
}

/// Fields an admin may change on an existing post.
pub struct PostUpdate {
    pub name: String,
    pub surname: String,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, new: NewPost) -> AppResult<Post>;

    /// Fails with `NotFound` if no post has that id.
    async fn get(&self, id: &str) -> AppResult<Post>;

    /// All posts in insertion order, optionally restricted to rows whose
    /// name, surname, title or content contain the case-sensitive
    /// substring.
    async fn list(&self, filter: Option<&str>) -> AppResult<Vec<Post>>;

    /// All posts authored by the given user, in insertion order.
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Post>>;

    async fn update(&self, id: &str, fields: PostUpdate) -> AppResult<()>;

    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub type DynPostRepository = Arc<dyn PostRepository>;

/// SQLite implementation
pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        surname: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        photo_path: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const POST_COLUMNS: &str = "id, user_id, name, surname, title, content, photo_path, created_at";

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(&self, new: NewPost) -> AppResult<Post> {
        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();

        conn.execute(
            "INSERT INTO posts (id, user_id, name, surname, title, content, photo_path) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                new.user_id,
                new.name,
                new.surname,
                new.title,
                new.content,
                new.photo_path
            ],
        )?;

        let post = conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            params![id],
            row_to_post,
        )?;
        Ok(post)
    }

    async fn get(&self, id: &str) -> AppResult<Post> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            params![id],
            row_to_post,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
            other => other.into(),
        })
    }

    async fn list(&self, filter: Option<&str>) -> AppResult<Vec<Post>> {
        let conn = self.pool.get()?;
        let posts = match filter.filter(|f| !f.is_empty()) {
            // instr() keeps the match case-sensitive; LIKE would fold ASCII case.
            Some(needle) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {POST_COLUMNS} FROM posts \
                     WHERE instr(name, ?1) > 0 \
                        OR instr(surname, ?1) > 0 \
                        OR instr(title, ?1) > 0 \
                        OR instr(content, ?1) > 0 \
                     ORDER BY created_at, id"
                ))?;
                let rows = stmt.query_map(params![needle], row_to_post)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at, id"
                ))?;
                let rows = stmt.query_map([], row_to_post)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(posts)
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_post)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn update(&self, id: &str, fields: PostUpdate) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE posts SET name = ?1, surname = ?2, title = ?3, content = ?4 WHERE id = ?5",
            params![fields.name, fields.surname, fields.title, fields.content, id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

/// In-memory implementation, for tests only.
#[cfg(test)]
pub(crate) struct MemoryPostRepository {
    posts: std::sync::Mutex<Vec<Post>>,
}

#[cfg(test)]
impl MemoryPostRepository {
    pub(crate) fn new() -> Self {
        Self {
            posts: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create(&self, new: NewPost) -> AppResult<Post> {
        let post = Post {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: new.user_id,
            name: new.name,
            surname: new.surname,
            title: new.title,
            content: new.content,
            photo_path: new.photo_path,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn get(&self, id: &str) -> AppResult<Post> {
        let posts = self.posts.lock().unwrap();
        posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn list(&self, filter: Option<&str>) -> AppResult<Vec<Post>> {
        let posts = self.posts.lock().unwrap();
        Ok(posts
            .iter()
            .filter(|p| match filter.filter(|f| !f.is_empty()) {
                Some(needle) => {
                    p.name.contains(needle)
                        || p.surname.contains(needle)
                        || p.title.contains(needle)
                        || p.content.contains(needle)
                }
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Post>> {
        let posts = self.posts.lock().unwrap();
        Ok(posts.iter().filter(|p| p.user_id == user_id).cloned().collect())
    }

    async fn update(&self, id: &str, fields: PostUpdate) -> AppResult<()> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(AppError::NotFound)?;
        post.name = fields.name;
        post.surname = fields.surname;
        post.title = fields.title;
        post.content = fields.content;
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
