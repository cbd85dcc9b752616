use std::path::PathBuf;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::db::posts::{DynPostRepository, SqlitePostRepository};
use crate::db::users::{DynUserRepository, SqliteUserRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub uploads_dir: PathBuf,
    pub users: DynUserRepository,
    pub posts: DynPostRepository,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let uploads_dir = config.uploads_path().clone();
        Self {
            users: Arc::new(SqliteUserRepository::new(db.clone())),
            posts: Arc::new(SqlitePostRepository::new(db.clone())),
            db,
            config,
            uploads_dir,
        }
    }
}
