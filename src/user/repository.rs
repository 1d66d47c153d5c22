use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

use crate::db::RepositoryError;
use crate::ids::UserId;
use crate::state::DbPool;
use crate::user::domain::{NewUser, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn fetch(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Overwrite name and email. Returns false when the user is gone.
    async fn update(&self, user: &User) -> Result<bool, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;
}

pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

/// Existence check usable inside another repository's transaction.
pub(crate) fn user_exists(conn: &Connection, id: UserId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
        params![id],
        |row| row.get(0),
    )
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO users (name, email) VALUES (?1, ?2)",
            params![user.name, user.email],
        )?;
        let id = conn.last_insert_rowid();

        Ok(User {
            id: UserId(id as u64),
            name: user.name.clone(),
            email: user.email.clone(),
        })
    }

    async fn fetch(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;

        let user = conn
            .query_row(
                "SELECT user_id, name, email FROM users WHERE user_id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT user_id, name, email FROM users ORDER BY user_id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    async fn update(&self, user: &User) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE users SET name = ?1, email = ?2 WHERE user_id = ?3",
            params![user.name, user.email, user.id],
        )?;

        Ok(rows > 0)
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute("DELETE FROM users WHERE user_id = ?1", params![id])?;

        Ok(rows > 0)
    }
}

pub type DynUserRepository = Arc<dyn UserRepository>;
