use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;
use std::sync::Arc;

use crate::booking::repository::has_finished_approved;
use crate::db::{self, placeholders, TxError};
use crate::ids::{CommentId, ItemId};
use crate::item::domain::{Comment, ItemError, NewComment};
use crate::state::DbPool;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Store a comment if its author may leave it. Eligibility is checked in
    /// the same transaction as the insert.
    async fn create(&self, comment: &NewComment) -> Result<Comment, TxError<ItemError>>;
}

pub struct SqliteCommentRepository {
    pool: DbPool,
}

impl SqliteCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.text, u.name, c.created, c.item_id
     FROM comments c
     JOIN users u ON u.user_id = c.author_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        text: row.get(1)?,
        author_name: row.get(2)?,
        created: row.get(3)?,
    })
}

/// Newest first.
pub(crate) fn comments_for_item(conn: &Connection, item: ItemId) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.item_id = ?1 ORDER BY c.created DESC, c.id DESC",
        COMMENT_SELECT
    ))?;
    let comments = stmt
        .query_map(params![item], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}

/// Comments of every given item, grouped by item, each group newest first.
pub(crate) fn comments_for_items(
    conn: &Connection,
    items: &[ItemId],
) -> rusqlite::Result<HashMap<ItemId, Vec<Comment>>> {
    let mut grouped: HashMap<ItemId, Vec<Comment>> = HashMap::new();
    if items.is_empty() {
        return Ok(grouped);
    }

    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.item_id IN ({}) ORDER BY c.created DESC, c.id DESC",
        COMMENT_SELECT,
        placeholders(items.len())
    ))?;
    let rows = stmt.query_map(params_from_iter(items.iter()), |row| {
        Ok((row.get::<_, ItemId>(4)?, comment_from_row(row)?))
    })?;

    for row in rows {
        let (item, comment) = row?;
        grouped.entry(item).or_default().push(comment);
    }

    Ok(grouped)
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn create(&self, comment: &NewComment) -> Result<Comment, TxError<ItemError>> {
        let conn = self.pool.get()?;

        db::immediate(&conn, |conn| -> Result<Comment, TxError<ItemError>> {
            let eligible =
                has_finished_approved(conn, comment.item_id, comment.author_id, comment.created)?;
            comment.admit(eligible).map_err(TxError::Rejected)?;

            conn.execute(
                "INSERT INTO comments (text, item_id, author_id, created) VALUES (?1, ?2, ?3, ?4)",
                params![
                    comment.text,
                    comment.item_id,
                    comment.author_id,
                    comment.created
                ],
            )?;
            let id = CommentId(conn.last_insert_rowid() as u64);

            let created = conn.query_row(
                &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
                params![id],
                comment_from_row,
            )?;

            Ok(created)
        })
    }
}

pub type DynCommentRepository = Arc<dyn CommentRepository>;
