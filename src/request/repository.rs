use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{self, TxError};
use crate::ids::{RequestId, UserId};
use crate::item::repository::items_for_requests;
use crate::item::Item;
use crate::pagination::Page;
use crate::request::domain::{ItemRequest, NewRequest, RequestError, RequestView};
use crate::state::DbPool;
use crate::user::repository::user_exists;

/// The acting user must exist for every operation; requests are returned
/// with their answering items, read in the same snapshot.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create(
        &self,
        requester: UserId,
        request: &NewRequest,
        created: NaiveDateTime,
    ) -> Result<ItemRequest, TxError<RequestError>>;

    async fn get(&self, reader: UserId, id: RequestId)
        -> Result<RequestView, TxError<RequestError>>;

    /// Requests made by `requester`, newest first.
    async fn list_by_requester(
        &self,
        requester: UserId,
        page: Page,
    ) -> Result<Vec<RequestView>, TxError<RequestError>>;

    /// Requests made by anyone but `requester`, newest first.
    async fn list_excluding(
        &self,
        requester: UserId,
        page: Page,
    ) -> Result<Vec<RequestView>, TxError<RequestError>>;
}

pub struct SqliteRequestRepository {
    pool: DbPool,
}

impl SqliteRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn list_where(
        &self,
        condition: &str,
        requester: UserId,
        page: Page,
    ) -> Result<Vec<RequestView>, TxError<RequestError>> {
        let conn = self.pool.get()?;

        db::snapshot(&conn, |conn| -> Result<Vec<RequestView>, TxError<RequestError>> {
            ensure_user(conn, requester)?;

            let mut stmt = conn.prepare(&format!(
                "SELECT id, description, requester_id, created FROM requests
                 WHERE {}
                 ORDER BY created DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
                condition
            ))?;
            let requests = stmt
                .query_map(params![requester, page.size(), page.offset()], request_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(attach_items(conn, requests)?)
        })
    }
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRequest> {
    Ok(ItemRequest {
        id: row.get(0)?,
        description: row.get(1)?,
        requester_id: row.get(2)?,
        created: row.get(3)?,
    })
}

pub(crate) fn request_exists(conn: &Connection, id: RequestId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM requests WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )
}

fn ensure_user(conn: &Connection, user: UserId) -> Result<(), TxError<RequestError>> {
    if user_exists(conn, user)? {
        Ok(())
    } else {
        Err(TxError::Rejected(RequestError::UserNotFound(user)))
    }
}

/// One query for the answers of all `requests`.
fn attach_items(
    conn: &Connection,
    requests: Vec<ItemRequest>,
) -> rusqlite::Result<Vec<RequestView>> {
    let ids: Vec<RequestId> = requests.iter().map(|r| r.id).collect();

    let mut by_request: HashMap<RequestId, Vec<Item>> = HashMap::new();
    for item in items_for_requests(conn, &ids)? {
        if let Some(request) = item.request_id {
            by_request.entry(request).or_default().push(item);
        }
    }

    Ok(requests
        .into_iter()
        .map(|request| {
            let items = by_request.remove(&request.id).unwrap_or_default();
            RequestView::new(request, items)
        })
        .collect())
}

#[async_trait]
impl RequestRepository for SqliteRequestRepository {
    async fn create(
        &self,
        requester: UserId,
        request: &NewRequest,
        created: NaiveDateTime,
    ) -> Result<ItemRequest, TxError<RequestError>> {
        let conn = self.pool.get()?;

        db::immediate(&conn, |conn| -> Result<ItemRequest, TxError<RequestError>> {
            ensure_user(conn, requester)?;

            conn.execute(
                "INSERT INTO requests (description, requester_id, created) VALUES (?1, ?2, ?3)",
                params![request.description, requester, created],
            )?;
            let id = conn.last_insert_rowid();

            Ok(ItemRequest {
                id: RequestId(id as u64),
                description: request.description.clone(),
                requester_id: requester,
                created,
            })
        })
    }

    async fn get(
        &self,
        reader: UserId,
        id: RequestId,
    ) -> Result<RequestView, TxError<RequestError>> {
        let conn = self.pool.get()?;

        db::snapshot(&conn, |conn| -> Result<RequestView, TxError<RequestError>> {
            ensure_user(conn, reader)?;

            let request = conn
                .query_row(
                    "SELECT id, description, requester_id, created FROM requests WHERE id = ?1",
                    params![id],
                    request_from_row,
                )
                .optional()?
                .ok_or(TxError::Rejected(RequestError::NotFound(id)))?;
            let items = items_for_requests(conn, &[id])?;

            Ok(RequestView::new(request, items))
        })
    }

    async fn list_by_requester(
        &self,
        requester: UserId,
        page: Page,
    ) -> Result<Vec<RequestView>, TxError<RequestError>> {
        self.list_where("requester_id = ?1", requester, page)
    }

    async fn list_excluding(
        &self,
        requester: UserId,
        page: Page,
    ) -> Result<Vec<RequestView>, TxError<RequestError>> {
        self.list_where("requester_id != ?1", requester, page)
    }
}

pub type DynRequestRepository = Arc<dyn RequestRepository>;
