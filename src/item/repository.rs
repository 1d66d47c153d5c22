use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::Arc;

use crate::booking::repository::summaries_for_items;
use crate::booking::BookingSummary;
use crate::db::{self, placeholders, RepositoryError, TxError};
use crate::ids::{ItemId, RequestId, UserId};
use crate::item::comments::{comments_for_item, comments_for_items};
use crate::item::domain::{Item, ItemError, ItemPatch, ItemRecord, NewItem};
use crate::pagination::Page;
use crate::request::repository::request_exists;
use crate::state::DbPool;
use crate::user::repository::user_exists;

/// Writes check ownership and references inside their own transaction;
/// projections read everything from one snapshot.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// The owner, and the answered request if any, must exist.
    async fn create(&self, owner: UserId, item: &NewItem) -> Result<Item, TxError<ItemError>>;

    /// Owner-only. Absent patch fields keep their stored value.
    async fn update(
        &self,
        caller: UserId,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<Item, TxError<ItemError>>;

    /// Owner-only. Bookings and comments go with the item.
    async fn delete(&self, caller: UserId, id: ItemId) -> Result<(), TxError<ItemError>>;

    /// The item with its comments, plus its bookings when `reader` owns it.
    async fn record(&self, id: ItemId, reader: UserId) -> Result<ItemRecord, TxError<ItemError>>;

    /// A page of the owner's items by id ascending, each with comments and
    /// bookings.
    async fn owner_records(
        &self,
        owner: UserId,
        page: Page,
    ) -> Result<Vec<ItemRecord>, TxError<ItemError>>;

    /// Available items whose name or description contains `text`, ignoring
    /// case (Unicode-aware).
    async fn search(&self, text: &str, page: Page) -> Result<Vec<Item>, RepositoryError>;
}

pub struct SqliteItemRepository {
    pool: DbPool,
}

impl SqliteItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const ITEM_COLUMNS: &str = "item_id, name, description, is_available, owner_id, request_id";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        available: row.get(3)?,
        owner_id: row.get(4)?,
        request_id: row.get(5)?,
    })
}

fn fetch_item(conn: &Connection, id: ItemId) -> rusqlite::Result<Option<Item>> {
    conn.query_row(
        &format!("SELECT {} FROM items WHERE item_id = ?1", ITEM_COLUMNS),
        params![id],
        item_from_row,
    )
    .optional()
}

/// The item `id` if `caller` owns it.
fn owned_item(conn: &Connection, caller: UserId, id: ItemId) -> Result<Item, TxError<ItemError>> {
    let item = fetch_item(conn, id)?.ok_or(TxError::Rejected(ItemError::NotFound(id)))?;
    item.ensure_owned_by(caller).map_err(TxError::Rejected)?;
    Ok(item)
}

/// Items published in answer to any of the given requests, by id ascending.
pub(crate) fn items_for_requests(
    conn: &Connection,
    requests: &[RequestId],
) -> rusqlite::Result<Vec<Item>> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM items WHERE request_id IN ({}) ORDER BY item_id",
        ITEM_COLUMNS,
        placeholders(requests.len())
    ))?;
    let items = stmt
        .query_map(params_from_iter(requests.iter()), item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn create(&self, owner: UserId, item: &NewItem) -> Result<Item, TxError<ItemError>> {
        let conn = self.pool.get()?;

        db::immediate(&conn, |conn| -> Result<Item, TxError<ItemError>> {
            if !user_exists(conn, owner)? {
                return Err(TxError::Rejected(ItemError::OwnerNotFound(owner)));
            }
            if let Some(request) = item.request_id {
                if !request_exists(conn, request)? {
                    return Err(TxError::Rejected(ItemError::RequestNotFound(request)));
                }
            }

            conn.execute(
                "INSERT INTO items (name, description, is_available, owner_id, request_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    item.name,
                    item.description,
                    item.available,
                    owner,
                    item.request_id
                ],
            )?;
            let id = conn.last_insert_rowid();

            Ok(Item {
                id: ItemId(id as u64),
                name: item.name.clone(),
                description: item.description.clone(),
                available: item.available,
                owner_id: owner,
                request_id: item.request_id,
            })
        })
    }

    async fn update(
        &self,
        caller: UserId,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<Item, TxError<ItemError>> {
        let conn = self.pool.get()?;

        db::immediate(&conn, |conn| -> Result<Item, TxError<ItemError>> {
            let updated = owned_item(conn, caller, id)?.apply(patch);

            conn.execute(
                "UPDATE items SET name = ?1, description = ?2, is_available = ?3 WHERE item_id = ?4",
                params![updated.name, updated.description, updated.available, id],
            )?;

            Ok(updated)
        })
    }

    async fn delete(&self, caller: UserId, id: ItemId) -> Result<(), TxError<ItemError>> {
        let conn = self.pool.get()?;

        db::immediate(&conn, |conn| -> Result<(), TxError<ItemError>> {
            owned_item(conn, caller, id)?;
            conn.execute("DELETE FROM items WHERE item_id = ?1", params![id])?;
            Ok(())
        })
    }

    async fn record(&self, id: ItemId, reader: UserId) -> Result<ItemRecord, TxError<ItemError>> {
        let conn = self.pool.get()?;

        db::snapshot(&conn, |conn| -> Result<ItemRecord, TxError<ItemError>> {
            let item = fetch_item(conn, id)?.ok_or(TxError::Rejected(ItemError::NotFound(id)))?;
            let comments = comments_for_item(conn, id)?;
            let bookings = if item.owner_id == reader {
                summaries_for_items(conn, &[id])?
            } else {
                Vec::new()
            };

            Ok(ItemRecord {
                item,
                comments,
                bookings,
            })
        })
    }

    async fn owner_records(
        &self,
        owner: UserId,
        page: Page,
    ) -> Result<Vec<ItemRecord>, TxError<ItemError>> {
        let conn = self.pool.get()?;

        db::snapshot(&conn, |conn| -> Result<Vec<ItemRecord>, TxError<ItemError>> {
            if !user_exists(conn, owner)? {
                return Err(TxError::Rejected(ItemError::OwnerNotFound(owner)));
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM items WHERE owner_id = ?1 ORDER BY item_id LIMIT ?2 OFFSET ?3",
                ITEM_COLUMNS
            ))?;
            let items = stmt
                .query_map(params![owner, page.size(), page.offset()], item_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();

            let mut comments = comments_for_items(conn, &ids)?;
            let mut bookings: HashMap<ItemId, Vec<BookingSummary>> = HashMap::new();
            for summary in summaries_for_items(conn, &ids)? {
                bookings.entry(summary.item_id).or_default().push(summary);
            }

            Ok(items
                .into_iter()
                .map(|item| ItemRecord {
                    comments: comments.remove(&item.id).unwrap_or_default(),
                    bookings: bookings.remove(&item.id).unwrap_or_default(),
                    item,
                })
                .collect())
        })
    }

    async fn search(&self, text: &str, page: Page) -> Result<Vec<Item>, RepositoryError> {
        let conn = self.pool.get()?;

        // instr() rather than LIKE so that % and _ in the text are literal.
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items
             WHERE is_available = 1
               AND (instr(unicode_lower(name), unicode_lower(?1)) > 0
                    OR instr(unicode_lower(description), unicode_lower(?1)) > 0)
             ORDER BY item_id
             LIMIT ?2 OFFSET ?3",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![text, page.size(), page.offset()], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }
}

pub type DynItemRepository = Arc<dyn ItemRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;

    fn seeded() -> (SqliteItemRepository, DbPool, tempfile::TempDir) {
        let (pool, temp) = migrated_pool();
        pool.get()
            .unwrap()
            .execute_batch(
                "INSERT INTO users (name, email) VALUES ('Owner', 'owner@example.com');
                 INSERT INTO users (name, email) VALUES ('Other', 'other@example.com');",
            )
            .unwrap();
        (SqliteItemRepository::new(pool.clone()), pool, temp)
    }

    fn new_item(name: &str, description: &str, available: bool) -> NewItem {
        NewItem {
            name: name.into(),
            description: description.into(),
            available,
            request_id: None,
        }
    }

    fn rejection<T: std::fmt::Debug>(result: Result<T, TxError<ItemError>>) -> ItemError {
        match result {
            Err(TxError::Rejected(err)) => err,
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_update_and_read_back() {
        let (repo, _pool, _temp) = seeded();

        let item = repo
            .create(UserId(1), &new_item("Drill", "Cordless drill", true))
            .await
            .unwrap();
        assert_eq!(repo.record(item.id, UserId(2)).await.unwrap().item, item);

        let patch = ItemPatch {
            name: Some("Hammer drill".into()),
            available: Some(false),
            ..Default::default()
        };
        let updated = repo.update(UserId(1), item.id, patch).await.unwrap();
        assert_eq!(updated.description, "Cordless drill");
        assert_eq!(repo.record(item.id, UserId(1)).await.unwrap().item, updated);
    }

    #[tokio::test]
    async fn test_create_checks_owner_and_request() {
        let (repo, pool, _temp) = seeded();

        assert_eq!(
            rejection(repo.create(UserId(9), &new_item("Drill", "d", true)).await),
            ItemError::OwnerNotFound(UserId(9))
        );
        let answering = NewItem {
            request_id: Some(RequestId(77)),
            ..new_item("Drill", "Cordless", true)
        };
        assert_eq!(
            rejection(repo.create(UserId(1), &answering).await),
            ItemError::RequestNotFound(RequestId(77))
        );

        let count: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_only_owner_may_change_or_delete() {
        let (repo, _pool, _temp) = seeded();
        let item = repo.create(UserId(1), &new_item("A", "a", true)).await.unwrap();

        assert!(matches!(
            rejection(repo.update(UserId(2), item.id, ItemPatch::default()).await),
            ItemError::NotOwner { .. }
        ));
        assert!(matches!(
            rejection(repo.delete(UserId(2), item.id).await),
            ItemError::NotOwner { .. }
        ));

        repo.delete(UserId(1), item.id).await.unwrap();
        assert_eq!(
            rejection(repo.delete(UserId(1), item.id).await),
            ItemError::NotFound(item.id)
        );
        assert_eq!(
            rejection(repo.record(item.id, UserId(1)).await),
            ItemError::NotFound(item.id)
        );
    }

    #[tokio::test]
    async fn test_owner_records_page_by_id() {
        let (repo, _pool, _temp) = seeded();
        repo.create(UserId(1), &new_item("A", "a", true)).await.unwrap();
        repo.create(UserId(2), &new_item("B", "b", true)).await.unwrap();
        let c = repo.create(UserId(1), &new_item("C", "c", false)).await.unwrap();

        let page = Page::new(1, 5).unwrap();
        let listed = repo.owner_records(UserId(1), page).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item, c);
        assert!(listed[0].comments.is_empty());

        assert_eq!(
            rejection(repo.owner_records(UserId(9), Page::default()).await),
            ItemError::OwnerNotFound(UserId(9))
        );
    }

    #[tokio::test]
    async fn test_record_hides_bookings_from_non_owner() {
        let (repo, pool, _temp) = seeded();
        let item = repo.create(UserId(1), &new_item("A", "a", true)).await.unwrap();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO bookings (start_date, end_date, item_id, booker_id, status)
                 VALUES ('2030-01-01T10:00:00', '2030-01-02T10:00:00', ?1, 2, 'WAITING')",
                params![item.id],
            )
            .unwrap();

        assert_eq!(repo.record(item.id, UserId(1)).await.unwrap().bookings.len(), 1);
        assert!(repo.record(item.id, UserId(2)).await.unwrap().bookings.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_available_only() {
        let (repo, _pool, _temp) = seeded();
        let drill = repo
            .create(UserId(1), &new_item("Drill", "Cordless DRILL", true))
            .await
            .unwrap();
        let screwdriver = repo
            .create(UserId(1), &new_item("Screwdriver", "works like a drill", true))
            .await
            .unwrap();
        repo.create(UserId(1), &new_item("Old drill", "broken", false))
            .await
            .unwrap();

        let found = repo.search("dRiLl", Page::default()).await.unwrap();
        assert_eq!(found, vec![drill, screwdriver]);
        assert!(repo.search("100%", Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let (repo, _pool, _temp) = seeded();
        let drill = repo
            .create(UserId(1), &new_item("Дрель", "Аккумуляторная", true))
            .await
            .unwrap();
        let filter = repo
            .create(UserId(1), &new_item("Ölfilter", "Für Motoren", true))
            .await
            .unwrap();

        for text in ["дрель", "ДРЕЛЬ", "аккумулятор"] {
            let found = repo.search(text, Page::default()).await.unwrap();
            assert_eq!(found, vec![drill.clone()], "searching {}", text);
        }
        for text in ["ölfilter", "ÖLFILTER", "FÜR"] {
            let found = repo.search(text, Page::default()).await.unwrap();
            assert_eq!(found, vec![filter.clone()], "searching {}", text);
        }
    }

    #[tokio::test]
    async fn test_items_for_requests() {
        let (repo, pool, _temp) = seeded();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO requests (description, requester_id, created)
                 VALUES ('need a ladder', 2, '2024-05-01T09:00:00')",
                [],
            )
            .unwrap();
        let answer = NewItem {
            request_id: Some(RequestId(1)),
            ..new_item("Ladder", "Tall", true)
        };
        let ladder = repo.create(UserId(1), &answer).await.unwrap();
        repo.create(UserId(1), &new_item("Saw", "s", true)).await.unwrap();

        let conn = pool.get().unwrap();
        assert_eq!(items_for_requests(&conn, &[RequestId(1)]).unwrap(), vec![ladder]);
        assert!(items_for_requests(&conn, &[]).unwrap().is_empty());
    }
}
