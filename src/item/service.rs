use crate::clock;
use crate::error::AppResult;
use crate::ids::{ItemId, UserId};
use crate::item::comments::DynCommentRepository;
use crate::item::domain::{Comment, Item, ItemPatch, ItemView, NewComment, NewItem};
use crate::item::repository::DynItemRepository;
use crate::pagination::Page;

/// Item registry plus the owner-facing projection and commenting.
pub struct ItemService {
    items: DynItemRepository,
    comments: DynCommentRepository,
}

impl ItemService {
    pub fn new(items: DynItemRepository, comments: DynCommentRepository) -> Self {
        Self { items, comments }
    }

    pub async fn create(&self, owner: UserId, item: NewItem) -> AppResult<Item> {
        let created = self.items.create(owner, &item).await?;
        tracing::info!(item_id = %created.id, owner_id = %owner, "Item published");
        Ok(created)
    }

    pub async fn update(&self, caller: UserId, id: ItemId, patch: ItemPatch) -> AppResult<Item> {
        Ok(self.items.update(caller, id, patch).await?)
    }

    pub async fn delete(&self, caller: UserId, id: ItemId) -> AppResult<()> {
        self.items.delete(caller, id).await?;
        tracing::info!(item_id = %id, "Item deleted");
        Ok(())
    }

    /// Bookings are loaded only when the viewer owns the item.
    pub async fn read(&self, id: ItemId, viewer: UserId) -> AppResult<ItemView> {
        let record = self.items.record(id, viewer).await?;
        Ok(ItemView::from_record(record, viewer, clock::now()))
    }

    pub async fn list_for_owner(&self, owner: UserId, page: Page) -> AppResult<Vec<ItemView>> {
        let records = self.items.owner_records(owner, page).await?;

        let now = clock::now();
        Ok(records
            .into_iter()
            .map(|record| ItemView::from_record(record, owner, now))
            .collect())
    }

    /// Blank text matches nothing and skips the store entirely.
    pub async fn search(&self, text: &str, page: Page) -> AppResult<Vec<Item>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.items.search(text, page).await?)
    }

    /// Only someone who has finished an approved booking of the item may comment.
    pub async fn add_comment(
        &self,
        item: ItemId,
        author: UserId,
        text: String,
    ) -> AppResult<Comment> {
        let comment = self
            .comments
            .create(&NewComment {
                item_id: item,
                author_id: author,
                text,
                created: clock::now(),
            })
            .await?;
        tracing::info!(item_id = %item, author_id = %author, "Comment added");
        Ok(comment)
    }
}
