pub mod comments;
pub mod domain;
pub mod repository;
pub mod service;

pub use comments::{CommentRepository, DynCommentRepository, SqliteCommentRepository};
pub use domain::{
    Comment, Item, ItemError, ItemPatch, ItemRecord, ItemView, NewComment, NewItem,
};
pub use repository::{DynItemRepository, ItemRepository, SqliteItemRepository};
pub use service::ItemService;
