pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{ItemRequest, NewRequest, RequestError, RequestView};
pub use repository::{DynRequestRepository, RequestRepository, SqliteRequestRepository};
pub use service::RequestService;
