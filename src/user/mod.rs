pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{NewUser, User, UserError, UserPatch};
pub use repository::{DynUserRepository, SqliteUserRepository, UserRepository};
pub use service::UserService;
