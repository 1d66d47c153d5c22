// Library exports for shareit
// Integration tests build both routers through these modules

pub mod booking;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod ids;
pub mod item;
pub mod pagination;
pub mod request;
pub mod routes;
pub mod state;
pub mod user;
pub mod validation;
