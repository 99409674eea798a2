pub mod error;
pub mod storage;
pub mod config;
pub mod identity;
pub mod gateway;
pub mod router;
pub mod models;
pub mod cart;
pub mod booking;
pub mod dashboard;
pub mod context;

pub use context::AppContext;
pub use error::{AppError, AppResult};
