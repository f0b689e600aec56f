//! HTTP surface: JSON endpoints, file serving and cookie sessions.

pub mod error;
pub mod pages;
pub mod routes;
pub mod server;
pub mod session;

pub use error::{ApiError, ApiResult};
pub use server::{router, serve, AppState};
