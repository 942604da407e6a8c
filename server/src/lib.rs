//! Job Offers Gateway
//!
//! Thin HTTP layer that validates job offer records and forwards create,
//! read, update, delete and search calls to a full-text document store.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod store;

pub use config::Config;
pub use handlers::AppState;
pub use routes::create_router;
