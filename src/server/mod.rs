//! HTTP surface — router, handlers, response shaping.
//!
//! The router holds no business rules: it extracts the session cookie,
//! delegates to the sequencer/catalog/cache, and translates their results
//! into redirects, HTML, and JSON.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{AppState, app_router};
