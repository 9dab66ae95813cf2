//! Server-side page rendering and the render cache.

pub mod cache;
pub mod page;

pub use cache::{CacheLookup, RenderCache};
