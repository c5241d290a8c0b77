//! Provider routing
//!
//! - `select_provider`: picks the backend for a request from current health
//! - `FallbackOrchestrator`: runs the call and walks alternates on rate limits

mod fallback;
mod selection;

pub use fallback::FallbackOrchestrator;
pub use selection::select_provider;
