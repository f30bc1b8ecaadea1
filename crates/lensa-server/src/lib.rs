//! REST façade for the lensa image services.
//!
//! [`router`] builds the axum application over an [`AppState`] holding the
//! optional NSFW, captioning and ID card services.

pub mod api;

pub use api::error::ApiError;
pub use api::router;
pub use api::state::AppState;
