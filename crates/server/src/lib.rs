//! HTTP server for Sluice.
//!
//! Every request path names a document. Documents come from an in-memory
//! archive when one is configured and holds the path, otherwise from the
//! backing object store. Large documents are delivered as a sequence of
//! `206 Partial Content` fragments that the client walks with
//! `Range: bytes=<N>-` requests.

pub mod cache;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use cache::{CacheLookup, ContentCache};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
