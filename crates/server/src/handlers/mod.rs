//! HTTP request handlers.

pub mod documents;
pub mod response;
pub mod store;

pub use documents::*;
pub use response::fragment_response;
