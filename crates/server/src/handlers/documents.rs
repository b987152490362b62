//! Document dispatcher.
//!
//! GET and POST requests are answered from the archive when it holds the
//! path and handed to the store delegate otherwise. Any other method goes
//! straight to the delegate, which refuses it.

use crate::cache::CacheLookup;
use crate::error::{ApiError, ApiResult};
use crate::handlers::response::{Source, serve_fragment};
use crate::handlers::store;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// Decode the request path into the document name it refers to.
///
/// An empty path is the root. Paths that do not decode to UTF-8 name no
/// document.
pub fn document_path(uri: &Uri) -> Option<Cow<'_, str>> {
    let raw = match uri.path() {
        "" => "/",
        path => path,
    };
    percent_decode_str(raw).decode_utf8().ok()
}

/// Fallback handler serving every document path.
pub async fn serve_document(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let Some(path) = document_path(&uri) else {
        return Err(ApiError::document_not_found(uri.path(), &method));
    };
    let path = path.as_ref();

    if method != Method::GET && method != Method::POST {
        return store::deliver(&state, &method, path, &headers).await;
    }

    // The archive object itself is never served
    if state.cache.is_backing_object(path) {
        return Err(ApiError::document_not_found(path, &method));
    }

    match state.cache.lookup(path).await? {
        CacheLookup::Hit(document) => {
            serve_fragment(&state, path, &headers, &document, Source::Cache)
        }
        CacheLookup::Delegate => store::deliver(&state, &method, path, &headers).await,
    }
}
