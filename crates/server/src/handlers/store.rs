//! Store delegate: serves documents straight from the backing store.

use crate::error::{ApiError, ApiResult};
use crate::handlers::response::{Source, serve_fragment};
use crate::state::AppState;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use sluice_core::Document;
use tracing::debug;

/// Store keys tried for a request path, in order.
///
/// The path itself comes first (without its leading `/`), then the default
/// document under it when one is configured.
pub fn candidate_keys(path: &str, default_document: Option<&str>) -> Vec<String> {
    let key = path.trim_start_matches('/');
    let mut keys = Vec::with_capacity(2);
    if !key.is_empty() {
        keys.push(key.to_string());
    }
    if let Some(default_document) = default_document {
        let dir = key.trim_end_matches('/');
        if dir.is_empty() {
            keys.push(default_document.to_string());
        } else {
            keys.push(format!("{dir}/{default_document}"));
        }
    }
    keys
}

/// Serve `path` from the backing store.
pub async fn deliver(
    state: &AppState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    if *method != Method::GET {
        return Err(ApiError::method_not_supported(path, method));
    }

    let default_document = state.config.content.default_document.as_deref();
    for key in candidate_keys(path, default_document) {
        if state.cache.is_backing_object(&key) {
            continue;
        }

        match state.storage.get(&key).await {
            Ok(object) => {
                let document =
                    Document::new(object.data).with_content_type(object.content_type);
                return serve_fragment(state, path, headers, &document, Source::Store);
            }
            Err(e) if e.is_unavailable() => {
                debug!(path, key = %key, error = %e, "Store lookup missed");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::document_not_found(path, method))
}
