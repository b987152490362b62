//! Fragment responses.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::body::Body;
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use sluice_core::{Document, Encoding, Fragment, RangeRequest};
use tracing::debug;

/// Marks a body that carries base64 of the document bytes.
pub const BODY_ENCODING_HEADER: HeaderName = HeaderName::from_static("x-body-encoding");

/// Where a delivered document came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Cache,
    Store,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Store => "store",
        }
    }
}

/// Read the requested range, defaulting to the whole document.
pub fn requested_range(headers: &HeaderMap) -> ApiResult<RangeRequest> {
    let value = headers
        .get(RANGE)
        .map(|v| {
            v.to_str()
                .map_err(|_| ApiError::UnsupportedRange("range header is not ASCII".to_string()))
        })
        .transpose()?;
    Ok(RangeRequest::from_header(value)?)
}

/// Build the fragment of `document` the request asks for and render it.
pub fn serve_fragment(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    document: &Document,
    source: Source,
) -> ApiResult<Response> {
    let range = requested_range(headers)?;
    let fragment = state.fragments.build(document.bytes(), range.start)?;

    debug!(
        path,
        source = source.as_str(),
        range_start = fragment.range_start,
        range_end = fragment.range_end,
        status = fragment.status.as_str(),
        "Serving fragment"
    );
    metrics::record_fragment(
        source.as_str(),
        fragment.status.as_str(),
        fragment.encoding().as_str(),
        fragment.content_length(),
    );

    Ok(fragment_response(fragment, document.content_type()))
}

/// Render a fragment as an HTTP response.
///
/// `content_type` overrides the default type for the body encoding.
pub fn fragment_response(fragment: Fragment, content_type: Option<&str>) -> Response {
    let status = match fragment.status {
        sluice_core::FragmentStatus::Complete => StatusCode::OK,
        sluice_core::FragmentStatus::Partial => StatusCode::PARTIAL_CONTENT,
    };
    let encoding = fragment.encoding();
    let content_type = content_type
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(encoding.content_type()));

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(fragment.content_length()));
    if encoding == Encoding::TransportSafe {
        headers.insert(BODY_ENCODING_HEADER, HeaderValue::from_static("base64"));
    }
    if let Some(range) = fragment.content_range()
        && let Ok(value) = HeaderValue::from_str(&range)
    {
        headers.insert(CONTENT_RANGE, value);
    }

    (status, headers, Body::from(fragment.body.into_string())).into_response()
}
