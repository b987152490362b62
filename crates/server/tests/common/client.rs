//! A client that walks fragment responses back into a whole document.

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tower::ServiceExt;

/// Upper bound on requests per fetch, so a broken server fails the test
/// instead of looping forever.
const MAX_REQUESTS: usize = 10_000;

/// Raw response parts.
#[allow(dead_code)]
pub struct Fetched {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl Fetched {
    /// Body with any transport encoding removed.
    pub fn decoded(&self) -> Vec<u8> {
        match self.headers.get("x-body-encoding") {
            Some(value) if value == "base64" => {
                STANDARD.decode(&self.body).expect("Invalid base64 body")
            }
            _ => self.body.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Body is not JSON")
    }
}

/// Send one request, optionally with a `Range: bytes=<start>-` header.
#[allow(dead_code)]
pub async fn request(
    router: &axum::Router,
    method: Method,
    uri: &str,
    range_start: Option<u64>,
) -> Fetched {
    request_with_range(router, method, uri, range_start.map(|s| format!("bytes={s}-"))).await
}

/// Send one request with a raw `Range` header value.
#[allow(dead_code)]
pub async fn request_with_range(
    router: &axum::Router,
    method: Method,
    uri: &str,
    range: Option<String>,
) -> Fetched {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(range) = range {
        builder = builder.header("Range", range);
    }
    let request = builder.body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    Fetched {
        status,
        headers,
        body,
    }
}

/// Result of walking a document fragment by fragment.
#[allow(dead_code)]
pub struct Walk {
    pub document: Vec<u8>,
    pub responses: Vec<Fetched>,
}

/// Fetch a whole document, following partial responses.
///
/// With `drop_tail` set, the client keeps all but the last byte of every
/// partial fragment and asks for the rest again, so follow-up ranges start
/// at arbitrary offsets.
#[allow(dead_code)]
pub async fn fetch_all(router: &axum::Router, uri: &str, drop_tail: bool) -> Walk {
    let mut document = Vec::new();
    let mut responses = Vec::new();
    let mut next: Option<u64> = None;

    for _ in 0..MAX_REQUESTS {
        let fetched = request(router, Method::GET, uri, next).await;
        let mut bytes = fetched.decoded();

        match fetched.status {
            StatusCode::OK => {
                document.extend_from_slice(&bytes);
                responses.push(fetched);
                return Walk {
                    document,
                    responses,
                };
            }
            StatusCode::PARTIAL_CONTENT => {
                let range = fetched
                    .header("content-range")
                    .expect("Partial response without Content-Range")
                    .to_string();
                let (start, end, _) = parse_content_range(&range);
                assert_eq!(start, next.unwrap_or(0), "fragment starts where asked");
                assert_eq!(end + 1 - start, bytes.len() as u64, "range matches body");

                if drop_tail && bytes.len() > 1 {
                    bytes.pop();
                }
                next = Some(start + bytes.len() as u64);
                document.extend_from_slice(&bytes);
                responses.push(fetched);
            }
            other => panic!("unexpected status {other} while fetching {uri}"),
        }
    }

    panic!("document {uri} did not complete within {MAX_REQUESTS} requests");
}

/// Parse `bytes <start>-<end>/<total>`.
#[allow(dead_code)]
pub fn parse_content_range(value: &str) -> (u64, u64, u64) {
    let rest = value.strip_prefix("bytes ").expect("Content-Range unit");
    let (span, total) = rest.split_once('/').expect("Content-Range total");
    let (start, end) = span.split_once('-').expect("Content-Range span");
    (
        start.parse().unwrap(),
        end.parse().unwrap(),
        total.parse().unwrap(),
    )
}
