//! Size-capped fragments of an encoded document.
//!
//! A document is encoded once (see [`TransportBody::encode`]) and the
//! requested range is mapped onto the encoded body. Each fragment carries at
//! most `effective_limit` encoded bytes; a client keeps requesting
//! `bytes=<range_end>-` until it receives a complete fragment.
//!
//! Base64 bodies are only ever cut on group boundaries. When a client resumes
//! at an offset that does not map onto a group boundary (or onto a character
//! boundary of a plain body) the remaining bytes are re-encoded on their own.

use crate::encoding::{BASE64_GROUP_BYTES, BASE64_GROUP_CHARS, Encoding, TransportBody};
use crate::error::{Error, Result};
use crate::{DEFAULT_MAX_FRAGMENT_BYTES, MIN_FRAGMENT_BYTES};
use tracing::{debug, warn};

/// Whether a fragment finishes the transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentStatus {
    /// The fragment reaches the end of the document.
    Complete,
    /// More fragments follow.
    Partial,
}

impl FragmentStatus {
    /// HTTP status code for this fragment.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Complete => 200,
            Self::Partial => 206,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
        }
    }
}

/// One response worth of a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub body: TransportBody,
    pub status: FragmentStatus,
    /// First document byte carried by this fragment.
    pub range_start: u64,
    /// One past the last document byte carried by this fragment.
    pub range_end: u64,
    /// Length of the whole document.
    pub total_length: u64,
}

impl Fragment {
    pub fn encoding(&self) -> Encoding {
        self.body.encoding()
    }

    pub fn is_complete(&self) -> bool {
        self.status == FragmentStatus::Complete
    }

    /// Length of the encoded body, i.e. the response `Content-Length`.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Number of document bytes carried.
    pub fn decoded_len(&self) -> u64 {
        self.range_end - self.range_start
    }

    /// `Content-Range` value, present only for partial fragments.
    pub fn content_range(&self) -> Option<String> {
        match self.status {
            FragmentStatus::Complete => None,
            FragmentStatus::Partial => Some(format!(
                "bytes {}-{}/{}",
                self.range_start,
                self.range_end.saturating_sub(1),
                self.total_length
            )),
        }
    }
}

/// Builds fragments no larger than a configured size.
#[derive(Clone, Copy, Debug)]
pub struct FragmentBuilder {
    limit: usize,
}

impl Default for FragmentBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAGMENT_BYTES)
    }
}

impl FragmentBuilder {
    /// Create a builder for the given maximum fragment size.
    ///
    /// The limit is rounded down to a whole number of base64 groups and never
    /// drops below a single group.
    pub fn new(max_fragment_bytes: usize) -> Self {
        let limit = (max_fragment_bytes / BASE64_GROUP_CHARS * BASE64_GROUP_CHARS)
            .max(MIN_FRAGMENT_BYTES);
        Self { limit }
    }

    /// Effective number of encoded bytes per fragment.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Build the fragment of `doc` starting at document offset `range_start`.
    pub fn build(&self, doc: &[u8], range_start: u64) -> Result<Fragment> {
        let total_length = doc.len() as u64;
        if range_start > total_length {
            return Err(Error::RangeNotSatisfiable {
                start: range_start,
                length: total_length,
            });
        }
        // range_start <= doc.len(), so the conversion is lossless
        let start = range_start as usize;

        let whole = TransportBody::encode(doc);
        let aligned_start = match &whole {
            TransportBody::Plain(text) if text.is_char_boundary(start) => Some(start),
            TransportBody::TransportSafe(_) if start % BASE64_GROUP_BYTES == 0 => {
                Some(start / BASE64_GROUP_BYTES * BASE64_GROUP_CHARS)
            }
            _ => None,
        };
        let (body, body_start) = match aligned_start {
            Some(body_start) => (whole, body_start),
            None => {
                warn!(
                    range_start,
                    encoding = whole.encoding().as_str(),
                    "Range start is not aligned with the encoded body, re-encoding remainder"
                );
                (TransportBody::encode_transport_safe(&doc[start..]), 0)
            }
        };

        let remaining = body.len() - body_start;
        let body_end = if remaining > self.limit {
            boundary_at_or_before(&body, body_start + self.limit)
        } else {
            body.len()
        };

        let status = if body_end == body.len() {
            FragmentStatus::Complete
        } else {
            FragmentStatus::Partial
        };

        let body = body.slice(body_start..body_end);
        let range_end = range_start + body.decoded_len() as u64;

        debug!(
            range_start,
            range_end,
            total_length,
            encoding = body.encoding().as_str(),
            status = status.as_str(),
            "Built fragment"
        );

        Ok(Fragment {
            body,
            status,
            range_start,
            range_end,
            total_length,
        })
    }
}

/// Largest cut position `<= index` that keeps a plain body valid UTF-8.
///
/// Base64 cut positions are already group aligned because both the start and
/// the limit are multiples of four.
fn boundary_at_or_before(body: &TransportBody, index: usize) -> usize {
    match body {
        TransportBody::Plain(text) => {
            let mut index = index;
            while !text.is_char_boundary(index) {
                index -= 1;
            }
            index
        }
        TransportBody::TransportSafe(_) => index,
    }
}
