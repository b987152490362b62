//! Transport encoding of document bytes.
//!
//! A response body must be valid UTF-8 text. Documents that already are valid
//! UTF-8 travel as-is; anything else is carried as standard padded base64,
//! which maps every 3 input bytes onto a group of 4 output characters.

use base64::{Engine as _, engine::general_purpose};
use std::ops::Range;

/// Characters in one base64 group.
pub const BASE64_GROUP_CHARS: usize = 4;

/// Bytes encoded by one base64 group.
pub const BASE64_GROUP_BYTES: usize = 3;

/// How a body is represented on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Raw UTF-8 text.
    Plain,
    /// Base64 of the raw bytes.
    TransportSafe,
}

impl Encoding {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::TransportSafe => "base64",
        }
    }

    /// Default `Content-Type` for a body in this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Plain => "text/plain; charset=utf-8",
            Self::TransportSafe => "application/octet-stream",
        }
    }
}

/// A response body tagged with its transport encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportBody {
    Plain(String),
    TransportSafe(String),
}

impl TransportBody {
    /// Encode bytes as plain text when they are valid UTF-8, base64 otherwise.
    pub fn encode(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::Plain(text.to_owned()),
            Err(_) => Self::encode_transport_safe(bytes),
        }
    }

    /// Encode bytes as base64 regardless of their content.
    ///
    /// Used when a sub-range is re-encoded on its own so that it stays
    /// consistent with the rest of a base64 transfer.
    pub fn encode_transport_safe(bytes: &[u8]) -> Self {
        Self::TransportSafe(general_purpose::STANDARD.encode(bytes))
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Plain(_) => Encoding::Plain,
            Self::TransportSafe(_) => Encoding::TransportSafe,
        }
    }

    pub fn is_transport_safe(&self) -> bool {
        matches!(self, Self::TransportSafe(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(text) | Self::TransportSafe(text) => text,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Plain(text) | Self::TransportSafe(text) => text,
        }
    }

    /// Length of the encoded body in bytes.
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    /// Number of document bytes this body decodes to.
    pub fn decoded_len(&self) -> usize {
        match self {
            Self::Plain(text) => text.len(),
            Self::TransportSafe(encoded) => base64_decoded_len(encoded),
        }
    }

    /// Decode the body back to the document bytes it carries.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self {
            Self::Plain(text) => Ok(text.as_bytes().to_vec()),
            Self::TransportSafe(encoded) => general_purpose::STANDARD.decode(encoded),
        }
    }

    /// Copy out a sub-range of the encoded body, keeping the encoding tag.
    ///
    /// The caller must pass a range on a character boundary for plain bodies.
    pub(crate) fn slice(&self, range: Range<usize>) -> Self {
        match self {
            Self::Plain(text) => Self::Plain(text[range].to_owned()),
            Self::TransportSafe(encoded) => Self::TransportSafe(encoded[range].to_owned()),
        }
    }
}

/// Decoded length of a padded base64 string made of whole groups.
pub fn base64_decoded_len(encoded: &str) -> usize {
    let padding = encoded
        .bytes()
        .rev()
        .take_while(|&b| b == b'=')
        .count()
        .min(2);
    (encoded.len() / BASE64_GROUP_CHARS * BASE64_GROUP_BYTES).saturating_sub(padding)
}

/// Encoded length of `len` bytes in padded base64.
pub fn base64_encoded_len(len: usize) -> usize {
    len.div_ceil(BASE64_GROUP_BYTES) * BASE64_GROUP_CHARS
}
