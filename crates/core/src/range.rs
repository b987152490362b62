//! `Range` request header parsing.
//!
//! Only the open-ended form `bytes=<start>-` is accepted. Clients resume a
//! fragmented transfer by asking for everything from the first byte they have
//! not yet received, so an explicit end offset is never needed.

use crate::error::{Error, Result};
use std::str::FromStr;

/// Unit prefix every supported range expression starts with.
pub const RANGE_UNIT_PREFIX: &str = "bytes=";

/// Range assumed when a request carries no `Range` header.
pub const DEFAULT_RANGE_SPEC: &str = "bytes=0-";

/// A parsed open-ended byte range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RangeRequest {
    /// First requested byte offset of the document.
    pub start: u64,
}

impl RangeRequest {
    /// Create a range starting at `start`.
    pub fn from_start(start: u64) -> Self {
        Self { start }
    }

    /// Parse a range expression of the form `bytes=<start>-`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let ranges = spec.strip_prefix(RANGE_UNIT_PREFIX).ok_or_else(|| {
            Error::UnsupportedRange(format!("missing '{RANGE_UNIT_PREFIX}' prefix: {spec}"))
        })?;

        if ranges.contains(',') {
            return Err(Error::UnsupportedRange(format!(
                "multiple ranges not supported: {spec}"
            )));
        }

        let (start, end) = match ranges.split_once('-') {
            Some((start, end)) if !end.contains('-') => (start.trim(), end.trim()),
            _ => {
                return Err(Error::UnsupportedRange(format!(
                    "malformed range: {spec}"
                )));
            }
        };

        if !end.is_empty() {
            return Err(Error::UnsupportedRange(format!(
                "ranges with a defined end not supported: {spec}"
            )));
        }

        if start.is_empty() {
            return Err(Error::UnsupportedRange(format!(
                "suffix ranges not supported: {spec}"
            )));
        }

        let start = start
            .parse::<u64>()
            .map_err(|_| Error::UnsupportedRange(format!("invalid range start: {spec}")))?;

        Ok(Self { start })
    }

    /// Parse an optional header value, treating absence as `bytes=0-`.
    pub fn from_header(value: Option<&str>) -> Result<Self> {
        match value {
            Some(spec) => Self::parse(spec),
            None => Ok(Self::default()),
        }
    }
}

impl FromStr for RangeRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
