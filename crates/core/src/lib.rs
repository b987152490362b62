//! Core delivery engine for the Sluice document server.
//!
//! This crate defines the pieces that decide what goes into a single response:
//! - Range header parsing for open-ended byte ranges
//! - Transport encoding of document bytes (plain text or base64)
//! - Fragment building under a response size ceiling
//! - In-memory archives with ancestor-path lookup
//! - Configuration types shared across crates

pub mod archive;
pub mod config;
pub mod document;
pub mod encoding;
pub mod error;
pub mod fragment;
pub mod range;

pub use archive::{Archive, ArchiveFormat, ArchiveMatch};
pub use document::Document;
pub use encoding::{Encoding, TransportBody};
pub use error::{Error, Result};
pub use fragment::{Fragment, FragmentBuilder, FragmentStatus};
pub use range::RangeRequest;

/// Hard response size ceiling imposed by the hosting platform: 6 MB
pub const PLATFORM_RESPONSE_CEILING: usize = 6_000_000;

/// Default maximum fragment size, kept below the platform ceiling: 5 MB
pub const DEFAULT_MAX_FRAGMENT_BYTES: usize = 5_000_000;

/// Smallest usable fragment: one base64 group.
pub const MIN_FRAGMENT_BYTES: usize = 4;
