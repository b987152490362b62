//! In-memory document archives.
//!
//! An archive is loaded once from a byte stream and never changes afterwards.
//! Lookups try the requested path verbatim, then (when subpath search is on)
//! repeatedly strip the leading path segment until an entry matches. That lets
//! `/any/prefix/docs/index.html` resolve to the archive entry
//! `docs/index.html`.

use crate::document::Document;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;

/// Archive container formats understood by [`Archive::load`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from an object name suffix.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.to_ascii_lowercase().ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(Error::UnsupportedArchiveFormat(name.to_string()))
        }
    }
}

/// Result of resolving a path against an archive.
#[derive(Clone, Debug)]
pub struct ArchiveMatch {
    /// Archive entry that matched.
    pub entry_name: String,
    pub document: Document,
    /// True when leading path segments had to be dropped to find the entry.
    pub via_fallback: bool,
}

/// Immutable name-to-document mapping loaded from an archive.
#[derive(Debug)]
pub struct Archive {
    name: String,
    format: ArchiveFormat,
    names: Vec<String>,
    entries: HashMap<String, Bytes>,
    search_subpaths: bool,
}

impl Archive {
    /// Load an archive named `name` from its raw bytes.
    ///
    /// Directory entries are skipped. When an entry name appears more than
    /// once the first occurrence wins.
    pub fn load(name: &str, data: Bytes) -> Result<Self> {
        let format = ArchiveFormat::from_name(name)?;
        let corrupt = |reason: String| Error::CorruptArchive {
            name: name.to_string(),
            reason,
        };

        let archive_len = data.len();
        let mut zip = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| corrupt(e.to_string()))?;

        let mut names = Vec::with_capacity(zip.len());
        let mut entries = HashMap::with_capacity(zip.len());
        for index in 0..zip.len() {
            let mut file = zip.by_index(index).map_err(|e| corrupt(e.to_string()))?;
            if file.is_dir() {
                continue;
            }

            let entry_name = file.name().to_string();
            if entries.contains_key(&entry_name) {
                debug!(archive = name, entry = %entry_name, "Skipping duplicate archive entry");
                continue;
            }

            let mut content = Vec::with_capacity(entry_capacity(file.size(), archive_len));
            file.read_to_end(&mut content)
                .map_err(|e| corrupt(format!("{entry_name}: {e}")))?;

            names.push(entry_name.clone());
            entries.insert(entry_name, Bytes::from(content));
        }

        debug!(archive = name, entries = names.len(), "Loaded archive");

        Ok(Self {
            name: name.to_string(),
            format,
            names,
            entries,
            search_subpaths: true,
        })
    }

    /// Enable or disable leading-segment fallback in [`Archive::search`].
    pub fn with_subpath_search(mut self, enabled: bool) -> Self {
        self.search_subpaths = enabled;
        self
    }

    /// Object name the archive was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Entry names in archive order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Exact entry lookup.
    pub fn open(&self, entry_name: &str) -> Option<Document> {
        self.entries
            .get(entry_name)
            .map(|bytes| Document::new(bytes.clone()))
    }

    /// Resolve a requested path, reporting which entry matched.
    pub fn resolve(&self, requested_path: &str) -> Option<ArchiveMatch> {
        if let Some(document) = self.open(requested_path) {
            return Some(ArchiveMatch {
                entry_name: requested_path.to_string(),
                document,
                via_fallback: false,
            });
        }

        let segments: Vec<&str> = requested_path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();

        // Without subpath search only the normalized full path is tried
        let skips = if self.search_subpaths {
            segments.len()
        } else {
            segments.len().min(1)
        };

        (0..skips).find_map(|skip| {
            let candidate = segments[skip..].join("/");
            self.open(&candidate).map(|document| ArchiveMatch {
                entry_name: candidate,
                document,
                via_fallback: skip > 0,
            })
        })
    }

    /// Find the document for a requested path.
    pub fn search(&self, requested_path: &str) -> Option<Document> {
        self.resolve(requested_path).map(|found| found.document)
    }
}

/// Initial buffer size for an entry declaring `declared` uncompressed bytes.
///
/// The declared size comes from the archive header and is not trusted past
/// the size of the archive itself; larger entries grow while reading.
fn entry_capacity(declared: u64, archive_len: usize) -> usize {
    usize::try_from(declared).map_or(archive_len, |declared| declared.min(archive_len))
}
