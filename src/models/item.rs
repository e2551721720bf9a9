//! Retrievable content items and source collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a retrievable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The three source collections the engine retrieves from.
///
/// The variant order encodes the merge priority: personal notes rank
/// above uploaded documents, which rank above the reference corpus.
/// This ordering is fixed and independent of similarity scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// The user's personal notes.
    Notes,
    /// Chunks of the user's uploaded documents.
    Documents,
    /// The curated reference corpus (clinical protocols, guidelines).
    Reference,
}

impl SourceType {
    /// All sources in merge-priority order, highest first.
    pub const PRIORITY_ORDER: [Self; 3] = [Self::Notes, Self::Documents, Self::Reference];

    /// Returns the source as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Documents => "documents",
            Self::Reference => "reference",
        }
    }

    /// Merge priority of this source; lower values merge first.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Notes => 0,
            Self::Documents => 1,
            Self::Reference => 2,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A personal note with organizational metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier.
    pub id: ItemId,
    /// Note title.
    pub title: String,
    /// Note body.
    pub content: String,
    /// User-assigned tags.
    pub tags: Vec<String>,
    /// Whether the user pinned this note as a favorite.
    pub is_favorite: bool,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

/// One indexed chunk of an uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique identifier.
    pub id: ItemId,
    /// Original filename of the uploaded document.
    pub filename: String,
    /// Chunk text (or preview when the full chunk is not stored).
    pub content: String,
    /// Upload timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

/// A document from the curated reference corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDoc {
    /// Unique identifier.
    pub id: ItemId,
    /// Publishing organization (e.g. a ministry protocol or a medical society).
    pub source: String,
    /// Document title.
    pub title: String,
    /// Medical specialty the document covers.
    pub specialty: Option<String>,
    /// Curation priority rank; 1 is the highest.
    pub priority: u32,
    /// Content preview used for retrieval.
    pub content: String,
}

/// A unit of content indexed for search.
///
/// Tagged union over the three source collections so merging and
/// scoring code never needs per-source type inspection; the shared
/// accessors cover everything the pipeline reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievedItem {
    /// A personal note.
    Note(Note),
    /// An uploaded document chunk.
    Document(DocumentChunk),
    /// A reference corpus document.
    Reference(ReferenceDoc),
}

impl RetrievedItem {
    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> &ItemId {
        match self {
            Self::Note(n) => &n.id,
            Self::Document(d) => &d.id,
            Self::Reference(r) => &r.id,
        }
    }

    /// Returns the retrievable text of the item.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Note(n) => &n.content,
            Self::Document(d) => &d.content,
            Self::Reference(r) => &r.content,
        }
    }

    /// Returns a display title for the item.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Note(n) => &n.title,
            Self::Document(d) => &d.filename,
            Self::Reference(r) => &r.title,
        }
    }

    /// Returns which source collection the item belongs to.
    #[must_use]
    pub const fn source_type(&self) -> SourceType {
        match self {
            Self::Note(_) => SourceType::Notes,
            Self::Document(_) => SourceType::Documents,
            Self::Reference(_) => SourceType::Reference,
        }
    }

    /// Returns the creation timestamp, when known.
    ///
    /// Reference documents carry no creation date; recency scoring
    /// treats unknown ages as one year old.
    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Note(n) => n.created_at,
            Self::Document(d) => d.created_at,
            Self::Reference(_) => None,
        }
    }

    /// Whether the item is flagged favorite/pinned.
    #[must_use]
    pub const fn is_favorite(&self) -> bool {
        match self {
            Self::Note(n) => n.is_favorite,
            Self::Document(_) | Self::Reference(_) => false,
        }
    }

    /// Whether the item carries at least one tag.
    #[must_use]
    pub const fn has_tags(&self) -> bool {
        match self {
            Self::Note(n) => !n.tags.is_empty(),
            Self::Document(_) | Self::Reference(_) => false,
        }
    }

    /// Returns the reference-corpus priority rank, if this is a
    /// reference document.
    #[must_use]
    pub const fn priority_rank(&self) -> Option<u32> {
        match self {
            Self::Reference(r) => Some(r.priority),
            Self::Note(_) | Self::Document(_) => None,
        }
    }
}
