use std::fmt;

use uuid::Uuid;

/// The four persisted entity kinds, used to identify records in errors and
/// integrity diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Season,
    Dungeon,
    BossEncounter,
    Ability,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Season => "season",
            Self::Dungeon => "dungeon",
            Self::BossEncounter => "boss_encounter",
            Self::Ability => "ability",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error taxonomy for the content data layer.
#[derive(Debug)]
pub enum CatalogError {
    /// The requested entity does not exist.
    NotFound { kind: EntityKind, id: Uuid },
    /// A stored row failed required-field or enum-domain validation on read.
    /// Aborts only that record's conversion, never a whole listing.
    DataCorruption { detail: String },
    /// Underlying persistence fault (snapshot I/O, serialization).
    Storage(std::io::Error),
    /// An ingestion patch violates a declared invariant; caught before
    /// commit, names the offending field so a content author can fix the
    /// source patch.
    Validation { field: String, message: String },
    /// Reserved for analysis preconditions other than a missing encounter
    /// (which surfaces as NotFound). Normal input variation is never an
    /// error in the analysis path.
    AnalysisPrecondition { reason: String },
}

impl CatalogError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn corruption(detail: impl Into<String>) -> Self {
        Self::DataCorruption { detail: detail.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} '{id}' not found"),
            Self::DataCorruption { detail } => write!(f, "stored record is corrupt: {detail}"),
            Self::Storage(err) => write!(f, "storage fault: {err}"),
            Self::Validation { field, message } => {
                write!(f, "patch validation failed at {field}: {message}")
            }
            Self::AnalysisPrecondition { reason } => {
                write!(f, "analysis precondition not met: {reason}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err)
    }
}
