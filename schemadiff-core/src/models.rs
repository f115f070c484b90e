//! Core data models for schema comparison runs.
//!
//! This module defines the closed set of comparable object categories and
//! the order-preserving report produced by one orchestrated run.

use crate::error::SchemaDiffError;
use serde::{Deserialize, Serialize};

/// Category of database objects the comparison engine can diff independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaObjectType {
    /// Schemas (namespaces)
    Schema,
    /// Roles and their attributes
    Role,
    /// Sequences
    Sequence,
    /// Tables
    Table,
    /// Table columns
    Column,
    /// Indexes
    Index,
    /// Views
    View,
    /// Foreign key constraints
    ForeignKey,
    /// Functions and procedures
    Function,
    /// Triggers
    Trigger,
    /// Object ownership
    Owner,
    /// Privileges granted on relations
    GrantRelationship,
    /// Privileges granted on columns
    GrantAttribute,
}

impl SchemaObjectType {
    /// Every object type in canonical report order.
    ///
    /// Structural objects come first, ownership and grant metadata last.
    pub const ALL: &'static [Self] = &[
        Self::Schema,
        Self::Role,
        Self::Sequence,
        Self::Table,
        Self::Column,
        Self::Index,
        Self::View,
        Self::ForeignKey,
        Self::Function,
        Self::Trigger,
        Self::Owner,
        Self::GrantRelationship,
        Self::GrantAttribute,
    ];

    /// Selector token understood by the comparison engine.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "SCHEMA",
            Self::Role => "ROLE",
            Self::Sequence => "SEQUENCE",
            Self::Table => "TABLE",
            Self::Column => "COLUMN",
            Self::Index => "INDEX",
            Self::View => "VIEW",
            Self::ForeignKey => "FOREIGN_KEY",
            Self::Function => "FUNCTION",
            Self::Trigger => "TRIGGER",
            Self::Owner => "OWNER",
            Self::GrantRelationship => "GRANT_RELATIONSHIP",
            Self::GrantAttribute => "GRANT_ATTRIBUTE",
        }
    }
}

impl std::fmt::Display for SchemaObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaObjectType {
    type Err = SchemaDiffError;

    /// Parses an engine token, ignoring case and accepting `-` for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| SchemaDiffError::configuration(format!("Unknown object type: {s}")))
    }
}

/// Diff text produced for one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    /// Object type this diff covers
    pub object_type: SchemaObjectType,
    /// Engine output verbatim; empty when nothing differs
    pub diff: String,
}

impl DiffSegment {
    /// Creates a new segment
    pub fn new(object_type: SchemaObjectType, diff: impl Into<String>) -> Self {
        Self {
            object_type,
            diff: diff.into(),
        }
    }
}

/// Summary of the failure that ended a partial run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Object type being compared when the run stopped
    pub object_type: Option<SchemaObjectType>,
    /// Engine exit status, when the engine reported one
    pub status: Option<i32>,
    /// Human readable failure message
    pub message: String,
    /// Scrubbed engine diagnostics, when available
    pub diagnostics: Option<String>,
}

impl From<&SchemaDiffError> for RunFailure {
    fn from(error: &SchemaDiffError) -> Self {
        Self {
            object_type: error.object_type(),
            status: error.status(),
            message: error.to_string(),
            diagnostics: error.diagnostics().map(str::to_string),
        }
    }
}

/// Order-preserving result of one comparison run.
///
/// A report is built once from the segments collected in requested order and
/// is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    segments: Vec<DiffSegment>,
    text: String,
    failure: Option<RunFailure>,
}

impl DiffReport {
    /// Builds a report for a run where every requested type succeeded.
    pub fn complete(segments: Vec<DiffSegment>) -> Self {
        let text = concatenate(&segments);
        Self {
            segments,
            text,
            failure: None,
        }
    }

    /// Builds a report holding the prefix collected before `failure`.
    pub fn partial(segments: Vec<DiffSegment>, failure: RunFailure) -> Self {
        let text = concatenate(&segments);
        Self {
            segments,
            text,
            failure: Some(failure),
        }
    }

    /// Per-type segments in the order they were requested.
    pub fn segments(&self) -> &[DiffSegment] {
        &self.segments
    }

    /// Concatenated diff text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the report, returning the concatenated diff text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Failure that ended the run early, if any.
    pub const fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    /// Whether every requested object type was compared.
    pub const fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Object types whose diff text was non-empty.
    pub fn changed_types(&self) -> Vec<SchemaObjectType> {
        self.segments
            .iter()
            .filter(|s| !s.diff.is_empty())
            .map(|s| s.object_type)
            .collect()
    }
}

/// Joins per-type diffs with a newline between consecutive segments.
///
/// When no segment carries any text the result is empty rather than a run of
/// bare separators.
pub fn concatenate(segments: &[DiffSegment]) -> String {
    if segments.iter().all(|s| s.diff.is_empty()) {
        return String::new();
    }

    segments
        .iter()
        .map(|s| s.diff.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
