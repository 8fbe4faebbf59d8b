//! Approval event model.
//!
//! The slice of a [`NoteEvent`] the approval workflow acts on, with the
//! string fields parsed into enums.

use crate::models::note_event::NoteEvent;

/// Webhook event category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Note,
    Other(String),
}

impl From<&str> for ObjectKind {
    fn from(s: &str) -> Self {
        match s {
            "note" => Self::Note,
            other => Self::Other(other.to_string()),
        }
    }
}

/// What a comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteableType {
    MergeRequest,
    Other(String),
}

impl From<&str> for NoteableType {
    fn from(s: &str) -> Self {
        match s {
            "MergeRequest" => Self::MergeRequest,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Mergeability reported by GitLab when the comment was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatus {
    CanBeMerged,
    CannotBeMerged,
    Unchecked,
    Other(String),
}

impl From<&str> for MergeStatus {
    fn from(s: &str) -> Self {
        match s {
            "can_be_merged" => Self::CanBeMerged,
            "cannot_be_merged" => Self::CannotBeMerged,
            "unchecked" => Self::Unchecked,
            other => Self::Other(other.to_string()),
        }
    }
}

impl MergeStatus {
    /// Whether GitLab reported no blocking conflicts.
    pub fn is_mergeable(&self) -> bool {
        *self == Self::CanBeMerged
    }
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CanBeMerged => write!(f, "can_be_merged"),
            Self::CannotBeMerged => write!(f, "cannot_be_merged"),
            Self::Unchecked => write!(f, "unchecked"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A single inbound comment, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEvent {
    pub kind: ObjectKind,
    pub target_kind: NoteableType,
    pub comment_text: String,

    /// GitLab MR ID (global), the key approvals are counted under.
    pub target_id: i64,

    pub project_id: i64,
    pub mergeability: MergeStatus,
    pub remove_source_branch_on_merge: bool,

    /// Comment author, for log context only.
    pub author: String,
}

impl From<&NoteEvent> for ApprovalEvent {
    fn from(event: &NoteEvent) -> Self {
        Self {
            kind: ObjectKind::from(event.object_kind.as_str()),
            target_kind: NoteableType::from(event.object_attributes.noteable_type.as_str()),
            comment_text: event.object_attributes.note.clone(),
            target_id: event.merge_request.id,
            project_id: event.project_id,
            mergeability: MergeStatus::from(event.merge_request.merge_status.as_str()),
            remove_source_branch_on_merge: event
                .merge_request
                .merge_params
                .force_remove_source_branch,
            author: event.user.username.clone(),
        }
    }
}
