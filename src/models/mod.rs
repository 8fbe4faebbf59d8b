//! Data models for the service.
//!
//! `note_event` mirrors the JSON GitLab posts to the webhook; `approval_event`
//! is the parsed view the approval workflow works with.

pub mod approval_event;
pub mod note_event;

// Re-exports for convenient access
pub use approval_event::{ApprovalEvent, MergeStatus, NoteableType, ObjectKind};
pub use note_event::{MergeParams, NoteAttributes, NoteEvent, NoteMergeRequest, NoteUser};
