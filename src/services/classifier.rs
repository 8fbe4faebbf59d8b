//! Decides whether a comment counts as an approval vote.
//!
//! Pure: no shared state is read or written, so callers may classify
//! concurrently without synchronization.

use crate::models::{ApprovalEvent, NoteableType, ObjectKind};

/// Comment text that counts as one approval, compared after upper-casing.
pub const APPROVAL_KEYWORD: &str = "LGTM";

/// Return `true` if `event` is an approval comment on a merge request.
///
/// The comment must equal [`APPROVAL_KEYWORD`] exactly once case-folded;
/// surrounding whitespace or extra punctuation disqualifies it.
pub fn classify(event: &ApprovalEvent) -> bool {
    event.kind == ObjectKind::Note
        && event.target_kind == NoteableType::MergeRequest
        && is_approval_text(&event.comment_text)
}

fn is_approval_text(text: &str) -> bool {
    text.to_uppercase() == APPROVAL_KEYWORD
}
