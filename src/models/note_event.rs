//! GitLab "Note Hook" payload.
//!
//! Only the fields this service reads. Everything else in the payload is
//! skipped unparsed. Every field defaults, and `null` reads as the default,
//! so partially-populated payloads still parse and are simply ignored by the
//! classifier.

use serde::{Deserialize, Deserializer};

/// Comment event delivered by a GitLab webhook.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteEvent {
    /// Event category, `note` for comment events.
    #[serde(deserialize_with = "null_as_default")]
    pub object_kind: String,

    /// Comment author, for log context.
    #[serde(deserialize_with = "null_as_default")]
    pub user: NoteUser,

    /// Owning project ID.
    #[serde(deserialize_with = "null_as_default")]
    pub project_id: i64,

    /// The comment itself.
    #[serde(deserialize_with = "null_as_default")]
    pub object_attributes: NoteAttributes,

    /// Merge request the comment is attached to (absent for other noteables).
    #[serde(deserialize_with = "null_as_default")]
    pub merge_request: NoteMergeRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteUser {
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
}

/// Note attributes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteAttributes {
    /// Comment text.
    #[serde(deserialize_with = "null_as_default")]
    pub note: String,

    /// Type the note is attached to: `MergeRequest`, `Issue`, `Commit`, `Snippet`.
    #[serde(deserialize_with = "null_as_default")]
    pub noteable_type: String,
}

/// Merge request snapshot taken when the comment was posted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteMergeRequest {
    /// GitLab MR ID (global).
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,

    /// `can_be_merged`, `cannot_be_merged`, `unchecked`, ...
    #[serde(deserialize_with = "null_as_default")]
    pub merge_status: String,

    #[serde(deserialize_with = "null_as_default")]
    pub merge_params: MergeParams,
}

/// Merge parameters chosen by the MR author.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeParams {
    #[serde(deserialize_with = "null_as_default")]
    pub force_remove_source_branch: bool,
}

/// Read `null` as the type's default instead of failing.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on_merge_request() {
        let json = r#"{
            "object_kind": "note",
            "user": { "name": "Ada", "username": "ada", "avatar_url": "https://x/a.png" },
            "project_id": 5,
            "project": { "name": "api", "path_with_namespace": "team/api" },
            "object_attributes": {
                "id": 1244,
                "note": "LGTM",
                "noteable_type": "MergeRequest",
                "author_id": 1,
                "system": false,
                "st_diff": null
            },
            "merge_request": {
                "id": 7,
                "iid": 1,
                "target_branch": "master",
                "source_branch": "ms-viewport",
                "state": "opened",
                "merge_status": "can_be_merged",
                "merge_params": { "force_remove_source_branch": true },
                "last_commit": { "id": "da1560886d4f094c3e6c9ef40349f7d38b5d27d7" }
            }
        }"#;

        let event: NoteEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.object_kind, "note");
        assert_eq!(event.project_id, 5);
        assert_eq!(event.user.username, "ada");
        assert_eq!(event.object_attributes.noteable_type, "MergeRequest");
        assert_eq!(event.merge_request.id, 7);
        assert_eq!(event.merge_request.merge_status, "can_be_merged");
        assert!(event.merge_request.merge_params.force_remove_source_branch);
    }

    #[test]
    fn test_partial_payload_uses_defaults() {
        let event: NoteEvent = serde_json::from_str(r#"{"object_kind": "issue"}"#).unwrap();
        assert_eq!(event.object_kind, "issue");
        assert_eq!(event.merge_request.id, 0);
        assert!(event.object_attributes.note.is_empty());
        assert!(!event.merge_request.merge_params.force_remove_source_branch);
    }

    #[test]
    fn test_nulls_read_as_defaults() {
        let json = r#"{
            "object_kind": "note",
            "user": null,
            "project_id": 5,
            "project": null,
            "object_attributes": {
                "note": "LGTM",
                "noteable_type": "MergeRequest",
                "url": null,
                "system": null
            },
            "merge_request": {
                "id": 7,
                "title": null,
                "state": null,
                "merge_status": "can_be_merged",
                "merge_params": { "force_remove_source_branch": null }
            }
        }"#;

        let event: NoteEvent = serde_json::from_str(json).unwrap();
        assert!(event.user.username.is_empty());
        assert_eq!(event.object_attributes.note, "LGTM");
        assert_eq!(event.merge_request.id, 7);
        assert!(!event.merge_request.merge_params.force_remove_source_branch);
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let result = serde_json::from_str::<NoteEvent>(r#"{"project_id": "five"}"#);
        assert!(result.is_err());
    }
}
