//! JSON Patch documents for pod labels.
//!
//! Every tag becomes one `add` operation on `/metadata/labels/<key>`. `add`
//! overwrites an existing key, so the same document serves for insert and
//! update, and labels not named in the patch are left untouched.

use serde::Serialize;

use crate::kubernetes::types::{KubeError, KubeResult, Tag};

/// Content type the API server expects for RFC 6902 patches.
pub const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

const LABELS_PATH: &str = "/metadata/labels/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOperation {
    pub op: &'static str,
    pub path: String,
    pub value: String,
}

/// Build one `add` operation per tag, in the order given.
pub fn label_patch(tags: &[Tag]) -> Vec<PatchOperation> {
    tags.iter()
        .map(|tag| PatchOperation {
            op: "add",
            path: format!("{}{}", LABELS_PATH, tag.key),
            value: tag.value.clone(),
        })
        .collect()
}

/// Serialize the label patch for a request body.
pub fn label_patch_body(tags: &[Tag]) -> KubeResult<Vec<u8>> {
    serde_json::to_vec(&label_patch(tags)).map_err(KubeError::Encode)
}
