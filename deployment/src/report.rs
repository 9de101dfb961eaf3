use std::{fmt::Display, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{path::ContentFolder, switchover::FolderOutcome, ManifestEntry};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FailedFile {
    pub local: PathBuf,
    pub remote: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub error: String,
}

impl FailedFile {
    pub fn new(entry: &ManifestEntry, error: impl Display) -> FailedFile {
        FailedFile {
            local: entry.local.clone(),
            remote: entry.remote.clone(),
            kind: entry.kind.clone(),
            error: error.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderReport {
    pub folder: ContentFolder,
    pub outcome: FolderOutcome,
}

/// Result of one `upload_files` call. Always produced, never an `Err`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_files: usize,
    pub uploaded_files: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FailedFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<FolderReport>,
}

impl UploadReport {
    pub fn failure(error: impl Display, total_files: usize) -> UploadReport {
        UploadReport {
            success: false,
            error: Some(error.to_string()),
            total_files,
            ..Default::default()
        }
    }
}
