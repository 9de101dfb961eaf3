use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One file produced by the export step: where it sits below the export root
/// and where it belongs remotely, e.g. `logos/2.png`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManifestEntry {
    pub local: PathBuf,
    pub remote: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ManifestEntry {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> ManifestEntry {
        ManifestEntry {
            local: local.into(),
            remote: remote.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> ManifestEntry {
        self.kind = Some(kind.into());
        self
    }
}
