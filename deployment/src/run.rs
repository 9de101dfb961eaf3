use crate::{cleanup::StoreCapabilities, path::FolderLayout, provision::ConfirmedDirectories};

/// State owned by a single `upload_files` call and dropped with it.
pub struct DeploymentRun {
    pub layout: FolderLayout,
    pub directories: ConfirmedDirectories,
    pub capabilities: StoreCapabilities,
}

impl DeploymentRun {
    pub fn new(layout: FolderLayout) -> DeploymentRun {
        DeploymentRun {
            layout,
            directories: ConfirmedDirectories::default(),
            capabilities: StoreCapabilities::default(),
        }
    }
}
