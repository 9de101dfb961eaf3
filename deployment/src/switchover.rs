use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    cleanup::{self, StoreCapabilities},
    path::{ContentFolder, FolderLayout, Generation},
    report::FolderReport,
    run::DeploymentRun,
    store::RemoteStore,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderOutcome {
    /// Nothing was staged for the folder.
    Skipped,
    Promoted,
    /// Live content could not be moved aside. Live and staging are untouched.
    DemoteFailed,
    /// Staging could not be promoted. The previous live content was restored.
    PromoteFailed,
    /// Staging could not be promoted and the previous live content is only
    /// reachable under the backup name.
    StrandedInBackup,
}

impl FolderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FolderOutcome::Skipped | FolderOutcome::Promoted)
    }
}

impl fmt::Display for FolderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FolderOutcome::Skipped => "skipped",
            FolderOutcome::Promoted => "promoted",
            FolderOutcome::DemoteFailed => "demote failed",
            FolderOutcome::PromoteFailed => "promote failed",
            FolderOutcome::StrandedInBackup => "stranded in backup",
        };
        f.write_str(text)
    }
}

/// Rotates one content folder: live becomes backup, staging becomes live.
pub fn promote_folder(
    store: &mut dyn RemoteStore,
    capabilities: &mut StoreCapabilities,
    layout: &FolderLayout,
    folder: ContentFolder,
) -> FolderOutcome {
    let current = layout.folder_path(folder, Generation::Live);
    let backup = layout.folder_path(folder, Generation::Backup);
    let staging = layout.folder_path(folder, Generation::Staging);

    if !store.is_directory(&staging) {
        debug!("Nothing staged for {}", folder);
        return FolderOutcome::Skipped;
    }

    let current_exists = store.is_directory(&current);
    if current_exists && store.is_directory(&backup) {
        if let Err(e) = cleanup::delete_recursive(store, capabilities, &backup) {
            warn!("Could not remove old backup {}: {}", backup, e);
        }
    }

    if current_exists {
        if let Err(e) = store.rename(&current, &backup) {
            error!("Could not move {} to {}: {}", current, backup, e);
            return FolderOutcome::DemoteFailed;
        }
        debug!("Moved {} to {}", current, backup);
    }

    match store.rename(&staging, &current) {
        Ok(()) => {
            info!("Promoted {} to {}", staging, current);
            FolderOutcome::Promoted
        }
        Err(e) if !current_exists => {
            error!("Could not promote {} to {}: {}", staging, current, e);
            FolderOutcome::PromoteFailed
        }
        Err(e) => {
            error!("Could not promote {} to {}: {}", staging, current, e);
            match store.rename(&backup, &current) {
                Ok(()) => {
                    warn!("Restored {} from {}", current, backup);
                    FolderOutcome::PromoteFailed
                }
                Err(rollback) => {
                    error!(
                        "Live content of {} is only available at {} and needs manual repair: {}",
                        folder, backup, rollback
                    );
                    FolderOutcome::StrandedInBackup
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct SwitchoverReport {
    pub folders: Vec<FolderReport>,
}

impl SwitchoverReport {
    pub fn succeeded(&self) -> bool {
        self.folders.iter().all(|report| report.outcome.is_success())
    }

    pub fn failed_folders(&self) -> Vec<ContentFolder> {
        self.folders
            .iter()
            .filter(|report| !report.outcome.is_success())
            .map(|report| report.folder)
            .collect()
    }
}

/// Promotes every content folder. A failing folder never stops the others.
pub fn switchover(store: &mut dyn RemoteStore, run: &mut DeploymentRun) -> SwitchoverReport {
    let mut report = SwitchoverReport::default();
    for folder in ContentFolder::ALL {
        let outcome = promote_folder(store, &mut run.capabilities, &run.layout, folder);
        report.folders.push(FolderReport { folder, outcome });
    }
    report
}
