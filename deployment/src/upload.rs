use std::{
    collections::BTreeSet,
    path::{Component, Path, PathBuf},
};

use crate::{
    path::{self, ContentFolder, StagedPath},
    provision::{self, ProvisionError},
    report::FailedFile,
    run::DeploymentRun,
    store::RemoteStore,
    ManifestEntry,
};

const LOCAL_FILE_MISSING: &str = "Local file missing";
const LOCAL_PATH_ESCAPES: &str = "Local path escapes the export root";

#[derive(Debug, Default)]
pub struct StagingOutcome {
    pub uploaded: usize,
    pub failed: Vec<FailedFile>,
    /// Content folders that received at least one file.
    pub folders: BTreeSet<ContentFolder>,
}

impl StagingOutcome {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

fn stays_below_root(local: &Path) -> bool {
    local
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Copies every manifest entry into the staging root of its content folder.
///
/// Per-file problems are collected and never stop the batch. Only a directory
/// that can be neither created nor confirmed aborts the phase.
pub fn stage_files(
    store: &mut dyn RemoteStore,
    run: &mut DeploymentRun,
    local_base_path: &Path,
    manifest: &[ManifestEntry],
) -> Result<StagingOutcome, ProvisionError> {
    let mut outcome = StagingOutcome::default();
    let mut planned: Vec<(&ManifestEntry, PathBuf, StagedPath)> = Vec::with_capacity(manifest.len());

    for entry in manifest {
        let staged = match run.layout.staging_path(&entry.remote) {
            Ok(staged) => staged,
            Err(e) => {
                warn!("Cannot route {}: {}", entry.remote, e);
                outcome.failed.push(FailedFile::new(entry, e));
                continue;
            }
        };
        if !stays_below_root(&entry.local) {
            warn!("Refusing local path {}", entry.local.display());
            outcome.failed.push(FailedFile::new(entry, LOCAL_PATH_ESCAPES));
            continue;
        }
        let local = local_base_path.join(&entry.local);
        if !local.is_file() {
            warn!("Local file {} does not exist", local.display());
            outcome.failed.push(FailedFile::new(entry, LOCAL_FILE_MISSING));
            continue;
        }
        planned.push((entry, local, staged));
    }

    let parents = planned
        .iter()
        .filter_map(|(_, _, staged)| path::parent(&staged.path));
    provision::ensure_directories_once(store, &mut run.directories, parents)?;

    let total = planned.len();
    for (entry, local, staged) in planned {
        match store.put(&local, &staged.path) {
            Ok(size) => {
                outcome.uploaded += 1;
                outcome.folders.insert(staged.folder);
                info!(
                    "Upload progress: {}/{} - {} ({} bytes)",
                    outcome.uploaded, total, staged.path, size
                );
            }
            Err(e) => {
                error!("Failed to upload {}: {}", staged.path, e);
                outcome
                    .failed
                    .push(FailedFile::new(entry, format!("Transfer failed: {}", e)));
            }
        }
    }

    Ok(outcome)
}
