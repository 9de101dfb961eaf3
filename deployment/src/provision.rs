use std::{
    collections::{BTreeSet, HashSet},
    fmt,
};

use crate::{
    path::{ancestors, depth, normalize},
    store::RemoteStore,
};

/// Remote directories known to exist during one deployment run.
#[derive(Debug, Default)]
pub struct ConfirmedDirectories {
    paths: HashSet<String>,
}

impl ConfirmedDirectories {
    pub fn contains(&self, directory: &str) -> bool {
        self.paths.contains(directory)
    }

    fn confirm(&mut self, directory: String) {
        self.paths.insert(directory);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    DirectoryUnavailable(String),
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::DirectoryUnavailable(directory) => {
                write!(f, "Directory unavailable: {}", directory)
            }
        }
    }
}

impl std::error::Error for ProvisionError {}

/// Makes sure `directory` and all of its ancestors exist.
///
/// Each prefix costs at most one `mkdir` and one probe per run, no matter how
/// many files share it.
pub fn ensure_directory(
    store: &mut dyn RemoteStore,
    confirmed: &mut ConfirmedDirectories,
    directory: &str,
) -> Result<(), ProvisionError> {
    let directory = normalize(directory);
    if confirmed.contains(&directory) {
        return Ok(());
    }

    for prefix in ancestors(&directory) {
        if confirmed.contains(&prefix) {
            continue;
        }
        match store.make_directory(&prefix) {
            Ok(()) => info!("Created directory {}", prefix),
            Err(e) => {
                if !store.is_directory(&prefix) {
                    error!("Directory {} is unavailable: {}", prefix, e);
                    return Err(ProvisionError::DirectoryUnavailable(prefix));
                }
                debug!("Directory {} already exists", prefix);
            }
        }
        confirmed.confirm(prefix);
    }
    Ok(())
}

/// Provisions a batch of directories shallowest first, stopping at the first
/// one that cannot be created or confirmed.
pub fn ensure_directories_once<I, S>(
    store: &mut dyn RemoteStore,
    confirmed: &mut ConfirmedDirectories,
    directories: I,
) -> Result<(), ProvisionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = directories
        .into_iter()
        .map(|directory| normalize(directory.as_ref()))
        .collect();
    let mut ordered: Vec<String> = unique.into_iter().collect();
    ordered.sort_by_key(|directory| depth(directory));

    for directory in ordered {
        ensure_directory(store, confirmed, &directory)?;
    }
    Ok(())
}
