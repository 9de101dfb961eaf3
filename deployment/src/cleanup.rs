use crate::{
    path::{file_name, join, normalize},
    store::{EntryKind, RemoteEntry, RemoteStore, StoreError, StoreResult},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Support {
    #[default]
    Unknown,
    Supported,
    Unsupported,
}

/// What the current connection turned out to support. Probed lazily, at most
/// once per connection.
#[derive(Debug, Default)]
pub struct StoreCapabilities {
    pub bulk_delete: Support,
    pub typed_listing: Support,
}

fn is_child_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

/// Removes `target` and everything below it. A missing target is a no-op.
pub fn delete_recursive(
    store: &mut dyn RemoteStore,
    capabilities: &mut StoreCapabilities,
    target: &str,
) -> StoreResult<()> {
    let target = normalize(target);
    if target == "/" || target == "." {
        return Err(StoreError::rejected("delete", &target, "refusing to delete a root"));
    }
    if !store.is_directory(&target) {
        debug!("Nothing to delete at {}", target);
        return Ok(());
    }

    if capabilities.bulk_delete != Support::Unsupported {
        match store.delete_tree(&target) {
            Ok(()) => {
                capabilities.bulk_delete = Support::Supported;
                info!("Removed {} with a server-side delete", target);
                return Ok(());
            }
            Err(StoreError::Unsupported) => {
                info!("Server-side recursive delete is unsupported, walking the tree instead");
                capabilities.bulk_delete = Support::Unsupported;
            }
            Err(e) => warn!("Server-side delete of {} failed, walking the tree: {}", target, e),
        }
    }

    remove_tree(store, capabilities, &target)
}

fn list_children(
    store: &mut dyn RemoteStore,
    capabilities: &mut StoreCapabilities,
    directory: &str,
) -> StoreResult<Vec<RemoteEntry>> {
    if capabilities.typed_listing != Support::Unsupported {
        match store.list_entries(directory) {
            Ok(entries) => {
                capabilities.typed_listing = Support::Supported;
                return Ok(entries);
            }
            Err(StoreError::Unsupported) => capabilities.typed_listing = Support::Unsupported,
            Err(e) => warn!("Typed listing of {} failed, listing names: {}", directory, e),
        }
    }

    let mut entries = vec![];
    for name in store.list_names(directory)? {
        let name = file_name(&name).to_owned();
        if !is_child_name(&name) {
            continue;
        }
        let kind = if store.is_directory(&join(directory, &name)) {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(RemoteEntry { name, kind });
    }
    Ok(entries)
}

// Depth first, keeps going past failures and reports the first one.
fn remove_tree(
    store: &mut dyn RemoteStore,
    capabilities: &mut StoreCapabilities,
    directory: &str,
) -> StoreResult<()> {
    let mut first_error = None;

    // Some servers answer a listing of an empty directory with an error, so
    // the removal below is still attempted.
    let children = list_children(store, capabilities, directory).unwrap_or_else(|e| {
        warn!("Could not list {}: {}", directory, e);
        first_error = Some(e);
        vec![]
    });
    let listing_failed = first_error.is_some();

    for entry in children {
        if !is_child_name(&entry.name) {
            continue;
        }
        let child = join(directory, &entry.name);
        let result = match entry.kind {
            EntryKind::Directory => remove_tree(store, capabilities, &child),
            EntryKind::File | EntryKind::Link => store
                .delete_file(&child)
                .inspect(|_| debug!("Removed file {}", child)),
        };
        if let Err(e) = result {
            warn!("Could not remove {}: {}", child, e);
            first_error.get_or_insert(e);
        }
    }

    match store.remove_directory(directory) {
        Ok(()) if listing_failed => {
            debug!("Removed directory {} after a failed listing", directory);
            first_error = None;
        }
        Ok(()) => debug!("Removed directory {}", directory),
        Err(e) => {
            warn!("Could not remove directory {}: {}", directory, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
