//! In-memory `RemoteStore` with failure injection, shared between the
//! scenario tests of every protocol stage.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{Connector, EntryKind, RemoteEntry, RemoteStore, StoreError, StoreResult};
use crate::{
    config::DeploymentTarget,
    path::{self, normalize},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Directory,
    File(Vec<u8>),
}

pub struct MemoryTree {
    nodes: BTreeMap<String, Node>,
    pub bulk_delete: bool,
    pub typed_listing: bool,
    pub failing_renames: HashSet<String>,
    pub failing_mkdirs: HashSet<String>,
    pub failing_puts: HashSet<String>,
    calls: HashMap<&'static str, usize>,
}

impl MemoryTree {
    fn children(&self, dir: &str) -> Vec<(String, Node)> {
        self.nodes
            .iter()
            .filter(|(key, _)| key.as_str() != "/" && path::parent(key).as_deref() == Some(dir))
            .map(|(key, node)| (key.clone(), node.clone()))
            .collect()
    }

    fn subtree_keys(&self, root: &str) -> Vec<String> {
        let prefix = format!("{}/", root.trim_end_matches('/'));
        self.nodes
            .keys()
            .filter(|key| key.as_str() == root || key.starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn is_directory(&self, path: &str) -> bool {
        matches!(self.nodes.get(path), Some(Node::Directory))
    }

    fn count(&mut self, operation: &'static str) {
        *self.calls.entry(operation).or_default() += 1;
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    tree: Arc<Mutex<MemoryTree>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_owned(), Node::Directory);
        MemoryStore {
            tree: Arc::new(Mutex::new(MemoryTree {
                nodes,
                bulk_delete: false,
                typed_listing: true,
                failing_renames: HashSet::new(),
                failing_mkdirs: HashSet::new(),
                failing_puts: HashSet::new(),
                calls: HashMap::new(),
            })),
        }
    }

    pub fn tree(&self) -> MutexGuard<'_, MemoryTree> {
        self.tree.lock().unwrap()
    }

    pub fn seed_file(&self, file: &str, contents: &[u8]) {
        let file = normalize(file);
        let mut tree = self.tree();
        if let Some(parent) = path::parent(&file) {
            for dir in path::ancestors(&parent) {
                tree.nodes.insert(dir, Node::Directory);
            }
        }
        tree.nodes.insert(file, Node::File(contents.to_vec()));
    }

    pub fn seed_directory(&self, dir: &str) {
        let mut tree = self.tree();
        for dir in path::ancestors(dir) {
            tree.nodes.insert(dir, Node::Directory);
        }
    }

    pub fn file(&self, file: &str) -> Option<Vec<u8>> {
        match self.tree().nodes.get(&normalize(file)) {
            Some(Node::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.tree().nodes.contains_key(&normalize(path))
    }

    /// Every node at or below `root`, keyed by absolute path.
    pub fn snapshot(&self, root: &str) -> BTreeMap<String, Node> {
        let tree = self.tree();
        tree.subtree_keys(&normalize(root))
            .into_iter()
            .filter_map(|key| tree.nodes.get(&key).map(|node| (key, node.clone())))
            .collect()
    }

    /// Names of the direct children of `dir`, sorted.
    pub fn names_in(&self, dir: &str) -> Vec<String> {
        self.tree()
            .children(&normalize(dir))
            .into_iter()
            .map(|(key, _)| path::file_name(&key).to_owned())
            .collect()
    }

    pub fn calls(&self, operation: &'static str) -> usize {
        self.tree().calls.get(operation).copied().unwrap_or(0)
    }
}

impl RemoteStore for MemoryStore {
    fn make_directory(&mut self, dir: &str) -> StoreResult<()> {
        let mut tree = self.tree();
        tree.count("mkdir");
        let dir = normalize(dir);
        if tree.failing_mkdirs.contains(&dir) {
            return Err(StoreError::rejected("MKD", &dir, "permission denied"));
        }
        if tree.nodes.contains_key(&dir) {
            return Err(StoreError::rejected("MKD", &dir, "already exists"));
        }
        match path::parent(&dir) {
            Some(parent) if tree.is_directory(&parent) => {
                tree.nodes.insert(dir, Node::Directory);
                Ok(())
            }
            _ => Err(StoreError::rejected("MKD", &dir, "no such parent")),
        }
    }

    fn is_directory(&mut self, dir: &str) -> bool {
        let mut tree = self.tree();
        tree.count("probe");
        tree.is_directory(&normalize(dir))
    }

    fn put(&mut self, local: &Path, remote: &str) -> StoreResult<u64> {
        let mut tree = self.tree();
        tree.count("put");
        let remote = normalize(remote);
        if tree.failing_puts.contains(&remote) {
            return Err(StoreError::rejected("STOR", &remote, "transfer aborted"));
        }
        let parent_exists = path::parent(&remote)
            .map(|parent| tree.is_directory(&parent))
            .unwrap_or(false);
        if !parent_exists || tree.is_directory(&remote) {
            return Err(StoreError::rejected("STOR", &remote, "cannot store here"));
        }
        let contents = std::fs::read(local)?;
        let size = contents.len() as u64;
        tree.nodes.insert(remote, Node::File(contents));
        Ok(size)
    }

    fn delete_file(&mut self, file: &str) -> StoreResult<()> {
        let mut tree = self.tree();
        tree.count("delete");
        let file = normalize(file);
        match tree.nodes.get(&file) {
            Some(Node::File(_)) => {
                tree.nodes.remove(&file);
                Ok(())
            }
            _ => Err(StoreError::rejected("DELE", &file, "not a file")),
        }
    }

    fn remove_directory(&mut self, dir: &str) -> StoreResult<()> {
        let mut tree = self.tree();
        tree.count("rmdir");
        let dir = normalize(dir);
        if dir == "/" || !tree.is_directory(&dir) {
            return Err(StoreError::rejected("RMD", &dir, "not a directory"));
        }
        if !tree.children(&dir).is_empty() {
            return Err(StoreError::rejected("RMD", &dir, "directory not empty"));
        }
        tree.nodes.remove(&dir);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> StoreResult<()> {
        let mut tree = self.tree();
        tree.count("rename");
        let (from, to) = (normalize(from), normalize(to));
        if tree.failing_renames.contains(&from) {
            return Err(StoreError::rejected("RNFR/RNTO", &from, "rename refused"));
        }
        let target_parent_exists = path::parent(&to)
            .map(|parent| tree.is_directory(&parent))
            .unwrap_or(false);
        if !tree.nodes.contains_key(&from) || tree.nodes.contains_key(&to) || !target_parent_exists {
            return Err(StoreError::rejected("RNFR/RNTO", &from, "cannot rename"));
        }
        for key in tree.subtree_keys(&from) {
            if let Some(node) = tree.nodes.remove(&key) {
                let moved = format!("{}{}", to, &key[from.len()..]);
                tree.nodes.insert(moved, node);
            }
        }
        Ok(())
    }

    fn list_entries(&mut self, dir: &str) -> StoreResult<Vec<RemoteEntry>> {
        let mut tree = self.tree();
        tree.count("list_entries");
        if !tree.typed_listing {
            return Err(StoreError::Unsupported);
        }
        let dir = normalize(dir);
        if !tree.is_directory(&dir) {
            return Err(StoreError::rejected("MLSD", &dir, "not a directory"));
        }
        let mut entries = vec![
            RemoteEntry {
                name: ".".to_owned(),
                kind: EntryKind::Directory,
            },
            RemoteEntry {
                name: "..".to_owned(),
                kind: EntryKind::Directory,
            },
        ];
        entries.extend(tree.children(&dir).into_iter().map(|(key, node)| RemoteEntry {
            name: path::file_name(&key).to_owned(),
            kind: match node {
                Node::Directory => EntryKind::Directory,
                Node::File(_) => EntryKind::File,
            },
        }));
        Ok(entries)
    }

    fn list_names(&mut self, dir: &str) -> StoreResult<Vec<String>> {
        let mut tree = self.tree();
        tree.count("list_names");
        let dir = normalize(dir);
        if !tree.is_directory(&dir) {
            return Err(StoreError::rejected("NLST", &dir, "not a directory"));
        }
        let mut names = vec![".".to_owned(), "..".to_owned()];
        names.extend(tree.children(&dir).into_iter().map(|(key, _)| key));
        Ok(names)
    }

    fn delete_tree(&mut self, dir: &str) -> StoreResult<()> {
        let mut tree = self.tree();
        tree.count("delete_tree");
        if !tree.bulk_delete {
            return Err(StoreError::Unsupported);
        }
        let dir = normalize(dir);
        if !tree.is_directory(&dir) {
            return Err(StoreError::rejected("SITE RMDIR", &dir, "not a directory"));
        }
        for key in tree.subtree_keys(&dir) {
            tree.nodes.remove(&key);
        }
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.tree().count("close");
        Ok(())
    }
}

/// Hands out clones of one shared store, counting connection attempts.
#[derive(Clone)]
pub struct MemoryConnector {
    pub store: MemoryStore,
    pub refuse: bool,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> MemoryConnector {
        MemoryConnector {
            store,
            refuse: false,
        }
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _target: &DeploymentTarget) -> anyhow::Result<Box<dyn RemoteStore + Send>> {
        self.store.tree().count("connect");
        if self.refuse {
            return Err(anyhow::anyhow!("Connection refused"));
        }
        Ok(Box::new(self.store.clone()))
    }
}
