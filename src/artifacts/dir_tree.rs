//! In-memory nested directory model
//!
//! A `DirTree` reconstructs any snapshot (or an overlay of one) as a tree
//! of directories and files, so the rest of the system can traverse,
//! diff, and apply it without touching the filesystem until the final
//! step. Invariants: no non-root directory is ever empty, and no two
//! siblings share a name.

use crate::artifacts::change::Change;
use crate::artifacts::hash::Hash;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File { path: PathBuf, hash: Hash },
    Dir { path: PathBuf, children: BTreeMap<String, Node> },
}

impl Node {
    pub fn path(&self) -> &Path {
        match self {
            Node::File { path, .. } => path,
            Node::Dir { path, .. } => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir { .. })
    }
}

#[derive(Debug, Clone)]
pub struct DirTree {
    root: PathBuf,
    children: BTreeMap<String, Node>,
}

impl DirTree {
    pub fn new(root: PathBuf) -> Self {
        DirTree {
            root,
            children: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply one change to the tree, keyed by its path relative to the
    /// root. Creations/modifications/conflicts insert or overwrite a leaf
    /// (creating intermediate directories as needed); removals delete a
    /// leaf and prune any ancestor directory left empty by it.
    pub fn add_node(&mut self, change: &Change) -> anyhow::Result<()> {
        let rel = self.normalize_path(change.path())?;

        if change.is_removal() {
            self.remove_leaf(&rel);
            return Ok(());
        }

        let hash = change
            .hash()
            .ok_or_else(|| anyhow::anyhow!("non-removal change must carry a hash"))?
            .clone();
        self.insert_leaf(&rel, hash);
        Ok(())
    }

    fn insert_leaf(&mut self, rel: &Path, hash: Hash) {
        let components: Vec<String> = components_of(rel);
        let abs_path = self.root.join(rel);

        if components.is_empty() {
            return;
        }

        let mut current = &mut self.children;
        let mut current_path = self.root.clone();

        for (i, name) in components.iter().enumerate() {
            current_path = current_path.join(name);
            let is_last = i == components.len() - 1;

            if is_last {
                current.insert(
                    name.clone(),
                    Node::File {
                        path: abs_path.clone(),
                        hash: hash.clone(),
                    },
                );
            } else {
                let entry = current.entry(name.clone()).or_insert_with(|| Node::Dir {
                    path: current_path.clone(),
                    children: BTreeMap::new(),
                });
                match entry {
                    Node::Dir { children, .. } => current = children,
                    Node::File { .. } => {
                        *entry = Node::Dir {
                            path: current_path.clone(),
                            children: BTreeMap::new(),
                        };
                        if let Node::Dir { children, .. } = entry {
                            current = children;
                        }
                    }
                }
            }
        }
    }

    fn remove_leaf(&mut self, rel: &Path) {
        let components = components_of(rel);
        if components.is_empty() {
            return;
        }
        Self::remove_recursive(&mut self.children, &components);
    }

    /// Returns true if the map the caller holds should drop this entry
    /// (either it was the removed leaf, or it became an empty directory).
    fn remove_recursive(map: &mut BTreeMap<String, Node>, components: &[String]) -> bool {
        let Some((name, rest)) = components.split_first() else {
            return false;
        };

        if rest.is_empty() {
            return map.remove(name).is_some();
        }

        let remove_parent = match map.get_mut(name) {
            Some(Node::Dir { children, .. }) => {
                let removed = Self::remove_recursive(children, rest);
                removed && children.is_empty()
            }
            _ => false,
        };

        if remove_parent {
            map.remove(name);
        }

        false
    }

    pub fn find_node(&self, rel: &Path) -> Option<&Node> {
        let components = components_of(rel);
        if components.is_empty() {
            return None;
        }

        let mut map = &self.children;
        let mut node = None;

        for name in &components {
            match map.get(name) {
                Some(n @ Node::Dir { children, .. }) => {
                    map = children;
                    node = Some(n);
                }
                Some(n @ Node::File { .. }) => {
                    node = Some(n);
                }
                None => return None,
            }
        }

        node
    }

    pub fn collect_all_files(&self) -> Vec<(PathBuf, Hash)> {
        let mut out = Vec::new();
        Self::collect_recursive(&self.children, &mut out);
        out
    }

    fn collect_recursive(map: &BTreeMap<String, Node>, out: &mut Vec<(PathBuf, Hash)>) {
        for node in map.values() {
            match node {
                Node::File { path, hash } => out.push((path.clone(), hash.clone())),
                Node::Dir { children, .. } => Self::collect_recursive(children, out),
            }
        }
    }

    pub fn pre_order_traversal(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        Self::walk(&self.children, &mut out);
        out
    }

    fn walk<'a>(map: &'a BTreeMap<String, Node>, out: &mut Vec<&'a Node>) {
        for node in map.values() {
            out.push(node);
            if let Node::Dir { children, .. } = node {
                Self::walk(children, out);
            }
        }
    }

    /// Collapse `.`/`..` components lexically, without touching the
    /// filesystem, so a leading run of `..` can't walk past whatever this
    /// path is later joined onto.
    fn lexically_normalize(path: &Path) -> PathBuf {
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                other => out.push(other.as_os_str()),
            }
        }
        out
    }

    /// Returns the path relative to the tree's root, rejecting anything
    /// that escapes it (absolute paths outside the root, or relative paths
    /// whose `..` components walk back out of it).
    pub fn normalize_path(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let normalized = Self::lexically_normalize(&candidate);

        normalized
            .strip_prefix(&self.root)
            .map(PathBuf::from)
            .map_err(|_| anyhow::anyhow!("invalid path."))
    }

    pub fn abs_path(&self, path: &Path) -> anyhow::Result<PathBuf> {
        Ok(self.root.join(self.normalize_path(path)?))
    }

    /// Overlay `other` onto `self`: entries absent from `self` are moved
    /// in; entries present in both recurse (dirs) or overwrite (files).
    pub fn merge(&mut self, other: DirTree) {
        Self::merge_maps(&mut self.children, other.children);
    }

    fn merge_maps(into: &mut BTreeMap<String, Node>, from: BTreeMap<String, Node>) {
        for (name, node) in from {
            match into.remove(&name) {
                Some(Node::Dir { path, mut children }) => {
                    if let Node::Dir { children: other_children, .. } = node {
                        Self::merge_maps(&mut children, other_children);
                        into.insert(name, Node::Dir { path, children });
                    } else {
                        into.insert(name, node);
                    }
                }
                _ => {
                    into.insert(name, node);
                }
            }
        }
    }
}

fn components_of(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::change::{File, FileRemoval};

    fn tree() -> DirTree {
        DirTree::new(PathBuf::from("/repo"))
    }

    fn create(path: &str, content: &[u8]) -> Change {
        Change::Creation(File {
            path: PathBuf::from(path),
            hash: Hash::of(content),
        })
    }

    fn remove(path: &str) -> Change {
        Change::Removal(FileRemoval {
            path: PathBuf::from(path),
        })
    }

    #[test]
    fn removing_both_siblings_collapses_the_directory() {
        let mut t = tree();
        t.add_node(&create("/repo/dir/a.txt", b"a")).unwrap();
        t.add_node(&create("/repo/dir/b.txt", b"b")).unwrap();

        t.add_node(&remove("/repo/dir/a.txt")).unwrap();
        assert!(t.find_node(Path::new("dir")).is_some());

        t.add_node(&remove("/repo/dir/b.txt")).unwrap();
        assert!(t.find_node(Path::new("dir")).is_none());
        assert!(t.collect_all_files().is_empty());
    }

    #[test]
    fn reindexing_after_removal_restores_the_latest_modification() {
        let mut t = tree();
        t.add_node(&create("/repo/a.txt", b"old")).unwrap();
        t.add_node(&remove("/repo/a.txt")).unwrap();
        t.add_node(&create("/repo/a.txt", b"new")).unwrap();

        let files = t.collect_all_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, Hash::of(b"new"));
    }

    #[test]
    fn normalize_path_rejects_paths_outside_root() {
        let t = tree();
        assert!(t.normalize_path(Path::new("/elsewhere/a.txt")).is_err());
    }

    #[test]
    fn merge_overlays_disjoint_subtrees() {
        let mut a = tree();
        a.add_node(&create("/repo/a.txt", b"a")).unwrap();
        let mut b = tree();
        b.add_node(&create("/repo/dir/b.txt", b"b")).unwrap();

        a.merge(b);
        let files = a.collect_all_files();
        assert_eq!(files.len(), 2);
    }
}
