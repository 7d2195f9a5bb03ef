//! Working directory operations
//!
//! Lists files on disk (skipping the repository's own metadata folder),
//! reads raw bytes, and converges the working directory to a target
//! `DirTree` per the apply algorithm: delete what isn't kept, write what's
//! missing or stale, prune directories left empty.

use crate::areas::object_store::ObjectStore;
use crate::artifacts::dir_tree::DirTree;
use crate::artifacts::hash::Hash;
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
    metadata_dir_name: String,
}

impl Workspace {
    pub fn new(path: Box<Path>, metadata_dir_name: impl Into<String>) -> Self {
        Workspace {
            path,
            metadata_dir_name: metadata_dir_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_ignored(&self, path: &Path) -> bool {
        path.components().any(|c| {
            if let std::path::Component::Normal(name) = c {
                name.to_string_lossy() == self.metadata_dir_name
            } else {
                false
            }
        })
    }

    /// Every regular file under the root, relative paths, skipping the
    /// metadata folder.
    pub fn list_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if entry.file_type().is_file() && !self.is_ignored(path) {
                files.push(path.strip_prefix(&self.path)?.to_path_buf());
            }
        }
        Ok(files)
    }

    pub fn read_file(&self, rel_path: &Path) -> anyhow::Result<Vec<u8>> {
        let full = self.path.join(rel_path);
        std::fs::read(&full).with_context(|| format!("unable to read file {}", full.display()))
    }

    pub fn exists(&self, rel_path: &Path) -> bool {
        self.path.join(rel_path).exists()
    }

    /// Converge the working directory to `target`: delete files not kept,
    /// write files that are missing or whose hash differs, then prune
    /// directories left empty, deepest first.
    pub fn apply_dir_tree(&self, target: &DirTree, object_store: &ObjectStore) -> anyhow::Result<()> {
        let keep: HashMap<PathBuf, Hash> = target
            .collect_all_files()
            .into_iter()
            .map(|(abs_path, hash)| {
                let rel = abs_path
                    .strip_prefix(target.root())
                    .unwrap_or(&abs_path)
                    .to_path_buf();
                (rel, hash)
            })
            .collect();

        for existing in self.list_files()? {
            if !keep.contains_key(&existing) {
                let full = self.path.join(&existing);
                std::fs::remove_file(&full)
                    .with_context(|| format!("unable to remove file {}", full.display()))?;
            }
        }

        for (rel_path, hash) in &keep {
            let full = self.path.join(rel_path);
            let needs_write = match std::fs::read(&full) {
                Ok(current) => Hash::of(&current) != *hash,
                Err(_) => true,
            };

            if needs_write {
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("unable to create directory {}", parent.display()))?;
                }
                let data = object_store.read(hash)?;
                std::fs::write(&full, data)
                    .with_context(|| format!("unable to write file {}", full.display()))?;
            }
        }

        self.prune_empty_dirs()?;
        Ok(())
    }

    fn prune_empty_dirs(&self) -> anyhow::Result<()> {
        let mut dirs: Vec<PathBuf> = WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir() && !self.is_ignored(e.path()) && e.path() != self.path.as_ref())
            .map(|e| e.path().to_path_buf())
            .collect();

        // deepest first so children are pruned before their parents
        dirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));

        for dir in dirs {
            let is_empty = std::fs::read_dir(&dir)
                .map(|mut it| it.next().is_none())
                .unwrap_or(false);
            if is_empty {
                std::fs::remove_dir(&dir)
                    .with_context(|| format!("unable to remove empty directory {}", dir.display()))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::change::{Change, File as ChangeFile};

    #[test]
    fn apply_dir_tree_writes_missing_files_and_removes_untracked() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let objects = ObjectStore::new(root.join(".knot/objects").into_boxed_path());
        let hash = objects.write(b"hello").unwrap();

        std::fs::write(root.join("stale.txt"), b"stale").unwrap();

        let workspace = Workspace::new(root.clone().into_boxed_path(), ".knot".to_string());
        let mut tree = DirTree::new(root.clone());
        tree.add_node(&Change::Creation(ChangeFile {
            path: root.join("a.txt"),
            hash,
        }))
        .unwrap();

        workspace.apply_dir_tree(&tree, &objects).unwrap();

        assert!(!root.join("stale.txt").exists());
        assert_eq!(std::fs::read(root.join("a.txt")).unwrap(), b"hello");
    }
}
