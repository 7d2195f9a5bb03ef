//! Working tree and index status
//!
//! Two buckets: what's staged in the index, and what has drifted in the
//! working directory since the last save plus whatever is staged. The
//! working-dir bucket is computed against an overlay (the head save's
//! tree with every staged change replayed on top), so a file that was
//! staged and then touched again on disk shows up as unstaged drift, not
//! as untracked.

use crate::areas::object_store::ObjectStore;
use crate::areas::workspace::Workspace;
use crate::artifacts::change::Change;
use crate::artifacts::dir_tree::DirTree;
use crate::artifacts::hash::Hash;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct StagedStatus {
    pub created: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub conflicted: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkingDirStatus {
    pub untracked: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct Status {
    pub staged: StagedStatus,
    pub working_dir: WorkingDirStatus,
}

pub fn compute(
    head_tree: &DirTree,
    index: &[Change],
    workspace: &Workspace,
    object_store: &ObjectStore,
) -> anyhow::Result<Status> {
    let mut staged = StagedStatus::default();
    for change in index {
        match change {
            Change::Creation(f) => staged.created.push(f.path.clone()),
            Change::Modification(f) => staged.modified.push(f.path.clone()),
            Change::Removal(r) => staged.removed.push(r.path.clone()),
            Change::Conflict(c) => staged.conflicted.push((c.path.clone(), c.message.clone())),
        }
    }
    staged.created.sort();
    staged.modified.sort();
    staged.removed.sort();
    staged.conflicted.sort();

    let mut overlay = head_tree.clone();
    for change in index {
        overlay.add_node(change)?;
    }

    let tracked: std::collections::HashMap<PathBuf, Hash> = overlay
        .collect_all_files()
        .into_iter()
        .map(|(abs, hash)| {
            let rel = abs
                .strip_prefix(overlay.root())
                .unwrap_or(&abs)
                .to_path_buf();
            (rel, hash)
        })
        .collect();

    let mut working_dir = WorkingDirStatus::default();

    for (rel_path, hash) in &tracked {
        if !workspace.exists(rel_path) {
            working_dir.removed.push(rel_path.clone());
            continue;
        }
        let bytes = workspace.read_file(rel_path)?;
        if Hash::of(&bytes) != *hash {
            working_dir.modified.push(rel_path.clone());
        }
    }

    for path in workspace.list_files()? {
        if !tracked.contains_key(&path) {
            working_dir.untracked.push(path);
        }
    }

    working_dir.modified.sort();
    working_dir.removed.sort();
    working_dir.untracked.sort();

    // silence unused-import warning when object_store isn't otherwise
    // touched by a given code path
    let _ = object_store;

    Ok(Status { staged, working_dir })
}
