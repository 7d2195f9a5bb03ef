//! Saves: ordered checkpoint chains
//!
//! A `Save` is the materialized chain of checkpoints from the root of
//! history down to a tip, used for ancestor search, containment tests,
//! and tree reconstruction. Each checkpoint has at most one parent, so
//! history is a simple chain — no best-common-ancestor search over an
//! arbitrary DAG, just a walk.

use crate::artifacts::change::Change;
use crate::artifacts::checkpoint::Checkpoint;
use crate::artifacts::dir_tree::DirTree;
use crate::artifacts::hash::Hash;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Save {
    /// root-to-tip order
    checkpoints: Vec<Checkpoint>,
}

impl Save {
    /// Walk parent links from `tip` back to the root checkpoint (the one
    /// with no parent), using `fetch` to load a checkpoint by id.
    pub fn load(
        tip: &Hash,
        fetch: impl Fn(&Hash) -> anyhow::Result<Checkpoint>,
    ) -> anyhow::Result<Self> {
        let mut chain = Vec::new();
        let mut current = fetch(tip)?;

        loop {
            let parent = current.parent().cloned();
            chain.push(current);
            match parent {
                Some(parent_id) => current = fetch(&parent_id)?,
                None => break,
            }
        }

        chain.reverse();
        Ok(Save { checkpoints: chain })
    }

    pub fn tip(&self) -> &Checkpoint {
        self.checkpoints
            .last()
            .expect("a save always has at least one checkpoint")
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn contains(&self, other: &Save) -> bool {
        let target = other.tip().id();
        self.checkpoints.iter().any(|c| c.id() == target)
    }

    /// The deepest checkpoint appearing in both chains, if any.
    pub fn first_common_checkpoint_parent<'a>(&'a self, other: &'a Save) -> Option<&'a Checkpoint> {
        self.checkpoints
            .iter()
            .rev()
            .find(|c| other.checkpoints.iter().any(|o| o.id() == c.id()))
    }

    /// Every change from every checkpoint after `ancestor` (exclusive) up
    /// to the tip, in checkpoint order.
    pub fn changes_since<'a>(&'a self, ancestor: Option<&Checkpoint>) -> Vec<&'a Change> {
        let start = match ancestor {
            Some(a) => self
                .checkpoints
                .iter()
                .position(|c| c.id() == a.id())
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };

        self.checkpoints[start..]
            .iter()
            .flat_map(|c| c.changes())
            .collect()
    }

    /// Replay every checkpoint's changes, root to tip, into a fresh tree.
    pub fn build_dir(&self, root: PathBuf) -> anyhow::Result<DirTree> {
        let mut tree = DirTree::new(root);
        for checkpoint in &self.checkpoints {
            for change in checkpoint.changes() {
                tree.add_node(change)?;
            }
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::change::File;
    use chrono::{DateTime, FixedOffset};
    use std::collections::HashMap;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-07-28T10:00:00+00:00").unwrap()
    }

    fn chain(n: usize) -> (HashMap<Hash, Checkpoint>, Hash) {
        let mut store = HashMap::new();
        let mut parent = None;
        let mut tip = None;

        for i in 0..n {
            let changes = vec![Change::Creation(File {
                path: PathBuf::from(format!("/f{i}.txt")),
                hash: Hash::of(format!("{i}").as_bytes()),
            })];
            let checkpoint = Checkpoint::new(format!("save {i}"), parent.clone(), now(), changes);
            parent = Some(checkpoint.id().clone());
            tip = Some(checkpoint.id().clone());
            store.insert(checkpoint.id().clone(), checkpoint);
        }

        (store, tip.unwrap())
    }

    #[test]
    fn build_dir_replays_every_checkpoint() {
        let (store, tip) = chain(3);
        let save = Save::load(&tip, |id| {
            store.get(id).cloned().ok_or_else(|| anyhow::anyhow!("missing"))
        })
        .unwrap();

        let tree = save.build_dir(PathBuf::from("/repo")).unwrap();
        assert_eq!(tree.collect_all_files().len(), 3);
    }

    #[test]
    fn contains_is_true_for_an_ancestor_tip() {
        let (store, tip) = chain(3);
        let save = Save::load(&tip, |id| {
            store.get(id).cloned().ok_or_else(|| anyhow::anyhow!("missing"))
        })
        .unwrap();
        let ancestor_tip = save.checkpoints()[0].id().clone();
        let ancestor_save = Save::load(&ancestor_tip, |id| {
            store.get(id).cloned().ok_or_else(|| anyhow::anyhow!("missing"))
        })
        .unwrap();

        assert!(save.contains(&ancestor_save));
    }
}
