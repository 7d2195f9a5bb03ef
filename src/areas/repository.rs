//! Repository abstraction and coordination
//!
//! `Repository` is the facade over the lower-level components (object
//! store, metadata store, workspace) and implements every high-level
//! operation: indexing, saving, loading, restoring, status, refs, and
//! merge. Everything runs on the calling thread — there is no locking
//! primitive anywhere in this module, since only one process ever touches
//! a repository's metadata directory at a time.

use crate::areas::metadata_store::MetadataStore;
use crate::areas::object_store::ObjectStore;
use crate::areas::workspace::Workspace;
use crate::artifacts::change::{Change, Conflict, File, FileRemoval};
use crate::artifacts::checkpoint::Checkpoint;
use crate::artifacts::dir_tree::DirTree;
use crate::artifacts::hash::Hash;
use crate::artifacts::merge::{plan_merge, MergeResult};
use crate::artifacts::save::Save;
use crate::artifacts::status::{self, Status};
use crate::error::ValidationError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

const METADATA_DIR: &str = ".knot";
const INITIAL_REF: &str = "main";
const OBJECTS_DIR: &str = "objects";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Head {
    Ref(String),
    Detached(Hash),
}

pub enum MergeOutcome {
    FastForward(Hash),
    Merged(Checkpoint),
    Conflicts(usize),
}

pub struct Repository {
    root: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    object_store: ObjectStore,
    metadata_store: MetadataStore,
    workspace: Workspace,
    index: RefCell<Vec<Change>>,
    refs: RefCell<BTreeMap<String, Option<Hash>>>,
    head: RefCell<Head>,
}

impl Repository {
    /// Create a brand-new repository rooted at `path`.
    pub fn init(path: impl Into<PathBuf>, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let path = path.into();
        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }
        let root = path.canonicalize()?;

        let metadata_dir = root.join(METADATA_DIR);
        if metadata_dir.exists() {
            anyhow::bail!("a repository already exists at {}", root.display());
        }

        let metadata_store = MetadataStore::new(metadata_dir.clone().into_boxed_path());
        metadata_store.initialize(INITIAL_REF)?;

        let object_store = ObjectStore::new(metadata_dir.join(OBJECTS_DIR).into_boxed_path());
        let workspace = Workspace::new(root.clone().into_boxed_path(), METADATA_DIR.to_string());

        Ok(Repository {
            root: root.into_boxed_path(),
            writer: RefCell::new(writer),
            object_store,
            metadata_store,
            workspace,
            index: RefCell::new(Vec::new()),
            refs: RefCell::new(BTreeMap::from([(INITIAL_REF.to_string(), None)])),
            head: RefCell::new(Head::Ref(INITIAL_REF.to_string())),
        })
    }

    /// Open an existing repository, searching `start` and its ancestors
    /// for a metadata directory.
    pub fn open(start: impl Into<PathBuf>, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let start = start.into().canonicalize()?;
        let root = Self::discover(&start)
            .ok_or_else(|| anyhow::anyhow!("not a repository (or any parent up to /): {}", start.display()))?;

        let metadata_dir = root.join(METADATA_DIR);
        let metadata_store = MetadataStore::new(metadata_dir.clone().into_boxed_path());
        let object_store = ObjectStore::new(metadata_dir.join(OBJECTS_DIR).into_boxed_path());
        let workspace = Workspace::new(root.clone().into_boxed_path(), METADATA_DIR.to_string());

        let refs = metadata_store.read_refs()?;
        let index = metadata_store.read_index()?;
        let head_value = metadata_store.read_head()?;
        let head = match Hash::try_parse(head_value.clone()) {
            Ok(hash) => Head::Detached(hash),
            Err(_) => Head::Ref(head_value),
        };

        Ok(Repository {
            root: root.into_boxed_path(),
            writer: RefCell::new(writer),
            object_store,
            metadata_store,
            workspace,
            index: RefCell::new(index),
            refs: RefCell::new(refs),
            head: RefCell::new(head),
        })
    }

    fn discover(start: &Path) -> Option<PathBuf> {
        let mut current = start;
        loop {
            if current.join(METADATA_DIR).is_dir() {
                log::debug!("discovered repository root at {}", current.display());
                return Some(current.to_path_buf());
            }
            current = current.parent()?;
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn writer(&self) -> std::cell::RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    fn current_ref_name(&self) -> Option<String> {
        match &*self.head.borrow() {
            Head::Ref(name) => Some(name.clone()),
            Head::Detached(_) => None,
        }
    }

    fn current_tip(&self) -> Option<Hash> {
        match &*self.head.borrow() {
            Head::Ref(name) => self.refs.borrow().get(name).cloned().flatten(),
            Head::Detached(hash) => Some(hash.clone()),
        }
    }

    fn is_detached(&self) -> bool {
        matches!(&*self.head.borrow(), Head::Detached(_))
    }

    fn fetch_checkpoint(&self, id: &Hash) -> anyhow::Result<Checkpoint> {
        self.metadata_store.read_checkpoint(id)
    }

    fn current_save(&self) -> anyhow::Result<Option<Save>> {
        match self.current_tip() {
            Some(tip) => Ok(Some(Save::load(&tip, |id| self.fetch_checkpoint(id))?)),
            None => Ok(None),
        }
    }

    fn current_save_tree(&self) -> anyhow::Result<DirTree> {
        match self.current_save()? {
            Some(save) => save.build_dir(self.root.to_path_buf()),
            None => Ok(DirTree::new(self.root.to_path_buf())),
        }
    }

    fn should_release(change: &Change, new_hash: Option<&Hash>) -> bool {
        match change {
            Change::Creation(f) | Change::Modification(f) => Some(&f.hash) != new_hash,
            Change::Conflict(c) if c.temporary => Some(&c.hash) != new_hash,
            Change::Conflict(_) => false,
            Change::Removal(_) => false,
        }
    }

    fn release_if_owned(&self, change: &Change, new_hash: Option<&Hash>) -> anyhow::Result<()> {
        if Self::should_release(change, new_hash)
            && let Some(hash) = change.hash()
        {
            self.object_store.remove(hash)?;
        }
        Ok(())
    }

    /// Stage the current on-disk content of `path`.
    pub fn index_file(&self, path: &Path) -> anyhow::Result<()> {
        if self.is_detached() {
            return Err(ValidationError::new("cannot make changes in detached mode.").into());
        }

        let saved_tree = self.current_save_tree()?;
        let rel = saved_tree
            .normalize_path(path)
            .map_err(|_| ValidationError::new("invalid path."))?;
        let abs = saved_tree.root().join(&rel);

        let bytes = self.workspace.read_file(&rel)?;
        let hash = self.object_store.write(&bytes)?;

        let saved_hash = saved_tree
            .find_node(&rel)
            .and_then(|n| match n {
                crate::artifacts::dir_tree::Node::File { hash, .. } => Some(hash.clone()),
                _ => None,
            });

        let mut index = self.index.borrow_mut();
        let prev_idx = index.iter().position(|c| c.path() == abs);
        let prev = prev_idx.map(|i| index[i].clone());

        if saved_hash.as_ref() == Some(&hash) {
            if let Some(prev) = prev {
                self.release_if_owned(&prev, Some(&hash))?;
                index.remove(prev_idx.unwrap());
            }
        } else {
            if let Some(prev) = &prev {
                self.release_if_owned(prev, Some(&hash))?;
                index.remove(prev_idx.unwrap());
            }
            let change = if saved_hash.is_some() {
                Change::Modification(File { path: abs, hash })
            } else {
                Change::Creation(File { path: abs, hash })
            };
            index.push(change);
        }

        Ok(())
    }

    /// Stage the removal of `path`.
    pub fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        if self.is_detached() {
            return Err(ValidationError::new("cannot make changes in detached mode.").into());
        }

        let saved_tree = self.current_save_tree()?;
        let rel = saved_tree
            .normalize_path(path)
            .map_err(|_| ValidationError::new("invalid path."))?;
        let abs = saved_tree.root().join(&rel);

        let saved_hash = saved_tree.find_node(&rel).and_then(|n| match n {
            crate::artifacts::dir_tree::Node::File { hash, .. } => Some(hash.clone()),
            _ => None,
        });

        let mut index = self.index.borrow_mut();
        let prev_idx = index.iter().position(|c| c.path() == abs);

        if let Some(prev_idx) = prev_idx {
            let prev = index.remove(prev_idx);
            self.release_if_owned(&prev, None)?;
        }

        if saved_hash.is_some() {
            index.push(Change::Removal(FileRemoval { path: abs }));
        }

        Ok(())
    }

    pub fn save_index(&self) -> anyhow::Result<()> {
        self.metadata_store.write_index(&self.index.borrow())
    }

    /// Commit the staged changes as a new checkpoint and advance the
    /// current ref.
    pub fn create_save(&self, message: &str) -> anyhow::Result<Checkpoint> {
        if self.is_detached() {
            return Err(ValidationError::new("cannot make changes in detached mode.").into());
        }

        let index = self.index.borrow();
        if index.is_empty() {
            return Err(ValidationError::new("nothing to save.").into());
        }
        if index.iter().any(Change::is_conflict) {
            return Err(ValidationError::new("unresolved conflicts.").into());
        }

        let parent = self.current_tip();
        let changes: Vec<Change> = index.to_vec();
        let checkpoint = Checkpoint::new(message, parent, chrono::Local::now().fixed_offset(), changes);
        drop(index);

        self.metadata_store.write_checkpoint(&checkpoint)?;

        let ref_name = self.current_ref_name().expect("detached case already rejected");
        self.refs.borrow_mut().insert(ref_name, Some(checkpoint.id().clone()));
        self.metadata_store.write_refs(&self.refs.borrow())?;

        self.index.borrow_mut().clear();
        self.metadata_store.write_index(&[])?;

        log::info!("saved {} \"{}\"", checkpoint.id(), checkpoint.message());
        Ok(checkpoint)
    }

    /// The checkpoint chain of the currently checked-out save, if any
    /// save has been made yet.
    pub fn history(&self) -> anyhow::Result<Option<Save>> {
        self.current_save()
    }

    pub fn get_status(&self) -> anyhow::Result<Status> {
        let head_tree = self.current_save_tree()?;
        status::compute(&head_tree, &self.index.borrow(), &self.workspace, &self.object_store)
    }

    /// Check out `target` (a ref name or a checkpoint id), replacing the
    /// working directory with its tree.
    pub fn load(&self, target: &str) -> anyhow::Result<()> {
        if !self.index.borrow().is_empty() {
            return Err(ValidationError::new("unsaved changes.").into());
        }

        let refs = self.refs.borrow();
        let (target_id, new_head) = if let Some(id) = refs.get(target) {
            let id = id.clone().ok_or_else(|| ValidationError::new("invalid ref."))?;
            (id, Head::Ref(target.to_string()))
        } else if let Ok(hash) = Hash::try_parse(target.to_string()) {
            // verify it really exists
            let _ = self.metadata_store.read_checkpoint(&hash)?;
            (hash.clone(), Head::Detached(hash))
        } else {
            return Err(ValidationError::new("invalid ref.").into());
        };
        drop(refs);

        let save = Save::load(&target_id, |id| self.fetch_checkpoint(id))?;
        let tree = save.build_dir(self.root.to_path_buf())?;
        self.workspace.apply_dir_tree(&tree, &self.object_store)?;

        *self.head.borrow_mut() = new_head;
        let head_value = match &*self.head.borrow() {
            Head::Ref(name) => name.clone(),
            Head::Detached(hash) => hash.to_string(),
        };
        self.metadata_store.write_head(&head_value)?;

        log::info!("loaded {target} ({head_value})");
        Ok(())
    }

    /// Discard any staged change on `path` and restore its saved content.
    pub fn restore(&self, path: &Path) -> anyhow::Result<()> {
        let saved_tree = self.current_save_tree()?;
        let rel = saved_tree
            .normalize_path(path)
            .map_err(|_| ValidationError::new("invalid path."))?;
        let abs = saved_tree.root().join(&rel);

        let node = saved_tree
            .find_node(&rel)
            .ok_or_else(|| ValidationError::new("invalid path."))?;
        let hash = match node {
            crate::artifacts::dir_tree::Node::File { hash, .. } => hash.clone(),
            crate::artifacts::dir_tree::Node::Dir { .. } => {
                return Err(ValidationError::new("invalid path.").into());
            }
        };

        let bytes = self.object_store.read(&hash)?;
        let full = self.workspace.path().join(&rel);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, bytes)?;

        let mut index = self.index.borrow_mut();
        if let Some(idx) = index.iter().position(|c| c.path() == abs) {
            let prev = index.remove(idx);
            drop(index);
            self.release_if_owned(&prev, Some(&hash))?;
        }

        Ok(())
    }

    pub fn create_ref(&self, name: &str) -> anyhow::Result<()> {
        if self.refs.borrow().contains_key(name) {
            return Err(ValidationError::new("ref already exists.").into());
        }
        let tip = self.current_tip();
        self.refs.borrow_mut().insert(name.to_string(), tip);
        self.metadata_store.write_refs(&self.refs.borrow())?;
        Ok(())
    }

    pub fn list_refs(&self) -> BTreeMap<String, Option<Hash>> {
        self.refs.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn head_description(&self) -> String {
        match &*self.head.borrow() {
            Head::Ref(name) => name.clone(),
            Head::Detached(hash) => format!("detached at {hash}"),
        }
    }

    /// Merge `ref_name` into the currently checked-out ref.
    pub fn merge(&self, ref_name: &str) -> anyhow::Result<MergeOutcome> {
        if self.is_detached() {
            return Err(ValidationError::new("cannot make changes in detached mode.").into());
        }
        if !self.index.borrow().is_empty() {
            return Err(ValidationError::new("unsaved changes.").into());
        }
        let status = self.get_status()?;
        if !status.working_dir.modified.is_empty()
            || !status.working_dir.removed.is_empty()
            || !status.working_dir.untracked.is_empty()
        {
            return Err(ValidationError::new("unsaved changes.").into());
        }

        let incoming_id = self
            .refs
            .borrow()
            .get(ref_name)
            .cloned()
            .flatten()
            .ok_or_else(|| ValidationError::new("invalid ref."))?;
        let incoming_save = Save::load(&incoming_id, |id| self.fetch_checkpoint(id))?;
        let current_save = self.current_save()?;
        let ref_name_current = self.current_ref_name().expect("detached case already rejected");

        let object_store = &self.object_store;
        let result = plan_merge(
            &ref_name_current,
            ref_name,
            current_save.as_ref(),
            &incoming_save,
            |h| object_store.read(h),
            |bytes| object_store.write(bytes),
        )?;

        match result {
            MergeResult::FastForward { tip } => {
                let tree = incoming_save.build_dir(self.root.to_path_buf())?;
                self.workspace.apply_dir_tree(&tree, &self.object_store)?;
                self.refs.borrow_mut().insert(ref_name_current, Some(tip.clone()));
                self.metadata_store.write_refs(&self.refs.borrow())?;
                log::info!("fast-forwarded to {tip}");
                Ok(MergeOutcome::FastForward(tip))
            }
            MergeResult::Clean { changes } => {
                let mut tree = current_save
                    .as_ref()
                    .map(|s| s.build_dir(self.root.to_path_buf()))
                    .transpose()?
                    .unwrap_or_else(|| DirTree::new(self.root.to_path_buf()));
                for change in &changes {
                    tree.add_node(change)?;
                }
                self.workspace.apply_dir_tree(&tree, &self.object_store)?;

                let message = format!("Merge \"{ref_name}\" at \"{ref_name_current}\".");
                let checkpoint = Checkpoint::new(
                    message,
                    self.current_tip(),
                    chrono::Local::now().fixed_offset(),
                    changes,
                );
                self.metadata_store.write_checkpoint(&checkpoint)?;
                self.refs.borrow_mut().insert(ref_name_current, Some(checkpoint.id().clone()));
                self.metadata_store.write_refs(&self.refs.borrow())?;
                log::info!("merged {ref_name} into {ref_name_current} at {}", checkpoint.id());
                Ok(MergeOutcome::Merged(checkpoint))
            }
            MergeResult::Conflicted { changes, conflict_count } => {
                let tree = self.current_save_tree()?;
                for change in &changes {
                    let bytes = match change {
                        Change::Conflict(Conflict { hash, .. }) => Some(self.object_store.read(hash)?),
                        Change::Creation(File { hash, .. }) | Change::Modification(File { hash, .. }) => {
                            Some(self.object_store.read(hash)?)
                        }
                        Change::Removal(_) => None,
                    };
                    let rel = tree.normalize_path(change.path())?;
                    let full = self.workspace.path().join(&rel);
                    match bytes {
                        Some(bytes) => {
                            if let Some(parent) = full.parent() {
                                std::fs::create_dir_all(parent)?;
                            }
                            std::fs::write(&full, bytes)?;
                        }
                        None => {
                            let _ = std::fs::remove_file(&full);
                        }
                    }
                }

                self.index.borrow_mut().extend(changes);
                self.metadata_store.write_index(&self.index.borrow())?;
                log::warn!("merge of {ref_name} into {ref_name_current} left {conflict_count} conflict(s)");
                Ok(MergeOutcome::Conflicts(conflict_count))
            }
        }
    }
}

impl Drop for Repository {
    fn drop(&mut self) {
        let _ = self.writer.borrow_mut().flush();
    }
}
