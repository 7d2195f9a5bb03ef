//! Persistence of index, refs, head, and checkpoint files
//!
//! Every write here goes through a temp-file-then-rename so a crash never
//! leaves a half-written metadata file in place. This module only knows
//! how to read and write the textual formats from the repository layout;
//! it has no opinion about what any of it means — that belongs to
//! `Repository`.

use crate::artifacts::change::{Change, Conflict, File, FileRemoval};
use crate::artifacts::checkpoint::Checkpoint;
use crate::artifacts::hash::Hash;
use anyhow::Context;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

const SAVES_DIR: &str = "saves";
const INDEX_FILE: &str = "index";
const REFS_FILE: &str = "refs";
const HEAD_FILE: &str = "head";

#[derive(Debug)]
pub struct MetadataStore {
    path: Box<Path>,
}

impl MetadataStore {
    pub fn new(path: Box<Path>) -> Self {
        MetadataStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.path.join(SAVES_DIR)
    }

    pub fn initialize(&self, initial_ref_name: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.saves_dir())
            .with_context(|| format!("unable to create saves directory under {}", self.path.display()))?;

        let mut refs = BTreeMap::new();
        refs.insert(initial_ref_name.to_string(), None);
        self.write_refs(&refs)?;
        self.write_head(initial_ref_name)?;
        self.write_index(&[])?;

        Ok(())
    }

    // --- checkpoints ---

    pub fn write_checkpoint(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        let path = self.saves_dir().join(checkpoint.id().as_str());
        if path.exists() {
            return Ok(());
        }
        atomic_write(&path, &checkpoint.serialize())
    }

    pub fn read_checkpoint(&self, id: &Hash) -> anyhow::Result<Checkpoint> {
        let path = self.saves_dir().join(id.as_str());
        let bytes = std::fs::read(&path)
            .with_context(|| format!("unable to read checkpoint file {}", path.display()))?;
        Checkpoint::parse(&bytes)
    }

    // --- index ---

    pub fn read_index(&self) -> anyhow::Result<Vec<Change>> {
        let path = self.path.join(INDEX_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("unable to read index file {}", path.display()))?;
        parse_change_lines(strip_header(&text, "Tracked files:"))
    }

    pub fn write_index(&self, changes: &[Change]) -> anyhow::Result<()> {
        let path = self.path.join(INDEX_FILE);
        let mut out = String::from("Tracked files:\n\n");
        out.push_str(&serialize_change_lines(changes));
        atomic_write(&path, out.as_bytes())
    }

    // --- refs ---

    pub fn read_refs(&self) -> anyhow::Result<BTreeMap<String, Option<Hash>>> {
        let path = self.path.join(REFS_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("unable to read refs file {}", path.display()))?;

        let mut refs = BTreeMap::new();
        for line in strip_header(&text, "Refs:").lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (name, id) = line
                .split_once('\t')
                .ok_or_else(|| anyhow::anyhow!("malformed refs line: {line}"))?;
            let id = if id.is_empty() {
                None
            } else {
                Some(Hash::try_parse(id.to_string())?)
            };
            refs.insert(name.to_string(), id);
        }
        Ok(refs)
    }

    pub fn write_refs(&self, refs: &BTreeMap<String, Option<Hash>>) -> anyhow::Result<()> {
        let path = self.path.join(REFS_FILE);
        let mut out = String::from("Refs:\r\n\r\n");
        for (name, id) in refs {
            out.push_str(name);
            out.push('\t');
            out.push_str(id.as_ref().map(Hash::as_str).unwrap_or(""));
            out.push_str("\r\n");
        }
        atomic_write(&path, out.as_bytes())
    }

    // --- head ---

    pub fn read_head(&self) -> anyhow::Result<String> {
        let path = self.path.join(HEAD_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("unable to read head file {}", path.display()))?;
        Ok(content.trim().to_string())
    }

    pub fn write_head(&self, value: &str) -> anyhow::Result<()> {
        let path = self.path.join(HEAD_FILE);
        atomic_write(&path, value.as_bytes())
    }
}

fn strip_header<'a>(text: &'a str, header: &str) -> &'a str {
    text.strip_prefix(header)
        .map(|rest| rest.trim_start_matches(['\r', '\n']))
        .unwrap_or(text)
}

fn serialize_change_lines(changes: &[Change]) -> String {
    let mut out = String::new();
    for change in changes {
        match change {
            Change::Creation(f) => {
                out.push_str(&format!("{}\t(created)\n", f.path.display()));
                out.push_str(f.hash.as_str());
                out.push('\n');
            }
            Change::Modification(f) => {
                out.push_str(&format!("{}\t(modified)\n", f.path.display()));
                out.push_str(f.hash.as_str());
                out.push('\n');
            }
            Change::Removal(r) => {
                out.push_str(&format!("{}\t(removed)\n", r.path.display()));
            }
            Change::Conflict(c) => {
                out.push_str(&format!("{}\t(conflicted)\t{}\n", c.path.display(), c.message));
                out.push_str(c.hash.as_str());
                out.push('\n');
            }
        }
    }
    out
}

fn parse_change_lines(text: &str) -> anyhow::Result<Vec<Change>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut changes = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let header = lines[i];
        i += 1;
        if header.trim().is_empty() {
            continue;
        }

        let (path_str, rest) = header
            .split_once('\t')
            .ok_or_else(|| anyhow::anyhow!("malformed index line: {header}"))?;
        let path = PathBuf::from(path_str);

        let change = if let Some(msg) = rest.strip_prefix("(conflicted)\t") {
            let hash_line = lines.get(i).ok_or_else(|| anyhow::anyhow!("missing conflict hash"))?;
            i += 1;
            Change::Conflict(Conflict {
                path,
                hash: Hash::try_parse(hash_line.to_string())?,
                temporary: msg == "Conflict.",
                message: msg.to_string(),
            })
        } else if rest == "(created)" {
            let hash_line = lines.get(i).ok_or_else(|| anyhow::anyhow!("missing created hash"))?;
            i += 1;
            Change::Creation(File {
                path,
                hash: Hash::try_parse(hash_line.to_string())?,
            })
        } else if rest == "(modified)" {
            let hash_line = lines.get(i).ok_or_else(|| anyhow::anyhow!("missing modified hash"))?;
            i += 1;
            Change::Modification(File {
                path,
                hash: Hash::try_parse(hash_line.to_string())?,
            })
        } else if rest == "(removed)" {
            Change::Removal(FileRemoval { path })
        } else {
            anyhow::bail!("unknown change kind in index line: {header}");
        };

        changes.push(change);
    }

    Ok(changes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid metadata path {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("unable to create directory {}", parent.display()))?;

    let temp_path = parent.join(format!(
        "tmp-{}-{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id()
    ));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("unable to open temp file {}", temp_path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("unable to write temp file {}", temp_path.display()))?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("unable to rename {} into place", path.display()))?;

    Ok(())
}
