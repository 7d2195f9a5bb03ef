//! Checkpoints: the atoms of history
//!
//! A checkpoint is the canonical serialization of a message, a parent id
//! (empty for the very first checkpoint of a save), a timestamp, and an
//! ordered list of changes. The checkpoint's own id is the hash of that
//! serialization, so two checkpoints with identical content and parentage
//! are the same checkpoint.

use crate::artifacts::change::{Change, Conflict, File, FileRemoval};
use crate::artifacts::hash::Hash;
use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;

const TIMESTAMP_FORMAT: &str = "%m/%d %I:%M:%S%p '%y %z";

#[derive(Debug, Clone)]
pub struct Checkpoint {
    id: Hash,
    message: String,
    parent: Option<Hash>,
    created_at: DateTime<FixedOffset>,
    changes: Vec<Change>,
}

impl Checkpoint {
    pub fn new(
        message: impl Into<String>,
        parent: Option<Hash>,
        created_at: DateTime<FixedOffset>,
        changes: Vec<Change>,
    ) -> Self {
        let message = message.into();
        let bytes = Self::canonical_bytes(&message, parent.as_ref(), created_at, &changes);
        let id = Hash::of(&bytes);

        Checkpoint {
            id,
            message,
            parent,
            created_at,
            changes,
        }
    }

    pub fn id(&self) -> &Hash {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn parent(&self) -> Option<&Hash> {
        self.parent.as_ref()
    }

    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.created_at
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn serialize(&self) -> Vec<u8> {
        Self::canonical_bytes(&self.message, self.parent.as_ref(), self.created_at, &self.changes)
    }

    fn canonical_bytes(
        message: &str,
        parent: Option<&Hash>,
        created_at: DateTime<FixedOffset>,
        changes: &[Change],
    ) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(message);
        out.push('\n');
        out.push_str(parent.map(Hash::as_str).unwrap_or(""));
        out.push('\n');
        out.push_str(&created_at.format(TIMESTAMP_FORMAT).to_string());
        out.push_str("\n\nPlease do not edit the lines below.\n\n\nFiles:\n\n");

        for change in changes {
            out.push_str(&change_line(change));
            out.push('\n');
            if let Some(hash) = change.hash() {
                out.push_str(hash.as_str());
                out.push('\n');
            }
        }

        out.into_bytes()
    }

    pub fn parse(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = String::from_utf8(bytes.to_vec())?;
        let mut lines = text.lines();

        let message = lines.next().ok_or_else(|| anyhow::anyhow!("missing checkpoint message"))?.to_string();
        let parent_line = lines.next().ok_or_else(|| anyhow::anyhow!("missing checkpoint parent"))?;
        let parent = if parent_line.is_empty() {
            None
        } else {
            Some(Hash::try_parse(parent_line.to_string())?)
        };
        let created_at_line = lines.next().ok_or_else(|| anyhow::anyhow!("missing checkpoint timestamp"))?;
        let created_at = DateTime::parse_from_str(created_at_line, TIMESTAMP_FORMAT)?;

        // skip the blank line, the notice, and the two blank lines + "Files:" + blank line
        for _ in 0..6 {
            lines.next();
        }

        let mut changes = Vec::new();
        let rest: Vec<&str> = lines.collect();
        let mut i = 0;
        while i < rest.len() {
            let header = rest[i];
            i += 1;
            let (path_str, rest_header) = header
                .split_once('\t')
                .ok_or_else(|| anyhow::anyhow!("malformed change header: {header}"))?;
            let path = PathBuf::from(path_str);

            let change = if let Some(msg) = rest_header.strip_prefix("(conflicted)\t") {
                let hash_line = rest.get(i).ok_or_else(|| anyhow::anyhow!("missing conflict hash"))?;
                i += 1;
                Change::Conflict(Conflict {
                    path,
                    hash: Hash::try_parse(hash_line.to_string())?,
                    temporary: msg == "Conflict.",
                    message: msg.to_string(),
                })
            } else if rest_header == "(created)" {
                let hash_line = rest.get(i).ok_or_else(|| anyhow::anyhow!("missing created hash"))?;
                i += 1;
                Change::Creation(File {
                    path,
                    hash: Hash::try_parse(hash_line.to_string())?,
                })
            } else if rest_header == "(modified)" {
                let hash_line = rest.get(i).ok_or_else(|| anyhow::anyhow!("missing modified hash"))?;
                i += 1;
                Change::Modification(File {
                    path,
                    hash: Hash::try_parse(hash_line.to_string())?,
                })
            } else if rest_header == "(removed)" {
                Change::Removal(FileRemoval { path })
            } else {
                anyhow::bail!("unknown change kind in header: {header}");
            };

            changes.push(change);
        }

        Ok(Checkpoint::new(message, parent, created_at, changes))
    }
}

fn change_line(change: &Change) -> String {
    match change {
        Change::Creation(f) => format!("{}\t(created)", f.path.display()),
        Change::Modification(f) => format!("{}\t(modified)", f.path.display()),
        Change::Removal(r) => format!("{}\t(removed)", r.path.display()),
        Change::Conflict(c) => format!("{}\t(conflicted)\t{}", c.path.display(), c.message),
    }
}
