//! Three-way merge: fast-forward detection, ancestor replay, conflicts
//!
//! Conflict detection compares each incoming change only against the ref
//! side's own changes since the common ancestor — not against the whole
//! ancestor tree — so a path neither side touched is never flagged just
//! because it happens to carry content already.

use crate::artifacts::change::{Change, Conflict};
use crate::artifacts::hash::Hash;
use crate::artifacts::save::Save;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub enum MergeResult {
    FastForward { tip: Hash },
    Clean { changes: Vec<Change> },
    Conflicted { changes: Vec<Change>, conflict_count: usize },
}

/// `read_object` reads content by hash (to build conflict markers).
/// `write_marker` stores new marker bytes and returns their hash.
/// `ref_name`/`incoming_name` label the two sides in conflict markers and
/// messages.
pub fn plan_merge(
    ref_name: &str,
    incoming_name: &str,
    current_save: Option<&Save>,
    incoming_save: &Save,
    read_object: impl Fn(&Hash) -> anyhow::Result<Vec<u8>>,
    mut write_marker: impl FnMut(&[u8]) -> anyhow::Result<Hash>,
) -> anyhow::Result<MergeResult> {
    let Some(current_save) = current_save else {
        return Ok(MergeResult::FastForward {
            tip: incoming_save.tip().id().clone(),
        });
    };

    if incoming_save.contains(current_save) {
        return Ok(MergeResult::FastForward {
            tip: incoming_save.tip().id().clone(),
        });
    }

    let ancestor = current_save.first_common_checkpoint_parent(incoming_save);

    let mut ref_latest: BTreeMap<PathBuf, Change> = BTreeMap::new();
    for change in current_save.changes_since(ancestor) {
        ref_latest.insert(change.path().to_path_buf(), change.clone());
    }

    let mut incoming_latest: BTreeMap<PathBuf, Change> = BTreeMap::new();
    for change in incoming_save.changes_since(ancestor) {
        incoming_latest.insert(change.path().to_path_buf(), change.clone());
    }

    let mut result_changes = Vec::new();
    let mut conflict_count = 0;

    for (path, incoming_change) in incoming_latest {
        match ref_latest.get(&path) {
            Some(ref_change) if ref_change.conflicts_with(&incoming_change) => {
                conflict_count += 1;
                result_changes.push(build_conflict(
                    ref_name,
                    incoming_name,
                    ref_change,
                    &incoming_change,
                    &read_object,
                    &mut write_marker,
                )?);
            }
            _ => result_changes.push(incoming_change),
        }
    }

    if conflict_count > 0 {
        Ok(MergeResult::Conflicted {
            changes: result_changes,
            conflict_count,
        })
    } else {
        Ok(MergeResult::Clean {
            changes: result_changes,
        })
    }
}

fn build_conflict(
    ref_name: &str,
    incoming_name: &str,
    ref_change: &Change,
    incoming_change: &Change,
    read_object: &impl Fn(&Hash) -> anyhow::Result<Vec<u8>>,
    write_marker: &mut impl FnMut(&[u8]) -> anyhow::Result<Hash>,
) -> anyhow::Result<Change> {
    let path = incoming_change.path().to_path_buf();

    if incoming_change.is_removal() {
        let hash = ref_change
            .hash()
            .ok_or_else(|| anyhow::anyhow!("conflicting ref change has no content"))?
            .clone();
        return Ok(Change::Conflict(Conflict {
            path,
            hash,
            message: format!("Removed at \"{incoming_name}\" but modified at \"{ref_name}\"."),
            temporary: false,
        }));
    }

    if ref_change.is_removal() {
        let hash = incoming_change
            .hash()
            .ok_or_else(|| anyhow::anyhow!("conflicting incoming change has no content"))?
            .clone();
        return Ok(Change::Conflict(Conflict {
            path,
            hash,
            message: format!("Removed at \"{ref_name}\" but modified at \"{incoming_name}\"."),
            temporary: false,
        }));
    }

    let ref_bytes = read_object(ref_change.hash().expect("checked non-removal above"))?;
    let incoming_bytes = read_object(incoming_change.hash().expect("checked non-removal above"))?;

    let mut marker = Vec::new();
    marker.extend_from_slice(format!("<{ref_name}>\n").as_bytes());
    marker.extend_from_slice(&ref_bytes);
    marker.extend_from_slice(format!("\n</{ref_name}>\n<{incoming_name}>\n").as_bytes());
    marker.extend_from_slice(&incoming_bytes);
    marker.extend_from_slice(format!("\n</{incoming_name}>\n").as_bytes());

    let hash = write_marker(&marker)?;
    Ok(Change::Conflict(Conflict {
        path,
        hash,
        message: "Conflict.".to_string(),
        temporary: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::change::File;
    use crate::artifacts::checkpoint::Checkpoint;
    use chrono::{DateTime, FixedOffset};
    use std::collections::HashMap;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-07-28T10:00:00+00:00").unwrap()
    }

    fn store() -> HashMap<Hash, Vec<u8>> {
        HashMap::new()
    }

    #[test]
    fn fast_forward_when_incoming_contains_current() {
        let base = Checkpoint::new("base", None, now(), vec![]);
        let tip = Checkpoint::new("tip", Some(base.id().clone()), now(), vec![]);
        let mut checkpoints = HashMap::new();
        checkpoints.insert(base.id().clone(), base.clone());
        checkpoints.insert(tip.id().clone(), tip.clone());

        let fetch = |id: &Hash| checkpoints.get(id).cloned().ok_or_else(|| anyhow::anyhow!("missing"));
        let current = Save::load(base.id(), fetch).unwrap();
        let incoming = Save::load(tip.id(), fetch).unwrap();

        let mut objects = store();
        let result = plan_merge(
            "main",
            "topic",
            Some(&current),
            &incoming,
            |h| objects.get(h).cloned().ok_or_else(|| anyhow::anyhow!("missing object")),
            |bytes| {
                let h = Hash::of(bytes);
                objects.insert(h.clone(), bytes.to_vec());
                Ok(h)
            },
        )
        .unwrap();

        assert!(matches!(result, MergeResult::FastForward { tip } if tip == *tip_id_of(&incoming)));
    }

    fn tip_id_of(save: &Save) -> &Hash {
        save.tip().id()
    }

    #[test]
    fn divergent_modifications_to_the_same_path_conflict() {
        let base = Checkpoint::new("base", None, now(), vec![]);
        let ref_tip = Checkpoint::new(
            "ref change",
            Some(base.id().clone()),
            now(),
            vec![Change::Creation(File {
                path: PathBuf::from("/repo/a.txt"),
                hash: Hash::of(b"ref content"),
            })],
        );
        let incoming_tip = Checkpoint::new(
            "incoming change",
            Some(base.id().clone()),
            now(),
            vec![Change::Creation(File {
                path: PathBuf::from("/repo/a.txt"),
                hash: Hash::of(b"incoming content"),
            })],
        );

        let mut checkpoints = HashMap::new();
        for c in [&base, &ref_tip, &incoming_tip] {
            checkpoints.insert(c.id().clone(), c.clone());
        }

        let fetch = |id: &Hash| checkpoints.get(id).cloned().ok_or_else(|| anyhow::anyhow!("missing"));
        let current = Save::load(ref_tip.id(), fetch).unwrap();
        let incoming = Save::load(incoming_tip.id(), fetch).unwrap();

        let mut objects: HashMap<Hash, Vec<u8>> = HashMap::new();
        objects.insert(Hash::of(b"ref content"), b"ref content".to_vec());
        objects.insert(Hash::of(b"incoming content"), b"incoming content".to_vec());

        let result = plan_merge(
            "main",
            "topic",
            Some(&current),
            &incoming,
            |h| objects.get(h).cloned().ok_or_else(|| anyhow::anyhow!("missing object")),
            |bytes| {
                let h = Hash::of(bytes);
                objects.insert(h.clone(), bytes.to_vec());
                Ok(h)
            },
        )
        .unwrap();

        match result {
            MergeResult::Conflicted { changes, conflict_count } => {
                assert_eq!(conflict_count, 1);
                assert_eq!(changes.len(), 1);
                assert!(changes[0].is_conflict());
                match &changes[0] {
                    Change::Conflict(c) => {
                        let bytes = objects.get(&c.hash).unwrap();
                        let text = String::from_utf8(bytes.clone()).unwrap();
                        assert!(text.starts_with("<main>\n"));
                        assert!(text.contains("</main>\n<topic>\n"));
                        assert!(text.ends_with("</topic>\n"));
                    }
                    _ => panic!("expected a conflict change"),
                }
            }
            _ => panic!("expected a conflict"),
        }
    }

    #[test]
    fn untouched_ref_paths_never_conflict() {
        let base = Checkpoint::new("base", None, now(), vec![]);
        let ref_tip = Checkpoint::new(
            "ref touches b.txt",
            Some(base.id().clone()),
            now(),
            vec![Change::Creation(File {
                path: PathBuf::from("/repo/b.txt"),
                hash: Hash::of(b"b"),
            })],
        );
        let incoming_tip = Checkpoint::new(
            "incoming touches a.txt",
            Some(base.id().clone()),
            now(),
            vec![Change::Creation(File {
                path: PathBuf::from("/repo/a.txt"),
                hash: Hash::of(b"a"),
            })],
        );

        let mut checkpoints = HashMap::new();
        for c in [&base, &ref_tip, &incoming_tip] {
            checkpoints.insert(c.id().clone(), c.clone());
        }
        let fetch = |id: &Hash| checkpoints.get(id).cloned().ok_or_else(|| anyhow::anyhow!("missing"));
        let current = Save::load(ref_tip.id(), fetch).unwrap();
        let incoming = Save::load(incoming_tip.id(), fetch).unwrap();

        let objects: HashMap<Hash, Vec<u8>> = HashMap::new();
        let mut objects = objects;
        let result = plan_merge(
            "main",
            "topic",
            Some(&current),
            &incoming,
            |h| objects.get(h).cloned().ok_or_else(|| anyhow::anyhow!("missing object")),
            |bytes| {
                let h = Hash::of(bytes);
                objects.insert(h.clone(), bytes.to_vec());
                Ok(h)
            },
        )
        .unwrap();

        match result {
            MergeResult::Clean { changes } => assert_eq!(changes.len(), 1),
            _ => panic!("expected a clean merge"),
        }
    }
}
