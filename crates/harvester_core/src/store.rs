use std::collections::{HashMap, HashSet};

use crate::{CommentId, CommentRecord};

/// Deduplicated comment tree accumulated during one crawl session.
///
/// Records are keyed by identity and never removed; child lists keep
/// discovery order and reject identities they already contain.
#[derive(Debug, Clone, Default)]
pub struct CommentStore {
    by_id: HashMap<CommentId, CommentRecord>,
    roots: Vec<CommentId>,
    children_of: HashMap<CommentId, ChildList>,
}

#[derive(Debug, Clone, Default)]
struct ChildList {
    order: Vec<CommentId>,
    seen: HashSet<CommentId>,
}

impl ChildList {
    fn push(&mut self, child: CommentId) -> bool {
        if !self.seen.insert(child) {
            return false;
        }
        self.order.push(child);
        true
    }
}

impl CommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record. Returns `true` when the identity is new.
    ///
    /// A `children_loaded` flag already set on the stored record survives the
    /// overwrite.
    pub fn upsert(&mut self, mut record: CommentRecord) -> bool {
        match self.by_id.get_mut(&record.id) {
            Some(existing) => {
                record.children_loaded |= existing.children_loaded;
                *existing = record;
                false
            }
            None => {
                if record.is_root() {
                    self.roots.push(record.id);
                }
                self.by_id.insert(record.id, record);
                true
            }
        }
    }

    /// Append `child` under `parent`. Appending an identity twice is a no-op.
    pub fn append_child(&mut self, parent: CommentId, child: CommentId) -> bool {
        self.children_of.entry(parent).or_default().push(child)
    }

    /// Number of distinct top-level comments.
    pub fn size(&self) -> usize {
        self.roots.len()
    }

    /// Number of distinct records of any depth.
    pub fn total_records(&self) -> usize {
        self.by_id.len()
    }

    pub fn get(&self, id: CommentId) -> Option<&CommentRecord> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: CommentId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Mark the replies of `id` as fully loaded. Returns `false` for unknown ids.
    pub fn mark_children_loaded(&mut self, id: CommentId) -> bool {
        match self.by_id.get_mut(&id) {
            Some(record) => {
                record.children_loaded = true;
                true
            }
            None => false,
        }
    }

    pub fn children_loaded(&self, id: CommentId) -> bool {
        self.by_id.get(&id).is_some_and(|r| r.children_loaded)
    }

    /// Child identities of `parent` in discovery order.
    pub fn children(&self, parent: CommentId) -> &[CommentId] {
        self.children_of
            .get(&parent)
            .map(|list| list.order.as_slice())
            .unwrap_or(&[])
    }

    pub fn child_count(&self, parent: CommentId) -> usize {
        self.children(parent).len()
    }

    /// Top-level identities in discovery order.
    pub fn root_ids(&self) -> &[CommentId] {
        &self.roots
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.roots.clear();
        self.children_of.clear();
    }
}
