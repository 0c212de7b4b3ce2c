use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{CommentRecord, CommentStore};

/// Source description attached to every export.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub source_title: String,
    pub link: String,
    pub captured_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNode {
    #[serde(flatten)]
    pub record: CommentRecord,
    pub children: Vec<CommentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportTree {
    pub roots: Vec<ExportNode>,
}

impl ExportTree {
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn comment_count(&self) -> usize {
        self.roots.iter().map(|node| 1 + node.children.len()).sum()
    }
}

/// Materialize roots (discovery order) with their ordered children.
///
/// An identity is emitted at most once across the whole tree, whichever
/// position sees it first.
pub fn build_export_tree(store: &CommentStore, max_roots: Option<usize>) -> ExportTree {
    let limit = max_roots.unwrap_or(usize::MAX);
    let mut emitted = HashSet::new();
    let mut roots = Vec::new();

    for &root_id in store.root_ids().iter().take(limit) {
        let Some(record) = store.get(root_id) else {
            continue;
        };
        if !emitted.insert(root_id) {
            continue;
        }
        let children = store
            .children(root_id)
            .iter()
            .filter_map(|child| store.get(*child))
            .filter(|child| emitted.insert(child.id))
            .cloned()
            .collect();
        roots.push(ExportNode {
            record: record.clone(),
            children,
        });
    }

    ExportTree { roots }
}
