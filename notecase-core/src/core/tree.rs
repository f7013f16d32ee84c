//! Pure conversion of flat parent-linked records into a nested, ordered tree.
//!
//! The tree is never maintained incrementally: callers rebuild it from the
//! flat collection after every change. Building never fails. Malformed input
//! degrades as follows:
//!
//! - an item whose `parent_id` names an id that is not in the input (or
//!   names the item itself) becomes a root at depth 0;
//! - items caught in a parent cycle are unreachable from any root, so the
//!   first of them (by position, then id) is promoted to a root and the rest
//!   of the cycle hangs beneath it;
//! - when two items share an id, only the first one is kept.
//!
//! With unique ids the total node count always equals the input length.

use crate::{Folder, FolderId, Note};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Anything that can be arranged by [`build_tree`].
pub trait TreeItem {
    fn id(&self) -> i64;
    fn parent_id(&self) -> Option<i64>;
    fn position(&self) -> i32;
}

impl TreeItem for Folder {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn position(&self) -> i32 {
        self.position
    }
}

/// A node of the display tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    /// Child nodes, ascending by position.
    pub children: Vec<TreeNode<T>>,
    /// Distance from the root level; roots are at depth 0.
    pub depth: usize,
    pub has_children: bool,
}

impl<T: TreeItem> TreeNode<T> {
    /// Depth-first search for the node with `id` in this subtree.
    pub fn find(&self, id: i64) -> Option<&TreeNode<T>> {
        if self.item.id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// One record of a pre-order walk over a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatEntry {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub position: i32,
}

impl TreeItem for FlatEntry {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn position(&self) -> i32 {
        self.position
    }
}

fn sort_key<T: TreeItem>(item: &T) -> (i32, i64) {
    (item.position(), item.id())
}

/// Builds the nested tree for `items`, ordered by position within every sibling group.
pub fn build_tree<T: TreeItem + Clone>(items: &[T]) -> Vec<TreeNode<T>> {
    let mut by_id: HashMap<i64, &T> = HashMap::with_capacity(items.len());
    for item in items {
        by_id.entry(item.id()).or_insert(item);
    }

    let mut groups: HashMap<Option<i64>, Vec<&T>> = HashMap::new();
    for item in by_id.values() {
        let parent = item
            .parent_id()
            .filter(|pid| *pid != item.id() && by_id.contains_key(pid));
        groups.entry(parent).or_default().push(item);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|item| sort_key(*item));
    }

    let mut visited = HashSet::with_capacity(by_id.len());
    let mut roots = Vec::new();
    if let Some(top) = groups.get(&None) {
        for item in top {
            roots.push(build_node(*item, 0, &groups, &mut visited));
        }
    }

    // Whatever is left sits on a parent cycle.
    let mut stranded: Vec<&T> = by_id
        .values()
        .filter(|item| !visited.contains(&item.id()))
        .copied()
        .collect();
    if !stranded.is_empty() {
        stranded.sort_by_key(|item| sort_key(*item));
        for item in stranded {
            if !visited.contains(&item.id()) {
                roots.push(build_node(item, 0, &groups, &mut visited));
            }
        }
        roots.sort_by_key(|node| sort_key(&node.item));
    }

    roots
}

fn build_node<T: TreeItem + Clone>(
    item: &T,
    depth: usize,
    groups: &HashMap<Option<i64>, Vec<&T>>,
    visited: &mut HashSet<i64>,
) -> TreeNode<T> {
    visited.insert(item.id());
    let mut children = Vec::new();
    if let Some(kids) = groups.get(&Some(item.id())) {
        for kid in kids {
            if !visited.contains(&kid.id()) {
                children.push(build_node(*kid, depth + 1, groups, visited));
            }
        }
    }
    TreeNode {
        item: item.clone(),
        has_children: !children.is_empty(),
        children,
        depth,
    }
}

/// Pre-order walk recording each node's tree parent and position.
pub fn flatten<T: TreeItem>(tree: &[TreeNode<T>]) -> Vec<FlatEntry> {
    fn walk<T: TreeItem>(nodes: &[TreeNode<T>], parent: Option<i64>, out: &mut Vec<FlatEntry>) {
        for node in nodes {
            out.push(FlatEntry {
                id: node.item.id(),
                parent_id: parent,
                position: node.item.position(),
            });
            walk(&node.children, Some(node.item.id()), out);
        }
    }

    let mut out = Vec::new();
    walk(tree, None, &mut out);
    out
}

/// Total number of nodes in `tree`, at every depth.
pub fn count_nodes<T>(tree: &[TreeNode<T>]) -> usize {
    tree.iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}

/// Notes bucketed by the folder that displays them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteGroups {
    /// Notes per existing folder, ascending by position.
    pub by_folder: BTreeMap<FolderId, Vec<Note>>,
    /// Notes with no folder, or whose folder does not exist, ascending by position.
    pub unfiled: Vec<Note>,
}

/// Groups `notes` under the folders in `folders`, applying the same orphan
/// policy as [`build_tree`]: a note pointing at a missing folder is unfiled.
pub fn group_notes(notes: &[Note], folders: &[Folder]) -> NoteGroups {
    let known: HashSet<FolderId> = folders.iter().map(|f| f.id).collect();
    let mut groups = NoteGroups::default();
    for note in notes {
        match note.folder_id.filter(|fid| known.contains(fid)) {
            Some(fid) => groups.by_folder.entry(fid).or_default().push(note.clone()),
            None => groups.unfiled.push(note.clone()),
        }
    }
    for bucket in groups.by_folder.values_mut() {
        bucket.sort_by_key(|n| (n.position, n.id));
    }
    groups.unfiled.sort_by_key(|n| (n.position, n.id));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, parent_id: Option<i64>, position: i32) -> FlatEntry {
        FlatEntry {
            id,
            parent_id,
            position,
        }
    }

    fn folder(id: i64, parent_id: Option<i64>, position: i32, name: &str) -> Folder {
        Folder {
            id,
            name: name.to_string(),
            parent_id,
            position,
            is_favorite: false,
            is_public: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn ids<T: TreeItem>(nodes: &[TreeNode<T>]) -> Vec<i64> {
        nodes.iter().map(|n| n.item.id()).collect()
    }

    #[test]
    fn test_root_with_single_child() {
        let folders = vec![
            folder(1, None, 0, "Root"),
            folder(2, Some(1), 0, "Child"),
        ];
        let tree = build_tree(&folders);

        assert_eq!(tree.len(), 1);
        let root = &tree[0];
        assert_eq!(root.item.id, 1);
        assert_eq!(root.depth, 0);
        assert!(root.has_children);
        assert_eq!(root.children.len(), 1);

        let child = &root.children[0];
        assert_eq!(child.item.id, 2);
        assert_eq!(child.depth, 1);
        assert!(!child.has_children);
        assert!(child.children.is_empty());
    }

    #[test]
    fn test_siblings_sorted_by_position_then_id() {
        let items = vec![
            entry(10, None, 2),
            entry(11, None, 0),
            entry(12, None, 1),
            entry(20, Some(11), 5),
            entry(21, Some(11), 1),
            entry(19, Some(11), 1),
        ];
        let tree = build_tree(&items);
        assert_eq!(ids(&tree), vec![11, 12, 10]);
        assert_eq!(ids(&tree[0].children), vec![19, 21, 20]);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let items = vec![entry(1, None, 1), entry(2, Some(99), 0)];
        let tree = build_tree(&items);
        assert_eq!(ids(&tree), vec![2, 1]);
        assert_eq!(tree[0].depth, 0);
        assert_eq!(count_nodes(&tree), 2);
    }

    #[test]
    fn test_self_parent_becomes_root() {
        let tree = build_tree(&[entry(5, Some(5), 0)]);
        assert_eq!(ids(&tree), vec![5]);
        assert!(!tree[0].has_children);
    }

    #[test]
    fn test_parent_cycle_keeps_every_node_once() {
        // 1 -> 2 -> 3 -> 1, with 4 hanging under 3.
        let items = vec![
            entry(1, Some(3), 0),
            entry(2, Some(1), 0),
            entry(3, Some(2), 0),
            entry(4, Some(3), 1),
            entry(7, None, 3),
        ];
        let tree = build_tree(&items);
        assert_eq!(count_nodes(&tree), items.len());
        assert_eq!(ids(&tree), vec![1, 7]);
        let one = &tree[0];
        assert_eq!(one.find(4).map(|n| n.depth), Some(3));
    }

    #[test]
    fn test_empty_input() {
        let tree = build_tree::<FlatEntry>(&[]);
        assert!(tree.is_empty());
        assert!(flatten(&tree).is_empty());
    }

    #[test]
    fn test_flatten_is_pre_order() {
        let items = vec![
            entry(1, None, 0),
            entry(2, Some(1), 0),
            entry(3, Some(2), 0),
            entry(4, None, 1),
        ];
        let flat = flatten(&build_tree(&items));
        assert_eq!(flat.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(flat[2].parent_id, Some(2));
    }

    #[test]
    fn test_flatten_then_build_reproduces_tree() {
        let items = vec![
            entry(1, None, 3),
            entry(2, Some(1), 1),
            entry(3, Some(1), 0),
            entry(4, Some(3), 0),
            entry(5, Some(404), 0),
            entry(6, None, 1),
        ];
        let tree = build_tree(&items);
        let rebuilt = build_tree(&flatten(&tree));
        assert_eq!(flatten(&rebuilt), flatten(&tree));
        assert_eq!(count_nodes(&rebuilt), items.len());
    }

    #[test]
    fn test_tree_node_serializes_flattened_item() {
        let tree = build_tree(&[folder(1, None, 0, "Inbox")]);
        let json = serde_json::to_value(&tree[0]).unwrap();
        assert_eq!(json["name"], "Inbox");
        assert_eq!(json["hasChildren"], false);
        assert_eq!(json["depth"], 0);
    }

    #[test]
    fn test_group_notes_applies_orphan_policy() {
        let folders = vec![folder(1, None, 0, "A")];
        let note = |id, folder_id, position| Note {
            id,
            title: format!("n{id}"),
            content: String::new(),
            folder_id,
            position,
            is_favorite: false,
            is_public: false,
            created_at: 0,
            updated_at: 0,
        };
        let notes = vec![
            note(1, Some(1), 1),
            note(2, Some(1), 0),
            note(3, None, 0),
            note(4, Some(42), 0),
        ];
        let groups = group_notes(&notes, &folders);
        let in_a: Vec<_> = groups.by_folder[&1].iter().map(|n| n.id).collect();
        assert_eq!(in_a, vec![2, 1]);
        let unfiled: Vec<_> = groups.unfiled.iter().map(|n| n.id).collect();
        assert_eq!(unfiled, vec![3, 4]);
    }
}
