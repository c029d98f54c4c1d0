//! Folder hierarchy helpers.
//!
//! Folders are stored flat with a nullable `parent_id`. The tree is rebuilt
//! on the client whenever a section's folders are listed.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::models::Folder;

/// A folder together with its nested children.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FolderNode {
    #[serde(flatten)]
    pub folder: Folder,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Number of folders in this subtree, including the node itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(FolderNode::size).sum::<usize>()
    }

    /// Renders the subtree as indented lines, two spaces per level.
    pub fn render(&self, depth: usize, out: &mut Vec<String>) {
        out.push(format!(
            "{}{}  ({})",
            "  ".repeat(depth),
            self.folder.name,
            self.folder.id
        ));
        for child in &self.children {
            child.render(depth + 1, out);
        }
    }
}

/// Builds the folder forest from a flat list.
///
/// Roots and siblings keep their input order. A folder whose `parent_id`
/// names no folder in `folders` is dropped together with its subtree.
pub fn build_folder_tree(folders: &[Folder]) -> Vec<FolderNode> {
    let known: HashSet<Uuid> = folders.iter().map(|f| f.id).collect();

    let mut children_of: HashMap<Uuid, Vec<&Folder>> = HashMap::new();
    let mut roots: Vec<&Folder> = Vec::new();

    for folder in folders {
        match folder.parent_id {
            Some(parent) if known.contains(&parent) => {
                children_of.entry(parent).or_default().push(folder)
            }
            Some(_) => {}
            None => roots.push(folder),
        }
    }

    // Folders caught in a parent cycle never reach a root and are dropped.
    let mut visited = HashSet::new();
    roots
        .into_iter()
        .filter_map(|f| attach(f, &children_of, &mut visited))
        .collect()
}

fn attach(
    folder: &Folder,
    children_of: &HashMap<Uuid, Vec<&Folder>>,
    visited: &mut HashSet<Uuid>,
) -> Option<FolderNode> {
    if !visited.insert(folder.id) {
        return None;
    }
    let children = children_of
        .get(&folder.id)
        .map(|kids| {
            kids.iter()
                .filter_map(|k| attach(k, children_of, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(FolderNode {
        folder: folder.clone(),
        children,
    })
}

/// Depth-first, pre-order listing of the folders below `parent`, each with
/// its nesting level (starting at `level`).
pub fn flatten_folder_tree(
    folders: &[Folder],
    parent: Option<Uuid>,
    level: usize,
) -> Vec<(Folder, usize)> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    flatten_into(folders, parent, level, &mut visited, &mut out);
    out
}

fn flatten_into(
    folders: &[Folder],
    parent: Option<Uuid>,
    level: usize,
    visited: &mut HashSet<Uuid>,
    out: &mut Vec<(Folder, usize)>,
) {
    for folder in folders.iter().filter(|f| f.parent_id == parent) {
        if !visited.insert(folder.id) {
            continue;
        }
        out.push((folder.clone(), level));
        flatten_into(folders, Some(folder.id), level + 1, visited, out);
    }
}

/// Ids of `root` and every folder nested below it.
pub fn descendant_ids(folders: &[Folder], root: Uuid) -> HashSet<Uuid> {
    let mut ids = HashSet::new();
    ids.insert(root);
    let mut frontier = vec![root];
    while let Some(current) = frontier.pop() {
        for f in folders.iter().filter(|f| f.parent_id == Some(current)) {
            if ids.insert(f.id) {
                frontier.push(f.id);
            }
        }
    }
    ids
}
