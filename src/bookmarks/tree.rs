use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use crate::model::{Bookmark, BookmarkNode, is_root_parent};

/// Deepest level a node may sit at below its root. Deeper nodes start a new
/// root, which keeps building, serializing and dropping the forest shallow
/// whatever chain of parent links was stored.
pub const MAX_TREE_DEPTH: usize = 128;

/// Rebuilds the folder hierarchy from a user's flat collection.
///
/// `parent_url` may hold a numeric id (records edited through the API) or a
/// folder title (records created by an html import); both resolve through
/// one lookup. Nodes whose parent cannot be found become roots, so nothing is
/// ever dropped. Every sibling list is ordered by `sort`, then `title`, then
/// `id`, which makes the output independent of input order. A node that
/// would sit [`MAX_TREE_DEPTH`] levels down is promoted to a root together
/// with its subtree.
pub fn build_tree(records: Vec<Bookmark>) -> Vec<BookmarkNode> {
    let lookup = build_lookup(&records);

    let mut parents: Vec<Option<usize>> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| resolve_parent(&lookup, &record.parent_url).filter(|&p| p != idx))
        .collect();
    break_cycles(&records, &mut parents);

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(idx),
            None => roots.push(idx),
        }
    }
    cap_depth(&mut roots, &mut children);

    let by_display_order = |a: &usize, b: &usize| display_order(&records[*a], &records[*b]);
    roots.sort_by(by_display_order);
    for siblings in children.iter_mut() {
        siblings.sort_by(by_display_order);
    }

    let mut slots: Vec<Option<Bookmark>> = records.into_iter().map(Some).collect();
    roots
        .iter()
        .filter_map(|&idx| materialize(idx, &children, &mut slots))
        .collect()
}

/// Id keys first; folder titles only fill gaps, and among folders sharing a
/// title the lowest id claims it.
fn build_lookup(records: &[Bookmark]) -> HashMap<String, usize> {
    let mut lookup: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        lookup.insert(record.id.to_string(), idx);
    }

    let mut folders: Vec<usize> = (0..records.len()).filter(|&idx| records[idx].is_folder).collect();
    folders.sort_by_key(|&idx| records[idx].id);
    for idx in folders {
        lookup.entry(records[idx].title.clone()).or_insert(idx);
    }
    lookup
}

fn resolve_parent(lookup: &HashMap<String, usize>, parent_url: &str) -> Option<usize> {
    if is_root_parent(parent_url) {
        return None;
    }
    if let Some(&idx) = lookup.get(parent_url) {
        return Some(idx);
    }
    // "007" and "+7" still mean id 7
    parent_url
        .parse::<i64>()
        .ok()
        .and_then(|id| lookup.get(&id.to_string()).copied())
}

/// Parent links edited by hand can form loops, which would leave every
/// member unreachable from a root. The lowest id of each loop is promoted.
///
/// Each node is coloured once: `Open` while it is on the chain being walked,
/// `Done` after its ancestry is known to end at a root.
fn break_cycles(records: &[Bookmark], parents: &mut [Option<usize>]) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    let mut marks = vec![Mark::New; parents.len()];
    let mut chain: Vec<usize> = Vec::new();
    for start in 0..parents.len() {
        let mut current = Some(start);
        while let Some(idx) = current {
            match marks[idx] {
                Mark::Done => break,
                Mark::Open => {
                    // idx is on the chain, so the chain from idx onwards is a loop
                    let from = chain.iter().position(|&n| n == idx).unwrap_or(0);
                    if let Some(&lowest) = chain[from..].iter().min_by_key(|&&n| records[n].id) {
                        parents[lowest] = None;
                    }
                    break;
                }
                Mark::New => {
                    marks[idx] = Mark::Open;
                    chain.push(idx);
                    current = parents[idx];
                }
            }
        }
        for idx in chain.drain(..) {
            marks[idx] = Mark::Done;
        }
    }
}

/// Walks the forest breadth first and re-roots every node that would land
/// at `MAX_TREE_DEPTH`.
fn cap_depth(roots: &mut Vec<usize>, children: &mut [Vec<usize>]) {
    let mut queue: VecDeque<(usize, usize)> = roots.iter().map(|&idx| (idx, 0)).collect();
    while let Some((idx, depth)) = queue.pop_front() {
        if depth + 1 < MAX_TREE_DEPTH {
            queue.extend(children[idx].iter().map(|&child| (child, depth + 1)));
            continue;
        }
        for child in std::mem::take(&mut children[idx]) {
            roots.push(child);
            queue.push_back((child, 0));
        }
    }
}

fn display_order(a: &Bookmark, b: &Bookmark) -> Ordering {
    a.sort
        .cmp(&b.sort)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

fn materialize(idx: usize, children: &[Vec<usize>], slots: &mut [Option<Bookmark>]) -> Option<BookmarkNode> {
    let bookmark = slots[idx].take()?;
    let mut node = BookmarkNode::new(bookmark);
    node.children = children[idx]
        .iter()
        .filter_map(|&child| materialize(child, children, slots))
        .collect();
    Some(node)
}
