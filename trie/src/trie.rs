use std::collections::HashMap;
use std::str;

use tracing::{debug, trace};

use crate::error::Result;

const TRIE_LOG_TARGET: &str = "trie";

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    is_word: bool,
}

impl TrieNode {
    // Ends another key or branches toward one, so a delete passing through must keep it.
    fn is_needed(&self) -> bool {
        self.is_word || self.children.len() > 1
    }
}

// A key nests one node per code point, so dropping, cloning and comparing
// walk an explicit stack instead of recursing once per level.
impl Drop for TrieNode {
    fn drop(&mut self) {
        let mut stack: Vec<TrieNode> = self.children.drain().map(|(_, child)| child).collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.children.drain().map(|(_, child)| child));
        }
    }
}

impl Clone for TrieNode {
    fn clone(&self) -> Self {
        // Pre-order copy of every node without its children, so each parent
        // sits at a lower index than all of its descendants.
        let mut shells = vec![TrieNode {
            children: HashMap::with_capacity(self.children.len()),
            is_word: self.is_word,
        }];
        let mut links: Vec<(usize, char)> = Vec::new();
        let mut stack: Vec<(usize, char, &TrieNode)> = self
            .children
            .iter()
            .map(|(char, child)| (0, *char, child))
            .collect();
        while let Some((parent, edge, node)) = stack.pop() {
            let index = shells.len();
            shells.push(TrieNode {
                children: HashMap::with_capacity(node.children.len()),
                is_word: node.is_word,
            });
            links.push((parent, edge));
            stack.extend(
                node.children
                    .iter()
                    .map(|(char, child)| (index, *char, child)),
            );
        }

        // Rebuild from the back: a node is complete once every later index is attached.
        while let Some(node) = shells.pop() {
            let index = shells.len();
            if index == 0 {
                return node;
            }
            let (parent, edge) = links[index - 1];
            shells[parent].children.insert(edge, node);
        }
        TrieNode::default()
    }
}

impl PartialEq for TrieNode {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((left, right)) = stack.pop() {
            if left.is_word != right.is_word || left.children.len() != right.children.len() {
                return false;
            }
            for (char, child) in left.children.iter() {
                match right.children.get(char) {
                    None => return false,
                    Some(other_child) => stack.push((child, other_child)),
                }
            }
        }
        true
    }
}

impl Eq for TrieNode {}

/// A set of strings stored as a tree of code points.
///
/// Keys are taken as raw bytes and decoded as UTF-8. Every path from the root
/// spells a prefix of at least one stored key, and a node is marked as a word
/// exactly when the path leading to it was put and not deleted since.
///
/// Dropping, cloning and comparing handle keys of any length. The `Debug`
/// output nests one level per code point and is meant for small tries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trie {
    root: TrieNode,
}

impl Trie {
    /// Creates a trie holding no keys, not even the empty one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key`, creating one node per code point not already present.
    ///
    /// Fails with [`TrieError::InvalidEncoding`](crate::TrieError::InvalidEncoding)
    /// without touching the trie when `key` is not valid UTF-8. The empty key
    /// marks the root itself as a word.
    pub fn put<K>(&mut self, key: K) -> Result<()>
    where
        K: AsRef<[u8]>,
    {
        let key = str::from_utf8(key.as_ref()).map_err(|error| {
            debug!(target: TRIE_LOG_TARGET, error = ?error, "Rejecting malformed key");
            error
        })?;

        let mut current_tree = &mut self.root;
        for char in key.chars() {
            current_tree = current_tree.children.entry(char).or_default();
        }
        current_tree.is_word = true;
        Ok(())
    }

    /// Returns true if `key` was put and not deleted since. The empty key only
    /// matches after `put("")`, unlike [`has_prefix`](Self::has_prefix).
    pub fn has<K>(&self, key: K) -> bool
    where
        K: AsRef<[u8]>,
    {
        self.search_node(key.as_ref())
            .map_or(false, |node| node.is_word)
    }

    /// Returns true if some stored key starts with `key`.
    ///
    /// The empty prefix always matches, even on an empty trie. Malformed
    /// input never matches.
    pub fn has_prefix<K>(&self, key: K) -> bool
    where
        K: AsRef<[u8]>,
    {
        self.search_node(key.as_ref()).is_some()
    }

    /// Removes `key` and every node that only existed to reach it.
    ///
    /// Deleting an absent or malformed key, or the empty key, leaves the trie
    /// unchanged. Nodes that end another key or branch toward one are never
    /// removed.
    pub fn delete<K>(&mut self, key: K)
    where
        K: AsRef<[u8]>,
    {
        let key = match str::from_utf8(key.as_ref()) {
            Ok(key) if !key.is_empty() => key,
            _ => return,
        };

        // Depth of the deepest node that has to survive, and the edge leaving it toward `key`.
        let mut last_needed: Option<(usize, char)> = None;
        let mut depth = 0;
        let mut current_tree = &mut self.root;
        for char in key.chars() {
            if current_tree.is_needed() {
                last_needed = Some((depth, char));
            }
            current_tree = match current_tree.children.get_mut(&char) {
                None => {
                    trace!(target: TRIE_LOG_TARGET, depth, "Delete of absent key");
                    return;
                }
                Some(child) => child,
            };
            depth += 1;
        }

        if !current_tree.children.is_empty() {
            current_tree.is_word = false;
            trace!(target: TRIE_LOG_TARGET, depth, "Cleared word on shared prefix");
            return;
        }
        if !current_tree.is_word {
            return;
        }

        match last_needed {
            None => {
                // invariant: the root is not needed, so its only child leads to `key`.
                debug_assert_eq!(
                    self.root.children.len(),
                    1,
                    "root must hold a single chain when no node on the path is needed"
                );
                self.root.children.clear();
                trace!(target: TRIE_LOG_TARGET, depth, "Pruned chain back to root");
            }
            Some((anchor_depth, edge)) => {
                if let Some(anchor) = self.node_mut(key.chars().take(anchor_depth)) {
                    anchor.children.remove(&edge);
                    trace!(
                        target: TRIE_LOG_TARGET,
                        anchor_depth,
                        pruned = depth - anchor_depth,
                        "Detached suffix below last needed node"
                    );
                }
            }
        }
    }

    fn search_node(&self, key: &[u8]) -> Option<&TrieNode> {
        let key = str::from_utf8(key).ok()?;
        key.chars()
            .try_fold(&self.root, |node, char| node.children.get(&char))
    }

    fn node_mut<I>(&mut self, path: I) -> Option<&mut TrieNode>
    where
        I: IntoIterator<Item = char>,
    {
        path.into_iter()
            .try_fold(&mut self.root, |node, char| node.children.get_mut(&char))
    }
}

#[cfg(test)]
impl Trie {
    fn nodes(&self) -> Vec<&TrieNode> {
        let mut nodes = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.values());
        }
        nodes
    }

    /// Nodes below the root that neither end a key nor lead to one.
    pub(crate) fn dangling_nodes(&self) -> usize {
        self.nodes()
            .into_iter()
            .skip(1)
            .filter(|node| node.children.is_empty() && !node.is_word)
            .count()
    }

    /// Nodes in the tree, the root included.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes().len()
    }
}
