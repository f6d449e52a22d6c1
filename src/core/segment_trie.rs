//! Trie keyed by delimiter-separated path segments
//!
//! `"app.db.pool"` is stored as `root -> "app" -> "db" -> "pool"`. The empty
//! key addresses the root node. Segments are compared exactly; there are no
//! wildcards.

use std::collections::HashMap;

/// Default segment delimiter
pub const DEFAULT_DELIMITER: char = '.';

#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    children: HashMap<String, Node<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            value: None,
            children: HashMap::new(),
        }
    }
}

// Tear down iteratively so very deep chains cannot exhaust the stack
impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        let mut pending: Vec<Node<T>> = self.children.drain().map(|(_, child)| child).collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.children.drain().map(|(_, child)| child));
        }
    }
}

impl<T> Node<T> {
    fn count_nodes(&self) -> usize {
        let mut pending: Vec<&Node<T>> = vec![self];
        let mut count = 0;
        while let Some(node) = pending.pop() {
            count += node.children.len();
            pending.extend(node.children.values());
        }
        count
    }

    fn descend_mut<'n>(mut node: &'n mut Node<T>, segments: &[&str]) -> Option<&'n mut Node<T>> {
        for segment in segments {
            node = node.children.get_mut(*segment)?;
        }
        Some(node)
    }
}

fn join(parent: &str, segment: &str, delimiter: char) -> String {
    let mut path = String::with_capacity(parent.len() + 1 + segment.len());
    path.push_str(parent);
    path.push(delimiter);
    path.push_str(segment);
    path
}

/// Segment trie mapping paths to values.
///
/// # Example
///
/// ```
/// use segment_logger::core::SegmentTrie;
///
/// let mut trie = SegmentTrie::new();
/// trie.insert("app", 1);
/// trie.insert("app.db", 2);
///
/// assert_eq!(trie.get("app.db"), Some(&2));
/// assert_eq!(trie.find_by_longest_prefix("app.db.pool"), Some(&2));
/// assert_eq!(trie.find_by_longest_prefix("app.http"), Some(&1));
/// assert_eq!(trie.find_by_longest_prefix("other"), None);
/// ```
#[derive(Debug)]
pub struct SegmentTrie<T> {
    root: Node<T>,
    delimiter: char,
    len: usize,
}

impl<T> SegmentTrie<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    #[must_use]
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            root: Node::default(),
            delimiter,
            len: 0,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes below the root, including pure junction nodes
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    /// Lazily split `key` into segments; the empty key yields none.
    fn segments(key: &str, delimiter: char) -> impl Iterator<Item = &str> {
        (!key.is_empty())
            .then(|| key.split(delimiter))
            .into_iter()
            .flatten()
    }

    /// Place `value` at `key`, creating junction nodes on the way.
    /// Returns the value previously stored at exactly `key`.
    pub fn insert(&mut self, key: &str, value: T) -> Option<T> {
        let segments = Self::segments(key, self.delimiter);
        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }

        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Exact lookup
    pub fn get(&self, key: &str) -> Option<&T> {
        let mut node = &self.root;
        for segment in Self::segments(key, self.delimiter) {
            node = node.children.get(segment)?;
        }
        node.value.as_ref()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Value of the deepest node on `key`'s path that carries one (the root
    /// included, `key` itself included).
    pub fn find_by_longest_prefix(&self, key: &str) -> Option<&T> {
        self.find_by_longest_prefix_with_key(key).map(|(_, value)| value)
    }

    /// Like [`SegmentTrie::find_by_longest_prefix`], also returning the
    /// matched prefix of `key`.
    pub fn find_by_longest_prefix_with_key<'k>(&self, key: &'k str) -> Option<(&'k str, &T)> {
        let mut best = self.root.value.as_ref().map(|v| (&key[..0], v));
        let mut node = &self.root;
        let mut offset = 0;

        for segment in Self::segments(key, self.delimiter) {
            let Some(child) = node.children.get(segment) else {
                break;
            };
            let end = offset + segment.len();
            if let Some(value) = &child.value {
                best = Some((&key[..end], value));
            }
            node = child;
            offset = end + self.delimiter.len_utf8();
        }

        best
    }

    /// Detach the value at `key` and prune every ancestor left without value
    /// and children. Ancestors that still carry a value or other children
    /// are kept.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let segments: Vec<&str> = Self::segments(key, self.delimiter).collect();

        // Depth of the topmost node that becomes vacant together with
        // everything below it, if any
        let mut prune_from = Some(0);
        let mut node = &self.root;
        for (depth, segment) in segments.iter().enumerate() {
            node = node.children.get(*segment)?;
            let is_target = depth + 1 == segments.len();
            if (!is_target && node.value.is_some()) || node.children.len() > 1 {
                prune_from = Some(depth + 1);
            }
        }
        node.value.as_ref()?;
        if !node.children.is_empty() {
            prune_from = None;
        }

        let removed = match prune_from {
            Some(cut) if cut < segments.len() => {
                let parent = Node::descend_mut(&mut self.root, &segments[..cut])?;
                let mut detached = parent.children.remove(segments[cut])?;
                Node::descend_mut(&mut detached, &segments[cut + 1..])?.value.take()
            }
            _ => Node::descend_mut(&mut self.root, &segments)?.value.take(),
        };
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Snapshot of every `(path, value)` pair, in no particular order.
    pub fn entries(&self) -> Vec<(String, &T)> {
        let mut out = Vec::with_capacity(self.len);
        let mut pending: Vec<(String, &Node<T>)> = vec![(String::new(), &self.root)];
        while let Some((path, node)) = pending.pop() {
            for (segment, child) in &node.children {
                let child_path = if std::ptr::eq(node, &self.root) {
                    segment.clone()
                } else {
                    join(&path, segment, self.delimiter)
                };
                pending.push((child_path, child));
            }
            if let Some(value) = &node.value {
                out.push((path, value));
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.root = Node::default();
        self.len = 0;
    }
}

impl<T> Default for SegmentTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}
