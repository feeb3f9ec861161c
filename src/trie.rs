//! Defines [`Node`], a path-addressed tree whose nodes exist only
//! while they hold a live payload or a live descendant.
//!
//! A node holds a strong reference to its parent and a concurrent
//! mapping from segment to a *weak* reference to each child. Children
//! keep their parents alive (via the strong `parent` field); parents
//! only weakly reference children. A node is therefore reclaimed the
//! moment nothing external — payload, descendant, or topic handle —
//! holds a strong reference to it or anything beneath it.

use std::sync::{Arc, Weak};

use dashmap::DashMap;

/// A payload store embedded in every [`Node`]. Implementors receive a
/// weak back-reference to their hosting node once it exists, so that
/// contained services/subscriptions can introspect their host topic.
pub trait Payload: Default + Send + Sync + 'static {
    /// Binds the payload to its hosting node. Called exactly once,
    /// immediately after the node's `Arc` is constructed.
    fn bind(&self, node: Weak<Node<Self>>);
}

/// A node in the cooperative trie.
///
/// Invariant I1: the parent reference transitively terminates at the
/// root. Invariant I2: a child is reachable through its parent's
/// child-map iff some strong reference exists to that child or to any
/// of its transitive descendants.
pub struct Node<P: Payload> {
    segment: Box<str>,
    parent: Option<Arc<Node<P>>>,
    children: DashMap<Box<str>, Weak<Node<P>>>,
    payload: P,
}

impl<P: Payload> Node<P> {
    /// Creates a fresh, parentless root node.
    pub fn new_root() -> Arc<Self> {
        Self::new_with(Box::from(""), None)
    }

    fn new_with(segment: Box<str>, parent: Option<Arc<Self>>) -> Arc<Self> {
        let node = Arc::new(Node { segment, parent, children: DashMap::new(), payload: P::default() });
        node.payload.bind(Arc::downgrade(&node));
        node
    }

    /// The immutable segment identifier of this node (empty for root).
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The parent of this node, or `None` for the root.
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// `true` if this node has no parent (i.e. is the root).
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The payload embedded in this node.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Returns the child named `id`, creating it if absent.
    ///
    /// Race-free: the concurrent child table's shard lock serializes
    /// concurrent creations for the same key, so a shared-read section
    /// (`try_child`) is consulted first and a writer section only taken
    /// on a miss, where the check is repeated before constructing.
    pub fn get_child(self: &Arc<Self>, id: &str) -> Arc<Self> {
        if let Some(existing) = self.try_child(id) {
            return existing;
        }
        let mut entry = self.children.entry(Box::from(id)).or_insert_with(Weak::new);
        if let Some(existing) = entry.upgrade() {
            return existing;
        }
        let child = Self::new_with(Box::from(id), Some(Arc::clone(self)));
        *entry = Arc::downgrade(&child);
        child
    }

    /// Returns the child named `id` if it currently exists, else
    /// `None`. Never creates.
    pub fn try_child(&self, id: &str) -> Option<Arc<Self>> {
        self.children.get(id).and_then(|weak| weak.upgrade())
    }

    /// Walks `segments` via [`Node::try_child`]; `None` if any segment
    /// is missing.
    pub fn find<'a, I>(self: &Arc<Self>, segments: I) -> Option<Arc<Self>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = Arc::clone(self);
        for seg in segments {
            current = current.try_child(seg)?;
        }
        Some(current)
    }

    /// Walks `segments` as far as existing children allow. Returns the
    /// deepest existing ancestor (at worst, `self`) paired with the
    /// unresolved tail.
    pub fn nearest<'a, I>(self: &Arc<Self>, segments: I) -> (Arc<Self>, Vec<&'a str>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = Arc::clone(self);
        let mut iter = segments.into_iter();
        let mut remaining = Vec::new();
        while let Some(seg) = iter.next() {
            match current.try_child(seg) {
                Some(child) => current = child,
                None => {
                    remaining.push(seg);
                    remaining.extend(iter);
                    break;
                }
            }
        }
        (current, remaining)
    }

    /// Walks `segments` via [`Node::get_child`]; always succeeds.
    pub fn get<'a, I>(self: &Arc<Self>, segments: I) -> Arc<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = Arc::clone(self);
        for seg in segments {
            current = current.get_child(seg);
        }
        current
    }

    /// Installs `target` under `id`, aliasing a subtree, iff `id` is
    /// currently unused (dead or absent). Lifetimes propagate through
    /// the link like any other strong reference held elsewhere.
    pub fn make_link(&self, id: &str, target: &Arc<Self>) -> bool {
        let mut entry = self.children.entry(Box::from(id)).or_insert_with(Weak::new);
        if entry.upgrade().is_some() {
            return false;
        }
        *entry = Arc::downgrade(target);
        true
    }

    /// Returns an iterator from this node up to and including the
    /// root.
    pub fn ancestors(self: &Arc<Self>) -> Ancestors<P> {
        Ancestors { current: Some(Arc::clone(self)) }
    }
}

/// Iterator over a node and its ancestors, nearest first, root last.
pub struct Ancestors<P: Payload> {
    current: Option<Arc<Node<P>>>,
}

impl<P: Payload> Iterator for Ancestors<P> {
    type Item = Arc<Node<P>>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current.take()?;
        self.current = node.parent().cloned();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter;

    impl Payload for Counter {
        fn bind(&self, _node: Weak<Node<Self>>) {}
    }

    #[test]
    fn get_creates_missing_segments() {
        let root: Arc<Node<Counter>> = Node::new_root();
        let leaf = root.get(["a", "b", "c"]);
        assert_eq!(leaf.segment(), "c");
        assert!(root.find(["a", "b", "c"]).is_some());
    }

    #[test]
    fn try_child_never_creates() {
        let root: Arc<Node<Counter>> = Node::new_root();
        assert!(root.try_child("a").is_none());
        assert!(root.find(["a"]).is_none());
    }

    #[test]
    fn nearest_returns_deepest_existing_ancestor() {
        let root: Arc<Node<Counter>> = Node::new_root();
        root.get(["a", "b"]);
        let (node, remaining) = root.nearest(["a", "b", "c", "d"]);
        assert_eq!(node.segment(), "b");
        assert_eq!(remaining, vec!["c", "d"]);
    }

    #[test]
    fn nearest_returns_self_when_nothing_exists() {
        let root: Arc<Node<Counter>> = Node::new_root();
        let (node, remaining) = root.nearest(["x", "y"]);
        assert!(node.is_root());
        assert_eq!(remaining, vec!["x", "y"]);
    }

    #[test]
    fn node_reclaimed_once_last_strong_ref_drops() {
        let root: Arc<Node<Counter>> = Node::new_root();
        let child = root.get(["temp"]);
        let weak = Arc::downgrade(&child);
        drop(child);
        drop(root.find(["temp"]));
        assert!(weak.upgrade().is_none());
        assert!(root.try_child("temp").is_none());
    }

    #[test]
    fn ancestors_walks_to_root_inclusive() {
        let root: Arc<Node<Counter>> = Node::new_root();
        let leaf = root.get(["a", "b"]);
        let chain: Vec<Arc<Node<Counter>>> = leaf.ancestors().collect();
        assert_eq!(chain.len(), 3);
        assert!(chain.last().unwrap().is_root());
    }

    #[test]
    fn make_link_refuses_when_occupied() {
        let root: Arc<Node<Counter>> = Node::new_root();
        let alias_target = root.get(["real"]);
        assert!(root.make_link("alias", &alias_target));
        let other = root.get(["other"]);
        assert!(!root.make_link("alias", &other));
        assert!(Arc::ptr_eq(&root.find(["alias"]).unwrap(), &alias_target));
    }

    #[test]
    fn concurrent_get_child_converges_on_one_node() {
        use std::sync::Barrier;
        use std::thread;

        let root: Arc<Node<Counter>> = Node::new_root();
        let barrier = Arc::new(Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let root = Arc::clone(&root);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                Arc::as_ptr(&root.get_child("shared")) as usize
            }));
        }
        let ptrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
    }
}
