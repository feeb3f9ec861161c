//! Defines [`Topic`], the user-facing handle to a node in the
//! hierarchical namespace, and [`TopicData`], the payload every trie
//! node carries (a service slot plus a subscription pool).
//!
//! A path is a slash-delimited string; empty segments (leading,
//! trailing, consecutive slashes) are ignored for comparison and
//! lookup. The empty path denotes the root.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::error::Error;
use crate::pool::Pool;
use crate::service::ServiceInner;
use crate::slot::Slot;
use crate::subscription::SubscriptionInner;
use crate::trie::{self, Node, Payload};

/// The trie specialized on topic payloads.
pub(crate) type TrieNode = Node<TopicData>;

/// Splits a path string into its non-empty segments. Leading,
/// trailing, and consecutive `/` are ignored.
pub(crate) fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// The payload embedded in every trie node: at most one service and
/// any number of subscriptions, plus a weak back-reference to the
/// hosting node so services/subscriptions can introspect their host.
pub(crate) struct TopicData {
    node: OnceLock<Weak<TrieNode>>,
    pub(crate) service: Slot<ServiceInner>,
    pub(crate) subscriptions: Pool<SubscriptionInner>,
}

impl Default for TopicData {
    fn default() -> Self {
        TopicData { node: OnceLock::new(), service: Slot::new(), subscriptions: Pool::new() }
    }
}

impl Payload for TopicData {
    fn bind(&self, node: Weak<TrieNode>) {
        let _ = self.node.set(node);
    }
}

impl TopicData {
    /// The node hosting this payload.
    pub(crate) fn node(&self) -> Arc<TrieNode> {
        self.node
            .get()
            .expect("TopicData::bind is called immediately after construction")
            .upgrade()
            .expect("a payload cannot outlive the node that owns it")
    }

    /// Delegates to the service slot's `try_emplace`. Fails if a
    /// service is already installed.
    pub(crate) fn try_install_service(&self, ctor: impl FnOnce() -> ServiceInner) -> Option<Arc<ServiceInner>> {
        self.service.try_emplace(ctor)
    }

    /// Delegates to the subscription pool's `emplace`. Always
    /// succeeds.
    pub(crate) fn install_subscription(&self, ctor: impl Fn() -> SubscriptionInner) -> Arc<SubscriptionInner> {
        self.subscriptions.emplace(ctor)
    }

    /// The currently installed service, if any.
    pub(crate) fn current_service(&self) -> Option<Arc<ServiceInner>> {
        self.service.lock()
    }

    /// An iterator over the currently live subscriptions.
    pub(crate) fn iterate_subscriptions(&self) -> crate::pool::Iter<'_, SubscriptionInner> {
        self.subscriptions.iter()
    }
}

fn node_path(node: &Arc<TrieNode>) -> String {
    let chain: Vec<Arc<TrieNode>> = node.ancestors().collect();
    let segments: Vec<String> = chain
        .iter()
        .rev()
        .filter(|n| !n.is_root())
        .map(|n| n.segment().to_string())
        .collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

struct LazyState {
    anchor: Arc<TrieNode>,
    tail: Vec<Box<str>>,
}

/// Advances `state.anchor` forward through `state.tail` as far as
/// currently-existing children allow.
fn advance(state: &mut LazyState) {
    while let Some(first) = state.tail.first() {
        match state.anchor.try_child(first) {
            Some(child) => {
                state.anchor = child;
                state.tail.remove(0);
            }
            None => break,
        }
    }
}

enum Inner {
    /// Resolves at construction, forcing node creation. `None`
    /// represents a null handle.
    Eager(Option<Arc<TrieNode>>),
    /// Holds the nearest currently-existing ancestor plus a residual
    /// unresolved suffix.
    Lazy(Mutex<LazyState>),
}

/// A reference to a topic: either eager (resolved, and resolving
/// forces creation) or lazy (anchored at the nearest existing
/// ancestor, with an unresolved tail). Both flavors share this single
/// API; two handles compare equal iff their canonical paths are equal.
pub struct Topic(Inner);

impl Topic {
    /// An eager handle to the global root topic.
    pub fn root() -> Topic {
        Topic(Inner::Eager(Some(crate::root::root_node())))
    }

    /// A null eager handle. Any operation on it fails with
    /// [`Error::NullTopic`].
    pub fn null() -> Topic {
        Topic(Inner::Eager(None))
    }

    /// An eager handle to `path`, materializing any missing nodes
    /// immediately.
    pub fn eager(path: &str) -> Topic {
        let node = crate::root::root_node().get(path_segments(path));
        Topic(Inner::Eager(Some(node)))
    }

    /// A lazy handle to `path`: resolves as far as existing nodes
    /// allow, deferring creation of the rest.
    pub fn lazy(path: &str) -> Topic {
        let (anchor, tail) = crate::root::root_node().nearest(path_segments(path));
        Topic(Inner::Lazy(Mutex::new(LazyState {
            anchor,
            tail: tail.into_iter().map(Box::from).collect(),
        })))
    }

    /// An eager handle to `path`, demanding that the whole subtree
    /// already exists rather than materializing it. Fails with
    /// [`Error::NoSuchTopic`] if any segment of `path` has no
    /// corresponding node yet — unlike [`Topic::lazy`], which recovers
    /// from the same situation by deferring the missing segments to an
    /// unresolved tail instead of erroring.
    pub fn require(path: &str) -> crate::Result<Topic> {
        let (anchor, tail) = crate::root::root_node().nearest(path_segments(path));
        if tail.is_empty() {
            Ok(Topic(Inner::Eager(Some(anchor))))
        } else {
            Err(Error::NoSuchTopic)
        }
    }

    pub(crate) fn from_node(node: Arc<TrieNode>) -> Topic {
        Topic(Inner::Eager(Some(node)))
    }

    /// `true` for a null eager handle.
    pub fn is_null(&self) -> bool {
        matches!(self.0, Inner::Eager(None))
    }

    /// `true` for a lazy handle.
    pub fn is_lazy(&self) -> bool {
        matches!(self.0, Inner::Lazy(_))
    }

    /// For a lazy handle: advances the nearest anchor as far as
    /// currently-existing children allow. No-op for eager handles.
    pub fn resolve(&self) {
        if let Inner::Lazy(state) = &self.0 {
            let mut guard = state.lock().expect("topic lock poisoned");
            advance(&mut guard);
        }
    }

    /// For a lazy handle: creates intermediate nodes for the residual
    /// tail and collapses it to empty. No-op for eager handles.
    pub fn realize(&self) {
        if let Inner::Lazy(state) = &self.0 {
            let mut guard = state.lock().expect("topic lock poisoned");
            if !guard.tail.is_empty() {
                let segments: Vec<&str> = guard.tail.iter().map(|s| s.as_ref()).collect();
                guard.anchor = guard.anchor.get(segments);
                guard.tail.clear();
            }
        }
    }

    /// Returns the nearest existing node, without creating anything.
    /// Fails with [`Error::NullTopic`] for a null handle.
    pub(crate) fn existing_node(&self) -> crate::Result<Arc<TrieNode>> {
        match &self.0 {
            Inner::Eager(Some(node)) => Ok(Arc::clone(node)),
            Inner::Eager(None) => Err(Error::NullTopic),
            Inner::Lazy(state) => {
                let mut guard = state.lock().expect("topic lock poisoned");
                advance(&mut guard);
                Ok(Arc::clone(&guard.anchor))
            }
        }
    }

    /// Returns the fully materialized node, creating any missing
    /// nodes. Fails with [`Error::NullTopic`] for a null handle.
    pub(crate) fn materialized_node(&self) -> crate::Result<Arc<TrieNode>> {
        self.realize();
        self.existing_node()
    }

    /// The canonical path (no redundant slashes; empty string for the
    /// root). Fails with [`Error::NullTopic`] for a null handle.
    pub fn path(&self) -> crate::Result<String> {
        match &self.0 {
            Inner::Eager(Some(node)) => Ok(node_path(node)),
            Inner::Eager(None) => Err(Error::NullTopic),
            Inner::Lazy(state) => {
                let guard = state.lock().expect("topic lock poisoned");
                let base = node_path(&guard.anchor);
                if guard.tail.is_empty() {
                    Ok(base)
                } else {
                    let mut full = base;
                    for segment in guard.tail.iter() {
                        full.push('/');
                        full.push_str(segment);
                    }
                    Ok(full)
                }
            }
        }
    }

    /// The terminal segment of [`Topic::path`].
    pub fn id(&self) -> crate::Result<String> {
        let path = self.path()?;
        Ok(path.rsplit('/').next().unwrap_or("").to_string())
    }

    /// Returns a handle to the named child. Never fails for a non-null
    /// handle; lazy handles extend their unresolved tail rather than
    /// looking the segment up immediately.
    pub fn child(&self, segment: &str) -> crate::Result<Topic> {
        match &self.0 {
            Inner::Eager(Some(node)) => Ok(Topic(Inner::Eager(Some(node.get_child(segment))))),
            Inner::Eager(None) => Err(Error::NullTopic),
            Inner::Lazy(state) => {
                let guard = state.lock().expect("topic lock poisoned");
                let mut tail = guard.tail.clone();
                tail.push(Box::from(segment));
                Ok(Topic(Inner::Lazy(Mutex::new(LazyState {
                    anchor: Arc::clone(&guard.anchor),
                    tail,
                }))))
            }
        }
    }

    /// Returns a handle to the parent topic. The root's parent is
    /// itself for a lazy handle and null for an eager handle.
    pub fn parent(&self) -> crate::Result<Topic> {
        match &self.0 {
            Inner::Eager(Some(node)) => match node.parent() {
                Some(parent) => Ok(Topic(Inner::Eager(Some(Arc::clone(parent))))),
                None => Ok(Topic(Inner::Eager(None))),
            },
            Inner::Eager(None) => Err(Error::NullTopic),
            Inner::Lazy(state) => {
                let guard = state.lock().expect("topic lock poisoned");
                if let Some((_, rest)) = guard.tail.split_last() {
                    Ok(Topic(Inner::Lazy(Mutex::new(LazyState {
                        anchor: Arc::clone(&guard.anchor),
                        tail: rest.to_vec(),
                    }))))
                } else {
                    let anchor = guard.anchor.parent().map(Arc::clone).unwrap_or_else(|| Arc::clone(&guard.anchor));
                    Ok(Topic(Inner::Lazy(Mutex::new(LazyState { anchor, tail: Vec::new() }))))
                }
            }
        }
    }

    /// `true` iff `self`'s canonical path is a strict prefix of
    /// `other`'s.
    pub fn is_ancestor_of(&self, other: &Topic) -> crate::Result<bool> {
        let mine = path_segments(&self.path()?).into_iter().map(str::to_owned).collect::<Vec<_>>();
        let theirs = path_segments(&other.path()?).into_iter().map(str::to_owned).collect::<Vec<_>>();
        Ok(mine.len() < theirs.len() && mine.iter().zip(theirs.iter()).all(|(a, b)| a == b))
    }

    /// `true` iff `other`'s canonical path is a strict prefix of
    /// `self`'s.
    pub fn is_descendant_of(&self, other: &Topic) -> crate::Result<bool> {
        other.is_ancestor_of(self)
    }
}

impl Clone for Topic {
    fn clone(&self) -> Self {
        match &self.0 {
            Inner::Eager(node) => Topic(Inner::Eager(node.clone())),
            Inner::Lazy(state) => {
                let guard = state.lock().expect("topic lock poisoned");
                Topic(Inner::Lazy(Mutex::new(LazyState {
                    anchor: Arc::clone(&guard.anchor),
                    tail: guard.tail.clone(),
                })))
            }
        }
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Ok(path) => write!(f, "Topic({path:?})"),
            Err(_) => write!(f, "Topic(null)"),
        }
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        match (self.path(), other.path()) {
            (Ok(a), Ok(b)) => a == b,
            (Err(_), Err(_)) => true,
            _ => false,
        }
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.path() {
            Ok(path) => path.hash(state),
            Err(_) => "\0null".hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_node() -> Arc<TrieNode> {
        trie::Node::<TopicData>::new_root()
    }

    #[test]
    fn path_segments_ignores_redundant_slashes() {
        assert_eq!(path_segments("//a//b/"), vec!["a", "b"]);
        assert_eq!(path_segments(""), Vec::<&str>::new());
        assert_eq!(path_segments("/"), Vec::<&str>::new());
    }

    #[test]
    fn eager_path_round_trips() {
        let topic = Topic::eager("/a/b/c");
        assert_eq!(topic.path().unwrap(), "/a/b/c");
        assert_eq!(topic.id().unwrap(), "c");
    }

    #[test]
    fn root_path_is_empty() {
        assert_eq!(Topic::root().path().unwrap(), "");
    }

    #[test]
    fn null_topic_fails_every_operation() {
        let topic = Topic::null();
        assert!(topic.path().is_err());
        assert!(topic.id().is_err());
        assert!(topic.child("x").is_err());
        assert!(topic.parent().is_err());
    }

    #[test]
    fn eager_root_parent_is_null() {
        let topic = Topic::root();
        let parent = topic.parent().unwrap();
        assert!(parent.is_null());
    }

    #[test]
    fn lazy_resolves_as_far_as_existing_nodes_allow() {
        let root = fresh_node();
        root.get(["a", "b"]);
        let lazy = Topic(Inner::Lazy(Mutex::new(LazyState { anchor: Arc::clone(&root), tail: vec!["a".into(), "b".into(), "c".into()] })));
        lazy.resolve();
        assert_eq!(lazy.path().unwrap(), "/a/b/c");
        if let Inner::Lazy(state) = &lazy.0 {
            let guard = state.lock().unwrap();
            assert_eq!(guard.anchor.segment(), "b");
            assert_eq!(guard.tail.len(), 1);
        }
    }

    #[test]
    fn lazy_realize_creates_remaining_nodes() {
        let root = fresh_node();
        let lazy = Topic(Inner::Lazy(Mutex::new(LazyState { anchor: Arc::clone(&root), tail: vec!["x".into(), "y".into()] })));
        lazy.realize();
        assert_eq!(lazy.path().unwrap(), "/x/y");
        assert!(root.find(["x", "y"]).is_some());
    }

    #[test]
    fn equality_is_by_canonical_path_regardless_of_flavor() {
        let eager = Topic::eager("/a/b");
        let lazy = Topic::lazy("/a/b");
        assert_eq!(eager, lazy);
    }

    #[test]
    fn ancestor_descendant_are_prefix_aware() {
        let a = Topic::eager("/a");
        let ab = Topic::eager("/a/b");
        let ac = Topic::eager("/ab");
        assert!(a.is_ancestor_of(&ab).unwrap());
        assert!(ab.is_descendant_of(&a).unwrap());
        assert!(!a.is_ancestor_of(&ac).unwrap());
        assert!(!a.is_ancestor_of(&a).unwrap());
    }

    #[test]
    fn require_fails_when_subtree_is_missing() {
        let err = Topic::require("/topic-require-test/missing/deeper").unwrap_err();
        assert_eq!(err, Error::NoSuchTopic);
    }

    #[test]
    fn require_succeeds_once_subtree_exists() {
        let precreated = Topic::eager("/topic-require-test/present/deeper");
        let required = Topic::require("/topic-require-test/present/deeper").unwrap();
        assert_eq!(precreated, required);
    }

    #[test]
    fn child_on_lazy_extends_tail_without_resolving() {
        let root = fresh_node();
        let lazy = Topic(Inner::Lazy(Mutex::new(LazyState { anchor: Arc::clone(&root), tail: Vec::new() })));
        let child = lazy.child("new").unwrap();
        assert_eq!(child.path().unwrap(), "/new");
        assert!(root.try_child("new").is_none());
    }
}
