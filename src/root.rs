//! Process-wide global state: the root topic node and the value
//! conversion registry. Both initialize lazily on first access and are
//! deliberately never torn down before process exit (per §9's "the
//! root topic is process-wide mutable state... no reset API").

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::topic::{Topic, TopicData, TrieNode};
use crate::trie::Node;
use crate::value::ConversionFn;

static ROOT: OnceLock<Arc<TrieNode>> = OnceLock::new();

/// The process-wide root trie node, created on first access by
/// whichever thread gets there first.
pub(crate) fn root_node() -> Arc<TrieNode> {
    Arc::clone(ROOT.get_or_init(Node::<TopicData>::new_root))
}

/// An eager handle to the global root topic.
pub fn root() -> Topic {
    Topic::root()
}

type ConversionKey = (TypeId, TypeId);

static CONVERSIONS: OnceLock<RwLock<HashMap<ConversionKey, Arc<ConversionFn>>>> = OnceLock::new();

fn conversions() -> &'static RwLock<HashMap<ConversionKey, Arc<ConversionFn>>> {
    CONVERSIONS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a conversion from `S` to `T` in the global conversion
/// registry, overwriting any existing registration for the same pair.
/// Tolerates concurrent registration like the root topic does.
pub fn register_conversion<S, T>(f: impl Fn(S) -> T + Send + Sync + 'static)
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    let key = (TypeId::of::<S>(), TypeId::of::<T>());
    let boxed: Arc<ConversionFn> = Arc::from(crate::value::erase_conversion(f));
    conversions().write().expect("conversion registry lock poisoned").insert(key, boxed);
}

/// Looks up a registered conversion from `source` to `target`, if any.
pub(crate) fn lookup_conversion(source: TypeId, target: TypeId) -> Option<Arc<ConversionFn>> {
    conversions().read().expect("conversion registry lock poisoned").get(&(source, target)).cloned()
}
