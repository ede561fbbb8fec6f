use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{ContentItem, ItemKey};

/// Outcome of merging one fetch result into the held item list.
#[derive(Debug, Default, Clone)]
pub struct Merged {
    /// Kept items in fetch order, followed by `new`.
    pub current: Vec<Arc<ContentItem>>,
    pub new: Vec<Arc<ContentItem>>,
}

impl Merged {
    pub fn has_new_items(&self) -> bool {
        !self.new.is_empty()
    }
}

/// Partition `fetched` against `previous` by identity.
///
/// Items seen before are kept, the rest are new, and anything in `previous`
/// that the fetch no longer lists is dropped. Duplicate identities inside
/// `fetched` collapse to their first occurrence. Kept entries take the
/// freshly fetched instance.
pub fn merge(previous: &[Arc<ContentItem>], fetched: Vec<Arc<ContentItem>>) -> Merged {
    let known: HashSet<&ItemKey> = previous.iter().map(|item| item.key()).collect();
    let mut seen: HashSet<ItemKey> = HashSet::with_capacity(fetched.len());

    let mut kept = Vec::new();
    let mut new = Vec::new();

    for item in fetched {
        if !seen.insert(item.key().clone()) {
            continue;
        }
        if known.contains(item.key()) {
            kept.push(item);
        } else {
            new.push(item);
        }
    }

    let mut current = kept;
    current.extend(new.iter().cloned());

    Merged { current, new }
}
