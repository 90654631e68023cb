//! Key-set membership testing over records.

use std::collections::HashSet;

use crate::scan::record::{NodeId, Record};

/// Set of normalized keys used for membership tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: HashSet<NodeId>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(key: NodeId) -> Self {
        let mut set = Self::new();
        set.insert(key);
        set
    }

    /// Insert a key; empty identifiers are never members.
    pub fn insert(&mut self, key: NodeId) -> bool {
        if key.is_empty() {
            return false;
        }
        self.keys.insert(key)
    }

    /// Membership of an already-normalized key.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.keys.iter()
    }

    /// `self − other`
    pub fn difference(&self, other: &KeySet) -> KeySet {
        KeySet {
            keys: self.keys.difference(&other.keys).cloned().collect(),
        }
    }

    /// `self ∪= other`
    pub fn absorb(&mut self, other: &KeySet) {
        self.keys.extend(other.keys.iter().cloned());
    }

    pub fn is_subset(&self, other: &KeySet) -> bool {
        self.keys.is_subset(&other.keys)
    }

    pub fn is_disjoint(&self, other: &KeySet) -> bool {
        self.keys.is_disjoint(&other.keys)
    }

    /// Keys in lexicographic order.
    pub fn sorted(&self) -> Vec<&NodeId> {
        let mut keys: Vec<&NodeId> = self.keys.iter().collect();
        keys.sort();
        keys
    }
}

impl FromIterator<NodeId> for KeySet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        let mut set = KeySet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// How per-column membership results combine into a row match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// At least one key column is a member (discovery).
    Any,
    /// Every key column is a member (materialization).
    All,
}

/// Predicate "row's key columns are in `keys`" under a combinator.
#[derive(Debug, Clone, Copy)]
pub struct KeyMatcher<'a> {
    keys: &'a KeySet,
    columns: &'a [usize],
    combinator: Combinator,
}

impl<'a> KeyMatcher<'a> {
    pub fn new(keys: &'a KeySet, columns: &'a [usize], combinator: Combinator) -> Self {
        Self {
            keys,
            columns,
            combinator,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let mut hits = self.columns.iter().map(|&c| self.keys.contains(record.get(c)));
        match self.combinator {
            Combinator::Any => hits.any(|hit| hit),
            Combinator::All => hits.all(|hit| hit),
        }
    }
}
