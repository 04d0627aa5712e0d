use std::borrow::Borrow;
use std::collections::HashSet;
use std::iter::FromIterator;

use petgraph::prelude::NodeIndex;

use crate::Navigate;

/// Struct to climb up a tree.
///
/// This struct does not borrow from the tree, the tree is passed to every call of `next`. This
/// allows the same climber to be used on a `Tree` and on an `AnnotatedTree`.
///
/// The first call to `next` returns the parent of the node the climber was constructed with.
pub struct Climber {
    cur: Option<NodeIndex>,
}

impl Climber {
    /// Constructs a new `Climber`.
    pub fn new(node: NodeIndex, tree: &impl Navigate) -> Self {
        Climber {
            cur: tree.parent(node),
        }
    }

    /// Moves up the tree by following the parent relation.
    ///
    /// This method behaves like an iterator, returning `Some(NodeIndex)` before reaching the root.
    /// Calling this method again in the final state will return `None`.
    pub fn next(&mut self, tree: &impl Navigate) -> Option<NodeIndex> {
        if let Some(node) = self.cur {
            self.cur = tree.parent(node);
            Some(node)
        } else {
            None
        }
    }
}

/// Set of category labels.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LabelSet(HashSet<String>);

impl LabelSet {
    /// Returns whether the query is a member of the `LabelSet`.
    pub fn matches(&self, q: impl Borrow<str>) -> bool {
        self.0.contains(q.borrow())
    }

    /// Returns whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Constructs a `LabelSet` from a whitespace separated list of labels.
impl<'a> From<&'a str> for LabelSet {
    fn from(labels: &'a str) -> Self {
        labels.split_whitespace().map(ToOwned::to_owned).collect()
    }
}

impl FromIterator<String> for LabelSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        LabelSet(iter.into_iter().collect())
    }
}
