use std::collections::BTreeMap;
use std::fmt;

use petgraph::prelude::NodeIndex;

use crate::{Navigate, Span};

// Punctuation ignored by the evaluation.
static EVAL_PUNCTUATION: &[&str] = &[",", ":", "``", "''", "."];

/// A labeled span.
///
/// Edges are ordered by their span, then by their label.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    span: Span,
    label: String,
}

impl Edge {
    /// Construct a new edge.
    ///
    /// `PRT` edges are relabeled to `ADVP`.
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        let mut label = label.into();
        if label == "PRT" {
            label = "ADVP".to_owned();
        }
        Edge {
            span: Span::new(start, end),
            label,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.label, self.span)
    }
}

/// Multiset of edges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Edges(BTreeMap<Edge, usize>);

impl Edges {
    /// Collect the constituent edges of a tree.
    ///
    /// Every nonterminal other than the root contributes an edge. Punctuation and empty nodes do
    /// not occupy positions, constituents covering no positions are skipped.
    pub fn from_tree(tree: &impl Navigate) -> Self {
        let mut edges = Edges::default();
        edges.collect(tree, tree.root(), 0, false);
        edges
    }

    fn collect(&mut self, tree: &impl Navigate, node: NodeIndex, left: usize, non_root: bool) -> usize {
        if EVAL_PUNCTUATION.contains(&tree.label(node)) || tree.is_none(node) {
            return left;
        }
        if tree.is_preterminal(node) || tree.is_terminal(node) {
            return left + 1;
        }
        let mut right = left;
        for &child in tree.children(node).iter() {
            right = self.collect(tree, child, right, true);
        }
        if non_root && right > left {
            self.insert(Edge::new(left, right, tree.label(node)));
        }
        right
    }

    /// Add one occurrence of `edge`.
    pub fn insert(&mut self, edge: Edge) {
        *self.0.entry(edge).or_insert(0) += 1;
    }

    /// Get the number of occurrences of `edge`.
    pub fn count(&self, edge: &Edge) -> usize {
        self.0.get(edge).cloned().unwrap_or(0)
    }

    /// Get the number of edges, counting every occurrence.
    pub fn n_edges(&self) -> usize {
        self.0.values().sum()
    }

    /// Iterate over the distinct edges and their counts in edge order.
    pub fn iter(&self) -> impl Iterator<Item = (&Edge, usize)> {
        self.0.iter().map(|(edge, &count)| (edge, count))
    }
}

impl Extend<Edge> for Edges {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = Edge>,
    {
        for edge in iter {
            self.insert(edge);
        }
    }
}
