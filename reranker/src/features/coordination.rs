use petgraph::prelude::NodeIndex;

use crate::features::{add, visited_nodes, ExtractFeatures, FeatureCounts};
use crate::{AnnotatedTree, Navigate, Parse};

/// Conjuncts of a coordination, skipping punctuation and conjunctions.
fn conjuncts(tree: &AnnotatedTree, coordination: NodeIndex) -> Vec<NodeIndex> {
    tree.children(coordination)
        .iter()
        .cloned()
        .filter(|&child| !tree.is_punctuation(child) && !tree.is_conjunction(child))
        .collect()
}

/// Parallelism of adjacent conjuncts.
///
/// For every depth from 1 to 5, adjacent conjuncts are compared down to that depth. A key
/// `(depth, 1)` is counted for conjuncts with the same categories down to `depth`,
/// `(depth, 0)` for conjuncts that differ. Conjunct pairs without nodes at `depth` are not
/// counted.
///
/// Identifier: `CoPar:<ignore_preterminals>`
#[derive(Clone, Debug)]
pub struct CoPar {
    ignore_preterminals: bool,
    identifier: String,
}

impl CoPar {
    const MAX_DEPTH: usize = 5;

    /// Construct the class, optionally skipping preterminals below the conjuncts.
    pub fn new(ignore_preterminals: bool) -> Self {
        CoPar {
            ignore_preterminals,
            identifier: format!("CoPar:{}", ignore_preterminals as usize),
        }
    }

    /// Compare two nodes down to `depth`.
    ///
    /// Returns `None` if the nodes match but do not have nodes at `depth`.
    fn match_nodes(
        &self,
        tree: &AnnotatedTree,
        depth: usize,
        node1: NodeIndex,
        node2: NodeIndex,
    ) -> Option<bool> {
        if tree.label(node1) != tree.label(node2) {
            return Some(false);
        }
        if depth == 1 {
            return Some(true);
        }
        if tree.is_preterminal(node1) {
            return None;
        }
        self.match_siblings(
            tree,
            depth - 1,
            tree.first_child(node1),
            tree.first_child(node2),
        )
    }

    /// Compare two nodes and their right siblings down to `depth`.
    fn match_siblings(
        &self,
        tree: &AnnotatedTree,
        depth: usize,
        mut node1: Option<NodeIndex>,
        mut node2: Option<NodeIndex>,
    ) -> Option<bool> {
        if self.ignore_preterminals {
            node1 = self.skip_preterminals(tree, node1);
            node2 = self.skip_preterminals(tree, node2);
        }

        let (node1, node2) = match (node1, node2) {
            (None, None) => return None,
            (Some(node1), Some(node2)) => (node1, node2),
            _ => return Some(false),
        };

        let first = self.match_nodes(tree, depth, node1, node2);
        let rest = self.match_siblings(
            tree,
            depth,
            tree.next_sibling(node1),
            tree.next_sibling(node2),
        );
        match (first, rest) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), _) | (_, Some(true)) => Some(true),
            _ => None,
        }
    }

    fn skip_preterminals(
        &self,
        tree: &AnnotatedTree,
        mut node: Option<NodeIndex>,
    ) -> Option<NodeIndex> {
        while let Some(current) = node {
            if !tree.is_preterminal(current) {
                break;
            }
            node = tree.next_sibling(current);
        }
        node
    }
}

impl Default for CoPar {
    fn default() -> Self {
        CoPar::new(false)
    }
}

impl ExtractFeatures for CoPar {
    type Key = (i32, i32);

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for node in visited_nodes(tree) {
            if !tree.is_coordination(node) {
                continue;
            }
            let conjuncts = conjuncts(tree, node);
            for depth in 1..=Self::MAX_DEPTH {
                for pair in conjuncts.windows(2) {
                    if let Some(parallel) = self.match_nodes(tree, depth, pair[0], pair[1]) {
                        add(counts, (depth as i32, parallel as i32), 1.);
                    }
                }
            }
        }
    }
}

/// Length differences of adjacent conjuncts.
///
/// The key is the difference in words to the preceding conjunct, clamped to -5..=5, and
/// whether the conjunct is the last child of the coordination.
///
/// Identifier: `CoLenPar`
#[derive(Clone, Debug, Default)]
pub struct CoLenPar;

impl ExtractFeatures for CoLenPar {
    type Key = (i32, i32);

    fn identifier(&self) -> &str {
        "CoLenPar"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for node in visited_nodes(tree) {
            if !tree.is_coordination(node) {
                continue;
            }
            let mut last_size = None;
            for conjunct in conjuncts(tree, node) {
                let size = tree.span(conjunct).len() as i32;
                if let Some(last_size) = last_size {
                    let dsize = match size - last_size {
                        d if d > 4 => 5,
                        d if d < -4 => -5,
                        d => d,
                    };
                    let last = tree.next_sibling(conjunct).is_none();
                    add(counts, (dsize, last as i32), 1.);
                }
                last_size = Some(size);
            }
        }
    }
}
