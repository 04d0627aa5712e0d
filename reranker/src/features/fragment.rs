//! Feature classes over tree fragments.
//!
//! Fragments are copies of a subtree with parts left out. They are keyed by their bracketed
//! representation, with preterminals that are not lexicalized written as bare tags.

use petgraph::prelude::NodeIndex;

use crate::features::{add, head_kind_id, ExtractFeatures, FeatureCounts};
use crate::heads::HeadKind;
use crate::io::{PTBFormat, WriteTree};
use crate::util::Climber;
use crate::{AnnotatedTree, Navigate, Parse, Tree};

/// Key of missing fragments.
const NULL_FRAGMENT: &str = "_NULL_";

/// Selected nodes of a tree.
#[derive(Debug)]
struct Fragment {
    node: NodeIndex,
    children: Vec<Fragment>,
}

impl Fragment {
    fn to_tree(&self, source: &AnnotatedTree) -> Tree {
        let mut tree = Tree::new(source.label(self.node));
        let root = tree.root();
        self.copy_children(source, &mut tree, root);
        tree
    }

    fn copy_children(&self, source: &AnnotatedTree, target: &mut Tree, parent: NodeIndex) {
        for child in &self.children {
            let node = target.push_child(parent, source.label(child.node));
            child.copy_children(source, target, node);
        }
    }
}

fn fragment_key(tree: &AnnotatedTree, fragment: Option<Fragment>) -> String {
    match fragment {
        Some(fragment) => PTBFormat::Plain.tree_to_string(&fragment.to_tree(tree)),
        None => NULL_FRAGMENT.to_owned(),
    }
}

/// Go up `n` ancestors.
fn ancestor(tree: &AnnotatedTree, mut node: NodeIndex, n: usize) -> Option<NodeIndex> {
    let mut climber = Climber::new(node, tree);
    for _ in 0..n {
        node = climber.next(tree)?;
    }
    Some(node)
}

/// Preterminals whose words are kept in fragments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lexicalize {
    None,
    ClosedClass,
    Functional,
    All,
}

/// Fragments spanning word n-grams.
///
/// For every n-gram, the fragment is rooted at the lowest node covering the n-gram, or
/// `n_ancs` ancestors above it. With `collapse`, nodes outside the n-gram are left out,
/// otherwise they are kept without their descendants.
///
/// Identifier: `NGramTree:<n_gram>:<lexicalize>:<collapse>:<n_ancs>`
#[derive(Clone, Debug)]
pub struct NGramTree {
    n_gram: usize,
    lexicalize: Lexicalize,
    collapse: bool,
    n_ancs: usize,
    identifier: String,
}

impl NGramTree {
    pub fn new(n_gram: usize, lexicalize: Lexicalize, collapse: bool, n_ancs: usize) -> Self {
        NGramTree {
            n_gram,
            lexicalize,
            collapse,
            n_ancs,
            identifier: format!(
                "NGramTree:{}:{}:{}:{}",
                n_gram, lexicalize as usize, collapse as usize, n_ancs
            ),
        }
    }

    fn copies_children(&self, tree: &AnnotatedTree, node: NodeIndex) -> bool {
        tree.is_nonterminal(node)
            || match self.lexicalize {
                Lexicalize::None => false,
                Lexicalize::ClosedClass => tree.is_closed_class(node),
                Lexicalize::Functional => tree.is_functional(node),
                Lexicalize::All => true,
            }
    }

    fn is_outside(&self, tree: &AnnotatedTree, node: NodeIndex, left: usize, right: usize) -> bool {
        self.collapse && (tree.right(node) <= left || tree.left(node) >= right)
    }

    fn copy_node(
        &self,
        tree: &AnnotatedTree,
        node: NodeIndex,
        left: usize,
        right: usize,
    ) -> Fragment {
        let overlaps = tree.left(node) < right && tree.right(node) > left;
        let children = if overlaps && self.copies_children(tree, node) {
            self.copy_siblings(tree, tree.first_child(node), left, right)
        } else {
            Vec::new()
        };
        Fragment { node, children }
    }

    fn copy_siblings(
        &self,
        tree: &AnnotatedTree,
        mut node: Option<NodeIndex>,
        left: usize,
        right: usize,
    ) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        while let Some(current) = node {
            node = tree.next_sibling(current);
            if self.collapse {
                if tree.right(current) <= left {
                    continue;
                }
                if tree.left(current) >= right {
                    break;
                }
            }
            fragments.push(self.copy_node(tree, current, left, right));
        }
        fragments
    }
}

impl Default for NGramTree {
    fn default() -> Self {
        NGramTree::new(2, Lexicalize::None, false, 0)
    }
}

impl ExtractFeatures for NGramTree {
    type Key = String;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        let preterminals = tree.preterminal_nodes(false);
        for (i, &preterminal) in preterminals.iter().enumerate() {
            if i + self.n_gram >= preterminals.len() {
                break;
            }

            let mut top = preterminal;
            while tree.right(top) < i + self.n_gram {
                match tree.parent(top) {
                    Some(parent) => top = parent,
                    None => break,
                }
            }
            let top = match ancestor(tree, top, self.n_ancs) {
                Some(top) => top,
                None => return,
            };

            let fragment = if self.is_outside(tree, top, i, i + self.n_gram) {
                None
            } else {
                Some(self.copy_node(tree, top, i, i + self.n_gram))
            };
            add(counts, fragment_key(tree, fragment), 1.);
        }
    }
}

/// Fragments of the projections of each word.
///
/// The fragment is rooted at the maximal projection of a preterminal, or `n_ancs` ancestors
/// above it. With `collapse`, only the siblings adjacent to the path to the head are kept.
///
/// Identifier: `HeadTree:<collapse>:<lexicalize>:<n_ancs>:<kind>`, with kind 0 for syntactic
/// and 1 for semantic heads.
#[derive(Clone, Debug)]
pub struct HeadTree {
    collapse: bool,
    lexicalize: bool,
    n_ancs: usize,
    kind: HeadKind,
    identifier: String,
}

impl HeadTree {
    pub fn new(collapse: bool, lexicalize: bool, n_ancs: usize, kind: HeadKind) -> Self {
        HeadTree {
            collapse,
            lexicalize,
            n_ancs,
            kind,
            identifier: format!(
                "HeadTree:{}:{}:{}:{}",
                collapse as usize,
                lexicalize as usize,
                n_ancs,
                head_kind_id(kind)
            ),
        }
    }

    fn copy_siblings(
        &self,
        tree: &AnnotatedTree,
        mut node: Option<NodeIndex>,
        head_left: usize,
    ) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        while let Some(current) = node {
            let next = tree.next_sibling(current);
            if self.collapse {
                let left = tree
                    .previous(current)
                    .map(|previous| tree.left(previous))
                    .unwrap_or_else(|| tree.left(current));
                let right = next
                    .map(|next| tree.right(next))
                    .unwrap_or_else(|| tree.right(current));
                if right <= head_left {
                    node = next;
                    continue;
                }
                if left > head_left {
                    break;
                }
            }

            let children = if tree.is_nonterminal(current)
                || (self.lexicalize && tree.left(current) == head_left)
            {
                self.copy_siblings(tree, tree.first_child(current), head_left)
            } else {
                Vec::new()
            };
            fragments.push(Fragment {
                node: current,
                children,
            });
            node = next;
        }
        fragments
    }
}

impl Default for HeadTree {
    fn default() -> Self {
        HeadTree::new(true, false, 0, HeadKind::Semantic)
    }
}

impl ExtractFeatures for HeadTree {
    type Key = String;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for (i, &preterminal) in tree.preterminal_nodes(false).iter().enumerate() {
            let mut projection = preterminal;
            while tree.is_headchild(projection, self.kind) {
                match tree.parent(projection) {
                    Some(parent) => projection = parent,
                    None => break,
                }
            }
            let top = match ancestor(tree, projection, self.n_ancs) {
                Some(top) => top,
                None => return,
            };

            let fragment = self.copy_siblings(tree, Some(top), i).into_iter().next();
            add(counts, fragment_key(tree, fragment), 1.);
        }
    }
}
