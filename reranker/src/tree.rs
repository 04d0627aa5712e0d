use std::borrow::Cow;
use std::ops::{Index, IndexMut};

use petgraph::prelude::{Direction, EdgeRef, NodeIndex, StableGraph};

use crate::Node;

/// Read access to the shape of a constituency tree.
///
/// Implementors provide the root, labels, ordered children and parents. All structural
/// predicates and traversals are defined in terms of these four methods.
///
/// A node without children is a terminal, a node whose first child is a terminal is a
/// preterminal, every other node is a nonterminal.
pub trait Navigate {
    /// Get the index of the root node.
    fn root(&self) -> NodeIndex;

    /// Get the node at `node`.
    fn node(&self, node: NodeIndex) -> &Node;

    /// Get the children of `node` in surface order.
    fn children(&self, node: NodeIndex) -> Cow<[NodeIndex]>;

    /// Get the parent of `node`, `None` for the root.
    fn parent(&self, node: NodeIndex) -> Option<NodeIndex>;

    /// Get the label of `node`.
    fn label(&self, node: NodeIndex) -> &str {
        self.node(node).label()
    }

    fn first_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.children(node).first().cloned()
    }

    /// Get the sibling immediately to the right of `node`.
    fn next_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&sibling| sibling == node)?;
        siblings.get(position + 1).cloned()
    }

    fn is_terminal(&self, node: NodeIndex) -> bool {
        self.children(node).is_empty()
    }

    fn is_preterminal(&self, node: NodeIndex) -> bool {
        self.first_child(node)
            .map(|child| self.is_terminal(child))
            .unwrap_or(false)
    }

    fn is_nonterminal(&self, node: NodeIndex) -> bool {
        self.first_child(node)
            .map(|child| !self.is_terminal(child))
            .unwrap_or(false)
    }

    /// Returns whether `node` is a nonterminal labeled with the root category.
    fn is_root(&self, node: NodeIndex) -> bool {
        self.is_nonterminal(node) && self.node(node).is_root_label()
    }

    /// Returns whether `node` is an empty preterminal.
    fn is_none(&self, node: NodeIndex) -> bool {
        self.is_preterminal(node) && self.node(node).is_none_label()
    }

    fn is_punctuation(&self, node: NodeIndex) -> bool {
        self.is_preterminal(node) && self.node(node).is_punctuation_label()
    }

    fn is_conjunction(&self, node: NodeIndex) -> bool {
        self.is_preterminal(node) && self.node(node).is_conjunction_label()
    }

    fn is_closed_class(&self, node: NodeIndex) -> bool {
        self.is_preterminal(node) && self.node(node).is_closed_class_label()
    }

    fn is_functional(&self, node: NodeIndex) -> bool {
        self.is_preterminal(node) && self.node(node).is_functional_label()
    }

    /// Returns whether every terminal below `node` is dominated by an empty preterminal.
    fn is_empty(&self, node: NodeIndex) -> bool {
        if self.node(node).is_none_label() {
            return true;
        }
        let children = self.children(node);
        if children.is_empty() {
            return false;
        }
        children.iter().all(|&child| self.is_empty(child))
    }

    /// Returns whether a child other than the first and the last child is a conjunction.
    ///
    /// Constituents starting with a conjunction are not coordinations.
    fn is_coordination(&self, node: NodeIndex) -> bool {
        if !self.is_nonterminal(node) {
            return false;
        }
        let children = self.children(node);
        children.len() > 2
            && children[1..children.len() - 1]
                .iter()
                .any(|&child| self.is_conjunction(child))
    }

    /// Returns whether all non-punctuation children have the same label as `node`.
    fn is_adjunction(&self, node: NodeIndex) -> bool {
        if !self.is_nonterminal(node) {
            return false;
        }
        let label = self.label(node);
        self.children(node)
            .iter()
            .all(|&child| self.label(child) == label || self.is_punctuation(child))
    }

    /// Returns whether all right siblings of `node` are punctuation.
    fn is_last_nonpunctuation(&self, node: NodeIndex) -> bool {
        let parent = match self.parent(node) {
            Some(parent) => parent,
            None => return true,
        };
        self.children(parent)
            .iter()
            .skip_while(|&&sibling| sibling != node)
            .skip(1)
            .all(|&sibling| self.is_punctuation(sibling))
    }

    /// Returns whether `node` has exactly one non-empty child which carries the same label.
    fn is_adjunction_site(&self, node: NodeIndex) -> bool {
        if !self.is_nonterminal(node) {
            return false;
        }
        let label = self.label(node);
        let mut non_empty_same = 0;
        for &child in self.children(node).iter() {
            if self.is_empty(child) {
                continue;
            }
            if self.label(child) != label || non_empty_same > 0 {
                return false;
            }
            non_empty_same += 1;
        }
        non_empty_same == 1
    }

    /// Get the labels of all terminals.
    ///
    /// Terminals below empty preterminals are skipped unless `include_empty` is `true`.
    fn terminals(&self, include_empty: bool) -> Vec<&str> {
        let mut terminals = Vec::new();
        collect_terminals(self, self.root(), include_empty, &mut terminals);
        terminals
    }

    /// Get the labels of all preterminals, i.e. the part of speech sequence.
    fn preterminals(&self, include_empty: bool) -> Vec<&str> {
        self.preterminal_nodes(include_empty)
            .into_iter()
            .map(|node| self.label(node))
            .collect()
    }

    /// Get the preterminal nodes in surface order.
    fn preterminal_nodes(&self, include_empty: bool) -> Vec<NodeIndex> {
        let mut preterminals = Vec::new();
        collect_preterminals(self, self.root(), include_empty, &mut preterminals);
        preterminals
    }

    /// Get all nodes, parents before their children.
    fn preorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        order
    }

    /// Get all nodes, children before their parents.
    fn postorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        collect_postorder(self, self.root(), &mut order);
        order
    }

    /// Call `f` on every node in preorder together with the node's ancestors, root first.
    fn preorder_ancestors<F>(&self, mut f: F)
    where
        F: FnMut(NodeIndex, &[NodeIndex]),
        Self: Sized,
    {
        let mut ancestors = Vec::new();
        visit_with_ancestors(self, self.root(), &mut ancestors, &mut f);
    }

    /// Count the nodes satisfying `predicate`.
    fn count<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(NodeIndex) -> bool,
        Self: Sized,
    {
        self.preorder()
            .into_iter()
            .filter(|&node| predicate(node))
            .count()
    }

    /// Get the number of nodes.
    fn size(&self) -> usize {
        self.preorder().len()
    }

    /// Get the length of the longest path from the root to a terminal.
    fn max_depth(&self) -> usize {
        depth(self, self.root())
    }
}

fn collect_terminals<'a, T>(tree: &'a T, node: NodeIndex, include_empty: bool, out: &mut Vec<&'a str>)
where
    T: Navigate + ?Sized,
{
    let children = tree.children(node);
    if children.is_empty() {
        out.push(tree.label(node));
    } else if include_empty || !tree.node(node).is_none_label() {
        for &child in children.iter() {
            collect_terminals(tree, child, include_empty, out);
        }
    }
}

fn collect_preterminals<T>(tree: &T, node: NodeIndex, include_empty: bool, out: &mut Vec<NodeIndex>)
where
    T: Navigate + ?Sized,
{
    if tree.is_preterminal(node) {
        if include_empty || !tree.node(node).is_none_label() {
            out.push(node);
        }
    } else {
        for &child in tree.children(node).iter() {
            collect_preterminals(tree, child, include_empty, out);
        }
    }
}

fn collect_postorder<T>(tree: &T, node: NodeIndex, out: &mut Vec<NodeIndex>)
where
    T: Navigate + ?Sized,
{
    for &child in tree.children(node).iter() {
        collect_postorder(tree, child, out);
    }
    out.push(node);
}

fn visit_with_ancestors<T, F>(tree: &T, node: NodeIndex, ancestors: &mut Vec<NodeIndex>, f: &mut F)
where
    T: Navigate + ?Sized,
    F: FnMut(NodeIndex, &[NodeIndex]),
{
    f(node, ancestors);
    ancestors.push(node);
    for &child in tree.children(node).iter() {
        visit_with_ancestors(tree, child, ancestors, f);
    }
    ancestors.pop();
}

fn depth<T>(tree: &T, node: NodeIndex) -> usize
where
    T: Navigate + ?Sized,
{
    tree.children(node)
        .iter()
        .map(|&child| 1 + depth(tree, child))
        .max()
        .unwrap_or(0)
}

/// `Tree`
///
/// `Tree`s represent constituency trees and consist of `Node`s. Nodes are stored in a
/// `StableGraph`, edges point from parents to children and carry the position of the child
/// among its siblings.
#[derive(Debug, Clone)]
pub struct Tree {
    graph: StableGraph<Node, usize>,
    root: NodeIndex,
}

impl Tree {
    /// Construct a tree consisting of a single node.
    pub fn new(label: impl Into<String>) -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(Node::new(label));
        Tree { graph, root }
    }

    /// Append a new node labeled `label` as the last child of `parent`.
    ///
    /// Returns the index of the new node.
    pub fn push_child(&mut self, parent: NodeIndex, label: impl Into<String>) -> NodeIndex {
        let position = self
            .graph
            .edges_directed(parent, Direction::Outgoing)
            .count();
        let child = self.graph.add_node(Node::new(label));
        self.graph.add_edge(parent, child, position);
        child
    }

    /// Get an immutable reference to the underlying `StableGraph`.
    pub fn graph(&self) -> &StableGraph<Node, usize> {
        &self.graph
    }

    /// Get a mutable reference to the underlying `StableGraph`.
    pub(crate) fn graph_mut(&mut self) -> &mut StableGraph<Node, usize> {
        &mut self.graph
    }

    /// Deep copy of the subtree rooted at `node`.
    pub fn subtree(&self, node: NodeIndex) -> Tree {
        let mut tree = Tree::new(self.label(node));
        let root = tree.root();
        copy_children(self, node, &mut tree, root);
        tree
    }
}

fn copy_children(source: &Tree, from: NodeIndex, target: &mut Tree, to: NodeIndex) {
    for &child in source.children(from).iter() {
        let copy = target.push_child(to, source.label(child));
        copy_children(source, child, target, copy);
    }
}

impl Navigate for Tree {
    fn root(&self) -> NodeIndex {
        self.root
    }

    fn node(&self, node: NodeIndex) -> &Node {
        &self.graph[node]
    }

    fn children(&self, node: NodeIndex) -> Cow<[NodeIndex]> {
        let mut children = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge_ref| (*edge_ref.weight(), edge_ref.target()))
            .collect::<Vec<_>>();
        children.sort_unstable_by_key(|&(position, _)| position);
        Cow::Owned(children.into_iter().map(|(_, child)| child).collect())
    }

    fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .map(|edge_ref| edge_ref.source())
    }

    fn is_terminal(&self, node: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .is_none()
    }
}

/// Incrementally builds a tree top-down.
///
/// The first node added without a parent becomes the root.
pub(crate) struct TreeBuilder {
    tree: Option<Tree>,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        TreeBuilder { tree: None }
    }

    /// Adds a node below `parent`, or the root if `parent` is `None`.
    ///
    /// Returns `None` if a second root is added.
    pub(crate) fn add(
        &mut self,
        parent: Option<NodeIndex>,
        label: impl Into<String>,
    ) -> Option<NodeIndex> {
        match (parent, self.tree.as_mut()) {
            (Some(parent), Some(tree)) => Some(tree.push_child(parent, label)),
            (None, None) => {
                let tree = Tree::new(label);
                let root = tree.root();
                self.tree = Some(tree);
                Some(root)
            }
            _ => None,
        }
    }

    pub(crate) fn finish(self) -> Option<Tree> {
        self.tree
    }
}

fn subtrees_equal(a: &Tree, node_a: NodeIndex, b: &Tree, node_b: NodeIndex) -> bool {
    if a.label(node_a) != b.label(node_b) {
        return false;
    }
    let children_a = a.children(node_a);
    let children_b = b.children(node_b);
    children_a.len() == children_b.len()
        && children_a
            .iter()
            .zip(children_b.iter())
            .all(|(&child_a, &child_b)| subtrees_equal(a, child_a, b, child_b))
}

/// Trees are equal if they have the same labels in the same configuration.
impl PartialEq for Tree {
    fn eq(&self, other: &Tree) -> bool {
        subtrees_equal(self, self.root, other, other.root)
    }
}

impl Index<NodeIndex> for Tree {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &<Self as Index<NodeIndex>>::Output {
        &self.graph[index]
    }
}

impl IndexMut<NodeIndex> for Tree {
    fn index_mut(&mut self, index: NodeIndex) -> &mut <Self as Index<NodeIndex>>::Output {
        &mut self.graph[index]
    }
}

#[cfg(test)]
mod tests {
    use crate::io::{PTBFormat, ReadTree};
    use crate::{Navigate, Tree};

    fn tree(s: &str) -> Tree {
        PTBFormat::Plain.string_to_tree(s).unwrap()
    }

    #[test]
    fn build_tree() {
        let mut t = Tree::new("S1");
        let root = t.root();
        let s = t.push_child(root, "S");
        let np = t.push_child(s, "NP");
        let dt = t.push_child(np, "DT");
        t.push_child(dt, "the");
        let nn = t.push_child(np, "NN");
        t.push_child(nn, "dog");
        let vp = t.push_child(s, "VP");
        let vbz = t.push_child(vp, "VBZ");
        t.push_child(vbz, "barks");
        assert_eq!(
            t,
            tree("(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))")
        );
        assert_eq!(&*t.children(np), &[dt, nn]);
        assert_eq!(t.parent(np), Some(s));
        assert_eq!(t.next_sibling(np), Some(vp));
        assert_eq!(t.next_sibling(vp), None);
        t[vp].set_label("VBP");
        assert_eq!(t.label(vp), "VBP");
    }

    #[test]
    fn node_kinds() {
        let t = tree("(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks)) (. .)))");
        let root = t.root();
        assert!(t.is_root(root));
        assert!(t.is_nonterminal(root));
        let preterminals = t.preterminal_nodes(true);
        assert_eq!(preterminals.len(), 4);
        assert!(t.is_preterminal(preterminals[0]));
        assert!(!t.is_nonterminal(preterminals[0]));
        assert!(t.is_closed_class(preterminals[0]));
        assert!(t.is_functional(preterminals[0]));
        assert!(t.is_punctuation(preterminals[3]));
        let word = t.first_child(preterminals[1]).unwrap();
        assert!(t.is_terminal(word));
        assert!(!t.is_preterminal(word));
        assert_eq!(t.label(word), "dog");
    }

    #[test]
    fn empty_nodes() {
        let t = tree("(S1 (S (NP-SBJ (-NONE- *T*)) (VP (VBZ runs) (NP (-NONE- *)))))");
        let s = t.first_child(t.root()).unwrap();
        let children = t.children(s);
        assert!(t.is_empty(children[0]));
        assert!(!t.is_empty(children[1]));
        assert!(t.is_none(t.first_child(children[0]).unwrap()));
        assert_eq!(t.terminals(false), vec!["runs"]);
        assert_eq!(t.terminals(true), vec!["*T*", "runs", "*"]);
        assert_eq!(t.preterminals(false), vec!["VBZ"]);
        assert_eq!(t.preterminals(true), vec!["-NONE-", "VBZ", "-NONE-"]);
    }

    #[test]
    fn coordination_and_adjunction() {
        let t = tree("(S1 (NP (NP (NNS cats)) (CC and) (NP (NNS dogs)) (, ,)))");
        let np = t.first_child(t.root()).unwrap();
        assert!(t.is_coordination(np));
        assert!(!t.is_adjunction(np));
        let children = t.children(np);
        assert!(!t.is_last_nonpunctuation(children[0]));
        assert!(t.is_last_nonpunctuation(children[2]));

        let t = tree("(S1 (NP (CC and) (NP (NNS dogs))))");
        let np = t.first_child(t.root()).unwrap();
        assert!(!t.is_coordination(np));

        let t = tree("(S1 (NP (NP (NNS dogs)) (, ,) (NP (NNS cats))))");
        let np = t.first_child(t.root()).unwrap();
        assert!(t.is_adjunction(np));
        assert!(!t.is_coordination(np));
    }

    #[test]
    fn adjunction_site() {
        let t = tree("(S1 (VP (VP (VB go)) (NP (-NONE- *))))");
        let vp = t.first_child(t.root()).unwrap();
        assert!(t.is_adjunction_site(vp));
        let t = tree("(S1 (VP (VP (VB go)) (NP (NN home))))");
        let vp = t.first_child(t.root()).unwrap();
        assert!(!t.is_adjunction_site(vp));
    }

    #[test]
    fn traversals() {
        let t = tree("(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))");
        let labels = |order: Vec<_>| order.into_iter().map(|n| t.label(n)).collect::<Vec<_>>();
        assert_eq!(
            labels(t.preorder()),
            vec!["S1", "S", "NP", "DT", "the", "NN", "dog", "VP", "VBZ", "barks"]
        );
        assert_eq!(
            labels(t.postorder()),
            vec!["the", "DT", "dog", "NN", "NP", "barks", "VBZ", "VP", "S", "S1"]
        );
        assert_eq!(t.size(), 10);
        assert_eq!(t.max_depth(), 4);
        assert_eq!(t.count(|n| t.is_preterminal(n)), 3);

        let mut depths = Vec::new();
        t.preorder_ancestors(|node, ancestors| {
            if t.is_terminal(node) {
                depths.push(ancestors.len());
            }
        });
        assert_eq!(depths, vec![4, 4, 4]);
    }

    #[test]
    fn subtree_copy() {
        let t = tree("(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))");
        let np = t.first_child(t.first_child(t.root()).unwrap()).unwrap();
        assert_eq!(t.subtree(np), tree("(NP (DT the) (NN dog))"));
        assert_ne!(t.subtree(np), tree("(NP (DT a) (NN dog))"));
    }
}
