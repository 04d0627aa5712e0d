use petgraph::prelude::NodeIndex;

use crate::node::ROOT_LABEL;
use crate::tree::TreeBuilder;
use crate::{Navigate, Tree};

/// Trait specifying methods to modify tree structure.
pub trait TreeOps {
    /// Remove function tags from all non-terminal and preterminal labels.
    ///
    /// E.g. `NP-SBJ-2` becomes `NP`. Terminals are left untouched.
    fn strip_function_tags(&mut self);

    /// Relabel the root with the root category.
    ///
    /// Returns the previous root label.
    fn relabel_root(&mut self) -> String;

    /// Copy the tree without empty nodes.
    ///
    /// Nodes dominating only empty nodes are removed as well. If `delete_adjunctions` is
    /// `true`, adjunction sites are replaced by their single non-empty child. Returns `None`
    /// if the whole tree is empty.
    fn copy_without_empties(&self, delete_adjunctions: bool) -> Option<Tree>;

    /// Remove nodes that are the only child of a node with the same label.
    ///
    /// The root is never removed, neither are nodes whose only child is a terminal.
    fn delete_unary_same_label_chains(&mut self);
}

impl TreeOps for Tree {
    fn strip_function_tags(&mut self) {
        for node in self.preorder() {
            if self.is_terminal(node) {
                continue;
            }
            let simplified = self[node].simplified_label().to_owned();
            self[node].set_label(simplified);
        }
    }

    fn relabel_root(&mut self) -> String {
        let root = self.root();
        self[root].set_label(ROOT_LABEL)
    }

    fn copy_without_empties(&self, delete_adjunctions: bool) -> Option<Tree> {
        let mut builder = TreeBuilder::new();
        copy_non_empty(self, self.root(), delete_adjunctions, &mut builder, None);
        builder.finish()
    }

    fn delete_unary_same_label_chains(&mut self) {
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            loop {
                let children = self.children(node);
                if children.len() != 1
                    || self.is_terminal(children[0])
                    || self.label(children[0]) != self.label(node)
                {
                    break;
                }
                let child = children[0];
                let grandchildren = self.children(child).into_owned();
                self.graph_mut().remove_node(child);
                for (position, grandchild) in grandchildren.into_iter().enumerate() {
                    self.graph_mut().add_edge(node, grandchild, position);
                }
            }
            stack.extend(self.children(node).iter().rev());
        }
    }
}

fn copy_non_empty(
    source: &Tree,
    node: NodeIndex,
    delete_adjunctions: bool,
    builder: &mut TreeBuilder,
    parent: Option<NodeIndex>,
) {
    if source.is_empty(node) {
        return;
    }
    if delete_adjunctions && source.is_adjunction_site(node) {
        for &child in source.children(node).iter() {
            copy_non_empty(source, child, delete_adjunctions, builder, parent);
        }
        return;
    }
    if let Some(copy) = builder.add(parent, source.label(node)) {
        for &child in source.children(node).iter() {
            copy_non_empty(source, child, delete_adjunctions, builder, Some(copy));
        }
    }
}
