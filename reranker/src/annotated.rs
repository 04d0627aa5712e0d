use std::borrow::Cow;

use petgraph::prelude::NodeIndex;
use petgraph::visit::NodeIndexable;

use crate::heads::{HeadFinder, HeadKind, Language};
use crate::{Navigate, Node, Span, Tree};

/// Annotation of a single node.
#[derive(Clone, Debug, Default)]
struct Annotation {
    span: Span,
    parent: Option<NodeIndex>,
    previous: Option<NodeIndex>,
    next: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    syntactic_headchild: Option<NodeIndex>,
    syntactic_lexhead: Option<NodeIndex>,
    semantic_headchild: Option<NodeIndex>,
    semantic_lexhead: Option<NodeIndex>,
}

/// `AnnotatedTree`
///
/// A tree decorated with string positions, parent and sibling links and syntactic and semantic
/// heads. The annotations are computed once by an `Annotator` and never change afterwards.
///
/// Positions count every terminal, including the terminals of empty nodes.
#[derive(Clone, Debug)]
pub struct AnnotatedTree {
    tree: Tree,
    annotations: Vec<Annotation>,
}

impl AnnotatedTree {
    fn annotation(&self, node: NodeIndex) -> &Annotation {
        &self.annotations[node.index()]
    }

    /// Get the underlying tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Get the position before the first terminal dominated by `node`.
    pub fn left(&self, node: NodeIndex) -> usize {
        self.annotation(node).span.start
    }

    /// Get the position after the last terminal dominated by `node`.
    pub fn right(&self, node: NodeIndex) -> usize {
        self.annotation(node).span.end
    }

    pub fn span(&self, node: NodeIndex) -> Span {
        self.annotation(node).span
    }

    /// Get the sibling immediately to the left of `node`.
    pub fn previous(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.annotation(node).previous
    }

    /// Get the head child of `node`.
    ///
    /// Only nonterminals have head children.
    pub fn headchild(&self, node: NodeIndex, kind: HeadKind) -> Option<NodeIndex> {
        let annotation = self.annotation(node);
        match kind {
            HeadKind::Syntactic => annotation.syntactic_headchild,
            HeadKind::Semantic => annotation.semantic_headchild,
        }
    }

    /// Get the lexical head of `node`.
    ///
    /// The lexical head is a preterminal, preterminals are their own lexical heads.
    pub fn lexhead(&self, node: NodeIndex, kind: HeadKind) -> Option<NodeIndex> {
        let annotation = self.annotation(node);
        match kind {
            HeadKind::Syntactic => annotation.syntactic_lexhead,
            HeadKind::Semantic => annotation.semantic_lexhead,
        }
    }

    /// Returns whether `node` is the head child of its parent.
    pub fn is_headchild(&self, node: NodeIndex, kind: HeadKind) -> bool {
        self.parent(node)
            .map(|parent| self.headchild(parent, kind) == Some(node))
            .unwrap_or(false)
    }

    /// Get the word of a preterminal.
    pub fn word(&self, preterminal: NodeIndex) -> Option<&str> {
        self.annotation(preterminal)
            .children
            .first()
            .map(|&terminal| self.label(terminal))
    }

    /// Get the head word of `node`.
    pub fn headword(&self, node: NodeIndex, kind: HeadKind) -> Option<&str> {
        self.lexhead(node, kind).and_then(|lexhead| self.word(lexhead))
    }

    /// Get the tag of the lexical head of `node`.
    pub fn headtag(&self, node: NodeIndex, kind: HeadKind) -> Option<&str> {
        self.lexhead(node, kind).map(|lexhead| self.label(lexhead))
    }

    /// Unwrap the underlying tree.
    pub fn into_tree(self) -> Tree {
        self.tree
    }
}

impl Navigate for AnnotatedTree {
    fn root(&self) -> NodeIndex {
        self.tree.root()
    }

    fn node(&self, node: NodeIndex) -> &Node {
        self.tree.node(node)
    }

    fn children(&self, node: NodeIndex) -> Cow<[NodeIndex]> {
        Cow::Borrowed(&self.annotation(node).children)
    }

    fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.annotation(node).parent
    }

    fn first_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.annotation(node).children.first().cloned()
    }

    fn next_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.annotation(node).next
    }

    fn is_terminal(&self, node: NodeIndex) -> bool {
        self.annotation(node).children.is_empty()
    }
}

/// Builds `AnnotatedTree`s.
#[derive(Clone, Debug)]
pub struct Annotator {
    heads: HeadFinder,
    lowercase: bool,
}

impl Default for Annotator {
    fn default() -> Self {
        Annotator::new(Language::English, false)
    }
}

impl Annotator {
    /// Construct an annotator using the head rules of `language`.
    ///
    /// If `lowercase` is `true`, terminals are lowercased.
    pub fn new(language: Language, lowercase: bool) -> Self {
        Annotator {
            heads: HeadFinder::new(language),
            lowercase,
        }
    }

    pub fn heads(&self) -> &HeadFinder {
        &self.heads
    }

    /// Annotate `tree`.
    pub fn annotate(&self, mut tree: Tree) -> AnnotatedTree {
        let bound = tree.graph().node_bound();
        let mut annotations = vec![Annotation::default(); bound];

        // links
        for node in tree.preorder() {
            let children = tree.children(node).into_owned();
            for (idx, &child) in children.iter().enumerate() {
                let annotation = &mut annotations[child.index()];
                annotation.parent = Some(node);
                annotation.previous = if idx > 0 { Some(children[idx - 1]) } else { None };
                annotation.next = children.get(idx + 1).cloned();
            }
            annotations[node.index()].children = children;
        }

        // positions
        let mut position = 0;
        let root = tree.root();
        self.annotate_spans(&mut tree, &mut annotations, root, &mut position);

        // heads, children are visited before their parents
        let syntactic = self.heads.rules(HeadKind::Syntactic);
        let semantic = self.heads.rules(HeadKind::Semantic);
        for node in tree.postorder() {
            if tree.is_nonterminal(node) {
                let syntactic_headchild = syntactic.head_child(&tree, node);
                let semantic_headchild = semantic.head_child(&tree, node);
                let syntactic_lexhead = syntactic_headchild
                    .and_then(|head| annotations[head.index()].syntactic_lexhead);
                let semantic_lexhead =
                    semantic_headchild.and_then(|head| annotations[head.index()].semantic_lexhead);
                let annotation = &mut annotations[node.index()];
                annotation.syntactic_headchild = syntactic_headchild;
                annotation.syntactic_lexhead = syntactic_lexhead;
                annotation.semantic_headchild = semantic_headchild;
                annotation.semantic_lexhead = semantic_lexhead;
            } else if tree.is_preterminal(node) {
                let annotation = &mut annotations[node.index()];
                annotation.syntactic_lexhead = Some(node);
                annotation.semantic_lexhead = Some(node);
            }
        }

        AnnotatedTree { tree, annotations }
    }

    fn annotate_spans(
        &self,
        tree: &mut Tree,
        annotations: &mut [Annotation],
        node: NodeIndex,
        position: &mut usize,
    ) {
        let start = *position;
        if annotations[node.index()].children.is_empty() {
            if self.lowercase {
                let lowercased = tree.label(node).to_lowercase();
                tree[node].set_label(lowercased);
            }
            *position += 1;
        } else {
            for idx in 0..annotations[node.index()].children.len() {
                let child = annotations[node.index()].children[idx];
                self.annotate_spans(tree, annotations, child, position);
            }
        }
        annotations[node.index()].span = Span::new(start, *position);
    }
}
