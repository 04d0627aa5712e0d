use std::cmp::max;
use std::iter;

use petgraph::prelude::NodeIndex;

use crate::features::{
    add, is_bounding_node, label_of, visited_nodes, word_of, ExtractFeatures, FeatureCounts,
    ADJUNCT_MARKER, CHILD_MARKER, CONJUNCT_MARKER, END_MARKER, HEAD_MARKER, LAST_ADJUNCT_MARKER,
    LAST_CONJUNCT_MARKER, NONROOT_MARKER, POSTHEAD_MARKER, PREHEAD_MARKER,
};
use crate::heads::HeadKind;
use crate::{AnnotatedTree, Navigate, Parse};

/// Amount of lexical annotation on a child.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum AnnotationLevel {
    None,
    /// Add the tag of the lexical head.
    Pos,
    /// Add the tag and the word of the lexical head.
    Lexical,
}

// Head kinds are written 0 for semantic and 1 for syntactic heads in rule-like identifiers.
fn rule_kind_id(kind: HeadKind) -> usize {
    match kind {
        HeadKind::Semantic => 0,
        HeadKind::Syntactic => 1,
    }
}

/// Context annotation shared by `Rule` and `NGram`.
///
/// Children are annotated with their lexical heads depending on the annotation levels: `head`
/// applies to the head child, `functional` to children headed by function words and `all` to
/// every child. A feature is only counted if its most detailed annotation reaches the
/// highest of the three levels.
#[derive(Clone, Debug)]
pub struct RuleContext {
    pub n_anc_cats: usize,
    pub label_root: bool,
    pub label_conjunct: bool,
    pub head: AnnotationLevel,
    pub functional: AnnotationLevel,
    pub all: AnnotationLevel,
    pub kind: HeadKind,
}

impl Default for RuleContext {
    fn default() -> Self {
        RuleContext {
            n_anc_cats: 0,
            label_root: false,
            label_conjunct: false,
            head: AnnotationLevel::None,
            functional: AnnotationLevel::None,
            all: AnnotationLevel::None,
            kind: HeadKind::Syntactic,
        }
    }
}

impl RuleContext {
    fn max_level(&self) -> AnnotationLevel {
        max(self.head, max(self.functional, self.all))
    }

    fn identifier(&self, stem: &str) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}",
            stem,
            self.n_anc_cats,
            self.label_root as usize,
            self.label_conjunct as usize,
            self.head as usize,
            self.functional as usize,
            self.all as usize,
            rule_kind_id(self.kind),
        )
    }

    fn annotates(&self, level: AnnotationLevel, functional: bool, headchild: bool) -> bool {
        self.all >= level
            || (functional && self.functional >= level)
            || (headchild && self.head >= level)
    }

    /// Push the category of `node` and the annotation of its lexical head.
    ///
    /// `node` is annotated as head child if it is the head child of `parent`.
    fn push_child_features(
        &self,
        tree: &AnnotatedTree,
        node: NodeIndex,
        parent: NodeIndex,
        f: &mut Vec<String>,
        highest: &mut AnnotationLevel,
    ) {
        let headchild = tree.headchild(parent, self.kind) == Some(node);
        f.push(label_of(tree, node));
        let lexhead = match tree.lexhead(node, self.kind) {
            Some(lexhead) => lexhead,
            None => return,
        };
        let functional = tree.is_functional(lexhead);

        if !self.annotates(AnnotationLevel::Pos, functional, headchild) {
            return;
        }
        if lexhead != node {
            f.push(HEAD_MARKER.to_owned());
            f.push(label_of(tree, lexhead));
            *highest = max(*highest, AnnotationLevel::Pos);
        }

        if !self.annotates(AnnotationLevel::Lexical, functional, headchild) {
            return;
        }
        f.push(word_of(tree, lexhead));
        *highest = AnnotationLevel::Lexical;
    }

    /// Push the categories of `node` and its ancestors.
    fn push_ancestor_features(&self, tree: &AnnotatedTree, mut node: NodeIndex, f: &mut Vec<String>) {
        f.push(END_MARKER.to_owned());

        let mut parent = tree.parent(node);
        for _ in 0..=self.n_anc_cats {
            let ancestor = match parent {
                Some(ancestor) => ancestor,
                None => break,
            };
            f.push(label_of(tree, node));
            if self.label_conjunct {
                let last = tree.is_last_nonpunctuation(ancestor);
                if tree.is_coordination(ancestor) {
                    f.push(if last { LAST_CONJUNCT_MARKER } else { CONJUNCT_MARKER }.to_owned());
                } else if tree.is_adjunction(ancestor) {
                    f.push(if last { LAST_ADJUNCT_MARKER } else { ADJUNCT_MARKER }.to_owned());
                }
            }
            node = ancestor;
            parent = tree.parent(node);
        }

        if self.label_root {
            let mut ancestor = parent;
            while let Some(node) = ancestor {
                let grandparent = tree.parent(node);
                if is_bounding_node(tree, Some(node)) && !is_bounding_node(tree, grandparent) {
                    f.push(NONROOT_MARKER.to_owned());
                    break;
                }
                ancestor = grandparent;
            }
        }
    }
}

/// Local trees, optionally with ancestor local trees and lexicalized children.
///
/// Identifier: `Rule:<n_anc_trees>:<n_anc_cats>:<root>:<conj>:<head>:<functional>:<all>:<type>`
#[derive(Clone, Debug)]
pub struct Rule {
    n_anc_trees: usize,
    context: RuleContext,
    identifier: String,
}

impl Rule {
    pub fn new(n_anc_trees: usize, context: RuleContext) -> Self {
        let identifier = context.identifier(&format!("Rule:{}", n_anc_trees));
        Rule {
            n_anc_trees,
            context,
            identifier,
        }
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule::new(0, RuleContext::default())
    }
}

impl ExtractFeatures for Rule {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Vec<String>>) {
        let tree = parse.annotated();
        let context = &self.context;
        for node in visited_nodes(tree) {
            if !tree.is_nonterminal(node) {
                continue;
            }

            let mut f = Vec::new();
            let mut highest = AnnotationLevel::None;
            for &child in tree.children(node).iter() {
                context.push_child_features(tree, child, node, &mut f, &mut highest);
            }

            let mut node = node;
            for _ in 0..self.n_anc_trees {
                let parent = match tree.parent(node) {
                    Some(parent) => parent,
                    None => break,
                };
                f.push(END_MARKER.to_owned());
                for &sibling in tree.children(parent).iter() {
                    if sibling == node {
                        f.push(CHILD_MARKER.to_owned());
                        f.push(label_of(tree, sibling));
                    } else {
                        // heads are looked up on the lower node, siblings are never head children
                        context.push_child_features(tree, sibling, node, &mut f, &mut highest);
                    }
                }
                node = parent;
            }

            if highest != context.max_level() {
                continue;
            }
            context.push_ancestor_features(tree, node, &mut f);
            add(counts, f, 1.);
        }
    }
}

/// Subsequences of the children of a node.
///
/// Each n-gram is marked as preceding or following the head child. If the n-gram does not
/// contain the head child and heads are annotated, the head child is added.
///
/// Identifier: `NGram:<frag_len>:<n_anc_cats>:<root>:<conj>:<head>:<functional>:<all>:<type>`
#[derive(Clone, Debug)]
pub struct NGram {
    frag_len: usize,
    context: RuleContext,
    identifier: String,
}

impl NGram {
    pub fn new(frag_len: usize, context: RuleContext) -> Self {
        let identifier = context.identifier(&format!("NGram:{}", frag_len));
        NGram {
            frag_len,
            context,
            identifier,
        }
    }
}

impl ExtractFeatures for NGram {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Vec<String>>) {
        let tree = parse.annotated();
        let context = &self.context;
        for node in visited_nodes(tree) {
            if !tree.is_nonterminal(node) {
                continue;
            }
            let children = tree.children(node);
            if children.len() < self.frag_len {
                continue;
            }

            let headchild = tree.headchild(node, context.kind);
            let padded = iter::once(None)
                .chain(children.iter().cloned().map(Some))
                .chain(iter::once(None))
                .collect::<Vec<_>>();

            let mut head_position = PREHEAD_MARKER;
            for start in 0..=padded.len() - self.frag_len {
                if padded[start] == headchild {
                    head_position = POSTHEAD_MARKER;
                }

                let mut f = Vec::new();
                let mut highest = AnnotationLevel::None;
                let mut includes_headchild = false;
                for &child in &padded[start..start + self.frag_len] {
                    match child {
                        Some(child) => {
                            context.push_child_features(tree, child, node, &mut f, &mut highest)
                        }
                        None => f.push(END_MARKER.to_owned()),
                    }
                    if child == headchild {
                        includes_headchild = true;
                    }
                }
                f.push(head_position.to_owned());

                if !includes_headchild && context.head != AnnotationLevel::None {
                    if let Some(headchild) = headchild {
                        context.push_child_features(tree, headchild, node, &mut f, &mut highest);
                    }
                }

                // stop at the first n-gram whose children stay below the highest level
                if highest != context.max_level() {
                    break;
                }
                context.push_ancestor_features(tree, node, &mut f);
                add(counts, f, 1.);
            }
        }
    }
}

/// Words with their ancestor categories.
///
/// Identifier: `Word:<n_anc_cats>`
#[derive(Clone, Debug)]
pub struct Word {
    n_anc_cats: usize,
    identifier: String,
}

impl Word {
    pub fn new(n_anc_cats: usize) -> Self {
        Word {
            n_anc_cats,
            identifier: format!("Word:{}", n_anc_cats),
        }
    }
}

impl ExtractFeatures for Word {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Vec<String>>) {
        let tree = parse.annotated();
        'nodes: for preterminal in visited_nodes(tree) {
            if !tree.is_preterminal(preterminal) {
                continue;
            }
            let mut f = vec![word_of(tree, preterminal)];
            let mut node = Some(preterminal);
            for _ in 0..self.n_anc_cats {
                let current = match node {
                    Some(current) => current,
                    None => continue 'nodes,
                };
                f.push(label_of(tree, current));
                node = tree.parent(current);
            }
            add(counts, f, 1.);
        }
    }
}

/// Words with their maximal projection.
///
/// A word projects through the nodes it heads. The root category does not count as a
/// projection.
///
/// Identifier: `WProj:<type>:<include_nonmaximal>:<n_ancs>`
#[derive(Clone, Debug)]
pub struct WProj {
    kind: HeadKind,
    include_nonmaximal: bool,
    n_ancs: usize,
    identifier: String,
}

impl WProj {
    pub fn new(kind: HeadKind, include_nonmaximal: bool, n_ancs: usize) -> Self {
        WProj {
            kind,
            include_nonmaximal,
            n_ancs,
            identifier: format!(
                "WProj:{}:{}:{}",
                rule_kind_id(kind),
                include_nonmaximal as usize,
                n_ancs
            ),
        }
    }
}

impl ExtractFeatures for WProj {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Vec<String>>) {
        let tree = parse.annotated();
        for preterminal in visited_nodes(tree) {
            if tree.is_punctuation(preterminal) || !tree.is_preterminal(preterminal) {
                continue;
            }

            let mut f = vec![word_of(tree, preterminal)];
            let mut node = preterminal;
            while let Some(parent) = tree.parent(node) {
                let is_headchild =
                    tree.headchild(parent, self.kind) == Some(node) && !tree.is_root(parent);
                if !is_headchild {
                    break;
                }
                if self.include_nonmaximal {
                    f.push(label_of(tree, node));
                }
                node = parent;
            }

            let mut ancestor = Some(node);
            for _ in 0..=self.n_ancs {
                let current = match ancestor {
                    Some(current) => current,
                    None => break,
                };
                f.push(label_of(tree, current));
                ancestor = tree.parent(current);
            }
            add(counts, f, 1.);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::features::tests::counts;
    use crate::features::{AnnotationLevel, ExtractFeatures, NGram, Rule, RuleContext, WProj, Word};
    use crate::heads::HeadKind;

    const TREE: &str = "(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks)) (. .)))";

    fn keys<E>(extractor: &E, tree: &str) -> Vec<String>
    where
        E: ExtractFeatures,
    {
        counts(extractor, tree)
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    #[test]
    fn identifiers() {
        assert_eq!(Rule::default().identifier(), "Rule:0:0:0:0:0:0:0:1");
        let context = RuleContext {
            n_anc_cats: 1,
            all: AnnotationLevel::Lexical,
            functional: AnnotationLevel::Lexical,
            ..RuleContext::default()
        };
        assert_eq!(Rule::new(0, context.clone()).identifier(), "Rule:0:1:0:0:0:2:2:1");
        assert_eq!(
            Rule::new(0, context.clone()).identifier(),
            Rule::new(0, context).identifier()
        );
        let context = RuleContext {
            label_conjunct: true,
            kind: HeadKind::Semantic,
            ..RuleContext::default()
        };
        assert_eq!(NGram::new(2, context).identifier(), "NGram:2:0:0:1:0:0:0:0");
        assert_ne!(
            NGram::new(2, RuleContext::default()).identifier(),
            NGram::new(3, RuleContext::default()).identifier()
        );
        assert_eq!(Word::new(2).identifier(), "Word:2");
        assert_eq!(WProj::new(HeadKind::Semantic, false, 1).identifier(), "WProj:0:0:1");
    }

    #[test]
    fn plain_rules() {
        assert_eq!(
            keys(&Rule::default(), TREE),
            vec!["(DT NN _ NP)", "(NP VP . _ S)", "(S _)", "(VBZ _ VP)"]
        );
    }

    #[test]
    fn rules_with_ancestors() {
        let rule = Rule::new(1, RuleContext::default());
        let keys = keys(&rule, TREE);
        assert!(keys.contains(&"(DT NN _ *CHILD* NP VP . _ S)".to_owned()));
        assert!(keys.contains(&"(NP VP . _ *CHILD* S _)".to_owned()));
        // the root has no parent, so it has no ancestor rule
        assert!(keys.contains(&"(S _)".to_owned()));
    }

    #[test]
    fn lexicalized_rules() {
        let context = RuleContext {
            head: AnnotationLevel::Lexical,
            ..RuleContext::default()
        };
        let keys = keys(&Rule::new(0, context), TREE);
        assert!(keys.contains(&"(DT the NN _ NP)".to_owned()));
        assert!(keys.contains(&"(NP VP *HEAD* VBZ barks . _ S)".to_owned()));
    }

    #[test]
    fn conjunct_and_root_labels() {
        let context = RuleContext {
            label_conjunct: true,
            label_root: true,
            n_anc_cats: 1,
            ..RuleContext::default()
        };
        let tree = "(S1 (S (NP (NP (NN cats)) (CC and) (NP (NNS dogs))) (VP (VBP bark))))";
        let keys = keys(&Rule::new(0, context.clone()), tree);
        assert!(keys.contains(&"(NN _ NP *CONJ* NP)".to_owned()));
        assert!(keys.contains(&"(NNS _ NP *CONJ* NP)".to_owned()));

        // the coordination is the last child of the VP
        let tree = "(S1 (S (VP (VB feed) (NP (NP (NNS cats)) (CC and) (NP (NNS dogs))))))";
        let counts = counts(&Rule::new(0, context.clone()), tree);
        assert!(counts.contains(&("(NNS _ NP *LASTCONJ* NP *NONROOT*)".to_owned(), 2.)));

        let tree = "(S1 (S (NP (NN it)) (VP (VBZ is) (ADJP (JJ red) (PP (IN of) (NP (NN color)))))))";
        let keys = self::keys(&Rule::new(0, context), tree);
        assert!(keys.contains(&"(IN NP _ PP ADJP *NONROOT*)".to_owned()));
        assert!(keys.contains(&"(NP VP _ S)".to_owned()));
    }

    #[test]
    fn ngrams() {
        let context = RuleContext {
            n_anc_cats: 0,
            ..RuleContext::default()
        };
        let keys = keys(&NGram::new(2, context), TREE);
        assert!(keys.contains(&"(_ NP *PREHEAD* _ S)".to_owned()));
        assert!(keys.contains(&"(NP VP *PREHEAD* _ S)".to_owned()));
        assert!(keys.contains(&"(VP . *POSTHEAD* _ S)".to_owned()));
        assert!(keys.contains(&"(. _ *POSTHEAD* _ S)".to_owned()));
    }

    #[test]
    fn words() {
        let counts = counts(&Word::new(2), TREE);
        assert!(counts.contains(&("(dog NN NP)".to_owned(), 1.)));
        assert!(counts.contains(&("(. . S)".to_owned(), 1.)));
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn word_projections() {
        let keys = keys(&WProj::new(HeadKind::Syntactic, false, 1), TREE);
        assert!(keys.contains(&"(dog NN NP)".to_owned()));
        assert!(keys.contains(&"(the NP S)".to_owned()));
        // S is not projected to the root
        assert!(keys.contains(&"(barks S S1)".to_owned()));
        assert!(!keys.iter().any(|key| key.starts_with("(. ")));

        let keys = self::keys(&WProj::new(HeadKind::Syntactic, true, 0), TREE);
        assert!(keys.contains(&"(barks VBZ VP S)".to_owned()));
    }
}
