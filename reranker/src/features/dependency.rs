use petgraph::prelude::NodeIndex;

use crate::features::{
    add, head_kind_id, label_of, visited_nodes, word_of, ExtractFeatures, FeatureCounts,
    END_MARKER,
};
use crate::heads::HeadKind;
use crate::{AnnotatedTree, Navigate, Parse};

/// Chains of head-to-head dependencies.
///
/// Every preterminal is followed upwards through its governors until `n_heads` heads
/// (including the dependent) are collected. Coordinations are transparent: a coordinated
/// head contributes every conjunct with the coordination's category as a governor.
///
/// Identifier: `Heads:<n_heads>:<governor_lex>:<dependent_lex>:<kind>`, with kind 0 for
/// syntactic and 1 for semantic heads.
#[derive(Clone, Debug)]
pub struct Heads {
    n_heads: usize,
    governor_lex: bool,
    dependent_lex: bool,
    kind: HeadKind,
    identifier: String,
}

impl Heads {
    pub fn new(n_heads: usize, governor_lex: bool, dependent_lex: bool, kind: HeadKind) -> Self {
        Heads {
            n_heads,
            governor_lex,
            dependent_lex,
            kind,
            identifier: format!(
                "Heads:{}:{}:{}:{}",
                n_heads,
                governor_lex as usize,
                dependent_lex as usize,
                head_kind_id(kind)
            ),
        }
    }

    fn visit_ancestors(
        &self,
        tree: &AnnotatedTree,
        node: NodeIndex,
        n_so_far: usize,
        f: &mut Vec<String>,
        counts: &mut FeatureCounts<Vec<String>>,
    ) {
        if n_so_far == self.n_heads {
            add(counts, f.clone(), 1.);
            return;
        }

        let ancestor = match tree.parent(node) {
            Some(ancestor) => ancestor,
            None => return,
        };

        if tree.is_coordination(ancestor) {
            return self.visit_ancestors(tree, ancestor, n_so_far, f, counts);
        }

        match tree.headchild(ancestor, self.kind) {
            Some(headchild) if headchild != node => {
                self.visit_descendants(tree, ancestor, n_so_far, headchild, f, counts)
            }
            _ => self.visit_ancestors(tree, ancestor, n_so_far, f, counts),
        }
    }

    /// Add the lexical heads of `head` as governors and continue above `ancestor`.
    fn visit_descendants(
        &self,
        tree: &AnnotatedTree,
        ancestor: NodeIndex,
        n_so_far: usize,
        head: NodeIndex,
        f: &mut Vec<String>,
        counts: &mut FeatureCounts<Vec<String>>,
    ) {
        if tree.is_preterminal(head) {
            let len = f.len();
            f.push(label_of(tree, head));
            if self.governor_lex {
                f.push(word_of(tree, head));
            }
            self.visit_ancestors(tree, ancestor, n_so_far + 1, f, counts);
            f.truncate(len);
        } else if tree.is_coordination(head) {
            for &child in tree.children(head).iter() {
                if tree.label(child) == tree.label(head) {
                    self.visit_descendants(tree, ancestor, n_so_far, child, f, counts);
                }
            }
        } else if let Some(headchild) = tree.headchild(head, self.kind) {
            self.visit_descendants(tree, ancestor, n_so_far, headchild, f, counts);
        }
    }
}

impl Default for Heads {
    fn default() -> Self {
        Heads::new(2, true, true, HeadKind::Syntactic)
    }
}

impl ExtractFeatures for Heads {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for node in visited_nodes(tree) {
            if !tree.is_preterminal(node) {
                continue;
            }
            let mut f = vec![label_of(tree, node)];
            if self.dependent_lex {
                f.push(word_of(tree, node));
            }
            self.visit_ancestors(tree, node, 1, &mut f, counts);
        }
    }
}

/// Agreement of a subject with its verb.
///
/// The subject of an `S` or `SINV` is its last `NP` child before the first `VP` child. The
/// key pairs the tag of the subject's semantic head with the tag of the clause's syntactic
/// head.
///
/// Identifier: `SubjVerbAgr`
#[derive(Clone, Debug, Default)]
pub struct SubjVerbAgr;

impl ExtractFeatures for SubjVerbAgr {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        "SubjVerbAgr"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for node in visited_nodes(tree) {
            match tree.label(node) {
                "S" | "SINV" => (),
                _ => continue,
            }
            let verb = match tree.lexhead(node, HeadKind::Syntactic) {
                Some(verb) => verb,
                None => continue,
            };

            let mut subject = None;
            for &child in tree.children(node).iter() {
                match tree.label(child) {
                    "NP" => subject = Some(child),
                    "VP" => break,
                    _ => (),
                }
            }

            let noun = match subject.and_then(|subject| tree.lexhead(subject, HeadKind::Semantic))
            {
                Some(noun) => noun,
                None => continue,
            };
            add(counts, vec![label_of(tree, noun), label_of(tree, verb)], 1.);
        }
    }
}

/// Lexical annotation of `SynSemHeads` features.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SynSemAnnotation {
    /// Tags of both heads.
    None,
    /// Tags of both heads and the word of the syntactic head.
    LexSyn,
    /// Tags and words of both heads.
    LexAll,
}

/// Pairs of syntactic and semantic heads of constituents where the two differ.
///
/// Identifier: `SynSemHeads:<annotation>`, with annotation 0, 1 or 2.
#[derive(Clone, Debug)]
pub struct SynSemHeads {
    annotation: SynSemAnnotation,
    identifier: String,
}

impl SynSemHeads {
    pub fn new(annotation: SynSemAnnotation) -> Self {
        SynSemHeads {
            annotation,
            identifier: format!("SynSemHeads:{}", annotation as usize),
        }
    }
}

impl Default for SynSemHeads {
    fn default() -> Self {
        SynSemHeads::new(SynSemAnnotation::None)
    }
}

impl ExtractFeatures for SynSemHeads {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        let tag = |head: Option<NodeIndex>| {
            head.map(|head| label_of(tree, head))
                .unwrap_or_else(|| END_MARKER.to_owned())
        };

        for node in visited_nodes(tree) {
            let syntactic = tree.lexhead(node, HeadKind::Syntactic);
            let semantic = tree.lexhead(node, HeadKind::Semantic);
            if syntactic == semantic {
                continue;
            }

            let mut f = vec![tag(syntactic)];
            if self.annotation != SynSemAnnotation::None {
                match syntactic {
                    Some(head) => f.push(word_of(tree, head)),
                    None => continue,
                }
            }
            f.push(tag(semantic));
            if self.annotation == SynSemAnnotation::LexAll {
                match semantic {
                    Some(head) => f.push(word_of(tree, head)),
                    None => continue,
                }
            }
            add(counts, f, 1.);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::features::tests::counts;
    use crate::features::{ExtractFeatures, Heads, SubjVerbAgr, SynSemAnnotation, SynSemHeads};
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
        assert_eq!(Heads::default().identifier(), "Heads:2:1:1:0");
        assert_eq!(
            Heads::new(3, false, true, HeadKind::Semantic).identifier(),
            "Heads:3:0:1:1"
        );
        assert_eq!(SubjVerbAgr.identifier(), "SubjVerbAgr");
        assert_eq!(
            SynSemHeads::new(SynSemAnnotation::LexAll).identifier(),
            "SynSemHeads:2"
        );
    }

    #[test]
    fn head_dependencies() {
        assert_eq!(
            keys(&Heads::default(), TREE),
            vec!["(. . VBZ barks)", "(DT the VBZ barks)", "(NN dog DT the)"]
        );
        assert_eq!(
            keys(&Heads::new(2, false, false, HeadKind::Syntactic), TREE),
            vec!["(. VBZ)", "(DT VBZ)", "(NN DT)"]
        );
    }

    #[test]
    fn coordinated_governors() {
        let tree = "(S1 (S (NP (NNS dogs)) (VP (VP (VBP bark)) (CC and) (VP (VBP run)))))";
        assert_eq!(
            keys(&Heads::default(), tree),
            vec!["(NNS dogs VBP bark)", "(NNS dogs VBP run)"]
        );
    }

    #[test]
    fn coordinated_dependents() {
        let tree = "(S1 (S (NP (NNS cats) (CC and) (NNS dogs)) (VP (VBP bark))))";
        assert_eq!(
            keys(&Heads::default(), tree),
            vec![
                "(CC and VBP bark)",
                "(NNS cats VBP bark)",
                "(NNS dogs VBP bark)"
            ]
        );
    }

    #[test]
    fn subject_verb_agreement() {
        assert_eq!(keys(&SubjVerbAgr, TREE), vec!["(NN VBZ)"]);
        assert!(keys(&SubjVerbAgr, "(S1 (VP (VBZ barks)))").is_empty());
        assert!(keys(&SubjVerbAgr, "(S1 (S (VP (VB go)) (NP (NNS dogs))))").is_empty());
    }

    #[test]
    fn syntactic_and_semantic_heads() {
        assert_eq!(keys(&SynSemHeads::default(), TREE), vec!["(DT NN)"]);
        assert_eq!(
            keys(&SynSemHeads::new(SynSemAnnotation::LexSyn), TREE),
            vec!["(DT the NN)"]
        );
        assert_eq!(
            keys(&SynSemHeads::new(SynSemAnnotation::LexAll), TREE),
            vec!["(DT the NN dog)"]
        );
    }
}
