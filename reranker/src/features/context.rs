//! Feature classes over constituents and the tags or words around their edges.

use petgraph::prelude::NodeIndex;

use crate::features::{
    add, label_of, positioned_preterminals, quantize, visited_nodes, word_of, ExtractFeatures,
    FeatureCounts, END_MARKER,
};
use crate::{AnnotatedTree, Navigate, Parse};

/// Call `f` on every nonterminal with the preterminals of the tree.
fn for_each_constituent<F>(tree: &AnnotatedTree, mut f: F)
where
    F: FnMut(&[NodeIndex], NodeIndex),
{
    let preterminals = match positioned_preterminals(tree) {
        Some(preterminals) => preterminals,
        None => return,
    };
    for node in visited_nodes(tree) {
        if tree.is_nonterminal(node) {
            f(&preterminals, node);
        }
    }
}

// Tag or word of the preterminal at `position`, the end marker outside the sentence.
fn token_at(
    tree: &AnnotatedTree,
    preterminals: &[NodeIndex],
    position: Option<usize>,
    words: bool,
) -> String {
    match position.and_then(|position| preterminals.get(position)) {
        Some(&preterminal) if words => word_of(tree, preterminal),
        Some(&preterminal) => label_of(tree, preterminal),
        None => END_MARKER.to_owned(),
    }
}

/// Windows of tokens before and after both edges of a constituent.
#[derive(Clone, Debug)]
struct EdgeWindows {
    binned_length: bool,
    n_left_prec: usize,
    n_left_succ: usize,
    n_right_prec: usize,
    n_right_succ: usize,
}

impl EdgeWindows {
    fn identifier(&self, stem: &str) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            stem,
            self.binned_length as usize,
            self.n_left_prec,
            self.n_left_succ,
            self.n_right_prec,
            self.n_right_succ
        )
    }

    fn feature(
        &self,
        tree: &AnnotatedTree,
        preterminals: &[NodeIndex],
        node: NodeIndex,
        words: bool,
    ) -> Vec<String> {
        let (left, right) = (tree.left(node), tree.right(node));
        let mut f = Vec::new();
        if self.binned_length {
            f.push(quantize(right - left).to_string());
        }
        f.push(label_of(tree, node));
        for i in 1..=self.n_left_prec {
            f.push(token_at(tree, preterminals, left.checked_sub(i), words));
        }
        for i in 0..self.n_left_succ {
            f.push(token_at(tree, preterminals, Some(left + i), words));
        }
        for i in 1..=self.n_right_prec {
            f.push(token_at(tree, preterminals, right.checked_sub(i), words));
        }
        for i in 0..self.n_right_succ {
            f.push(token_at(tree, preterminals, Some(right + i), words));
        }
        f
    }
}

/// Binned length and category of a constituent with neighbouring tags.
///
/// The left window starts at the first tag of the constituent rather than before it.
/// `Edges` counts the tags on both sides of both edges.
///
/// Identifier: `Neighbours:<n_left>:<n_right>`
#[derive(Clone, Debug)]
pub struct Neighbours {
    n_left: usize,
    n_right: usize,
    identifier: String,
}

impl Neighbours {
    pub fn new(n_left: usize, n_right: usize) -> Self {
        Neighbours {
            n_left,
            n_right,
            identifier: format!("Neighbours:{}:{}", n_left, n_right),
        }
    }
}

impl ExtractFeatures for Neighbours {
    type Key = (i32, Vec<String>);

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for_each_constituent(tree, |preterminals, node| {
            let (left, right) = (tree.left(node), tree.right(node));
            let mut f = vec![label_of(tree, node)];
            for i in 0..self.n_left {
                f.push(token_at(tree, preterminals, left.checked_sub(i), false));
            }
            for i in 0..self.n_right {
                f.push(token_at(tree, preterminals, Some(right + i), false));
            }
            add(counts, (quantize(right - left), f), 1.);
        });
    }
}

/// Category of a constituent with the tags around its edges.
///
/// Identifier: `Edges:<binned>:<n_left_prec>:<n_left_succ>:<n_right_prec>:<n_right_succ>`
#[derive(Clone, Debug)]
pub struct Edges {
    windows: EdgeWindows,
    identifier: String,
}

impl Edges {
    pub fn new(
        binned_length: bool,
        n_left_prec: usize,
        n_left_succ: usize,
        n_right_prec: usize,
        n_right_succ: usize,
    ) -> Self {
        let windows = EdgeWindows {
            binned_length,
            n_left_prec,
            n_left_succ,
            n_right_prec,
            n_right_succ,
        };
        let identifier = windows.identifier("Edges");
        Edges {
            windows,
            identifier,
        }
    }
}

impl ExtractFeatures for Edges {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for_each_constituent(tree, |preterminals, node| {
            add(
                counts,
                self.windows.feature(tree, preterminals, node, false),
                1.,
            );
        });
    }
}

/// Category of a constituent with neighbouring words.
///
/// Like `Neighbours`, the left window starts at the first word of the constituent.
///
/// Identifier: `WordNeighbours:<binned>:<n_left>:<n_right>`
#[derive(Clone, Debug)]
pub struct WordNeighbours {
    binned_length: bool,
    n_left: usize,
    n_right: usize,
    identifier: String,
}

impl WordNeighbours {
    pub fn new(binned_length: bool, n_left: usize, n_right: usize) -> Self {
        WordNeighbours {
            binned_length,
            n_left,
            n_right,
            identifier: format!(
                "WordNeighbours:{}:{}:{}",
                binned_length as usize, n_left, n_right
            ),
        }
    }
}

impl ExtractFeatures for WordNeighbours {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for_each_constituent(tree, |preterminals, node| {
            let (left, right) = (tree.left(node), tree.right(node));
            let mut f = Vec::new();
            if self.binned_length {
                f.push(quantize(right - left).to_string());
            }
            f.push(label_of(tree, node));
            for i in 0..self.n_left {
                f.push(token_at(tree, preterminals, left.checked_sub(i), true));
            }
            for i in 0..self.n_right {
                f.push(token_at(tree, preterminals, Some(right + i), true));
            }
            add(counts, f, 1.);
        });
    }
}

/// Category of a constituent with the words around its edges.
///
/// Identifier: `WordEdges:<binned>:<n_left_prec>:<n_left_succ>:<n_right_prec>:<n_right_succ>`
#[derive(Clone, Debug)]
pub struct WordEdges {
    windows: EdgeWindows,
    identifier: String,
}

impl WordEdges {
    pub fn new(
        binned_length: bool,
        n_left_prec: usize,
        n_left_succ: usize,
        n_right_prec: usize,
        n_right_succ: usize,
    ) -> Self {
        let windows = EdgeWindows {
            binned_length,
            n_left_prec,
            n_left_succ,
            n_right_prec,
            n_right_succ,
        };
        let identifier = windows.identifier("WordEdges");
        WordEdges {
            windows,
            identifier,
        }
    }
}

impl ExtractFeatures for WordEdges {
    type Key = Vec<String>;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for_each_constituent(tree, |preterminals, node| {
            add(counts, self.windows.feature(tree, preterminals, node, true), 1.);
        });
    }
}

/// Size of a constituent and its distance to the end of the sentence.
///
/// The feature also records punctuation ending the constituent and punctuation directly
/// following it.
///
/// Identifier: `Heavy`
#[derive(Clone, Debug, Default)]
pub struct Heavy;

impl ExtractFeatures for Heavy {
    type Key = (Vec<i32>, Vec<String>);

    fn identifier(&self) -> &str {
        "Heavy"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
        let tree = parse.annotated();
        for_each_constituent(tree, |preterminals, node| {
            let (left, right) = (tree.left(node), tree.right(node));
            let punctuation = |position: usize| match preterminals.get(position) {
                Some(&preterminal) if tree.is_punctuation(preterminal) => {
                    word_of(tree, preterminal)
                }
                _ => END_MARKER.to_owned(),
            };
            let final_punct = right
                .checked_sub(1)
                .map(|position| punctuation(position))
                .unwrap_or_else(|| END_MARKER.to_owned());
            let following_punct = punctuation(right);

            let sizes = vec![quantize(right - left), quantize(preterminals.len() - right)];
            let cats = vec![label_of(tree, node), final_punct, following_punct];
            add(counts, (sizes, cats), 1.);
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::features::tests::counts;
    use crate::features::{Edges, ExtractFeatures, Heavy, Neighbours, WordEdges, WordNeighbours};

    const TREE: &str = "(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks)) (. .)))";

    fn keys<E>(extractor: &E, tree: &str) -> Vec<String>
    where
        E: ExtractFeatures,
    {
        counts(extractor, tree)
            .into_iter()
            .map(|(key, count)| {
                assert_eq!(count, 1.);
                key
            })
            .collect()
    }

    #[test]
    fn identifiers() {
        assert_eq!(Neighbours::new(1, 2).identifier(), "Neighbours:1:2");
        assert_eq!(Edges::new(true, 1, 0, 0, 2).identifier(), "Edges:1:1:0:0:2");
        assert_eq!(
            WordNeighbours::new(false, 0, 1).identifier(),
            "WordNeighbours:0:0:1"
        );
        assert_eq!(
            WordEdges::new(false, 0, 2, 0, 0).identifier(),
            "WordEdges:0:0:2:0:0"
        );
        assert_eq!(Heavy.identifier(), "Heavy");
    }

    #[test]
    fn neighbours() {
        assert_eq!(
            keys(&Neighbours::new(1, 1), TREE),
            vec![
                "(1 (VP VBZ .))",
                "(2 (NP DT VBZ))",
                "(4 (S DT _))",
                "(4 (S1 DT _))"
            ]
        );
    }

    #[test]
    fn edges() {
        assert_eq!(
            keys(&Edges::new(true, 1, 0, 0, 1), TREE),
            vec!["(1 VP NN .)", "(2 NP _ VBZ)", "(4 S _ _)", "(4 S1 _ _)"]
        );
        assert_eq!(
            keys(&WordEdges::new(false, 0, 1, 1, 0), TREE),
            vec![
                "(NP the dog)",
                "(S the .)",
                "(S1 the .)",
                "(VP barks barks)"
            ]
        );
    }

    #[test]
    fn word_neighbours() {
        let keys = keys(&WordNeighbours::new(false, 1, 1), TREE);
        assert!(keys.contains(&"(VP barks .)".to_owned()));
        assert!(keys.contains(&"(S1 the _)".to_owned()));
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn heavy() {
        assert_eq!(
            keys(&Heavy, TREE),
            vec![
                "((1 1) (VP _ .))",
                "((2 2) (NP _ _))",
                "((4 0) (S . _))",
                "((4 0) (S1 . _))"
            ]
        );
    }
}
