use petgraph::prelude::NodeIndex;

use crate::features::{add, ExtractFeatures, FeatureCounts};
use crate::{AnnotatedTree, Navigate, Parse};

fn log2(length: usize) -> i32 {
    (length as f64).log2() as i32
}

/// Nodes on and off the rightmost branch.
///
/// Key 1 counts the non-punctuation nodes on the rightmost branch, key 0 all other
/// non-punctuation nodes. Terminals are not counted.
///
/// Identifier: `RightBranch`
#[derive(Clone, Debug, Default)]
pub struct RightBranch;

impl RightBranch {
    fn count(
        tree: &AnnotatedTree,
        siblings: &[NodeIndex],
        mut rightmost: i32,
        counts: &mut FeatureCounts<i32>,
    ) {
        for &node in siblings.iter().rev() {
            if tree.is_punctuation(node) {
                continue;
            }
            add(counts, rightmost, 1.);
            if tree.is_nonterminal(node) {
                Self::count(tree, &tree.children(node), rightmost, counts);
            }
            rightmost = 0;
        }
    }
}

impl ExtractFeatures for RightBranch {
    type Key = i32;

    fn identifier(&self) -> &str {
        "RightBranch"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<i32>) {
        let tree = parse.annotated();
        Self::count(tree, &[tree.root()], 1, counts);
    }
}

/// Log2 of the length of the left-branching chain ending in each preterminal.
///
/// Identifier: `LeftBranchLength`
#[derive(Clone, Debug, Default)]
pub struct LeftBranchLength;

impl LeftBranchLength {
    fn count(
        tree: &AnnotatedTree,
        siblings: &[NodeIndex],
        mut leftmost: usize,
        counts: &mut FeatureCounts<i32>,
    ) {
        for &node in siblings {
            if tree.is_punctuation(node) {
                continue;
            }
            if tree.is_preterminal(node) {
                add(counts, log2(leftmost), 1.);
            } else {
                Self::count(tree, &tree.children(node), leftmost + 1, counts);
            }
            leftmost = 1;
        }
    }
}

impl ExtractFeatures for LeftBranchLength {
    type Key = i32;

    fn identifier(&self) -> &str {
        "LeftBranchLength"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<i32>) {
        let tree = parse.annotated();
        Self::count(tree, &[tree.root()], 1, counts);
    }
}

/// Log2 of the length of the right-branching chain ending in each preterminal.
///
/// Identifier: `RightBranchLength`
#[derive(Clone, Debug, Default)]
pub struct RightBranchLength;

impl RightBranchLength {
    fn count(
        tree: &AnnotatedTree,
        siblings: &[NodeIndex],
        mut rightmost: usize,
        counts: &mut FeatureCounts<i32>,
    ) {
        for &node in siblings.iter().rev() {
            if tree.is_punctuation(node) {
                continue;
            }
            if tree.is_preterminal(node) {
                add(counts, log2(rightmost), 1.);
            } else {
                Self::count(tree, &tree.children(node), rightmost + 1, counts);
            }
            rightmost = 1;
        }
    }
}

impl ExtractFeatures for RightBranchLength {
    type Key = i32;

    fn identifier(&self) -> &str {
        "RightBranchLength"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<i32>) {
        let tree = parse.annotated();
        Self::count(tree, &[tree.root()], 1, counts);
    }
}

#[cfg(test)]
mod tests {
    use crate::features::tests::counts;
    use crate::features::{LeftBranchLength, RightBranch, RightBranchLength};

    const TREE: &str = "(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks)) (. .)))";

    fn owned(counts: &[(&str, f64)]) -> Vec<(String, f64)> {
        counts
            .iter()
            .map(|&(key, count)| (key.to_owned(), count))
            .collect()
    }

    #[test]
    fn right_branch() {
        assert_eq!(counts(&RightBranch, TREE), owned(&[("0", 3.), ("1", 4.)]));
        // punctuation does not end the rightmost branch
        assert_eq!(
            counts(&RightBranch, "(S1 (NP (NN dog) (. .)))"),
            owned(&[("1", 3.)])
        );
    }

    #[test]
    fn branch_lengths() {
        let expected = owned(&[("0", 1.), ("1", 1.), ("2", 1.)]);
        assert_eq!(counts(&LeftBranchLength, TREE), expected);
        assert_eq!(counts(&RightBranchLength, TREE), expected);
        assert_eq!(
            counts(&LeftBranchLength, "(S1 (S (NP (NP (DT the)))))"),
            owned(&[("2", 1.)])
        );
    }
}
