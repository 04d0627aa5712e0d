use failure::Error;
use log::warn;

use crate::{AnnotatedTree, Annotator, Edges, Navigate, PrecRec, Tree, TreeOps};

/// A candidate parse.
#[derive(Clone, Debug)]
pub struct Parse {
    log_prob: f64,
    log_cond_prob: f64,
    tree: Tree,
    annotated: AnnotatedTree,
    n_edges: usize,
    n_correct: usize,
    f_score: f64,
}

impl Parse {
    fn new(log_prob: f64, mut tree: Tree, annotator: &Annotator) -> Self {
        tree.relabel_root();
        let annotated = annotator.annotate(tree.clone());
        let n_edges = Edges::from_tree(&annotated).n_edges();
        Parse {
            log_prob,
            log_cond_prob: 0.,
            tree,
            annotated,
            n_edges,
            n_correct: 0,
            f_score: 0.,
        }
    }

    /// Get the log probability assigned by the parser.
    pub fn log_prob(&self) -> f64 {
        self.log_prob
    }

    /// Get the log probability conditioned on the sentence.
    pub fn log_cond_prob(&self) -> f64 {
        self.log_cond_prob
    }

    /// Get the tree as read, with the root relabeled.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn annotated(&self) -> &AnnotatedTree {
        &self.annotated
    }

    /// Get the number of edges of the parse.
    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// Get the number of edges shared with the gold tree.
    pub fn n_correct(&self) -> usize {
        self.n_correct
    }

    /// Get the f-score against the gold tree, 0 without a gold tree.
    pub fn f_score(&self) -> f64 {
        self.f_score
    }
}

/// A sentence with its candidate parses.
///
/// Parses are expected in the order of the parser's ranking, the first parse takes the role
/// of the reference parse during feature extraction.
#[derive(Clone, Debug)]
pub struct Sentence {
    label: String,
    gold: Option<AnnotatedTree>,
    gold_edges: Option<Edges>,
    max_f_score: f64,
    log_sum_prob: f64,
    parses: Vec<Parse>,
}

impl Sentence {
    /// Construct a sentence from n-best parses and an optional gold tree.
    ///
    /// The roots of all trees are relabeled. Gold trees are stripped of function tags and empty
    /// nodes. Fails if the gold tree and a parse have different words.
    pub fn new(
        label: impl Into<String>,
        nbest: Vec<(f64, Tree)>,
        gold: Option<Tree>,
        annotator: &Annotator,
    ) -> Result<Self, Error> {
        let label = label.into();
        let mut parses = nbest
            .into_iter()
            .map(|(log_prob, tree)| Parse::new(log_prob, tree, annotator))
            .collect::<Vec<_>>();
        if parses.is_empty() {
            warn!("n-best parser failed to produce any parses for sentence {}", label);
        }
        let log_sum_prob = set_log_cond_probs(&mut parses);

        let mut sentence = Sentence {
            label,
            gold: None,
            gold_edges: None,
            max_f_score: 0.,
            log_sum_prob,
            parses,
        };
        if let Some(gold) = gold {
            sentence.set_gold(gold, annotator)?;
        }
        Ok(sentence)
    }

    fn set_gold(&mut self, mut gold: Tree, annotator: &Annotator) -> Result<(), Error> {
        gold.relabel_root();
        gold.strip_function_tags();
        let gold = gold
            .copy_without_empties(false)
            .ok_or_else(|| format_err!("Gold tree of sentence {} is empty", self.label))?;
        let gold = annotator.annotate(gold);
        let gold_edges = Edges::from_tree(&gold);
        let gold_words = gold.terminals(false);

        let n_parses = self.parses.len();
        for (idx, parse) in self.parses.iter_mut().enumerate() {
            let parse_words = parse.annotated.terminals(false);
            if gold_words != parse_words {
                return Err(format_err!(
                    "Gold and parse words don't match, label = {}\ngold_words = {}\nparse_words = {}\nparse[{}] of {}",
                    self.label,
                    gold_words.join(" "),
                    parse_words.join(" "),
                    idx,
                    n_parses,
                ));
            }
            let precrec = PrecRec::from_edges(&gold_edges, &Edges::from_tree(&parse.annotated));
            parse.n_edges = precrec.n_test;
            parse.n_correct = precrec.n_common;
            parse.f_score = precrec.f_score();
            if parse.f_score > self.max_f_score {
                self.max_f_score = parse.f_score;
            }
        }

        self.gold = Some(gold);
        self.gold_edges = Some(gold_edges);
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn gold(&self) -> Option<&AnnotatedTree> {
        self.gold.as_ref()
    }

    /// Get the number of gold edges, 0 without a gold tree.
    pub fn gold_edges(&self) -> usize {
        self.gold_edges
            .as_ref()
            .map(Edges::n_edges)
            .unwrap_or(0)
    }

    /// Get the highest f-score of any parse.
    pub fn max_f_score(&self) -> f64 {
        self.max_f_score
    }

    /// Get the log of the summed probabilities of all parses.
    pub fn log_sum_prob(&self) -> f64 {
        self.log_sum_prob
    }

    pub fn parses(&self) -> &[Parse] {
        &self.parses
    }

    pub fn n_parses(&self) -> usize {
        self.parses.len()
    }

    /// Score parse `idx` against the gold tree.
    ///
    /// Returns `None` without a gold tree.
    pub fn precrec(&self, idx: usize) -> Option<PrecRec> {
        let gold_edges = self.gold_edges.as_ref()?;
        let parse = self.parses.get(idx)?;
        Some(PrecRec::new(parse.n_correct, gold_edges.n_edges(), parse.n_edges))
    }
}

// Normalizes the log probabilities by their log-sum-exp, returns the log-sum-exp.
fn set_log_cond_probs(parses: &mut [Parse]) -> f64 {
    let max = parses
        .iter()
        .map(Parse::log_prob)
        .fold(std::f64::NEG_INFINITY, f64::max);
    if parses.is_empty() {
        return 0.;
    }
    let sum = parses
        .iter()
        .map(|parse| (parse.log_prob - max).exp())
        .sum::<f64>();
    let log_sum_prob = sum.ln() + max;
    for parse in parses.iter_mut() {
        parse.log_cond_prob = parse.log_prob - log_sum_prob;
    }
    log_sum_prob
}
