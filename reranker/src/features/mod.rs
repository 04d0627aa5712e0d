//! Feature classes.
//!
//! A feature class maps the parses of a sentence to sparse feature counts. Every class owns a
//! table from its feature keys to counts (during extraction) or ids (after pruning or reading
//! a feature-id file). The shared bookkeeping lives in `FeatureTable`, the classes only
//! implement `ExtractFeatures`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::Write;

use failure::Error;
use itertools::Itertools;
use log::{trace, warn};
use petgraph::prelude::NodeIndex;

use crate::heads::HeadKind;
use crate::io::sstring::quote;
use crate::io::SExpr;
use crate::{AnnotatedTree, Config, Navigate, Parse, Sentence};

mod branching;
pub use self::branching::{LeftBranchLength, RightBranch, RightBranchLength};

mod context;
pub use self::context::{Edges, Heavy, Neighbours, WordEdges, WordNeighbours};

mod coordination;
pub use self::coordination::{CoLenPar, CoPar};

mod dependency;
pub use self::dependency::{Heads, SubjVerbAgr, SynSemHeads, SynSemAnnotation};

mod fragment;
pub use self::fragment::{HeadTree, Lexicalize, NGramTree};

mod probability;
pub use self::probability::{BinnedLogCondP, InterpLogCondP, NLogCondP, NLogP};

mod rule;
pub use self::rule::{AnnotationLevel, NGram, Rule, RuleContext, WProj, Word};

pub(crate) const END_MARKER: &str = "_";
pub(crate) const CHILD_MARKER: &str = "*CHILD*";
pub(crate) const ADJUNCT_MARKER: &str = "*ADJ*";
pub(crate) const CONJUNCT_MARKER: &str = "*CONJ*";
pub(crate) const HEAD_MARKER: &str = "*HEAD*";
pub(crate) const LAST_ADJUNCT_MARKER: &str = "*LASTADJ*";
pub(crate) const LAST_CONJUNCT_MARKER: &str = "*LASTCONJ*";
pub(crate) const NONROOT_MARKER: &str = "*NONROOT*";
pub(crate) const POSTHEAD_MARKER: &str = "*POSTHEAD*";
pub(crate) const PREHEAD_MARKER: &str = "*PREHEAD*";

/// Feature values of one parse, indexed by feature id.
pub type FeatureValues = BTreeMap<usize, f64>;

/// Feature counts of one parse.
pub type FeatureCounts<K> = BTreeMap<K, f64>;

/// Add `value` to the count of `key`.
pub(crate) fn add<K>(counts: &mut FeatureCounts<K>, key: K, value: f64)
where
    K: Ord,
{
    *counts.entry(key).or_insert(0.) += value;
}

/// Map lengths to the bins 0, 1, 2, 4 and 5.
pub(crate) fn quantize(v: usize) -> i32 {
    match v {
        0 => 0,
        1 => 1,
        2 => 2,
        3 | 4 => 4,
        _ => 5,
    }
}

/// Returns whether `node` is labeled `NP`, `ROOT`, `S` or `SBAR`.
pub(crate) fn is_bounding_node(tree: &AnnotatedTree, node: Option<NodeIndex>) -> bool {
    node.map(|node| match tree.label(node) {
        "NP" | "ROOT" | "S" | "SBAR" => true,
        _ => false,
    })
    .unwrap_or(false)
}

/// Nodes visited by node-level classes.
///
/// All preterminals and nonterminals, parents before their children.
pub(crate) fn visited_nodes(tree: &AnnotatedTree) -> Vec<NodeIndex> {
    tree.preorder()
        .into_iter()
        .filter(|&node| !tree.is_terminal(node))
        .collect()
}

/// Preterminals, including empty ones, for classes that look up words by position.
///
/// Returns `None` if the number of preterminals differs from the number of terminals.
pub(crate) fn positioned_preterminals(tree: &AnnotatedTree) -> Option<Vec<NodeIndex>> {
    let preterminals = tree.preterminal_nodes(true);
    if preterminals.len() != tree.right(tree.root()) {
        warn!(
            "Tree has {} preterminals but spans {} terminals, skipping",
            preterminals.len(),
            tree.right(tree.root())
        );
        return None;
    }
    Some(preterminals)
}

/// Head kinds are written 0 for syntactic and 1 for semantic heads in dependency identifiers.
pub(crate) fn head_kind_id(kind: HeadKind) -> usize {
    match kind {
        HeadKind::Syntactic => 0,
        HeadKind::Semantic => 1,
    }
}

pub(crate) fn label_of(tree: &AnnotatedTree, node: NodeIndex) -> String {
    tree.label(node).to_owned()
}

pub(crate) fn word_of(tree: &AnnotatedTree, preterminal: NodeIndex) -> String {
    tree.word(preterminal).unwrap_or(END_MARKER).to_owned()
}

/// Keys of features.
///
/// Keys are written as s-expressions over serializable strings: numbers and strings are
/// atoms, sequences and pairs are lists.
pub trait FeatureKey: Clone + Debug + Ord {
    /// Append the s-expression of the key to `out`.
    fn write_key(&self, out: &mut String);

    /// Construct a key from its s-expression.
    fn from_sexpr(sexpr: &SExpr) -> Result<Self, Error>;

    fn key_string(&self) -> String {
        let mut out = String::new();
        self.write_key(&mut out);
        out
    }

    fn parse_key(s: &str) -> Result<Self, Error> {
        Self::from_sexpr(&SExpr::parse(s.trim())?)
    }
}

impl FeatureKey for i32 {
    fn write_key(&self, out: &mut String) {
        out.push_str(&self.to_string());
    }

    fn from_sexpr(sexpr: &SExpr) -> Result<Self, Error> {
        let atom = sexpr.atom()?;
        atom.parse()
            .map_err(|_| format_err!("Expected an integer key, found: {}", atom))
    }
}

impl FeatureKey for String {
    fn write_key(&self, out: &mut String) {
        out.push_str(&quote(self));
    }

    fn from_sexpr(sexpr: &SExpr) -> Result<Self, Error> {
        sexpr.atom().map(ToOwned::to_owned)
    }
}

impl<T> FeatureKey for Vec<T>
where
    T: FeatureKey,
{
    fn write_key(&self, out: &mut String) {
        out.push('(');
        for (idx, item) in self.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            item.write_key(out);
        }
        out.push(')');
    }

    fn from_sexpr(sexpr: &SExpr) -> Result<Self, Error> {
        sexpr.list()?.iter().map(T::from_sexpr).collect()
    }
}

impl<A, B> FeatureKey for (A, B)
where
    A: FeatureKey,
    B: FeatureKey,
{
    fn write_key(&self, out: &mut String) {
        out.push('(');
        self.0.write_key(out);
        out.push(' ');
        self.1.write_key(out);
        out.push(')');
    }

    fn from_sexpr(sexpr: &SExpr) -> Result<Self, Error> {
        match sexpr.list()? {
            [first, second] => Ok((A::from_sexpr(first)?, B::from_sexpr(second)?)),
            list => Err(format_err!("Expected a pair, found {} elements", list.len())),
        }
    }
}

/// Extraction of the features of one class.
pub trait ExtractFeatures {
    type Key: FeatureKey;

    /// Get the identifier of the class.
    ///
    /// The identifier is the class name followed by the class parameters, separated by
    /// colons. Feature-id files refer to classes by their identifiers.
    fn identifier(&self) -> &str;

    /// Count the features of `parse`.
    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>);
}

/// A feature class with its feature table, as used by the `FeatureClasses` registry.
pub trait FeatureClass {
    fn identifier(&self) -> &str;

    /// Count the features of `sentence` that discriminate between its parses.
    ///
    /// Sentences with fewer than two parses are ignored. The first parse is the reference
    /// parse, parses are expected in the order of the parser's ranking.
    fn extract_features(&mut self, sentence: &Sentence, config: &Config);

    /// Discard features seen less than `min_count` times and number the rest from `next_id`.
    ///
    /// Returns the next unused id.
    fn prune_and_renumber(&mut self, min_count: usize, next_id: usize) -> usize;

    /// Add the values of the known features of every parse to `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not hold one map per parse of `sentence`.
    fn feature_values(&self, sentence: &Sentence, config: &Config, values: &mut [FeatureValues]);

    /// Write `value<TAB>identifier key` lines, ordered by value.
    ///
    /// Values are ids after pruning or reading ids and counts after extraction.
    fn write_feature_ids(&self, write: &mut dyn Write) -> Result<(), Error>;

    /// Add the feature with key `key` and id `id`.
    fn read_feature(&mut self, id: usize, key: &str) -> Result<(), Error>;

    /// Get the number of features in the table.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Feature class with its table of feature keys.
pub struct FeatureTable<E>
where
    E: ExtractFeatures,
{
    extractor: E,
    table: BTreeMap<E::Key, usize>,
}

impl<E> FeatureTable<E>
where
    E: ExtractFeatures,
{
    pub fn new(extractor: E) -> Self {
        FeatureTable {
            extractor,
            table: BTreeMap::new(),
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Get the count or id of a feature.
    pub fn get(&self, key: &E::Key) -> Option<usize> {
        self.table.get(key).cloned()
    }

    // feature -> parse -> value
    fn parse_values(&self, sentence: &Sentence) -> BTreeMap<E::Key, BTreeMap<usize, f64>> {
        let mut parse_values = BTreeMap::new();
        for (idx, parse) in sentence.parses().iter().enumerate() {
            let mut counts = FeatureCounts::new();
            self.extractor.parse_featurecount(parse, &mut counts);
            for (key, value) in counts {
                parse_values
                    .entry(key)
                    .or_insert_with(BTreeMap::new)
                    .insert(idx, value);
            }
        }
        parse_values
    }
}

impl<E> FeatureClass for FeatureTable<E>
where
    E: ExtractFeatures,
{
    fn identifier(&self) -> &str {
        self.extractor.identifier()
    }

    fn extract_features(&mut self, sentence: &Sentence, config: &Config) {
        let n_parses = sentence.n_parses();
        if n_parses <= 1 {
            return;
        }

        let parse_values = self.parse_values(sentence);
        for (key, values) in parse_values {
            match values.get(&0) {
                Some(value) if config.traces_features() => trace!(
                    "{}\t{}\t{}\t{}",
                    sentence.label(),
                    self.extractor.identifier(),
                    key.key_string(),
                    value
                ),
                _ => (),
            }
            if is_pseudo_constant(&values, n_parses) {
                continue;
            }
            let on_reference = values.contains_key(&0);
            if (config.collects_correct() && on_reference)
                || (config.collects_incorrect() && (!on_reference || values.len() > 1))
            {
                *self.table.entry(key).or_insert(0) += 1;
            }
        }
    }

    fn prune_and_renumber(&mut self, min_count: usize, mut next_id: usize) -> usize {
        let counts = std::mem::replace(&mut self.table, BTreeMap::new());
        for (key, count) in counts {
            if count >= min_count {
                self.table.insert(key, next_id);
                next_id += 1;
            }
        }
        next_id
    }

    fn feature_values(&self, sentence: &Sentence, config: &Config, values: &mut [FeatureValues]) {
        assert_eq!(
            values.len(),
            sentence.n_parses(),
            "One value map per parse is required"
        );

        let n_parses = sentence.n_parses();
        for (key, parse_values) in self.parse_values(sentence) {
            let id = match self.table.get(&key) {
                Some(&id) => id,
                None => continue,
            };
            let dense = (0..n_parses)
                .map(|idx| parse_values.get(&idx).cloned().unwrap_or(0.))
                .collect::<Vec<_>>();
            let reference = if config.uses_absolute_counts() {
                0.
            } else {
                highest_gain_value(&dense)
            };
            for (idx, value) in dense.into_iter().enumerate() {
                let value = value - reference;
                if value != 0. {
                    values[idx].insert(id, value);
                }
            }
        }
    }

    fn write_feature_ids(&self, write: &mut dyn Write) -> Result<(), Error> {
        let entries = self.table.iter().sorted_by(|(key_a, value_a), (key_b, value_b)| {
            value_a.cmp(value_b).then_with(|| key_a.cmp(key_b))
        });
        for (key, value) in entries {
            writeln!(
                write,
                "{}\t{} {}",
                value,
                self.extractor.identifier(),
                key.key_string()
            )?;
        }
        Ok(())
    }

    fn read_feature(&mut self, id: usize, key: &str) -> Result<(), Error> {
        let key = E::Key::parse_key(key).map_err(|err| {
            format_err!(
                "Cannot read feature {} of {}: {}",
                id,
                self.extractor.identifier(),
                err
            )
        })?;
        if self.table.contains_key(&key) {
            return Err(format_err!(
                "Duplicate feature, id = {}, f = `{}'",
                id,
                key.key_string()
            ));
        }
        self.table.insert(key, id);
        Ok(())
    }

    fn len(&self) -> usize {
        self.table.len()
    }
}

/// Returns whether a feature takes the same value on every parse.
///
/// A feature that is absent from some parse varies, since absent features have value 0 but
/// present features are counted.
fn is_pseudo_constant(values: &BTreeMap<usize, f64>, n_parses: usize) -> bool {
    if values.len() != n_parses {
        return false;
    }
    let mut iter = values.values();
    match iter.next() {
        Some(first) => iter.all(|value| value == first),
        None => true,
    }
}

/// Get the value with the highest gain.
///
/// Each value gains 2 for every parse taking it, the value one below gains 1. Ties go to the
/// smaller value.
pub(crate) fn highest_gain_value(values: &[f64]) -> f64 {
    let mut gains = values
        .iter()
        .flat_map(|&value| vec![(value, 2), (value - 1., 1)])
        .collect::<Vec<(f64, usize)>>();
    gains.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    let gains = gains.into_iter().coalesce(|(value_a, gain_a), (value_b, gain_b)| {
        if value_a == value_b {
            Ok((value_a, gain_a + gain_b))
        } else {
            Err(((value_a, gain_a), (value_b, gain_b)))
        }
    });

    let mut best: Option<(f64, usize)> = None;
    for (value, gain) in gains {
        match best {
            Some((_, best_gain)) if best_gain >= gain => (),
            _ => best = Some((value, gain)),
        }
    }
    best.map(|(value, _)| value).unwrap_or(0.)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use crate::features::{
        highest_gain_value, quantize, FeatureClass, FeatureCounts, FeatureKey, FeatureTable,
        ExtractFeatures, FeatureValues,
    };
    use crate::io::{PTBFormat, ReadTree};
    use crate::{AnnotatedTree, Annotator, Config, Parse, Sentence};

    pub fn annotated(s: &str) -> AnnotatedTree {
        Annotator::default().annotate(PTBFormat::Plain.string_to_tree(s).unwrap())
    }

    pub fn sentence(parses: &[(f64, &str)]) -> Sentence {
        let nbest = parses
            .iter()
            .map(|&(log_prob, tree)| (log_prob, PTBFormat::Plain.string_to_tree(tree).unwrap()))
            .collect();
        Sentence::new("sent", nbest, None, &Annotator::default()).unwrap()
    }

    /// Count the features of the first parse of a single-parse sentence.
    pub fn counts<E>(extractor: &E, tree: &str) -> Vec<(String, f64)>
    where
        E: ExtractFeatures,
    {
        let sentence = sentence(&[(-1., tree)]);
        let mut counts = FeatureCounts::new();
        extractor.parse_featurecount(&sentence.parses()[0], &mut counts);
        counts
            .into_iter()
            .map(|(key, value)| (key.key_string(), value))
            .collect()
    }

    // Counts feature `(f)` with the value given for the parse, parse i has log probability -(i + 1).
    struct Constant {
        values: Vec<f64>,
    }

    impl ExtractFeatures for Constant {
        type Key = Vec<String>;

        fn identifier(&self) -> &str {
            "Constant"
        }

        fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<Self::Key>) {
            let idx = (-parse.log_prob()) as usize - 1;
            if self.values[idx] != 0. {
                counts.insert(vec!["f".to_owned()], self.values[idx]);
            }
        }
    }

    fn three_parses() -> Sentence {
        sentence(&[
            (-1., "(S1 (NP (NN a)))"),
            (-2., "(S1 (NP (NN a)))"),
            (-3., "(S1 (NP (NN a)))"),
        ])
    }

    fn extracted(values: Vec<f64>, config: &Config) -> Option<usize> {
        let mut table = FeatureTable::new(Constant { values });
        table.extract_features(&three_parses(), config);
        table.get(&vec!["f".to_owned()])
    }

    #[test]
    fn pseudo_constant_features() {
        let config = Config::default();
        assert_eq!(extracted(vec![5., 5., 5.], &config), None);
        assert_eq!(extracted(vec![5., 5., 7.], &config), Some(1));
        assert_eq!(extracted(vec![5., 0., 5.], &config), Some(1));
    }

    #[test]
    fn collect_correct_and_incorrect() {
        let correct = Config::default().collect_incorrect(false);
        assert_eq!(extracted(vec![0., 5., 5.], &correct), None);
        assert_eq!(extracted(vec![5., 0., 0.], &correct), Some(1));

        let incorrect = Config::default().collect_correct(false);
        assert_eq!(extracted(vec![0., 5., 5.], &incorrect), Some(1));
        assert_eq!(extracted(vec![5., 7., 7.], &incorrect), Some(1));
        assert_eq!(extracted(vec![5., 0., 0.], &incorrect), None);
    }

    #[test]
    fn single_parse_sentences_are_ignored() {
        let mut table = FeatureTable::new(Constant { values: vec![1.] });
        table.extract_features(&sentence(&[(-1., "(S1 (NP (NN a)))")]), &Config::default());
        assert!(table.is_empty());
    }

    #[test]
    fn highest_gain() {
        assert_eq!(highest_gain_value(&[2., 2., 2., 5.]), 2.);
        assert_eq!(highest_gain_value(&[5., 2., 2., 2.]), 2.);
        assert_eq!(highest_gain_value(&[1., 2.]), 1.);
        assert_eq!(highest_gain_value(&[0., 0., 3.]), 0.);
        assert_eq!(highest_gain_value(&[]), 0.);
        // 3 gains 2 for each 3 and 1 for each 4
        assert_eq!(highest_gain_value(&[4., 3., 5., 1., 4., 3.]), 3.);
        let many = (0..1000).map(|idx| (idx % 7) as f64).collect::<Vec<_>>();
        assert_eq!(highest_gain_value(&many), 0.);
    }

    fn values(values: Vec<f64>, config: &Config) -> Vec<FeatureValues> {
        let mut table = FeatureTable::new(Constant { values });
        table.read_feature(7, "(f)").unwrap();
        let sentence = three_parses();
        let mut values = vec![BTreeMap::new(); sentence.n_parses()];
        table.feature_values(&sentence, config, &mut values);
        values
    }

    #[test]
    fn relative_and_absolute_values() {
        let relative = values(vec![2., 3., 0.], &Config::default());
        assert_eq!(relative[0].get(&7), None);
        assert_eq!(relative[1].get(&7), Some(&1.));
        assert_eq!(relative[2].get(&7), Some(&-2.));

        let absolute = values(vec![2., 3., 0.], &Config::default().absolute_counts(true));
        assert_eq!(absolute[0].get(&7), Some(&2.));
        assert_eq!(absolute[1].get(&7), Some(&3.));
        assert_eq!(absolute[2].get(&7), None);
    }

    #[test]
    fn prune_and_renumber() {
        let mut table = FeatureTable::new(Constant { values: vec![] });
        table.table.insert(vec!["a".to_owned()], 5);
        table.table.insert(vec!["b".to_owned()], 1);
        table.table.insert(vec!["c".to_owned()], 6);
        assert_eq!(table.prune_and_renumber(5, 10), 12);
        assert_eq!(table.get(&vec!["a".to_owned()]), Some(10));
        assert_eq!(table.get(&vec!["b".to_owned()]), None);
        assert_eq!(table.get(&vec!["c".to_owned()]), Some(11));

        let mut out = Vec::new();
        table.write_feature_ids(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "10\tConstant (a)\n11\tConstant (c)\n"
        );
    }

    #[test]
    fn duplicate_features() {
        let mut table = FeatureTable::new(Constant { values: vec![] });
        table.read_feature(1, "(a b)").unwrap();
        assert!(table.read_feature(2, "(a b)").is_err());
        assert!(table.read_feature(3, "a").is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn keys() {
        let key = (4, vec!["NP".to_owned(), "50%".to_owned(), "_".to_owned()]);
        assert_eq!(key.key_string(), "(4 (NP \"50%\" _))");
        assert_eq!(
            <(i32, Vec<String>)>::parse_key("(4 (NP \"50%\" _))").unwrap(),
            key
        );
        let tree = "(NP (DT the) NN)".to_owned();
        assert_eq!(tree.key_string(), "\"(NP (DT the) NN)\"");
        assert_eq!(String::parse_key("\"(NP (DT the) NN)\"").unwrap(), tree);
        assert_eq!(i32::parse_key(" -3 ").unwrap(), -3);
        assert!(i32::parse_key("(3)").is_err());
        assert!(<(i32, i32)>::parse_key("(1 2 3)").is_err());
    }

    #[test]
    fn quantize_lengths() {
        let bins = (0..8).map(quantize).collect::<Vec<_>>();
        assert_eq!(bins, vec![0, 1, 2, 4, 4, 5, 5, 5]);
    }
}
