use std::collections::HashMap;
use std::io::{BufRead, Write};

use failure::Error;
use log::{debug, info};

use crate::features::{
    AnnotationLevel, CoLenPar, CoPar, Edges, ExtractFeatures, FeatureClass, FeatureTable,
    FeatureValues, HeadTree, Heads, Heavy, Lexicalize, NGram, NGramTree, NLogP, RightBranch, Rule,
    RuleContext, SubjVerbAgr, WProj, WordEdges,
};
use crate::heads::HeadKind;
use crate::{Config, Sentence};

/// An ordered collection of feature classes.
///
/// Classes are visited in insertion order when extracting, numbering and writing features,
/// so feature ids only depend on the extracted data.
pub struct FeatureClasses {
    classes: Vec<Box<dyn FeatureClass>>,
}

impl Default for FeatureClasses {
    fn default() -> Self {
        FeatureClasses::features_060111()
    }
}

impl FeatureClasses {
    /// Construct an empty collection.
    pub fn new() -> Self {
        FeatureClasses {
            classes: Vec::new(),
        }
    }

    /// Append a feature class.
    pub fn push<E>(&mut self, extractor: E)
    where
        E: ExtractFeatures + 'static,
    {
        self.classes.push(Box::new(FeatureTable::new(extractor)));
    }

    /// The feature set of January 2006.
    pub fn features_060111() -> Self {
        use crate::features::AnnotationLevel::{Lexical, Pos};
        let none = AnnotationLevel::None;

        let mut classes = FeatureClasses::new();
        classes.push(NLogP);

        classes.push(Rule::default());
        classes.push(Rule::new(0, context(0, true, none, none, HeadKind::Syntactic)));
        classes.push(Rule::new(
            0,
            context(1, false, Lexical, Lexical, HeadKind::Syntactic),
        ));

        let ngrams = [
            (1, true, none, none, HeadKind::Syntactic),
            (1, false, Pos, none, HeadKind::Syntactic),
            (2, false, Pos, none, HeadKind::Syntactic),
            (1, false, none, Pos, HeadKind::Syntactic),
            (2, false, none, Pos, HeadKind::Syntactic),
            (3, false, none, Pos, HeadKind::Syntactic),
            (1, false, none, Lexical, HeadKind::Syntactic),
            (2, false, none, Lexical, HeadKind::Syntactic),
            (3, false, none, Lexical, HeadKind::Syntactic),
            (1, true, none, none, HeadKind::Semantic),
            (2, true, none, none, HeadKind::Semantic),
            (1, false, Pos, none, HeadKind::Semantic),
            (1, false, none, Pos, HeadKind::Semantic),
            (2, false, none, Pos, HeadKind::Semantic),
            (3, false, none, Pos, HeadKind::Semantic),
        ];
        for &(frag_len, label_conjunct, head, functional, kind) in ngrams.iter() {
            classes.push(NGram::new(
                frag_len,
                context(0, label_conjunct, head, functional, kind),
            ));
        }

        classes.push(WProj::new(HeadKind::Semantic, false, 1));
        classes.push(WProj::new(HeadKind::Syntactic, false, 1));

        classes.push(RightBranch);

        classes.push(Heads::new(2, true, true, HeadKind::Semantic));
        classes.push(Heads::new(3, true, true, HeadKind::Syntactic));

        classes.push(Heavy);

        classes.push(NGramTree::new(2, Lexicalize::None, true, 0));
        classes.push(NGramTree::new(2, Lexicalize::ClosedClass, true, 0));
        classes.push(NGramTree::new(2, Lexicalize::All, true, 0));
        classes.push(NGramTree::new(2, Lexicalize::All, false, 0));

        classes.push(HeadTree::new(true, false, 0, HeadKind::Syntactic));

        classes.push(SubjVerbAgr);
        classes.push(CoPar::new(true));
        classes.push(CoLenPar);

        for &(binned, left_prec, left_succ, right_prec, right_succ) in [
            (false, 0, 0, 0, 0),
            (false, 0, 0, 0, 2),
            (false, 0, 1, 0, 0),
            (true, 0, 0, 0, 2),
            (true, 1, 0, 0, 1),
            (true, 1, 1, 0, 0),
        ]
        .iter()
        {
            classes.push(Edges::new(binned, left_prec, left_succ, right_prec, right_succ));
        }

        for &(binned, left_prec, left_succ, right_prec, right_succ) in [
            (false, 0, 0, 0, 1),
            (false, 0, 1, 1, 0),
            (false, 1, 0, 0, 0),
            (false, 1, 1, 0, 0),
            (false, 2, 0, 0, 0),
            (true, 0, 1, 0, 1),
            (true, 0, 2, 0, 0),
            (true, 2, 0, 0, 0),
        ]
        .iter()
        {
            classes.push(WordEdges::new(
                binned, left_prec, left_succ, right_prec, right_succ,
            ));
        }

        classes
    }

    /// Get the identifiers of the classes in order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|class| class.identifier())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Get the number of features over all classes.
    pub fn n_features(&self) -> usize {
        self.classes.iter().map(|class| class.len()).sum()
    }

    /// Count the features of a sentence in every class.
    pub fn extract(&mut self, sentence: &Sentence, config: &Config) {
        for class in &mut self.classes {
            class.extract_features(sentence, config);
        }
    }

    /// Count the features of every sentence of a corpus.
    ///
    /// Returns the number of sentences.
    pub fn extract_corpus<I>(&mut self, sentences: I, config: &Config) -> Result<usize, Error>
    where
        I: IntoIterator<Item = Result<Sentence, Error>>,
    {
        config.validate_for_extraction()?;

        let mut n_sentences = 0;
        for sentence in sentences {
            let sentence = sentence?;
            self.extract(&sentence, config);
            n_sentences += 1;
            if n_sentences % 1000 == 0 {
                info!("Extracted features from {} sentences", n_sentences);
            }
        }
        info!(
            "Extracted {} features from {} sentences",
            self.n_features(),
            n_sentences
        );
        Ok(n_sentences)
    }

    /// Discard rare features and number the others from `start_id`, class by class.
    ///
    /// Returns the next unused id.
    pub fn prune_and_renumber(&mut self, min_count: usize, start_id: usize) -> usize {
        let mut next_id = start_id;
        for class in &mut self.classes {
            next_id = class.prune_and_renumber(min_count, next_id);
            debug!("{}: {} features", class.identifier(), class.len());
        }
        next_id
    }

    /// Write `value<TAB>identifier key` lines of every class.
    ///
    /// Values are feature ids after pruning or reading ids, sentence counts before.
    pub fn write_feature_ids(&self, write: &mut dyn Write) -> Result<(), Error> {
        for class in &self.classes {
            class.write_feature_ids(write)?;
        }
        Ok(())
    }

    /// Read feature ids written by `write_feature_ids`.
    ///
    /// Returns the highest id. Fails on identifiers of classes that are not in the
    /// collection.
    pub fn read_feature_ids<R>(&mut self, read: R) -> Result<usize, Error>
    where
        R: BufRead,
    {
        let index = self
            .classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.identifier().to_owned(), idx))
            .collect::<HashMap<_, _>>();

        let mut max_id = 0;
        for (line_no, line) in read.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (id, rest) = split_field(line);
            let id = id.parse::<usize>().map_err(|_| {
                format_err!("Expected feature id on line {}, found: {}", line_no + 1, id)
            })?;
            let (identifier, key) = split_field(rest);
            let idx = index.get(identifier).ok_or_else(|| {
                format_err!(
                    "Can't find feature identifier {} in feature list, the feature definitions are incompatible",
                    identifier
                )
            })?;
            self.classes[*idx].read_feature(id, key)?;
            max_id = max_id.max(id);
        }

        info!("Read {} features, max id = {}", self.n_features(), max_id);
        Ok(max_id)
    }

    /// Get the feature values of every parse of a sentence.
    pub fn feature_values(&self, sentence: &Sentence, config: &Config) -> Vec<FeatureValues> {
        let mut values = vec![FeatureValues::new(); sentence.n_parses()];
        for class in &self.classes {
            class.feature_values(sentence, config, &mut values);
        }
        values
    }

    /// Write the feature values of a corpus.
    ///
    /// The output starts with `S=<n_sentences>`. Every sentence is written on one line as
    /// `G=<gold edges> N=<parses>` followed by ` P=<edges> W=<correct edges>` and the
    /// features of every parse, each parse closed by a comma. Features with value 1 are
    /// written as ` <id>`, others as ` <id>=<value>`.
    pub fn write_features<I>(
        &self,
        n_sentences: usize,
        sentences: I,
        config: &Config,
        write: &mut dyn Write,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = Result<Sentence, Error>>,
    {
        writeln!(write, "S={}", n_sentences)?;

        let mut sentences = sentences.into_iter();
        for idx in 0..n_sentences {
            let sentence = sentences
                .next()
                .ok_or_else(|| format_err!("Error reading sentence {}", idx + 1))??;

            write!(
                write,
                "G={} N={}",
                sentence.gold_edges(),
                sentence.n_parses()
            )?;
            let values = self.feature_values(&sentence, config);
            for (parse, parse_values) in sentence.parses().iter().zip(values) {
                write!(write, " P={} W={}", parse.n_edges(), parse.n_correct())?;
                for (id, value) in parse_values {
                    if value == 1. {
                        write!(write, " {}", id)?;
                    } else {
                        write!(write, " {}={}", id, value)?;
                    }
                }
                write!(write, ",")?;
            }
            writeln!(write)?;
        }
        Ok(())
    }
}

// Rule context of the default feature set, ancestor trees and root labels are unused.
fn context(
    n_anc_cats: usize,
    label_conjunct: bool,
    head: AnnotationLevel,
    functional: AnnotationLevel,
    kind: HeadKind,
) -> RuleContext {
    RuleContext {
        n_anc_cats,
        label_conjunct,
        head,
        functional,
        kind,
        ..RuleContext::default()
    }
}

/// Split off the first whitespace-separated field.
fn split_field(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Cursor;

    use crate::features::{CoLenPar, NLogP, RightBranch};
    use crate::io::CorpusReader;
    use crate::{Annotator, Config, FeatureClasses};

    const CORPUS: &str = "2
3 s1
(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))
-10 (S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))
-11 (S1 (NP (NP (DT the) (NN dog)) (NP (NNS barks))))
-12 (S1 (S (NP (DT the)) (VP (VBZ dog) (NP (NNS barks)))))
2 s2
(S1 (S (NP (NNS dogs)) (VP (VBP bark))))
-5 (S1 (S (NP (NNS dogs)) (VP (VBP bark))))
-6 (S1 (NP (NNS dogs) (NNS bark)))
";

    fn corpus() -> CorpusReader<Cursor<&'static str>> {
        CorpusReader::new(Cursor::new(CORPUS), Annotator::default())
    }

    fn extracted(min_count: usize) -> FeatureClasses {
        let mut classes = FeatureClasses::default();
        let config = Config::default();
        assert_eq!(classes.extract_corpus(corpus(), &config).unwrap(), 2);
        classes.prune_and_renumber(min_count, 0);
        classes
    }

    #[test]
    fn default_classes() {
        let classes = FeatureClasses::default();
        assert_eq!(classes.len(), 47);
        let identifiers = classes.identifiers().collect::<Vec<_>>();
        assert_eq!(identifiers[0], "NLogP");
        assert_eq!(identifiers[1], "Rule:0:0:0:0:0:0:0:1");
        assert_eq!(identifiers[2], "Rule:0:0:0:1:0:0:0:1");
        assert_eq!(identifiers[3], "Rule:0:1:0:0:2:2:0:1");
        assert_eq!(identifiers[4], "NGram:1:0:0:1:0:0:0:1");
        assert_eq!(identifiers[46], "WordEdges:1:2:0:0:0");
        let unique = identifiers.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), identifiers.len());
    }

    #[test]
    fn invalid_configuration() {
        let mut classes = FeatureClasses::default();
        let config = Config::default()
            .collect_correct(false)
            .collect_incorrect(false);
        assert!(classes.extract_corpus(corpus(), &config).is_err());
    }

    #[test]
    fn ids_are_contiguous() {
        let mut classes = extracted(1);
        let n_features = classes.n_features();
        assert!(n_features > 0);
        assert_eq!(classes.prune_and_renumber(0, 0), n_features);

        let mut out = Vec::new();
        classes.write_feature_ids(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let ids = out
            .lines()
            .map(|line| line.split('\t').next().unwrap().parse::<usize>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, (0..n_features).collect::<Vec<_>>());
    }

    #[test]
    fn pruning_is_monotone() {
        let all = extracted(1).n_features();
        let frequent = extracted(2).n_features();
        assert!(frequent < all);
        assert_eq!(extracted(3).n_features(), 0);
    }

    #[test]
    fn feature_ids_round_trip() {
        let classes = extracted(1);
        let mut out = Vec::new();
        classes.write_feature_ids(&mut out).unwrap();

        let mut read = FeatureClasses::default();
        let max_id = read.read_feature_ids(Cursor::new(&out)).unwrap();
        assert_eq!(max_id + 1, classes.n_features());
        assert_eq!(read.n_features(), classes.n_features());

        let mut rewritten = Vec::new();
        read.write_feature_ids(&mut rewritten).unwrap();
        assert_eq!(out, rewritten);
    }

    #[test]
    fn unknown_identifiers() {
        let mut classes = FeatureClasses::new();
        classes.push(NLogP);
        assert_eq!(
            classes
                .read_feature_ids(Cursor::new("0\tNLogP 0\n\n"))
                .unwrap(),
            0
        );
        assert!(classes
            .read_feature_ids(Cursor::new("1\tNLogCondP 0\n"))
            .is_err());
        assert!(classes.read_feature_ids(Cursor::new("x NLogP 0\n")).is_err());
    }

    #[test]
    fn feature_values() {
        let mut classes = FeatureClasses::new();
        classes.push(NLogP);
        classes.push(RightBranch);
        classes.push(CoLenPar);
        classes
            .read_feature_ids(Cursor::new("0\tNLogP 0\n1\tRightBranch 0\n2\tRightBranch 1\n"))
            .unwrap();

        let sentence = corpus().next().unwrap().unwrap();
        let values = classes.feature_values(&sentence, &Config::default().absolute_counts(true));
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].get(&0), Some(&10.));
        assert_eq!(values[2].get(&0), Some(&12.));
        // S1 S VP VBZ on the rightmost branch, NP DT NN off it
        assert_eq!(values[0].get(&2), Some(&4.));
        assert_eq!(values[0].get(&1), Some(&3.));
    }

    #[test]
    fn write_features() {
        let mut classes = FeatureClasses::new();
        classes.push(NLogP);
        classes
            .read_feature_ids(Cursor::new("0\tNLogP 0\n"))
            .unwrap();

        let mut out = Vec::new();
        classes
            .write_features(2, corpus(), &Config::default(), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "S=2\nG=3 N=3 P=3 W=3, P=3 W=1 0, P=4 W=1 0=2,\nG=3 N=2 P=3 W=3, P=1 W=0 0,\n"
        );
    }

    #[test]
    fn write_fractional_values() {
        let mut classes = FeatureClasses::new();
        classes.push(NLogP);
        classes
            .read_feature_ids(Cursor::new("0\tNLogP 0\n"))
            .unwrap();

        let corpus = "1
2 s
(S1 (NP (NN a)))
-10.123456789 (S1 (NP (NN a)))
-2 (S1 (NP (NN b)))
";
        let reader = CorpusReader::new(Cursor::new(corpus), Annotator::default());
        let mut out = Vec::new();
        classes
            .write_features(1, reader, &Config::default().absolute_counts(true), &mut out)
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(" 0=10.123456789,"));
        assert!(out.contains(" 0=2,"));
    }

    #[test]
    fn write_features_checks_sentence_count() {
        let classes = FeatureClasses::default();
        let mut out = Vec::new();
        assert!(classes
            .write_features(3, corpus(), &Config::default(), &mut out)
            .is_err());
    }
}
