//! Linear reranking of n-best parses.

use std::io::{BufRead, Write};

use failure::Error;
use log::debug;

use crate::features::FeatureValues;
use crate::io::{PTBFormat, WriteTree};
use crate::{Config, FeatureClasses, Parse, Sentence};

/// Feature weights indexed by feature id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Weights(Vec<f64>);

impl Weights {
    pub fn new(weights: Vec<f64>) -> Self {
        Weights(weights)
    }

    /// Read `<id> = <weight>` lines.
    ///
    /// The weight vector has `max_id + 1` entries, features without a weight get weight 0.
    /// Ids above `max_id` and repeated ids are errors.
    pub fn read<R>(read: R, max_id: usize) -> Result<Self, Error>
    where
        R: BufRead,
    {
        let mut weights = vec![0.; max_id + 1];
        let mut seen = vec![false; max_id + 1];
        for (line_no, line) in read.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.splitn(2, '=');
            let (id, weight) = match (parts.next(), parts.next()) {
                (Some(id), Some(weight)) => (id.trim(), weight.trim()),
                _ => {
                    return Err(format_err!(
                        "Expected `id = weight` on line {}, found: {}",
                        line_no + 1,
                        line
                    ))
                }
            };
            let id = id
                .parse::<usize>()
                .map_err(|_| format_err!("Invalid feature id on line {}: {}", line_no + 1, id))?;
            let weight = weight.parse::<f64>().map_err(|_| {
                format_err!("Invalid weight on line {}: {}", line_no + 1, weight)
            })?;

            if id > max_id {
                return Err(format_err!(
                    "Weight for feature {}, but the maximum feature id is {}",
                    id,
                    max_id
                ));
            }
            if seen[id] {
                return Err(format_err!("Duplicate weight for feature {}", id));
            }
            seen[id] = true;
            weights[id] = weight;
        }

        debug!(
            "Read {} weights for {} features",
            seen.iter().filter(|&&seen| seen).count(),
            weights.len()
        );
        Ok(Weights(weights))
    }

    pub fn get(&self, id: usize) -> Option<f64> {
        self.0.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the dot product of feature values and weights.
    ///
    /// Fails on feature ids without weight, these indicate weights and feature ids of
    /// different models.
    pub fn score(&self, values: &FeatureValues) -> Result<f64, Error> {
        let mut score = 0.;
        for (&id, &value) in values {
            let weight = self.get(id).ok_or_else(|| {
                format_err!(
                    "Feature id {} exceeds the number of weights {}",
                    id,
                    self.len()
                )
            })?;
            score += value * weight;
        }
        Ok(score)
    }
}

/// Reranker scoring parses by the weighted sum of their feature values.
pub struct Reranker {
    features: FeatureClasses,
    weights: Weights,
    config: Config,
}

impl Reranker {
    /// Construct a reranker.
    ///
    /// `features` should hold feature ids, e.g. through `FeatureClasses::read_feature_ids`.
    pub fn new(features: FeatureClasses, weights: Weights, config: Config) -> Self {
        Reranker {
            features,
            weights,
            config,
        }
    }

    /// Read feature ids into `features` and then the weights.
    pub fn read<F, W>(
        mut features: FeatureClasses,
        feature_ids: F,
        weights: W,
        config: Config,
    ) -> Result<Self, Error>
    where
        F: BufRead,
        W: BufRead,
    {
        let max_id = features.read_feature_ids(feature_ids)?;
        let weights = Weights::read(weights, max_id)?;
        Ok(Reranker::new(features, weights, config))
    }

    pub fn features(&self) -> &FeatureClasses {
        &self.features
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Get the score of every parse.
    pub fn scores(&self, sentence: &Sentence) -> Result<Vec<f64>, Error> {
        self.features
            .feature_values(sentence, &self.config)
            .iter()
            .map(|values| self.weights.score(values))
            .collect()
    }

    /// Get the highest-scoring parse, `None` for sentences without parses.
    ///
    /// Of parses with equal scores, the first one is returned.
    pub fn best_parse<'a>(&self, sentence: &'a Sentence) -> Result<Option<&'a Parse>, Error> {
        let scores = self.scores(sentence)?;
        Ok(best_index(&scores).map(|idx| &sentence.parses()[idx]))
    }

    /// Get parse indices and scores, ordered by descending score.
    ///
    /// Parses with equal scores keep their order.
    pub fn rank(&self, sentence: &Sentence) -> Result<Vec<(usize, f64)>, Error> {
        let mut ranked = self.scores(sentence)?.into_iter().enumerate().collect::<Vec<_>>();
        ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }

    /// Write the parses in rank order.
    ///
    /// The header `<n_parses> <label>` is followed by a `<score> <log prob>` line and the tree
    /// of every parse.
    pub fn write_ranked_trees(&self, sentence: &Sentence, write: &mut dyn Write) -> Result<(), Error> {
        writeln!(write, "{} {}", sentence.n_parses(), sentence.label())?;
        for (idx, score) in self.rank(sentence)? {
            let parse = &sentence.parses()[idx];
            writeln!(write, "{} {}", score, parse.log_prob())?;
            writeln!(write, "{}", PTBFormat::Plain.tree_to_string(parse.tree()))?;
        }
        Ok(())
    }

    /// Write `<label> <parse> <id> <value>` lines for the features of every parse.
    ///
    /// The feature with id 0 and features with weight 0 are left out.
    pub fn write_features_debug(
        &self,
        sentence: &Sentence,
        write: &mut dyn Write,
    ) -> Result<(), Error> {
        let values = self.features.feature_values(sentence, &self.config);
        for (idx, parse_values) in values.iter().enumerate() {
            for (&id, &value) in parse_values {
                if id == 0 || self.weights.get(id) == Some(0.) {
                    continue;
                }
                writeln!(write, "{} {} {} {}", sentence.label(), idx, id, value)?;
            }
        }
        Ok(())
    }
}

// Only a strictly greater score replaces the best score.
fn best_index(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, best_score)) if score <= best_score => (),
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;

    use approx::assert_abs_diff_eq;

    use super::best_index;
    use crate::features::{NLogP, RightBranch};
    use crate::io::CorpusReader;
    use crate::{Annotator, Config, FeatureClasses, Reranker, Sentence, Weights};

    const CORPUS: &str = "1
3 s1
(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))
-10 (S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))
-11 (S1 (NP (NP (DT the) (NN dog)) (NP (NNS barks))))
-12 (S1 (S (NP (DT the)) (VP (VBZ dog) (NP (NNS barks)))))
";

    const FEATURE_IDS: &str = "0\tNLogP 0\n1\tRightBranch 0\n2\tRightBranch 1\n";

    fn sentence() -> Sentence {
        CorpusReader::new(Cursor::new(CORPUS), Annotator::default())
            .next()
            .unwrap()
            .unwrap()
    }

    fn reranker(weights: &str) -> Reranker {
        let mut features = FeatureClasses::new();
        features.push(NLogP);
        features.push(RightBranch);
        Reranker::read(
            features,
            Cursor::new(FEATURE_IDS),
            Cursor::new(weights),
            Config::default().absolute_counts(true),
        )
        .unwrap()
    }

    #[test]
    fn read_weights() {
        let weights = Weights::read(Cursor::new("0 = -1\n\n2=0.5\n"), 3).unwrap();
        assert_eq!(weights, Weights::new(vec![-1., 0., 0.5, 0.]));
        assert_eq!(weights.get(2), Some(0.5));
        assert_eq!(weights.get(4), None);
    }

    #[test]
    fn invalid_weights() {
        assert!(Weights::read(Cursor::new("4 = 1\n"), 3).is_err());
        assert!(Weights::read(Cursor::new("1 = 1\n1 = 2\n"), 3).is_err());
        assert!(Weights::read(Cursor::new("1 1\n"), 3).is_err());
        assert!(Weights::read(Cursor::new("a = 1\n"), 3).is_err());
        assert!(Weights::read(Cursor::new("1 = b\n"), 3).is_err());
    }

    #[test]
    fn score() {
        let weights = Weights::new(vec![0.5, -2., 0.25]);
        let mut values = BTreeMap::new();
        values.insert(0, 2.);
        values.insert(2, 4.);
        assert_abs_diff_eq!(weights.score(&values).unwrap(), 2.);
        values.insert(3, 1.);
        assert!(weights.score(&values).is_err());
    }

    #[test]
    fn scores() {
        let scores = reranker("0 = -1\n2 = 2.5\n").scores(&sentence()).unwrap();
        assert_eq!(scores.len(), 3);
        assert_abs_diff_eq!(scores[0], 0.);
        assert_abs_diff_eq!(scores[1], -1.);
        assert_abs_diff_eq!(scores[2], 0.5);
    }

    #[test]
    fn best_parse() {
        let sentence = sentence();
        let best = reranker("0 = -1\n2 = 2.5\n")
            .best_parse(&sentence)
            .unwrap()
            .unwrap();
        assert_eq!(best.log_prob(), -12.);

        // parses 0 and 2 both score -2
        let best = reranker("0 = -1\n2 = 2\n")
            .best_parse(&sentence)
            .unwrap()
            .unwrap();
        assert_eq!(best.log_prob(), -10.);
    }

    #[test]
    fn first_best_wins() {
        let weights = Weights::new(vec![1.6, 3.2]);
        let mut first = BTreeMap::new();
        first.insert(0, 2.);
        let mut second = BTreeMap::new();
        second.insert(1, 1.);
        let scores = vec![
            weights.score(&first).unwrap(),
            weights.score(&second).unwrap(),
            1.,
        ];
        assert_eq!(scores[0], scores[1]);
        assert_eq!(best_index(&scores), Some(0));
        assert_eq!(best_index(&[1., 3.2, 3.2]), Some(1));
        assert_eq!(best_index(&[-1.]), Some(0));
        assert_eq!(best_index(&[]), None);
    }

    #[test]
    fn stable_ranking() {
        let ranked = reranker("0 = -1\n2 = 2\n").rank(&sentence()).unwrap();
        let order = ranked.iter().map(|&(idx, _)| idx).collect::<Vec<_>>();
        assert_eq!(order, vec![0, 2, 1]);
    }

    #[test]
    fn ranked_trees() {
        let mut out = Vec::new();
        reranker("0 = -1\n2 = 2.5\n")
            .write_ranked_trees(&sentence(), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "3 s1
0.5 -12
(S1 (S (NP (DT the)) (VP (VBZ dog) (NP (NNS barks)))))
0 -10
(S1 (S (NP (DT the) (NN dog)) (VP (VBZ barks))))
-1 -11
(S1 (NP (NP (DT the) (NN dog)) (NP (NNS barks))))
"
        );
    }

    #[test]
    fn features_debug() {
        let mut out = Vec::new();
        reranker("0 = -1\n1 = 0\n2 = 2.5\n")
            .write_features_debug(&sentence(), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "s1 0 2 4\ns1 1 2 4\ns1 2 2 5\n"
        );
    }

    #[test]
    fn sentences_without_parses() {
        let sentence = Sentence::new("empty", Vec::new(), None, &Annotator::default()).unwrap();
        let reranker = reranker("0 = -1\n");
        assert!(reranker.best_parse(&sentence).unwrap().is_none());
        assert!(reranker.rank(&sentence).unwrap().is_empty());
    }
}
