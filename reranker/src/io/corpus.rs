use std::io::{BufRead, Cursor};

use failure::Error;
use log::debug;

use crate::io::TokenReader;
use crate::{Annotator, Sentence, Tree};

/// Format of n-best parser output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NBestFormat {
    /// A header `<n> <label>` followed by `n` lines `<logprob> <tree>`.
    Charniak,
    /// Lines `<logprob>\t<tree>` closed by a blank line, without a label.
    Petrov,
}

/// The n-best parses of one sentence.
#[derive(Clone, Debug)]
pub struct NBestList {
    /// Sentence label, empty for unlabeled formats.
    pub label: String,
    /// Log probabilities and trees in the order of the parser.
    pub parses: Vec<(f64, Tree)>,
    pub format: NBestFormat,
}

/// Reader for n-best parser output.
///
/// The format is detected per sentence: blocks starting with `-` or `0` are read as
/// `NBestFormat::Petrov` lists, everything else as `NBestFormat::Charniak` lists.
///
/// In the Petrov format, every blank line in excess of the one closing the previous list marks
/// a sentence without parses. Parses with probability `-Infinity` are skipped.
pub struct NBestReader<R> {
    tokens: TokenReader<R>,
    pending_empty: usize,
}

impl<R> NBestReader<R>
where
    R: BufRead,
{
    pub fn new(read: R) -> Self {
        NBestReader {
            tokens: TokenReader::new(read),
            pending_empty: 0,
        }
    }

    /// Read the next n-best list, `None` at the end of input.
    pub fn next_list(&mut self) -> Result<Option<NBestList>, Error> {
        if self.pending_empty > 0 {
            self.pending_empty -= 1;
            return Ok(Some(NBestList {
                label: String::new(),
                parses: Vec::new(),
                format: NBestFormat::Petrov,
            }));
        }

        let (blank_lines, first) = match self.tokens.skip_blank()? {
            Some(next) => next,
            None => return Ok(None),
        };

        if first == '-' || first == '0' {
            if blank_lines > 0 {
                self.pending_empty = blank_lines - 1;
                return Ok(Some(NBestList {
                    label: String::new(),
                    parses: Vec::new(),
                    format: NBestFormat::Petrov,
                }));
            }
            self.read_petrov().map(Some)
        } else {
            self.read_charniak().map(Some)
        }
    }

    fn read_petrov(&mut self) -> Result<NBestList, Error> {
        let mut parses = Vec::new();
        while let Some(line) = self.tokens.next_line()? {
            if line.trim().is_empty() {
                break;
            }
            if line.starts_with("-Infinity") {
                continue;
            }
            let mut line_tokens = TokenReader::new(Cursor::new(line.as_str()));
            let log_prob = line_tokens
                .parse_token::<f64>("log probability")
                .map_err(|err| self.malformed_line(&line, err))?;
            let tree = line_tokens
                .expect_tree()
                .map_err(|err| self.malformed_line(&line, err))?;
            parses.push((log_prob, tree));
        }
        Ok(NBestList {
            label: String::new(),
            parses,
            format: NBestFormat::Petrov,
        })
    }

    fn malformed_line(&self, line: &str, err: Error) -> Error {
        format_err!(
            "Failed to read n-best parser output at line {}: {}\nline = {}",
            self.tokens.line_no(),
            err,
            line
        )
    }

    fn read_charniak(&mut self) -> Result<NBestList, Error> {
        let n_parses = self.tokens.parse_token::<usize>("number of parses")?;
        if n_parses == 0 {
            return Err(self.tokens.malformed("Expected at least one parse"));
        }
        let label = self
            .tokens
            .next_token()?
            .ok_or_else(|| format_err!("Expected sentence label, found end of input"))?;
        let mut parses = Vec::with_capacity(n_parses);
        for _ in 0..n_parses {
            let log_prob = self.tokens.parse_token::<f64>("log probability")?;
            if !log_prob.is_finite() {
                return Err(self
                    .tokens
                    .malformed(format!("Log probability {} is not finite", log_prob)));
            }
            let tree = self.tokens.expect_tree()?;
            parses.push((log_prob, tree));
        }
        Ok(NBestList {
            label,
            parses,
            format: NBestFormat::Charniak,
        })
    }
}

impl<R> Iterator for NBestReader<R>
where
    R: BufRead,
{
    type Item = Result<NBestList, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_list().transpose()
    }
}

/// Reader for gold trees.
///
/// The stream starts with the number of sentences, followed by `<label> <tree>` pairs.
pub struct GoldReader<R> {
    tokens: TokenReader<R>,
    n_sentences: Option<usize>,
}

impl<R> GoldReader<R>
where
    R: BufRead,
{
    pub fn new(read: R) -> Self {
        GoldReader {
            tokens: TokenReader::new(read),
            n_sentences: None,
        }
    }

    /// Get the number of sentences announced in the header.
    pub fn n_sentences(&mut self) -> Result<usize, Error> {
        match self.n_sentences {
            Some(n) => Ok(n),
            None => {
                let n = self.tokens.parse_token::<usize>("number of sentences")?;
                self.n_sentences = Some(n);
                Ok(n)
            }
        }
    }

    /// Read the next labeled gold tree.
    pub fn next_gold(&mut self) -> Result<(String, Tree), Error> {
        self.n_sentences()?;
        let label = match self.tokens.next_token()? {
            Some(label) => label,
            None => return Err(format_err!("Failed to read gold sentence label")),
        };
        let tree = match self.tokens.next_tree()? {
            Some(tree) => tree,
            None => {
                return Err(format_err!(
                    "Failed to read gold tree of sentence {}",
                    label
                ))
            }
        };
        Ok((label, tree))
    }

    pub fn tokens(&mut self) -> &mut TokenReader<R> {
        &mut self.tokens
    }
}

/// Reader for sentences from separate n-best and gold streams.
///
/// The gold stream determines the number of sentences.
pub struct PairedReader<R, G> {
    nbest: NBestReader<R>,
    gold: GoldReader<G>,
    annotator: Annotator,
    read: usize,
}

impl<R, G> PairedReader<R, G>
where
    R: BufRead,
    G: BufRead,
{
    pub fn new(nbest: R, gold: G, annotator: Annotator) -> Self {
        PairedReader {
            nbest: NBestReader::new(nbest),
            gold: GoldReader::new(gold),
            annotator,
            read: 0,
        }
    }

    pub fn n_sentences(&mut self) -> Result<usize, Error> {
        self.gold.n_sentences()
    }

    /// Read the next sentence, `None` after the announced number of sentences.
    pub fn next_sentence(&mut self) -> Result<Option<Sentence>, Error> {
        let n_sentences = self.gold.n_sentences()?;
        if self.read >= n_sentences {
            return Ok(None);
        }
        self.read += 1;

        let nbest = self.nbest.next_list()?.ok_or_else(|| {
            format_err!(
                "Failed to read n-best parses for sentence {}, n_sentences = {}",
                self.read - 1,
                n_sentences
            )
        })?;
        let (gold_label, gold) = self.gold.next_gold()?;
        if !nbest.label.is_empty() && nbest.label != gold_label {
            return Err(format_err!(
                "Parse and gold labels don't match: label = {}, gold label = {}",
                nbest.label,
                gold_label
            ));
        }

        debug!("Read {} parses for sentence {}", nbest.parses.len(), gold_label);
        Sentence::new(gold_label, nbest.parses, Some(gold), &self.annotator).map(Some)
    }
}

impl<R, G> Iterator for PairedReader<R, G>
where
    R: BufRead,
    G: BufRead,
{
    type Item = Result<Sentence, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sentence().transpose()
    }
}

/// Reader for corpora in a single stream.
///
/// The stream starts with the number of sentences. Every sentence consists of a header
/// `<n> <label>`, the gold tree and `n` lines `<logprob> <tree>`.
pub struct CorpusReader<R> {
    tokens: TokenReader<R>,
    annotator: Annotator,
    n_sentences: Option<usize>,
    read: usize,
}

impl<R> CorpusReader<R>
where
    R: BufRead,
{
    pub fn new(read: R, annotator: Annotator) -> Self {
        CorpusReader {
            tokens: TokenReader::new(read),
            annotator,
            n_sentences: None,
            read: 0,
        }
    }

    /// Get the number of sentences announced in the header.
    pub fn n_sentences(&mut self) -> Result<usize, Error> {
        match self.n_sentences {
            Some(n) => Ok(n),
            None => {
                let n = self.tokens.parse_token::<usize>("number of sentences")?;
                self.n_sentences = Some(n);
                Ok(n)
            }
        }
    }

    /// Read the next sentence, `None` after the announced number of sentences.
    pub fn next_sentence(&mut self) -> Result<Option<Sentence>, Error> {
        let n_sentences = self.n_sentences()?;
        if self.read >= n_sentences {
            return Ok(None);
        }
        self.read += 1;

        let n_parses = self.tokens.parse_token::<usize>("number of parses")?;
        let label = self
            .tokens
            .next_token()?
            .ok_or_else(|| format_err!("Expected sentence label, found end of input"))?;
        let gold = self.tokens.expect_tree()?;
        let mut parses = Vec::with_capacity(n_parses);
        for _ in 0..n_parses {
            let log_prob = self.tokens.parse_token::<f64>("log probability")?;
            let tree = self.tokens.expect_tree()?;
            parses.push((log_prob, tree));
        }
        debug!("Read {} parses for sentence {}", n_parses, label);
        Sentence::new(label, parses, Some(gold), &self.annotator).map(Some)
    }
}

impl<R> Iterator for CorpusReader<R>
where
    R: BufRead,
{
    type Item = Result<Sentence, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sentence().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{BufReader, Cursor};

    use crate::io::{CorpusReader, NBestFormat, NBestReader, PairedReader};
    use crate::Annotator;

    #[test]
    fn charniak_lists() {
        let input = "2 sent.1\n-10.5 (S1 (NP (NN dog)))\n-12 (S1 (VP (VB dog)))\n\n1 sent.2\n-3 (S1 (NP (NN cat)))\n";
        let mut reader = NBestReader::new(Cursor::new(input));
        let list = reader.next_list().unwrap().unwrap();
        assert_eq!(list.format, NBestFormat::Charniak);
        assert_eq!(list.label, "sent.1");
        assert_eq!(list.parses.len(), 2);
        assert_eq!(list.parses[1].0, -12.);
        let list = reader.next_list().unwrap().unwrap();
        assert_eq!(list.label, "sent.2");
        assert!(reader.next_list().unwrap().is_none());
    }

    #[test]
    fn petrov_lists() {
        let input = "-10.5\t(S1 (NP (NN dog)))\n-Infinity\t(S1 (X (NN dog)))\n-12\t(S1 (VP (VB dog)))\n\n\n-3\t(S1 (NP (NN cat)))\n";
        let lists = NBestReader::new(Cursor::new(input))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].format, NBestFormat::Petrov);
        assert_eq!(lists[0].parses.len(), 2);
        assert!(lists[1].parses.is_empty());
        assert_eq!(lists[2].parses.len(), 1);
        assert_eq!(lists[2].parses[0].0, -3.);
    }

    #[test]
    fn malformed_lists() {
        let mut reader = NBestReader::new(Cursor::new("0 sent.1\n"));
        assert!(reader.next_list().is_err());
        let mut reader = NBestReader::new(Cursor::new("2 sent.1\n-1 (S1 (NN a))\n"));
        assert!(reader.next_list().is_err());
        let mut reader = NBestReader::new(Cursor::new("-1\t(S1 (NN a)\n"));
        assert!(reader.next_list().is_err());
    }

    #[test]
    fn paired_streams() {
        let nbest = "2 sent.1\n-10 (S1 (NP (DT the) (NN dog)))\n-11 (S1 (NP (DT the)) (NP (NN dog)))\n";
        let gold = "1\nsent.1 (S1 (NP-SBJ (DT the) (NN dog)))\n";
        let mut reader = PairedReader::new(Cursor::new(nbest), Cursor::new(gold), Annotator::default());
        assert_eq!(reader.n_sentences().unwrap(), 1);
        let sentence = reader.next_sentence().unwrap().unwrap();
        assert_eq!(sentence.label(), "sent.1");
        assert_eq!(sentence.n_parses(), 2);
        assert_eq!(sentence.gold_edges(), 1);
        assert_eq!(sentence.parses()[0].n_correct(), 1);
        assert_eq!(sentence.parses()[1].n_correct(), 0);
        assert!(reader.next_sentence().unwrap().is_none());
    }

    #[test]
    fn label_mismatch() {
        let nbest = "1 sent.1\n-10 (S1 (NP (NN dog)))\n";
        let gold = "1\nsent.2 (S1 (NP (NN dog)))\n";
        let mut reader = PairedReader::new(Cursor::new(nbest), Cursor::new(gold), Annotator::default());
        assert!(reader.next_sentence().is_err());
    }

    #[test]
    fn single_stream() {
        let f = File::open("testdata/corpus.txt").unwrap();
        let reader = CorpusReader::new(BufReader::new(f), Annotator::default());
        let sentences = reader.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].label(), "sent.1");
        assert_eq!(sentences[0].n_parses(), 3);
        assert_eq!(sentences[1].n_parses(), 2);
        assert_eq!(sentences[2].n_parses(), 2);
        assert!(sentences.iter().all(|sentence| sentence.gold().is_some()));
    }
}
