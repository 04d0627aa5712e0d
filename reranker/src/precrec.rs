use std::fmt;
use std::ops::{Add, AddAssign};

use crate::Edges;

/// Parseval precision and recall over edge multisets.
///
/// Scores accumulate with `+=`, so corpus scores are the sum of sentence scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrecRec {
    /// Number of edges in common.
    pub n_common: usize,
    /// Number of gold edges.
    pub n_gold: usize,
    /// Number of test edges.
    pub n_test: usize,
}

impl PrecRec {
    pub fn new(n_common: usize, n_gold: usize, n_test: usize) -> Self {
        PrecRec {
            n_common,
            n_gold,
            n_test,
        }
    }

    /// Score `test` against `gold`.
    pub fn from_edges(gold: &Edges, test: &Edges) -> Self {
        let mut precrec = PrecRec::default();
        precrec.score(gold, test);
        precrec
    }

    /// Score `test` against `gold` and add the counts to `self`.
    ///
    /// Both multisets are merged in edge order; matching edges count as often as they occur in
    /// both sets.
    pub fn score(&mut self, gold: &Edges, test: &Edges) -> &mut Self {
        let mut gold_iter = gold.iter().peekable();
        let mut test_iter = test.iter().peekable();
        loop {
            let (gold_edge, gold_count) = match gold_iter.peek() {
                Some(&entry) => entry,
                None => break,
            };
            let (test_edge, test_count) = match test_iter.peek() {
                Some(&entry) => entry,
                None => break,
            };
            if gold_edge == test_edge {
                self.n_common += gold_count.min(test_count);
                self.n_gold += gold_count;
                self.n_test += test_count;
                gold_iter.next();
                test_iter.next();
            } else if gold_edge < test_edge {
                self.n_gold += gold_count;
                gold_iter.next();
            } else {
                self.n_test += test_count;
                test_iter.next();
            }
        }
        self.n_gold += gold_iter.map(|(_, count)| count).sum::<usize>();
        self.n_test += test_iter.map(|(_, count)| count).sum::<usize>();
        self
    }

    /// Get the precision, 0 without test edges.
    pub fn precision(&self) -> f64 {
        if self.n_test == 0 {
            0.
        } else {
            self.n_common as f64 / self.n_test as f64
        }
    }

    /// Get the recall, 1 without gold edges.
    pub fn recall(&self) -> f64 {
        if self.n_gold == 0 {
            1.
        } else {
            self.n_common as f64 / self.n_gold as f64
        }
    }

    /// Get the f-score, 0 without any edges.
    pub fn f_score(&self) -> f64 {
        if self.n_gold == 0 && self.n_test == 0 {
            0.
        } else {
            2. * self.n_common as f64 / (self.n_gold + self.n_test) as f64
        }
    }

    pub fn error_rate(&self) -> f64 {
        (self.n_gold as f64 + self.n_test as f64 - 2. * self.n_common as f64) / self.n_gold as f64
    }
}

impl AddAssign for PrecRec {
    fn add_assign(&mut self, other: PrecRec) {
        self.n_common += other.n_common;
        self.n_gold += other.n_gold;
        self.n_test += other.n_test;
    }
}

impl Add for PrecRec {
    type Output = PrecRec;

    fn add(mut self, other: PrecRec) -> PrecRec {
        self += other;
        self
    }
}

impl fmt::Display for PrecRec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "precision = {}/{} = {}, recall = {}/{} = {}, f-score = {}, error rate = {}",
            self.n_common,
            self.n_test,
            self.precision(),
            self.n_common,
            self.n_gold,
            self.recall(),
            self.f_score(),
            self.error_rate()
        )
    }
}
