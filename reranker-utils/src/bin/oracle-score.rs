use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use clap::{App, AppSettings, Arg};
use stdinout::{OrExit, Output};

use reranker::{Annotator, PairedReader, PrecRec, Sentence};

/// Scores of the first and the oracle parses over a corpus.
#[derive(Debug, Default)]
struct OracleScores {
    n_sentences: usize,
    n_parsed: usize,
    n_exact_match: usize,
    first: PrecRec,
    oracle: PrecRec,
    sum_log2_cond_prob_first: f64,
    sum_log2_cond_prob_oracle: f64,
}

impl OracleScores {
    /// Add a sentence, returning the per-sentence table row of parsed sentences.
    fn add(&mut self, sentence: &Sentence) -> Option<String> {
        self.n_sentences += 1;
        let gold_edges = sentence.gold_edges();
        self.oracle.n_gold += gold_edges;
        self.first += sentence
            .precrec(0)
            .unwrap_or_else(|| PrecRec::new(0, gold_edges, 0));

        let parses = sentence.parses();
        let first = parses.first()?;
        self.n_parsed += 1;

        let mut sum_p = 0.;
        let mut best = 0;
        for (idx, parse) in parses.iter().enumerate() {
            sum_p += 2f64.powf(parse.log_prob() - first.log_prob());
            if parse.f_score() > parses[best].f_score() {
                best = idx;
            }
        }
        let oracle = &parses[best];

        self.sum_log2_cond_prob_first -= sum_p.log2();
        let log2_cond_prob = oracle.log_prob() - (sum_p.log2() + first.log_prob());
        self.sum_log2_cond_prob_oracle += log2_cond_prob;
        self.oracle.n_test += oracle.n_edges();
        self.oracle.n_common += oracle.n_correct();
        if oracle.n_edges() == oracle.n_correct() {
            self.n_exact_match += 1;
        }

        Some(format!(
            " {}\t{}\t{}\t{}\t{}\t{}",
            self.n_sentences,
            gold_edges,
            oracle.n_edges(),
            oracle.n_correct(),
            oracle.f_score(),
            log2_cond_prob
        ))
    }

    fn write_summary(&self, write: &mut dyn Write) -> std::io::Result<()> {
        let n_sentences = self.n_sentences as f64;
        writeln!(
            write,
            "The corpus contains {} sentences, of which {} were parsed.",
            self.n_sentences, self.n_parsed
        )?;
        writeln!(
            write,
            "First parse {}, average log2 CP = {}.",
            self.first,
            self.sum_log2_cond_prob_first / n_sentences
        )?;
        writeln!(
            write,
            "Oracle {}, average log2 CP = {}.",
            self.oracle,
            self.sum_log2_cond_prob_oracle / n_sentences
        )?;
        writeln!(
            write,
            "{}/{} = {} sentences had an exact match parse.",
            self.n_exact_match,
            self.n_parsed,
            self.n_exact_match as f64 / self.n_parsed as f64
        )
    }
}

fn main() {
    let matches = build().get_matches();
    init_logging(matches.occurrences_of(VERBOSE));

    let nbest = open(matches.value_of(NBEST).or_exit("Missing n-best parses.", 1));
    let gold = open(matches.value_of(GOLD).or_exit("Missing gold trees.", 1));
    let reader = PairedReader::new(nbest, gold, Annotator::default());

    let output = Output::from(None::<String>);
    let mut writer = BufWriter::new(output.write().or_exit("Can't open stdout.", 1));
    let all = matches.is_present(ALL);
    if all {
        writeln!(writer, " sent no\tGold\tBest\tCorrect\tf-score\tlog2 CP")
            .or_exit("Can't write output.", 1);
    }

    let mut scores = OracleScores::default();
    for sentence in reader {
        let sentence = sentence.or_exit("Can't read sentence.", 1);
        if let Some(row) = scores.add(&sentence) {
            if all {
                writeln!(writer, "{}", row).or_exit("Can't write output.", 1);
            }
        }
    }
    scores
        .write_summary(&mut writer)
        .or_exit("Can't write output.", 1);
    writer.flush().or_exit("Can't write output.", 1);
}

fn open(path: &str) -> Box<dyn BufRead> {
    Box::new(BufReader::new(
        File::open(path).or_exit(format!("Can't open {}.", path), 1),
    ))
}

fn init_logging(verbosity: u64) {
    match verbosity {
        0 => (),
        1 => std::env::set_var("RUST_LOG", "info"),
        2 => std::env::set_var("RUST_LOG", "debug"),
        _ => std::env::set_var("RUST_LOG", "trace"),
    }
    env_logger::Builder::from_default_env().init();
}

static DEFAULT_CLAP_SETTINGS: &[AppSettings] = &[
    AppSettings::DontCollapseArgsInUsage,
    AppSettings::UnifiedHelpMessage,
];

static ALL: &str = "ALL";
static GOLD: &str = "GOLD";
static NBEST: &str = "NBEST";
static VERBOSE: &str = "VERBOSE";

fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("oracle-score")
        .settings(DEFAULT_CLAP_SETTINGS)
        .version("0.1")
        .about("Score the first and the best possible parse of n-best lists")
        .arg(
            Arg::with_name(ALL)
                .short("a")
                .long("all")
                .help("Print the scores of every sentence."),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Increase log verbosity."),
        )
        .arg(
            Arg::with_name(NBEST)
                .required(true)
                .index(1)
                .help("n-best parses."),
        )
        .arg(
            Arg::with_name(GOLD)
                .required(true)
                .index(2)
                .help("Gold trees."),
        )
}
