#[macro_use]
extern crate failure;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use clap::{App, AppSettings, Arg};
use failure::Error;
use log::info;
use stdinout::{Input, OrExit, Output};

use reranker::io::{NBestReader, PTBFormat, WriteTree};
use reranker::{Annotator, Config, FeatureClasses, Language, Reranker, Sentence};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Best,
    Ranked,
    FeaturesDebug,
}

impl Mode {
    fn try_from_str(s: &str) -> Result<Mode, Error> {
        match s {
            "0" => Ok(Mode::Best),
            "1" => Ok(Mode::Ranked),
            "2" => Ok(Mode::FeaturesDebug),
            _ => Err(format_err!("Unknown mode: {}", s)),
        }
    }
}

fn main() {
    let matches = build().get_matches();
    init_logging(matches.occurrences_of(VERBOSE));

    let mode = matches
        .value_of(MODE)
        .map(Mode::try_from_str)
        .unwrap_or(Ok(Mode::Best))
        .or_exit("Can't read mode.", 1);
    let language = matches
        .value_of(LANGUAGE)
        .map(Language::try_from_str)
        .unwrap_or(Ok(Language::English))
        .or_exit("Can't read language.", 1);
    let config = Config::default()
        .absolute_counts(!matches.is_present(RELATIVE))
        .lowercase(matches.is_present(LOWERCASE))
        .language(language);
    let annotator = Annotator::new(config.get_language(), config.lowercases());

    let feature_ids = open(matches.value_of(FEATURE_IDS).or_exit("Missing feature ids.", 1));
    let weights = open(matches.value_of(WEIGHTS).or_exit("Missing weights.", 1));
    let reranker = Reranker::read(FeatureClasses::default(), feature_ids, weights, config)
        .or_exit("Can't read reranker model.", 1);
    info!(
        "Read {} features and {} weights",
        reranker.features().n_features(),
        reranker.weights().len()
    );

    let input = Input::from(matches.value_of(INPUT).map(ToOwned::to_owned));
    let reader = NBestReader::new(input.buf_read().or_exit("Can't open input.", 1));
    let output = Output::from(matches.value_of(OUTPUT).map(ToOwned::to_owned));
    let mut writer = BufWriter::new(output.write().or_exit("Can't open output.", 1));

    for list in reader {
        let list = list.or_exit("Can't read n-best parses.", 1);
        let sentence = Sentence::new(list.label, list.parses, None, &annotator)
            .or_exit("Can't construct sentence.", 1);
        write_sentence(&reranker, &sentence, mode, &mut writer)
            .or_exit("Can't write output.", 1);
    }
    writer.flush().or_exit("Can't write output.", 1);
}

fn write_sentence(
    reranker: &Reranker,
    sentence: &Sentence,
    mode: Mode,
    write: &mut dyn Write,
) -> Result<(), Error> {
    match mode {
        Mode::Best => {
            // sentences without parses get an empty line
            if let Some(parse) = reranker.best_parse(sentence)? {
                write!(write, "{}", PTBFormat::Plain.tree_to_string(parse.tree()))?;
            }
            writeln!(write)?;
            Ok(())
        }
        Mode::Ranked => reranker.write_ranked_trees(sentence, write),
        Mode::FeaturesDebug => reranker.write_features_debug(sentence, write),
    }
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

static FEATURE_IDS: &str = "FEATURE_IDS";
static INPUT: &str = "INPUT";
static LANGUAGE: &str = "LANGUAGE";
static LOWERCASE: &str = "LOWERCASE";
static MODE: &str = "MODE";
static OUTPUT: &str = "OUTPUT";
static RELATIVE: &str = "RELATIVE";
static VERBOSE: &str = "VERBOSE";
static WEIGHTS: &str = "WEIGHTS";

fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("best-parses")
        .settings(DEFAULT_CLAP_SETTINGS)
        .version("0.1")
        .about("Rerank n-best parses with feature weights")
        .arg(
            Arg::with_name(RELATIVE)
                .short("a")
                .long("relative")
                .help("Use feature counts relative to the other parses (slower)."),
        )
        .arg(
            Arg::with_name(LOWERCASE)
                .short("l")
                .long("lowercase")
                .help("Lowercase words when reading trees."),
        )
        .arg(
            Arg::with_name(MODE)
                .short("m")
                .long("mode")
                .takes_value(true)
                .possible_values(&["0", "1", "2"])
                .default_value("0")
                .help("0: best parse, 1: ranked parses, 2: feature values for debugging."),
        )
        .arg(
            Arg::with_name(LANGUAGE)
                .long("language")
                .takes_value(true)
                .possible_values(&["english", "german"])
                .default_value("english")
                .help("Language of the head rules."),
        )
        .arg(
            Arg::with_name(INPUT)
                .long("input_file")
                .takes_value(true)
                .help("n-best parses, standard input by default."),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long("output_file")
                .takes_value(true)
                .help("Output file, standard output by default."),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Increase log verbosity."),
        )
        .arg(
            Arg::with_name(FEATURE_IDS)
                .required(true)
                .index(1)
                .help("Feature ids."),
        )
        .arg(
            Arg::with_name(WEIGHTS)
                .required(true)
                .index(2)
                .help("Feature weights."),
        )
}
