use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use clap::{App, AppSettings, Arg, ArgMatches};
use log::info;
use stdinout::{OrExit, Output};

use reranker::{Annotator, Config, FeatureClasses, Language, PairedReader};

fn main() {
    let matches = build().get_matches();
    let config = config(&matches);
    // the feature trace of debug levels > 0 is logged at trace level
    let verbosity = if config.traces_features() {
        3
    } else {
        matches.occurrences_of(VERBOSE)
    };
    init_logging(verbosity);

    let annotator = Annotator::new(config.get_language(), config.lowercases());
    let files = matches.values_of(FILES).or_exit("Missing corpus files.", 1);
    let files = files.collect::<Vec<_>>();
    if files.len() % 3 != 0 {
        eprintln!(
            "Expected triples of n-best, gold and output files, got {} files.",
            files.len()
        );
        std::process::exit(1);
    }

    let mut features = FeatureClasses::default();
    if let Some(path) = matches.value_of(FEATURE_IDS) {
        let read = open(path);
        features
            .read_feature_ids(read)
            .or_exit("Can't read feature ids.", 1);
    } else {
        let min_count = matches
            .value_of(MIN_COUNT)
            .or_exit("Missing minimum count.", 1)
            .parse::<usize>()
            .or_exit("Can't parse minimum count.", 1);
        let training = paired_reader(files[0], files[1], annotator.clone());
        features
            .extract_corpus(training, &config)
            .or_exit("Can't extract features.", 1);

        let stdout = Output::from(None::<String>);
        let mut writer = BufWriter::new(stdout.write().or_exit("Can't open stdout.", 1));
        if matches.is_present(COUNTS_ONLY) {
            features
                .write_feature_ids(&mut writer)
                .or_exit("Can't write feature counts.", 1);
            return;
        }

        let n_features = features.prune_and_renumber(min_count, 0);
        info!("{} features with count >= {}", n_features, min_count);
        features
            .write_feature_ids(&mut writer)
            .or_exit("Can't write feature ids.", 1);
        writer.flush().or_exit("Can't write feature ids.", 1);
    }

    for triple in files.chunks(3) {
        let mut reader = paired_reader(triple[0], triple[1], annotator.clone());
        let n_sentences = reader
            .n_sentences()
            .or_exit("Can't read number of sentences.", 1);
        let output = Output::from(Some(triple[2].to_owned()));
        let mut writer = BufWriter::new(output.write().or_exit("Can't open output file.", 1));
        features
            .write_features(n_sentences, reader, &config, &mut writer)
            .or_exit("Can't write feature values.", 1);
        writer.flush().or_exit("Can't write feature values.", 1);
        info!("Wrote feature values of {} sentences to {}", n_sentences, triple[2]);
    }
}

fn open(path: &str) -> Box<dyn BufRead> {
    Box::new(BufReader::new(
        File::open(path).or_exit(format!("Can't open {}.", path), 1),
    ))
}

fn paired_reader(
    nbest: &str,
    gold: &str,
    annotator: Annotator,
) -> PairedReader<Box<dyn BufRead>, Box<dyn BufRead>> {
    PairedReader::new(open(nbest), open(gold), annotator)
}

fn config(matches: &ArgMatches) -> Config {
    let language = matches
        .value_of(LANGUAGE)
        .map(Language::try_from_str)
        .unwrap_or(Ok(Language::English))
        .or_exit("Can't read language.", 1);
    let debug_level = matches
        .value_of(DEBUG)
        .map(str::parse::<usize>)
        .unwrap_or(Ok(0))
        .or_exit("Can't parse debug level.", 1);
    Config::default()
        .absolute_counts(matches.is_present(ABSOLUTE))
        .collect_correct(matches.is_present(CORRECT))
        .collect_incorrect(matches.is_present(INCORRECT))
        .lowercase(matches.is_present(LOWERCASE))
        .debug_level(debug_level)
        .language(language)
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

static ABSOLUTE: &str = "ABSOLUTE";
static CORRECT: &str = "CORRECT";
static COUNTS_ONLY: &str = "COUNTS_ONLY";
static DEBUG: &str = "DEBUG";
static FEATURE_IDS: &str = "FEATURE_IDS";
static FILES: &str = "FILES";
static INCORRECT: &str = "INCORRECT";
static LANGUAGE: &str = "LANGUAGE";
static LOWERCASE: &str = "LOWERCASE";
static MIN_COUNT: &str = "MIN_COUNT";
static VERBOSE: &str = "VERBOSE";

fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("extract-spfeatures")
        .settings(DEFAULT_CLAP_SETTINGS)
        .version("0.1")
        .about("Extract reranker features from n-best parses and gold trees")
        .arg(
            Arg::with_name(ABSOLUTE)
                .short("a")
                .long("absolute")
                .help("Write absolute feature counts instead of counts relative to the other parses."),
        )
        .arg(
            Arg::with_name(CORRECT)
                .short("c")
                .long("correct")
                .help("Collect features from the best parse."),
        )
        .arg(
            Arg::with_name(INCORRECT)
                .short("i")
                .long("incorrect")
                .help("Collect features from the other parses."),
        )
        .arg(
            Arg::with_name(LOWERCASE)
                .short("l")
                .long("lowercase")
                .help("Lowercase words when reading trees."),
        )
        .arg(
            Arg::with_name(DEBUG)
                .short("d")
                .long("debug")
                .takes_value(true)
                .help("Debug level, levels > 0 trace the features of the best parses."),
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
            Arg::with_name(MIN_COUNT)
                .long("mincount")
                .takes_value(true)
                .default_value("5")
                .help("Discard features occurring in fewer sentences."),
        )
        .arg(
            Arg::with_name(COUNTS_ONLY)
                .long("counts-only")
                .conflicts_with(FEATURE_IDS)
                .help("Write the feature counts of the training corpus and stop."),
        )
        .arg(
            Arg::with_name(FEATURE_IDS)
                .long("feature-ids")
                .takes_value(true)
                .help("Read feature ids instead of extracting them from the training corpus."),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Increase log verbosity."),
        )
        .arg(
            Arg::with_name(FILES)
                .multiple(true)
                .required(true)
                .help("Triples of n-best, gold and output files. Features are extracted from the first triple."),
        )
}
