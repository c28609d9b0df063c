use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use bigram_segment::{Search, Segmenter, DEFAULT_LIMIT};
use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{debug, info};

const DEFAULT_PATH: &str = "data";
const DEFAULT_MODEL: &str = "twitter";

#[derive(Parser, Debug)]
#[command(
    name = "segment",
    version,
    about = "Split unbroken text read from stdin into its most probable words"
)]
struct Cli {
    /// Directory containing the models
    #[arg(long, value_name = "DIR", default_value = DEFAULT_PATH)]
    path: PathBuf,

    /// Name of the model directory inside `--path`
    #[arg(long, value_name = "NAME", default_value = DEFAULT_MODEL)]
    model: String,

    /// Maximum word length, in Unicode code points
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_LIMIT,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max: usize,

    /// Append the log2 probability of the segmentation as a third column
    #[arg(long)]
    score: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q)
    #[arg(short = 'q', long, action = ArgAction::Count)]
    quiet: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let start = Instant::now();
    let segmenter = Segmenter::from_model_dir(&cli.path, &cli.model, cli.max);
    info!(
        "loaded model {:?} from {:?} ({} unigrams, {} bigrams) in {:.3}s",
        cli.model,
        cli.path,
        segmenter.unigrams().len(),
        segmenter.bigrams().len(),
        start.elapsed().as_secs_f64()
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    run(&segmenter, stdin.lock(), stdout.lock(), cli.score)
}

/// Write each line of `input` to `output`, followed by a tab and its segmentation
fn run(
    segmenter: &Segmenter,
    mut input: impl BufRead,
    mut output: impl Write,
    score: bool,
) -> Result<()> {
    let mut search = Search::default();
    let mut buf = Vec::new();
    let mut lines = 0;
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).context("failed to read input")? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(trim_newline(&buf));
        let words = segmenter.segment(&line, &mut search);
        let log_prob = words.score();
        let words = words.collect::<Vec<_>>().join(" ");
        let written = match score {
            true => writeln!(output, "{}\t{}\t{}", line, words, log_prob),
            false => writeln!(output, "{}\t{}", line, words),
        };
        written.context("failed to write output")?;
        lines += 1;
    }

    output.flush().context("failed to write output")?;
    debug!("segmented {} lines", lines);
    Ok(())
}

fn trim_newline(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
    }
    line
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = match (quiet, verbose) {
        (0, 0) => LevelFilter::Warn,
        (0, 1) => LevelFilter::Info,
        (0, 2) => LevelFilter::Debug,
        (0, _) => LevelFilter::Trace,
        _ => LevelFilter::Error,
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}
