use anyhow::{Context, Result};
use clap::Parser;
use octagram_core::{encoding, GramDb, GRAMMAR_DEFAULT_LANGUAGE, GRAM_DB_TYPE};
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Build `<language>.gram` in the current directory from whitespace
/// separated `key frequency` pairs read on stdin.
#[derive(Parser)]
#[command(name = "build_grammar")]
struct Args {
    /// Target language
    #[arg(default_value = GRAMMAR_DEFAULT_LANGUAGE)]
    language: String,
}

/// Parse `key frequency` pairs, encode the keys and sort by encoded bytes.
fn parse_pairs(input: &str) -> Result<Vec<(Vec<u8>, f64)>> {
    let mut tokens = input.split_whitespace();
    let mut data = Vec::new();
    while let Some(key) = tokens.next() {
        let value = tokens
            .next()
            .with_context(|| format!("missing frequency for key {}", key))?;
        let frequency: f64 = value
            .parse()
            .with_context(|| format!("invalid frequency {:?} for key {}", value, key))?;
        data.push((encoding::encode(key), frequency));
    }
    data.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(data)
}

fn run(args: &Args) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("reading stdin")?;
    let data = parse_pairs(&input)?;

    let mut db = GramDb::new(GRAM_DB_TYPE.file_name(&args.language));
    let file_name = db.file_name().display().to_string();
    info!("creating {}", file_name);
    db.build(&data)
        .with_context(|| format!("failed to build {}", file_name))?;
    db.save()
        .with_context(|| format!("failed to save {}", file_name))?;
    info!("created: {} ({} entries)", file_name, data.len());
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    info!("building grammar for language: {}", args.language);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
