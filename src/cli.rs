// Command line interface module
// Handles parsing of simulator arguments and piped playlist input

use crate::script::{Trigger, MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS};
use anyhow::{bail, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

/// slidesync - Keep a text source showing the name of the current slideshow image
///
/// Runs the sync script against a simulated host: a slideshow built from the
/// given images advances on a fixed cadence and every caption change is printed.
#[derive(Parser, Debug)]
#[command(name = "slidesync")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image files or directories (newline-separated paths can also be piped to stdin)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// What drives caption updates: slide change signals or polling
    #[arg(short, long, default_value = "signals", value_parser = parse_trigger)]
    pub trigger: Trigger,

    /// Poll interval in milliseconds (only with --trigger poll)
    #[arg(short, long, default_value = "200", value_parser = parse_interval)]
    pub interval: u64,

    /// How long each slide stays on screen, in milliseconds
    #[arg(short = 'd', long, default_value = "2000")]
    pub slide_ms: u64,

    /// Number of slide advances to simulate (defaults to one full pass)
    #[arg(short = 'n', long)]
    pub steps: Option<usize>,
}

/// Parsed arguments with resolved playlist input
#[derive(Debug)]
pub struct ParsedArgs {
    pub paths: Vec<PathBuf>,
    /// Playlist text read from a stdin pipe
    pub piped_list: Option<String>,
    pub trigger: Trigger,
    pub poll_interval: Duration,
    pub slide_duration: Duration,
    pub steps: Option<usize>,
}

/// Parse the trigger name
fn parse_trigger(s: &str) -> Result<Trigger, String> {
    match s {
        "signals" | "poll" => Ok(Trigger::from_setting(s)),
        _ => Err("Trigger must be 'signals' or 'poll'".to_string()),
    }
}

/// Parse the poll interval and ensure the script would accept it
fn parse_interval(s: &str) -> Result<u64, String> {
    let ms: u64 = s.parse().map_err(|_| "Invalid interval value")?;
    if !(MIN_POLL_INTERVAL_MS as u64..=MAX_POLL_INTERVAL_MS as u64).contains(&ms) {
        return Err(format!(
            "Interval must be between {} and {} ms",
            MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS
        ));
    }
    Ok(ms)
}

/// Check if stdin has data available (is a pipe)
fn stdin_has_data() -> bool {
    !atty::is(atty::Stream::Stdin)
}

/// Read the piped playlist from stdin
fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Parse command line arguments and handle stdin input
pub fn parse_args() -> Result<ParsedArgs> {
    let args = Args::parse();
    resolve(args)
}

fn resolve(args: Args) -> Result<ParsedArgs> {
    let piped_list = if stdin_has_data() {
        Some(read_stdin()?).filter(|list| !list.trim().is_empty())
    } else {
        None
    };

    if args.paths.is_empty() && piped_list.is_none() {
        bail!(
            "No images provided. Please provide image paths or pipe a list of paths to stdin.\n\
             Usage: slidesync <PATH>... [OPTIONS]\n\
             Or:    ls *.jpg | slidesync [OPTIONS]"
        );
    }
    if args.slide_ms == 0 {
        bail!("Slide duration must be greater than zero");
    }

    Ok(ParsedArgs {
        paths: args.paths,
        piped_list,
        trigger: args.trigger,
        poll_interval: Duration::from_millis(args.interval),
        slide_duration: Duration::from_millis(args.slide_ms),
        steps: args.steps,
    })
}
