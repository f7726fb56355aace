// slidesync - Keeps a text source showing the name of the current slideshow image
// Runs the sync script against a simulated host with a slideshow built from local images

mod app;
mod cli;
mod host;
mod playlist;
mod properties;
mod script;
mod settings;
mod sim;
mod sources;
mod sync;

use anyhow::Result;
use app::{AppState, TextChange};
use log::info;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = cli::parse_args()?;

    info!(
        "Starting slidesync with {} path(s), trigger: {}",
        args.paths.len() + usize::from(args.piped_list.is_some()),
        args.trigger.as_str()
    );

    // Build the playlist
    let files = playlist::load_playlist(&args)?;
    info!("Playlist loaded: {} image(s)", files.len());

    let steps = args.steps.unwrap_or(files.len());
    let mut app = AppState::new(
        &files,
        args.trigger,
        args.poll_interval,
        args.slide_duration,
    );
    app.run(steps, print_change);
    Ok(())
}

fn print_change(change: &TextChange) {
    println!(
        "[t={}ms] slide {}/{} -> {}",
        change.at.as_millis(),
        change.index + 1,
        change.count,
        change.text
    );
}
