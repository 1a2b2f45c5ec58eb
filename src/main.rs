//! ndjview - Streaming NDJSON Log Viewer
//!
//! Views newline-delimited JSON logs from a file or an HTTP endpoint while they load.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ndjview::render::ui::TerminalUI;
use ndjview::stream::open_source;
use ndjview::{Application, ViewerConfig};
use std::path::Path;

fn cli() -> Command {
    let command = Command::new("ndjview")
        .version(ndjview::VERSION)
        .about("A streaming terminal viewer for NDJSON logs")
        .long_about(
            "ndjview reads newline-delimited JSON logs from a file or an http(s) URL, shows \
             records as they arrive, and filters them in the background.",
        )
        .arg(
            Arg::new("source")
                .help("Path or http(s) URL of the NDJSON log")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("overscan")
                .long("overscan")
                .help("Rows rendered beyond each edge of the screen")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("buckets")
                .long("buckets")
                .help("Number of timeline histogram buckets")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("debounce-ms")
                .long("debounce-ms")
                .help("Quiet period before a typed filter is applied")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("no-follow")
                .long("no-follow")
                .help("Do not pin the view to the newest records")
                .action(ArgAction::SetTrue),
        );

    #[cfg(feature = "config")]
    let command = command.arg(
        Arg::new("config")
            .long("config")
            .help("Path to a TOML settings file")
            .value_parser(value_parser!(std::path::PathBuf)),
    );

    command
}

#[cfg(feature = "config")]
fn base_config(matches: &ArgMatches) -> Result<ViewerConfig> {
    let config = match matches.get_one::<std::path::PathBuf>("config") {
        Some(path) => ViewerConfig::load_from(path)?,
        None => ViewerConfig::load_default()?,
    };
    Ok(config)
}

#[cfg(not(feature = "config"))]
fn base_config(_matches: &ArgMatches) -> Result<ViewerConfig> {
    Ok(ViewerConfig::default())
}

fn resolve_config(matches: &ArgMatches) -> Result<ViewerConfig> {
    let mut config = base_config(matches)?;
    if let Some(&overscan) = matches.get_one::<usize>("overscan") {
        config.overscan = overscan;
    }
    if let Some(&buckets) = matches.get_one::<usize>("buckets") {
        config.timeline_buckets = buckets;
    }
    if let Some(&debounce) = matches.get_one::<u64>("debounce-ms") {
        config.search_debounce_ms = debounce;
    }
    if matches.get_flag("no-follow") {
        config.follow = false;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = cli().get_matches();
    let source = matches
        .get_one::<String>("source")
        .context("source argument is required")?;

    let is_url = source.starts_with("http://") || source.starts_with("https://");
    if !is_url {
        let path = Path::new(source);
        if !path.exists() {
            anyhow::bail!("File does not exist: {}", path.display());
        }
        if !path.is_file() {
            anyhow::bail!("Path is not a regular file: {}", path.display());
        }
    }

    let config = resolve_config(&matches)?;
    let source = open_source(source)?;

    let ui_renderer = Box::new(TerminalUI::new()?);
    let mut app = Application::new(source, ui_renderer, config)?;
    app.run().await?;

    Ok(())
}
