use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yt_digest::{Config, TranscriptPipeline, TranscriptSummarizer};

fn init_logging(config: &Config, verbose: bool) {
    let default_filter = if verbose {
        "yt_digest=debug,info".to_string()
    } else {
        format!("yt_digest={},warn", config.logging.level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("yt-digest")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Fetch a YouTube transcript through several sources and optionally summarize it")
        .arg(
            Arg::new("video")
                .value_name("URL|ID")
                .help("YouTube URL or bare video id")
                .required(true)
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .value_parser(["text", "json", "segments"])
                .default_value("text")
        )
        .arg(
            Arg::new("summarize")
                .short('s')
                .long("summarize")
                .help("Send the transcript to the configured LLM for a summary")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    let input = matches.get_one::<String>("video").cloned().unwrap_or_default();
    let format = matches.get_one::<String>("format").cloned().unwrap_or_else(|| "text".to_string());
    let summarize = matches.get_flag("summarize");
    let verbose = matches.get_flag("verbose");

    // Resolve configuration first; it is reported once logging is up
    let loaded = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&[PathBuf::from(path)]),
        None => Config::load_from(&Config::search_paths()),
    };
    init_logging(&loaded.config, verbose);
    loaded.log();
    if let (Some(path), None) = (matches.get_one::<String>("config"), &loaded.origin) {
        anyhow::bail!("could not load configuration file {}", path);
    }
    let config = loaded.config;
    config.validate()?;

    info!("🚀 yt-digest starting...");
    if verbose {
        info!("{}", config.summary());
    }

    let pipeline = TranscriptPipeline::new(&config)?;
    // No live page from the command line; the DOM source reports that and is skipped
    let fetched = pipeline.fetch(&input, None).await?;

    for failure in &fetched.outcome.failures {
        warn!("Skipped {}", failure);
    }
    info!(
        "📝 {} segments, {:.1}s of video, from '{}'",
        fetched.assembled.segment_count, fetched.assembled.duration_seconds, fetched.assembled.source
    );

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&fetched.assembled)?),
        "segments" => println!("{}", serde_json::to_string_pretty(&fetched.outcome.transcript)?),
        _ => println!("{}", fetched.assembled.full_text),
    }

    if summarize {
        let summarizer = TranscriptSummarizer::new(&config.llm)?;
        let summary = summarizer.summarize(&fetched.assembled.full_text).await?;
        println!("\n{}", summary);
    }

    Ok(())
}
