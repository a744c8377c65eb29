use anyhow::Result;
use clap::{Arg, Command};
use tracing::info;

use yt_digest::parsers::sniff_format;
use yt_digest::{CaptionFormat, CaptionParser, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("yt_digest=info")
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("parse-captions")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse a saved caption payload into normalized segments")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Caption payload (JSON events, XML cues, WebVTT or watch page HTML)")
                .required(true)
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Payload format; detected from the content when omitted")
                .value_parser(["json", "xml", "vtt", "html"])
        )
        .get_matches();

    let path = matches.get_one::<String>("file").cloned().unwrap_or_default();
    let hint = matches
        .get_one::<String>("format")
        .map(|f| f.parse::<CaptionFormat>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let payload = tokio::fs::read_to_string(&path).await?;
    let config = Config::load().unwrap_or_else(|_| Config::from_env());
    let parser = CaptionParser::new(&config.parsing);

    info!(
        "📄 Parsing {} ({} bytes, hint: {}, detected: {})",
        path,
        payload.len(),
        hint.map(|f| f.to_string()).unwrap_or_else(|| "none".to_string()),
        sniff_format(&payload).map(|f| f.to_string()).unwrap_or_else(|| "unknown".to_string())
    );

    let segments = parser.parse(&payload, hint);
    info!("✅ {} segments", segments.len());
    println!("{}", serde_json::to_string_pretty(&segments)?);

    Ok(())
}
