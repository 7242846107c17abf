use std::convert::Infallible;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures::{Stream, StreamExt, stream};
use responses_sse::{ClientConfig, Event, EventStream, ResponsesClient};
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "responses-sse", version, about = "Parse Responses API event streams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a captured SSE body, printing one JSON line per event
    Replay {
        /// Capture file, or `-` for stdin
        path: PathBuf,

        /// Bytes fed to the parser per chunk
        #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u64).range(1..))]
        chunk_size: u64,

        /// Stop after the `[DONE]` sentinel
        #[arg(long)]
        stop_at_done: bool,
    },
    /// Send a streaming request and print its events
    Stream {
        #[arg(long)]
        model: String,

        #[arg(long)]
        input: String,

        /// TOML config file; environment variables are used when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            path,
            chunk_size,
            stop_at_done,
        } => replay(path, usize::try_from(chunk_size)?, stop_at_done).await,
        Command::Stream {
            model,
            input,
            config,
        } => stream_request(model, input, config).await,
    }
}

async fn replay(path: PathBuf, chunk_size: usize, stop_at_done: bool) -> Result<()> {
    let body = read_capture(&path)?;
    info!("Replaying {} bytes in chunks of {}", body.len(), chunk_size);

    let chunks: Vec<Result<Bytes, Infallible>> = body
        .chunks(chunk_size)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();

    let events = EventStream::new(stream::iter(chunks)).stop_at_done(stop_at_done);
    let count = print_events(events).await?;

    info!("Replayed {} events", count);
    Ok(())
}

async fn stream_request(model: String, input: String, config: Option<PathBuf>) -> Result<()> {
    let config = match config {
        Some(path) => ClientConfig::from_file(&path.to_string_lossy())?,
        None => ClientConfig::from_env()?,
    };
    let client = ResponsesClient::new(config)?;

    let events = client
        .open_stream(json!({ "model": model, "input": input }))
        .await?
        .stop_at_done(true);

    tokio::select! {
        result = print_events(events) => {
            let count = result?;
            info!("Received {} events", count);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, closing stream");
        }
    }

    Ok(())
}

async fn print_events<S>(mut events: S) -> Result<usize>
where
    S: Stream<Item = responses_sse::Result<Event>> + Unpin,
{
    let mut count = 0;
    while let Some(event) = events.next().await {
        let event = event?;
        if event.is_degraded() {
            warn!(event = %event.name, "Event data is not valid JSON");
        }
        println!("{}", serde_json::to_string(&event)?);
        count += 1;
    }
    Ok(count)
}

fn read_capture(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read stdin")?;
        return Ok(body);
    }

    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
