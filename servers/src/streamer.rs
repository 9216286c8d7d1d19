//! # Tweet Streamer
//!
//! Polls the home timeline (or, without credentials, generates phony tweets)
//! and publishes every event to a NATS subject.
//!
//! A fatal pipeline error is logged and ends the process with status 1.
//! `CTRL+C` and `SIGTERM` stop it cleanly.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use stream_common::connections::{Broker, NatsBroker};
use stream_common::core::lifecycle::{run_until_shutdown, stream};
use stream_common::ingestors::EventSource;
use stream_common::PipelineError;

mod stream_logic;
use stream_logic::config::{print_version, StreamerArgs};
use stream_logic::logger;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // --- Phase 1: Environment, flags and logging ---
    let _ = dotenvy::dotenv();
    let args = StreamerArgs::parse();
    if args.common.version {
        print_version();
        return Ok(ExitCode::SUCCESS);
    }
    logger::init("streamer", &args.common)?;

    // --- Phase 2: Run until failure or shutdown ---
    match run(args).await {
        Ok(()) => {
            log::info!("Streamer stopped.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log::error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(args: StreamerArgs) -> Result<(), PipelineError> {
    let config = args.into_config();

    let source = EventSource::from_config(&config)?;
    log::info!("Event source: {}", source.kind());

    let broker = NatsBroker::connect(&config.nats_server, &config.connect_options())
        .await
        .map_err(|e| PipelineError::Connect {
            address: config.nats_server.clone(),
            source: e,
        })?;
    let connection = broker.connection().clone();
    let broker: Arc<dyn Broker> = Arc::new(broker);

    run_until_shutdown(
        stream(source, broker, &config.subject, config.relay_capacity()),
        &connection,
    )
    .await
}
