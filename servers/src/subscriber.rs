//! # Tweet Subscriber
//!
//! Subscribes to a NATS subject and logs the author and text of every tweet.
//!
//! A corrupt payload or a lost connection is logged and ends the process with
//! status 1.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use stream_common::connections::{Broker, NatsBroker};
use stream_common::core::lifecycle::run_until_shutdown;
use stream_common::core::{Dispatcher, LogSummary};
use stream_common::PipelineError;

mod stream_logic;
use stream_logic::config::{print_version, SubscriberArgs};
use stream_logic::logger;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let args = SubscriberArgs::parse();
    if args.common.version {
        print_version();
        return Ok(ExitCode::SUCCESS);
    }
    logger::init("subscriber", &args.common)?;

    match run(args).await {
        Ok(()) => {
            log::info!("Subscriber stopped.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log::error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(args: SubscriberArgs) -> Result<(), PipelineError> {
    let config = args.into_config();

    let broker = NatsBroker::connect(&config.nats_server, &config.connect_options())
        .await
        .map_err(|source| PipelineError::Connect {
            address: config.nats_server.clone(),
            source,
        })?;
    let connection = broker.connection().clone();
    let broker: Arc<dyn Broker> = Arc::new(broker);

    let dispatcher = Dispatcher::new(broker, &config.subject, LogSummary);
    run_until_shutdown(dispatcher.run(), &connection).await
}
