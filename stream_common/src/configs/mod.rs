//! # Configuration Modules
//!
//! Plain configuration structs built once at startup by the binaries and passed
//! into constructors. Nothing in the library reads flags or global state.

/// Credentials, connection options and per-binary settings.
pub mod config_stream;

pub use config_stream::{
    resolve_nats_server, resolve_nats_server_from, ConfigError, ConnectOptions, Credentials,
    FeedCredentials, StreamerConfig, SubscriberConfig, DEFAULT_NATS_SERVER, DEFAULT_SUBJECT,
    ENV_NATS_SERVER, PUBLISHER_NAME, SUBSCRIBER_NAME,
};
