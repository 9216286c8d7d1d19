#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};
use stream_common::configs::{
    resolve_nats_server, FeedCredentials, StreamerConfig, SubscriberConfig, DEFAULT_SUBJECT,
};
use stream_common::core::ReconnectPolicy;

/// Flags shared by both binaries.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[clap(long, help = "NATS server URL. The NATS_SERVER env var takes precedence. [default: nats://127.0.0.1:4222]")]
    pub nats_server: Option<String>,

    #[clap(long, default_value = DEFAULT_SUBJECT, help = "Subject to publish to or subscribe to.")]
    pub subj: String,

    #[clap(long, default_value_t = 1000, help = "Delay in milliseconds before each reconnect attempt.")]
    pub reconnect_wait_ms: u64,

    #[clap(long, default_value_t = 600, help = "Seconds to keep reconnecting before giving up.")]
    pub reconnect_window_secs: u64,

    #[clap(long, env = "TWEETSTREAM_LOG_LEVEL", default_value = "info", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: String,

    #[clap(long, env = "TWEETSTREAM_LOG_DIR", help = "Directory for log files. Logs go to stdout only when unset.")]
    pub log_dir: Option<PathBuf>,

    #[clap(short = 'V', long = "version", help = "Show version and exit.")]
    pub version: bool,
}

impl CommonArgs {
    pub fn nats_server(&self) -> String {
        resolve_nats_server(self.nats_server.as_deref())
    }

    pub fn reconnect(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_wait_ms),
            Duration::from_secs(self.reconnect_window_secs),
        )
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(about = "Publishes tweets from the home timeline, or phony ones, to NATS.", disable_version_flag = true)]
pub struct StreamerArgs {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[clap(long, env = "TWEETER_API_CONSUMER_KEY", hide_env_values = true, help = "Tweeter api consumer key.")]
    pub consumer_key: Option<String>,

    #[clap(long, env = "TWEETER_API_CONSUMER_KEY_SECRET", hide_env_values = true, help = "Tweeter api consumer key secret.")]
    pub consumer_key_secret: Option<String>,

    #[clap(long, env = "TWEETER_API_ACCESS_TOKEN", hide_env_values = true, help = "Tweeter api access token.")]
    pub access_token: Option<String>,

    #[clap(long, env = "TWEETER_API_ACCESS_TOKEN_SECRET", hide_env_values = true, help = "Tweeter api access token secret.")]
    pub access_token_secret: Option<String>,

    #[clap(long, default_value_t = 2, help = "How many tweets to request per poll.")]
    pub tweet_count: usize,
}

impl StreamerArgs {
    pub fn into_config(self) -> StreamerConfig {
        let credentials = FeedCredentials {
            consumer_key: self.consumer_key,
            consumer_key_secret: self.consumer_key_secret,
            access_token: self.access_token,
            access_token_secret: self.access_token_secret,
        };

        StreamerConfig::default()
            .with_nats_server(self.common.nats_server())
            .with_subject(self.common.subj.clone())
            .with_credentials(credentials)
            .with_tweet_count(self.tweet_count)
            .with_reconnect(self.common.reconnect())
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(about = "Subscribes to a NATS subject and logs every tweet received.", disable_version_flag = true)]
pub struct SubscriberArgs {
    #[clap(flatten)]
    pub common: CommonArgs,
}

impl SubscriberArgs {
    pub fn into_config(self) -> SubscriberConfig {
        SubscriberConfig::default()
            .with_nats_server(self.common.nats_server())
            .with_subject(self.common.subj.clone())
            .with_reconnect(self.common.reconnect())
    }
}

pub fn print_version() {
    println!("Version:  {}", env!("CARGO_PKG_VERSION"));
    println!("Revision: {}", option_env!("GIT_REVISION").unwrap_or("N/A"));
}
