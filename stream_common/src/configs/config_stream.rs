#![allow(missing_docs)]

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::core::connection_manager::ReconnectPolicy;

/// The broker address used when neither the environment nor a flag names one.
pub const DEFAULT_NATS_SERVER: &str = "nats://127.0.0.1:4222";
/// Environment variable that overrides the `--nats-server` flag.
pub const ENV_NATS_SERVER: &str = "NATS_SERVER";
/// Subject both roles use unless told otherwise.
pub const DEFAULT_SUBJECT: &str = "tweet";
/// Connection name announced by the streamer.
pub const PUBLISHER_NAME: &str = "Tweeter demo publisher";
/// Connection name announced by the subscriber.
pub const SUBSCRIBER_NAME: &str = "Tweet subscriber";

/// Configuration problems. Only absorbed ones exist today: the streamer falls
/// back to phony events when credentials are incomplete.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Incomplete feed credentials, missing: {}", .0.join(", "))]
    IncompleteCredentials(Vec<&'static str>),
}

/// The four OAuth 1.0a secrets, as collected from flags and environment.
/// Any of them may be missing.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct FeedCredentials {
    pub consumer_key: Option<String>,
    pub consumer_key_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

impl fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |v: &Option<String>| if present(v) { "<set>" } else { "<missing>" };
        f.debug_struct("FeedCredentials")
            .field("consumer_key", &mark(&self.consumer_key))
            .field("consumer_key_secret", &mark(&self.consumer_key_secret))
            .field("access_token", &mark(&self.access_token))
            .field("access_token_secret", &mark(&self.access_token_secret))
            .finish()
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl FeedCredentials {
    pub fn with_consumer_key(mut self, value: impl Into<String>) -> Self {
        self.consumer_key = Some(value.into());
        self
    }

    pub fn with_consumer_key_secret(mut self, value: impl Into<String>) -> Self {
        self.consumer_key_secret = Some(value.into());
        self
    }

    pub fn with_access_token(mut self, value: impl Into<String>) -> Self {
        self.access_token = Some(value.into());
        self
    }

    pub fn with_access_token_secret(mut self, value: impl Into<String>) -> Self {
        self.access_token_secret = Some(value.into());
        self
    }

    /// Fills every missing (or empty) field of `self` from `fallback`.
    pub fn merge(self, fallback: FeedCredentials) -> Self {
        let pick = |primary: Option<String>, secondary: Option<String>| {
            if present(&primary) {
                primary
            } else {
                secondary
            }
        };
        Self {
            consumer_key: pick(self.consumer_key, fallback.consumer_key),
            consumer_key_secret: pick(self.consumer_key_secret, fallback.consumer_key_secret),
            access_token: pick(self.access_token, fallback.access_token),
            access_token_secret: pick(self.access_token_secret, fallback.access_token_secret),
        }
    }

    /// Returns the usable credentials, or the names of the missing fields.
    /// Empty strings count as missing.
    pub fn complete(&self) -> Result<Credentials, ConfigError> {
        let missing: Vec<&'static str> = [
            ("consumer_key", &self.consumer_key),
            ("consumer_key_secret", &self.consumer_key_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ]
        .into_iter()
        .filter(|(_, value)| !present(value))
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::IncompleteCredentials(missing));
        }

        let take = |v: &Option<String>| v.clone().unwrap_or_default();
        Ok(Credentials {
            consumer_key: take(&self.consumer_key),
            consumer_secret: take(&self.consumer_key_secret),
            access_token: take(&self.access_token),
            access_token_secret: take(&self.access_token_secret),
        })
    }
}

/// A complete set of OAuth 1.0a secrets. `Debug` never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// How a role connects to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Connection name shown by the broker.
    pub name: String,
    pub reconnect: ReconnectPolicy,
}

impl ConnectOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Settings for the streamer binary.
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    pub nats_server: String,
    pub subject: String,
    pub credentials: FeedCredentials,
    /// Events requested per feed poll.
    pub tweet_count: usize,
    pub poll_interval: Duration,
    pub phony_interval: Duration,
    /// Relay queue slots. `None` sizes the queue to `tweet_count`.
    pub relay_capacity: Option<usize>,
    pub reconnect: ReconnectPolicy,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            nats_server: DEFAULT_NATS_SERVER.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            credentials: FeedCredentials::default(),
            tweet_count: 2,
            poll_interval: Duration::from_secs(2),
            phony_interval: Duration::from_secs(2),
            relay_capacity: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl StreamerConfig {
    pub fn with_nats_server(mut self, nats_server: impl Into<String>) -> Self {
        self.nats_server = nats_server.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_credentials(mut self, credentials: FeedCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_tweet_count(mut self, tweet_count: usize) -> Self {
        self.tweet_count = tweet_count;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_phony_interval(mut self, interval: Duration) -> Self {
        self.phony_interval = interval;
        self
    }

    pub fn with_relay_capacity(mut self, capacity: usize) -> Self {
        self.relay_capacity = Some(capacity);
        self
    }

    /// Slots in the relay queue, at least one.
    pub fn relay_capacity(&self) -> usize {
        self.relay_capacity.unwrap_or(self.tweet_count).max(1)
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(PUBLISHER_NAME).with_reconnect(self.reconnect.clone())
    }
}

/// Settings for the subscriber binary.
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub nats_server: String,
    pub subject: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            nats_server: DEFAULT_NATS_SERVER.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SubscriberConfig {
    pub fn with_nats_server(mut self, nats_server: impl Into<String>) -> Self {
        self.nats_server = nats_server.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(SUBSCRIBER_NAME).with_reconnect(self.reconnect.clone())
    }
}

/// Picks the broker address: a non-empty `env` value wins over the flag, and
/// the flag wins over the default.
pub fn resolve_nats_server_from(env: Option<String>, flag: Option<&str>) -> String {
    env.filter(|v| !v.is_empty())
        .or_else(|| flag.filter(|v| !v.is_empty()).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_NATS_SERVER.to_string())
}

/// `resolve_nats_server_from` reading `NATS_SERVER` from the process
/// environment.
pub fn resolve_nats_server(flag: Option<&str>) -> String {
    resolve_nats_server_from(std::env::var(ENV_NATS_SERVER).ok(), flag)
}
