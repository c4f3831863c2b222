//! Notification stream configuration.

use std::time::Duration;

use crate::reconnect::RetryPolicy;

/// Path segment replaced by the (percent-encoded) user id.
pub const USER_ID_PLACEHOLDER: &str = "{userId}";

/// Configuration for the notification stream connection.
///
/// Provides sensible defaults and chainable setter methods.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Backend origin, e.g. `https://portal.example.com`.
    pub base_url: String,
    /// Stream path template; `{userId}` is substituted per session.
    pub stream_path: String,
    /// Additional HTTP headers to include with every stream request.
    pub headers: http::HeaderMap,
    /// Bound on establishing the connection and receiving response headers.
    pub connect_timeout: Duration,
    /// Delay schedule between failed attempts.
    pub retry: RetryPolicy,
    /// Whether failures schedule another attempt.
    pub auto_reconnect: bool,
    /// Capacity of the command channel.
    pub command_channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            stream_path: format!("/api/notifications/stream/{USER_ID_PLACEHOLDER}"),
            headers: http::HeaderMap::new(),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            auto_reconnect: true,
            command_channel_capacity: 16,
        }
    }
}

impl StreamConfig {
    /// Create a new stream configuration for the given backend origin.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the stream path template.
    #[must_use]
    pub fn stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    /// Set additional HTTP headers.
    #[must_use]
    pub fn headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Shorthand for a fixed-interval reconnect policy.
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.retry = RetryPolicy::fixed(interval).max_attempts(self.retry.max_attempts);
        self
    }

    /// Enable or disable automatic reconnection.
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the command channel capacity.
    #[must_use]
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// Full stream URL for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error message if the base URL does not parse.
    pub fn stream_url(&self, user_id: &str) -> Result<url::Url, String> {
        expand_path(
            &self.base_url,
            &self.stream_path,
            USER_ID_PLACEHOLDER,
            Some(user_id),
        )
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }
        url::Url::parse(&self.base_url).map_err(|e| format!("Invalid base URL: {e}"))?;
        if !self.stream_path.starts_with('/') {
            return Err("Stream path must start with '/'".to_string());
        }
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be > 0".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("Command channel capacity must be > 0".to_string());
        }
        self.retry.validate()
    }
}

/// Resolve `template` against `base_url`, pushing `value` in place of any
/// segment equal to `placeholder`.
///
/// Segments go through [`url::PathSegmentsMut::push`], so `value` is
/// percent-encoded and cannot introduce extra path segments.
pub(crate) fn expand_path(
    base_url: &str,
    template: &str,
    placeholder: &str,
    value: Option<&str>,
) -> Result<url::Url, String> {
    let mut url = url::Url::parse(base_url).map_err(|e| format!("Invalid base URL: {e}"))?;
    url.path_segments_mut()
        .map_err(|()| format!("Base URL cannot carry a path: {base_url}"))?
        .clear()
        .extend(
            template
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(|segment| match value {
                    Some(value) if segment == placeholder => value,
                    _ => segment,
                }),
        );
    Ok(url)
}
