use std::time::Duration;

/// Configuration for a [`LocalGroup`](crate::LocalGroup).
///
/// All fields have sensible defaults. Use the builder pattern:
///
/// ```rust
/// use std::time::Duration;
/// use guess_transport::GroupConfig;
///
/// let config = GroupConfig::new()
///     .event_buffer(64)
///     .state_transfer_timeout(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Channel buffer size for each member's delivery events.
    pub(crate) event_buffer: usize,
    /// How long a joiner waits for a snapshot from an existing member.
    pub(crate) state_transfer_timeout: Duration,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupConfig {
    /// Create a new config with defaults.
    ///
    /// If the `GUESS_STATE_TRANSFER_TIMEOUT_MS` environment variable is set,
    /// it is used as the state transfer timeout. This can be overridden with
    /// [`.state_transfer_timeout()`](Self::state_transfer_timeout).
    pub fn new() -> Self {
        let state_transfer_timeout = std::env::var("GUESS_STATE_TRANSFER_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(5));

        Self {
            event_buffer: 256,
            state_transfer_timeout,
        }
    }

    /// Set the per-member event channel capacity (default: 256, minimum 1).
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Set the state transfer timeout (default: 5 s).
    pub fn state_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.state_transfer_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = GroupConfig::new()
            .event_buffer(8)
            .state_transfer_timeout(Duration::from_millis(250));
        assert_eq!(config.event_buffer, 8);
        assert_eq!(config.state_transfer_timeout, Duration::from_millis(250));
    }

    #[test]
    fn event_buffer_never_zero() {
        let config = GroupConfig::new().event_buffer(0);
        assert_eq!(config.event_buffer, 1);
    }
}
