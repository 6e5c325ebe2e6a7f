use std::time::Duration;

/// Balance polling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between balance queries
    pub interval: Duration,
    /// Give up after this long; `None` polls until the balance moves
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}
