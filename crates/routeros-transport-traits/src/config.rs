//! Transport configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for sentence size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum size of a single received sentence in bytes.
    /// `None` = unlimited
    pub max_sentence_size: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sentence_size: Some(16 * 1024 * 1024), // 16MB
        }
    }
}

/// Configuration for connection timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection establishment timeout.
    pub connect: Duration,

    /// Upper bound for a single socket write.
    /// `None` = no timeout
    pub write: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            write: Some(Duration::from_secs(30)),
        }
    }
}
