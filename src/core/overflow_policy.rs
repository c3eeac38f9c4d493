//! Overflow policy for the async log queue
//!
//! When the queue is full, the policy decides whether the producer waits
//! for space or the new entry is discarded.

use super::error::LogdashError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Policy for handling a full queue
///
/// # Example
///
/// ```
/// use logdash::OverflowPolicy;
///
/// // Default behavior: never block the caller
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::Drop);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Discard the new entry and report [`LogdashError::Overflow`]
    ///
    /// The caller returns immediately; use this when latency matters more
    /// than completeness.
    #[default]
    Drop,

    /// Block the producer until space is available
    ///
    /// Warning: This applies backpressure to the application thread.
    Block,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Drop => write!(f, "Drop"),
            OverflowPolicy::Block => write!(f, "Block"),
        }
    }
}

/// Callback for failures that happen off the caller's thread
///
/// Receives overflow signals and terminal transport errors. The pipeline keeps
/// running after the callback returns.
pub type ErrorHandler = Arc<dyn Fn(&LogdashError) + Send + Sync>;
