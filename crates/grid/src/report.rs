//! Failure reporting.
//!
//! Persistence failures caught at a commit boundary are handed to an
//! `ErrorReporter` instead of being returned, so the view can show them
//! while the triggering operation is simply rejected.

use alloc::string::{String, ToString};
use stagehand_core::Error;

/// Topic of failures raised by the persistence layer.
pub const DATABASE_ERROR: &str = "error.database";

/// A failure raised to the host.
#[derive(Debug)]
pub struct Failure {
    pub topic: &'static str,
    pub message: String,
    pub error: Error,
}

impl Failure {
    /// A persistence failure, topic `error.database`.
    pub fn database(error: Error) -> Self {
        Self {
            topic: DATABASE_ERROR,
            message: error.to_string(),
            error,
        }
    }
}

/// Receives failures from grid models and detail editors.
pub trait ErrorReporter {
    fn report(&self, failure: Failure);
}

/// Reports failures as `tracing` error events.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, failure: Failure) {
        tracing::error!(
            topic = failure.topic,
            constraint = failure.error.is_constraint_violation(),
            "{}",
            failure.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_failure() {
        let failure = Failure::database(Error::null_constraint("name"));
        assert_eq!(failure.topic, "error.database");
        assert!(failure.message.contains("name"));
        LogReporter.report(failure);
    }
}
