/// Errors surfaced by the appender core.
///
/// Nothing here is fatal to the hosting process and nothing propagates to a
/// producer thread calling `append`; scheduling failures are logged and the
/// affected entries stay buffered for the next trigger.
#[derive(Debug, thiserror::Error)]
pub enum AppenderError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool had no capacity for another flush.
    #[error("worker pool saturated, flush skipped")]
    PoolSaturated,

    /// The worker pool is shutting down and no longer accepts work.
    #[error("worker pool closed")]
    PoolClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppenderError::InvalidConfig("threshold must be > 0".to_string());
        assert_eq!(
            error.to_string(),
            "invalid configuration: threshold must be > 0"
        );
    }

    #[test]
    fn test_all_error_variants() {
        let _e1 = AppenderError::InvalidConfig("test".into());
        let _e2 = AppenderError::PoolSaturated;
        let _e3 = AppenderError::PoolClosed;
    }
}
