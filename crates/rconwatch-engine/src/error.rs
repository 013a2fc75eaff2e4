//! Error types for the engine layer.

/// Errors returned by [`EngineHandle`](crate::EngineHandle) calls.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine task has stopped and its command channel is closed.
    /// Also returned to manual-poll callers whose poll was dropped by a
    /// shutdown.
    #[error("status engine is unavailable")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        assert_eq!(
            EngineError::Unavailable.to_string(),
            "status engine is unavailable"
        );
    }
}
