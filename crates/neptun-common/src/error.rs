//! Error taxonomy for the driver boundary.

use thiserror::Error;

/// Failures reported by a [`crate::Driver`] implementation.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// A previously issued element id no longer matches a live node because
    /// the document was mutated since it was issued.
    #[error("stale element reference: {0}")]
    StaleReference(String),

    /// The query matched no element at the time of the call.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// The element exists but cannot currently receive the interaction
    /// (obscured, zero-sized, disabled at the platform level).
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// The underlying driver gave up waiting.
    #[error("driver timeout: {0}")]
    Timeout(String),

    /// The browser session is gone or refused the command.
    #[error("session error: {0}")]
    Session(String),

    /// The driver does not implement this capability.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl DriverError {
    /// Whether the failure class is expected to clear on a fresh resolve.
    ///
    /// Stale references, missing elements and transient non-interactability
    /// are absorbed by the interaction layer via re-resolution; session and
    /// capability errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DriverError::StaleReference(_)
                | DriverError::NoSuchElement(_)
                | DriverError::NotInteractable(_)
        )
    }
}
