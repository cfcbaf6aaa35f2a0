//! The browser/document driver boundary.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverError;
use crate::protocol::{ElementId, StrategyKind};

/// Single synchronous browser-session capability consumed by the engine.
///
/// Implementations issue [`ElementId`]s that are valid only until the next
/// navigation boundary (`navigate`, `back`, or any click that changes the
/// document). Callers must re-resolve rather than reuse ids across such a
/// boundary; drivers answer reuse with [`DriverError::StaleReference`].
#[async_trait]
pub trait Driver: Send + Sync {
    /// Load a URL, replacing the current document.
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Navigate back in session history, replacing the current document.
    async fn back(&mut self) -> Result<(), DriverError>;

    /// Find every element matching one locator expression, in document
    /// order. An empty vector is a normal "nothing there yet" answer, not
    /// an error.
    async fn find_all(
        &mut self,
        kind: StrategyKind,
        expression: &str,
    ) -> Result<Vec<ElementId>, DriverError>;

    async fn click(&mut self, id: ElementId) -> Result<(), DriverError>;

    /// Visible text content of the element, trimmed by the caller.
    async fn text(&mut self, id: ElementId) -> Result<String, DriverError>;

    async fn attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn send_keys(&mut self, id: ElementId, text: &str) -> Result<(), DriverError>;

    async fn clear(&mut self, id: ElementId) -> Result<(), DriverError>;

    async fn is_displayed(&mut self, id: ElementId) -> Result<bool, DriverError>;

    async fn is_enabled(&mut self, id: ElementId) -> Result<bool, DriverError>;

    /// Bring the element into the viewport center before interacting.
    async fn scroll_into_view(&mut self, _id: ElementId) -> Result<(), DriverError> {
        Ok(())
    }

    /// Run a script in the page context.
    async fn execute_script(
        &mut self,
        _script: &str,
        _args: Vec<Value>,
    ) -> Result<Value, DriverError> {
        Err(DriverError::NotSupported("execute_script".into()))
    }
}
