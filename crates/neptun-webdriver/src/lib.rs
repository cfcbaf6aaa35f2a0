//! W3C WebDriver implementation of the engine's [`Driver`] trait.
//!
//! Connects to an already-running WebDriver endpoint (chromedriver,
//! geckodriver); launching and flag management belong to the caller. Element
//! ids are issued from a local registry that is wiped on every navigation
//! boundary, so a handle held across a navigation answers with a stale
//! reference even before the remote end would notice.

use std::collections::HashMap;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::Value;
use tracing::{debug, info};

use neptun_common::driver::Driver;
use neptun_common::error::DriverError;
use neptun_common::protocol::{ElementId, StrategyKind};

pub struct WebDriverSession {
    client: Client,
    elements: HashMap<ElementId, Element>,
    next_id: ElementId,
}

impl WebDriverSession {
    /// Connect to an external WebDriver endpoint.
    pub async fn connect(webdriver_url: &str) -> Result<Self, DriverError> {
        info!("Connecting to WebDriver at {}...", webdriver_url);
        let client = ClientBuilder::native()
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                DriverError::Session(format!("failed to connect to {webdriver_url}: {e}"))
            })?;
        Ok(Self {
            client,
            elements: HashMap::new(),
            next_id: 1,
        })
    }

    /// End the browser session.
    pub async fn close(self) -> Result<(), DriverError> {
        self.client
            .close()
            .await
            .map_err(|e| DriverError::Session(format!("failed to close session: {e}")))
    }

    fn invalidate_handles(&mut self) {
        debug!(count = self.elements.len(), "invalidating element handles");
        self.elements.clear();
    }

    fn element(&self, id: ElementId) -> Result<&Element, DriverError> {
        self.elements.get(&id).ok_or_else(|| {
            DriverError::StaleReference(format!("id {id} was invalidated by navigation"))
        })
    }

    fn register(&mut self, element: Element) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        self.elements.insert(id, element);
        id
    }
}

/// Map a WebDriver failure onto the engine's taxonomy. The wire error name
/// is only available through the display text, so classification is by
/// substring, mirroring how W3C error codes are spelled.
fn classify(message: String) -> DriverError {
    let lower = message.to_lowercase();
    if lower.contains("stale element") {
        DriverError::StaleReference(message)
    } else if lower.contains("no such element") {
        DriverError::NoSuchElement(message)
    } else if lower.contains("not interactable") || lower.contains("click intercepted") {
        DriverError::NotInteractable(message)
    } else if lower.contains("timeout") {
        DriverError::Timeout(message)
    } else {
        DriverError::Session(message)
    }
}

fn map_err(e: fantoccini::error::CmdError) -> DriverError {
    classify(e.to_string())
}

/// XPath rendering of a text-contains strategy. Quotes in the needle are
/// dropped rather than escaped; XPath 1.0 has no escape syntax and the
/// catalog's needles are short literals.
fn text_contains_xpath(needle: &str) -> String {
    let needle: String = needle.chars().filter(|c| *c != '"').collect();
    format!("//*[contains(normalize-space(.), \"{needle}\")]")
}

#[async_trait]
impl Driver for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.invalidate_handles();
        info!("Navigating to: {}", url);
        self.client.goto(url).await.map_err(map_err)
    }

    async fn back(&mut self) -> Result<(), DriverError> {
        self.invalidate_handles();
        self.client.back().await.map_err(map_err)
    }

    async fn find_all(
        &mut self,
        kind: StrategyKind,
        expression: &str,
    ) -> Result<Vec<ElementId>, DriverError> {
        let rendered;
        let locator = match kind {
            StrategyKind::Css => Locator::Css(expression),
            StrategyKind::XPath => Locator::XPath(expression),
            StrategyKind::TextContains => {
                rendered = text_contains_xpath(expression);
                Locator::XPath(&rendered)
            }
        };
        let found = self.client.find_all(locator).await.map_err(map_err)?;
        Ok(found.into_iter().map(|e| self.register(e)).collect())
    }

    async fn click(&mut self, id: ElementId) -> Result<(), DriverError> {
        self.element(id)?.click().await.map_err(map_err)
    }

    async fn text(&mut self, id: ElementId) -> Result<String, DriverError> {
        self.element(id)?.text().await.map_err(map_err)
    }

    async fn attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.element(id)?.attr(name).await.map_err(map_err)
    }

    async fn send_keys(&mut self, id: ElementId, text: &str) -> Result<(), DriverError> {
        self.element(id)?.send_keys(text).await.map_err(map_err)
    }

    async fn clear(&mut self, id: ElementId) -> Result<(), DriverError> {
        self.element(id)?.clear().await.map_err(map_err)
    }

    async fn is_displayed(&mut self, id: ElementId) -> Result<bool, DriverError> {
        self.element(id)?.is_displayed().await.map_err(map_err)
    }

    async fn is_enabled(&mut self, id: ElementId) -> Result<bool, DriverError> {
        self.element(id)?.is_enabled().await.map_err(map_err)
    }

    async fn scroll_into_view(&mut self, id: ElementId) -> Result<(), DriverError> {
        let element = self.element(id)?.clone();
        let arg = serde_json::to_value(&element)
            .map_err(|e| DriverError::Session(format!("element not serializable: {e}")))?;
        self.client
            .execute("arguments[0].scrollIntoView({block: 'center'});", vec![arg])
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn execute_script(
        &mut self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, DriverError> {
        self.client.execute(script, args).await.map_err(map_err)
    }
}
