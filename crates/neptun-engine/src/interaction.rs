//! Retrying element operations built on the resolver.
//!
//! Every attempt resolves fresh handles; nothing is cached across a
//! navigation boundary. Recoverable failures (stale reference, transient
//! non-interactability, resolution misses) are absorbed with linear backoff
//! up to the configured attempt budget, then propagated with full context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use neptun_common::driver::Driver;
use neptun_common::error::DriverError;
use neptun_common::protocol::{ElementId, EventType, StrategyKind, TelemetryEvent};
use neptun_common::sink::EventSink;

use crate::resolver::{ElementResolver, ResolveError};
use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum InteractError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("index {index} out of range for '{name}' ({len} elements)")]
    IndexOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },

    #[error("element '{name}' has no text but text is required")]
    MissingText { name: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl InteractError {
    /// Whether a fresh resolve on the next attempt can clear the failure.
    /// Index errors are caller bugs and are never retried.
    fn is_retryable(&self) -> bool {
        match self {
            InteractError::Resolve(ResolveError::ElementNotFound { .. }) => true,
            InteractError::Resolve(_) => false,
            InteractError::Driver(e) => e.is_recoverable(),
            InteractError::IndexOutOfRange { .. } => false,
            InteractError::MissingText { .. } => false,
        }
    }
}

/// Performs click / type / read operations through the resolver, adding
/// retry-with-backoff, stale-handle recovery, and indexed disambiguation
/// among repeated elements.
pub struct InteractionController {
    resolver: ElementResolver,
    policy: RetryPolicy,
    click_wait: Duration,
    default_timeout: Duration,
    sink: Arc<dyn EventSink>,
    session_id: String,
}

impl InteractionController {
    pub fn new(
        resolver: ElementResolver,
        policy: RetryPolicy,
        click_wait: Duration,
        default_timeout: Duration,
        sink: Arc<dyn EventSink>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            policy,
            click_wait,
            default_timeout,
            sink,
            session_id: session_id.into(),
        }
    }

    pub fn resolver(&self) -> &ElementResolver {
        &self.resolver
    }

    /// Click a single element, retrying recoverable failures with linear
    /// backoff. Each attempt resolves a fresh handle.
    pub async fn click<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        retries: u32,
        timeout: Duration,
    ) -> Result<(), InteractError> {
        let started = Instant::now();
        let attempts = retries.max(1);
        let mut attempt = 1u32;
        loop {
            let outcome: Result<StrategyKind, InteractError> = async {
                let handle = self.resolver.resolve(driver, name, timeout).await?;
                self.prepare_click(driver, handle.id).await?;
                driver.click(handle.id).await?;
                Ok(handle.strategy_used)
            }
            .await;

            match outcome {
                Ok(strategy) => {
                    self.emit(EventType::Click, name, Some(strategy), attempt, started, true, None);
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.policy.delay_after(attempt);
                    debug!(element = name, attempt, error = %e, "click retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.emit(
                        EventType::Click,
                        name,
                        None,
                        attempt,
                        started,
                        false,
                        Some(e.to_string()),
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Resolve the full homogeneous collection for `name` and click the
    /// element at the caller's 1-based `index`.
    ///
    /// An out-of-range index fails immediately, without a single sleep.
    /// Recoverable click failures re-resolve the whole collection on the
    /// next attempt; a stale member of an old collection is never reused.
    pub async fn click_at_index<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        index: usize,
        retries: u32,
        timeout: Duration,
    ) -> Result<(), InteractError> {
        let started = Instant::now();
        let attempts = retries.max(1);
        let mut attempt = 1u32;
        loop {
            let set = match self.resolver.resolve_all(driver, name, timeout).await {
                Ok(set) => set,
                Err(e) => {
                    let e = InteractError::from(e);
                    if e.is_retryable() && attempt < attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    self.emit(
                        EventType::Click,
                        name,
                        None,
                        attempt,
                        started,
                        false,
                        Some(e.to_string()),
                    );
                    return Err(e);
                }
            };

            if index < 1 || index > set.ids.len() {
                let e = InteractError::IndexOutOfRange {
                    name: name.to_string(),
                    index,
                    len: set.ids.len(),
                };
                self.emit(
                    EventType::Click,
                    name,
                    Some(set.strategy_used),
                    attempt,
                    started,
                    false,
                    Some(e.to_string()),
                );
                return Err(e);
            }

            let id = set.ids[index - 1];
            let outcome: Result<(), InteractError> = async {
                self.prepare_click(driver, id).await?;
                driver.click(id).await?;
                Ok(())
            }
            .await;

            match outcome {
                Ok(()) => {
                    self.emit(
                        EventType::Click,
                        name,
                        Some(set.strategy_used),
                        attempt,
                        started,
                        true,
                        Some(format!("index {index} of {}", set.ids.len())),
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    debug!(element = name, index, attempt, error = %e, "indexed click retry");
                    tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.emit(
                        EventType::Click,
                        name,
                        Some(set.strategy_used),
                        attempt,
                        started,
                        false,
                        Some(e.to_string()),
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Type text into an element, optionally clearing it first.
    pub async fn type_text<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        text: &str,
        clear_first: bool,
    ) -> Result<(), InteractError> {
        let started = Instant::now();
        let mut attempt = 1u32;
        loop {
            let outcome: Result<StrategyKind, InteractError> = async {
                let handle = self
                    .resolver
                    .resolve(driver, name, self.default_timeout)
                    .await?;
                if clear_first {
                    driver.clear(handle.id).await?;
                }
                driver.send_keys(handle.id, text).await?;
                Ok(handle.strategy_used)
            }
            .await;

            match outcome {
                Ok(strategy) => {
                    self.emit(EventType::Type, name, Some(strategy), attempt, started, true, None);
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.emit(
                        EventType::Type,
                        name,
                        None,
                        attempt,
                        started,
                        false,
                        Some(e.to_string()),
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Read an element's trimmed text. With `required = false` a missing
    /// element or empty text is `Ok(None)`; with `required = true` both are
    /// errors.
    pub async fn read_text<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        required: bool,
    ) -> Result<Option<String>, InteractError> {
        let started = Instant::now();
        let resolved = self
            .resolver
            .resolve(driver, name, self.default_timeout)
            .await;
        let handle = match resolved {
            Ok(handle) => handle,
            Err(e @ ResolveError::ElementNotFound { .. }) if !required => {
                self.emit(EventType::Read, name, None, 1, started, true, Some(e.to_string()));
                return Ok(None);
            }
            Err(e) => {
                self.emit(EventType::Read, name, None, 1, started, false, Some(e.to_string()));
                return Err(e.into());
            }
        };

        let text = driver.text(handle.id).await?;
        let text = text.trim().to_string();
        let success = !(required && text.is_empty());
        self.emit(
            EventType::Read,
            name,
            Some(handle.strategy_used),
            1,
            started,
            success,
            None,
        );
        if text.is_empty() {
            if required {
                return Err(InteractError::MissingText {
                    name: name.to_string(),
                });
            }
            return Ok(None);
        }
        Ok(Some(text))
    }

    /// Whether the element can be resolved and is currently displayed.
    pub async fn is_visible<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        timeout: Duration,
    ) -> Result<bool, InteractError> {
        let started = Instant::now();
        match self.resolver.resolve(driver, name, timeout).await {
            Ok(handle) => {
                let displayed = match driver.is_displayed(handle.id).await {
                    Ok(d) => d,
                    Err(e) if e.is_recoverable() => false,
                    Err(e) => return Err(e.into()),
                };
                self.emit(
                    EventType::Visibility,
                    name,
                    Some(handle.strategy_used),
                    1,
                    started,
                    displayed,
                    None,
                );
                Ok(displayed)
            }
            Err(ResolveError::ElementNotFound { .. }) => {
                self.emit(EventType::Visibility, name, None, 1, started, false, None);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read an attribute off every element in the collection, paired with
    /// its text, in document order. One fresh resolution per call.
    pub async fn read_collection<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        attribute: &str,
        timeout: Duration,
    ) -> Result<Vec<(ElementId, String, Option<String>)>, InteractError> {
        let set = self.resolver.resolve_all(driver, name, timeout).await?;
        let mut out = Vec::with_capacity(set.ids.len());
        for id in set.ids {
            let text = driver.text(id).await?;
            let attr = driver.attribute(id, attribute).await?;
            out.push((id, text, attr));
        }
        Ok(out)
    }

    /// Scroll the target into the viewport center, then apply a brief
    /// clickability wait.
    async fn prepare_click<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        id: ElementId,
    ) -> Result<(), DriverError> {
        driver.scroll_into_view(id).await?;

        let deadline = Instant::now() + self.click_wait;
        loop {
            let clickable = driver.is_displayed(id).await? && driver.is_enabled(id).await?;
            if clickable {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("element never became clickable within {:?}", self.click_wait);
                return Err(DriverError::NotInteractable(
                    "clickability wait expired".into(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(25).min(self.click_wait)).await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        event_type: EventType,
        name: &str,
        strategy: Option<StrategyKind>,
        attempt: u32,
        started: Instant,
        success: bool,
        details: Option<String>,
    ) {
        self.sink.event(TelemetryEvent {
            session_id: self.session_id.clone(),
            event_type,
            element_name: Some(name.to_string()),
            strategy_used: strategy,
            attempt_number: Some(attempt),
            duration_ms: started.elapsed().as_millis() as u64,
            success,
            details,
        });
    }
}
