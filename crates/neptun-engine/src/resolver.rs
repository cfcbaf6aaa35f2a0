//! Resolution of logical element names to live element ids.
//!
//! Strategies are tried strictly in priority order. The caller's total
//! timeout is split evenly across the strategies present; each strategy
//! polls for presence for up to its own share before the next is tried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace};

use neptun_common::driver::Driver;
use neptun_common::error::DriverError;
use neptun_common::protocol::{ElementId, EventType, StrategyKind, TelemetryEvent};
use neptun_common::sink::EventSink;

use crate::catalog::{CatalogError, SelectorCatalog};

/// Transient, caller-owned reference to one live element.
///
/// Invalid the instant the document is mutated by navigation; never reuse
/// across such a boundary.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedHandle {
    pub id: ElementId,
    pub strategy_used: StrategyKind,
    pub resolved_at: Instant,
}

/// The full homogeneous collection matched by the first strategy that
/// yielded at least one result. Used when disambiguation by position
/// follows.
#[derive(Debug, Clone)]
pub struct ResolvedSet {
    pub ids: Vec<ElementId>,
    pub strategy_used: StrategyKind,
    pub resolved_at: Instant,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("element '{name}' not found; strategies tried: [{}]", attempted.join(", "))]
    ElementNotFound { name: String, attempted: Vec<String> },

    #[error("driver failure while resolving '{name}': {source}")]
    Driver { name: String, source: DriverError },
}

/// Resolves logical names through the catalog's fallback chains.
pub struct ElementResolver {
    catalog: Arc<SelectorCatalog>,
    sink: Arc<dyn EventSink>,
    session_id: String,
    poll_interval: Duration,
}

/// Even split of the caller's budget: `max(1ms, timeout / strategy_count)`.
/// The sum of shares never exceeds the original timeout (for timeouts of at
/// least one millisecond per strategy).
pub(crate) fn strategy_share(timeout: Duration, strategy_count: usize) -> Duration {
    let count = strategy_count.max(1) as u64;
    Duration::from_millis((timeout.as_millis() as u64 / count).max(1))
}

impl ElementResolver {
    pub fn new(
        catalog: Arc<SelectorCatalog>,
        sink: Arc<dyn EventSink>,
        session_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            catalog,
            sink,
            session_id: session_id.into(),
            poll_interval,
        }
    }

    pub fn catalog(&self) -> &SelectorCatalog {
        &self.catalog
    }

    /// Resolve a single element (the first match of the winning strategy).
    pub async fn resolve<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        timeout: Duration,
    ) -> Result<ResolvedHandle, ResolveError> {
        let set = self.resolve_all(driver, name, timeout).await?;
        // resolve_all only returns non-empty collections.
        Ok(ResolvedHandle {
            id: set.ids[0],
            strategy_used: set.strategy_used,
            resolved_at: set.resolved_at,
        })
    }

    /// Resolve every element matched by the first strategy that yields at
    /// least one result.
    pub async fn resolve_all<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
        timeout: Duration,
    ) -> Result<ResolvedSet, ResolveError> {
        let started = Instant::now();
        let spec = self.catalog.get(name)?;
        let share = strategy_share(timeout, spec.strategies.len());

        let mut attempted = Vec::with_capacity(spec.strategies.len());
        for strategy in &spec.strategies {
            attempted.push(format!("{}:{}", strategy.kind, strategy.expression));
            let deadline = Instant::now() + share;
            loop {
                match driver.find_all(strategy.kind, &strategy.expression).await {
                    Ok(ids) if !ids.is_empty() => {
                        debug!(
                            element = name,
                            strategy = %strategy.kind,
                            matches = ids.len(),
                            "resolved"
                        );
                        self.emit(name, Some(strategy.kind), started, true, None);
                        return Ok(ResolvedSet {
                            ids,
                            strategy_used: strategy.kind,
                            resolved_at: Instant::now(),
                        });
                    }
                    Ok(_) => {
                        trace!(element = name, strategy = %strategy.kind, "no match yet");
                    }
                    Err(e) if e.is_recoverable() => {
                        trace!(element = name, strategy = %strategy.kind, error = %e, "probe failed");
                    }
                    Err(e) => {
                        self.emit(name, None, started, false, Some(e.to_string()));
                        return Err(ResolveError::Driver {
                            name: name.to_string(),
                            source: e,
                        });
                    }
                }

                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                tokio::time::sleep(self.poll_interval.min(remaining)).await;
            }
        }

        self.emit(
            name,
            None,
            started,
            false,
            Some(format!("exhausted {} strategies", attempted.len())),
        );
        Err(ResolveError::ElementNotFound {
            name: name.to_string(),
            attempted,
        })
    }

    fn emit(
        &self,
        name: &str,
        strategy: Option<StrategyKind>,
        started: Instant,
        success: bool,
        details: Option<String>,
    ) {
        self.sink.event(TelemetryEvent {
            session_id: self.session_id.clone(),
            event_type: EventType::Resolve,
            element_name: Some(name.to_string()),
            strategy_used: strategy,
            attempt_number: None,
            duration_ms: started.elapsed().as_millis() as u64,
            success,
            details,
        });
    }
}
