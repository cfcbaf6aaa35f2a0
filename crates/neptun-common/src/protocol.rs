//! Shared wire and data types exchanged between the engine, the driver and
//! outward collaborators.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for a live page element, issued by the driver.
///
/// An id is only meaningful against the document generation it was issued
/// for: any navigation (forward, back, reload) invalidates every id issued
/// before it. Drivers report reuse of an invalidated id as
/// [`crate::DriverError::StaleReference`].
pub type ElementId = u64;

/// One mechanism for locating an element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Primary structural selector (CSS).
    Css,
    /// Alternate structural selector (XPath).
    XPath,
    /// Last-resort match on visible text content.
    TextContains,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Css => write!(f, "css"),
            StrategyKind::XPath => write!(f, "xpath"),
            StrategyKind::TextContains => write!(f, "text_contains"),
        }
    }
}

/// A single locator strategy: a kind plus the expression that kind
/// interprets. Priority is given by position in the owning spec's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    pub kind: StrategyKind,
    pub expression: String,
}

impl LocatorStrategy {
    pub fn css(expression: impl Into<String>) -> Self {
        Self {
            kind: StrategyKind::Css,
            expression: expression.into(),
        }
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            kind: StrategyKind::XPath,
            expression: expression.into(),
        }
    }

    pub fn text_contains(expression: impl Into<String>) -> Self {
        Self {
            kind: StrategyKind::TextContains,
            expression: expression.into(),
        }
    }
}

/// Category of a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Resolve,
    Click,
    Type,
    Read,
    Visibility,
    Crawl,
}

/// One telemetry event, emitted for every resolution and every interaction.
///
/// Persistence and querying are the receiving sink's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub session_id: String,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<StrategyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// One observed (date, time slot, remaining capacity) data point.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub date: NaiveDate,
    pub time_slot: String,
    pub spots_available: u32,
    pub subscription_code: String,
    pub subscription_name: String,
    pub collected_at: DateTime<Utc>,
}
