//! Multi-month availability crawler for one subscription.
//!
//! State machine: EnterCode → ValidateSubscription → SelectResource →
//! LoadCalendar → {IterateMonth → IterateDate → ExtractSlots}* →
//! NavigateNextMonth → Done | Failed. Every date iteration re-resolves the
//! calendar's cells fresh; a cell handle obtained earlier in the month is
//! never reused after the slot view navigation.

pub mod months;
pub mod slots;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use neptun_common::driver::Driver;
use neptun_common::error::DriverError;
use neptun_common::protocol::{AvailabilityRecord, EventType, TelemetryEvent};
use neptun_common::sink::EventSink;

use crate::catalog::{SelectorCatalog, elements};
use crate::config::EngineConfig;
use crate::interaction::{InteractError, InteractionController};
use crate::resolver::{ElementResolver, ResolveError};
use crate::retry::retry;

/// Texts on the validation step that mean the code was rejected even when
/// no styled error banner is present.
const NEGATIVE_VALIDATION_TEXTS: [&str; 3] = [
    "nu a fost gasit",
    "nu a fost găsit",
    "cod invalid",
];

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The subscription code was rejected. Terminal, never retried.
    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),

    /// The booking flow broke past validation. Terminal, never retried.
    #[error("booking error: {0}")]
    BookingFailed(String),

    /// One date's extraction failed; the caller records and skips it.
    #[error("date extraction failed: {0}")]
    DateExtraction(String),

    #[error(transparent)]
    Interact(#[from] InteractError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Outcome of a finished crawl session.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub records_collected: usize,
    pub dates_failed: usize,
    pub months_visited: u32,
    pub remaining_reservations: Option<u32>,
}

/// Per-session state, created when a crawl begins and discarded when it
/// terminates.
struct CrawlState {
    seen_dates: HashSet<NaiveDate>,
    months_visited: u32,
}

/// One date cell as scanned from the current month view.
#[derive(Debug, Clone, Copy)]
struct CellScan {
    day: u32,
    disabled: bool,
}

pub struct AvailabilityCrawler {
    control: InteractionController,
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
    session_id: String,
}

impl AvailabilityCrawler {
    /// Assemble the full stack (catalog → resolver → controller) for one
    /// crawl session.
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> Self {
        let session_id = format!("crawl-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f"));
        Self::with_session(config, sink, session_id)
    }

    pub fn with_session(
        config: EngineConfig,
        sink: Arc<dyn EventSink>,
        session_id: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        let catalog = Arc::new(SelectorCatalog::booking_portal());
        let resolver = ElementResolver::new(
            catalog,
            Arc::clone(&sink),
            session_id.clone(),
            config.poll_interval(),
        );
        let control = InteractionController::new(
            resolver,
            config.element_policy(),
            config.click_wait(),
            config.timeouts.medium(),
            Arc::clone(&sink),
            session_id.clone(),
        );
        Self {
            control,
            config,
            sink,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run one complete crawl session for `code`.
    ///
    /// A terminal failure halts this subscription only; batch callers move
    /// on to the next code.
    pub async fn run<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        code: &str,
        display_name: Option<&str>,
    ) -> Result<CrawlSummary, CrawlError> {
        let mut state = CrawlState {
            seen_dates: HashSet::new(),
            months_visited: 0,
        };
        let mut summary = CrawlSummary::default();
        let retries = self.config.max_retry_attempts;
        let timeouts = self.config.timeouts.clone();

        // EnterCode
        driver.navigate(&self.config.portal_url).await?;
        self.control
            .type_text(driver, elements::SUBSCRIPTION_INPUT, code, true)
            .await?;
        self.control
            .click(driver, elements::SEARCH_BUTTON, retries, timeouts.medium())
            .await?;

        // ValidateSubscription
        if self
            .control
            .is_visible(driver, elements::ERROR_BANNER, timeouts.short())
            .await?
        {
            let message = self
                .control
                .read_text(driver, elements::ERROR_BANNER, false)
                .await?
                .unwrap_or_else(|| "subscription code rejected".into());
            return Err(CrawlError::InvalidSubscription(message));
        }

        let resource_label = self
            .control
            .read_text(driver, elements::RESOURCE_BUTTON, false)
            .await?
            .ok_or_else(|| {
                CrawlError::InvalidSubscription("no bookable resource offered for code".into())
            })?;
        let label_lower = resource_label.to_lowercase();
        if NEGATIVE_VALIDATION_TEXTS
            .iter()
            .any(|t| label_lower.contains(t))
        {
            return Err(CrawlError::InvalidSubscription(resource_label));
        }

        summary.remaining_reservations = match self
            .control
            .read_text(driver, elements::RESERVATION_COUNTER, false)
            .await?
        {
            Some(text) => parse_trailing_count(&text),
            None => None,
        };

        let subscription_name = display_name
            .map(str::to_string)
            .or_else(|| resource_label.lines().next().map(|l| l.trim().to_string()))
            .unwrap_or_else(|| code.to_string());

        // SelectResource
        self.control
            .click(driver, elements::RESOURCE_BUTTON, retries, timeouts.medium())
            .await?;

        // LoadCalendar
        self.control
            .resolver()
            .resolve(driver, elements::CALENDAR_TABLE, timeouts.long())
            .await
            .map_err(|e| CrawlError::BookingFailed(format!("calendar never appeared: {e}")))?;

        // Thin first view: advance once before iterating, as long as the
        // month budget allows it.
        let first_view = self.scan_cells(driver).await?;
        let enabled = first_view.iter().filter(|c| !c.disabled).count();
        if enabled < self.config.minimum_available_days && self.config.max_months > 1 {
            info!(
                enabled,
                threshold = self.config.minimum_available_days,
                "thin month view, advancing before iteration"
            );
            if self.advance_month(driver).await? {
                state.months_visited += 1;
                self.crawl_event(true, format!("pre-advanced past thin view ({enabled} dates)"));
            }
        }

        // IterateMonth
        loop {
            state.months_visited += 1;
            let processed = self
                .process_month(driver, &mut state, &mut summary, code, &subscription_name)
                .await?;
            self.crawl_event(
                true,
                format!(
                    "month view {} processed, {processed} new dates",
                    state.months_visited
                ),
            );

            if state.months_visited >= self.config.max_months {
                break;
            }
            // NavigateNextMonth; absence of the control is an early Done,
            // not an error.
            if !self.advance_month(driver).await? {
                debug!("next-month control absent or disabled, finishing early");
                break;
            }
        }

        summary.months_visited = state.months_visited;
        self.crawl_event(
            true,
            format!(
                "done: {} records, {} dates skipped, {} months",
                summary.records_collected, summary.dates_failed, summary.months_visited
            ),
        );
        Ok(summary)
    }

    /// Extract every not-yet-seen enabled date in the displayed month.
    async fn process_month<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        state: &mut CrawlState,
        summary: &mut CrawlSummary,
        code: &str,
        subscription_name: &str,
    ) -> Result<usize, CrawlError> {
        let header = self
            .control
            .read_text(driver, elements::CALENDAR_HEADER, false)
            .await?;
        let (month, year) = header
            .as_deref()
            .and_then(months::parse_header)
            .unwrap_or_else(|| {
                let now = Local::now();
                warn!(
                    header = header.as_deref().unwrap_or(""),
                    "calendar header unparsable, falling back to current month"
                );
                (now.month(), now.year())
            });

        let cells = self.scan_cells(driver).await?;

        // Left-to-right scan with the single-increment rollover rule: a day
        // number <= 10 right after one > 20 crosses the month boundary,
        // independent of the header text.
        let (mut wm, mut wy) = (month, year);
        let mut prev_day: Option<u32> = None;
        let mut pending: Vec<(NaiveDate, u32)> = Vec::new();
        for cell in &cells {
            if let Some(prev) = prev_day
                && months::crosses_rollover(prev, cell.day)
            {
                (wm, wy) = months::advance(wm, wy);
            }
            prev_day = Some(cell.day);

            if cell.disabled {
                continue;
            }
            let Some(date) = NaiveDate::from_ymd_opt(wy, wm, cell.day) else {
                warn!(day = cell.day, month = wm, year = wy, "impossible date cell");
                continue;
            };
            if state.seen_dates.insert(date) {
                pending.push((date, cell.day));
            }
        }

        let processed = pending.len();
        for (date, day) in pending {
            match self
                .process_date(driver, date, day, code, subscription_name)
                .await
            {
                Ok(records) => summary.records_collected += records,
                Err(e) => {
                    warn!(%date, error = %e, "date extraction failed, skipping");
                    summary.dates_failed += 1;
                    self.crawl_event(false, format!("date {date} skipped: {e}"));
                    self.restore_calendar(driver).await?;
                }
            }
        }
        Ok(processed)
    }

    /// Click one date cell (freshly re-resolved) and harvest its slots.
    async fn process_date<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        date: NaiveDate,
        day: u32,
        code: &str,
        subscription_name: &str,
    ) -> Result<usize, CrawlError> {
        let timeouts = &self.config.timeouts;

        // Fresh collection: any earlier handle into this table is stale by
        // now. Position is 1-based for the indexed click.
        let cells = self
            .control
            .read_collection(driver, elements::CALENDAR_DATE_CELL, "class", timeouts.medium())
            .await?;
        let index = cells
            .iter()
            .position(|(_, text, class)| {
                !is_disabled_cell(text, class.as_deref()) && first_line_day(text) == Some(day)
            })
            .map(|i| i + 1)
            .ok_or_else(|| CrawlError::DateExtraction(format!("cell for {date} disappeared")))?;

        self.control
            .click_at_index(
                driver,
                elements::CALENDAR_DATE_CELL,
                index,
                self.config.max_retry_attempts,
                timeouts.medium(),
            )
            .await?;

        let slot_texts = match self
            .control
            .read_collection(driver, elements::SLOT_CARD, "class", timeouts.medium())
            .await
        {
            Ok(cards) => cards,
            // No slot cards published for the date is a normal empty answer.
            Err(InteractError::Resolve(ResolveError::ElementNotFound { .. })) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut records = 0usize;
        for (_, text, _) in slot_texts {
            if let Some(slot) = slots::parse_slot_text(&text) {
                self.sink.record(AvailabilityRecord {
                    date,
                    time_slot: slot.time_label,
                    spots_available: slot.spots_available,
                    subscription_code: code.to_string(),
                    subscription_name: subscription_name.to_string(),
                    collected_at: Utc::now(),
                });
                records += 1;
            } else {
                debug!(%date, text = text.as_str(), "slot card without usable data");
            }
        }

        self.restore_calendar(driver).await?;
        Ok(records)
    }

    /// Navigate back until the calendar view is live again. A multi-step
    /// procedure, so this runs under the exponential policy rather than the
    /// element-level linear one.
    async fn restore_calendar<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<(), CrawlError> {
        let policy = self.config.procedure_policy();
        let short = self.config.timeouts.short();
        let medium = self.config.timeouts.medium();
        retry(&policy, async |_attempt| {
            if self
                .control
                .is_visible(driver, elements::CALENDAR_TABLE, short)
                .await?
            {
                return Ok(());
            }
            driver.back().await?;
            self.control
                .resolver()
                .resolve(driver, elements::CALENDAR_TABLE, medium)
                .await
                .map_err(InteractError::from)?;
            Ok::<(), CrawlError>(())
        })
        .await
        .map_err(|e| CrawlError::BookingFailed(format!("calendar view lost: {e}")))
    }

    /// Click the next-month control if it is present and enabled.
    /// `Ok(false)` means the crawl should finish early.
    async fn advance_month<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<bool, CrawlError> {
        let timeouts = &self.config.timeouts;
        if !self
            .control
            .is_visible(driver, elements::NEXT_MONTH_ARROW, timeouts.short())
            .await?
        {
            return Ok(false);
        }
        let arrows = self
            .control
            .read_collection(driver, elements::NEXT_MONTH_ARROW, "class", timeouts.short())
            .await?;
        if arrows
            .first()
            .and_then(|(_, _, class)| class.as_deref())
            .is_some_and(|c| c.contains("disabled"))
        {
            return Ok(false);
        }

        if let Err(e) = self
            .control
            .click(
                driver,
                elements::NEXT_MONTH_ARROW,
                self.config.max_retry_attempts,
                timeouts.medium(),
            )
            .await
        {
            warn!(error = %e, "next-month click failed, finishing early");
            return Ok(false);
        }

        self.control
            .resolver()
            .resolve(driver, elements::CALENDAR_TABLE, timeouts.medium())
            .await
            .map_err(|e| CrawlError::BookingFailed(format!("calendar lost after advance: {e}")))?;
        Ok(true)
    }

    /// Read day number and disabled state off every cell in the current
    /// view, in document order.
    async fn scan_cells<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<Vec<CellScan>, CrawlError> {
        let cells = self
            .control
            .read_collection(
                driver,
                elements::CALENDAR_DATE_CELL,
                "class",
                self.config.timeouts.medium(),
            )
            .await?;
        Ok(cells
            .iter()
            .filter_map(|(_, text, class)| {
                let day = first_line_day(text)?;
                Some(CellScan {
                    day,
                    disabled: is_disabled_cell(text, class.as_deref()),
                })
            })
            .collect())
    }

    fn crawl_event(&self, success: bool, details: String) {
        self.sink.event(TelemetryEvent {
            session_id: self.session_id.clone(),
            event_type: EventType::Crawl,
            element_name: None,
            strategy_used: None,
            attempt_number: None,
            duration_ms: 0,
            success,
            details: Some(details),
        });
    }
}

fn first_line_day(text: &str) -> Option<u32> {
    text.trim().lines().next()?.trim().parse().ok()
}

fn is_disabled_cell(text: &str, class: Option<&str>) -> bool {
    text.trim().is_empty() || class.is_some_and(|c| c.contains("disabled"))
}

/// Last integer in a counter text such as "Rezervari ramase: 5" or "3 / 10".
fn parse_trailing_count(text: &str) -> Option<u32> {
    let mut last = None;
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if !current.is_empty() {
            last = Some(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        last = Some(current);
    }
    last.and_then(|s| s.parse().ok())
}
