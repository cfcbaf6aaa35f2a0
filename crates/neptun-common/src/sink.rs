//! Outward streams: telemetry events and availability records.
//!
//! Persistence, schema and querying are collaborator concerns; the engine
//! only pushes through this seam.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::protocol::{AvailabilityRecord, TelemetryEvent};

/// Receiver for everything the engine emits outward.
///
/// Implementations must tolerate being called from a single task repeatedly;
/// interior mutability is the implementor's choice.
pub trait EventSink: Send + Sync {
    fn event(&self, event: TelemetryEvent);

    fn record(&self, record: AvailabilityRecord);
}

/// Sink that forwards everything to the `tracing` subscriber.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn event(&self, event: TelemetryEvent) {
        debug!(
            session = %event.session_id,
            event_type = ?event.event_type,
            element = event.element_name.as_deref().unwrap_or("-"),
            strategy = ?event.strategy_used,
            attempt = event.attempt_number,
            duration_ms = event.duration_ms,
            success = event.success,
            details = event.details.as_deref().unwrap_or(""),
            "telemetry"
        );
    }

    fn record(&self, record: AvailabilityRecord) {
        info!(
            date = %record.date,
            slot = %record.time_slot,
            spots = record.spots_available,
            code = %record.subscription_code,
            "availability"
        );
    }
}

/// Sink that appends availability records as JSON lines to a file, while
/// forwarding telemetry to the `tracing` subscriber.
pub struct JsonlSink {
    file: Mutex<File>,
    log: LogSink,
}

impl JsonlSink {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            log: LogSink,
        })
    }
}

impl EventSink for JsonlSink {
    fn event(&self, event: TelemetryEvent) {
        self.log.event(event);
    }

    fn record(&self, record: AvailabilityRecord) {
        self.log.record(record.clone());
        match serde_json::to_string(&record) {
            Ok(line) => {
                let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(e) = writeln!(file, "{}", line) {
                    warn!("failed to append availability record: {}", e);
                }
            }
            Err(e) => warn!("failed to serialize availability record: {}", e),
        }
    }
}

/// In-memory sink collecting everything it receives. Used by tests and
/// useful for embedding.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Mutex<Vec<TelemetryEvent>>,
    pub records: Mutex<Vec<AvailabilityRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn records(&self) -> Vec<AvailabilityRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl EventSink for CollectingSink {
    fn event(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    fn record(&self, record: AvailabilityRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}
