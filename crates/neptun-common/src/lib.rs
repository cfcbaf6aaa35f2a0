pub mod driver;
pub mod error;
pub mod protocol;
pub mod sink;

pub use driver::Driver;
pub use error::DriverError;
pub use protocol::{
    AvailabilityRecord, ElementId, EventType, LocatorStrategy, StrategyKind, TelemetryEvent,
};
pub use sink::EventSink;
