//! Resilient element-resolution, interaction and calendar-crawling engine
//! for a frequently-changing booking portal.
//!
//! Layering, leaves first: [`catalog`] (logical names to fallback locator
//! chains), [`resolver`] (name to live element ids under a shared timeout
//! budget), [`interaction`] (retrying operations that never cache a handle
//! across a navigation boundary), [`crawler`] (the multi-month availability
//! state machine). Nothing depends upward.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod interaction;
pub mod resolver;
pub mod retry;

pub use neptun_common::{driver, error, protocol, sink};
