//! These modules are shared across the engine: errors, timers, settings.
pub mod box_error;
pub mod config;
pub mod micro_timer;
