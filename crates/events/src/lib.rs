//! Job lifecycle event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`]: progress and completion notifications for one job.
//! - [`EventLogger`]: background task writing every event to the log.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, JobEvent, JobEventKind, JobStage};
pub use logger::EventLogger;
