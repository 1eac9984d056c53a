//! Product photo generation pipeline.
//!
//! - [`JobQueue`]: durable FIFO queue handle with an enqueue wake-up.
//! - [`Worker`]: single consumer that generates, stores and composites the
//!   images of one job at a time under a sliding-window start limit.
//! - [`CompletionBridge`]: submit a job and wait for its terminal event.
//! - [`Pipeline`]: starts and stops the background tasks.

pub mod bridge;
pub mod config;
pub mod queue;
pub mod rate_limit;
pub mod service;
pub mod worker;

pub use bridge::{BridgeError, CompletionBridge, Submission};
pub use config::PipelineConfig;
pub use queue::JobQueue;
pub use rate_limit::SlidingWindowLimiter;
pub use service::{build_worker, Pipeline, PipelineError, Stores};
pub use worker::{Worker, WorkerError, WorkerOptions};
