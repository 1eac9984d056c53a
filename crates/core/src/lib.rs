//! Domain types and shared building blocks for product shot generation.
//!
//! - [`request`]: the validated [`GenerationRequest`](request::GenerationRequest)
//!   and its wire DTO.
//! - [`logo`]: logo / watermark settings as a tagged variant.
//! - [`catalog`]: the closed vocabularies (category, style, angle, resolution).
//! - [`prompt`]: prompt text construction from a request.
//! - [`storage`]: filesystem-backed blob storage for images and logo uploads.
//! - [`job`]: job results shared by the queue, worker and HTTP layer.

#[macro_use]
mod vocabulary;

pub mod catalog;
pub mod error;
pub mod job;
pub mod logo;
pub mod naming;
pub mod prompt;
pub mod request;
pub mod storage;
pub mod types;
pub mod upload;
