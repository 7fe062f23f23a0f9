//! Outbound services for the storefront.
//!
//! - `pixel` - Meta Conversions API dispatch for commerce events

pub mod pixel;

pub use pixel::{LogSink, PixelDispatcher, build_sink};
