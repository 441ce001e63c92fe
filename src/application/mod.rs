//! Application layer - Use cases and orchestration.
//!
//! Services depend on domain ports (traits) rather than concrete
//! implementations, so the engine and embedding provider are chosen at startup.

pub mod services;

pub use services::{DocumentService, SearchConfig, STORE_FAILED_MESSAGE};
