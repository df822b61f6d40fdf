//! Lambda-side adapter that feeds invocation events to the bundled `boxxy`
//! binary and returns its captured output.
//!
//! Runtime wiring lives in `src/bin/boxxy_adapter.rs`; everything here is
//! plain synchronous code so it can be exercised without a Lambda runtime.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
