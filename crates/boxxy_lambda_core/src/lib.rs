//! Wire contract shared by the boxxy Lambda adapter and its clients.
//!
//! This crate owns the invocation event/result shapes and the base64 framing
//! of captured process output. It intentionally excludes AWS SDK and Lambda
//! runtime concerns.

pub mod contract;
