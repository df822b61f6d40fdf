//! Operator client for a deployed boxxy Lambda: makes sure the function
//! exists, then drives it line by line from an interactive prompt.

pub mod client;
pub mod errors;
pub mod repl;
