//! Worker thread that performs service round-trips off the UI thread.

pub mod commands;
pub mod runtime;
