//! Command handlers for the binary

pub mod rates;
pub mod setup;
pub mod ui;
