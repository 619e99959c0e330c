//! Subcommand implementations

pub mod call;
pub mod open;
pub mod scrape;
