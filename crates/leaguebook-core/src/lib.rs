// Library root: re-exports all modules so the binary and integration tests
// can access the crate's public API.

pub mod api;
pub mod config;
pub mod db;
pub mod history;
pub mod report;
pub mod stats;

#[cfg(test)]
mod test_fixtures;
