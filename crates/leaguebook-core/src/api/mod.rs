// Remote data client: Sleeper league resources, player catalog, projections,
// and the ESPN scoreboard.

pub mod catalog;
pub mod client;
pub mod memory;
pub mod normalize;
pub mod scores;
pub mod types;

pub use client::{ApiError, ApiResult, LeagueSource, SleeperClient, TrendKind};
