//! Community impact statistics.
//!
//! Reduces waste reports, rewards and collection tasks into the four numbers
//! shown on the landing page: waste collected, reports submitted, tokens
//! earned and CO2 offset.

pub mod records;
mod summary;

pub use records::{CollectionTask, Error, Query, Records, Report, Reward, Snapshot};
pub use summary::{fetch, parse_amount, summarize, ImpactSummary, CO2_PER_KG, RECENT_LIMIT};
