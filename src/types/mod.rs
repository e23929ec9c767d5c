//! Shared data structures for batch analytics
//!
//! - Entities: `Farm`, `Batch`
//! - Records: daily feed/water, weighings, mortality, sanitary events,
//!   air-quality readings, financial transactions
//! - Outputs: rollups, projections, alerts and report DTOs
//!
//! Records reference their owner by id only; nothing here points back up
//! the ownership graph.

mod farm;
mod records;
mod alerts;
mod analytics;
mod reports;

pub use farm::*;
pub use records::*;
pub use alerts::*;
pub use analytics::*;
pub use reports::*;
