//! Derived metrics over poll history.
//!
//! Every function here is a pure transform over a snapshot of records read
//! from the [`Store`](crate::store::Store); nothing mutates history.
//!
//! ## Submodules
//!
//! - [`buckets`]: fixed-width time buckets for severity and value trends
//! - [`health`]: uptime ratio and outage-episode count
//! - [`change`]: first/last change and min/max range of readings
//! - [`estimate`]: inverse-CDF quantile and probability-weighted expectation
//! - [`digest`]: the per-service bundle consumed by the display and export
//!
//! ## Data Flow
//!
//! ```text
//! Store::history(id, since)
//!        │
//!        ▼
//! Digest::derive()
//!        ├──▶ severity_buckets / value_buckets (sparklines)
//!        ├──▶ uptime / episodes (status services)
//!        └──▶ value_change / value_range (metric services)
//! ```

pub mod buckets;
pub mod change;
pub mod digest;
pub mod estimate;
pub mod health;

pub use buckets::{severity_buckets, value_buckets};
pub use change::{value_change, value_range, Change, Direction, Range};
pub use digest::Digest;
pub use estimate::{expected_value, parse_yearish, quantile, year_to_timestamp, CdfPoint, WeightedOption};
pub use health::{episodes, uptime};
