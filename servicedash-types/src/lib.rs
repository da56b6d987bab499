//! # servicedash-types
//!
//! Core types shared by every part of servicedash: the status vocabulary,
//! the normalized result every source adapter produces, and the persisted
//! poll record.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: the types work without any serialization framework
//! - **Fail-safe ordering**: [`Status::Unknown`] ranks as the most severe status, so an
//!   ambiguous or failed poll is never treated as healthy
//! - **Optional serialization**: enable the `serde` feature for JSON export
//!
//! ## Example
//!
//! ```rust
//! use servicedash_types::{worst_of, NormalizedStatus, PollRecord, Status};
//!
//! let aggregate = worst_of([Status::Operational, Status::Degraded]);
//! assert_eq!(aggregate, Status::Degraded);
//!
//! let normalized = NormalizedStatus::new(aggregate, "api: degraded_performance")
//!     .with_latency_ms(120);
//! let record = PollRecord::new(1_700_000_000, "github", "GitHub", normalized);
//! assert_eq!(record.severity, 1);
//! ```

mod normalized;
mod record;
mod status;

pub use normalized::*;
pub use record::*;
pub use status::*;
