//! # servicedash
//!
//! A terminal status dashboard and headless poller for third-party service
//! health and market readings.
//!
//! Every round, each configured service is fetched through a
//! [`SourceAdapter`], normalized to a four-level status with an optional
//! latency and numeric reading, and appended to a SQLite time series. The
//! display and the export read that series back and derive uptime, outage
//! episodes, trends and changes over a sliding window.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  config ──▶ ServiceRegistry                                  │
//! │                  │                                           │
//! │                  ▼                                           │
//! │  ┌──────────┐   ┌──────────┐   ┌─────────┐                   │
//! │  │  source  │◀──│  poller  │──▶│  store  │  (SQLite, WAL)    │
//! │  │(adapters)│   │ (rounds) │   └────┬────┘                   │
//! │  └──────────┘   └──────────┘        │                        │
//! │                                     ▼                        │
//! │                              ┌────────────┐                  │
//! │                              │ analytics  │                  │
//! │                              └─────┬──────┘                  │
//! │                 ┌──────────────────┼──────────────┐          │
//! │                 ▼                  ▼              ▼          │
//! │          app + ui (run)     headless (poll)    export        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`SourceAdapter`] trait, the closed [`SourceKind`]
//!   set and the HTTP adapter that interprets each kind's payload
//! - **[`poller`]**: one bounded-concurrency round over all services
//! - **[`store`]**: append-only poll records with retention pruning
//! - **[`analytics`]**: bucketing, uptime, episodes, change and range, plus
//!   the estimators behind the forecast clocks
//! - **[`app`]**, **[`ui`]**, **[`events`]**: the interactive board
//!
//! ## Usage
//!
//! ```bash
//! # Interactive board (polls in the background)
//! servicedash --config servicedash.json
//!
//! # Headless: poll forever, logging a line per round
//! servicedash poll --log
//!
//! # Dump the current digest
//! servicedash export --out status.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use servicedash::{AppConfig, HttpSource, Poller, RoundClock, Store};
//!
//! # tokio_test::block_on(async {
//! let config = AppConfig::load("servicedash.json".as_ref()).unwrap();
//! let store = Store::open(&config.database_path).await.unwrap();
//! let poller = Poller::new(Arc::new(HttpSource::new().unwrap()), config.concurrency);
//!
//! let mut clock = RoundClock::new();
//! let report = servicedash::poller::run_round(
//!     &poller,
//!     config.services.services(),
//!     &store,
//!     &mut clock,
//!     config.retention_hours,
//! )
//! .await
//! .unwrap();
//! println!("{report}");
//! # });
//! ```

pub mod analytics;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod events;
pub mod export;
pub mod headless;
pub mod logging;
pub mod poller;
pub mod source;
pub mod store;
pub mod timeutil;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::{AppConfig, ServiceRegistry};
pub use poller::{PollOutcome, Poller, RoundClock, RoundReport};
pub use servicedash_types::{NormalizedStatus, PollRecord, Status};
pub use source::{AdapterError, HttpSource, Service, SourceAdapter, SourceKind};
pub use store::{Store, StoreError};
