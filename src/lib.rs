//! Habit streak tracking with a self-repairing engagement streak.
//!
//! habitus records completions of recurring habits and derives two metrics
//! from that log:
//!
//! | Metric | Scope | Rule |
//! |--------|-------|------|
//! | `current_streak` | one habit | consecutive days completed; lapses when the last completion is before yesterday |
//! | `total_streaks` | one user | consecutive days, ending today or yesterday, on which at least three distinct habits were completed |
//!
//! Neither metric is trusted as stored. The reconciler recomputes them at fixed
//! trigger points (listing habits, completing or failing one, deleting one, and
//! the bulk repair entrypoint) and writes the results back.
//!
//! # Architecture
//!
//! - **Storage**: SQLite behind the async [`store::RecordStore`] trait
//! - **Rules**: pure functions in [`streak`] over a single reference calendar
//! - **Coordination**: [`reconcile::Reconciler`], optionally serialized per user
//! - **Transport**: MCP over stdio or Streamable HTTP, plus a CLI
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`streak`]: Day bucketing, per-habit streak rules, engagement aggregation
//! - [`store`]: Record store contract with SQLite and in-memory implementations
//! - [`reconcile`]: When the rules run and how their results are committed

pub mod config;
pub mod db;
pub mod error;
pub mod reconcile;
pub mod store;
pub mod streak;

pub use error::{EngineError, EngineResult};
pub use reconcile::{Reconciler, RepairReport};
