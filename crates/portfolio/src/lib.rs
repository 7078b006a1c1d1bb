//! # Vantage Portfolio Aggregator
//!
//! This crate reduces the session's live connection state into the single
//! set of portfolio totals shown on the dashboard.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   external systems. It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** The `PortfolioAggregator` is a stateless
//!   calculator. It takes the current `LiveConnection` slice as input and
//!   produces a `PortfolioTotals` as output. This makes it highly reliable
//!   and easy to test.
//! - **Derived, never stored:** Totals are recomputed on every aggregation
//!   pass; they have no lifecycle of their own and are never persisted.
//!
//! ## Public API
//!
//! - `PortfolioAggregator`: The main struct that contains the calculation logic.
//! - `PortfolioTotals`: The standardized struct that holds the aggregate metrics.
//! - `PortfolioError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::PortfolioAggregator;
pub use error::PortfolioError;
pub use report::PortfolioTotals;
