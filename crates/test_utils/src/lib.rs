//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! trial balance test suite.
//!
//! # Modules
//!
//! - `fixtures`: The sample chart, sectors, ledgers, currencies and rates
//! - `builders`: Movement and books builders with sensible defaults
//! - `assertions`: Assertion helpers over built balances
//! - `generators`: Property-based test data generators
//! - `telemetry`: One-time test subscriber installation

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;
pub mod telemetry;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
pub use telemetry::init_test_tracing;
