//! In-memory adapters
//!
//! These implement the engine's ports over plain collections. They back the
//! test suite and small embedded deployments; a SQL-backed store implements
//! the same traits.
//!
//! # Available Adapters
//!
//! - **InMemoryPostingStore**: aggregates recorded movements into posting balances
//! - **InMemoryExchangeRates**: published rates keyed by type and date
//!
//! ```rust,ignore
//! use domain_trial_balance::adapters::{InMemoryPostingStore, LedgerMovement};
//! use domain_trial_balance::PostingRepository;
//! use std::sync::Arc;
//!
//! let store = InMemoryPostingStore::new(chart).with_ledgers(ledgers).with_currencies(currencies);
//! store.record(movement)?;
//! let port: Arc<dyn PostingRepository> = Arc::new(store);
//! ```

pub mod memory_postings;
pub mod memory_rates;

pub use memory_postings::{day_count, InMemoryPostingStore, LedgerMovement};
pub use memory_rates::InMemoryExchangeRates;
