//! Built trial balance cache
//!
//! Results are keyed by the full query plus the month of its end date.
//! Invalidation works a whole month at a time: posting a correction dated
//! anywhere in March drops every balance ending in March.
//!
//! The key holds nothing of the builder, so one cache serves builders of a
//! single configuration: same stores, settings, currencies and calendar.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use core_kernel::{MonthKey, TemporalError};

use crate::pipeline::TrialBalance;
use crate::query::TrialBalanceQuery;

/// Cache slot of one query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: TrialBalanceQuery,
    month: MonthKey,
}

impl CacheKey {
    pub fn for_query(query: &TrialBalanceQuery) -> Self {
        Self {
            query: query.clone(),
            month: query.period.month_key(),
        }
    }

    pub fn query(&self) -> &TrialBalanceQuery {
        &self.query
    }

    pub fn month(&self) -> MonthKey {
        self.month
    }
}

/// Process-wide store of built balances
///
/// Concurrent builds may race on a miss; the last insert wins, which is
/// harmless since a build is a pure function of its query.
#[derive(Debug, Default)]
pub struct TrialBalanceCache {
    entries: RwLock<HashMap<CacheKey, Arc<TrialBalance>>>,
}

impl TrialBalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &TrialBalanceQuery) -> Option<Arc<TrialBalance>> {
        self.entries.read().get(&CacheKey::for_query(query)).cloned()
    }

    pub fn insert(&self, query: &TrialBalanceQuery, balance: Arc<TrialBalance>) {
        let key = CacheKey::for_query(query);
        debug!(month = %key.month, "trial balance cached");
        self.entries.write().insert(key, balance);
    }

    /// Drops every balance ending in `month` ("yyyy-MM"); returns how many
    pub fn invalidate_month(&self, month: &str) -> Result<usize, TemporalError> {
        let month = MonthKey::parse(month)?;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.month != month);
        let removed = before - entries.len();
        debug!(%month, removed, "cache month invalidated");
        Ok(removed)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
