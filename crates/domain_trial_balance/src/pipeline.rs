//! Balance assembly
//!
//! One build runs strictly in order:
//!
//! ```text
//! retrieve -> [valuate] -> [consolidate to target] -> rollup passes
//!          -> combine -> restrict levels -> sort -> validate -> cache
//! ```
//!
//! Any failure aborts the build; nothing partial is returned or cached.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use core_kernel::{Currency, CurrencyId, Period, WorkingCalendar};
use domain_ledger::{AccountHierarchy, CurrencyRef, SectorHierarchy};

use crate::cache::TrialBalanceCache;
use crate::entry::{BalanceAmounts, ItemType, TrialBalanceEntry};
use crate::error::TrialBalanceError;
use crate::ports::{ExchangeRateSource, PostingRepository};
use crate::query::{TrialBalanceQuery, ValuationOptions};
use crate::recipe::{RecipeKind, ReportRecipe, TraditionalOptions, ValuationRequest};
use crate::restriction::{prune_sectorized_twins, restrict_levels, sort_entries};
use crate::rollup::{
    consolidated_totals, currency_totals, debtor_creditor_totals, desectorize, group_totals,
    ledger_merged_accounts, merge_ledgers, remerge, subledger_groups, subledger_totals,
    ParentRollup, Summarizer, SummaryTable,
};
use crate::settings::EngineSettings;
use crate::validator::ConsistencyValidator;
use crate::valuation::{ValuationPlan, Valuator};

/// A built trial balance, rows in report order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub entries: Vec<TrialBalanceEntry>,
    pub recipe: RecipeKind,
    pub built_for: Period,
}

impl TrialBalance {
    pub fn empty(period: Period) -> Self {
        Self {
            entries: Vec::new(),
            recipe: RecipeKind::Traditional,
            built_for: period,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows of one item type, in report order
    pub fn of_type(&self, item_type: ItemType) -> impl Iterator<Item = &TrialBalanceEntry> {
        self.entries.iter().filter(move |e| e.item_type == item_type)
    }

    /// Rows of one account, in report order
    pub fn account_rows<'a>(&'a self, number: &'a str) -> impl Iterator<Item = &'a TrialBalanceEntry> {
        self.entries
            .iter()
            .filter(move |e| e.account.as_ref().map(|n| n.as_str()) == Some(number))
    }

    pub fn consolidated_total(&self) -> Option<&TrialBalanceEntry> {
        self.of_type(ItemType::TotalConsolidated).next()
    }
}

/// Which totals a run of the traditional passes produces
#[derive(Debug, Clone, Copy)]
struct Passes {
    sectorized: bool,
    subledgers: bool,
    groups: bool,
}

/// Builds trial balances from the injected ports
pub struct TrialBalanceBuilder {
    postings: Arc<dyn PostingRepository>,
    rates: Arc<dyn ExchangeRateSource>,
    accounts: Arc<dyn AccountHierarchy>,
    sectors: Arc<dyn SectorHierarchy>,
    currencies: HashMap<CurrencyId, Currency>,
    calendar: WorkingCalendar,
    settings: EngineSettings,
    cache: Option<Arc<TrialBalanceCache>>,
}

impl TrialBalanceBuilder {
    pub fn new(
        postings: Arc<dyn PostingRepository>,
        rates: Arc<dyn ExchangeRateSource>,
        accounts: Arc<dyn AccountHierarchy>,
        sectors: Arc<dyn SectorHierarchy>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            postings,
            rates,
            accounts,
            sectors,
            currencies: HashMap::new(),
            calendar: WorkingCalendar::new(),
            settings,
            cache: None,
        }
    }

    /// Registers the currencies valuation may need
    pub fn with_currencies(mut self, currencies: impl IntoIterator<Item = Currency>) -> Self {
        self.currencies
            .extend(currencies.into_iter().map(|currency| (currency.id, currency)));
        self
    }

    pub fn with_calendar(mut self, calendar: WorkingCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_cache(mut self, cache: Arc<TrialBalanceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Builds the balance for `query`, or returns the cached one
    ///
    /// # Errors
    ///
    /// - `MalformedAccountRange` / `InvalidQuery` before anything is retrieved
    /// - `UnhandledVariant` for unsupported option combinations
    /// - `MissingExchangeRate` when valuation lacks a rate
    /// - `ConsistencyValidation` when totals disagree
    /// - `Port` / `Ledger` when a collaborator fails
    #[instrument(skip(self, query), fields(kind = ?query.trial_balance_type, period = %query.period))]
    pub fn build(&self, query: &TrialBalanceQuery) -> Result<Arc<TrialBalance>, TrialBalanceError> {
        query.account_range()?;
        let recipe = ReportRecipe::select(query)?;

        let cache = self.cache.as_ref().filter(|_| self.settings.cache_enabled);
        if let Some(hit) = cache.and_then(|cache| cache.get(query)) {
            debug!("trial balance served from cache");
            return Ok(hit);
        }

        info!(recipe = ?recipe.kind(), "building trial balance");
        let combined = self.assemble(&recipe, query)?;
        let postings: Vec<TrialBalanceEntry> = combined
            .iter()
            .filter(|e| e.item_type == ItemType::Entry)
            .cloned()
            .collect();

        let mut entries = restrict_levels(combined, query.level, recipe.needs_subledgers());
        if recipe.is_sectorized() {
            entries = prune_sectorized_twins(entries);
        }
        sort_entries(&mut entries);

        ConsistencyValidator::new(self.settings.validation_tolerance)
            .with_account_range(query.has_account_range())
            .validate(&entries, &postings)?;

        let balance = Arc::new(TrialBalance {
            entries,
            recipe: recipe.kind(),
            built_for: query.period,
        });
        if let Some(cache) = cache {
            cache.insert(query, Arc::clone(&balance));
        }
        info!(rows = balance.len(), "trial balance built");
        Ok(balance)
    }

    fn assemble(
        &self,
        recipe: &ReportRecipe,
        query: &TrialBalanceQuery,
    ) -> Result<Vec<TrialBalanceEntry>, TrialBalanceError> {
        let date = query.period.to;
        let mut rows = match recipe {
            ReportRecipe::Traditional(options) | ReportRecipe::Valued(options) => {
                let rows = self.prepared_rows(query, query.period, options)?;
                let rows = shape(rows, options.sectorized, options.merge_ledgers);
                self.traditional_passes(rows, Passes::from(options), date)?
            }
            ReportRecipe::CascadingLedgers(options) => {
                let rows = self.prepared_rows(query, query.period, options)?;
                let per_ledger = shape(rows, options.sectorized, false);
                let merged = merge_ledgers(per_ledger.clone());
                let mut rows = self.traditional_passes(per_ledger, Passes::from(options), date)?;
                rows.extend(self.traditional_passes(merged, Passes::from(options), date)?);
                rows
            }
            ReportRecipe::AnalyticByAccount {
                valuation,
                consolidate_to_target,
            } => {
                let options = TraditionalOptions {
                    merge_ledgers: true,
                    sectorized: false,
                    subledgers: false,
                    valuation: valuation.clone(),
                    consolidate_to_target: *consolidate_to_target,
                };
                let rows = self.prepared_rows(query, query.period, &options)?;
                let rows = shape(rows, false, true);
                let passes = Passes {
                    groups: false,
                    ..Passes::from(&options)
                };
                self.traditional_passes(rows, passes, date)?
            }
            ReportRecipe::BySubledgerAccount { merge_ledgers } => {
                let options = TraditionalOptions {
                    merge_ledgers: *merge_ledgers,
                    sectorized: false,
                    subledgers: true,
                    valuation: None,
                    consolidate_to_target: false,
                };
                let rows = self.prepared_rows(query, query.period, &options)?;
                let rows = shape(rows, false, *merge_ledgers);
                let groups = subledger_groups(&rows);
                let totals = subledger_totals(&rows);
                // subledger balances carry no consolidation
                return Ok(chain(rows, [groups, totals]));
            }
            ReportRecipe::ByAccountWithLedgers { sectorized } => {
                let options = TraditionalOptions {
                    merge_ledgers: false,
                    sectorized: *sectorized,
                    subledgers: false,
                    valuation: None,
                    consolidate_to_target: false,
                };
                let rows = self.prepared_rows(query, query.period, &options)?;
                let rows = shape(rows, *sectorized, false);
                let merged = ledger_merged_accounts(&rows);
                let dc = debtor_creditor_totals(&rows);
                let currency = currency_totals(dc.values());
                chain(rows, [merged, dc, currency])
            }
            ReportRecipe::MultiCurrency {
                valuation,
                sectorized,
                merge_ledgers,
            } => {
                let options = TraditionalOptions {
                    merge_ledgers: *merge_ledgers,
                    sectorized: *sectorized,
                    subledgers: false,
                    valuation: Some(valuation.clone()),
                    consolidate_to_target: false,
                };
                let rows = self.prepared_rows(query, query.period, &options)?;
                let rows = shape(rows, *sectorized, *merge_ledgers);
                let passes = Passes {
                    groups: false,
                    ..Passes::from(&options)
                };
                self.traditional_passes(rows, passes, date)?
            }
            ReportRecipe::Comparative {
                comparison,
                options,
            } => {
                let current = self.prepared_rows(query, query.period, options)?;
                let comparison_options = TraditionalOptions {
                    valuation: options.valuation.clone().map(for_own_period),
                    ..options.clone()
                };
                let earlier = self.prepared_rows(query, *comparison, &comparison_options)?;
                let current = shape(current, options.sectorized, options.merge_ledgers);
                let earlier = shape(earlier, options.sectorized, options.merge_ledgers);
                let paired = pair_periods(current, earlier);
                self.traditional_passes(paired, Passes::from(options), date)?
            }
        };

        let consolidated = consolidated_totals(&rows);
        rows.extend(consolidated.into_entries());
        Ok(rows)
    }

    /// Retrieves, values and relabels the posting rows of one period
    fn prepared_rows(
        &self,
        query: &TrialBalanceQuery,
        period: Period,
        options: &TraditionalOptions,
    ) -> Result<Vec<TrialBalanceEntry>, TrialBalanceError> {
        let posting_query = query.posting_query(period, options.subledgers)?;
        let postings = self.postings.get_postings(&posting_query)?;
        debug!(count = postings.len(), %period, "postings retrieved");

        let (postings, target) = match &options.valuation {
            Some(request) => {
                let domestic = self.domestic_currency()?;
                let plan = self.valuation_plan(request, domestic, period)?;
                let target = plan.target;
                let valuator = Valuator::load(self.rates.as_ref(), domestic, &self.currencies, plan)?;
                (valuator.valuate(&postings)?, Some(target))
            }
            None => (postings, None),
        };

        let mut rows: Vec<TrialBalanceEntry> = postings
            .iter()
            .map(|posting| TrialBalanceEntry::from_posting(posting, self.accounts.account(&posting.account)))
            .collect();

        if options.consolidate_to_target {
            if let Some(target) = target {
                let target = self.currency_ref(target)?;
                for row in rows.iter_mut() {
                    row.currency = Some(target.clone());
                }
                rows = remerge(rows);
            }
        }
        Ok(rows)
    }

    fn domestic_currency(&self) -> Result<&Currency, TrialBalanceError> {
        let code = &self.settings.domestic_currency_code;
        self.currencies
            .values()
            .find(|currency| currency.is_domestic(code))
            .ok_or_else(|| {
                TrialBalanceError::Configuration(format!("domestic currency '{code}' is not registered"))
            })
    }

    fn currency_ref(&self, id: CurrencyId) -> Result<CurrencyRef, TrialBalanceError> {
        self.currencies
            .get(&id)
            .map(CurrencyRef::from)
            .ok_or_else(|| TrialBalanceError::invalid_query(format!("unknown currency {id}")))
    }

    fn valuation_plan(
        &self,
        request: &ValuationRequest,
        domestic: &Currency,
        period: Period,
    ) -> Result<ValuationPlan, TrialBalanceError> {
        let options = match request {
            ValuationRequest::Explicit(options) => options.clone(),
            ValuationRequest::Default => ValuationOptions::to(domestic.id),
        };
        if !self.currencies.contains_key(&options.target_currency) {
            return Err(TrialBalanceError::invalid_query(format!(
                "unknown target currency {}",
                options.target_currency
            )));
        }
        ValuationPlan::resolve(&options, period.to, &self.calendar)
    }

    /// Parent, sector, group and total passes over posting rows
    fn traditional_passes(
        &self,
        rows: Vec<TrialBalanceEntry>,
        passes: Passes,
        date: NaiveDate,
    ) -> Result<Vec<TrialBalanceEntry>, TrialBalanceError> {
        let summarizer = Summarizer::new(self.accounts.as_ref(), self.sectors.as_ref(), date);
        let mut summaries = SummaryTable::new();

        if passes.sectorized {
            let sector_summaries = summarizer.sector_parent_summaries(&rows)?;
            let sector_rows: Vec<TrialBalanceEntry> = sector_summaries.values().cloned().collect();
            summaries.merge(summarizer.parent_summaries(&sector_rows, ParentRollup::default()));
            summaries.merge(sector_summaries);
        }
        summaries.merge(summarizer.parent_summaries(
            &rows,
            ParentRollup {
                root_sector_twin: passes.sectorized,
                include_own_account: passes.subledgers,
            },
        ));

        let groups = if passes.groups {
            group_totals(&rows)
        } else {
            SummaryTable::new()
        };
        let dc = debtor_creditor_totals(&rows);
        let currency = currency_totals(dc.values());
        debug!(
            summaries = summaries.len(),
            groups = groups.len(),
            currencies = currency.len(),
            "rollup passes done"
        );
        Ok(chain(rows, [summaries, groups, dc, currency]))
    }
}

impl From<&TraditionalOptions> for Passes {
    fn from(options: &TraditionalOptions) -> Self {
        Self {
            sectorized: options.sectorized,
            subledgers: options.subledgers,
            groups: true,
        }
    }
}

fn chain<const N: usize>(rows: Vec<TrialBalanceEntry>, tables: [SummaryTable; N]) -> Vec<TrialBalanceEntry> {
    let mut rows = rows;
    for table in tables {
        rows.extend(table.into_entries());
    }
    rows
}

fn shape(rows: Vec<TrialBalanceEntry>, sectorized: bool, merged: bool) -> Vec<TrialBalanceEntry> {
    let rows = if sectorized { rows } else { desectorize(rows) };
    if merged {
        merge_ledgers(rows)
    } else {
        rows
    }
}

/// The comparison period always walks its own rate date
fn for_own_period(request: ValuationRequest) -> ValuationRequest {
    match request {
        ValuationRequest::Explicit(options) => ValuationRequest::Explicit(ValuationOptions {
            exchange_rate_date: None,
            ..options
        }),
        ValuationRequest::Default => ValuationRequest::Default,
    }
}

/// Lines up rows of the current and comparison periods by identity
///
/// Current amounts stay in `amounts`; comparison amounts and rate ride on
/// `comparison` and `second_exchange_rate`. Rows present in one period only
/// get zeros on the other side.
fn pair_periods(
    current: Vec<TrialBalanceEntry>,
    earlier: Vec<TrialBalanceEntry>,
) -> Vec<TrialBalanceEntry> {
    let mut rows = current;
    for row in rows.iter_mut() {
        row.comparison = Some(BalanceAmounts::zero());
    }
    let index: HashMap<_, usize> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (row.identity_key(), idx))
        .collect();

    for row in earlier {
        match index.get(&row.identity_key()) {
            Some(&idx) => {
                rows[idx].comparison = Some(row.amounts);
                rows[idx].second_exchange_rate = row.exchange_rate;
            }
            None => rows.push(TrialBalanceEntry {
                amounts: BalanceAmounts::zero(),
                comparison: Some(row.amounts),
                second_exchange_rate: row.exchange_rate,
                exchange_rate: Decimal::ONE,
                ..row
            }),
        }
    }
    rows
}
