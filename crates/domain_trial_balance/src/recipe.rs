//! Report recipes
//!
//! A recipe is picked once per build from the query's type and flags. Each
//! variant holds only the options its assembly needs; combinations no
//! recipe supports are rejected up front.

use serde::{Deserialize, Serialize};

use core_kernel::Period;

use crate::error::TrialBalanceError;
use crate::query::{TrialBalanceQuery, TrialBalanceType, ValuationOptions};

/// Name of the recipe a balance was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeKind {
    Traditional,
    CascadingLedgers,
    AnalyticByAccount,
    BySubledgerAccount,
    ByAccountWithLedgers,
    MultiCurrency,
    Comparative,
    Valued,
}

/// Options shared by the recipes that run the traditional passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraditionalOptions {
    pub merge_ledgers: bool,
    pub sectorized: bool,
    pub subledgers: bool,
    pub valuation: Option<ValuationRequest>,
    pub consolidate_to_target: bool,
}

/// Valuation a recipe must run, with or without caller options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuationRequest {
    /// Caller options as given
    Explicit(ValuationOptions),
    /// Into the domestic currency, rate picked from the period end
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRecipe {
    Traditional(TraditionalOptions),
    /// Traditional passes per ledger and once more with ledgers merged
    CascadingLedgers(TraditionalOptions),
    AnalyticByAccount {
        valuation: Option<ValuationRequest>,
        consolidate_to_target: bool,
    },
    BySubledgerAccount {
        merge_ledgers: bool,
    },
    ByAccountWithLedgers {
        sectorized: bool,
    },
    MultiCurrency {
        valuation: ValuationRequest,
        sectorized: bool,
        merge_ledgers: bool,
    },
    Comparative {
        comparison: Period,
        options: TraditionalOptions,
    },
    Valued(TraditionalOptions),
}

fn requested_valuation(query: &TrialBalanceQuery) -> Option<ValuationRequest> {
    match (&query.valuation, query.use_default_valuation) {
        (Some(options), _) => Some(ValuationRequest::Explicit(options.clone())),
        (None, true) => Some(ValuationRequest::Default),
        (None, false) => None,
    }
}

fn reject(query: &TrialBalanceQuery, reason: &str) -> TrialBalanceError {
    TrialBalanceError::unhandled(format!("{:?}: {reason}", query.trial_balance_type))
}

impl ReportRecipe {
    /// Picks the recipe for `query`
    ///
    /// # Errors
    ///
    /// Returns `UnhandledVariant` for option combinations no recipe supports
    pub fn select(query: &TrialBalanceQuery) -> Result<Self, TrialBalanceError> {
        if query.consolidate_to_target_currency
            && query.valuation.is_none()
            && !query.use_default_valuation
            && query.trial_balance_type != TrialBalanceType::Valued
        {
            return Err(reject(query, "consolidation to a target currency requires a valuation"));
        }

        let traditional = || TraditionalOptions {
            merge_ledgers: query.consolidated,
            sectorized: query.with_sectorization,
            subledgers: query.with_subledger_accounts,
            valuation: requested_valuation(query),
            consolidate_to_target: query.consolidate_to_target_currency,
        };

        let recipe = match query.trial_balance_type {
            TrialBalanceType::Traditional if query.show_cascade_balances => {
                if query.consolidated {
                    return Err(reject(query, "cascading balances cannot merge ledgers"));
                }
                ReportRecipe::CascadingLedgers(traditional())
            }
            TrialBalanceType::Traditional => ReportRecipe::Traditional(traditional()),
            TrialBalanceType::AnalyticByAccount => {
                if query.with_sectorization {
                    return Err(reject(query, "analytic balances are never sectorized"));
                }
                ReportRecipe::AnalyticByAccount {
                    valuation: requested_valuation(query),
                    consolidate_to_target: query.consolidate_to_target_currency,
                }
            }
            TrialBalanceType::BySubledgerAccount => {
                if !query.with_subledger_accounts {
                    return Err(reject(query, "subledger balances need subledger accounts"));
                }
                if query.with_sectorization {
                    return Err(reject(query, "subledger balances are never sectorized"));
                }
                ReportRecipe::BySubledgerAccount {
                    merge_ledgers: query.consolidated,
                }
            }
            TrialBalanceType::ByAccountWithLedgers => {
                if query.consolidated {
                    return Err(reject(query, "ledgers are shown side by side, not merged"));
                }
                ReportRecipe::ByAccountWithLedgers {
                    sectorized: query.with_sectorization,
                }
            }
            TrialBalanceType::MultiCurrency => {
                if query.consolidate_to_target_currency {
                    return Err(reject(query, "currencies stay in their own columns"));
                }
                ReportRecipe::MultiCurrency {
                    valuation: requested_valuation(query).unwrap_or(ValuationRequest::Default),
                    sectorized: query.with_sectorization,
                    merge_ledgers: query.consolidated,
                }
            }
            TrialBalanceType::Comparative => {
                let Some(comparison) = query.comparison_period else {
                    return Err(reject(query, "a comparison period is required"));
                };
                ReportRecipe::Comparative {
                    comparison,
                    options: traditional(),
                }
            }
            TrialBalanceType::Valued => {
                if query.valuation.is_none() {
                    return Err(reject(query, "a valuation is required"));
                }
                ReportRecipe::Valued(TraditionalOptions {
                    consolidate_to_target: true,
                    ..traditional()
                })
            }
        };
        Ok(recipe)
    }

    pub fn kind(&self) -> RecipeKind {
        match self {
            ReportRecipe::Traditional(_) => RecipeKind::Traditional,
            ReportRecipe::CascadingLedgers(_) => RecipeKind::CascadingLedgers,
            ReportRecipe::AnalyticByAccount { .. } => RecipeKind::AnalyticByAccount,
            ReportRecipe::BySubledgerAccount { .. } => RecipeKind::BySubledgerAccount,
            ReportRecipe::ByAccountWithLedgers { .. } => RecipeKind::ByAccountWithLedgers,
            ReportRecipe::MultiCurrency { .. } => RecipeKind::MultiCurrency,
            ReportRecipe::Comparative { .. } => RecipeKind::Comparative,
            ReportRecipe::Valued(_) => RecipeKind::Valued,
        }
    }

    /// Whether sector breakdowns are kept
    pub fn is_sectorized(&self) -> bool {
        match self {
            ReportRecipe::Traditional(options)
            | ReportRecipe::CascadingLedgers(options)
            | ReportRecipe::Valued(options)
            | ReportRecipe::Comparative { options, .. } => options.sectorized,
            ReportRecipe::ByAccountWithLedgers { sectorized }
            | ReportRecipe::MultiCurrency { sectorized, .. } => *sectorized,
            _ => false,
        }
    }

    /// Whether postings are retrieved per subledger account
    pub fn needs_subledgers(&self) -> bool {
        match self {
            ReportRecipe::Traditional(options)
            | ReportRecipe::CascadingLedgers(options)
            | ReportRecipe::Valued(options)
            | ReportRecipe::Comparative { options, .. } => options.subledgers,
            ReportRecipe::BySubledgerAccount { .. } => true,
            _ => false,
        }
    }
}
