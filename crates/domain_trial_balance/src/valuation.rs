//! Exchange rate valuation
//!
//! Rates are published as domestic units per foreign unit. A foreign entry
//! is valued into the domestic currency by multiplying by its rate; valuing
//! into another foreign currency then divides by that currency's rate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

use core_kernel::money::checked_divide;
use core_kernel::temporal::is_last_day_of_month;
use core_kernel::{Currency, CurrencyId, ExchangeRateType, TemporalError, WorkingCalendar};

use crate::entry::PostingEntry;
use crate::error::TrialBalanceError;
use crate::ports::ExchangeRateSource;
use crate::query::ValuationOptions;

/// Picks the rate type and date for a balance ending on `end`
///
/// Walks back from `end`: a month-end day selects the end-of-month
/// valuation rate, the last working day on or before `end` selects the
/// daily rate, whichever comes first.
pub fn determine_rate_type_for_date(
    end: NaiveDate,
    calendar: &WorkingCalendar,
) -> Result<(ExchangeRateType, NaiveDate), TemporalError> {
    let last_working_day = calendar.last_working_day_on_or_before(end)?;
    let mut candidate = end;
    loop {
        if is_last_day_of_month(candidate) {
            return Ok((ExchangeRateType::EndOfMonthValuation, candidate));
        }
        if candidate == last_working_day {
            return Ok((ExchangeRateType::Daily, candidate));
        }
        candidate = candidate
            .pred_opt()
            .ok_or_else(|| TemporalError::NoWorkingDay(end.to_string()))?;
    }
}

/// A resolved valuation: target currency plus the rate type and date to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuationPlan {
    pub target: CurrencyId,
    pub rate_type: ExchangeRateType,
    pub rate_date: NaiveDate,
}

impl ValuationPlan {
    /// Resolves caller options against the end of the valued period
    ///
    /// An explicit rate date wins; otherwise the date is picked by
    /// walking back from `period_end`. An explicit rate type without a date
    /// keeps the type and takes the walked date.
    pub fn resolve(
        options: &ValuationOptions,
        period_end: NaiveDate,
        calendar: &WorkingCalendar,
    ) -> Result<Self, TrialBalanceError> {
        let (walked_type, walked_date) = determine_rate_type_for_date(period_end, calendar)?;
        let (rate_type, rate_date) = match (options.exchange_rate_type, options.exchange_rate_date) {
            (Some(rate_type), Some(date)) => (rate_type, date),
            (None, Some(date)) => (ExchangeRateType::Daily, date),
            (Some(rate_type), None) => (rate_type, walked_date),
            (None, None) => (walked_type, walked_date),
        };
        Ok(Self {
            target: options.target_currency,
            rate_type,
            rate_date,
        })
    }
}

/// Values posting entries with the rates of one plan
pub struct Valuator<'a> {
    domestic: &'a Currency,
    currencies: &'a HashMap<CurrencyId, Currency>,
    plan: ValuationPlan,
    rates: HashMap<CurrencyId, Decimal>,
}

impl<'a> Valuator<'a> {
    /// Loads the plan's rates from `source`
    pub fn load(
        source: &dyn ExchangeRateSource,
        domestic: &'a Currency,
        currencies: &'a HashMap<CurrencyId, Currency>,
        plan: ValuationPlan,
    ) -> Result<Self, TrialBalanceError> {
        let rates = source
            .get_rates(plan.rate_type, plan.rate_date)?
            .into_iter()
            .filter(|rate| rate.from_currency == domestic.id)
            .map(|rate| (rate.to_currency, rate.value()))
            .collect::<HashMap<_, _>>();
        debug!(
            rate_type = %plan.rate_type,
            date = %plan.rate_date,
            rates = rates.len(),
            "exchange rates loaded"
        );
        Ok(Self {
            domestic,
            currencies,
            plan,
            rates,
        })
    }

    pub fn plan(&self) -> &ValuationPlan {
        &self.plan
    }

    /// Domestic units per unit of `currency`
    fn rate_to_domestic(&self, currency: CurrencyId) -> Result<Decimal, TrialBalanceError> {
        if currency == self.domestic.id {
            return Ok(Decimal::ONE);
        }
        self.rates.get(&currency).copied().ok_or_else(|| {
            let name = self
                .currencies
                .get(&currency)
                .map_or_else(|| currency.to_string(), |c| c.abbreviation.clone());
            warn!(currency = %name, date = %self.plan.rate_date, "exchange rate missing");
            TrialBalanceError::MissingExchangeRate {
                currency: name,
                date: self.plan.rate_date,
                rate_type: self.plan.rate_type,
            }
        })
    }

    /// Factor that turns an amount in `currency` into the target currency
    pub fn factor_for(&self, currency: CurrencyId) -> Result<Decimal, TrialBalanceError> {
        let to_domestic = self.rate_to_domestic(currency)?;
        if self.plan.target == self.domestic.id {
            return Ok(to_domestic);
        }
        let target_rate = self.rate_to_domestic(self.plan.target)?;
        Ok(checked_divide(to_domestic, target_rate)?)
    }

    /// Values every entry not already in the target currency
    ///
    /// # Errors
    ///
    /// Returns `MissingExchangeRate` for the first currency without a rate;
    /// no partial result is produced.
    pub fn valuate(&self, entries: &[PostingEntry]) -> Result<Vec<PostingEntry>, TrialBalanceError> {
        entries
            .iter()
            .map(|entry| {
                if entry.currency.id == self.plan.target {
                    return Ok(entry.clone());
                }
                let factor = self.factor_for(entry.currency.id)?;
                Ok(entry.multiplied_by(factor))
            })
            .collect()
    }
}
