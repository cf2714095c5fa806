//! Published exchange rates held in memory

use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;

use core_kernel::{DomainPort, ExchangeRate, ExchangeRateType, PortError};

use crate::ports::ExchangeRateSource;

/// In-memory `ExchangeRateSource` keyed by rate type and date
#[derive(Debug, Default)]
pub struct InMemoryExchangeRates {
    rates: RwLock<HashMap<(ExchangeRateType, NaiveDate), Vec<ExchangeRate>>>,
}

impl InMemoryExchangeRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rates(rates: impl IntoIterator<Item = ExchangeRate>) -> Self {
        let source = Self::new();
        for rate in rates {
            source.publish(rate);
        }
        source
    }

    /// Publishes a rate, replacing any earlier one for the same currency pair
    pub fn publish(&self, rate: ExchangeRate) {
        let mut rates = self.rates.write();
        let published = rates.entry((rate.rate_type, rate.date)).or_default();
        published.retain(|existing| !existing.converts(rate.from_currency, rate.to_currency));
        published.push(rate);
    }

    pub fn len(&self) -> usize {
        self.rates.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DomainPort for InMemoryExchangeRates {}

impl ExchangeRateSource for InMemoryExchangeRates {
    fn get_rates(
        &self,
        rate_type: ExchangeRateType,
        date: NaiveDate,
    ) -> Result<Vec<ExchangeRate>, PortError> {
        Ok(self
            .rates
            .read()
            .get(&(rate_type, date))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::CurrencyId;
    use rust_decimal_macros::dec;

    fn rate(rate_type: ExchangeRateType, date: NaiveDate, value: rust_decimal::Decimal) -> ExchangeRate {
        ExchangeRate::new(rate_type, date, CurrencyId::new(1), CurrencyId::new(2), value).unwrap()
    }

    #[test]
    fn test_rates_are_keyed_by_type_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let source = InMemoryExchangeRates::with_rates([
            rate(ExchangeRateType::EndOfMonthValuation, date, dec!(17.0)),
            rate(ExchangeRateType::Daily, date, dec!(17.2)),
        ]);

        let closing = source.get_rates(ExchangeRateType::EndOfMonthValuation, date).unwrap();
        assert_eq!(closing.len(), 1);
        assert_eq!(closing[0].value(), dec!(17.0));
        assert!(source
            .get_rates(ExchangeRateType::Daily, date.pred_opt().unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_publish_replaces_same_pair() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let source = InMemoryExchangeRates::new();
        source.publish(rate(ExchangeRateType::Daily, date, dec!(17.0)));
        source.publish(rate(ExchangeRateType::Daily, date, dec!(17.5)));
        assert_eq!(source.len(), 1);
    }
}
