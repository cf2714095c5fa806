//! Property-Based Test Generators
//!
//! Proptest strategies over the sample books. Movement strategies only use
//! posting accounts of `ChartFixtures::sample()` so every generated movement
//! can be recorded.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_ledger::AccountNumber;
use domain_trial_balance::adapters::LedgerMovement;

use crate::builders::MovementBuilder;
use crate::fixtures::{CurrencyFixtures, LedgerFixtures, TemporalFixtures};

const DEBTOR_ACCOUNTS: [&str; 2] = ["1-01-01", "1-01-02"];
const CREDITOR_ACCOUNTS: [&str; 2] = ["2-01-01", "3-01"];

/// Strategy for segmented account numbers of one to five levels
pub fn account_number_strategy() -> impl Strategy<Value = AccountNumber> {
    (1u32..10u32, proptest::collection::vec(1u32..100u32, 0..5)).prop_map(|(head, tail)| {
        let number = tail
            .into_iter()
            .fold(head.to_string(), |acc, segment| format!("{acc}-{segment:02}"));
        AccountNumber::parse(&number).unwrap()
    })
}

/// Strategy for positive amounts with cents, up to ten million
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for exchange rates between 0.0001 and 100
pub fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Strategy for dates from 1 December 2023 to 31 January 2024
pub fn movement_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..62i64).prop_map(|offset| TemporalFixtures::date(2023, 12, 1) + chrono::Duration::days(offset))
}

/// Strategy for a debit to a debtor account and the matching credit to a
/// creditor account, in pesos, in either ledger
pub fn balanced_pair_strategy() -> impl Strategy<Value = [LedgerMovement; 2]> {
    (
        amount_strategy(),
        0usize..DEBTOR_ACCOUNTS.len(),
        0usize..CREDITOR_ACCOUNTS.len(),
        prop_oneof![Just(LedgerFixtures::MAIN), Just(LedgerFixtures::BRANCH)],
        movement_date_strategy(),
    )
        .prop_map(|(amount, debtor, creditor, ledger, date)| {
            [
                MovementBuilder::new(DEBTOR_ACCOUNTS[debtor])
                    .in_ledger(ledger)
                    .in_currency(CurrencyFixtures::PESO)
                    .on(date)
                    .debit(amount)
                    .build(),
                MovementBuilder::new(CREDITOR_ACCOUNTS[creditor])
                    .in_ledger(ledger)
                    .in_currency(CurrencyFixtures::PESO)
                    .on(date)
                    .credit(amount)
                    .build(),
            ]
        })
}

/// Strategy for up to `max_pairs` balanced movement pairs
pub fn balanced_movements_strategy(max_pairs: usize) -> impl Strategy<Value = Vec<LedgerMovement>> {
    proptest::collection::vec(balanced_pair_strategy(), 1..=max_pairs)
        .prop_map(|pairs| pairs.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn account_numbers_have_one_to_five_levels(number in account_number_strategy()) {
            prop_assert!((1..=5).contains(&number.level()));
        }

        #[test]
        fn amounts_are_positive(amount in amount_strategy()) {
            prop_assert!(amount > Decimal::ZERO);
        }

        #[test]
        fn pairs_balance(movements in balanced_movements_strategy(4)) {
            let debit: Decimal = movements.iter().map(|m| m.debit).sum();
            let credit: Decimal = movements.iter().map(|m| m.credit).sum();
            prop_assert_eq!(debit, credit);
        }
    }
}
