//! Property-based tests for balance assembly
//!
//! Every generated book is balanced in pesos, so each property is checked
//! against books that must pass validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_ledger::AccountNumber;
use domain_trial_balance::adapters::LedgerMovement;
use domain_trial_balance::{BalanceAmounts, ItemType, TrialBalance, TrialBalanceType};
use test_utils::*;

fn books_with(movements: Vec<LedgerMovement>) -> TestBooks {
    init_test_tracing();
    BooksBuilder::new().with_movements(movements).build()
}

fn summary_current(balance: &TrialBalance, account: &str, ledger: core_kernel::LedgerId) -> Decimal {
    balance
        .account_rows(account)
        .find(|e| e.item_type == ItemType::Summary && e.ledger_id() == Some(ledger))
        .map_or(Decimal::ZERO, |e| e.amounts.current)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn balanced_books_consolidate_to_zero(movements in balanced_movements_strategy(6)) {
        let books = books_with(movements);
        let balance = books.builder().build(&QueryFixtures::traditional()).unwrap();
        let total = balance.consolidated_total().unwrap();
        prop_assert_eq!(total.amounts.current, Decimal::ZERO);
    }

    #[test]
    fn every_recipe_accepts_balanced_books(
        movements in balanced_movements_strategy(6),
        trial_balance_type in prop_oneof![
            Just(TrialBalanceType::Traditional),
            Just(TrialBalanceType::AnalyticByAccount),
            Just(TrialBalanceType::ByAccountWithLedgers),
        ],
        cascade in any::<bool>(),
    ) {
        let books = books_with(movements);
        let mut query = QueryFixtures::january(trial_balance_type);
        query.show_cascade_balances = cascade && trial_balance_type == TrialBalanceType::Traditional;
        let balance = books.builder().build(&query).unwrap();
        assert_debits_equal_credits(&balance);
        assert_report_ordered(&balance);
    }

    #[test]
    fn summaries_add_up_across_split_books(
        first in balanced_movements_strategy(3),
        second in balanced_movements_strategy(3),
    ) {
        let query = QueryFixtures::traditional();
        let whole = books_with(first.iter().cloned().chain(second.iter().cloned()).collect());
        let whole = whole.builder().build(&query).unwrap();
        let first = books_with(first).builder().build(&query).unwrap();
        let second = books_with(second).builder().build(&query).unwrap();

        for ledger in [LedgerFixtures::MAIN, LedgerFixtures::BRANCH] {
            for account in ["1", "1-01", "2", "3"] {
                prop_assert_eq!(
                    summary_current(&whole, account, ledger),
                    summary_current(&first, account, ledger) + summary_current(&second, account, ledger),
                    "account {} ledger {}", account, ledger
                );
            }
        }
    }

    #[test]
    fn level_cutoff_only_removes_deeper_rows(
        movements in balanced_movements_strategy(4),
        level in 1u32..4,
    ) {
        let books = books_with(movements);
        let full = books.builder().build(&QueryFixtures::traditional()).unwrap();
        let cut = books
            .builder()
            .build(&QueryFixtures::traditional().with_level(level))
            .unwrap();

        let expected: Vec<_> = full
            .entries
            .iter()
            .filter(|e| e.item_type.is_total() || e.account_level <= level)
            .cloned()
            .collect();
        prop_assert_eq!(&cut.entries, &expected);
        assert_max_level(&cut, level);
    }

    #[test]
    fn every_posting_has_its_ancestors(movements in balanced_movements_strategy(4)) {
        let books = books_with(movements);
        let balance = books.builder().build(&QueryFixtures::traditional()).unwrap();

        for posting in balance.of_type(ItemType::Entry) {
            let mut parent = posting.account.as_ref().and_then(AccountNumber::parent_number);
            while let Some(number) = parent {
                let found = balance.account_rows(number.as_str()).any(|e| {
                    e.item_type == ItemType::Summary && e.ledger_id() == posting.ledger_id()
                });
                prop_assert!(found, "no summary {} for {:?}", number, posting.account);
                parent = number.parent_number();
            }
        }
    }

    #[test]
    fn valuing_and_unvaluing_restores_amounts(
        initial in amount_strategy(),
        debit in amount_strategy(),
        credit in amount_strategy(),
        rate in rate_strategy(),
    ) {
        let amounts = BalanceAmounts {
            initial,
            debit,
            credit,
            current: initial + debit - credit,
            average: initial,
        };
        let valued = amounts.scaled(rate);
        prop_assert_eq!(valued.scaled(Decimal::ONE), valued);
        prop_assert_eq!(valued.divided(rate).unwrap(), amounts);
    }
}
