//! Integration tests for the balance assembly pipeline

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_kernel::{DomainPort, PortError, StandardAccountId};
use domain_ledger::{Account, AccountRole, AccountsChart, DebtorCreditor};
use domain_trial_balance::adapters::InMemoryPostingStore;
use domain_trial_balance::{
    ConsistencyCheck, ItemType, PostingEntry, PostingQuery, PostingRepository, TrialBalanceBuilder,
    TrialBalanceCache, TrialBalanceError, TrialBalanceType, ValuationOptions,
};
use test_utils::*;

/// The January books used by most tests
///
/// Opening (December): 1-01-02 debit 1000 / 3-01 credit 1000.
/// January: 1-01-01 debit 300 / 2-01-01 credit 300, 1-01-01 debit 100 / 1-01-02 credit 100.
fn january_books() -> BooksBuilder {
    init_test_tracing();
    let december = TemporalFixtures::before_january();
    BooksBuilder::new().with_movements([
        MovementBuilder::new("1-01-02").on(december).debit(dec!(1000)).build(),
        MovementBuilder::new("3-01").on(december).credit(dec!(1000)).build(),
        MovementBuilder::new("1-01-01").debit(dec!(300)).build(),
        MovementBuilder::new("2-01-01").credit(dec!(300)).build(),
        MovementBuilder::new("1-01-01").debit(dec!(100)).build(),
        MovementBuilder::new("1-01-02").credit(dec!(100)).build(),
    ])
}

// ============================================================================
// Traditional Balance Tests
// ============================================================================

mod traditional_tests {
    use super::*;

    #[test]
    fn test_posting_and_summary_rows() {
        let books = january_books().build();
        let balance = books.builder().build(&QueryFixtures::traditional()).unwrap();

        assert_eq!(current_of(&balance, ItemType::Entry, "1-01-01"), dec!(400));
        assert_eq!(current_of(&balance, ItemType::Entry, "1-01-02"), dec!(900));
        assert_eq!(current_of(&balance, ItemType::Summary, "1-01"), dec!(1300));
        assert_eq!(current_of(&balance, ItemType::Summary, "1"), dec!(1300));
        assert_eq!(current_of(&balance, ItemType::Summary, "2"), dec!(300));
        assert_eq!(current_of(&balance, ItemType::Summary, "3"), dec!(1000));

        let opening = find_row(&balance, ItemType::Entry, "1-01-02", "00").unwrap();
        assert_eq!(opening.amounts.initial, dec!(1000));
        assert_eq!(opening.amounts.credit, dec!(100));
    }

    #[test]
    fn test_totals_and_consolidation() {
        let books = january_books().build();
        let balance = books.builder().build(&QueryFixtures::traditional()).unwrap();

        let debtor = balance.of_type(ItemType::TotalDebtor).next().unwrap();
        let creditor = balance.of_type(ItemType::TotalCreditor).next().unwrap();
        assert_eq!(debtor.amounts.current, dec!(1300));
        assert_eq!(creditor.amounts.current, dec!(1300));
        assert_eq!(balance.of_type(ItemType::TotalGroupDebtor).count(), 1);
        assert_eq!(balance.of_type(ItemType::TotalGroupCreditor).count(), 2);

        assert_consolidated_current(&balance, Decimal::ZERO);
        assert_debits_equal_credits(&balance);
        assert_report_ordered(&balance);
    }

    #[test]
    fn test_level_restriction_keeps_totals() {
        let books = january_books().build();
        let query = QueryFixtures::traditional().with_level(2);
        let balance = books.builder().build(&query).unwrap();

        assert_max_level(&balance, 2);
        assert!(find_row(&balance, ItemType::Entry, "1-01-01", "00").is_none());
        assert!(find_row(&balance, ItemType::Entry, "3-01", "00").is_some());
        assert_eq!(current_of(&balance, ItemType::Summary, "1-01"), dec!(1300));
        assert!(balance.consolidated_total().is_some());
    }

    #[test]
    fn test_consolidated_merges_ledgers() {
        let books = january_books()
            .with_movements([
                MovementBuilder::new("1-01-01").in_ledger(LedgerFixtures::BRANCH).debit(dec!(50)).build(),
                MovementBuilder::new("2-01-01").in_ledger(LedgerFixtures::BRANCH).credit(dec!(50)).build(),
            ])
            .build();
        let mut query = QueryFixtures::traditional();
        query.consolidated = true;
        let balance = books.builder().build(&query).unwrap();

        let cash = find_row(&balance, ItemType::Entry, "1-01-01", "00").unwrap();
        assert!(cash.ledger.is_none());
        assert_eq!(cash.amounts.current, dec!(450));
        assert_eq!(balance.of_type(ItemType::TotalConsolidatedByLedger).count(), 0);
    }

    #[test]
    fn test_ledger_filter() {
        let books = january_books()
            .with_movement(
                MovementBuilder::new("1-01-01").in_ledger(LedgerFixtures::BRANCH).debit(dec!(50)).build(),
            )
            .with_movement(
                MovementBuilder::new("2-01-01").in_ledger(LedgerFixtures::BRANCH).credit(dec!(50)).build(),
            )
            .build();
        let query = QueryFixtures::traditional().with_ledgers(vec![LedgerFixtures::BRANCH]);
        let balance = books.builder().build(&query).unwrap();

        assert_eq!(current_of(&balance, ItemType::Entry, "1-01-01"), dec!(50));
        assert!(balance
            .entries
            .iter()
            .filter_map(|e| e.ledger.as_ref())
            .all(|ledger| ledger.id == LedgerFixtures::BRANCH));
    }
}

// ============================================================================
// Sectorization Tests
// ============================================================================

mod sectorization_tests {
    use super::*;

    fn sectorized_query() -> domain_trial_balance::TrialBalanceQuery {
        let mut query = QueryFixtures::traditional();
        query.with_sectorization = true;
        query
    }

    #[test]
    fn test_sector_parents_and_root_twin() {
        let books = january_books()
            .with_movements([
                MovementBuilder::new("1-02-01").in_sector("0101").debit(dec!(200)).build(),
                MovementBuilder::new("1-02-01").in_sector("0102").debit(dec!(50)).build(),
                MovementBuilder::new("3-01").credit(dec!(250)).build(),
            ])
            .build();
        let balance = books.builder().build(&sectorized_query()).unwrap();

        let row = |account: &str, sector: &str| {
            find_row(&balance, ItemType::Summary, account, sector).map(|e| e.amounts.current)
        };
        assert_eq!(row("1-02-01", "01"), Some(dec!(250)));
        assert_eq!(row("1-02", "0101"), Some(dec!(200)));
        assert_eq!(row("1-02", "01"), Some(dec!(250)));
        // top-level account in the root sector carries every sector
        assert_eq!(row("1", "00"), Some(dec!(1550)));
        assert!(row("1-02-01", "00").is_none());
    }

    #[test]
    fn test_single_sector_twin_is_pruned() {
        let books = BooksBuilder::new()
            .with_movements([
                MovementBuilder::new("1-02-01").in_sector("02").debit(dec!(80)).build(),
                MovementBuilder::new("3-01").in_sector("02").credit(dec!(80)).build(),
            ])
            .build();
        let balance = books.builder().build(&sectorized_query()).unwrap();

        assert!(find_row(&balance, ItemType::Summary, "1", "00").is_none());
        assert_eq!(
            find_row(&balance, ItemType::Summary, "1", "02").map(|e| e.amounts.current),
            Some(dec!(80))
        );
    }

    #[test]
    fn test_unsectorized_build_folds_sectors() {
        let books = BooksBuilder::new()
            .with_movements([
                MovementBuilder::new("1-02-01").in_sector("0101").debit(dec!(20)).build(),
                MovementBuilder::new("1-02-01").in_sector("02").debit(dec!(30)).build(),
                MovementBuilder::new("3-01").credit(dec!(50)).build(),
            ])
            .build();
        let balance = books.builder().build(&QueryFixtures::traditional()).unwrap();

        assert_eq!(current_of(&balance, ItemType::Entry, "1-02-01"), dec!(50));
        assert!(balance.entries.iter().all(|e| e.sector.is_root()));
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

mod scenario_tests {
    use super::*;

    fn cash_chart() -> AccountsChart {
        let mut chart = AccountsChart::new(ChartFixtures::CHART, "Caja");
        let accounts = [
            ("1-01", AccountRole::Summary),
            ("1-01-01", AccountRole::Posting),
            ("1-01-02", AccountRole::Posting),
        ];
        for (idx, (number, role)) in accounts.into_iter().enumerate() {
            chart
                .add_account(Account::new(
                    StandardAccountId::new(idx as i64 + 1),
                    ChartFixtures::number(number),
                    number,
                    role,
                    DebtorCreditor::Debtor,
                ))
                .unwrap();
        }
        chart
    }

    fn cash_books() -> TestBooks {
        init_test_tracing();
        BooksBuilder::new()
            .with_chart(cash_chart())
            .with_movements([
                MovementBuilder::new("1-01-01").debit(dec!(60)).build(),
                MovementBuilder::new("1-01-02").debit(dec!(40)).build(),
            ])
            .build()
    }

    #[test]
    fn test_children_roll_up_into_summary() {
        let books = cash_books();
        let query = QueryFixtures::traditional().with_account_range(Some("1-01"), Some("1-01-02"));
        let balance = books.builder().build(&query).unwrap();

        assert_eq!(current_of(&balance, ItemType::Summary, "1-01"), dec!(100));
        let debtor = balance.of_type(ItemType::TotalDebtor).next().unwrap();
        assert_eq!(debtor.amounts.current, dec!(100));
        assert_eq!(balance.of_type(ItemType::TotalCreditor).count(), 0);
    }

    #[test]
    fn test_unbalanced_books_fail_without_range() {
        let books = cash_books();
        let error = books.builder().build(&QueryFixtures::traditional()).unwrap_err();
        match error {
            TrialBalanceError::ConsistencyValidation {
                check,
                computed,
                expected,
                ..
            } => {
                assert_eq!(check, ConsistencyCheck::DebitsEqualCredits);
                assert_eq!(computed, dec!(100));
                assert_eq!(expected, Decimal::ZERO);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_difference_within_tolerance_is_accepted() {
        init_test_tracing();
        let books = BooksBuilder::new()
            .with_chart(cash_chart())
            .with_movement(MovementBuilder::new("1-01-01").debit(dec!(5)).build())
            .build();
        assert!(books.builder().build(&QueryFixtures::traditional()).is_ok());
    }
}

// ============================================================================
// Failure Tests
// ============================================================================

mod failure_tests {
    use super::*;

    /// Counts retrievals before delegating to the in-memory store
    struct CountingPostings {
        inner: Arc<InMemoryPostingStore>,
        calls: AtomicUsize,
    }

    impl DomainPort for CountingPostings {}

    impl PostingRepository for CountingPostings {
        fn get_postings(&self, query: &PostingQuery) -> Result<Vec<PostingEntry>, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_postings(query)
        }
    }

    #[test]
    fn test_malformed_range_fails_before_retrieval() {
        let books = january_books().build();
        let counting = Arc::new(CountingPostings {
            inner: books.store.clone(),
            calls: AtomicUsize::new(0),
        });
        let builder = TrialBalanceBuilder::new(
            counting.clone(),
            books.rates.clone(),
            books.chart.clone(),
            books.sectors.clone(),
            books.settings.clone(),
        );

        let query = QueryFixtures::traditional().with_account_range(Some("1A-200"), None);
        let error = builder.build(&query).unwrap_err();
        assert!(matches!(error, TrialBalanceError::MalformedAccountRange(_)));
        assert!(error.is_input_error());
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);

        builder.build(&QueryFixtures::traditional()).unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_rate_aborts_without_caching() {
        let books = january_books()
            .with_rates(Vec::new())
            .with_movements([
                MovementBuilder::new("1-01-01").in_currency(CurrencyFixtures::DOLLAR).debit(dec!(10)).build(),
                MovementBuilder::new("2-01-01").in_currency(CurrencyFixtures::DOLLAR).credit(dec!(10)).build(),
            ])
            .build();
        let cache = Arc::new(TrialBalanceCache::new());
        let query = QueryFixtures::january(TrialBalanceType::Valued)
            .with_valuation(ValuationOptions::to(CurrencyFixtures::PESO));

        let error = books.cached_builder(cache.clone()).build(&query).unwrap_err();
        match error {
            TrialBalanceError::MissingExchangeRate { currency, date, .. } => {
                assert_eq!(currency, "USD");
                assert_eq!(date, TemporalFixtures::date(2024, 1, 31));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unsupported_combination_is_unhandled() {
        let books = january_books().build();
        let mut query = QueryFixtures::january(TrialBalanceType::AnalyticByAccount);
        query.with_sectorization = true;
        assert!(matches!(
            books.builder().build(&query),
            Err(TrialBalanceError::UnhandledVariant(_))
        ));
    }

    #[test]
    fn test_unknown_sector_in_postings_fails() {
        let books = BooksBuilder::new()
            .with_movements([
                MovementBuilder::new("1-02-01").in_sector("77").debit(dec!(5)).build(),
                MovementBuilder::new("3-01").credit(dec!(5)).build(),
            ])
            .build();
        let mut query = QueryFixtures::traditional();
        query.with_sectorization = true;
        assert!(matches!(
            books.builder().build(&query),
            Err(TrialBalanceError::Ledger(_))
        ));
    }
}

// ============================================================================
// Cache Tests
// ============================================================================

mod cache_tests {
    use super::*;

    #[test]
    fn test_second_build_is_served_from_cache() {
        let books = january_books().build();
        let cache = Arc::new(TrialBalanceCache::new());
        let builder = books.cached_builder(cache.clone());
        let query = QueryFixtures::traditional();

        let first = builder.build(&query).unwrap();
        let second = builder.build(&query).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidated_month_is_rebuilt() {
        let books = january_books().build();
        let cache = Arc::new(TrialBalanceCache::new());
        let builder = books.cached_builder(cache.clone());
        let query = QueryFixtures::traditional();
        let before = builder.build(&query).unwrap();

        books.record(MovementBuilder::new("1-01-01").debit(dec!(25)).build());
        books.record(MovementBuilder::new("2-01-01").credit(dec!(25)).build());
        let stale = builder.build(&query).unwrap();
        assert!(Arc::ptr_eq(&before, &stale));

        assert_eq!(cache.invalidate_month("2024-01").unwrap(), 1);
        let fresh = builder.build(&query).unwrap();
        assert_eq!(current_of(&fresh, ItemType::Entry, "1-01-01"), dec!(425));
    }

    #[test]
    fn test_disabled_cache_is_bypassed() {
        let books = january_books()
            .with_settings(domain_trial_balance::EngineSettings::default().without_cache())
            .build();
        let cache = Arc::new(TrialBalanceCache::new());
        books.cached_builder(cache.clone()).build(&QueryFixtures::traditional()).unwrap();
        assert!(cache.is_empty());
    }
}
