//! Custom Test Assertions
//!
//! Helpers over built trial balances that fail with the row that broke the
//! expectation instead of a bare boolean.

use rust_decimal::Decimal;
use std::cmp::Ordering;

use domain_trial_balance::restriction::report_order;
use domain_trial_balance::{ItemType, TrialBalance, TrialBalanceEntry};

/// Asserts that two amounts differ by at most `tolerance`
pub fn assert_amount_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Amounts differ by more than tolerance: actual={actual}, expected={expected}, diff={diff}, tolerance={tolerance}"
    );
}

/// Finds the row of `item_type` for `account` in `sector`, any ledger or currency
pub fn find_row<'a>(
    balance: &'a TrialBalance,
    item_type: ItemType,
    account: &str,
    sector: &str,
) -> Option<&'a TrialBalanceEntry> {
    balance.entries.iter().find(|e| {
        e.item_type == item_type
            && e.account.as_ref().map(|n| n.as_str()) == Some(account)
            && e.sector.as_str() == sector
    })
}

/// Current balance of the row of `item_type` for `account` in the root sector
///
/// # Panics
///
/// Panics if the balance has no such row
pub fn current_of(balance: &TrialBalance, item_type: ItemType, account: &str) -> Decimal {
    find_row(balance, item_type, account, "00")
        .unwrap_or_else(|| panic!("no {item_type:?} row for account {account}"))
        .amounts
        .current
}

/// Asserts the grand consolidated total carries `expected` as current balance
pub fn assert_consolidated_current(balance: &TrialBalance, expected: Decimal) {
    let total = balance
        .consolidated_total()
        .unwrap_or_else(|| panic!("balance has no consolidated total: {:#?}", balance.entries));
    assert_eq!(
        total.amounts.current, expected,
        "consolidated current balance: actual={}, expected={expected}",
        total.amounts.current
    );
}

/// Asserts that every adjacent pair of rows is in report order
pub fn assert_report_ordered(balance: &TrialBalance) {
    for pair in balance.entries.windows(2) {
        assert_ne!(
            report_order(&pair[0], &pair[1]),
            Ordering::Greater,
            "rows out of order:\n{:#?}\n{:#?}",
            pair[0],
            pair[1]
        );
    }
}

/// Asserts that no account row sits deeper than `level`
pub fn assert_max_level(balance: &TrialBalance, level: u32) {
    for entry in balance.entries.iter().filter(|e| e.item_type.is_account_row()) {
        assert!(
            entry.account_level <= level,
            "row deeper than level {level}: {:?} {:?}",
            entry.item_type,
            entry.account
        );
    }
}

/// Asserts debits equal credits across the debtor and creditor totals
pub fn assert_debits_equal_credits(balance: &TrialBalance) {
    let (debit, credit) = balance
        .entries
        .iter()
        .filter(|e| matches!(e.item_type, ItemType::TotalDebtor | ItemType::TotalCreditor))
        .fold((Decimal::ZERO, Decimal::ZERO), |(debit, credit), e| {
            (debit + e.amounts.debit, credit + e.amounts.credit)
        });
    assert_eq!(debit, credit, "debits {debit} differ from credits {credit}");
}
