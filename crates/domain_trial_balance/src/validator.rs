//! Cross-total consistency checks
//!
//! Every check compares two amounts within the configured tolerance and
//! fails the build on the first mismatch.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use core_kernel::{within_tolerance, CurrencyId, LedgerId};
use domain_ledger::DebtorCreditor;

use crate::entry::{ItemType, TrialBalanceEntry};
use crate::error::{ConsistencyCheck, TrialBalanceError};
use crate::rollup::consolidation_basis;

/// Checks totals of a built balance against each other
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyValidator {
    tolerance: Decimal,
    account_range_filtered: bool,
}

fn scope(parts: &[(&str, Option<String>)]) -> String {
    let parts: Vec<String> = parts
        .iter()
        .map(|(label, value)| format!("{label} {}", value.as_deref().unwrap_or("all")))
        .collect();
    parts.join(" / ")
}

fn ledger_label(entry: &TrialBalanceEntry) -> Option<String> {
    entry.ledger.as_ref().map(|l| l.number.clone())
}

fn currency_label(entry: &TrialBalanceEntry) -> Option<String> {
    entry.currency.as_ref().map(|c| c.code.clone())
}

impl ConsistencyValidator {
    pub fn new(tolerance: Decimal) -> Self {
        Self {
            tolerance,
            account_range_filtered: false,
        }
    }

    /// Marks the balance as narrowed by an account range, which makes the
    /// debits-equal-credits identity inapplicable
    pub fn with_account_range(mut self, filtered: bool) -> Self {
        self.account_range_filtered = filtered;
        self
    }

    fn ensure(
        &self,
        check: ConsistencyCheck,
        scope: impl FnOnce() -> String,
        computed: Decimal,
        expected: Decimal,
    ) -> Result<(), TrialBalanceError> {
        if within_tolerance(computed, expected, self.tolerance) {
            return Ok(());
        }
        let scope = scope();
        warn!(%check, %scope, %computed, %expected, "consistency check failed");
        Err(TrialBalanceError::ConsistencyValidation {
            check,
            scope,
            computed,
            expected,
        })
    }

    /// Runs every check that applies to `entries`
    ///
    /// `postings` are the posting rows before level restriction, so group
    /// totals can be checked even when their postings are not reported.
    pub fn validate(
        &self,
        entries: &[TrialBalanceEntry],
        postings: &[TrialBalanceEntry],
    ) -> Result<(), TrialBalanceError> {
        let postings: Vec<&TrialBalanceEntry> = postings
            .iter()
            .filter(|e| e.item_type == ItemType::Entry)
            .collect();

        self.check_groups(entries, &postings)?;
        self.check_groups_vs_totals(entries)?;
        if self.account_range_filtered {
            debug!("account range active, debit/credit identity skipped");
        } else {
            self.check_debits_equal_credits(entries)?;
        }
        self.check_consolidation(entries)?;
        self.check_subledger_groups(entries, &postings)?;
        Ok(())
    }

    fn check_groups(
        &self,
        entries: &[TrialBalanceEntry],
        postings: &[&TrialBalanceEntry],
    ) -> Result<(), TrialBalanceError> {
        for total in entries.iter() {
            let (check, nature) = match total.item_type {
                ItemType::TotalGroupDebtor => (ConsistencyCheck::DebtorGroup, DebtorCreditor::Debtor),
                ItemType::TotalGroupCreditor => {
                    (ConsistencyCheck::CreditorGroup, DebtorCreditor::Creditor)
                }
                _ => continue,
            };
            let computed: Decimal = postings
                .iter()
                .filter(|p| {
                    p.debtor_creditor == Some(nature)
                        && p.group_number == total.group_number
                        && p.currency_id() == total.currency_id()
                        && p.ledger_id() == total.ledger_id()
                })
                .map(|p| p.amounts.current)
                .sum();
            self.ensure(
                check,
                || {
                    scope(&[
                        ("group", total.group_number.clone()),
                        ("currency", currency_label(total)),
                        ("ledger", ledger_label(total)),
                    ])
                },
                computed,
                total.amounts.current,
            )?;
        }
        Ok(())
    }

    fn check_groups_vs_totals(&self, entries: &[TrialBalanceEntry]) -> Result<(), TrialBalanceError> {
        type Scope = (Option<LedgerId>, Option<CurrencyId>, DebtorCreditor);
        let mut group_sums: BTreeMap<Scope, Decimal> = BTreeMap::new();
        for group in entries.iter().filter(|e| {
            matches!(e.item_type, ItemType::TotalGroupDebtor | ItemType::TotalGroupCreditor)
        }) {
            if let Some(nature) = group.debtor_creditor {
                *group_sums
                    .entry((group.ledger_id(), group.currency_id(), nature))
                    .or_default() += group.amounts.current;
            }
        }
        if group_sums.is_empty() {
            return Ok(());
        }

        for total in entries
            .iter()
            .filter(|e| matches!(e.item_type, ItemType::TotalDebtor | ItemType::TotalCreditor))
        {
            let Some(nature) = total.debtor_creditor else {
                continue;
            };
            let computed = group_sums
                .get(&(total.ledger_id(), total.currency_id(), nature))
                .copied()
                .unwrap_or_default();
            self.ensure(
                ConsistencyCheck::GroupsVsTotal,
                || {
                    scope(&[
                        ("total", Some(nature.to_string())),
                        ("currency", currency_label(total)),
                        ("ledger", ledger_label(total)),
                    ])
                },
                computed,
                total.amounts.current,
            )?;
        }
        Ok(())
    }

    fn check_debits_equal_credits(&self, entries: &[TrialBalanceEntry]) -> Result<(), TrialBalanceError> {
        let (debit, credit) = entries
            .iter()
            .filter(|e| matches!(e.item_type, ItemType::TotalDebtor | ItemType::TotalCreditor))
            .fold((Decimal::ZERO, Decimal::ZERO), |(debit, credit), e| {
                (debit + e.amounts.debit, credit + e.amounts.credit)
            });
        self.ensure(
            ConsistencyCheck::DebitsEqualCredits,
            || "all ledgers and currencies".to_string(),
            debit,
            credit,
        )
    }

    fn check_consolidation(&self, entries: &[TrialBalanceEntry]) -> Result<(), TrialBalanceError> {
        let basis = consolidation_basis(entries);

        for by_ledger in entries
            .iter()
            .filter(|e| e.item_type == ItemType::TotalConsolidatedByLedger)
        {
            let computed: Decimal = basis
                .iter()
                .filter(|t| t.ledger_id() == by_ledger.ledger_id())
                .map(|t| t.amounts.current)
                .sum();
            self.ensure(
                ConsistencyCheck::ConsolidatedByLedger,
                || scope(&[("ledger", ledger_label(by_ledger))]),
                computed,
                by_ledger.amounts.current,
            )?;
        }

        if let Some(grand) = entries
            .iter()
            .find(|e| e.item_type == ItemType::TotalConsolidated)
        {
            let computed: Decimal = basis.iter().map(|t| t.amounts.current).sum();
            self.ensure(
                ConsistencyCheck::ConsolidatedTotal,
                || "all ledgers and currencies".to_string(),
                computed,
                grand.amounts.current,
            )?;
        }
        Ok(())
    }

    fn check_subledger_groups(
        &self,
        entries: &[TrialBalanceEntry],
        postings: &[&TrialBalanceEntry],
    ) -> Result<(), TrialBalanceError> {
        for group in entries.iter().filter(|e| e.item_type == ItemType::Group) {
            let computed: Decimal = postings
                .iter()
                .filter(|p| {
                    p.subledger_account.is_some()
                        && p.account == group.account
                        && p.sector == group.sector
                        && p.currency_id() == group.currency_id()
                        && p.ledger_id() == group.ledger_id()
                })
                .map(|p| p.amounts.current)
                .sum();
            self.ensure(
                ConsistencyCheck::SubledgerGroup,
                || {
                    scope(&[
                        ("account", group.account.as_ref().map(|n| n.to_string())),
                        ("currency", currency_label(group)),
                        ("ledger", ledger_label(group)),
                    ])
                },
                computed,
                group.amounts.current,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::StandardAccountId;
    use domain_ledger::{AccountNumber, CurrencyRef, LedgerRef, SectorCode};
    use rust_decimal_macros::dec;

    use crate::entry::{BalanceAmounts, PostingEntry};
    use crate::rollup::{consolidated_totals, currency_totals, debtor_creditor_totals, group_totals};

    fn posting(account: &str, nature: DebtorCreditor, debit: Decimal, credit: Decimal) -> TrialBalanceEntry {
        let posting = PostingEntry {
            ledger: LedgerRef { id: LedgerId::new(1), number: "01".into() },
            currency: CurrencyRef::new(CurrencyId::new(1), "01"),
            account: AccountNumber::parse(account).unwrap(),
            standard_account_id: StandardAccountId::new(1),
            sector: SectorCode::root(),
            subledger_account: None,
            debtor_creditor: nature,
            amounts: BalanceAmounts::for_movements(nature, Decimal::ZERO, debit, credit, Decimal::ZERO),
            last_change_date: None,
            exchange_rate: Decimal::ONE,
            second_exchange_rate: Decimal::ONE,
        };
        TrialBalanceEntry::from_posting(&posting, None)
    }

    fn assemble(postings: Vec<TrialBalanceEntry>) -> Vec<TrialBalanceEntry> {
        let groups = group_totals(&postings);
        let dc = debtor_creditor_totals(&postings);
        let currency = currency_totals(dc.values());
        let consolidated = consolidated_totals(currency.values());
        postings
            .into_iter()
            .chain(groups.into_entries())
            .chain(dc.into_entries())
            .chain(currency.into_entries())
            .chain(consolidated.into_entries())
            .collect()
    }

    #[test]
    fn test_balanced_books_pass() {
        let entries = assemble(vec![
            posting("1-01", DebtorCreditor::Debtor, dec!(500), dec!(0)),
            posting("2-01", DebtorCreditor::Creditor, dec!(0), dec!(500)),
        ]);
        assert!(ConsistencyValidator::new(dec!(10)).validate(&entries, &entries).is_ok());
    }

    #[test]
    fn test_unbalanced_books_fail_without_range() {
        let entries = assemble(vec![posting("1-01", DebtorCreditor::Debtor, dec!(100), dec!(0))]);
        let result = ConsistencyValidator::new(dec!(10)).validate(&entries, &entries);
        assert!(matches!(
            result,
            Err(TrialBalanceError::ConsistencyValidation {
                check: ConsistencyCheck::DebitsEqualCredits,
                ..
            })
        ));
    }

    #[test]
    fn test_range_filter_skips_debit_credit_identity() {
        let entries = assemble(vec![posting("1-01", DebtorCreditor::Debtor, dec!(100), dec!(0))]);
        let validator = ConsistencyValidator::new(dec!(10)).with_account_range(true);
        assert!(validator.validate(&entries, &entries).is_ok());
    }

    #[test]
    fn test_difference_within_tolerance_passes() {
        let entries = assemble(vec![
            posting("1-01", DebtorCreditor::Debtor, dec!(505), dec!(0)),
            posting("2-01", DebtorCreditor::Creditor, dec!(0), dec!(500)),
        ]);
        assert!(ConsistencyValidator::new(dec!(10)).validate(&entries, &entries).is_ok());
        assert!(ConsistencyValidator::new(dec!(1)).validate(&entries, &entries).is_err());
    }

    #[test]
    fn test_tampered_group_total_is_reported() {
        let mut entries = assemble(vec![
            posting("1-01", DebtorCreditor::Debtor, dec!(500), dec!(0)),
            posting("2-01", DebtorCreditor::Creditor, dec!(0), dec!(500)),
        ]);
        for entry in entries.iter_mut() {
            if entry.item_type == ItemType::TotalGroupDebtor {
                entry.amounts.current += dec!(50);
            }
        }
        match ConsistencyValidator::new(dec!(10)).validate(&entries, &entries) {
            Err(TrialBalanceError::ConsistencyValidation { check, scope, computed, expected }) => {
                assert_eq!(check, ConsistencyCheck::DebtorGroup);
                assert!(scope.contains("group 1000"));
                assert_eq!(computed, dec!(500));
                assert_eq!(expected, dec!(550));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_tampered_consolidated_total_is_reported() {
        let mut entries = assemble(vec![
            posting("1-01", DebtorCreditor::Debtor, dec!(500), dec!(0)),
            posting("2-01", DebtorCreditor::Creditor, dec!(0), dec!(400)),
        ]);
        for entry in entries.iter_mut() {
            if entry.item_type == ItemType::TotalConsolidated {
                entry.amounts.current = dec!(999);
            }
        }
        let validator = ConsistencyValidator::new(dec!(10)).with_account_range(true);
        assert!(matches!(
            validator.validate(&entries, &entries),
            Err(TrialBalanceError::ConsistencyValidation {
                check: ConsistencyCheck::ConsolidatedTotal,
                ..
            })
        ));
    }
}
