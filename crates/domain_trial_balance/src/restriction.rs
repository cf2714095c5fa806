//! Post-rollup filters and the final row order

use std::cmp::Ordering;
use std::collections::HashMap;

use core_kernel::{CurrencyId, LedgerId};
use domain_ledger::{AccountNumber, DebtorCreditor};

use crate::entry::{ItemType, TrialBalanceEntry};

/// Level a row is compared against the cutoff with
fn effective_level(entry: &TrialBalanceEntry, with_subledgers: bool) -> u32 {
    if with_subledgers && entry.subledger_account.is_some() {
        entry.account_level + 1
    } else {
        entry.account_level
    }
}

/// Drops account rows deeper than `cutoff`; totals always stay
///
/// A cutoff of 0 keeps every row. With subledger accounts, a subledger row
/// sits one level below its standard account.
pub fn restrict_levels(
    entries: Vec<TrialBalanceEntry>,
    cutoff: u32,
    with_subledgers: bool,
) -> Vec<TrialBalanceEntry> {
    if cutoff == 0 {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| {
            entry.item_type.is_total() || effective_level(entry, with_subledgers) <= cutoff
        })
        .collect()
}

/// Drops the sector "00" summary of an account when it has exactly one
/// sectorized sibling, since both rows then carry the same amounts
pub fn prune_sectorized_twins(entries: Vec<TrialBalanceEntry>) -> Vec<TrialBalanceEntry> {
    let mut variants: HashMap<(AccountNumber, Option<CurrencyId>, Option<LedgerId>), usize> =
        HashMap::new();
    for entry in entries.iter().filter(|e| e.item_type == ItemType::Summary) {
        if let Some(number) = &entry.account {
            *variants
                .entry((number.clone(), entry.currency_id(), entry.ledger_id()))
                .or_default() += 1;
        }
    }

    entries
        .into_iter()
        .filter(|entry| {
            if entry.item_type != ItemType::Summary || !entry.sector.is_root() {
                return true;
            }
            let Some(number) = &entry.account else {
                return true;
            };
            variants
                .get(&(number.clone(), entry.currency_id(), entry.ledger_id()))
                .map_or(true, |count| *count != 2)
        })
        .collect()
}

fn nature_rank(nature: Option<DebtorCreditor>) -> u8 {
    match nature {
        Some(DebtorCreditor::Debtor) => 0,
        Some(DebtorCreditor::Creditor) => 1,
        None => 2,
    }
}

fn item_rank(item_type: ItemType) -> u8 {
    match item_type {
        ItemType::Summary => 0,
        ItemType::Group => 1,
        _ => 2,
    }
}

/// Ordering of the final report
///
/// Ledger number, currency code, debtor before creditor, block (accounts,
/// group totals, debtor/creditor totals, currency totals, consolidations),
/// account or group number, sector, subledger. Rows without a ledger or a
/// currency sort after those that have one.
pub fn report_order(left: &TrialBalanceEntry, right: &TrialBalanceEntry) -> Ordering {
    let ledger = |e: &TrialBalanceEntry| {
        (e.ledger.is_none(), e.ledger.as_ref().map(|l| l.number.clone()))
    };
    let currency = |e: &TrialBalanceEntry| {
        (e.currency.is_none(), e.currency.as_ref().map(|c| c.code.clone()))
    };
    let number = |e: &TrialBalanceEntry| {
        e.account
            .as_ref()
            .map(|n| n.as_str().to_string())
            .or_else(|| e.group_number.clone())
    };
    let subledger = |e: &TrialBalanceEntry| e.subledger_account.as_ref().map(|s| s.number.clone());

    ledger(left)
        .cmp(&ledger(right))
        .then_with(|| currency(left).cmp(&currency(right)))
        .then_with(|| nature_rank(left.debtor_creditor).cmp(&nature_rank(right.debtor_creditor)))
        .then_with(|| left.item_type.block().cmp(&right.item_type.block()))
        .then_with(|| number(left).cmp(&number(right)))
        .then_with(|| left.sector.cmp(&right.sector))
        .then_with(|| subledger(left).cmp(&subledger(right)))
        .then_with(|| item_rank(left.item_type).cmp(&item_rank(right.item_type)))
        .then_with(|| left.item_type.cmp(&right.item_type))
}

/// Sorts rows into report order
pub fn sort_entries(entries: &mut [TrialBalanceEntry]) {
    entries.sort_by(report_order);
}
