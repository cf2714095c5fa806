//! Summarization passes
//!
//! Every pass feeds contributions into a `SummaryTable`: the first
//! contribution under a key seeds the accumulator with its metadata, later
//! ones are absorbed. Passes never touch the rows they read.
//!
//! | pass | reads | produces |
//! |---|---|---|
//! | sector parents | postings of sectorized accounts | `Summary` per parent sector |
//! | account parents | postings (and sector summaries) | `Summary` per ancestor account |
//! | groups | postings | `TotalGroupDebtor` / `TotalGroupCreditor` |
//! | debtor/creditor | postings | `TotalDebtor` / `TotalCreditor` |
//! | currency | debtor/creditor totals | `TotalCurrency` |
//! | consolidation | currency totals | `TotalConsolidatedByLedger`, `TotalConsolidated` |

use chrono::NaiveDate;
use std::collections::HashMap;

use domain_ledger::{AccountHierarchy, DebtorCreditor, SectorCode, SectorHierarchy};

use crate::entry::{ItemType, RollupTarget, SummaryKey, TrialBalanceEntry};
use crate::error::TrialBalanceError;

/// Hash-keyed accumulators of one or more passes
///
/// Accumulators are kept in first-contribution order, so a pass fed in the
/// same order always yields the same rows in the same order.
#[derive(Debug, Clone, Default)]
pub struct SummaryTable {
    index: HashMap<SummaryKey, usize>,
    entries: Vec<(SummaryKey, TrialBalanceEntry)>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `contribution` under `key`, seeding the accumulator on a miss
    pub fn accumulate(&mut self, key: SummaryKey, contribution: TrialBalanceEntry) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1.absorb(&contribution),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, contribution));
            }
        }
    }

    /// Absorbs every accumulator of `other`
    pub fn merge(&mut self, other: SummaryTable) {
        for (key, entry) in other.entries {
            self.accumulate(key, entry);
        }
    }

    pub fn get(&self, key: &SummaryKey) -> Option<&TrialBalanceEntry> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SummaryKey, &TrialBalanceEntry)> {
        self.entries.iter().map(|(key, entry)| (key, entry))
    }

    pub fn values(&self) -> impl Iterator<Item = &TrialBalanceEntry> + Clone {
        self.entries.iter().map(|(_, entry)| entry)
    }

    pub fn into_entries(self) -> Vec<TrialBalanceEntry> {
        self.entries.into_iter().map(|(_, entry)| entry).collect()
    }
}

/// Options of the account-parent pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParentRollup {
    /// Also accumulate into sector "00" at the top of the tree
    pub root_sector_twin: bool,
    /// Start at the row's own account when the row is a subledger posting
    pub include_own_account: bool,
}

fn key_for(
    entry: &TrialBalanceEntry,
    item_type: ItemType,
    target: RollupTarget,
    sector: SectorCode,
    debtor_creditor: Option<DebtorCreditor>,
) -> SummaryKey {
    SummaryKey {
        item_type,
        target,
        sector,
        subledger: None,
        currency: entry.currency_id(),
        ledger: entry.ledger_id(),
        debtor_creditor,
    }
}

/// Walks the account and sector trees
pub struct Summarizer<'a> {
    accounts: &'a dyn AccountHierarchy,
    sectors: &'a dyn SectorHierarchy,
    date: NaiveDate,
}

impl<'a> Summarizer<'a> {
    pub fn new(
        accounts: &'a dyn AccountHierarchy,
        sectors: &'a dyn SectorHierarchy,
        date: NaiveDate,
    ) -> Self {
        Self {
            accounts,
            sectors,
            date,
        }
    }

    /// Accumulates every row into each of its ancestor accounts
    ///
    /// With `root_sector_twin`, a row whose sector is not the root also
    /// feeds a sector "00" summary of the topmost ancestor, so sectorized
    /// and desectorized views of the top level exist side by side.
    pub fn parent_summaries(&self, rows: &[TrialBalanceEntry], options: ParentRollup) -> SummaryTable {
        let mut table = SummaryTable::new();
        for row in rows {
            let Some(number) = row.account.as_ref() else {
                continue;
            };
            let mut current = if options.include_own_account && row.subledger_account.is_some() {
                self.accounts.account(number)
            } else {
                self.accounts.parent(number)
            };

            while let Some(account) = current {
                let key = key_for(
                    row,
                    ItemType::Summary,
                    RollupTarget::Account(account.number.clone()),
                    row.sector.clone(),
                    None,
                );
                table.accumulate(key, row.summary_for(account, row.sector.clone()));

                let parent = self.accounts.parent(&account.number);
                if parent.is_none() && options.root_sector_twin && !row.sector.is_root() {
                    let key = key_for(
                        row,
                        ItemType::Summary,
                        RollupTarget::Account(account.number.clone()),
                        SectorCode::root(),
                        None,
                    );
                    table.accumulate(key, row.summary_for(account, SectorCode::root()));
                }
                current = parent;
            }
        }
        table
    }

    /// Accumulates rows of sectorized accounts into each parent sector of
    /// their own account, stopping before the root sector
    pub fn sector_parent_summaries(
        &self,
        rows: &[TrialBalanceEntry],
    ) -> Result<SummaryTable, TrialBalanceError> {
        let mut table = SummaryTable::new();
        for row in rows {
            let Some(account) = row.account.as_ref().and_then(|n| self.accounts.account(n)) else {
                continue;
            };
            if !account.requires_sectorization(self.date) {
                continue;
            }
            let mut sector = self.sectors.parent(&row.sector)?;
            while let Some(code) = sector.filter(|code| !code.is_root()) {
                let key = key_for(
                    row,
                    ItemType::Summary,
                    RollupTarget::Account(account.number.clone()),
                    code.clone(),
                    None,
                );
                table.accumulate(key, row.summary_for(account, code.clone()));
                sector = self.sectors.parent(&code)?;
            }
        }
        Ok(table)
    }
}

fn postings(rows: &[TrialBalanceEntry]) -> impl Iterator<Item = &TrialBalanceEntry> {
    rows.iter().filter(|row| row.item_type == ItemType::Entry)
}

/// Debtor and creditor totals per group, currency and ledger
pub fn group_totals(rows: &[TrialBalanceEntry]) -> SummaryTable {
    let mut table = SummaryTable::new();
    for row in postings(rows) {
        let (Some(nature), Some(group)) = (row.debtor_creditor, row.group_number.clone()) else {
            continue;
        };
        let item_type = match nature {
            DebtorCreditor::Debtor => ItemType::TotalGroupDebtor,
            DebtorCreditor::Creditor => ItemType::TotalGroupCreditor,
        };
        let key = key_for(
            row,
            item_type,
            RollupTarget::Group(group),
            SectorCode::root(),
            Some(nature),
        );
        table.accumulate(key, row.total_contribution(item_type));
    }
    table
}

/// One debtor and one creditor total per currency and ledger
pub fn debtor_creditor_totals(rows: &[TrialBalanceEntry]) -> SummaryTable {
    let mut table = SummaryTable::new();
    for row in postings(rows) {
        let Some(nature) = row.debtor_creditor else {
            continue;
        };
        let item_type = match nature {
            DebtorCreditor::Debtor => ItemType::TotalDebtor,
            DebtorCreditor::Creditor => ItemType::TotalCreditor,
        };
        let key = key_for(row, item_type, RollupTarget::Total, SectorCode::root(), Some(nature));
        let mut contribution = row.total_contribution(item_type);
        contribution.group_number = None;
        table.accumulate(key, contribution);
    }
    table
}

/// Debtor totals minus creditor totals, per currency and ledger
pub fn currency_totals<'e>(totals: impl IntoIterator<Item = &'e TrialBalanceEntry>) -> SummaryTable {
    let mut table = SummaryTable::new();
    for total in totals {
        let signed = match total.item_type {
            ItemType::TotalDebtor => total.clone(),
            ItemType::TotalCreditor => total.negated(),
            _ => continue,
        };
        let key = key_for(total, ItemType::TotalCurrency, RollupTarget::Total, SectorCode::root(), None);
        let mut contribution = signed.total_contribution(ItemType::TotalCurrency);
        contribution.debtor_creditor = None;
        table.accumulate(key, contribution);
    }
    table
}

/// Currency totals that feed the grand total
///
/// When per-ledger totals exist (possibly alongside a ledger-merged block)
/// only those are used, so a merged block is never counted twice.
pub fn consolidation_basis<'e>(
    entries: impl IntoIterator<Item = &'e TrialBalanceEntry> + Clone,
) -> Vec<&'e TrialBalanceEntry> {
    let totals = || {
        entries
            .clone()
            .into_iter()
            .filter(|entry| entry.item_type == ItemType::TotalCurrency)
    };
    let has_ledgers = totals().any(|entry| entry.ledger.is_some());
    totals()
        .filter(|entry| !has_ledgers || entry.ledger.is_some())
        .collect()
}

/// Per-ledger consolidated totals and the grand total
pub fn consolidated_totals<'e>(
    entries: impl IntoIterator<Item = &'e TrialBalanceEntry> + Clone,
) -> SummaryTable {
    let mut table = SummaryTable::new();
    for total in consolidation_basis(entries) {
        if total.ledger.is_some() {
            let mut by_ledger = total.total_contribution(ItemType::TotalConsolidatedByLedger);
            by_ledger.currency = None;
            let key = SummaryKey {
                item_type: ItemType::TotalConsolidatedByLedger,
                target: RollupTarget::Total,
                sector: SectorCode::root(),
                subledger: None,
                currency: None,
                ledger: total.ledger_id(),
                debtor_creditor: None,
            };
            table.accumulate(key, by_ledger);
        }

        let mut grand = total.total_contribution(ItemType::TotalConsolidated);
        grand.currency = None;
        grand.ledger = None;
        let key = SummaryKey {
            item_type: ItemType::TotalConsolidated,
            target: RollupTarget::Total,
            sector: SectorCode::root(),
            subledger: None,
            currency: None,
            ledger: None,
            debtor_creditor: None,
        };
        table.accumulate(key, grand);
    }
    table
}

/// Standard account subtotals over subledger postings
pub fn subledger_groups(rows: &[TrialBalanceEntry]) -> SummaryTable {
    let mut table = SummaryTable::new();
    for row in postings(rows).filter(|row| row.subledger_account.is_some()) {
        let Some(number) = row.account.clone() else {
            continue;
        };
        let key = key_for(
            row,
            ItemType::Group,
            RollupTarget::Account(number),
            row.sector.clone(),
            None,
        );
        let mut contribution = row.clone();
        contribution.item_type = ItemType::Group;
        contribution.subledger_account = None;
        table.accumulate(key, contribution);
    }
    table
}

/// Per ledger and currency totals of a subledger balance, creditor rows negated
pub fn subledger_totals(rows: &[TrialBalanceEntry]) -> SummaryTable {
    let mut table = SummaryTable::new();
    for row in postings(rows) {
        let signed = if row.is_creditor() { row.negated() } else { row.clone() };
        let key = key_for(row, ItemType::Total, RollupTarget::Total, SectorCode::root(), None);
        let mut contribution = signed.total_contribution(ItemType::Total);
        contribution.debtor_creditor = None;
        contribution.group_number = None;
        table.accumulate(key, contribution);
    }
    table
}

/// One ledger-merged summary per account next to its per-ledger postings
pub fn ledger_merged_accounts(rows: &[TrialBalanceEntry]) -> SummaryTable {
    let mut table = SummaryTable::new();
    for row in postings(rows) {
        let mut contribution = row.clone();
        contribution.item_type = ItemType::Summary;
        contribution.ledger = None;
        table.accumulate(contribution.identity_key(), contribution);
    }
    table
}

/// Re-accumulates rows under their identity after a relabelling
pub fn remerge(rows: Vec<TrialBalanceEntry>) -> Vec<TrialBalanceEntry> {
    let mut table = SummaryTable::new();
    for row in rows {
        table.accumulate(row.identity_key(), row);
    }
    table.into_entries()
}

/// Rows merged across ledgers
pub fn merge_ledgers(rows: Vec<TrialBalanceEntry>) -> Vec<TrialBalanceEntry> {
    remerge(
        rows.into_iter()
            .map(|mut row| {
                row.ledger = None;
                row
            })
            .collect(),
    )
}

/// Rows with every sector folded into the root
pub fn desectorize(rows: Vec<TrialBalanceEntry>) -> Vec<TrialBalanceEntry> {
    remerge(
        rows.into_iter()
            .map(|mut row| {
                row.sector = SectorCode::root();
                row
            })
            .collect(),
    )
}
