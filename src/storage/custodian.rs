// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Ledger Store: per-wallet asset balances and the atomic two-sided transfer.
//!
//! Every balance mutation in the system goes through [`CustodianRepository::transfer`]
//! (or, for funding, [`CustodianRepository::deposit`]). The transfer debits the
//! sender and credits the recipient inside a single redb write transaction:
//! the balance check, both record writes, and the commit are one atomic unit,
//! so no interleaving of concurrent transfers can double-spend and no
//! partially-applied transfer can ever persist.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, Table};
use serde::{Deserialize, Serialize};

use super::{LedgerDb, StoreError, StoreResult, CUSTODIANS};

/// A custodial ledger entry: one wallet's per-asset balances.
///
/// Invariant: every value in `balances` is >= 0 at rest. Entries are created
/// implicitly on first credit and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodianEntry {
    pub wallet_address: String,
    pub balances: BTreeMap<String, f64>,
    pub updated_at: DateTime<Utc>,
}

impl CustodianEntry {
    /// A fresh entry with all-zero balances.
    fn empty(wallet_address: &str) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            balances: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Balance for an asset; a missing key reads as zero.
    pub fn balance(&self, asset: &str) -> f64 {
        self.balances.get(asset).copied().unwrap_or(0.0)
    }
}

/// Outcome of a committed transfer: post-state of both sides.
#[derive(Debug, Clone)]
pub struct TransferApplied {
    pub sender: CustodianEntry,
    pub recipient: CustodianEntry,
}

/// Failures specific to the balance transfer. Everything here is decided
/// before commit, so any error leaves the ledger untouched.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A registered identity with no ledger entry is a hard error: a sender
    /// must already hold funds.
    #[error("sender custodian not found")]
    SenderNotFound,

    #[error("insufficient {asset} balance: have {available}, need {requested}")]
    InsufficientBalance {
        asset: String,
        available: f64,
        requested: f64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Repository for ledger operations.
pub struct CustodianRepository<'a> {
    db: &'a LedgerDb,
}

impl<'a> CustodianRepository<'a> {
    pub fn new(db: &'a LedgerDb) -> Self {
        Self { db }
    }

    /// Fetch a ledger entry by wallet address. Absence is `None`, not an error.
    pub fn get(&self, wallet_address: &str) -> StoreResult<Option<CustodianEntry>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(CUSTODIANS)?;
        match table.get(wallet_address)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Credit an asset balance, creating the entry on first credit.
    ///
    /// This is the funding path; the SMS surface never exposes it.
    pub fn deposit(&self, wallet_address: &str, asset: &str, amount: f64) -> StoreResult<CustodianEntry> {
        let write_txn = self.db.inner().begin_write()?;
        let entry = {
            let mut table = write_txn.open_table(CUSTODIANS)?;
            let mut entry = read_entry(&table, wallet_address)?
                .unwrap_or_else(|| CustodianEntry::empty(wallet_address));
            *entry.balances.entry(asset.to_string()).or_insert(0.0) += amount;
            write_entry(&mut table, &mut entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Atomically move `amount` from the sender's `source_asset` balance to
    /// the recipient's `recipient_asset` balance.
    ///
    /// Runs as one write transaction: the sufficient-balance condition is part
    /// of the same unit of work as both writes, so concurrent transfers over
    /// the same balance cannot interleave a read-then-write. A missing
    /// recipient entry is created with all-zero balances; a missing sender
    /// entry is [`LedgerError::SenderNotFound`].
    pub fn transfer(
        &self,
        sender_address: &str,
        source_asset: &str,
        recipient_address: &str,
        recipient_asset: &str,
        amount: f64,
    ) -> Result<TransferApplied, LedgerError> {
        let write_txn = self.db.inner().begin_write().map_err(StoreError::from)?;
        let applied = {
            let mut table = write_txn.open_table(CUSTODIANS).map_err(StoreError::from)?;

            let mut sender = read_entry(&table, sender_address)?.ok_or(LedgerError::SenderNotFound)?;

            let available = sender.balance(source_asset);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    asset: source_asset.to_string(),
                    available,
                    requested: amount,
                });
            }

            if sender_address == recipient_address {
                // Self-transfer: debit and credit the same record so the
                // second write cannot clobber the first.
                *sender.balances.entry(source_asset.to_string()).or_insert(0.0) -= amount;
                *sender.balances.entry(recipient_asset.to_string()).or_insert(0.0) += amount;
                write_entry(&mut table, &mut sender)?;
                TransferApplied {
                    recipient: sender.clone(),
                    sender,
                }
            } else {
                let mut recipient = read_entry(&table, recipient_address)?
                    .unwrap_or_else(|| CustodianEntry::empty(recipient_address));

                *sender.balances.entry(source_asset.to_string()).or_insert(0.0) -= amount;
                *recipient
                    .balances
                    .entry(recipient_asset.to_string())
                    .or_insert(0.0) += amount;

                write_entry(&mut table, &mut sender)?;
                write_entry(&mut table, &mut recipient)?;
                TransferApplied { sender, recipient }
            }
        };
        write_txn.commit().map_err(StoreError::from)?;
        Ok(applied)
    }
}

fn read_entry(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    wallet_address: &str,
) -> StoreResult<Option<CustodianEntry>> {
    match table.get(wallet_address)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn write_entry(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    entry: &mut CustodianEntry,
) -> StoreResult<()> {
    entry.updated_at = Utc::now();
    let json = serde_json::to_vec(entry)?;
    table.insert(entry.wallet_address.as_str(), json.as_slice())?;
    Ok(())
}
