// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Embedded persistent store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `custodians`: wallet_address → serialized CustodianEntry (per-asset balances)
//! - `sms_services`: wallet_address → serialized SmsServiceRecord
//! - `phone_index`: phone_number → wallet_address (uniqueness index for links)
//! - `two_factor`: phone_number → serialized TwoFactorCode
//!
//! The two-sided balance transfer and the phone re-link are the only
//! multi-record mutations in the system; both run inside a single redb write
//! transaction, so a partially-applied mutation can never commit. redb
//! serializes write transactions, which also rules out read-then-write
//! interleaving between concurrent transfers touching the same wallet.

pub mod custodian;
pub mod identity;
pub mod two_factor;

use std::path::Path;

use redb::{Database, TableDefinition};

pub use custodian::{CustodianEntry, CustodianRepository, LedgerError, TransferApplied};
pub use identity::{IdentityRepository, SmsServiceRecord, DEFAULT_LIMIT_USD};
pub use two_factor::{TwoFactorCode, TwoFactorError, TwoFactorRepository, CODE_TTL_SECS};

// =============================================================================
// Table Definitions
// =============================================================================

/// Ledger: wallet_address → serialized CustodianEntry (JSON bytes).
pub(crate) const CUSTODIANS: TableDefinition<&str, &[u8]> = TableDefinition::new("custodians");

/// Identity links: wallet_address → serialized SmsServiceRecord (JSON bytes).
pub(crate) const SMS_SERVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("sms_services");

/// Uniqueness index: phone_number → wallet_address.
///
/// Maintained in the same write transaction as `sms_services`, so at most one
/// record holds a given non-empty phone number at any point in time.
pub(crate) const PHONE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("phone_index");

/// One-time codes: phone_number → serialized TwoFactorCode (JSON bytes).
pub(crate) const TWO_FACTOR: TableDefinition<&str, &[u8]> = TableDefinition::new("two_factor");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// LedgerDb
// =============================================================================

/// Handle to the embedded ACID database shared by all repositories.
///
/// Constructed once at startup and passed by reference to each repository
/// (dependency injection), so the core stays testable against a
/// `tempfile`-backed instance without a live service.
pub struct LedgerDb {
    db: Database,
}

impl LedgerDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CUSTODIANS)?;
            let _ = write_txn.open_table(SMS_SERVICES)?;
            let _ = write_txn.open_table(PHONE_INDEX)?;
            let _ = write_txn.open_table(TWO_FACTOR)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn inner(&self) -> &Database {
        &self.db
    }

    /// Ledger Store view of the database.
    pub fn custodians(&self) -> CustodianRepository<'_> {
        CustodianRepository::new(self)
    }

    /// Identity Link Store view of the database.
    pub fn identities(&self) -> IdentityRepository<'_> {
        IdentityRepository::new(self)
    }

    /// One-Time Code Store view of the database.
    pub fn two_factor(&self) -> TwoFactorRepository<'_> {
        TwoFactorRepository::new(self)
    }
}
