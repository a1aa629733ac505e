// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Identity Link Store: phone number ↔ wallet address associations.
//!
//! A secondary `phone_index` table maps each linked phone number to the
//! wallet that holds it, maintained in the same write transaction as the
//! service record itself. Re-linking a number detaches the previous holder
//! and assigns the new one as a single atomic unit, which closes the
//! two-document race of a detach-then-assign sequence.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, Table};
use serde::{Deserialize, Serialize};

use super::{LedgerDb, StoreError, StoreResult, PHONE_INDEX, SMS_SERVICES};

/// Default per-transaction spend limit (USD) assigned at onboarding.
pub const DEFAULT_LIMIT_USD: f64 = 1000.0;

/// An SMS service record: the identity link for one wallet.
///
/// `phone_number` is `None` until a one-time code has been verified.
/// The public key is issued at onboarding; the paired private key is returned
/// once to the caller and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsServiceRecord {
    pub wallet_address: String,
    pub phone_number: Option<String>,
    pub passkey: String,
    pub limit_usd: f64,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

impl SmsServiceRecord {
    /// A fresh, unlinked record with the default spend limit.
    pub fn new(wallet_address: &str, public_key: String) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            phone_number: None,
            passkey: String::new(),
            limit_usd: DEFAULT_LIMIT_USD,
            public_key,
            created_at: Utc::now(),
        }
    }
}

/// Repository for identity link operations.
pub struct IdentityRepository<'a> {
    db: &'a LedgerDb,
}

impl<'a> IdentityRepository<'a> {
    pub fn new(db: &'a LedgerDb) -> Self {
        Self { db }
    }

    /// Create a service record at onboarding.
    pub fn create(&self, record: &SmsServiceRecord) -> StoreResult<()> {
        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(SMS_SERVICES)?;
            if table.get(record.wallet_address.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "SMS service for wallet {}",
                    record.wallet_address
                )));
            }
            let json = serde_json::to_vec(record)?;
            table.insert(record.wallet_address.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Exact-match lookup by wallet address. Absence is `None`, not an error.
    pub fn get_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<SmsServiceRecord>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(SMS_SERVICES)?;
        match table.get(wallet_address)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Exact-match lookup by linked phone number, via the uniqueness index.
    pub fn get_by_phone(&self, phone_number: &str) -> StoreResult<Option<SmsServiceRecord>> {
        let read_txn = self.db.inner().begin_read()?;
        let index = read_txn.open_table(PHONE_INDEX)?;
        let Some(wallet) = index.get(phone_number)? else {
            return Ok(None);
        };
        let wallet = wallet.value().to_string();
        let table = read_txn.open_table(SMS_SERVICES)?;
        match table.get(wallet.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Upsert the wallet's passkey and spend limit; creates the record with
    /// no phone number and no public key if the wallet was never onboarded.
    pub fn set_authorization(
        &self,
        wallet_address: &str,
        passkey: &str,
        limit_usd: f64,
    ) -> StoreResult<()> {
        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(SMS_SERVICES)?;
            let mut record = match table.get(wallet_address)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => SmsServiceRecord::new(wallet_address, String::new()),
            };
            record.passkey = passkey.to_string();
            record.limit_usd = limit_usd;
            let json = serde_json::to_vec(&record)?;
            table.insert(wallet_address, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Link a phone number to a wallet.
    ///
    /// If the number is currently held by a different wallet, that record's
    /// phone is cleared and the index entry re-pointed in the same write
    /// transaction, so the at-most-one-wallet-per-phone invariant holds at
    /// every commit point. Creates the target record if absent.
    pub fn link_phone(&self, wallet_address: &str, phone_number: &str) -> StoreResult<()> {
        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(SMS_SERVICES)?;
            let mut index = write_txn.open_table(PHONE_INDEX)?;

            let prior_holder = index.get(phone_number)?.map(|v| v.value().to_string());
            if let Some(holder) = prior_holder.filter(|h| h.as_str() != wallet_address) {
                let prior_bytes = table.get(holder.as_str())?.map(|v| v.value().to_vec());
                if let Some(bytes) = prior_bytes {
                    let mut prior: SmsServiceRecord = serde_json::from_slice(&bytes)?;
                    prior.phone_number = None;
                    let json = serde_json::to_vec(&prior)?;
                    table.insert(holder.as_str(), json.as_slice())?;
                }
            }

            link_in_txn(&mut table, &mut index, wallet_address, phone_number)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Link a phone number only if no *other* wallet currently holds it.
    ///
    /// Unlike [`IdentityRepository::link_phone`], this never detaches a prior
    /// holder: it returns `Ok(false)` and leaves the store untouched instead.
    /// The conflict check and the link run in the same write transaction, so
    /// two concurrent claims of one number cannot both pass the check.
    pub fn link_phone_if_unheld(
        &self,
        wallet_address: &str,
        phone_number: &str,
    ) -> StoreResult<bool> {
        let write_txn = self.db.inner().begin_write()?;
        let linked = {
            let mut table = write_txn.open_table(SMS_SERVICES)?;
            let mut index = write_txn.open_table(PHONE_INDEX)?;

            let holder = index.get(phone_number)?.map(|v| v.value().to_string());
            if holder.as_deref().is_some_and(|h| h != wallet_address) {
                false
            } else {
                link_in_txn(&mut table, &mut index, wallet_address, phone_number)?;
                true
            }
        };
        write_txn.commit()?;
        Ok(linked)
    }

    /// All service records (admin listing).
    pub fn list_all(&self) -> StoreResult<Vec<SmsServiceRecord>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(SMS_SERVICES)?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }
}

/// Upsert the record's phone number and re-point the index, within the
/// caller's open write transaction.
fn link_in_txn(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    index: &mut Table<'_, &'static str, &'static str>,
    wallet_address: &str,
    phone_number: &str,
) -> StoreResult<()> {
    let mut record = match table.get(wallet_address)? {
        Some(value) => serde_json::from_slice(value.value())?,
        None => SmsServiceRecord::new(wallet_address, String::new()),
    };
    // Drop the wallet's previous number from the index before taking
    // the new one, so stale index entries never accumulate.
    if let Some(old) = record.phone_number.take() {
        if old != phone_number {
            index.remove(old.as_str())?;
        }
    }
    record.phone_number = Some(phone_number.to_string());
    let json = serde_json::to_vec(&record)?;
    table.insert(wallet_address, json.as_slice())?;
    index.insert(phone_number, wallet_address)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::open_temp_db;
    use super::*;

    #[test]
    fn create_rejects_duplicate_wallet() {
        let (_dir, db) = open_temp_db();
        let identities = db.identities();
        let record = SmsServiceRecord::new("0xwallet", "pubkey".into());

        identities.create(&record).unwrap();
        let err = identities.create(&record).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn set_authorization_upserts_missing_record() {
        let (_dir, db) = open_temp_db();
        let identities = db.identities();

        identities.set_authorization("0xwallet", "p1", 500.0).unwrap();
        let record = identities.get_by_wallet("0xwallet").unwrap().unwrap();
        assert_eq!(record.passkey, "p1");
        assert_eq!(record.limit_usd, 500.0);
        assert!(record.phone_number.is_none());

        identities.set_authorization("0xwallet", "p2", 750.0).unwrap();
        let record = identities.get_by_wallet("0xwallet").unwrap().unwrap();
        assert_eq!(record.passkey, "p2");
        assert_eq!(record.limit_usd, 750.0);
    }

    #[test]
    fn link_phone_steals_number_from_prior_holder() {
        let (_dir, db) = open_temp_db();
        let identities = db.identities();
        identities.create(&SmsServiceRecord::new("0xA", "pkA".into())).unwrap();
        identities.create(&SmsServiceRecord::new("0xB", "pkB".into())).unwrap();

        identities.link_phone("0xA", "+15551234567").unwrap();
        identities.link_phone("0xB", "+15551234567").unwrap();

        let a = identities.get_by_wallet("0xA").unwrap().unwrap();
        let b = identities.get_by_wallet("0xB").unwrap().unwrap();
        assert!(a.phone_number.is_none());
        assert_eq!(b.phone_number.as_deref(), Some("+15551234567"));

        let holder = identities.get_by_phone("+15551234567").unwrap().unwrap();
        assert_eq!(holder.wallet_address, "0xB");
    }

    #[test]
    fn link_phone_drops_wallets_previous_number_from_index() {
        let (_dir, db) = open_temp_db();
        let identities = db.identities();
        identities.create(&SmsServiceRecord::new("0xA", "pkA".into())).unwrap();

        identities.link_phone("0xA", "+15550000001").unwrap();
        identities.link_phone("0xA", "+15550000002").unwrap();

        assert!(identities.get_by_phone("+15550000001").unwrap().is_none());
        let holder = identities.get_by_phone("+15550000002").unwrap().unwrap();
        assert_eq!(holder.wallet_address, "0xA");
    }

    #[test]
    fn link_if_unheld_refuses_number_held_by_other_wallet() {
        let (_dir, db) = open_temp_db();
        let identities = db.identities();
        identities.create(&SmsServiceRecord::new("0xA", "pkA".into())).unwrap();
        identities.create(&SmsServiceRecord::new("0xB", "pkB".into())).unwrap();
        identities.link_phone("0xA", "+15551234567").unwrap();

        let linked = identities
            .link_phone_if_unheld("0xB", "+15551234567")
            .unwrap();
        assert!(!linked);

        // The existing link survives and B gained nothing.
        let holder = identities.get_by_phone("+15551234567").unwrap().unwrap();
        assert_eq!(holder.wallet_address, "0xA");
        let b = identities.get_by_wallet("0xB").unwrap().unwrap();
        assert!(b.phone_number.is_none());
    }

    #[test]
    fn link_if_unheld_allows_fresh_numbers_and_reclaims() {
        let (_dir, db) = open_temp_db();
        let identities = db.identities();
        identities.create(&SmsServiceRecord::new("0xA", "pkA".into())).unwrap();

        assert!(identities.link_phone_if_unheld("0xA", "+15551234567").unwrap());
        // Re-claiming its own number is idempotent.
        assert!(identities.link_phone_if_unheld("0xA", "+15551234567").unwrap());

        let holder = identities.get_by_phone("+15551234567").unwrap().unwrap();
        assert_eq!(holder.wallet_address, "0xA");
    }

    #[test]
    fn at_most_one_link_per_phone_after_any_sequence() {
        let (_dir, db) = open_temp_db();
        let identities = db.identities();
        for wallet in ["0xA", "0xB", "0xC"] {
            identities
                .create(&SmsServiceRecord::new(wallet, format!("pk-{wallet}")))
                .unwrap();
        }

        identities.link_phone("0xA", "+15551230000").unwrap();
        identities.link_phone("0xB", "+15551230000").unwrap();
        identities.link_phone("0xC", "+15551230000").unwrap();
        identities.link_phone("0xB", "+15551239999").unwrap();

        let holders: Vec<_> = identities
            .list_all()
            .unwrap()
            .into_iter()
            .filter(|r| r.phone_number.as_deref() == Some("+15551230000"))
            .collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].wallet_address, "0xC");
    }
}
