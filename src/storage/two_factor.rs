// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! One-Time Code Store: short-lived phone verification codes.
//!
//! State machine per phone number: no code → code issued → verified (consumed)
//! or expired/reissued. Codes are single-use: a successful verification
//! deletes the record in the same write transaction, and every code carries
//! an issue timestamp checked against [`CODE_TTL_SECS`].

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{LedgerDb, StoreError, StoreResult, TWO_FACTOR};

/// How long an issued code stays valid, in seconds.
pub const CODE_TTL_SECS: i64 = 5 * 60;

/// Width of the numeric code, matching the SMS prompt ("Your 2FA code is: NNNNN").
const CODE_DIGITS: u32 = 5;

/// A stored one-time code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoFactorCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

/// Verification failures. All of them fail closed: no link is created and
/// the identity store is never touched.
#[derive(Debug, thiserror::Error)]
pub enum TwoFactorError {
    #[error("2FA code mismatch")]
    Mismatch,

    #[error("2FA code expired")]
    Expired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Repository for one-time code operations.
pub struct TwoFactorRepository<'a> {
    db: &'a LedgerDb,
}

impl<'a> TwoFactorRepository<'a> {
    pub fn new(db: &'a LedgerDb) -> Self {
        Self { db }
    }

    /// Issue a fresh code for a phone number, overwriting any prior code.
    ///
    /// Returns the code so the caller can hand it to the notifier.
    pub fn issue(&self, phone_number: &str) -> StoreResult<String> {
        let code = format!(
            "{:0width$}",
            rand::thread_rng().gen_range(0..10u32.pow(CODE_DIGITS)),
            width = CODE_DIGITS as usize
        );
        self.store(phone_number, &code, Utc::now())?;
        Ok(code)
    }

    /// Store a code with an explicit issue time. Split out from [`issue`] so
    /// tests can control the clock.
    pub fn store(&self, phone_number: &str, code: &str, issued_at: DateTime<Utc>) -> StoreResult<()> {
        let record = TwoFactorCode {
            code: code.to_string(),
            issued_at,
        };
        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(TWO_FACTOR)?;
            let json = serde_json::to_vec(&record)?;
            table.insert(phone_number, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Verify a submitted code and consume it on success.
    ///
    /// Fails closed: a missing record or a non-matching code is
    /// [`TwoFactorError::Mismatch`]; a code older than [`CODE_TTL_SECS`] is
    /// [`TwoFactorError::Expired`] and is removed. The comparison is constant
    /// time so response timing leaks nothing about the stored code.
    pub fn verify_and_consume(
        &self,
        phone_number: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TwoFactorError> {
        let write_txn = self.db.inner().begin_write().map_err(StoreError::from)?;
        let outcome = {
            let mut table = write_txn.open_table(TWO_FACTOR).map_err(StoreError::from)?;
            check_and_consume(&mut table, phone_number, submitted, now)
        };
        // Committing is safe on every path: the only staged mutation is the
        // removal of a consumed or expired code.
        write_txn.commit().map_err(StoreError::from)?;
        outcome
    }
}

fn check_and_consume(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    phone_number: &str,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), TwoFactorError> {
    use redb::ReadableTable;

    let record: TwoFactorCode = {
        let Some(value) = table.get(phone_number).map_err(StoreError::from)? else {
            return Err(TwoFactorError::Mismatch);
        };
        serde_json::from_slice(value.value()).map_err(StoreError::from)?
    };

    if now - record.issued_at > Duration::seconds(CODE_TTL_SECS) {
        table.remove(phone_number).map_err(StoreError::from)?;
        return Err(TwoFactorError::Expired);
    }

    if ring::constant_time::verify_slices_are_equal(record.code.as_bytes(), submitted.as_bytes())
        .is_err()
    {
        return Err(TwoFactorError::Mismatch);
    }

    // Single-use: consume the code with the successful verification.
    table.remove(phone_number).map_err(StoreError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::open_temp_db;
    use super::*;

    #[test]
    fn issue_produces_fixed_width_numeric_code() {
        let (_dir, db) = open_temp_db();
        let code = db.two_factor().issue("+15551234567").unwrap();
        assert_eq!(code.len(), 5);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn verify_consumes_code_on_success() {
        let (_dir, db) = open_temp_db();
        let codes = db.two_factor();
        let now = Utc::now();
        codes.store("+15551234567", "12345", now).unwrap();

        codes.verify_and_consume("+15551234567", "12345", now).unwrap();

        // Second submission of the same code must fail: single-use.
        let err = codes
            .verify_and_consume("+15551234567", "12345", now)
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::Mismatch));
    }

    #[test]
    fn verify_rejects_wrong_code_without_consuming() {
        let (_dir, db) = open_temp_db();
        let codes = db.two_factor();
        let now = Utc::now();
        codes.store("+15551234567", "12345", now).unwrap();

        let err = codes
            .verify_and_consume("+15551234567", "99999", now)
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::Mismatch));

        // The right code still works afterwards.
        codes.verify_and_consume("+15551234567", "12345", now).unwrap();
    }

    #[test]
    fn verify_rejects_expired_code() {
        let (_dir, db) = open_temp_db();
        let codes = db.two_factor();
        let issued = Utc::now() - Duration::minutes(6);
        codes.store("+15551234567", "12345", issued).unwrap();

        let err = codes
            .verify_and_consume("+15551234567", "12345", Utc::now())
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::Expired));
    }

    #[test]
    fn reissue_overwrites_prior_code() {
        let (_dir, db) = open_temp_db();
        let codes = db.two_factor();
        let now = Utc::now();
        codes.store("+15551234567", "11111", now).unwrap();
        codes.store("+15551234567", "22222", now).unwrap();

        let err = codes
            .verify_and_consume("+15551234567", "11111", now)
            .unwrap_err();
        assert!(matches!(err, TwoFactorError::Mismatch));
        codes.verify_and_consume("+15551234567", "22222", now).unwrap();
    }
}
