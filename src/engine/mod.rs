// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Transaction Engine: orchestrates authorization, the atomic balance move,
//! and notification intents.
//!
//! ## Execution Order
//!
//! 1. Authorize the sender (identity link, constant-time passkey, spend limit).
//! 2. Delegate debit + credit to [`CustodianRepository::transfer`], which runs
//!    as a single ACID write transaction: either both sides commit or neither
//!    does, so the partial-failure window of a two-phase write does not exist.
//! 3. Resolve the recipient's linked phone number (if any) and return
//!    notification intents. The engine never sends messages itself; delivery
//!    failures are the notifier's problem and cannot roll back the ledger.
//!
//! Any failure in steps 1-2 aborts with no ledger mutation, so re-submitting
//! the same invalid transfer is idempotent.

pub mod authorizer;

use tracing::{info, warn};
use uuid::Uuid;

use crate::models::TransferInstruction;
use crate::sms::SmsMessage;
use crate::storage::{LedgerDb, LedgerError, SmsServiceRecord, StoreError};

pub use authorizer::{authorize, AuthorizedSender};

// =============================================================================
// Error Taxonomy
// =============================================================================

/// Transfer failures, ordered by where the pipeline stops.
///
/// `NotRegistered`/`InvalidPasskey`/`LimitExceeded` are authorization errors,
/// `CustodianNotFound` is a not-found error, `InsufficientBalance` is a
/// terminal business rejection, and `Store` is a dependency failure. None of
/// them leaves a mutation behind.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("phone number not registered")]
    NotRegistered,

    #[error("invalid passkey")]
    InvalidPasskey,

    #[error("transaction amount exceeds limit of {limit}")]
    LimitExceeded { limit: f64 },

    #[error("sender custodian not found")]
    CustodianNotFound,

    #[error("insufficient {asset} balance: have {available}")]
    InsufficientBalance { asset: String, available: f64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for TransferError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::SenderNotFound => TransferError::CustodianNotFound,
            LedgerError::InsufficientBalance {
                asset, available, ..
            } => TransferError::InsufficientBalance { asset, available },
            LedgerError::Store(e) => TransferError::Store(e),
        }
    }
}

impl TransferError {
    /// Rejection text delivered to the sender's phone. The SMS channel is the
    /// only feedback a phone-only user sees, so each reason is actionable.
    pub fn sms_reason(&self) -> String {
        match self {
            TransferError::NotRegistered => "Phone number not registered".to_string(),
            TransferError::InvalidPasskey => "Invalid passkey".to_string(),
            TransferError::LimitExceeded { .. } => "Transaction amount exceeds limit".to_string(),
            TransferError::CustodianNotFound => {
                "No custodial balance found for your wallet".to_string()
            }
            TransferError::InsufficientBalance { asset, .. } => {
                format!("Insufficient {asset} balance")
            }
            TransferError::Store(_) => "Internal server error".to_string(),
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// A committed transfer plus the notification intents it produced.
#[derive(Debug)]
pub struct TransferOutcome {
    /// Reference id for logs and reconciliation.
    pub transfer_id: Uuid,
    pub sender_wallet: String,
    pub recipient_wallet: String,
    /// Messages for the notifier: sender confirmation, and the recipient
    /// credit notice when the recipient has a linked phone.
    pub notifications: Vec<SmsMessage>,
}

// =============================================================================
// Engine
// =============================================================================

/// The transaction engine. Holds only a store handle; one instance per
/// request is fine.
pub struct TransferEngine<'a> {
    db: &'a LedgerDb,
}

impl<'a> TransferEngine<'a> {
    pub fn new(db: &'a LedgerDb) -> Self {
        Self { db }
    }

    /// Execute a parsed transfer instruction end to end.
    ///
    /// The instruction's sender phone must already be canonicalized; the
    /// webhook boundary does that before parsing.
    pub fn execute(&self, instruction: &TransferInstruction) -> Result<TransferOutcome, TransferError> {
        let identities = self.db.identities();

        let sender = match authorize(
            &identities,
            &instruction.sender_phone,
            &instruction.passkey,
            instruction.amount_usd,
        ) {
            Ok(sender) => sender,
            Err(err) => {
                warn!(
                    sender_phone = %instruction.sender_phone,
                    error = %err,
                    "transfer authorization failed"
                );
                return Err(err);
            }
        };

        let applied = self.db.custodians().transfer(
            &sender.wallet_address,
            &instruction.source_asset,
            instruction.recipient_address.as_str(),
            &instruction.recipient_asset,
            instruction.amount_usd,
        )?;

        let transfer_id = Uuid::new_v4();
        info!(
            %transfer_id,
            sender_wallet = %sender.wallet_address,
            recipient_wallet = %instruction.recipient_address,
            amount_usd = instruction.amount_usd,
            source_asset = %instruction.source_asset,
            recipient_asset = %instruction.recipient_asset,
            "transfer committed"
        );

        // Notification intents are built after the commit; delivery is
        // best-effort and decoupled from ledger correctness. A failed
        // recipient lookup must not surface as a transfer error here: the
        // ledger mutation is already committed.
        let recipient_link = identities.get_by_wallet(instruction.recipient_address.as_str());
        let notifications = notifications_for(recipient_link, transfer_id, instruction);

        Ok(TransferOutcome {
            transfer_id,
            sender_wallet: applied.sender.wallet_address,
            recipient_wallet: applied.recipient.wallet_address,
            notifications,
        })
    }
}

/// Build the notification intents for a committed transfer.
///
/// The recipient credit notice depends on a store read that happens after
/// the commit; if that read fails, the notice is skipped and only the sender
/// confirmation is produced. The committed transfer itself is never reported
/// as a failure for it.
fn notifications_for(
    recipient_link: Result<Option<SmsServiceRecord>, StoreError>,
    transfer_id: Uuid,
    instruction: &TransferInstruction,
) -> Vec<SmsMessage> {
    let mut notifications = Vec::with_capacity(2);

    match recipient_link {
        Ok(link) => {
            if let Some(phone) = link.and_then(|link| link.phone_number) {
                notifications.push(SmsMessage {
                    to: phone.as_str().into(),
                    body: format!(
                        "${:.2} has been added into your {} account",
                        instruction.amount_usd, instruction.recipient_asset
                    ),
                });
            }
        }
        Err(err) => {
            warn!(
                %transfer_id,
                error = %err,
                "recipient lookup failed after commit; skipping credit notice"
            );
        }
    }

    notifications.push(SmsMessage {
        to: instruction.sender_phone.clone(),
        body: format!("{} has been sent successfully", instruction.source_asset),
    });

    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PhoneNumber, TransferInstruction, WalletAddress};
    use crate::storage::test_support::open_temp_db;
    use crate::storage::{CustodianEntry, LedgerDb, SmsServiceRecord};

    fn seed_sender(db: &LedgerDb, wallet: &str, phone: &str, passkey: &str, limit: f64) {
        let mut record = SmsServiceRecord::new(wallet, "pk".into());
        record.passkey = passkey.to_string();
        record.limit_usd = limit;
        db.identities().create(&record).unwrap();
        db.identities().link_phone(wallet, phone).unwrap();
    }

    fn instruction(amount: f64) -> TransferInstruction {
        TransferInstruction {
            sender_phone: PhoneNumber::from("+15551234567"),
            passkey: "p1".to_string(),
            amount_usd: amount,
            source_asset: "BTC".to_string(),
            recipient_address: WalletAddress::from("0xrecipient"),
            recipient_asset: "ETH".to_string(),
        }
    }

    fn ledger_snapshot(db: &LedgerDb, wallet: &str) -> Option<CustodianEntry> {
        db.custodians().get(wallet).unwrap()
    }

    #[test]
    fn boundary_insufficient_balance_rejected() {
        let (_dir, db) = open_temp_db();
        seed_sender(&db, "0xsender", "+15551234567", "p1", 1000.0);
        db.custodians().deposit("0xsender", "BTC", 50.0).unwrap();

        let err = TransferEngine::new(&db).execute(&instruction(100.0)).unwrap_err();
        assert!(matches!(
            err,
            TransferError::InsufficientBalance { ref asset, available } if asset == "BTC" && available == 50.0
        ));

        // Balance must never go negative: 100 > 50 is a clean rejection.
        let sender = ledger_snapshot(&db, "0xsender").unwrap();
        assert_eq!(sender.balance("BTC"), 50.0);
        assert!(ledger_snapshot(&db, "0xrecipient").is_none());
    }

    #[test]
    fn boundary_sufficient_balance_succeeds() {
        let (_dir, db) = open_temp_db();
        seed_sender(&db, "0xsender", "+15551234567", "p1", 1000.0);
        db.custodians().deposit("0xsender", "BTC", 200.0).unwrap();

        let outcome = TransferEngine::new(&db).execute(&instruction(100.0)).unwrap();
        assert_eq!(outcome.sender_wallet, "0xsender");
        assert_eq!(outcome.recipient_wallet, "0xrecipient");

        let sender = ledger_snapshot(&db, "0xsender").unwrap();
        let recipient = ledger_snapshot(&db, "0xrecipient").unwrap();
        assert_eq!(sender.balance("BTC"), 100.0);
        assert_eq!(recipient.balance("ETH"), 100.0);
    }

    #[test]
    fn unlinked_recipient_gets_no_notification() {
        let (_dir, db) = open_temp_db();
        seed_sender(&db, "0xsender", "+15551234567", "p1", 1000.0);
        db.custodians().deposit("0xsender", "BTC", 200.0).unwrap();

        let outcome = TransferEngine::new(&db).execute(&instruction(100.0)).unwrap();

        // Only the sender confirmation.
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(outcome.notifications[0].to.as_str(), "+15551234567");
        assert_eq!(outcome.notifications[0].body, "BTC has been sent successfully");
    }

    #[test]
    fn linked_recipient_gets_credit_notice() {
        let (_dir, db) = open_temp_db();
        seed_sender(&db, "0xsender", "+15551234567", "p1", 1000.0);
        seed_sender(&db, "0xrecipient", "+15559876543", "p2", 1000.0);
        db.custodians().deposit("0xsender", "BTC", 200.0).unwrap();

        let outcome = TransferEngine::new(&db).execute(&instruction(100.0)).unwrap();

        assert_eq!(outcome.notifications.len(), 2);
        assert_eq!(outcome.notifications[0].to.as_str(), "+15559876543");
        assert_eq!(
            outcome.notifications[0].body,
            "$100.00 has been added into your ETH account"
        );
        assert_eq!(outcome.notifications[1].to.as_str(), "+15551234567");
    }

    #[test]
    fn rejections_are_idempotent() {
        let (_dir, db) = open_temp_db();
        seed_sender(&db, "0xsender", "+15551234567", "p1", 1000.0);
        db.custodians().deposit("0xsender", "BTC", 200.0).unwrap();

        let engine = TransferEngine::new(&db);
        let mut bad_passkey = instruction(100.0);
        bad_passkey.passkey = "wrong".to_string();
        let mut over_limit = instruction(5000.0);
        over_limit.passkey = "p1".to_string();

        for bad in [&bad_passkey, &over_limit] {
            let before = ledger_snapshot(&db, "0xsender").unwrap();
            assert!(engine.execute(bad).is_err());
            assert!(engine.execute(bad).is_err());
            let after = ledger_snapshot(&db, "0xsender").unwrap();
            assert_eq!(before.balances, after.balances);
        }
        assert!(ledger_snapshot(&db, "0xrecipient").is_none());
    }

    #[test]
    fn registered_identity_without_ledger_entry_is_hard_error() {
        let (_dir, db) = open_temp_db();
        seed_sender(&db, "0xsender", "+15551234567", "p1", 1000.0);

        let err = TransferEngine::new(&db).execute(&instruction(10.0)).unwrap_err();
        assert!(matches!(err, TransferError::CustodianNotFound));
    }

    #[test]
    fn failed_recipient_lookup_still_yields_sender_confirmation() {
        // The committed transfer must not be reported as a failure just
        // because the post-commit recipient lookup errored.
        let lookup_failure = Err(StoreError::AlreadyExists("lookup unavailable".into()));
        let notifications = notifications_for(lookup_failure, Uuid::new_v4(), &instruction(100.0));

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].to.as_str(), "+15551234567");
        assert_eq!(notifications[0].body, "BTC has been sent successfully");
    }

    #[test]
    fn sms_reasons_are_actionable() {
        assert_eq!(TransferError::InvalidPasskey.sms_reason(), "Invalid passkey");
        assert_eq!(
            TransferError::InsufficientBalance {
                asset: "BTC".into(),
                available: 0.0
            }
            .sms_reason(),
            "Insufficient BTC balance"
        );
        assert_eq!(
            TransferError::NotRegistered.sms_reason(),
            "Phone number not registered"
        );
    }
}
