// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Transfer Authorizer: resolves and vets the sender before any mutation.
//!
//! Pure read path with no side effects. Authorization always precedes
//! mutation: the engine calls this first and stops at the first failure.

use crate::models::PhoneNumber;
use crate::storage::IdentityRepository;

use super::TransferError;

/// Authorization context returned on success.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedSender {
    pub wallet_address: String,
    pub limit_usd: f64,
}

/// Resolve the identity link for `phone` and validate passkey and limit.
///
/// Failure order matters: an unregistered number is reported before any
/// passkey comparison, and the passkey check is constant time so timing
/// reveals nothing about the stored secret.
pub fn authorize(
    identities: &IdentityRepository<'_>,
    phone: &PhoneNumber,
    passkey: &str,
    amount_usd: f64,
) -> Result<AuthorizedSender, TransferError> {
    let Some(record) = identities.get_by_phone(phone.as_str())? else {
        return Err(TransferError::NotRegistered);
    };

    if ring::constant_time::verify_slices_are_equal(record.passkey.as_bytes(), passkey.as_bytes())
        .is_err()
    {
        return Err(TransferError::InvalidPasskey);
    }

    if amount_usd > record.limit_usd {
        return Err(TransferError::LimitExceeded {
            limit: record.limit_usd,
        });
    }

    Ok(AuthorizedSender {
        wallet_address: record.wallet_address,
        limit_usd: record.limit_usd,
    })
}
