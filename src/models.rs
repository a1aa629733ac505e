// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! # API Data Models
//!
//! Request and response data structures used by the REST API, plus the
//! strongly-typed [`TransferInstruction`] produced by the SMS command parser.
//! All wire-facing types derive `Serialize`/`Deserialize` and `ToSchema` for
//! automatic JSON handling and OpenAPI documentation.
//!
//! ## Newtype Wrappers
//!
//! [`WalletAddress`] and [`PhoneNumber`] wrap the two identifiers the system
//! routes everything through. Phone numbers are canonicalized to E.164-ish
//! form (leading `+`) once at the boundary so the engine and the stores never
//! see two spellings of the same number.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Custodial wallet address wrapper.
///
/// Provides type safety for wallet addresses throughout the API. The ledger
/// treats the address as an opaque key; no on-chain validity is implied.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress(pub String);

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Phone Number Type
// =============================================================================

/// E.164-style phone number wrapper.
///
/// Carriers are inconsistent about the leading `+`; [`PhoneNumber::canonicalize`]
/// normalizes it exactly once at the system boundary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct PhoneNumber(pub String);

impl PhoneNumber {
    /// Normalize a raw phone number to canonical form (always `+`-prefixed).
    pub fn canonicalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('+') {
            PhoneNumber(trimmed.to_string())
        } else {
            PhoneNumber(format!("+{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PhoneNumber {
    fn from(value: &str) -> Self {
        PhoneNumber(value.to_string())
    }
}

// =============================================================================
// Transfer Instruction
// =============================================================================

/// A fully-typed transfer instruction, validated once at the parser boundary.
///
/// The transaction engine consumes this value as-is and never performs field
/// coercion, so a malformed SMS can only fail in the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferInstruction {
    /// Canonicalized sender phone number.
    pub sender_phone: PhoneNumber,
    /// Authorization secret set by the wallet owner.
    pub passkey: String,
    /// Positive, finite amount in USD-equivalent units.
    pub amount_usd: f64,
    /// Asset symbol to debit from the sender (e.g. `BTC`).
    pub source_asset: String,
    /// Recipient wallet address; need not be pre-registered.
    pub recipient_address: WalletAddress,
    /// Asset symbol to credit to the recipient.
    pub recipient_asset: String,
}

// =============================================================================
// SMS Service Models
// =============================================================================

/// Request to onboard a wallet onto the SMS service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    pub wallet_address: WalletAddress,
}

/// Onboarding response. The private key is returned exactly once and is
/// never stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateServiceResponse {
    pub status: String,
    pub private_key: String,
}

/// Request to check whether a wallet is onboarded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckServiceRequest {
    pub wallet_address: WalletAddress,
}

/// Service status for a wallet. `is_primary` is true once a phone number has
/// been linked; passkey and limit are only disclosed for linked wallets.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckServiceResponse {
    pub does_exist: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
}

/// Request to update a wallet's passkey and per-transaction spend limit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateServiceRequest {
    pub wallet_address: WalletAddress,
    pub passkey: String,
    pub limit: f64,
}

// =============================================================================
// Phone Linking Models
// =============================================================================

/// Request to issue a one-time code for phone verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateCodeRequest {
    pub phone_number: String,
    pub wallet_address: WalletAddress,
}

/// Request to verify a one-time code and link the phone to the wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    pub phone_number: String,
    pub wallet_address: WalletAddress,
    pub code: String,
}

/// Request to (re-)link a phone number to a wallet, detaching any prior holder.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePhoneRequest {
    pub phone_number: String,
    pub wallet_address: WalletAddress,
}

/// Request for the test-only outbound delivery path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DummySmsRequest {
    pub phone_number: String,
}

/// Generic status/message response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}
