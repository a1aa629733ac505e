// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Command Parser: inbound message body → [`TransferInstruction`].
//!
//! Grammar (keywords case-insensitive, whitespace-separated):
//!
//! ```text
//! send <amount> <SOURCE_ASSET> to <wallet_address> [as <RECIPIENT_ASSET>] passkey <passkey>
//! ```
//!
//! The amount accepts an optional leading `$`. Omitting the `as` clause means
//! the recipient is credited in the source asset. This is the single
//! validation point for transfer fields: the engine receives a fully-typed
//! instruction and never coerces or re-checks them.

use crate::models::{PhoneNumber, TransferInstruction, WalletAddress};

/// Parse failures. These are validation errors: the message is rejected at
/// the boundary and no state is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty message body")]
    Empty,

    #[error("message must start with 'send'")]
    MissingSendKeyword,

    #[error("missing or malformed {0}")]
    MissingField(&'static str),

    #[error("amount must be a positive number, got {0:?}")]
    BadAmount(String),

    #[error("unexpected trailing input {0:?}")]
    TrailingInput(String),
}

/// Parse a plain-text command from `sender_phone` into a transfer instruction.
pub fn parse_command(
    sender_phone: PhoneNumber,
    body: &str,
) -> Result<TransferInstruction, ParseError> {
    let mut tokens = body.split_whitespace().peekable();

    let Some(first) = tokens.next() else {
        return Err(ParseError::Empty);
    };
    if !first.eq_ignore_ascii_case("send") {
        return Err(ParseError::MissingSendKeyword);
    }

    let amount_token = tokens.next().ok_or(ParseError::MissingField("amount"))?;
    let amount_usd = parse_amount(amount_token)?;

    let source_asset = tokens
        .next()
        .ok_or(ParseError::MissingField("source asset"))?
        .to_ascii_uppercase();

    expect_keyword(tokens.next(), "to")?;
    let recipient_address = WalletAddress::from(
        tokens
            .next()
            .ok_or(ParseError::MissingField("recipient address"))?,
    );

    // Optional "as <ASSET>" clause; defaults to the source asset.
    let recipient_asset = match tokens.peek() {
        Some(word) if word.eq_ignore_ascii_case("as") => {
            tokens.next();
            tokens
                .next()
                .ok_or(ParseError::MissingField("recipient asset"))?
                .to_ascii_uppercase()
        }
        _ => source_asset.clone(),
    };

    expect_keyword(tokens.next(), "passkey")?;
    let passkey = tokens
        .next()
        .ok_or(ParseError::MissingField("passkey"))?
        .to_string();

    // A mangled command fails closed rather than half-parsing.
    if let Some(extra) = tokens.next() {
        return Err(ParseError::TrailingInput(extra.to_string()));
    }

    Ok(TransferInstruction {
        sender_phone,
        passkey,
        amount_usd,
        source_asset,
        recipient_address,
        recipient_asset,
    })
}

fn expect_keyword(token: Option<&str>, keyword: &'static str) -> Result<(), ParseError> {
    match token {
        Some(word) if word.eq_ignore_ascii_case(keyword) => Ok(()),
        _ => Err(ParseError::MissingField(keyword)),
    }
}

fn parse_amount(token: &str) -> Result<f64, ParseError> {
    let digits = token.strip_prefix('$').unwrap_or(token);
    let amount: f64 = digits
        .parse()
        .map_err(|_| ParseError::BadAmount(token.to_string()))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ParseError::BadAmount(token.to_string()));
    }
    Ok(amount)
}
