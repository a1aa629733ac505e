// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! CryptoSMS - SMS-Driven Custodial Transfer Service
//!
//! This crate lets a phone number act as an authenticated proxy for a
//! custodial wallet: users link a number via a one-time code, then send
//! plain-text SMS commands that move value between per-wallet asset balances
//! on an internal ledger.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `engine` - Transaction engine and transfer authorizer
//! - `sms` - Outbound delivery (Twilio) and inbound command parsing
//! - `storage` - Embedded ACID store (redb): ledger, identity links, codes

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod logging;
pub mod models;
pub mod sms;
pub mod state;
pub mod storage;
