// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

use std::sync::Arc;

use crate::sms::SmsSender;
use crate::storage::LedgerDb;

/// Shared application state handed to every handler.
///
/// The store handle and the SMS sender are injected at construction time
/// rather than read from process globals, so handlers and the engine stay
/// testable against a temp database and a recording sender.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<LedgerDb>,
    pub sms: Arc<dyn SmsSender>,
}

impl AppState {
    pub fn new(db: Arc<LedgerDb>, sms: Arc<dyn SmsSender>) -> Self {
        Self { db, sms }
    }
}
