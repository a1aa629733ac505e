// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

use std::sync::Arc;

use tracing::info;

use cryptosms_server::api::router;
use cryptosms_server::config::{Config, DEFAULT_LOG_FILTER};
use cryptosms_server::logging::{init_logging, LogFormat};
use cryptosms_server::sms::{LogSender, SmsSender, TwilioSender};
use cryptosms_server::state::AppState;
use cryptosms_server::storage::LedgerDb;

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("invalid configuration");
    init_logging(DEFAULT_LOG_FILTER, LogFormat::from_str_lossy(&config.log_format));

    let db = LedgerDb::open(&config.db_path()).expect("failed to open ledger database");
    info!(path = %config.db_path().display(), "ledger database opened");

    let sms: Arc<dyn SmsSender> = if TwilioSender::is_configured() {
        let sender = TwilioSender::from_env().expect("invalid Twilio configuration");
        info!(from = %sender.from_number(), "Twilio delivery configured");
        Arc::new(sender)
    } else {
        info!("Twilio environment not set; falling back to log-only SMS delivery");
        Arc::new(LogSender)
    };

    let state = AppState::new(Arc::new(db), sms);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind listener");
    info!(addr = %config.bind_addr, "CryptoSMS server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    info!("shutdown signal received");
}
