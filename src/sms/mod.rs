// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Outbound SMS delivery and inbound command parsing.
//!
//! Delivery sits behind the [`SmsSender`] trait so the core stays testable
//! without a live carrier: production uses [`twilio::TwilioSender`], local
//! development falls back to [`LogSender`], and tests record messages with
//! an in-memory sender. Delivery is best-effort everywhere; a failed send is
//! logged and never affects ledger state.

pub mod parser;
pub mod twilio;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::PhoneNumber;

pub use parser::{parse_command, ParseError};
pub use twilio::TwilioSender;

/// A notification intent: one outbound text message.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub to: PhoneNumber,
    pub body: String,
}

/// Delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("SMS request failed: {0}")]
    Request(String),

    #[error("carrier rejected message: status {status}, {detail}")]
    Rejected { status: u16, detail: String },
}

/// Outbound message delivery.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &PhoneNumber, body: &str) -> Result<(), SmsError>;
}

/// Send a batch of notification intents, logging failures and moving on.
///
/// Called after a ledger mutation has committed, so a delivery failure must
/// never surface as a transfer failure.
pub async fn deliver_all(sender: &dyn SmsSender, messages: &[SmsMessage]) {
    for message in messages {
        if let Err(err) = sender.send(&message.to, &message.body).await {
            warn!(to = %message.to, error = %err, "SMS delivery failed");
        }
    }
}

/// Fallback sender for development: logs instead of delivering.
///
/// Active when the Twilio environment is not configured, so the service can
/// run end to end locally with messages visible in the logs.
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl SmsSender for LogSender {
    async fn send(&self, to: &PhoneNumber, body: &str) -> Result<(), SmsError> {
        info!(%to, body, "SMS (log-only delivery)");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{FailingSender, RecordingSender};
    use super::*;

    #[tokio::test]
    async fn deliver_all_sends_every_message() {
        let sender = RecordingSender::default();
        let messages = vec![
            SmsMessage {
                to: "+15551111111".into(),
                body: "one".into(),
            },
            SmsMessage {
                to: "+15552222222".into(),
                body: "two".into(),
            },
        ];

        deliver_all(&sender, &messages).await;
        assert_eq!(*sender.sent.lock().unwrap(), messages);
    }

    #[tokio::test]
    async fn deliver_all_swallows_failures() {
        // Must not panic or short-circuit: delivery is best-effort.
        let messages = vec![SmsMessage {
            to: "+15551111111".into(),
            body: "one".into(),
        }];
        deliver_all(&FailingSender, &messages).await;
    }
}
