// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Twilio REST API client for outbound SMS.
//!
//! Messages are created via `POST /2010-04-01/Accounts/{sid}/Messages.json`
//! with form-encoded `To`/`From`/`Body` and HTTP basic auth
//! (`ACCOUNT_SID:AUTH_TOKEN`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::models::PhoneNumber;

use super::{SmsError, SmsSender};

const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Twilio-backed [`SmsSender`].
#[derive(Debug, Clone)]
pub struct TwilioSender {
    api_base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: PhoneNumber,
    http: Client,
}

impl TwilioSender {
    /// Whether the Twilio environment is fully configured.
    pub fn is_configured() -> bool {
        required_env_present("TWILIO_ACCOUNT_SID")
            && required_env_present("TWILIO_AUTH_TOKEN")
            && required_env_present("TWILIO_PHONE_NUMBER")
    }

    /// Build a sender from the environment.
    ///
    /// Callers should gate on [`TwilioSender::is_configured`]; a partially
    /// configured environment is an error rather than a silent fallback.
    pub fn from_env() -> Result<Self, SmsError> {
        let account_sid = env_required("TWILIO_ACCOUNT_SID")?;
        let auth_token = env_required("TWILIO_AUTH_TOKEN")?;
        let from_number = PhoneNumber::canonicalize(&env_required("TWILIO_PHONE_NUMBER")?);
        let api_base_url = std::env::var("TWILIO_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SmsError::Request(e.to_string()))?;

        Ok(Self {
            api_base_url,
            account_sid,
            auth_token,
            from_number,
            http,
        })
    }

    /// The configured outbound sender identity.
    pub fn from_number(&self) -> &PhoneNumber {
        &self.from_number
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    async fn send(&self, to: &PhoneNumber, body: &str) -> Result<(), SmsError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        );

        let params = [
            ("To", to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(())
    }
}

fn required_env_present(key: &str) -> bool {
    std::env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn env_required(key: &str) -> Result<String, SmsError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SmsError::Request(format!("missing environment variable {key}")))
}
