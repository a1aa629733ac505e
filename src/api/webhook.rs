// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Inbound SMS webhook and the test-only delivery route.
//!
//! The webhook is the SMS channel's entry point: Twilio posts the sender and
//! body as form data, the body is parsed into a transfer instruction, and the
//! instruction runs through the transaction engine. The HTTP response only
//! acknowledges receipt to the carrier; all user-visible feedback (success or
//! the specific rejection reason) travels back over SMS, since that is the
//! only channel a phone-only user can see.

use axum::{extract::State, Form, Json};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    engine::TransferEngine,
    error::ApiError,
    models::{DummySmsRequest, PhoneNumber, StatusResponse},
    sms::{self, parse_command, SmsMessage},
    state::AppState,
};

/// Form payload Twilio posts for an inbound message.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InboundSmsForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
}

#[utoipa::path(
    post,
    path = "/twilio-webhook",
    request_body(content = InboundSmsForm, content_type = "application/x-www-form-urlencoded"),
    tag = "Webhook",
    responses(
        (status = 200, description = "Message received"),
        (status = 400, description = "Missing 'From' or 'Body' in form data")
    )
)]
pub async fn twilio_webhook(
    State(state): State<AppState>,
    Form(form): Form<InboundSmsForm>,
) -> Result<&'static str, ApiError> {
    let (from, body) = match (form.from, form.body) {
        (Some(from), Some(body)) if !from.is_empty() && !body.is_empty() => (from, body),
        _ => {
            return Err(ApiError::bad_request(
                "Missing 'From' or 'Body' in form data",
            ))
        }
    };

    let sender_phone = PhoneNumber::canonicalize(&from);

    let instruction = match parse_command(sender_phone.clone(), &body) {
        Ok(instruction) => instruction,
        Err(err) => {
            warn!(from = %sender_phone, error = %err, "failed to parse SMS command");
            let reject = SmsMessage {
                to: sender_phone,
                body: "Failed to parse SMS content".to_string(),
            };
            sms::deliver_all(state.sms.as_ref(), &[reject]).await;
            return Ok("Message received");
        }
    };

    match TransferEngine::new(&state.db).execute(&instruction) {
        Ok(outcome) => {
            info!(transfer_id = %outcome.transfer_id, "transfer executed from SMS command");
            sms::deliver_all(state.sms.as_ref(), &outcome.notifications).await;
        }
        Err(err) => {
            // Clean rejection: no ledger mutation happened. Tell the sender why.
            let reject = SmsMessage {
                to: instruction.sender_phone.clone(),
                body: err.sms_reason(),
            };
            sms::deliver_all(state.sms.as_ref(), &[reject]).await;
        }
    }

    Ok("Message received")
}

#[utoipa::path(
    post,
    path = "/send-dummy-sms",
    request_body = DummySmsRequest,
    tag = "Webhook",
    responses(
        (status = 200, body = StatusResponse),
        (status = 500, description = "Delivery failed")
    )
)]
pub async fn send_dummy_sms(
    State(state): State<AppState>,
    Json(request): Json<DummySmsRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let phone = PhoneNumber::canonicalize(&request.phone_number);

    state
        .sms
        .send(&phone, "This is a test message from CryptoSMS.")
        .await
        .map_err(|err| {
            warn!(to = %phone, error = %err, "dummy SMS delivery failed");
            ApiError::internal("Failed to send SMS")
        })?;

    Ok(Json(StatusResponse::success("Dummy SMS sent successfully")))
}
