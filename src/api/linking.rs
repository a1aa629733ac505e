// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Phone-number linking: one-time code issuance, verification, and the
//! owner-driven re-link path.
//!
//! Two policies coexist deliberately. The code-verification path refuses to
//! claim a number held by a different wallet (409), because possession of a
//! code proves control of the phone, not of the other wallet. The explicit
//! `/update-phone-number` path re-links and detaches the previous holder
//! atomically, treating the phone as the single source of truth.

use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    error::ApiError,
    models::{
        GenerateCodeRequest, PhoneNumber, StatusResponse, UpdatePhoneRequest, VerifyCodeRequest,
    },
    state::AppState,
    storage::TwoFactorError,
};

#[utoipa::path(
    post,
    path = "/generate-2fa-code",
    request_body = GenerateCodeRequest,
    tag = "Linking",
    responses(
        (status = 200, body = StatusResponse),
        (status = 500, description = "Code could not be stored or delivered")
    )
)]
pub async fn generate_2fa_code(
    State(state): State<AppState>,
    Json(request): Json<GenerateCodeRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let phone = PhoneNumber::canonicalize(&request.phone_number);

    let code = state.db.two_factor().issue(phone.as_str())?;

    state
        .sms
        .send(&phone, &format!("Your 2FA code is: {code}"))
        .await
        .map_err(|err| {
            tracing::warn!(to = %phone, error = %err, "2FA code delivery failed");
            ApiError::internal("Failed to send 2FA code")
        })?;

    Ok(Json(StatusResponse::success("2FA code sent successfully")))
}

#[utoipa::path(
    post,
    path = "/verify-2fa-code",
    request_body = VerifyCodeRequest,
    tag = "Linking",
    responses(
        (status = 200, body = StatusResponse),
        (status = 401, description = "Code mismatch or expired"),
        (status = 409, description = "Phone number linked to another wallet")
    )
)]
pub async fn verify_2fa_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let phone = PhoneNumber::canonicalize(&request.phone_number);

    state
        .db
        .two_factor()
        .verify_and_consume(phone.as_str(), &request.code, Utc::now())
        .map_err(|err| match err {
            TwoFactorError::Mismatch => ApiError::unauthorized("Invalid 2FA code"),
            TwoFactorError::Expired => ApiError::unauthorized("2FA code expired"),
            TwoFactorError::Store(e) => ApiError::from(e),
        })?;

    // Verification proves control of the phone, not of another wallet that
    // already holds it. Re-claiming for the same wallet is allowed. The
    // conflict check runs inside the link's write transaction, so concurrent
    // claims of the same number cannot both pass it.
    let linked = state
        .db
        .identities()
        .link_phone_if_unheld(request.wallet_address.as_str(), phone.as_str())?;
    if !linked {
        return Err(ApiError::conflict(
            "Phone number already linked to another account",
        ));
    }

    Ok(Json(StatusResponse::success(
        "Phone number updated successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/update-phone-number",
    request_body = UpdatePhoneRequest,
    tag = "Linking",
    responses((status = 200, body = StatusResponse))
)]
pub async fn update_phone_number(
    State(state): State<AppState>,
    Json(request): Json<UpdatePhoneRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let phone = PhoneNumber::canonicalize(&request.phone_number);

    state
        .db
        .identities()
        .link_phone(request.wallet_address.as_str(), phone.as_str())?;

    Ok(Json(StatusResponse::success(
        "Phone number updated successfully",
    )))
}
