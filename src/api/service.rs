// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! Wallet onboarding and authorization management.

use axum::{extract::State, Json};

use crate::{
    error::ApiError,
    keys,
    models::{
        CheckServiceRequest, CheckServiceResponse, CreateServiceRequest, CreateServiceResponse,
        StatusResponse, UpdateServiceRequest,
    },
    state::AppState,
    storage::SmsServiceRecord,
};

#[utoipa::path(
    post,
    path = "/create-sms-service",
    request_body = CreateServiceRequest,
    tag = "Service",
    responses(
        (status = 200, body = CreateServiceResponse),
        (status = 409, description = "Wallet already onboarded")
    )
)]
pub async fn create_sms_service(
    State(state): State<AppState>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<Json<CreateServiceResponse>, ApiError> {
    let (private_pem, public_pem) =
        keys::generate_keypair().map_err(|_| ApiError::internal("Internal server error"))?;

    let record = SmsServiceRecord::new(request.wallet_address.as_str(), public_pem);
    state.db.identities().create(&record)?;

    // The private key leaves the server exactly once, in this response.
    Ok(Json(CreateServiceResponse {
        status: "created".to_string(),
        private_key: private_pem,
    }))
}

#[utoipa::path(
    post,
    path = "/check-sms-service",
    request_body = CheckServiceRequest,
    tag = "Service",
    responses((status = 200, body = CheckServiceResponse))
)]
pub async fn check_sms_service(
    State(state): State<AppState>,
    Json(request): Json<CheckServiceRequest>,
) -> Result<Json<CheckServiceResponse>, ApiError> {
    let record = state
        .db
        .identities()
        .get_by_wallet(request.wallet_address.as_str())?;

    let response = match record {
        None => CheckServiceResponse {
            does_exist: false,
            is_primary: None,
            passkey: None,
            limit: None,
        },
        Some(record) => {
            let is_primary = record.phone_number.is_some();
            // Passkey and limit are only disclosed once a phone is linked,
            // mirroring the primary/non-primary split of the dashboard.
            CheckServiceResponse {
                does_exist: true,
                is_primary: Some(is_primary),
                passkey: is_primary.then_some(record.passkey),
                limit: is_primary.then_some(record.limit_usd),
            }
        }
    };

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/update-sms-service",
    request_body = UpdateServiceRequest,
    tag = "Service",
    responses((status = 200, body = StatusResponse))
)]
pub async fn update_sms_service(
    State(state): State<AppState>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if !request.limit.is_finite() || request.limit < 0.0 {
        return Err(ApiError::bad_request("limit must be a non-negative number"));
    }

    state.db.identities().set_authorization(
        request.wallet_address.as_str(),
        &request.passkey,
        request.limit,
    )?;

    Ok(Json(StatusResponse::success(
        "SMS service updated successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn create_returns_private_key_once_and_stores_public_key() {
        let (_dir, state, _sms) = test_state();

        let Json(response) = create_sms_service(
            State(state.clone()),
            Json(CreateServiceRequest {
                wallet_address: "0xwallet".into(),
            }),
        )
        .await
        .expect("onboarding succeeds");

        assert_eq!(response.status, "created");
        assert!(response.private_key.contains("BEGIN PRIVATE KEY"));

        let record = state.db.identities().get_by_wallet("0xwallet").unwrap().unwrap();
        assert!(record.public_key.contains("BEGIN PUBLIC KEY"));
        assert!(record.phone_number.is_none());
        assert_eq!(record.limit_usd, crate::storage::DEFAULT_LIMIT_USD);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_onboarding() {
        let (_dir, state, _sms) = test_state();
        let request = CreateServiceRequest {
            wallet_address: "0xwallet".into(),
        };

        create_sms_service(State(state.clone()), Json(request.clone()))
            .await
            .unwrap();
        let err = create_sms_service(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn check_distinguishes_unknown_unlinked_and_linked() {
        let (_dir, state, _sms) = test_state();

        let Json(missing) = check_sms_service(
            State(state.clone()),
            Json(CheckServiceRequest {
                wallet_address: "0xunknown".into(),
            }),
        )
        .await
        .unwrap();
        assert!(!missing.does_exist);
        assert!(missing.is_primary.is_none());

        create_sms_service(
            State(state.clone()),
            Json(CreateServiceRequest {
                wallet_address: "0xwallet".into(),
            }),
        )
        .await
        .unwrap();

        let Json(unlinked) = check_sms_service(
            State(state.clone()),
            Json(CheckServiceRequest {
                wallet_address: "0xwallet".into(),
            }),
        )
        .await
        .unwrap();
        assert!(unlinked.does_exist);
        assert_eq!(unlinked.is_primary, Some(false));
        assert!(unlinked.passkey.is_none());

        state
            .db
            .identities()
            .set_authorization("0xwallet", "p1", 500.0)
            .unwrap();
        state
            .db
            .identities()
            .link_phone("0xwallet", "+15551234567")
            .unwrap();

        let Json(linked) = check_sms_service(
            State(state),
            Json(CheckServiceRequest {
                wallet_address: "0xwallet".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(linked.is_primary, Some(true));
        assert_eq!(linked.passkey.as_deref(), Some("p1"));
        assert_eq!(linked.limit, Some(500.0));
    }

    #[tokio::test]
    async fn update_upserts_passkey_and_limit() {
        let (_dir, state, _sms) = test_state();

        update_sms_service(
            State(state.clone()),
            Json(UpdateServiceRequest {
                wallet_address: "0xwallet".into(),
                passkey: "p1".into(),
                limit: 250.0,
            }),
        )
        .await
        .unwrap();

        let record = state.db.identities().get_by_wallet("0xwallet").unwrap().unwrap();
        assert_eq!(record.passkey, "p1");
        assert_eq!(record.limit_usd, 250.0);
    }

    #[tokio::test]
    async fn update_rejects_bad_limit() {
        let (_dir, state, _sms) = test_state();
        let err = update_sms_service(
            State(state),
            Json(UpdateServiceRequest {
                wallet_address: "0xwallet".into(),
                passkey: "p1".into(),
                limit: -1.0,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
