// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CheckServiceRequest, CheckServiceResponse, CreateServiceRequest, CreateServiceResponse,
        DummySmsRequest, GenerateCodeRequest, StatusResponse, UpdatePhoneRequest,
        UpdateServiceRequest, VerifyCodeRequest, WalletAddress,
    },
    state::AppState,
};

pub mod health;
pub mod linking;
pub mod service;
pub mod webhook;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/create-sms-service", post(service::create_sms_service))
        .route("/check-sms-service", post(service::check_sms_service))
        .route("/update-sms-service", post(service::update_sms_service))
        .route("/generate-2fa-code", post(linking::generate_2fa_code))
        .route("/verify-2fa-code", post(linking::verify_2fa_code))
        .route("/update-phone-number", post(linking::update_phone_number))
        .route("/twilio-webhook", post(webhook::twilio_webhook))
        .route("/send-dummy-sms", post(webhook::send_dummy_sms))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        service::create_sms_service,
        service::check_sms_service,
        service::update_sms_service,
        linking::generate_2fa_code,
        linking::verify_2fa_code,
        linking::update_phone_number,
        webhook::twilio_webhook,
        webhook::send_dummy_sms,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            WalletAddress,
            CreateServiceRequest,
            CreateServiceResponse,
            CheckServiceRequest,
            CheckServiceResponse,
            UpdateServiceRequest,
            GenerateCodeRequest,
            VerifyCodeRequest,
            UpdatePhoneRequest,
            DummySmsRequest,
            StatusResponse,
            webhook::InboundSmsForm,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Service", description = "Wallet onboarding and authorization settings"),
        (name = "Linking", description = "Phone number verification and linking"),
        (name = "Webhook", description = "Inbound SMS commands and test delivery"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (_dir, state, _sms) = test_state();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
