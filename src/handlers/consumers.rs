use crate::{
    errors::ApiError,
    handlers::common::{created_response, success_response},
    services::accounts::{ConsumerProfile, ConsumerRegistration, Credentials},
    AppState,
};
use axum::{extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailCheckRequest {
    #[schema(example = "ravi@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmailCheckResponse {
    pub exists: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/consumers/check-email",
    request_body = EmailCheckRequest,
    responses(
        (status = 200, description = "Whether a consumer already uses this email", body = EmailCheckResponse)
    ),
    tag = "consumers"
)]
pub async fn check_email(
    State(state): State<AppState>,
    Json(request): Json<EmailCheckRequest>,
) -> Result<Response, ApiError> {
    let exists = state
        .services
        .accounts
        .consumer_email_exists(&request.email)
        .await?;
    Ok(success_response(EmailCheckResponse { exists }))
}

#[utoipa::path(
    post,
    path = "/api/v1/consumers/register",
    request_body = ConsumerRegistration,
    responses(
        (status = 201, description = "Consumer registered", body = ConsumerProfile),
        (status = 400, description = "Invalid registration", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "consumers"
)]
pub async fn register_consumer(
    State(state): State<AppState>,
    Json(registration): Json<ConsumerRegistration>,
) -> Result<Response, ApiError> {
    let profile = state
        .services
        .accounts
        .register_consumer(registration)
        .await?;
    Ok(created_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/consumers/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Logged in", body = ConsumerProfile),
        (status = 401, description = "Invalid name, email, or password", body = crate::errors::ErrorResponse)
    ),
    tag = "consumers"
)]
pub async fn login_consumer(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Response, ApiError> {
    let profile = state.services.accounts.login_consumer(credentials).await?;
    Ok(success_response(profile))
}
