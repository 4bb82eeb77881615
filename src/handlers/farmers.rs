use crate::{
    errors::ApiError,
    handlers::common::{created_response, path_id, success_response, MultipartForm},
    services::accounts::{Credentials, FarmerProfile, FarmerRegistration, FarmerSession},
    services::orders::OrderView,
    services::products::ProductDetail,
    AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multipart body of `POST /api/v1/farmers/register`
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct FarmerRegistrationForm {
    name: String,
    #[schema(example = "Green Acres")]
    farm_name: String,
    location: String,
    mobile: String,
    #[schema(example = 12)]
    experience: i32,
    email: String,
    password: String,
    #[schema(value_type = Option<String>, format = Binary)]
    certificate: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    qr_code: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FarmerQrResponse {
    pub qr_code: String,
}

fn registration_from_form(form: &MultipartForm) -> Result<FarmerRegistration, ApiError> {
    Ok(FarmerRegistration {
        name: form.required_text(&["name"])?,
        farm_name: form.required_text(&["farm_name", "farmName"])?,
        location: form.required_text(&["location"])?,
        mobile: form.required_text(&["mobile"])?,
        experience: form.integer(&["experience"])?.unwrap_or(0),
        email: form.required_text(&["email"])?,
        password: form.required_text(&["password"])?,
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/farmers/register",
    request_body(content = FarmerRegistrationForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Farmer registered", body = FarmerProfile),
        (status = 400, description = "Invalid registration", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "farmers"
)]
pub async fn register_farmer(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = MultipartForm::read(multipart).await?;
    let registration = registration_from_form(&form)?;
    let certificate = form.take_file(&["certificate"]);
    let qr_code = form.take_file(&["qr_code", "qrCode"]);

    let profile = state
        .services
        .accounts
        .register_farmer(registration, certificate, qr_code)
        .await?;
    Ok(created_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/farmers/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Logged in", body = FarmerSession),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse)
    ),
    tag = "farmers"
)]
pub async fn login_farmer(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Response, ApiError> {
    let session = state.services.accounts.login_farmer(credentials).await?;
    Ok(success_response(session))
}

#[utoipa::path(
    get,
    path = "/api/v1/farmers/{id}/qr",
    params(("id" = String, Path, description = "Farmer ID")),
    responses(
        (status = 200, description = "Farmer QR reference", body = FarmerQrResponse),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse),
        (status = 404, description = "Farmer or QR not found", body = crate::errors::ErrorResponse)
    ),
    tag = "farmers"
)]
pub async fn farmer_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let farmer_id = path_id(&id)?;
    let qr_code = state.services.accounts.farmer_qr(farmer_id).await?;
    Ok(success_response(FarmerQrResponse { qr_code }))
}

#[utoipa::path(
    get,
    path = "/api/v1/farmers/{id}/products",
    params(("id" = String, Path, description = "Farmer ID")),
    responses(
        (status = 200, description = "Products owned by the farmer", body = [ProductDetail]),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse)
    ),
    tag = "farmers"
)]
pub async fn farmer_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let farmer_id = path_id(&id)?;
    let products = state.services.products.list_by_farmer(farmer_id).await?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/farmers/{id}/orders",
    params(("id" = String, Path, description = "Farmer ID")),
    responses(
        (status = 200, description = "Orders received by the farmer, newest first", body = [OrderView]),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse)
    ),
    tag = "farmers"
)]
pub async fn farmer_orders(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let farmer_id = path_id(&id)?;
    let orders = state.services.orders.list_for_farmer(farmer_id).await?;
    Ok(success_response(orders))
}
