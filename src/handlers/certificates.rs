use crate::{
    identifiers,
    services::certificate::{not_found_html, unavailable_html, Certificate},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{error, info};

/// Public certificate page a scanned authenticity QR lands on.
///
/// Malformed and unknown identifiers both get the "Product not found" page;
/// only a store failure produces an error status.
#[utoipa::path(
    get,
    path = "/product/{id}/view",
    params(("id" = String, Path, description = "Product ID encoded in the QR")),
    responses(
        (status = 200, description = "Certificate page", content_type = "text/html", body = String),
        (status = 404, description = "Product not found page", content_type = "text/html", body = String),
        (status = 503, description = "Certificate temporarily unavailable", content_type = "text/html", body = String)
    ),
    tag = "certificates"
)]
pub async fn view_certificate(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(product_id) = identifiers::parse(&id) else {
        info!(id = %id, "certificate requested for malformed identifier");
        return (StatusCode::NOT_FOUND, Html(not_found_html())).into_response();
    };

    match state.services.certificates.render(product_id).await {
        Ok(certificate @ Certificate::Found(_)) => Html(certificate.to_html()).into_response(),
        Ok(Certificate::NotFound) => {
            (StatusCode::NOT_FOUND, Html(not_found_html())).into_response()
        }
        Err(e) => {
            error!(%product_id, error = %e, "certificate lookup failed");
            (StatusCode::SERVICE_UNAVAILABLE, Html(unavailable_html())).into_response()
        }
    }
}
