use crate::{
    errors::ApiError,
    handlers::common::{created_response, path_id, success_response},
    services::orders::{OrderView, PlaceOrder},
    AppState,
};
use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    /// Consumer whose orders to list
    pub consumer_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = PlaceOrder,
    responses(
        (status = 201, description = "Order placed", body = OrderView),
        (status = 400, description = "Invalid consumer or order details", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    Json(order): Json<PlaceOrder>,
) -> Result<Response, ApiError> {
    let order = state.services.orders.place_order(order).await?;
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Consumer's orders, newest first", body = [OrderView]),
        (status = 400, description = "Missing or malformed consumer_id", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Response, ApiError> {
    let raw = query
        .consumer_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("consumer_id is required".to_string()))?;
    let consumer_id = path_id(&raw)?;
    let orders = state.services.orders.list_for_consumer(consumer_id).await?;
    Ok(success_response(orders))
}
