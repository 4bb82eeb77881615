use crate::{
    errors::ApiError,
    handlers::common::{
        ack_response, created_response, path_id, success_response, Ack, MultipartForm,
    },
    services::catalog::{CatalogCriteria, CatalogPage},
    services::products::{NewProduct, ProductChanges, ProductCreation, ProductDetail},
    AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multipart body of `POST /api/v1/farmers/{id}/products`
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct ProductForm {
    #[schema(example = "Basmati Rice")]
    name: String,
    #[schema(example = "grains")]
    category: Option<String>,
    /// JSON array string or comma separated list
    #[schema(example = r#"["organic","fresh"]"#)]
    preferences: Option<String>,
    #[schema(example = "85.50")]
    price: String,
    #[schema(example = "120")]
    quantity: String,
    location: Option<String>,
    #[schema(example = "2024-03-01")]
    harvest_date: Option<String>,
    moisture: Option<String>,
    protein: Option<String>,
    pesticide_residue: Option<String>,
    soil_ph: Option<String>,
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
    #[schema(value_type = Option<String>, format = Binary)]
    lab_report: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductQrResponse {
    pub qr_path: String,
}

fn new_product_from_form(form: &MultipartForm) -> Result<NewProduct, ApiError> {
    Ok(NewProduct {
        name: form.text(&["name"]).unwrap_or_default(),
        category: form.text(&["category"]),
        preferences: form.tags(&["preferences", "preferences[]"])?,
        price: form.required_decimal(&["price"])?,
        quantity: form.required_decimal(&["quantity"])?,
        location: form.text(&["location"]),
        harvest_date: form.date(&["harvest_date", "harvestDate"])?,
        moisture: form.decimal(&["moisture"])?,
        protein: form.decimal(&["protein"])?,
        pesticide_residue: form.decimal(&["pesticide_residue", "pesticideResidue", "pesticide"])?,
        soil_ph: form.decimal(&["soil_ph", "soilPh", "ph"])?,
    })
}

fn changes_from_form(form: &MultipartForm) -> Result<ProductChanges, ApiError> {
    Ok(ProductChanges {
        name: form.text(&["name"]),
        category: form.text(&["category"]),
        price: form.decimal(&["price"])?,
        quantity: form.decimal(&["quantity"])?,
        location: form.text(&["location"]),
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/farmers/{id}/products",
    params(("id" = String, Path, description = "Owning farmer ID")),
    request_body(content = ProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Product listed; `qr_pending` reports a deferred QR bind", body = ProductCreation),
        (status = 400, description = "Malformed identifier, missing image or invalid attributes", body = crate::errors::ErrorResponse),
        (status = 404, description = "Farmer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let farmer_id = path_id(&id)?;
    let mut form = MultipartForm::read(multipart).await?;
    let input = new_product_from_form(&form)?;
    let image = form.take_file(&["image"]);
    let lab_report = form.take_file(&["lab_report", "labReport"]);

    let creation = state
        .services
        .products
        .create_product(farmer_id, input, image, lab_report)
        .await?;
    Ok(created_response(creation))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(
        ("category" = Option<String>, Query, description = "Exact category"),
        ("min_price" = Option<String>, Query, description = "Inclusive lower price bound"),
        ("max_price" = Option<String>, Query, description = "Inclusive upper price bound"),
        ("location" = Option<String>, Query, description = "Case-insensitive substring of the product location"),
        ("preferences" = Option<Vec<String>>, Query, description = "Any-of preference tags; repeated or comma separated"),
        ("sort_by" = Option<String>, Query, description = "price_asc, price_desc or newest")
    ),
    responses(
        (status = 200, description = "Matching products", body = CatalogPage),
        (status = 400, description = "Non-numeric price bound", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let criteria = CatalogCriteria::from_query_pairs(pairs)?;
    let page = state.services.catalog.search(criteria).await?;
    Ok(success_response(page))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    request_body(content = ProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Product updated", body = ProductDetail),
        (status = 400, description = "Malformed identifier or invalid attributes", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let product_id = path_id(&id)?;
    let mut form = MultipartForm::read(multipart).await?;
    let changes = changes_from_form(&form)?;
    let image = form.take_file(&["image"]);

    let product = state
        .services
        .products
        .update_product(product_id, changes, image)
        .await?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = Ack),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let product_id = path_id(&id)?;
    state.services.products.delete_product(product_id).await?;
    Ok(ack_response("Product deleted successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/qr",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Authenticity QR reference", body = ProductQrResponse),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or QR not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn product_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let product_id = path_id(&id)?;
    let qr_path = state.services.products.qr_artifact(product_id).await?;
    Ok(success_response(ProductQrResponse { qr_path }))
}
