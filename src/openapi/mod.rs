use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AgriDirect API",
        version = "1.0.0",
        description = r#"
# AgriDirect Farm-to-Consumer Marketplace API

Farmers list produce with lab measurements; every listing gets an
authenticity QR code that resolves to a public certificate page at
`/product/{id}/view`. Consumers browse the catalog and place orders.

## Catalog filters

`GET /api/v1/products` accepts `category`, `min_price`, `max_price`
(inclusive), `location` (case-insensitive substring), repeated or comma
separated `preferences` (any-of) and `sort_by` (`price_asc`, `price_desc`,
`newest`). Unknown `sort_by` values are ignored.

## Error Handling

JSON endpoints report failures as:

```json
{
  "error": "Bad Request",
  "message": "Invalid identifier: abc",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Malformed identifiers are `400`; well-formed identifiers that resolve to
nothing are `404`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "farmers", description = "Farmer accounts and their listings"),
        (name = "products", description = "Product listings and catalog search"),
        (name = "consumers", description = "Consumer accounts"),
        (name = "orders", description = "Order placement and history"),
        (name = "certificates", description = "Public authenticity certificates")
    ),
    paths(
        // Farmers
        crate::handlers::farmers::register_farmer,
        crate::handlers::farmers::login_farmer,
        crate::handlers::farmers::farmer_qr,
        crate::handlers::farmers::farmer_products,
        crate::handlers::farmers::farmer_orders,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::search_products,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::product_qr,

        // Consumers
        crate::handlers::consumers::check_email,
        crate::handlers::consumers::register_consumer,
        crate::handlers::consumers::login_consumer,

        // Orders
        crate::handlers::orders::place_order,
        crate::handlers::orders::list_orders,

        // Certificates
        crate::handlers::certificates::view_certificate,
    ),
    components(
        schemas(
            crate::handlers::common::Ack,

            crate::handlers::farmers::FarmerRegistrationForm,
            crate::handlers::farmers::FarmerQrResponse,
            crate::services::accounts::Credentials,
            crate::services::accounts::FarmerProfile,
            crate::services::accounts::FarmerSession,

            crate::handlers::products::ProductForm,
            crate::handlers::products::ProductQrResponse,
            crate::services::products::ProductDetail,
            crate::services::products::ProductCreation,
            crate::services::catalog::SortBy,
            crate::services::catalog::CatalogCriteria,
            crate::services::catalog::FarmerSummary,
            crate::services::catalog::CatalogProduct,
            crate::services::catalog::CatalogPage,

            crate::handlers::consumers::EmailCheckRequest,
            crate::handlers::consumers::EmailCheckResponse,
            crate::services::accounts::ConsumerRegistration,
            crate::services::accounts::ConsumerProfile,

            crate::services::orders::PlaceOrder,
            crate::services::orders::OrderView,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
