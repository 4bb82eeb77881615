//! Public product authenticity certificate.
//!
//! Rendering reads the product and its farmer on every call and writes
//! nothing. A missing product yields [`Certificate::NotFound`]; a dangling
//! farmer reference renders the farmer fields as "Unknown".

use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{farmer, product},
    errors::ServiceError,
    services::qr_binder::verification_url,
};

const UNKNOWN: &str = "Unknown";

/// Escapes text for HTML element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `Some(0)` renders as `0`; only `None` is unknown.
fn measurement(value: Option<Decimal>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", v.normalize(), unit),
        None => UNKNOWN.to_string(),
    }
}

fn text_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// Farmer block of the certificate, already reduced to display strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmerSection {
    pub name: String,
    pub farm_name: String,
    pub location: String,
    pub id: String,
}

impl FarmerSection {
    fn from_model(farmer: Option<&farmer::Model>) -> Self {
        match farmer {
            Some(f) => Self {
                name: text_or_unknown(Some(&f.name)),
                farm_name: text_or_unknown(Some(&f.farm_name)),
                location: text_or_unknown(Some(&f.location)),
                id: f.id.to_string(),
            },
            None => Self {
                name: UNKNOWN.to_string(),
                farm_name: UNKNOWN.to_string(),
                location: UNKNOWN.to_string(),
                id: UNKNOWN.to_string(),
            },
        }
    }
}

/// Product block of the certificate, already reduced to display strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSection {
    pub id: String,
    pub name: String,
    pub image: String,
    pub category: String,
    pub price: String,
    pub quantity: String,
    pub harvest_date: String,
    pub moisture: String,
    pub protein: String,
    pub pesticide_residue: String,
    pub soil_ph: String,
    pub lab_report: Option<String>,
}

impl ProductSection {
    fn from_model(p: &product::Model) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            image: p.image.clone(),
            category: text_or_unknown(p.category.as_deref()),
            price: format!("₹{}", p.price.normalize()),
            quantity: format!("{} kg", p.quantity.normalize()),
            harvest_date: p
                .harvest_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            moisture: measurement(p.moisture, "%"),
            protein: measurement(p.protein, "%"),
            pesticide_residue: measurement(p.pesticide_residue, " ppm"),
            soil_ph: measurement(p.soil_ph, ""),
            lab_report: p.lab_report.clone().filter(|r| !r.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDocument {
    pub farmer: FarmerSection,
    pub product: ProductSection,
    pub verification_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certificate {
    Found(CertificateDocument),
    NotFound,
}

impl CertificateDocument {
    pub fn to_html(&self) -> String {
        let f = &self.farmer;
        let p = &self.product;
        let lab_report = match &p.lab_report {
            Some(href) => format!(
                r#"<a href="{}" target="_blank" rel="noopener">View Report</a>"#,
                escape_html(href)
            ),
            None => "Not provided".to_string(),
        };

        let mut html = String::with_capacity(4096);
        html.push_str(PAGE_HEAD);
        let _ = write!(
            html,
            r#"<div class="certificate">
<div class="header"><h1>Product Authenticity Certificate</h1></div>
<div class="section">
<h3>Farmer Info</h3>
<p><strong>Name:</strong> {farmer_name}</p>
<p><strong>Farm Name:</strong> {farm_name}</p>
<p><strong>Location:</strong> {farmer_location}</p>
<p><strong>Farmer ID:</strong> {farmer_id}</p>
</div>
<div class="section">
<h3>Product Info</h3>
<div class="product-img"><img src="{image}" alt="{name}"></div>
<p><strong>Product ID:</strong> {product_id}</p>
<p><strong>Name:</strong> {name}</p>
<p><strong>Category:</strong> {category}</p>
<p><strong>Price:</strong> {price}</p>
<p><strong>Quantity:</strong> {quantity}</p>
<p><strong>Harvest Date:</strong> {harvest_date}</p>
<p><strong>Moisture:</strong> {moisture}</p>
<p><strong>Protein:</strong> {protein}</p>
<p><strong>Pesticide Residue:</strong> {pesticide}</p>
<p><strong>Soil pH:</strong> {soil_ph}</p>
<p><strong>Lab Report:</strong> {lab_report}</p>
</div>
<div class="verified"><p><strong>Verified:</strong> Authentic Product</p>
<p class="url">{verification_url}</p></div>
</div>
</body>
</html>
"#,
            farmer_name = escape_html(&f.name),
            farm_name = escape_html(&f.farm_name),
            farmer_location = escape_html(&f.location),
            farmer_id = escape_html(&f.id),
            image = escape_html(&p.image),
            name = escape_html(&p.name),
            product_id = escape_html(&p.id),
            category = escape_html(&p.category),
            price = escape_html(&p.price),
            quantity = escape_html(&p.quantity),
            harvest_date = escape_html(&p.harvest_date),
            moisture = escape_html(&p.moisture),
            protein = escape_html(&p.protein),
            pesticide = escape_html(&p.pesticide_residue),
            soil_ph = escape_html(&p.soil_ph),
            lab_report = lab_report,
            verification_url = escape_html(&self.verification_url),
        );
        html
    }
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Product Certificate</title>
<style>
body { font-family: 'Segoe UI', sans-serif; background: #e0f7fa; display: flex; justify-content: center; padding: 40px; }
.certificate { background: white; padding: 30px; border-radius: 15px; max-width: 800px; width: 100%; box-shadow: 0 10px 25px rgba(0,0,0,0.15); }
.header { text-align: center; margin-bottom: 25px; }
.header h1 { color: #00796b; font-size: 28px; }
.section h3 { color: #004d40; border-bottom: 1px solid #b2dfdb; padding-bottom: 5px; }
.product-img { text-align: center; margin: 20px 0; }
.product-img img { max-width: 250px; border-radius: 10px; }
.verified { text-align: right; margin-top: 20px; }
.url { font-size: 12px; color: #607d8b; word-break: break-all; }
a { color: #00796b; font-weight: bold; }
</style>
</head>
<body>
"#;

/// Page shown for unknown, deleted or malformed product identifiers
pub fn not_found_html() -> String {
    format!(
        "{}<div class=\"certificate\"><h2>Product not found</h2>\
<p>This code does not match any listed product.</p></div>\n</body>\n</html>\n",
        PAGE_HEAD
    )
}

/// Page shown when the store cannot be reached
pub fn unavailable_html() -> String {
    format!(
        "{}<div class=\"certificate\"><h2>Certificate temporarily unavailable</h2>\
<p>Please scan again in a moment.</p></div>\n</body>\n</html>\n",
        PAGE_HEAD
    )
}

impl Certificate {
    pub fn to_html(&self) -> String {
        match self {
            Certificate::Found(doc) => doc.to_html(),
            Certificate::NotFound => not_found_html(),
        }
    }
}

#[derive(Clone)]
pub struct CertificateRenderer {
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
}

impl CertificateRenderer {
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Assembles the certificate from current persisted values.
    #[instrument(skip(self))]
    pub async fn render(&self, product_id: Uuid) -> Result<Certificate, ServiceError> {
        let Some(product) = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
        else {
            return Ok(Certificate::NotFound);
        };

        let farmer = farmer::Entity::find_by_id(product.farmer_id)
            .one(&*self.db)
            .await?;

        Ok(Certificate::Found(Self::document(
            &product,
            farmer.as_ref(),
            verification_url(self.config.base_url(), product_id),
        )))
    }

    pub fn document(
        product: &product::Model,
        farmer: Option<&farmer::Model>,
        verification_url: String,
    ) -> CertificateDocument {
        CertificateDocument {
            farmer: FarmerSection::from_model(farmer),
            product: ProductSection::from_model(product),
            verification_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn sample_product() -> product::Model {
        product::Model {
            id: Uuid::now_v7(),
            farmer_id: Uuid::now_v7(),
            name: "Basmati Rice".into(),
            category: Some("Grains".into()),
            price: dec!(85.5000),
            quantity: dec!(120),
            location: Some("Karnal".into()),
            location_key: Some("karnal".into()),
            image: "/uploads/1-rice.jpg".into(),
            harvest_date: NaiveDate::from_ymd_opt(2024, 10, 3),
            moisture: None,
            protein: Some(dec!(7.1)),
            pesticide_residue: Some(dec!(0)),
            soil_ph: Some(dec!(6.5)),
            lab_report: None,
            qr_path: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn sample_farmer(id: Uuid) -> farmer::Model {
        farmer::Model {
            id,
            name: "Asha Patil".into(),
            farm_name: "Green Acres".into(),
            location: "Karnal, Haryana".into(),
            mobile: "9999999999".into(),
            experience: 12,
            email: "asha@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            certificate: None,
            qr_code: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn absent_measurement_is_unknown_and_zero_is_zero() {
        let product = sample_product();
        let doc = CertificateRenderer::document(&product, None, "u".into());

        assert_eq!(doc.product.moisture, "Unknown");
        assert_eq!(doc.product.pesticide_residue, "0 ppm");
        assert_eq!(doc.product.protein, "7.1%");
        assert_eq!(doc.product.price, "₹85.5");
        assert_eq!(doc.product.harvest_date, "2024-10-03");
    }

    #[test]
    fn dangling_farmer_renders_unknown() {
        let doc = CertificateRenderer::document(&sample_product(), None, "u".into());
        assert_eq!(doc.farmer.name, "Unknown");
        assert_eq!(doc.farmer.id, "Unknown");
        assert!(doc.to_html().contains("<strong>Farm Name:</strong> Unknown"));
    }

    #[test]
    fn html_contains_farmer_and_never_credentials() {
        let product = sample_product();
        let farmer = sample_farmer(product.farmer_id);
        let html = CertificateRenderer::document(&product, Some(&farmer), "u".into()).to_html();

        assert!(html.contains("Asha Patil"));
        assert!(html.contains(&product.id.to_string()));
        assert!(!html.contains("argon2"));
        assert!(!html.contains("asha@example.com"));
        assert!(html.contains("<strong>Lab Report:</strong> Not provided"));
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let mut product = sample_product();
        product.name = "<script>alert('x')</script>".into();
        product.lab_report = Some("/uploads/r.pdf\" onclick=\"evil".into());
        let html = CertificateRenderer::document(&product, None, "u".into()).to_html();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("r.pdf&quot; onclick=&quot;evil"));
    }

    #[test]
    fn not_found_page_says_so() {
        assert!(Certificate::NotFound.to_html().contains("Product not found"));
    }
}
