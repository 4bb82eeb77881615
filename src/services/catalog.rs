//! Catalog query engine.
//!
//! Criteria are optional per dimension. Dimensions combine with AND, the
//! requested preference tags with OR. Each hit is enriched with a public
//! summary of its farmer.

use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, LikeExpr, Query},
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{farmer, product, product_preference},
    errors::ServiceError,
    services::products::{load_preferences, normalize_tags, ProductDetail},
};

const LIKE_ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    PriceAsc,
    PriceDesc,
    Newest,
}

impl SortBy {
    /// Unknown keys yield `None`, i.e. default order.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "price_asc" => Some(Self::PriceAsc),
            "price_desc" => Some(Self::PriceDesc),
            "newest" => Some(Self::Newest),
            _ => None,
        }
    }
}

/// Search criteria. Every field defaults to "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CatalogCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_price(field: &str, raw: &str) -> Result<Option<Decimal>, ServiceError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => Decimal::from_str(&value)
            .or_else(|_| Decimal::from_scientific(&value))
            .map(Some)
            .map_err(|_| ServiceError::ValidationError(format!("{} must be a number", field))),
    }
}

impl CatalogCriteria {
    /// Builds criteria from raw query-string pairs.
    ///
    /// Accepts snake_case and camelCase keys. `preferences` may repeat and
    /// each value may itself be comma-separated. Blank values are ignored,
    /// unknown keys are ignored, and unknown `sort_by` values mean default
    /// order. Non-numeric prices are a validation error.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Result<Self, ServiceError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut criteria = Self::default();
        let mut tags = Vec::new();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "category" => criteria.category = non_blank(value),
                "min_price" | "minPrice" => criteria.min_price = parse_price("min_price", value)?,
                "max_price" | "maxPrice" => criteria.max_price = parse_price("max_price", value)?,
                "location" => criteria.location = non_blank(value),
                "preferences" | "preferences[]" => {
                    tags.extend(value.split(',').map(str::to_string));
                }
                "sort_by" | "sortBy" => criteria.sort_by = SortBy::parse(value),
                _ => {}
            }
        }

        criteria.preferences = normalize_tags(tags);
        Ok(criteria)
    }

    /// Trims string fields and drops blank ones.
    pub fn normalized(self) -> Self {
        Self {
            category: self.category.as_deref().and_then(non_blank),
            location: self.location.as_deref().and_then(non_blank),
            preferences: normalize_tags(self.preferences),
            ..self
        }
    }
}

/// Escapes LIKE wildcards so user input is matched literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Public farmer fields shown next to a product. No credentials or contact data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct FarmerSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CatalogProduct {
    #[serde(flatten)]
    pub product: ProductDetail,
    /// `None` when the owning farmer no longer resolves
    pub farmer: Option<FarmerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogPage {
    pub count: usize,
    pub applied_filters: CatalogCriteria,
    pub products: Vec<CatalogProduct>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Composes the criteria into one SELECT over products.
    pub fn build_query(criteria: &CatalogCriteria) -> Select<product::Entity> {
        let mut query = product::Entity::find();

        if let Some(category) = &criteria.category {
            query = query.filter(product::Column::Category.eq(category.clone()));
        }
        if let Some(min) = criteria.min_price {
            query = query.filter(product::Column::Price.gte(min));
        }
        if let Some(max) = criteria.max_price {
            query = query.filter(product::Column::Price.lte(max));
        }
        if let Some(location) = &criteria.location {
            let pattern = format!(
                "%{}%",
                escape_like(&product::location_search_key(location))
            );
            query = query.filter(
                Expr::col((product::Entity, product::Column::LocationKey))
                    .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)),
            );
        }
        if !criteria.preferences.is_empty() {
            query = query.filter(
                product::Column::Id.in_subquery(
                    Query::select()
                        .column(product_preference::Column::ProductId)
                        .from(product_preference::Entity)
                        .and_where(
                            product_preference::Column::Tag
                                .is_in(criteria.preferences.iter().cloned()),
                        )
                        .to_owned(),
                ),
            );
        }

        // Identifiers are time-ordered, so id order is insertion order.
        match criteria.sort_by {
            Some(SortBy::PriceAsc) => query
                .order_by_asc(product::Column::Price)
                .order_by_asc(product::Column::Id),
            Some(SortBy::PriceDesc) => query
                .order_by_desc(product::Column::Price)
                .order_by_asc(product::Column::Id),
            Some(SortBy::Newest) => query.order_by_desc(product::Column::Id),
            None => query.order_by_asc(product::Column::Id),
        }
    }

    /// Runs a catalog search. An empty result is a success.
    #[instrument(skip(self))]
    pub async fn search(&self, criteria: CatalogCriteria) -> Result<CatalogPage, ServiceError> {
        let criteria = criteria.normalized();
        let models = Self::build_query(&criteria).all(&*self.db).await?;
        debug!(hits = models.len(), "catalog search");

        let product_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut tags = load_preferences(&self.db, &product_ids).await?;
        let farmers = self.farmer_summaries(&models).await?;

        let products: Vec<CatalogProduct> = models
            .into_iter()
            .map(|model| {
                let farmer = farmers.get(&model.farmer_id).cloned();
                let product_tags = tags.remove(&model.id).unwrap_or_default();
                CatalogProduct {
                    product: ProductDetail::from_model(model, product_tags),
                    farmer,
                }
            })
            .collect();

        Ok(CatalogPage {
            count: products.len(),
            applied_filters: criteria,
            products,
        })
    }

    async fn farmer_summaries(
        &self,
        models: &[product::Model],
    ) -> Result<HashMap<Uuid, FarmerSummary>, ServiceError> {
        let mut farmer_ids: Vec<Uuid> = models.iter().map(|m| m.farmer_id).collect();
        farmer_ids.sort();
        farmer_ids.dedup();
        if farmer_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let summaries = farmer::Entity::find()
            .select_only()
            .column(farmer::Column::Id)
            .column(farmer::Column::Name)
            .column(farmer::Column::Location)
            .filter(farmer::Column::Id.is_in(farmer_ids))
            .into_model::<FarmerSummary>()
            .all(&*self.db)
            .await?;

        Ok(summaries.into_iter().map(|s| (s.id, s)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use sea_orm::{DbBackend, QueryTrait};

    #[rstest]
    #[case("price_asc", Some(SortBy::PriceAsc))]
    #[case("price_desc", Some(SortBy::PriceDesc))]
    #[case("newest", Some(SortBy::Newest))]
    #[case("oldest", None)]
    #[case("", None)]
    fn sort_by_parse(#[case] raw: &str, #[case] expected: Option<SortBy>) {
        assert_eq!(SortBy::parse(raw), expected);
    }

    #[test]
    fn blank_parameters_equal_absent_ones() {
        let blank = CatalogCriteria::from_query_pairs([
            ("category", ""),
            ("minPrice", " "),
            ("location", ""),
            ("preferences", ""),
            ("sortBy", ""),
        ])
        .unwrap();
        assert_eq!(blank, CatalogCriteria::default());
    }

    #[test]
    fn preferences_accept_commas_and_repeats() {
        let criteria = CatalogCriteria::from_query_pairs([
            ("preferences", "organic, local"),
            ("preferences", "organic"),
            ("preferences", "pesticide-free"),
        ])
        .unwrap();
        assert_eq!(
            criteria.preferences,
            vec!["organic", "local", "pesticide-free"]
        );
    }

    #[test]
    fn non_numeric_price_is_validation_error() {
        let result = CatalogCriteria::from_query_pairs([("min_price", "cheap")]);
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn prices_parse_inclusive_bounds() {
        let criteria =
            CatalogCriteria::from_query_pairs([("min_price", "10"), ("max_price", "20.5")]).unwrap();
        assert_eq!(criteria.min_price, Some(dec!(10)));
        assert_eq!(criteria.max_price, Some(dec!(20.5)));
    }

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("pune"), "pune");
    }

    #[test]
    fn empty_criteria_builds_plain_ordered_select() {
        let sql = CatalogService::build_query(&CatalogCriteria::default())
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!sql.contains("WHERE"), "{sql}");
        assert!(sql.ends_with(r#"ORDER BY "products"."id" ASC"#), "{sql}");
    }

    #[test]
    fn preferences_compile_to_subquery() {
        let criteria = CatalogCriteria {
            preferences: vec!["organic".into(), "local".into()],
            ..Default::default()
        };
        let sql = CatalogService::build_query(&criteria)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#""products"."id" IN (SELECT "product_id" FROM "product_preferences""#), "{sql}");
        assert!(sql.contains("'organic'"), "{sql}");
        assert!(sql.contains("'local'"), "{sql}");
    }

    #[test]
    fn location_matches_folded_key_with_folded_pattern() {
        let criteria = CatalogCriteria {
            location: Some("ÉVORA".into()),
            ..Default::default()
        };
        let sql = CatalogService::build_query(&criteria)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#""products"."location_key" LIKE '%évora%'"#), "{sql}");
    }

    #[test]
    fn normalized_trims_and_drops_blank_fields() {
        let criteria = CatalogCriteria {
            category: Some("  ".into()),
            location: Some(" Pune ".into()),
            preferences: vec![" organic ".into(), "".into()],
            ..Default::default()
        }
        .normalized();
        assert_eq!(criteria.category, None);
        assert_eq!(criteria.location.as_deref(), Some("Pune"));
        assert_eq!(criteria.preferences, vec!["organic"]);
    }
}
