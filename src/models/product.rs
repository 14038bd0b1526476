use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub category: Option<String>,
    pub image_url: String,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub category: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[allow(dead_code)]
pub struct OutletProduct {
    pub id: Uuid,
    pub outlet_id: Uuid,
    pub product_id: Uuid,
    pub is_available: bool,
    pub custom_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner's catalog left-joined with one outlet's availability junction.
#[derive(Debug, FromRow, Serialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub category: Option<String>,
    pub image_url: String,
    pub is_active: bool,
    pub outlet_product_id: Option<Uuid>,
    pub is_available: Option<bool>,
    pub custom_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertOutletProductRequest {
    pub product_id: Uuid,
    pub is_available: Option<bool>,
    pub custom_price: Option<Decimal>,
}

/// A menu line: `price` is the outlet's custom price when set, the base
/// price otherwise.
#[derive(Debug, FromRow, Serialize)]
pub struct MenuProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(skip)]
    pub price: Decimal,
    pub base_price: Decimal,
    #[serde(skip)]
    pub custom_price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: String,
}

impl MenuProduct {
    pub fn with_effective_price(mut self) -> Self {
        self.price = self.custom_price.unwrap_or(self.base_price);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu_product(base: &str, custom: Option<&str>) -> MenuProduct {
        MenuProduct {
            id: Uuid::new_v4(),
            name: "Vanilla Scoop".into(),
            description: None,
            price: Decimal::ZERO,
            base_price: base.parse().unwrap(),
            custom_price: custom.map(|c| c.parse().unwrap()),
            category: None,
            image_url: "https://example.com/vanilla.jpg".into(),
        }
    }

    #[test]
    fn custom_price_wins_over_base_price() {
        let p = menu_product("120.00", Some("99.50")).with_effective_price();
        assert_eq!(p.price, "99.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn base_price_applies_without_custom_price() {
        let p = menu_product("120.00", None).with_effective_price();
        assert_eq!(p.price, "120.00".parse::<Decimal>().unwrap());
    }
}
