use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub outlet_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub delivery_address: String,
    pub pincode: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub delivery_agent_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub outlet_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub delivery_address: String,
    pub pincode: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Priced order line, resolved server-side from the outlet's menu before the
/// order row is written.
#[derive(Debug, Clone)]
pub struct PricedItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl PricedItem {
    pub fn new(
        product_id: Uuid,
        product_name: String,
        product_price: Decimal,
        product_image: Option<String>,
        quantity: i32,
    ) -> Self {
        let subtotal = product_price * Decimal::from(quantity);
        Self {
            product_id,
            product_name,
            product_price,
            product_image,
            quantity,
            subtotal,
        }
    }
}

pub fn order_total(items: &[PricedItem]) -> Decimal {
    items.iter().map(|i| i.subtotal).sum()
}

/// Outlet-dashboard row: order plus assigned-agent contact info.
#[derive(Debug, FromRow, Serialize)]
pub struct OutletOrderRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub delivery_agent_name: Option<String>,
    pub delivery_agent_phone: Option<String>,
}

/// Customer-history row: order plus the outlet it was placed against.
#[derive(Debug, FromRow, Serialize)]
pub struct CustomerOrderRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub outlet_name: String,
    pub outlet_address: String,
}

/// Delivery-dashboard row: order plus pickup outlet contact info.
#[derive(Debug, FromRow, Serialize)]
pub struct DeliveryOrderRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub outlet_name: String,
    pub outlet_address: String,
    pub outlet_phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems<T> {
    #[serde(flatten)]
    pub order: T,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOutletOrderRequest {
    pub order_id: Uuid,
    pub status: Option<OrderStatus>,
    pub delivery_agent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeliveryOrderRequest {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(price: &str, quantity: i32) -> PricedItem {
        PricedItem::new(
            Uuid::new_v4(),
            "Mango Kulfi".into(),
            price.parse().unwrap(),
            None,
            quantity,
        )
    }

    #[test]
    fn subtotal_is_price_times_quantity() {
        let item = priced("49.50", 3);
        assert_eq!(item.subtotal, "148.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn total_sums_subtotals_exactly() {
        let items = vec![priced("49.50", 3), priced("120.00", 1), priced("0.01", 2)];
        assert_eq!(order_total(&items), "268.52".parse::<Decimal>().unwrap());
    }

    #[test]
    fn total_of_no_items_is_zero() {
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }
}
