use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::AppState;
use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::geo;
use crate::models::order::{
    CreateOrderRequest, CustomerOrderRow, DeliveryOrderRow, Order, OrderItem, OrderStatus,
    OrderWithItems, OutletOrderRow, PricedItem, UpdateDeliveryOrderRequest,
    UpdateOutletOrderRequest, order_total,
};

use super::access;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/store/orders", get(list_my_orders).post(create_order))
        .route(
            "/api/outlets/{id}/orders",
            get(list_outlet_orders).patch(update_outlet_order),
        )
        .route(
            "/api/delivery/orders",
            get(list_delivery_orders).patch(update_delivery_order),
        )
}

/// Batch-fetch items for multiple orders.
async fn fetch_items_batch(
    pool: &PgPool,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItem>>, AppError> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY created_at",
    )
    .bind(order_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        map.entry(item.order_id).or_default().push(item);
    }
    Ok(map)
}

/// Menu row used to price an order line server-side.
#[derive(Debug, sqlx::FromRow)]
struct PricingRow {
    id: Uuid,
    name: String,
    base_price: Decimal,
    custom_price: Option<Decimal>,
    image_url: String,
}

async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithItems<Order>>), AppError> {
    let customer_name = body.customer_name.trim().to_string();
    let customer_phone = body.customer_phone.trim().to_string();
    let customer_email = body.customer_email.trim().to_lowercase();
    let delivery_address = body.delivery_address.trim().to_string();

    if customer_name.is_empty()
        || customer_phone.is_empty()
        || customer_email.is_empty()
        || delivery_address.is_empty()
    {
        return Err(AppError::BadRequest("Missing required fields".into()));
    }
    geo::validate_pincode(&body.pincode)?;
    if body.items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }
    if body.items.iter().any(|i| i.quantity < 1) {
        return Err(AppError::BadRequest("Item quantities must be at least 1".into()));
    }

    let outlet = access::fetch_outlet(&state.db, body.outlet_id).await?;
    if !outlet.is_active {
        return Err(AppError::BadRequest("Outlet is currently closed".into()));
    }

    // Prices come from the outlet's menu, never from the client.
    let product_ids: Vec<Uuid> = body.items.iter().map(|i| i.product_id).collect();
    let rows = sqlx::query_as::<_, PricingRow>(
        "SELECT p.id, p.name, p.base_price, op.custom_price, p.image_url
         FROM outlet_products op
         JOIN products p ON p.id = op.product_id
         WHERE op.outlet_id = $1 AND op.is_available AND p.is_active AND p.id = ANY($2)",
    )
    .bind(outlet.id)
    .bind(&product_ids)
    .fetch_all(&state.db)
    .await?;

    let by_id: HashMap<Uuid, &PricingRow> = rows.iter().map(|r| (r.id, r)).collect();

    let mut priced: Vec<PricedItem> = Vec::with_capacity(body.items.len());
    for input in &body.items {
        let row = by_id.get(&input.product_id).ok_or_else(|| {
            AppError::BadRequest("One or more products are not available at this outlet".into())
        })?;
        priced.push(PricedItem::new(
            row.id,
            row.name.clone(),
            row.custom_price.unwrap_or(row.base_price),
            Some(row.image_url.clone()),
            input.quantity,
        ));
    }
    let total = order_total(&priced);

    let mut tx = state.db.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (customer_id, outlet_id, customer_name, customer_phone,
                             customer_email, delivery_address, pincode, total_amount, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(auth.user_id)
    .bind(outlet.id)
    .bind(&customer_name)
    .bind(&customer_phone)
    .bind(&customer_email)
    .bind(&delivery_address)
    .bind(&body.pincode)
    .bind(total)
    .bind(&body.notes)
    .fetch_one(&mut *tx)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(priced.len());
    for item in &priced {
        let row = sqlx::query_as::<_, OrderItem>(
            "INSERT INTO order_items (order_id, product_id, product_name, product_price,
                                      product_image, quantity, subtotal)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(order.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.product_price)
        .bind(&item.product_image)
        .bind(item.quantity)
        .bind(item.subtotal)
        .fetch_one(&mut *tx)
        .await?;
        items.push(row);
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(OrderWithItems { order, items })))
}

async fn list_my_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OrderWithItems<CustomerOrderRow>>>, AppError> {
    let orders = sqlx::query_as::<_, CustomerOrderRow>(
        "SELECT o.*, ot.name AS outlet_name, ot.address AS outlet_address
         FROM orders o
         JOIN outlets ot ON ot.id = o.outlet_id
         WHERE o.customer_id = $1
         ORDER BY o.created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await?;

    attach_items(&state.db, orders, |o| o.order.id).await
}

async fn list_outlet_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
) -> Result<Json<Vec<OrderWithItems<OutletOrderRow>>>, AppError> {
    access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    let orders = sqlx::query_as::<_, OutletOrderRow>(
        "SELECT o.*, da.name AS delivery_agent_name, da.phone AS delivery_agent_phone
         FROM orders o
         LEFT JOIN delivery_agents da ON da.id = o.delivery_agent_id
         WHERE o.outlet_id = $1
         ORDER BY o.created_at DESC",
    )
    .bind(outlet_id)
    .fetch_all(&state.db)
    .await?;

    attach_items(&state.db, orders, |o| o.order.id).await
}

async fn update_outlet_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
    Json(body): Json<UpdateOutletOrderRequest>,
) -> Result<Json<Order>, AppError> {
    access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    if body.status.is_none() && body.delivery_agent_id.is_none() {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND outlet_id = $2")
        .bind(body.order_id)
        .bind(outlet_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let delivery_agent_id = match body.delivery_agent_id {
        Some(agent_id) => {
            let belongs: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM delivery_agents WHERE id = $1 AND outlet_id = $2",
            )
            .bind(agent_id)
            .bind(outlet_id)
            .fetch_optional(&state.db)
            .await?;
            if belongs.is_none() {
                return Err(AppError::NotFound("Delivery agent not found".into()));
            }
            Some(agent_id)
        }
        None => order.delivery_agent_id,
    };

    // Assigning an agent without an explicit status moves a fresh order along.
    let status = match body.status {
        Some(status) => status,
        None if body.delivery_agent_id.is_some() && order.status == OrderStatus::Pending => {
            OrderStatus::Confirmed
        }
        None => order.status,
    };

    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, delivery_agent_id = $2, updated_at = NOW()
         WHERE id = $3 RETURNING *",
    )
    .bind(&status)
    .bind(delivery_agent_id)
    .bind(order.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(updated))
}

/// Delivery-agent records keyed by the authenticated account email.
async fn agent_ids_for_email(pool: &PgPool, email: &str) -> Result<Vec<Uuid>, AppError> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT id FROM delivery_agents WHERE email = $1 AND is_active")
            .bind(email)
            .fetch_all(pool)
            .await?;

    if rows.is_empty() {
        return Err(AppError::Forbidden("Not a delivery agent".into()));
    }
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

async fn list_delivery_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OrderWithItems<DeliveryOrderRow>>>, AppError> {
    let agent_ids = agent_ids_for_email(&state.db, &auth.email).await?;

    let orders = sqlx::query_as::<_, DeliveryOrderRow>(
        "SELECT o.*, ot.name AS outlet_name, ot.address AS outlet_address,
                ot.phone AS outlet_phone
         FROM orders o
         JOIN outlets ot ON ot.id = o.outlet_id
         WHERE o.delivery_agent_id = ANY($1)
         ORDER BY o.created_at DESC",
    )
    .bind(&agent_ids)
    .fetch_all(&state.db)
    .await?;

    attach_items(&state.db, orders, |o| o.order.id).await
}

async fn update_delivery_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateDeliveryOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let agent_ids = agent_ids_for_email(&state.db, &auth.email).await?;

    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = NOW()
         WHERE id = $2 AND delivery_agent_id = ANY($3)
         RETURNING *",
    )
    .bind(&body.status)
    .bind(body.order_id)
    .bind(&agent_ids)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found or not assigned to you".into()))?;

    Ok(Json(updated))
}

async fn attach_items<T>(
    pool: &PgPool,
    orders: Vec<T>,
    order_id: impl Fn(&T) -> Uuid,
) -> Result<Json<Vec<OrderWithItems<T>>>, AppError> {
    let ids: Vec<Uuid> = orders.iter().map(&order_id).collect();
    let mut items = fetch_items_batch(pool, &ids).await?;

    Ok(Json(
        orders
            .into_iter()
            .map(|order| {
                let id = order_id(&order);
                OrderWithItems {
                    order,
                    items: items.remove(&id).unwrap_or_default(),
                }
            })
            .collect(),
    ))
}
