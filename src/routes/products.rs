use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::AppState;
use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::models::product::{
    CatalogEntry, CreateProductRequest, OutletProduct, Product, UpdateProductRequest,
    UpsertOutletProductRequest,
};

use super::access;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route(
            "/api/outlets/{id}/products",
            get(list_outlet_products).post(upsert_outlet_product),
        )
}

fn validate_price(price: Decimal) -> Result<Decimal, AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::BadRequest("Invalid price".into()));
    }
    Ok(price)
}

/// The central catalog is scoped to its creator: owners manage their own
/// product repertoire and expose subsets per outlet.
async fn list_products(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE created_by = $1 ORDER BY created_at",
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(products))
}

async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let name = body.name.trim().to_string();
    if name.is_empty() || body.image_url.trim().is_empty() {
        return Err(AppError::BadRequest("Name and image are required".into()));
    }
    validate_price(body.base_price)?;

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, description, base_price, category, image_url, created_by)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&name)
    .bind(&body.description)
    .bind(body.base_price)
    .bind(&body.category)
    .bind(body.image_url.trim())
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

async fn fetch_own_product(
    state: &AppState,
    product_id: Uuid,
    user_id: Uuid,
) -> Result<Product, AppError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    if product.created_by != user_id {
        return Err(AppError::Forbidden(
            "You don't have permission to manage this product".into(),
        ));
    }
    Ok(product)
}

async fn get_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let product = fetch_own_product(&state, product_id, auth.user_id).await?;
    Ok(Json(product))
}

async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    let existing = fetch_own_product(&state, product_id, auth.user_id).await?;

    let name = match body.name {
        Some(n) => {
            let n = n.trim().to_string();
            if n.is_empty() {
                return Err(AppError::BadRequest("Name cannot be empty".into()));
            }
            n
        }
        None => existing.name,
    };
    let base_price = match body.base_price {
        Some(p) => validate_price(p)?,
        None => existing.base_price,
    };
    let description = body.description.or(existing.description);
    let category = body.category.or(existing.category);
    let image_url = body.image_url.unwrap_or(existing.image_url);
    let is_active = body.is_active.unwrap_or(existing.is_active);

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET
           name = $1, description = $2, base_price = $3, category = $4,
           image_url = $5, is_active = $6, updated_at = NOW()
         WHERE id = $7 RETURNING *",
    )
    .bind(&name)
    .bind(&description)
    .bind(base_price)
    .bind(&category)
    .bind(&image_url)
    .bind(is_active)
    .bind(product_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    fetch_own_product(&state, product_id, auth.user_id).await?;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// The outlet owner's full catalog, left-joined with this outlet's
/// availability entries.
async fn list_outlet_products(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let (outlet, _) = access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    let entries = sqlx::query_as::<_, CatalogEntry>(
        "SELECT p.id, p.name, p.description, p.base_price, p.category, p.image_url, p.is_active,
                op.id AS outlet_product_id, op.is_available, op.custom_price
         FROM products p
         LEFT JOIN outlet_products op
           ON op.product_id = p.id AND op.outlet_id = $1
         WHERE p.created_by = $2
         ORDER BY p.created_at",
    )
    .bind(outlet_id)
    .bind(outlet.owner_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

async fn upsert_outlet_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
    Json(body): Json<UpsertOutletProductRequest>,
) -> Result<Json<OutletProduct>, AppError> {
    let (outlet, _) = access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    if let Some(price) = body.custom_price {
        validate_price(price)?;
    }

    // Only products from the outlet owner's catalog can go on the menu.
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(body.product_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    if product.created_by != outlet.owner_id {
        return Err(AppError::BadRequest(
            "Product does not belong to this outlet's catalog".into(),
        ));
    }

    let entry = sqlx::query_as::<_, OutletProduct>(
        "INSERT INTO outlet_products (outlet_id, product_id, is_available, custom_price)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (outlet_id, product_id)
         DO UPDATE SET is_available = EXCLUDED.is_available,
                       custom_price = EXCLUDED.custom_price,
                       updated_at = NOW()
         RETURNING *",
    )
    .bind(outlet_id)
    .bind(body.product_id)
    .bind(body.is_available.unwrap_or(true))
    .bind(body.custom_price)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(entry))
}
