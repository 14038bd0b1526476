use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::geo::{self, OutletMatch, Point};
use crate::models::outlet::Outlet;
use crate::models::product::MenuProduct;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/store/check-pincode", get(check_pincode))
        .route("/api/store/nearby", post(nearby_outlets))
        .route("/api/store/{id}/menu", get(outlet_menu))
}

#[derive(Debug, Deserialize)]
struct CheckPincodeParams {
    pincode: Option<String>,
}

#[derive(Debug, Serialize)]
struct ServiceabilityResponse {
    serviceable: bool,
    outlets: Vec<OutletMatch>,
}

/// Postal-code-mode serviceability. An unregistered or non-geocodable pincode
/// is "we don't serve this area yet", never an error.
async fn check_pincode(
    State(state): State<AppState>,
    Query(params): Query<CheckPincodeParams>,
) -> Result<Json<ServiceabilityResponse>, AppError> {
    let pincode = params
        .pincode
        .ok_or_else(|| AppError::BadRequest("Pincode is required".into()))?;
    geo::validate_pincode(&pincode)?;

    let resolved = state.geocoder.resolve("", Some(&pincode)).await;
    if resolved.is_none() {
        tracing::info!("Pincode {pincode} did not geocode, falling back to exact matches");
    }

    let outlets = active_outlets(&state).await?;
    let matches = geo::match_by_pincode(outlets, &pincode, resolved);

    if matches.is_empty() {
        tracing::info!("No serviceable outlets for pincode {pincode}");
    }

    Ok(Json(ServiceabilityResponse {
        serviceable: !matches.is_empty(),
        outlets: matches,
    }))
}

#[derive(Debug, Deserialize)]
struct NearbyRequest {
    latitude: f64,
    longitude: f64,
    max_distance_km: Option<f64>,
}

/// Coordinate-mode serviceability: outlets within their own delivery radius
/// of the device location, nearest first.
async fn nearby_outlets(
    State(state): State<AppState>,
    Json(body): Json<NearbyRequest>,
) -> Result<Json<ServiceabilityResponse>, AppError> {
    let point = Point::new(body.latitude, body.longitude)?;
    if let Some(cap) = body.max_distance_km
        && (!cap.is_finite() || cap <= 0.0)
    {
        return Err(AppError::BadRequest("Max distance must be a positive number".into()));
    }

    let outlets = active_outlets(&state).await?;
    let matches = geo::match_by_distance(outlets, point, body.max_distance_km);

    Ok(Json(ServiceabilityResponse {
        serviceable: !matches.is_empty(),
        outlets: matches,
    }))
}

async fn active_outlets(state: &AppState) -> Result<Vec<Outlet>, AppError> {
    let outlets = sqlx::query_as::<_, Outlet>(
        "SELECT * FROM outlets WHERE is_active ORDER BY created_at",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(outlets)
}

#[derive(Debug, Serialize)]
struct MenuResponse {
    outlet: Outlet,
    products: Vec<MenuProduct>,
}

async fn outlet_menu(
    State(state): State<AppState>,
    Path(outlet_id): Path<Uuid>,
) -> Result<Json<MenuResponse>, AppError> {
    let outlet = super::access::fetch_outlet(&state.db, outlet_id).await?;

    if !outlet.is_active {
        return Err(AppError::Forbidden("Outlet is currently closed".into()));
    }

    let products = sqlx::query_as::<_, MenuProduct>(
        "SELECT p.id, p.name, p.description, p.base_price, op.custom_price, p.category, p.image_url
         FROM outlet_products op
         JOIN products p ON p.id = op.product_id
         WHERE op.outlet_id = $1 AND op.is_available AND p.is_active
         ORDER BY p.category NULLS LAST, p.name",
    )
    .bind(outlet_id)
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .map(MenuProduct::with_effective_price)
    .collect();

    Ok(Json(MenuResponse { outlet, products }))
}
