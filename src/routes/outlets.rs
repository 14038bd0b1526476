use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use uuid::Uuid;

use crate::AppState;
use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::geo::{self, Point};
use crate::models::outlet::{CreateOutletRequest, Outlet, OutletSummary, UpdateOutletRequest};

use super::access;
use super::invitations;

const DEFAULT_DELIVERY_RADIUS_KM: f64 = 10.0;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/outlets", get(list_outlets).post(create_outlet))
        .route(
            "/api/outlets/{id}",
            patch(update_outlet).delete(delete_outlet),
        )
}

/// Outlets the caller owns, plus outlets they administer through an accepted
/// invitation.
async fn list_outlets(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OutletSummary>>, AppError> {
    let owned = sqlx::query_as::<_, Outlet>(
        "SELECT * FROM outlets WHERE owner_id = $1 ORDER BY created_at",
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await?;

    let administered = sqlx::query_as::<_, Outlet>(
        "SELECT o.* FROM outlets o
         JOIN outlet_admins oa ON oa.outlet_id = o.id
         WHERE oa.user_id = $1
         ORDER BY o.created_at",
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await?;

    let summaries = owned
        .into_iter()
        .map(|outlet| OutletSummary {
            outlet,
            is_owner: true,
        })
        .chain(administered.into_iter().map(|outlet| OutletSummary {
            outlet,
            is_owner: false,
        }))
        .collect();

    Ok(Json(summaries))
}

async fn create_outlet(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateOutletRequest>,
) -> Result<(StatusCode, Json<Outlet>), AppError> {
    let name = body.name.trim().to_string();
    let address = body.address.trim().to_string();

    if name.is_empty() || address.is_empty() {
        return Err(AppError::BadRequest("Name and address are required".into()));
    }
    geo::validate_pincode(&body.pincode)?;

    let delivery_radius_km = body.delivery_radius_km.unwrap_or(DEFAULT_DELIVERY_RADIUS_KM);
    if !delivery_radius_km.is_finite() || delivery_radius_km <= 0.0 {
        return Err(AppError::BadRequest("Delivery radius must be a positive number".into()));
    }

    let coordinates = resolve_coordinates(
        &state,
        body.latitude,
        body.longitude,
        &address,
        &body.pincode,
    )
    .await?;

    let outlet = sqlx::query_as::<_, Outlet>(
        "INSERT INTO outlets (name, address, pincode, phone, latitude, longitude, delivery_radius_km, owner_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(&name)
    .bind(&address)
    .bind(&body.pincode)
    .bind(&body.phone)
    .bind(coordinates.map(|p| p.latitude))
    .bind(coordinates.map(|p| p.longitude))
    .bind(delivery_radius_km)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    // Bundled admin invitation; failure to issue it does not undo the outlet.
    if let Some(admin_email) = body.admin_email.as_deref().map(str::trim)
        && !admin_email.is_empty()
    {
        if let Err(e) = invitations::issue_invitation(&state, &outlet, admin_email, None, &auth).await
        {
            tracing::warn!("Outlet {} created but bundled invitation failed: {e}", outlet.id);
        }
    }

    Ok((StatusCode::CREATED, Json(outlet)))
}

async fn update_outlet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
    Json(body): Json<UpdateOutletRequest>,
) -> Result<Json<Outlet>, AppError> {
    let existing =
        access::require_owner(&state.db, outlet_id, auth.user_id, "update this outlet").await?;

    let name = match body.name {
        Some(n) => {
            let n = n.trim().to_string();
            if n.is_empty() {
                return Err(AppError::BadRequest("Name cannot be empty".into()));
            }
            n
        }
        None => existing.name.clone(),
    };
    let address = match body.address {
        Some(a) => {
            let a = a.trim().to_string();
            if a.is_empty() {
                return Err(AppError::BadRequest("Address cannot be empty".into()));
            }
            a
        }
        None => existing.address.clone(),
    };
    let pincode = match body.pincode {
        Some(p) => {
            geo::validate_pincode(&p)?;
            p
        }
        None => existing.pincode.clone(),
    };
    let phone = body.phone.or_else(|| existing.phone.clone());
    let delivery_radius_km = match body.delivery_radius_km {
        Some(r) if r.is_finite() && r > 0.0 => r,
        Some(_) => {
            return Err(AppError::BadRequest("Delivery radius must be a positive number".into()));
        }
        None => existing.delivery_radius_km,
    };
    let is_active = body.is_active.unwrap_or(existing.is_active);

    let location_changed = address != existing.address || pincode != existing.pincode;
    let coordinates = match (body.latitude, body.longitude) {
        (Some(latitude), Some(longitude)) => Some(Point::new(latitude, longitude)?),
        (None, None) if location_changed => state.geocoder.resolve(&address, Some(&pincode)).await,
        (None, None) => existing.coordinates(),
        _ => {
            return Err(AppError::BadRequest(
                "Latitude and longitude must be provided together".into(),
            ));
        }
    };

    let outlet = sqlx::query_as::<_, Outlet>(
        "UPDATE outlets SET
           name = $1, address = $2, pincode = $3, phone = $4,
           latitude = $5, longitude = $6, delivery_radius_km = $7, is_active = $8,
           updated_at = NOW()
         WHERE id = $9 RETURNING *",
    )
    .bind(&name)
    .bind(&address)
    .bind(&pincode)
    .bind(&phone)
    .bind(coordinates.map(|p| p.latitude))
    .bind(coordinates.map(|p| p.longitude))
    .bind(delivery_radius_km)
    .bind(is_active)
    .bind(outlet_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(outlet))
}

async fn delete_outlet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    access::require_owner(&state.db, outlet_id, auth.user_id, "delete this outlet").await?;

    // Admins, invitations, menu entries, agents, and orders cascade.
    sqlx::query("DELETE FROM outlets WHERE id = $1")
        .bind(outlet_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_coordinates(
    state: &AppState,
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: &str,
    pincode: &str,
) -> Result<Option<Point>, AppError> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok(Some(Point::new(lat, lon)?)),
        (None, None) => Ok(state.geocoder.resolve(address, Some(pincode)).await),
        _ => Err(AppError::BadRequest(
            "Latitude and longitude must be provided together".into(),
        )),
    }
}
