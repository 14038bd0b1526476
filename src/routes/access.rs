use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::outlet::Outlet;

pub async fn fetch_outlet(pool: &PgPool, outlet_id: Uuid) -> Result<Outlet, AppError> {
    sqlx::query_as::<_, Outlet>("SELECT * FROM outlets WHERE id = $1")
        .bind(outlet_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Outlet not found".into()))
}

pub async fn is_outlet_admin(
    pool: &PgPool,
    outlet_id: Uuid,
    user_id: Uuid,
) -> Result<bool, AppError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM outlet_admins WHERE outlet_id = $1 AND user_id = $2")
            .bind(outlet_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Ownership check by exact owner-id equality; being an outlet admin is not
/// enough for owner-gated operations.
pub async fn require_owner(
    pool: &PgPool,
    outlet_id: Uuid,
    user_id: Uuid,
    action: &str,
) -> Result<Outlet, AppError> {
    let outlet = fetch_outlet(pool, outlet_id).await?;
    if outlet.owner_id != user_id {
        return Err(AppError::Forbidden(format!(
            "Only the outlet owner can {action}"
        )));
    }
    Ok(outlet)
}

/// Returns the outlet and whether the caller is its owner (as opposed to an
/// admin).
pub async fn require_owner_or_admin(
    pool: &PgPool,
    outlet_id: Uuid,
    user_id: Uuid,
) -> Result<(Outlet, bool), AppError> {
    let outlet = fetch_outlet(pool, outlet_id).await?;
    if outlet.owner_id == user_id {
        return Ok((outlet, true));
    }
    if is_outlet_admin(pool, outlet_id, user_id).await? {
        return Ok((outlet, false));
    }
    Err(AppError::Forbidden(
        "You don't have permission to manage this outlet".into(),
    ))
}
