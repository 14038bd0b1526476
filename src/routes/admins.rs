use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::models::admin::{AdminRow, OutletAdmin, OutletAdminResponse, UpdateAdminRoleRequest};
use crate::models::invitation::Invitation;

use super::access;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/outlets/{id}/admins", get(list_admins))
        .route(
            "/api/outlets/{id}/admins/{user_id}",
            axum::routing::patch(update_admin_role).delete(remove_admin),
        )
}

#[derive(Debug, Serialize)]
struct ListAdminsResponse {
    admins: Vec<OutletAdminResponse>,
    is_owner: bool,
    /// Only populated for the owner.
    pending_invitations: Vec<Invitation>,
}

async fn list_admins(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
) -> Result<Json<ListAdminsResponse>, AppError> {
    let (_, is_owner) =
        access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    let admins = sqlx::query_as::<_, AdminRow>(
        "SELECT oa.id, oa.user_id, oa.role, oa.created_at,
                u.name AS user_name, u.email AS user_email
         FROM outlet_admins oa
         JOIN users u ON u.id = oa.user_id
         WHERE oa.outlet_id = $1
         ORDER BY oa.created_at",
    )
    .bind(outlet_id)
    .fetch_all(&state.db)
    .await?;

    let pending_invitations = if is_owner {
        sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations
             WHERE outlet_id = $1 AND status = 'pending'
             ORDER BY created_at",
        )
        .bind(outlet_id)
        .fetch_all(&state.db)
        .await?
    } else {
        vec![]
    };

    Ok(Json(ListAdminsResponse {
        admins: admins.into_iter().map(OutletAdminResponse::from).collect(),
        is_owner,
        pending_invitations,
    }))
}

async fn update_admin_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((outlet_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateAdminRoleRequest>,
) -> Result<Json<OutletAdmin>, AppError> {
    access::require_owner(&state.db, outlet_id, auth.user_id, "update admin roles").await?;

    let role = body.role.trim().to_string();
    if role.is_empty() {
        return Err(AppError::BadRequest("Role is required".into()));
    }

    let admin = sqlx::query_as::<_, OutletAdmin>(
        "UPDATE outlet_admins SET role = $1
         WHERE outlet_id = $2 AND user_id = $3
         RETURNING *",
    )
    .bind(&role)
    .bind(outlet_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Admin not found for this outlet".into()))?;

    Ok(Json(admin))
}

async fn remove_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((outlet_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    access::require_owner(&state.db, outlet_id, auth.user_id, "remove admins").await?;

    if auth.user_id == user_id {
        return Err(AppError::BadRequest(
            "Owners cannot be removed from their outlets".into(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM outlet_admins WHERE outlet_id = $1 AND user_id = $2")
        .bind(outlet_id)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Admin not found for this outlet".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
