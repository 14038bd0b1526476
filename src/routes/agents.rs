use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::AppState;
use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::models::agent::{
    CreateDeliveryAgentRequest, DeliveryAgent, UpdateDeliveryAgentRequest,
};

use super::access;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/outlets/{id}/delivery-agents",
            get(list_agents).post(create_agent),
        )
        .route(
            "/api/outlets/{id}/delivery-agents/{agent_id}",
            axum::routing::patch(update_agent).delete(delete_agent),
        )
}

async fn list_agents(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
) -> Result<Json<Vec<DeliveryAgent>>, AppError> {
    access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    let agents = sqlx::query_as::<_, DeliveryAgent>(
        "SELECT * FROM delivery_agents WHERE outlet_id = $1 ORDER BY created_at",
    )
    .bind(outlet_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(agents))
}

async fn create_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
    Json(body): Json<CreateDeliveryAgentRequest>,
) -> Result<(StatusCode, Json<DeliveryAgent>), AppError> {
    access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    let name = body.name.trim().to_string();
    let phone = body.phone.trim().to_string();
    if name.is_empty() || phone.is_empty() {
        return Err(AppError::BadRequest("Name and phone are required".into()));
    }
    // Agents log in with their account email; normalize it for the lookup.
    let email = body
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let agent = sqlx::query_as::<_, DeliveryAgent>(
        "INSERT INTO delivery_agents (outlet_id, name, phone, email, created_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(outlet_id)
    .bind(&name)
    .bind(&phone)
    .bind(&email)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(agent)))
}

async fn update_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((outlet_id, agent_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateDeliveryAgentRequest>,
) -> Result<Json<DeliveryAgent>, AppError> {
    access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    let existing = sqlx::query_as::<_, DeliveryAgent>(
        "SELECT * FROM delivery_agents WHERE id = $1 AND outlet_id = $2",
    )
    .bind(agent_id)
    .bind(outlet_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Delivery agent not found".into()))?;

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
    let phone = match body.phone {
        Some(p) => {
            let p = p.trim().to_string();
            if p.is_empty() {
                return Err(AppError::BadRequest("Phone cannot be empty".into()));
            }
            p
        }
        None => existing.phone,
    };
    let email = match body.email {
        Some(e) => {
            let e = e.trim().to_lowercase();
            if e.is_empty() { None } else { Some(e) }
        }
        None => existing.email,
    };
    let is_active = body.is_active.unwrap_or(existing.is_active);

    let agent = sqlx::query_as::<_, DeliveryAgent>(
        "UPDATE delivery_agents SET
           name = $1, phone = $2, email = $3, is_active = $4, updated_at = NOW()
         WHERE id = $5 RETURNING *",
    )
    .bind(&name)
    .bind(&phone)
    .bind(&email)
    .bind(is_active)
    .bind(agent_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(agent))
}

async fn delete_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((outlet_id, agent_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    access::require_owner_or_admin(&state.db, outlet_id, auth.user_id).await?;

    let deleted = sqlx::query("DELETE FROM delivery_agents WHERE id = $1 AND outlet_id = $2")
        .bind(agent_id)
        .bind(outlet_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Delivery agent not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
