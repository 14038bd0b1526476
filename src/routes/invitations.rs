use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::auth::middleware::AuthUser;
use crate::error::{AppError, is_unique_violation};
use crate::models::invitation::{
    AcceptInviteRequest, CreateInvitationRequest, DEFAULT_ROLE, INVITATION_TTL_DAYS, Invitation,
};
use crate::models::outlet::Outlet;

use super::access;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/outlets/{id}/invite", post(create_invitation))
        .route("/api/accept-invite", post(accept_invite))
        .route(
            "/api/outlets/{id}/invitations/{invitation_id}",
            delete(cancel_invitation),
        )
}

const TOKEN_LENGTH: usize = 32;

/// Opaque single-use token; 32 alphanumeric characters give ~190 bits of
/// entropy from the thread-local CSPRNG.
fn generate_invite_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Insert a pending invitation for `outlet` and dispatch the notification
/// email in the background. The row is the durable artifact: the invitation
/// stays acceptable via direct link even if the email never arrives.
pub(crate) async fn issue_invitation(
    state: &AppState,
    outlet: &Outlet,
    email: &str,
    role: Option<String>,
    inviter: &AuthUser,
) -> Result<Invitation, AppError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    let role = role
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    let token = generate_invite_token();

    let invitation = sqlx::query_as::<_, Invitation>(
        "INSERT INTO invitations (email, outlet_id, invited_by, role, token, expires_at)
         VALUES ($1, $2, $3, $4, $5, NOW() + ($6 || ' days')::interval)
         RETURNING *",
    )
    .bind(&email)
    .bind(outlet.id)
    .bind(inviter.user_id)
    .bind(&role)
    .bind(&token)
    .bind(INVITATION_TTL_DAYS.to_string())
    .fetch_one(&state.db)
    .await?;

    state.mailer.spawn_invitation_email(
        email,
        outlet.name.clone(),
        inviter.name.clone(),
        token,
    );

    Ok(invitation)
}

async fn create_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(outlet_id): Path<Uuid>,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    let outlet =
        access::require_owner(&state.db, outlet_id, auth.user_id, "invite admins").await?;

    let invitation = issue_invitation(&state, &outlet, &body.email, body.role, &auth).await?;

    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Consume an invitation token: grant the admin role and mark the invitation
/// accepted as one transaction, so a crash cannot leave the grant applied
/// with the invitation still pending.
async fn accept_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AcceptInviteRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = body.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("Token is required".into()));
    }

    let invitation = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token = $1")
        .bind(token)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid invitation".into()))?;

    invitation.check_acceptable(&auth.email, Utc::now())?;

    let already_admin =
        access::is_outlet_admin(&state.db, invitation.outlet_id, auth.user_id).await?;
    if already_admin {
        return Err(AppError::AlreadyOutletAdmin);
    }

    let mut tx = state.db.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO outlet_admins (outlet_id, user_id, role) VALUES ($1, $2, $3)",
    )
    .bind(invitation.outlet_id)
    .bind(auth.user_id)
    .bind(&invitation.role)
    .execute(&mut *tx)
    .await;

    if let Err(e) = inserted {
        // A concurrent accept of the same token won the (outlet, user) race.
        if is_unique_violation(&e) {
            return Err(AppError::AlreadyOutletAdmin);
        }
        return Err(e.into());
    }

    let updated = sqlx::query(
        "UPDATE invitations SET status = 'accepted', accepted_at = NOW()
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(invitation.id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        // Lost a race against another accept; roll the grant back too.
        return Err(AppError::InviteAlreadyAccepted);
    }

    tx.commit().await?;

    tracing::info!(
        "User {} accepted invitation {} for outlet {}",
        auth.user_id,
        invitation.id,
        invitation.outlet_id
    );

    Ok(Json(json!({ "outlet_id": invitation.outlet_id })))
}

async fn cancel_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((outlet_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    access::require_owner(&state.db, outlet_id, auth.user_id, "cancel invitations").await?;

    let deleted = sqlx::query("DELETE FROM invitations WHERE id = $1 AND outlet_id = $2")
        .bind(invitation_id)
        .bind(outlet_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Invitation not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tokens_are_32_alphanumeric_characters() {
        let token = generate_invite_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_invite_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
