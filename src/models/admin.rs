use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
#[allow(dead_code)]
pub struct OutletAdmin {
    pub id: Uuid,
    pub outlet_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Flat join row of outlet_admins with users.
#[derive(Debug, FromRow)]
pub struct AdminRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub user_email: String,
}

#[derive(Debug, Serialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct OutletAdminResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub user: AdminUser,
}

impl From<AdminRow> for OutletAdminResponse {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            role: row.role,
            created_at: row.created_at,
            user: AdminUser {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRoleRequest {
    pub role: String,
}
