use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::geo::Point;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Outlet {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub pincode: String,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_radius_km: f64,
    pub owner_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Outlet {
    /// An outlet without stored coordinates can only be matched by exact
    /// pincode equality.
    pub fn coordinates(&self) -> Option<Point> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Point {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutletSummary {
    #[serde(flatten)]
    pub outlet: Outlet,
    pub is_owner: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateOutletRequest {
    pub name: String,
    pub address: String,
    pub pincode: String,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_radius_km: Option<f64>,
    /// Optional bundled admin invitation, issued right after creation.
    pub admin_email: Option<String>,
}

/// Every mutable outlet field, enumerated explicitly. Fields left as `None`
/// keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOutletRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_radius_km: Option<f64>,
    pub is_active: Option<bool>,
}
