use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

pub const INVITATION_TTL_DAYS: i64 = 7;
pub const DEFAULT_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub outlet_id: Uuid,
    pub invited_by: Uuid,
    pub role: String,
    pub status: InvitationStatus,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Acceptance gate. Check order matters: expiry is reported regardless of
    /// status, status before the email comparison.
    pub fn check_acceptable(&self, user_email: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        if now > self.expires_at {
            return Err(AppError::InviteExpired);
        }
        if self.status == InvitationStatus::Accepted {
            return Err(AppError::InviteAlreadyAccepted);
        }
        if !self.email.eq_ignore_ascii_case(user_email) {
            return Err(AppError::InviteEmailMismatch);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn invitation(status: InvitationStatus, expires_at: DateTime<Utc>) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            email: "admin@example.com".into(),
            outlet_id: Uuid::new_v4(),
            invited_by: Uuid::new_v4(),
            role: DEFAULT_ROLE.into(),
            status,
            token: "t".repeat(32),
            expires_at,
            created_at: now,
            accepted_at: None,
        }
    }

    #[test]
    fn pending_unexpired_matching_email_is_acceptable() {
        let now = Utc::now();
        let inv = invitation(InvitationStatus::Pending, now + Duration::days(7));
        assert!(inv.check_acceptable("admin@example.com", now).is_ok());
    }

    #[test]
    fn email_comparison_is_case_insensitive() {
        let now = Utc::now();
        let inv = invitation(InvitationStatus::Pending, now + Duration::days(7));
        assert!(inv.check_acceptable("Admin@Example.COM", now).is_ok());
    }

    #[test]
    fn expired_by_one_second_fails_regardless_of_status() {
        let created = Utc::now();
        let expires = created + Duration::days(INVITATION_TTL_DAYS);
        let inv = invitation(InvitationStatus::Pending, expires);

        let at_expiry = expires;
        assert!(inv.check_acceptable("admin@example.com", at_expiry).is_ok());

        let one_second_late = expires + Duration::seconds(1);
        assert!(matches!(
            inv.check_acceptable("admin@example.com", one_second_late),
            Err(AppError::InviteExpired)
        ));

        let accepted = invitation(InvitationStatus::Accepted, expires);
        assert!(matches!(
            accepted.check_acceptable("admin@example.com", one_second_late),
            Err(AppError::InviteExpired)
        ));
    }

    #[test]
    fn already_accepted_fails() {
        let now = Utc::now();
        let inv = invitation(InvitationStatus::Accepted, now + Duration::days(7));
        assert!(matches!(
            inv.check_acceptable("admin@example.com", now),
            Err(AppError::InviteAlreadyAccepted)
        ));
    }

    #[test]
    fn mismatched_email_fails_even_when_otherwise_valid() {
        let now = Utc::now();
        let inv = invitation(InvitationStatus::Pending, now + Duration::days(7));
        assert!(matches!(
            inv.check_acceptable("someone-else@example.com", now),
            Err(AppError::InviteEmailMismatch)
        ));
    }
}
