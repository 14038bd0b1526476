use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;

/// Outbound invitation mail. The invitation row is the durable artifact;
/// delivery is best-effort and failures are logged, never surfaced to the
/// request that created the invitation.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    app_base_url: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        let transport = match &config.smtp_url {
            Some(url) => match AsyncSmtpTransport::<Tokio1Executor>::from_url(url) {
                Ok(builder) => Some(builder.build()),
                Err(e) => {
                    tracing::warn!("Invalid SMTP_URL, invitation emails disabled: {e}");
                    None
                }
            },
            None => {
                tracing::info!("SMTP_URL not set, invitation emails disabled");
                None
            }
        };

        let from = config.email_from.parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid EMAIL_FROM {:?}: {e}", config.email_from);
            "noreply@creamery.localhost".parse().expect("fallback sender address")
        });

        Self {
            transport,
            from,
            app_base_url: config.app_base_url.clone(),
        }
    }

    /// Fire-and-forget dispatch on a background task.
    pub fn spawn_invitation_email(
        &self,
        to: String,
        outlet_name: String,
        inviter_name: String,
        token: String,
    ) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_invitation(&to, &outlet_name, &inviter_name, &token)
                .await
            {
                tracing::warn!("Failed to send invitation email to {to}: {e}");
            }
        });
    }

    async fn send_invitation(
        &self,
        to: &str,
        outlet_name: &str,
        inviter_name: &str,
        token: &str,
    ) -> Result<(), String> {
        let Some(transport) = &self.transport else {
            tracing::debug!("Email disabled, skipping invitation mail to {to}");
            return Ok(());
        };

        let to_mailbox: Mailbox = to.parse().map_err(|e| format!("invalid recipient: {e}"))?;
        let invite_url = format!("{}/accept-invite?token={token}", self.app_base_url);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(format!("You're invited to manage {outlet_name}"))
            .header(ContentType::TEXT_PLAIN)
            .body(invitation_body(outlet_name, inviter_name, &invite_url))
            .map_err(|e| format!("failed to build message: {e}"))?;

        transport.send(message).await.map_err(|e| e.to_string())?;
        tracing::info!("Sent invitation email to {to} for outlet {outlet_name:?}");
        Ok(())
    }
}

fn invitation_body(outlet_name: &str, inviter_name: &str, invite_url: &str) -> String {
    format!(
        "{inviter_name} has invited you to help manage {outlet_name}.\n\n\
         Accept the invitation here: {invite_url}\n\n\
         The invitation expires in 7 days. If you didn't expect this email,\n\
         you can safely ignore it.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_body_contains_link_and_names() {
        let body = invitation_body("Scoop Corner", "Priya", "http://localhost/accept-invite?token=abc");
        assert!(body.contains("Scoop Corner"));
        assert!(body.contains("Priya"));
        assert!(body.contains("http://localhost/accept-invite?token=abc"));
    }
}
