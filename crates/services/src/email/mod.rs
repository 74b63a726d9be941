pub mod ports;

pub use ports::*;

use async_trait::async_trait;
use tracing::{debug, info};

/// Delivery surrogate that records dispatches in the log stream. This is the
/// seam where an SMTP or provider client would plug in; the acceptance link
/// itself only ever appears at DEBUG.
pub struct LogEmailSender {
    config: config::EmailConfig,
}

impl LogEmailSender {
    pub fn new(config: config::EmailConfig) -> Self {
        Self { config }
    }

    fn accept_url(&self, token: &str) -> String {
        format!(
            "{}/{}/accept",
            self.config.invite_base_url.trim_end_matches('/'),
            token
        )
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_invitation(&self, email: InvitationEmail) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                invitation_id = %email.invitation_id,
                "Email dispatch disabled, skipping invitation email"
            );
            return Ok(());
        }

        info!(
            invitation_id = %email.invitation_id,
            organization_id = %email.organization_id,
            recipient = %email.recipient,
            from = %self.config.from_address,
            expires_at = %email.expires_at,
            "Dispatching invitation email"
        );
        debug!(
            invitation_id = %email.invitation_id,
            accept_url = %self.accept_url(&email.token),
            "Invitation acceptance link"
        );
        Ok(())
    }
}
