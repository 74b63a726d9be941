use std::sync::Arc;

use crate::common::OrganizationId;

use super::ports::{InvitationError, InvitationRepository, InvitationStatus};

/// Ceiling on outstanding invitations per organization.
pub const MAX_PENDING_INVITATIONS: i64 = 50;

/// Guards the pending-invitation ceiling. The count-then-insert window is not
/// closed here: two concurrent callers can both pass and overshoot slightly,
/// which the product accepts.
pub struct QuotaGuard {
    repository: Arc<dyn InvitationRepository>,
}

impl QuotaGuard {
    pub fn new(repository: Arc<dyn InvitationRepository>) -> Self {
        Self { repository }
    }

    /// Fails when adding `delta` invitations would push the organization past
    /// the ceiling. Batch callers pass the whole batch size at once so the
    /// batch is admitted or rejected wholesale.
    pub async fn check_capacity(
        &self,
        organization_id: OrganizationId,
        delta: i64,
    ) -> Result<(), InvitationError> {
        let pending = self
            .repository
            .count_by_organization(organization_id, Some(InvitationStatus::Pending))
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!(
                    "Failed to count pending invitations: {}",
                    e
                ))
            })?;

        if pending + delta > MAX_PENDING_INVITATIONS {
            return Err(InvitationError::QuotaExceeded(format!(
                "Organization has {} pending invitations; adding {} would exceed the limit of {}",
                pending, delta, MAX_PENDING_INVITATIONS
            )));
        }

        Ok(())
    }
}
