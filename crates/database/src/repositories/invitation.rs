use crate::models::Invitation as InvitationRow;
use crate::pool::DbPool;
use crate::repositories::utils::map_db_error;
use crate::retry_db;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use services::auth::UserId;
use services::common::{OrganizationId, RepositoryError};
use services::invitations::{
    CreateInvitation, Invitation, InvitationId, InvitationRepository, InvitationStatus,
};
use services::roles::RoleId;
use tracing::debug;

#[derive(Clone)]
pub struct PgInvitationRepository {
    pool: DbPool,
}

impl PgInvitationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_invitation(&self, row: tokio_postgres::Row) -> Result<Invitation, RepositoryError> {
        let db_inv = InvitationRow {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            email: row.get("email"),
            role_id: row.get("role_id"),
            token: row.get("token"),
            status: row.get("status"),
            invited_by_user_id: row.get("invited_by_user_id"),
            accepted_by_user_id: row.get("accepted_by_user_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            expires_at: row.get("expires_at"),
            accepted_at: row.get("accepted_at"),
        };

        let status = db_inv
            .status
            .parse::<InvitationStatus>()
            .map_err(|e| RepositoryError::DataConversionError(anyhow::anyhow!(e)))?;

        Ok(Invitation {
            id: InvitationId(db_inv.id),
            organization_id: OrganizationId(db_inv.organization_id),
            email: db_inv.email,
            role_id: RoleId(db_inv.role_id),
            token: db_inv.token,
            status,
            invited_by_user_id: UserId(db_inv.invited_by_user_id),
            accepted_by_user_id: db_inv.accepted_by_user_id.map(UserId),
            created_at: db_inv.created_at,
            updated_at: db_inv.updated_at,
            expires_at: db_inv.expires_at,
            accepted_at: db_inv.accepted_at,
        })
    }
}

#[async_trait]
impl InvitationRepository for PgInvitationRepository {
    async fn create(&self, invitation: CreateInvitation) -> Result<Invitation, RepositoryError> {
        debug!(
            "Creating invitation for {} in organization {}",
            invitation.email, invitation.organization_id
        );

        let row = retry_db!("create_invitation", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_one(
                    "INSERT INTO invitations
                     (organization_id, email, role_id, token, invited_by_user_id, expires_at)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     RETURNING *",
                    &[
                        &invitation.organization_id.0,
                        &invitation.email,
                        &invitation.role_id.0,
                        &invitation.token,
                        &invitation.invited_by_user_id.0,
                        &invitation.expires_at,
                    ],
                )
                .await
                .map_err(map_db_error)
        })?;

        self.row_to_invitation(row)
    }

    async fn get_by_id(
        &self,
        organization_id: OrganizationId,
        id: InvitationId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        let row = retry_db!("get_invitation_by_id", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt(
                    "SELECT * FROM invitations WHERE id = $1 AND organization_id = $2",
                    &[&id.0, &organization_id.0],
                )
                .await
                .map_err(map_db_error)
        })?;

        row.map(|r| self.row_to_invitation(r)).transpose()
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, RepositoryError> {
        let row = retry_db!("get_invitation_by_token", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt("SELECT * FROM invitations WHERE token = $1", &[&token])
                .await
                .map_err(map_db_error)
        })?;

        row.map(|r| self.row_to_invitation(r)).transpose()
    }

    async fn list_by_organization(
        &self,
        organization_id: OrganizationId,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invitation>, RepositoryError> {
        let rows = retry_db!("list_invitations_by_org", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            if let Some(status) = status {
                client
                    .query(
                        "SELECT * FROM invitations
                         WHERE organization_id = $1 AND status = $2
                         ORDER BY created_at DESC
                         LIMIT $3 OFFSET $4",
                        &[&organization_id.0, &status.as_str(), &limit, &offset],
                    )
                    .await
                    .map_err(map_db_error)
            } else {
                client
                    .query(
                        "SELECT * FROM invitations
                         WHERE organization_id = $1
                         ORDER BY created_at DESC
                         LIMIT $2 OFFSET $3",
                        &[&organization_id.0, &limit, &offset],
                    )
                    .await
                    .map_err(map_db_error)
            }
        })?;

        rows.into_iter()
            .map(|r| self.row_to_invitation(r))
            .collect()
    }

    async fn count_by_organization(
        &self,
        organization_id: OrganizationId,
        status: Option<InvitationStatus>,
    ) -> Result<i64, RepositoryError> {
        let row = retry_db!("count_invitations_by_org", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            if let Some(status) = status {
                client
                    .query_one(
                        "SELECT COUNT(*) FROM invitations
                         WHERE organization_id = $1 AND status = $2",
                        &[&organization_id.0, &status.as_str()],
                    )
                    .await
                    .map_err(map_db_error)
            } else {
                client
                    .query_one(
                        "SELECT COUNT(*) FROM invitations WHERE organization_id = $1",
                        &[&organization_id.0],
                    )
                    .await
                    .map_err(map_db_error)
            }
        })?;

        Ok(row.get(0))
    }

    async fn find_pending_by_email(
        &self,
        organization_id: OrganizationId,
        email: &str,
    ) -> Result<Option<Invitation>, RepositoryError> {
        let row = retry_db!("find_pending_invitation_by_email", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt(
                    "SELECT * FROM invitations
                     WHERE organization_id = $1
                       AND lower(email) = lower($2)
                       AND status = 'pending'",
                    &[&organization_id.0, &email],
                )
                .await
                .map_err(map_db_error)
        })?;

        row.map(|r| self.row_to_invitation(r)).transpose()
    }

    async fn refresh_token(
        &self,
        organization_id: OrganizationId,
        id: InvitationId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Invitation>, RepositoryError> {
        // The status guard in the WHERE clause makes the swap atomic: a row
        // that was accepted or expired in the meantime is left untouched and
        // the caller sees None.
        let row = retry_db!("refresh_invitation_token", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt(
                    "UPDATE invitations
                     SET token = $3, expires_at = $4, updated_at = NOW()
                     WHERE id = $1 AND organization_id = $2 AND status = 'pending'
                     RETURNING *",
                    &[&id.0, &organization_id.0, &token, &expires_at],
                )
                .await
                .map_err(map_db_error)
        })?;

        row.map(|r| self.row_to_invitation(r)).transpose()
    }

    async fn accept_if_pending(
        &self,
        id: InvitationId,
        accepted_by: UserId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        // Exactly one concurrent caller can match the pending row.
        let row = retry_db!("accept_invitation_if_pending", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt(
                    "UPDATE invitations
                     SET status = 'accepted', accepted_by_user_id = $2,
                         accepted_at = NOW(), updated_at = NOW()
                     WHERE id = $1 AND status = 'pending'
                     RETURNING *",
                    &[&id.0, &accepted_by.0],
                )
                .await
                .map_err(map_db_error)
        })?;

        row.map(|r| self.row_to_invitation(r)).transpose()
    }

    async fn expire_if_due(&self, id: InvitationId) -> Result<Option<Invitation>, RepositoryError> {
        let row = retry_db!("expire_invitation_if_due", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt(
                    "UPDATE invitations
                     SET status = 'expired', updated_at = NOW()
                     WHERE id = $1 AND status = 'pending' AND expires_at <= NOW()
                     RETURNING *",
                    &[&id.0],
                )
                .await
                .map_err(map_db_error)
        })?;

        row.map(|r| self.row_to_invitation(r)).transpose()
    }

    async fn mark_expired(&self) -> Result<usize, RepositoryError> {
        let rows_affected = retry_db!("mark_expired_invitations", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .execute(
                    "UPDATE invitations
                     SET status = 'expired', updated_at = NOW()
                     WHERE status = 'pending' AND expires_at <= NOW()",
                    &[],
                )
                .await
                .map_err(map_db_error)
        })?;

        Ok(rows_affected as usize)
    }
}
