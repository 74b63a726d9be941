use crate::models::{Role as RoleRow, RoleBinding as RoleBindingRow};
use crate::pool::DbPool;
use crate::repositories::utils::map_db_error;
use crate::retry_db;
use anyhow::Context;
use async_trait::async_trait;
use services::auth::UserId;
use services::common::{OrganizationId, RepositoryError};
use services::roles::{NewRoleBinding, Role, RoleBinding, RoleId, RoleRepository};

#[derive(Clone)]
pub struct PgRoleRepository {
    pool: DbPool,
}

impl PgRoleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_role(&self, row: tokio_postgres::Row) -> Role {
        let db_role = RoleRow {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            name: row.get("name"),
            can_manage_invitations: row.get("can_manage_invitations"),
            created_at: row.get("created_at"),
        };

        Role {
            id: RoleId(db_role.id),
            organization_id: OrganizationId(db_role.organization_id),
            name: db_role.name,
            can_manage_invitations: db_role.can_manage_invitations,
            created_at: db_role.created_at,
        }
    }

    fn row_to_binding(&self, row: tokio_postgres::Row) -> RoleBinding {
        let db_binding = RoleBindingRow {
            user_id: row.get("user_id"),
            role_id: row.get("role_id"),
            organization_id: row.get("organization_id"),
            granted_by_user_id: row.get("granted_by_user_id"),
            created_at: row.get("created_at"),
        };

        RoleBinding {
            user_id: UserId(db_binding.user_id),
            role_id: RoleId(db_binding.role_id),
            organization_id: OrganizationId(db_binding.organization_id),
            granted_by_user_id: db_binding.granted_by_user_id.map(UserId),
            created_at: db_binding.created_at,
        }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn get_by_id(
        &self,
        organization_id: OrganizationId,
        role_id: RoleId,
    ) -> Result<Option<Role>, RepositoryError> {
        let row = retry_db!("get_role_by_id", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt(
                    "SELECT * FROM roles WHERE id = $1 AND organization_id = $2",
                    &[&role_id.0, &organization_id.0],
                )
                .await
                .map_err(map_db_error)
        })?;

        Ok(row.map(|r| self.row_to_role(r)))
    }

    async fn user_can_manage_invitations(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let row = retry_db!("user_can_manage_invitations", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_one(
                    "SELECT EXISTS (
                         SELECT 1 FROM role_bindings rb
                         JOIN roles r ON r.id = rb.role_id
                         WHERE rb.organization_id = $1
                           AND rb.user_id = $2
                           AND r.can_manage_invitations
                     )",
                    &[&organization_id.0, &user_id.0],
                )
                .await
                .map_err(map_db_error)
        })?;

        Ok(row.get(0))
    }

    async fn upsert_binding(
        &self,
        binding: NewRoleBinding,
    ) -> Result<RoleBinding, RepositoryError> {
        // The no-op DO UPDATE returns the existing row on conflict, keeping
        // the original granter and timestamp.
        let row = retry_db!("upsert_role_binding", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_one(
                    "INSERT INTO role_bindings
                     (user_id, role_id, organization_id, granted_by_user_id)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (user_id, role_id, organization_id)
                     DO UPDATE SET granted_by_user_id = role_bindings.granted_by_user_id
                     RETURNING *",
                    &[
                        &binding.user_id.0,
                        &binding.role_id.0,
                        &binding.organization_id.0,
                        &binding.granted_by_user_id.as_ref().map(|u| u.0),
                    ],
                )
                .await
                .map_err(map_db_error)
        })?;

        Ok(self.row_to_binding(row))
    }
}
