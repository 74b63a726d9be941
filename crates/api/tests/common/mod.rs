#![allow(dead_code)]

use api::{build_app, AppServices};
use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use services::auth::{
    ArgonCredentialStore, AuthService, AuthServiceTrait, CredentialStore, NewUser, Session,
    SessionId, SessionRepository, SessionToken, User, UserId, UserRepository,
};
use services::common::{generate_session_token, hash_token, OrganizationId, RepositoryError};
use services::email::{EmailSender, LogEmailSender};
use services::invitations::{
    CreateInvitation, Invitation, InvitationId, InvitationRepository, InvitationService,
    InvitationServiceTrait, InvitationStatus,
};
use services::roles::{NewRoleBinding, Role, RoleBinding, RoleId, RoleRepository};
use services::state_store::{MemoryStateStore, StateTokenStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ============================================================================
// Fixture identifiers shared by every end-to-end test
// ============================================================================

pub fn test_org_id() -> OrganizationId {
    OrganizationId(Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap())
}

pub fn other_org_id() -> OrganizationId {
    OrganizationId(Uuid::parse_str("99999999-9999-9999-9999-999999999999").unwrap())
}

pub fn admin_user_id() -> UserId {
    UserId(Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap())
}

pub fn plain_user_id() -> UserId {
    UserId(Uuid::parse_str("55555555-5555-5555-5555-555555555555").unwrap())
}

pub fn admin_role_id() -> RoleId {
    RoleId(Uuid::parse_str("33333333-3333-3333-3333-333333333333").unwrap())
}

pub fn member_role_id() -> RoleId {
    RoleId(Uuid::parse_str("44444444-4444-4444-4444-444444444444").unwrap())
}

// ============================================================================
// In-memory repositories
//
// These back the real service layer so the HTTP tests run without a
// database. Conditional updates mirror the SQL guards: CAS transitions
// return None when the row is no longer in the required state.
// ============================================================================

pub struct InMemoryInvitations {
    rows: Mutex<Vec<Invitation>>,
}

impl InMemoryInvitations {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Seed a row directly, bypassing the service's gates.
    pub fn insert_row(
        &self,
        organization_id: OrganizationId,
        email: &str,
        status: InvitationStatus,
        expires_at: DateTime<Utc>,
    ) -> Invitation {
        let now = Utc::now();
        let invitation = Invitation {
            id: InvitationId(Uuid::new_v4()),
            organization_id,
            email: email.to_string(),
            role_id: member_role_id(),
            token: format!("seed-token-{}", Uuid::new_v4()),
            status,
            invited_by_user_id: admin_user_id(),
            accepted_by_user_id: None,
            created_at: now,
            updated_at: now,
            expires_at,
            accepted_at: None,
        };
        self.rows.lock().unwrap().push(invitation.clone());
        invitation
    }

    pub fn row(&self, id: &InvitationId) -> Option<Invitation> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == *id)
            .cloned()
    }

    /// Raw acceptance token lookup. Responses never carry the token, so
    /// tests fetch it here the way an invitee would read it from the email.
    pub fn token_for_email(&self, email: &str) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(email))
            .map(|r| r.token.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl InvitationRepository for InMemoryInvitations {
    async fn create(&self, invitation: CreateInvitation) -> Result<Invitation, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let duplicate_pending = rows.iter().any(|r| {
            r.organization_id == invitation.organization_id
                && r.status == InvitationStatus::Pending
                && r.email.eq_ignore_ascii_case(&invitation.email)
        });
        let token_taken = rows.iter().any(|r| r.token == invitation.token);
        if duplicate_pending || token_taken {
            return Err(RepositoryError::AlreadyExists);
        }

        let now = Utc::now();
        let row = Invitation {
            id: InvitationId(Uuid::new_v4()),
            organization_id: invitation.organization_id,
            email: invitation.email,
            role_id: invitation.role_id,
            token: invitation.token,
            status: InvitationStatus::Pending,
            invited_by_user_id: invitation.invited_by_user_id,
            accepted_by_user_id: None,
            created_at: now,
            updated_at: now,
            expires_at: invitation.expires_at,
            accepted_at: None,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn get_by_id(
        &self,
        organization_id: OrganizationId,
        id: InvitationId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.organization_id == organization_id && r.id == id)
            .cloned())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.token == token)
            .cloned())
    }

    async fn list_by_organization(
        &self,
        organization_id: OrganizationId,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invitation>, RepositoryError> {
        let mut matching: Vec<Invitation> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.organization_id == organization_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_organization(
        &self,
        organization_id: OrganizationId,
        status: Option<InvitationStatus>,
    ) -> Result<i64, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.organization_id == organization_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .count() as i64)
    }

    async fn find_pending_by_email(
        &self,
        organization_id: OrganizationId,
        email: &str,
    ) -> Result<Option<Invitation>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.organization_id == organization_id
                    && r.status == InvitationStatus::Pending
                    && r.email.eq_ignore_ascii_case(email)
            })
            .cloned())
    }

    async fn refresh_token(
        &self,
        organization_id: OrganizationId,
        id: InvitationId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Invitation>, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            if row.organization_id == organization_id
                && row.id == id
                && row.status == InvitationStatus::Pending
            {
                row.token = token.to_string();
                row.expires_at = expires_at;
                row.updated_at = Utc::now();
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn accept_if_pending(
        &self,
        id: InvitationId,
        accepted_by: UserId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            if row.id == id && row.status == InvitationStatus::Pending {
                row.status = InvitationStatus::Accepted;
                row.accepted_by_user_id = Some(accepted_by);
                row.accepted_at = Some(Utc::now());
                row.updated_at = Utc::now();
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn expire_if_due(&self, id: InvitationId) -> Result<Option<Invitation>, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        for row in rows.iter_mut() {
            if row.id == id && row.status == InvitationStatus::Pending && row.expires_at <= now {
                row.status = InvitationStatus::Expired;
                row.updated_at = now;
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn mark_expired(&self) -> Result<usize, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let mut expired = 0;
        for row in rows.iter_mut() {
            if row.status == InvitationStatus::Pending && row.expires_at <= now {
                row.status = InvitationStatus::Expired;
                row.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

pub struct InMemoryRoles {
    roles: Mutex<Vec<Role>>,
    bindings: Mutex<Vec<RoleBinding>>,
}

impl InMemoryRoles {
    /// Admin role (may manage invitations) bound to the admin user, member
    /// role (may not) bound to the plain user.
    pub fn with_defaults() -> Self {
        let now = Utc::now();
        let roles = vec![
            Role {
                id: admin_role_id(),
                organization_id: test_org_id(),
                name: "admin".to_string(),
                can_manage_invitations: true,
                created_at: now,
            },
            Role {
                id: member_role_id(),
                organization_id: test_org_id(),
                name: "member".to_string(),
                can_manage_invitations: false,
                created_at: now,
            },
        ];
        let bindings = vec![
            RoleBinding {
                user_id: admin_user_id(),
                role_id: admin_role_id(),
                organization_id: test_org_id(),
                granted_by_user_id: None,
                created_at: now,
            },
            RoleBinding {
                user_id: plain_user_id(),
                role_id: member_role_id(),
                organization_id: test_org_id(),
                granted_by_user_id: None,
                created_at: now,
            },
        ];
        Self {
            roles: Mutex::new(roles),
            bindings: Mutex::new(bindings),
        }
    }

    pub fn bindings_for(&self, user_id: &UserId) -> Vec<RoleBinding> {
        self.bindings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == *user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoles {
    async fn get_by_id(
        &self,
        organization_id: OrganizationId,
        role_id: RoleId,
    ) -> Result<Option<Role>, RepositoryError> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.organization_id == organization_id && r.id == role_id)
            .cloned())
    }

    async fn user_can_manage_invitations(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let roles = self.roles.lock().unwrap();
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.organization_id == organization_id && b.user_id == user_id)
            .any(|b| {
                roles
                    .iter()
                    .any(|r| r.id == b.role_id && r.can_manage_invitations)
            }))
    }

    async fn upsert_binding(&self, binding: NewRoleBinding) -> Result<RoleBinding, RepositoryError> {
        let mut bindings = self.bindings.lock().unwrap();
        if let Some(existing) = bindings.iter().find(|b| {
            b.user_id == binding.user_id
                && b.role_id == binding.role_id
                && b.organization_id == binding.organization_id
        }) {
            return Ok(existing.clone());
        }
        let row = RoleBinding {
            user_id: binding.user_id,
            role_id: binding.role_id,
            organization_id: binding.organization_id,
            granted_by_user_id: binding.granted_by_user_id,
            created_at: Utc::now(),
        };
        bindings.push(row.clone());
        Ok(row)
    }
}

pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
    password_hashes: Mutex<HashMap<Uuid, String>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            password_hashes: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert_user(&self, id: UserId, email: &str, first_name: Option<&str>) -> User {
        let now = Utc::now();
        let user = User {
            id,
            email: email.to_string(),
            first_name: first_name.map(str::to_string),
            last_name: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(user.clone());
        user
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn has_password(&self, id: &UserId) -> bool {
        self.password_hashes.lock().unwrap().contains_key(&id.0)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn upsert_by_email(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter().find(|u| u.email == user.email) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let row = User {
            id: UserId(Uuid::new_v4()),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn set_password_hash_if_unset(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut hashes = self.password_hashes.lock().unwrap();
        if hashes.contains_key(&id.0) {
            return Ok(false);
        }
        hashes.insert(id.0, password_hash.to_string());
        Ok(true)
    }
}

pub struct InMemorySessions {
    rows: Mutex<Vec<Session>>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessions {
    async fn create(
        &self,
        user_id: UserId,
        expires_in_hours: i64,
    ) -> Result<(Session, String), RepositoryError> {
        let raw_token = generate_session_token();
        let now = Utc::now();
        let session = Session {
            id: SessionId(Uuid::new_v4()),
            user_id,
            token_hash: hash_token(&raw_token),
            created_at: now,
            expires_at: now + Duration::hours(expires_in_hours),
        };
        self.rows.lock().unwrap().push(session.clone());
        Ok((session, raw_token))
    }

    async fn validate(&self, token: SessionToken) -> Result<Option<Session>, RepositoryError> {
        let hash = hash_token(&token.0);
        let now = Utc::now();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token_hash == hash && s.expires_at > now)
            .cloned())
    }

    async fn cleanup_expired(&self) -> Result<usize, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let before = rows.len();
        rows.retain(|s| s.expires_at > now);
        Ok(before - rows.len())
    }
}

// ============================================================================
// Test application
// ============================================================================

/// Running application plus handles into its storage. The repository
/// handles let tests seed rows and read back state (such as acceptance
/// tokens) that the HTTP surface deliberately withholds.
pub struct TestApp {
    pub server: TestServer,
    pub invitations: Arc<InMemoryInvitations>,
    pub users: Arc<InMemoryUsers>,
    pub admin_token: String,
    pub member_token: String,
}

/// Build the full router over in-memory repositories, with the real
/// service layer in between. Two users are seeded: an admin whose role may
/// manage invitations, and a plain member whose role may not. Both hold
/// live sessions.
pub async fn setup_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .try_init();

    let invitations = Arc::new(InMemoryInvitations::new());
    let roles = Arc::new(InMemoryRoles::with_defaults());
    let users = Arc::new(InMemoryUsers::new());
    let sessions = Arc::new(InMemorySessions::new());

    users.insert_user(admin_user_id(), "admin@crewbase.io", Some("Admin"));
    users.insert_user(plain_user_id(), "member@crewbase.io", Some("Member"));

    let (_, admin_token) = sessions
        .create(admin_user_id(), 24)
        .await
        .expect("admin session");
    let (_, member_token) = sessions
        .create(plain_user_id(), 24)
        .await
        .expect("member session");

    let user_repository = users.clone() as Arc<dyn UserRepository>;
    let session_repository = sessions.clone() as Arc<dyn SessionRepository>;

    let auth_service = Arc::new(AuthService::new(
        session_repository.clone(),
        user_repository.clone(),
    )) as Arc<dyn AuthServiceTrait>;

    let credential_store =
        Arc::new(ArgonCredentialStore::new(user_repository.clone())) as Arc<dyn CredentialStore>;
    let email_sender = Arc::new(LogEmailSender::new(config::EmailConfig {
        enabled: false,
        from_address: "invites@test.io".to_string(),
        invite_base_url: "http://localhost:3000/invitations".to_string(),
    })) as Arc<dyn EmailSender>;

    let invitation_service = Arc::new(InvitationService::new(
        invitations.clone() as Arc<dyn InvitationRepository>,
        roles.clone() as Arc<dyn RoleRepository>,
        user_repository,
        credential_store,
        email_sender,
    )) as Arc<dyn InvitationServiceTrait>;

    let app_services = AppServices {
        invitation_service,
        auth_service,
        sessions: session_repository,
        state_store: Arc::new(MemoryStateStore::new()) as Arc<dyn StateTokenStore>,
    };

    let server = TestServer::new(build_app(app_services)).expect("test server");

    TestApp {
        server,
        invitations,
        users,
        admin_token,
        member_token,
    }
}

pub fn invitations_path() -> String {
    format!("/v1/organizations/{}/invitations", test_org_id().0)
}

pub fn bulk_invitations_path() -> String {
    format!("/v1/organizations/{}/invitations/bulk", test_org_id().0)
}

pub fn resend_path(id: &InvitationId) -> String {
    format!(
        "/v1/organizations/{}/invitations/{}/resend",
        test_org_id().0,
        id.0
    )
}
