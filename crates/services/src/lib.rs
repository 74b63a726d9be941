pub mod auth;
pub mod common;
pub mod email;
pub mod invitations;
pub mod roles;
pub mod state_store;

pub use auth::{AuthService, UserId};
pub use invitations::InvitationService;
pub use state_store::MemoryStateStore;
