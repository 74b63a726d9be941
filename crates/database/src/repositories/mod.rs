pub mod invitation;
pub mod retry;
pub mod role;
pub mod session;
pub mod user;
pub mod utils;

pub use invitation::PgInvitationRepository;
pub use role::PgRoleRepository;
pub use session::PgSessionRepository;
pub use user::PgUserRepository;
