pub mod accept;
pub mod api;
pub mod common;
pub mod health;
pub mod invitations;
