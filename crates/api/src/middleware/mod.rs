// API Middleware
//
// Authentication and request processing for the API layer.

pub mod auth;

// Re-export commonly used items
pub use auth::{auth_middleware, AuthState, AuthenticatedUser};
