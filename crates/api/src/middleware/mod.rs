//! Request middleware.

pub mod auth;
pub mod authorize;

pub use auth::{AuthUser, auth_middleware};
pub use authorize::{action_for, authorize_middleware};
