//! Shared types, errors, and configuration for Factura.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - JWT access tokens and auth request payloads
//! - Transactional email

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, TokenPair};
pub use config::{AppConfig, EmailConfig, StorageSettings};
pub use email::{EmailError, EmailService, InvoiceNotice};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
