//! Object storage for receipts and invoice PDFs using Apache OpenDAL.
//!
//! Supported backends:
//! - S3-compatible: AWS S3, Cloudflare R2, MinIO
//! - Azure Blob Storage
//! - Local filesystem
//!
//! Keys are laid out as:
//!
//! ```text
//! receipts/<business_id>/<expense_id>/<sanitized filename>
//! invoices/<invoice number>.pdf
//! ```

mod config;
mod error;
mod service;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{StorageService, StoredObject, invoice_pdf_key, receipt_key};
