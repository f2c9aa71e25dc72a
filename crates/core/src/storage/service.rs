//! Storage service implementation using Apache OpenDAL.

use opendal::{Operator, services};
use uuid::Uuid;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Storage key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
}

/// Storage service for receipts and rendered invoices.
#[derive(Debug)]
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                Operator::new(services::Fs::default().root(root)).map(|b| b.finish())
            }
        };

        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Validate an upload against the size and MIME type limits.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate_upload(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::FileTooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        if !self.config.is_mime_type_allowed(content_type) {
            return Err(StorageError::InvalidMimeType {
                mime_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    /// Writes `data` under `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn write(&self, key: &str, data: Vec<u8>) -> Result<StoredObject, StorageError> {
        let size = data.len() as u64;
        self.operator.write(key, data).await?;
        Ok(StoredObject {
            key: key.to_string(),
            size,
        })
    }

    /// Reads the whole object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let buffer = self.operator.read(key).await?;
        Ok(buffer.to_vec())
    }

    /// Delete a file from storage. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// Check if a file exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        self.operator.stat(key).await.is_ok()
    }

    /// Get the storage provider name.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }
}

/// Storage key for an expense receipt.
#[must_use]
pub fn receipt_key(business_id: Uuid, expense_id: Uuid, filename: &str) -> String {
    format!(
        "receipts/{business_id}/{expense_id}/{}",
        sanitize_filename(filename)
    )
}

/// Storage key for an invoice PDF.
///
/// Numbers repeat across businesses, so the key is scoped by business and
/// invoice id.
#[must_use]
pub fn invoice_pdf_key(business_id: Uuid, invoice_id: Uuid, invoice_number: &str) -> String {
    format!(
        "invoices/{business_id}/{invoice_id}/{}.pdf",
        sanitize_filename(invoice_number)
    )
}

/// Replaces anything outside `[A-Za-z0-9._-]` with `_`.
fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_service() -> StorageService {
        let root = std::env::temp_dir().join(format!("factura-storage-{}", Uuid::new_v4()));
        StorageService::from_config(StorageConfig::new(StorageProvider::local_fs(root)))
            .expect("should create service")
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("receipt.pdf"), "receipt.pdf");
        assert_eq!(sanitize_filename("my file (1).pdf"), "my_file__1_.pdf");
        assert_eq!(sanitize_filename("reçu.png"), "re_u.png");
        assert_eq!(sanitize_filename(".."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_receipt_key_layout() {
        let business = Uuid::from_u128(1);
        let expense = Uuid::from_u128(2);
        let key = receipt_key(business, expense, "../taxi.jpg");
        assert_eq!(key, format!("receipts/{business}/{expense}/.._taxi.jpg"));
        assert_eq!(key.split('/').count(), 4);
    }

    #[test]
    fn test_invoice_pdf_key_layout() {
        let business = Uuid::from_u128(1);
        let invoice = Uuid::from_u128(2);
        assert_eq!(
            invoice_pdf_key(business, invoice, "INV-2026-001"),
            format!("invoices/{business}/{invoice}/INV-2026-001.pdf")
        );
    }

    #[tokio::test]
    async fn test_same_invoice_number_in_two_businesses_keeps_both_files() {
        let service = temp_service();
        let key_a = invoice_pdf_key(Uuid::new_v4(), Uuid::new_v4(), "INV-2026-001");
        let key_b = invoice_pdf_key(Uuid::new_v4(), Uuid::new_v4(), "INV-2026-001");
        assert_ne!(key_a, key_b);

        service.write(&key_a, b"business A invoice".to_vec()).await.unwrap();
        service.write(&key_b, b"business B invoice".to_vec()).await.unwrap();

        assert_eq!(service.read(&key_a).await.unwrap(), b"business A invoice".to_vec());
        assert_eq!(service.read(&key_b).await.unwrap(), b"business B invoice".to_vec());

        service.delete(&key_b).await.unwrap();
        assert!(service.exists(&key_a).await);
    }

    #[test]
    fn test_validate_upload() {
        let config =
            StorageConfig::new(StorageProvider::local_fs("./test")).with_max_file_size(1024);
        let service = StorageService::from_config(config).expect("should create service");

        assert!(service.validate_upload("image/png", 512).is_ok());
        assert!(matches!(
            service.validate_upload("image/png", 2048),
            Err(StorageError::FileTooLarge { .. })
        ));
        assert!(matches!(
            service.validate_upload("application/x-executable", 10),
            Err(StorageError::InvalidMimeType { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_read_delete_local() {
        let service = temp_service();
        let key = invoice_pdf_key(Uuid::new_v4(), Uuid::new_v4(), "INV-2026-007");

        let stored = service.write(&key, b"%PDF-1.3".to_vec()).await.unwrap();
        assert_eq!(stored.size, 8);
        assert!(service.exists(&key).await);
        assert_eq!(service.read(&key).await.unwrap(), b"%PDF-1.3".to_vec());

        service.delete(&key).await.unwrap();
        assert!(!service.exists(&key).await);
        assert!(matches!(
            service.read(&key).await,
            Err(StorageError::NotFound { .. })
        ));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_sanitized_filename_safe_chars(filename in ".*") {
            let sanitized = sanitize_filename(&filename);
            prop_assert!(!sanitized.is_empty());
            for c in sanitized.chars() {
                let is_safe = c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';
                prop_assert!(is_safe, "Unexpected character in sanitized filename: {}", c);
            }
        }

        #[test]
        fn prop_receipt_key_never_escapes_prefix(filename in ".*") {
            let key = receipt_key(Uuid::nil(), Uuid::nil(), &filename);
            prop_assert_eq!(key.split('/').count(), 4);
            prop_assert!(key.starts_with("receipts/"));
        }
    }
}
