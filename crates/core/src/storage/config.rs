//! Storage configuration types.

use factura_shared::StorageSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage (AWS S3, Cloudflare R2, MinIO).
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// Bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Azure Blob Storage.
    AzureBlob {
        /// Storage account name.
        account: String,
        /// Storage access key.
        access_key: String,
        /// Container name.
        container: String,
    },
    /// Local filesystem.
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create local filesystem provider.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Builds the provider described by the `[storage]` config section.
    ///
    /// `kind` is one of `local`, `s3` or `azblob`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` for an unknown kind or a
    /// missing required field.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let required = |value: &Option<String>, field: &str| {
            value
                .clone()
                .ok_or_else(|| StorageError::configuration(format!("storage.{field} is required")))
        };

        match settings.kind.to_lowercase().as_str() {
            "local" | "fs" => Ok(Self::local_fs(&settings.root)),
            "s3" => Ok(Self::S3 {
                endpoint: required(&settings.endpoint, "endpoint")?,
                bucket: required(&settings.bucket, "bucket")?,
                access_key_id: required(&settings.access_key_id, "access_key_id")?,
                secret_access_key: required(&settings.secret_access_key, "secret_access_key")?,
                region: settings.region.clone().unwrap_or_else(|| "auto".to_string()),
            }),
            "azblob" | "azure" => Ok(Self::AzureBlob {
                account: required(&settings.access_key_id, "access_key_id")?,
                access_key: required(&settings.secret_access_key, "secret_access_key")?,
                container: required(&settings.bucket, "bucket")?,
            }),
            other => Err(StorageError::configuration(format!(
                "unknown storage kind '{other}'"
            ))),
        }
    }

    /// Get the provider name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
    /// MIME types accepted for receipts.
    pub allowed_mime_types: Vec<String>,
}

impl StorageConfig {
    /// Default max file size: 5MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: Self::default_mime_types(),
        }
    }

    /// Builds the config from the `[storage]` section.
    ///
    /// # Errors
    ///
    /// Propagates `StorageProvider::from_settings` errors.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        Ok(Self::new(StorageProvider::from_settings(settings)?)
            .with_max_file_size(settings.max_file_size))
    }

    /// Set maximum file size.
    #[must_use]
    pub const fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Receipts may be scans, photos or PDFs.
    #[must_use]
    pub fn default_mime_types() -> Vec<String> {
        [
            "application/pdf",
            "image/png",
            "image/jpeg",
            "image/gif",
            "image/webp",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|t| t == mime_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(kind: &str) -> StorageSettings {
        StorageSettings {
            kind: kind.to_string(),
            ..StorageSettings::default()
        }
    }

    #[test]
    fn test_local_from_settings() {
        let provider = StorageProvider::from_settings(&settings("local")).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut s = settings("s3");
        s.endpoint = Some("https://s3.example.com".into());
        s.access_key_id = Some("key".into());
        s.secret_access_key = Some("secret".into());
        let err = StorageProvider::from_settings(&s).unwrap_err();
        assert!(err.to_string().contains("storage.bucket"));

        s.bucket = Some("receipts".into());
        let provider = StorageProvider::from_settings(&s).unwrap();
        assert_eq!(provider.name(), "s3");
    }

    #[test]
    fn test_azure_from_settings() {
        let mut s = settings("azblob");
        s.access_key_id = Some("account".into());
        s.secret_access_key = Some("key".into());
        s.bucket = Some("files".into());
        assert_eq!(
            StorageProvider::from_settings(&s).unwrap().name(),
            "azure_blob"
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(matches!(
            StorageProvider::from_settings(&settings("ftp")),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_receipt_mime_types() {
        let config = StorageConfig::new(StorageProvider::local_fs("./uploads"));
        assert_eq!(config.max_file_size, StorageConfig::DEFAULT_MAX_FILE_SIZE);
        assert!(config.is_mime_type_allowed("image/jpeg"));
        assert!(config.is_mime_type_allowed("application/pdf"));
        assert!(!config.is_mime_type_allowed("text/html"));
    }
}
