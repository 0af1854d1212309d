//! Blob address parsing: `gs://bucket/key` vs local paths.

use narra_core::errors::BlobError;

/// A parsed blob address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobAddress {
    Gcs { bucket: String, key: String },
    Local { path: String },
}

impl BlobAddress {
    pub fn parse(address: &str) -> Result<Self, BlobError> {
        if let Some(rest) = address.strip_prefix("gs://") {
            let (bucket, key) = rest.split_once('/').ok_or_else(|| BlobError::InvalidAddress {
                path: address.to_string(),
            })?;
            if bucket.is_empty() || key.is_empty() {
                return Err(BlobError::InvalidAddress {
                    path: address.to_string(),
                });
            }
            Ok(BlobAddress::Gcs {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        } else if address.is_empty() {
            Err(BlobError::InvalidAddress {
                path: address.to_string(),
            })
        } else {
            Ok(BlobAddress::Local {
                path: address.to_string(),
            })
        }
    }

    pub fn to_address(&self) -> String {
        match self {
            BlobAddress::Gcs { bucket, key } => format!("gs://{bucket}/{key}"),
            BlobAddress::Local { path } => path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gcs_addresses() {
        let addr = BlobAddress::parse("gs://my-bucket/covers/x.png").unwrap();
        assert_eq!(
            addr,
            BlobAddress::Gcs {
                bucket: "my-bucket".to_string(),
                key: "covers/x.png".to_string()
            }
        );
        assert_eq!(addr.to_address(), "gs://my-bucket/covers/x.png");
    }

    #[test]
    fn rejects_malformed_gcs() {
        assert!(BlobAddress::parse("gs://bucket-only").is_err());
        assert!(BlobAddress::parse("").is_err());
    }

    #[test]
    fn everything_else_is_local() {
        assert!(matches!(
            BlobAddress::parse("/var/data/covers/x.png").unwrap(),
            BlobAddress::Local { .. }
        ));
    }
}
