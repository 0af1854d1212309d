//! GCS blob store over the JSON API. Authentication is a bearer token
//! supplied by the environment (workload identity or a token refresher
//! outside this crate's scope).

use std::time::Duration;

use narra_core::errors::BlobError;

use crate::{fallback_keys, scoped_key, BlobAddress, BlobStore};

const UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1/b";
const OBJECT_BASE: &str = "https://storage.googleapis.com/storage/v1/b";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GcsBlobStore {
    bucket: String,
    access_token: String,
    client: reqwest::blocking::Client,
}

impl GcsBlobStore {
    pub fn new(bucket: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            access_token: access_token.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Bucket from config, token from `GCS_ACCESS_TOKEN`.
    pub fn from_env(bucket: impl Into<String>) -> Result<Self, BlobError> {
        let token = std::env::var("GCS_ACCESS_TOKEN").map_err(|_| BlobError::Gcs {
            status: 401,
            body: "GCS_ACCESS_TOKEN not set".to_string(),
        })?;
        Ok(Self::new(bucket, token))
    }

    fn key_of(&self, address: &str) -> Result<String, BlobError> {
        match BlobAddress::parse(address)? {
            BlobAddress::Gcs { bucket, key } if bucket == self.bucket => Ok(key),
            BlobAddress::Gcs { bucket, key } => {
                // Foreign bucket: honour it anyway, the address is
                // authoritative.
                tracing::debug!(%bucket, %key, "address points at a foreign bucket");
                Ok(key)
            }
            BlobAddress::Local { path } => Ok(path.trim_start_matches('/').to_string()),
        }
    }

    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let url = format!(
            "{OBJECT_BASE}/{}/o/{}?alt=media",
            self.bucket,
            urlencode(key)
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .timeout(HTTP_TIMEOUT)
            .send()
            .map_err(|e| BlobError::Gcs {
                status: 0,
                body: e.to_string(),
            })?;

        match response.status().as_u16() {
            200 => Ok(Some(response.bytes().map(|b| b.to_vec()).map_err(|e| {
                BlobError::Gcs {
                    status: 0,
                    body: e.to_string(),
                }
            })?)),
            404 => Ok(None),
            status => Err(BlobError::Gcs {
                status,
                body: response.text().unwrap_or_default(),
            }),
        }
    }
}

impl BlobStore for GcsBlobStore {
    fn upload(
        &self,
        data: &[u8],
        key: &str,
        content_type: &str,
        user_id: Option<&str>,
    ) -> Result<String, BlobError> {
        let key = scoped_key(key, user_id);
        let url = format!(
            "{UPLOAD_BASE}/{}/o?uploadType=media&name={}",
            self.bucket,
            urlencode(&key)
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", content_type)
            .timeout(HTTP_TIMEOUT)
            .body(data.to_vec())
            .send()
            .map_err(|e| BlobError::Gcs {
                status: 0,
                body: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(BlobError::Gcs {
                status,
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(format!("gs://{}/{key}", self.bucket))
    }

    fn download(&self, address: &str) -> Result<Vec<u8>, BlobError> {
        let key = self.key_of(address)?;
        for candidate in fallback_keys(&key) {
            if let Some(bytes) = self.get_object(&candidate)? {
                return Ok(bytes);
            }
        }
        Err(BlobError::NotFound {
            path: address.to_string(),
        })
    }

    fn delete(&self, address: &str) -> Result<(), BlobError> {
        let key = self.key_of(address)?;
        let url = format!("{OBJECT_BASE}/{}/o/{}", self.bucket, urlencode(&key));
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .timeout(HTTP_TIMEOUT)
            .send()
            .map_err(|e| BlobError::Gcs {
                status: 0,
                body: e.to_string(),
            })?;
        match response.status().as_u16() {
            204 => Ok(()),
            404 => Err(BlobError::NotFound {
                path: address.to_string(),
            }),
            status => Err(BlobError::Gcs {
                status,
                body: response.text().unwrap_or_default(),
            }),
        }
    }

    fn signed_url(&self, address: &str, _ttl_seconds: u64) -> Result<String, BlobError> {
        // V4 signing needs a private key; with token-only auth the best
        // available URL is the media link, valid for public objects.
        let key = self.key_of(address)?;
        Ok(format!(
            "https://storage.googleapis.com/{}/{key}",
            self.bucket
        ))
    }
}

/// Percent-encodes an object key for use inside a URL path or query.
fn urlencode(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
