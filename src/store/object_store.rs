// mimir-service/src/store/object_store.rs
use crate::models::{ResourceScope, ServiceError};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use log::error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

lazy_static! {
    // Client-supplied filenames are reduced to a safe character set before
    // they touch a storage path
    static ref FILE_NAME_RE: Regex = Regex::new(r"[^a-zA-Z0-9.-]").unwrap();
}

const DEFAULT_EXTENSION: &str = "pdf";

pub fn sanitize_file_name(file_name: &str) -> String {
    FILE_NAME_RE.replace_all(file_name, "").to_string()
}

// Deterministic storage address for a new object:
//   {scope}/{collective-or-owner-id}/{timestamp}_{token}.{extension}
// The random token keeps two uploads in the same second apart and makes
// sibling paths unguessable even inside an authorized scope directory.
// Returns the path together with the derived file type; a missing extension
// falls back to the default rather than failing the upload.
pub fn build_storage_path(
    scope: ResourceScope,
    scope_or_owner_id: &str,
    file_name: &str,
    now: DateTime<Utc>,
) -> (String, String) {
    let file_type = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let token = Uuid::new_v4().simple().to_string();
    let path = format!(
        "{}/{}/{}_{}.{}",
        scope.as_str(),
        scope_or_owner_id,
        now.timestamp(),
        token,
        file_type
    );

    (path, file_type)
}

// Claims carried by a signed retrieval URL: the path it grants and when the
// grant lapses. Confidentiality is enforced at issuance time, so the token
// must stay short-lived.
#[derive(Serialize, Deserialize, Debug)]
struct UrlClaims {
    path: String,
    exp: usize,
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        UrlSigner { secret: secret.into() }
    }

    pub fn sign(&self, path: &str, ttl_secs: i64) -> Result<String, ServiceError> {
        let exp = (Utc::now().timestamp() + ttl_secs) as usize;
        let claims = UrlClaims { path: path.to_string(), exp };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            error!("Failed to sign retrieval URL: {:?}", e);
            ServiceError::InternalServerError
        })
    }

    // Returns the storage path the token grants, or Unauthorized if the
    // token is forged or past its window
    pub fn verify(&self, token: &str) -> Result<String, ServiceError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<UrlClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims.path)
        .map_err(|_| ServiceError::Unauthorized)
    }
}

// Object storage consumed by the lifecycle manager. Mirrors the hosted
// storage surface: write, remove, and the two URL flavours.
pub trait ObjectStore: Send + Sync {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), ServiceError>;
    fn get(&self, path: &str) -> Result<Vec<u8>, ServiceError>;
    fn remove(&self, path: &str) -> Result<(), ServiceError>;
    fn public_url(&self, path: &str) -> String;
    fn signed_url(&self, path: &str, ttl_secs: i64) -> Result<String, ServiceError>;
}

// Filesystem-backed object store rooted at STORAGE_ROOT
pub struct FsObjectStore {
    root: PathBuf,
    base_url: String,
    signer: UrlSigner,
}

impl FsObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P, base_url: impl Into<String>, signer: UrlSigner) -> Self {
        FsObjectStore {
            root: root.into(),
            base_url: base_url.into(),
            signer,
        }
    }

    // Storage paths are built internally, but never trust one far enough to
    // let it climb out of the root
    fn resolve(&self, path: &str) -> Result<PathBuf, ServiceError> {
        if path.starts_with('/') || path.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(ServiceError::BadRequest(format!(
                "Invalid storage path: {}",
                path
            )));
        }
        Ok(self.root.join(path))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), ServiceError> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                error!("Failed to create object directory {:?}: {:?}", parent, e);
                ServiceError::StorageFailure("File could not be uploaded".to_string())
            })?;
        }

        fs::write(&full_path, bytes).map_err(|e| {
            error!("Failed to write object {}: {:?}", path, e);
            ServiceError::StorageFailure("File could not be uploaded".to_string())
        })
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        let full_path = self.resolve(path)?;
        if !full_path.exists() {
            return Err(ServiceError::NotFound);
        }

        fs::read(&full_path).map_err(|e| {
            error!("Failed to read object {}: {:?}", path, e);
            ServiceError::InternalServerError
        })
    }

    fn remove(&self, path: &str) -> Result<(), ServiceError> {
        let full_path = self.resolve(path)?;
        if !full_path.exists() {
            // Already gone; removal is idempotent
            return Ok(());
        }

        fs::remove_file(&full_path).map_err(|e| {
            error!("Failed to remove object {}: {:?}", path, e);
            ServiceError::StorageFailure("File could not be removed".to_string())
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/files/public/{}", self.base_url, path)
    }

    fn signed_url(&self, path: &str, ttl_secs: i64) -> Result<String, ServiceError> {
        let token = self.signer.sign(path, ttl_secs)?;
        Ok(format!("{}/files/signed?token={}", self.base_url, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_path_embeds_scope_and_id() {
        let now = Utc::now();
        let (path, file_type) =
            build_storage_path(ResourceScope::Team, "team-1", "Quarterly Report.PDF", now);

        assert!(path.starts_with("team/team-1/"));
        assert!(path.ends_with(".pdf"));
        assert_eq!(file_type, "pdf");
    }

    #[test]
    fn storage_path_defaults_missing_extension() {
        let now = Utc::now();
        let (path, file_type) =
            build_storage_path(ResourceScope::Personal, "user-1", "notes", now);

        assert!(path.ends_with(".pdf"));
        assert_eq!(file_type, "pdf");
    }

    #[test]
    fn storage_paths_never_collide() {
        let now = Utc::now();
        let (first, _) = build_storage_path(ResourceScope::Team, "team-1", "report.pdf", now);
        let (second, _) = build_storage_path(ResourceScope::Team, "team-1", "report.pdf", now);

        assert_ne!(first, second);
    }

    #[test]
    fn sanitizes_unsafe_file_names() {
        assert_eq!(sanitize_file_name("rapor özeti (v2).pdf"), "raporzetiv2.pdf");
        assert_eq!(sanitize_file_name("plain-name.md"), "plain-name.md");
    }

    #[test]
    fn signed_token_round_trips() {
        let signer = UrlSigner::new("test-secret");
        let token = signer.sign("team/team-1/123_abc.pdf", 3600).unwrap();

        let path = signer.verify(&token).unwrap();
        assert_eq!(path, "team/team-1/123_abc.pdf");
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = UrlSigner::new("test-secret");
        let token = signer.sign("team/team-1/123_abc.pdf", -120).unwrap();

        assert!(matches!(signer.verify(&token), Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let signer = UrlSigner::new("test-secret");
        let other = UrlSigner::new("other-secret");
        let token = other.sign("team/team-1/123_abc.pdf", 3600).unwrap();

        assert!(matches!(signer.verify(&token), Err(ServiceError::Unauthorized)));
    }
}
