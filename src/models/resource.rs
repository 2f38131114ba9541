// mimir-service/src/models/resource.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Visibility domain of a stored resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceScope {
    Personal,
    Team,
    Project,
}

impl ResourceScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceScope::Personal => "personal",
            ResourceScope::Team => "team",
            ResourceScope::Project => "project",
        }
    }
}

// A stored, owned artifact: report, document or learning material.
// `uploaded_by` is always set on records this service writes; a None here
// means the record is corrupt and the policy must refuse it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Resource {
    pub id: String,
    pub scope: ResourceScope,
    pub scope_id: Option<String>, // None iff scope is personal
    pub uploaded_by: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub storage_path: String,
    // Stable public link, present only for records shared with the world
    pub content_url: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

// Upload request: descriptor fields plus the payload. Text content goes in
// `content`, binary payloads in `content_base64`; exactly one must be set.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadResourceRequest {
    pub title: String,
    pub description: Option<String>,
    pub scope: ResourceScope,
    pub scope_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub content: Option<String>,
    pub content_base64: Option<String>,
}

// Listing of resources in one scope, with the caller's upload standing
#[derive(Serialize, Deserialize, Debug)]
pub struct ResourceListing {
    pub resources: Vec<Resource>,
    pub can_upload: bool,
}

// Dashboard aggregate across every scope the caller belongs to
#[derive(Serialize, Deserialize, Debug)]
pub struct ResourceOverview {
    pub personal: Vec<Resource>,
    pub team: Vec<Resource>,
    pub project: Vec<Resource>,
}

// Outcome of a delete: removing an already-gone resource is not a fault
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}
