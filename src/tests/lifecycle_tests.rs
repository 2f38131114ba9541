// mimir-service/src/tests/lifecycle_tests.rs
//
// Service-level tests for the resource lifecycle: ordering, compensation,
// idempotent deletes and URL issuance.
use crate::models::{
    DeleteOutcome, ProjectRole, ResourceScope, ServiceError, Team, TeamMember, TeamRole,
    UploadResourceRequest,
};
use crate::services::{resource_service, AppState};
use crate::store::{FsObjectStore, FsRecordStore, ObjectStore, RecordStore, UrlSigner};
use chrono::Utc;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const TEST_BASE_URL: &str = "http://127.0.0.1:9090";

fn test_state() -> (AppState, String) {
    let root = format!("./test_data/{}", Uuid::new_v4());
    let signer = UrlSigner::new("test-secret");
    let state = AppState {
        records: Arc::new(FsRecordStore::new(format!("{}/data", root))),
        objects: Arc::new(FsObjectStore::new(
            format!("{}/objects", root),
            TEST_BASE_URL,
            signer.clone(),
        )),
        signer,
    };
    (state, root)
}

fn upload_request(scope: ResourceScope, scope_id: Option<&str>, content: &str) -> UploadResourceRequest {
    UploadResourceRequest {
        title: "Weekly report".to_string(),
        description: None,
        scope,
        scope_id: scope_id.map(|s| s.to_string()),
        tags: None,
        is_public: None,
        content: Some(content.to_string()),
        content_base64: None,
    }
}

fn seed_team(state: &AppState, team_id: &str, owner: &str) {
    state
        .records
        .save_team(&Team {
            id: team_id.to_string(),
            name: "Research".to_string(),
            owner_id: owner.to_string(),
            created_at: Utc::now(),
        })
        .unwrap();
    seed_team_member(state, team_id, owner, TeamRole::Owner);
}

fn seed_team_member(state: &AppState, team_id: &str, user_id: &str, role: TeamRole) {
    state
        .records
        .save_team_member(&TeamMember {
            user_id: user_id.to_string(),
            team_id: team_id.to_string(),
            role,
            joined_at: Utc::now(),
        })
        .unwrap();
}

fn count_files(dir: &Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files(&path);
            } else {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn personal_upload_writes_object_and_record() {
    let (state, root) = test_state();

    let resource = resource_service::create_resource(
        &state,
        "u1",
        "My Notes.MD",
        upload_request(ResourceScope::Personal, None, "hello"),
    )
    .unwrap();

    assert_eq!(resource.file_type, "md");
    assert_eq!(resource.file_size, 5);
    assert!(resource.is_public);
    assert_eq!(resource.uploaded_by.as_deref(), Some("u1"));
    assert!(resource.storage_path.starts_with("personal/u1/"));

    // Both sides of the create exist
    let stored = state.objects.get(&resource.storage_path).unwrap();
    assert_eq!(stored, b"hello");
    assert!(state
        .records
        .find_resource_by_id(&resource.id)
        .unwrap()
        .is_some());

    fs::remove_dir_all(&root).ok();
}

#[test]
fn base64_payload_is_decoded() {
    let (state, root) = test_state();

    let request = UploadResourceRequest {
        content: None,
        content_base64: Some("aGVsbG8gd29ybGQ=".to_string()),
        ..upload_request(ResourceScope::Personal, None, "")
    };

    let resource =
        resource_service::create_resource(&state, "u1", "report.pdf", request).unwrap();

    assert_eq!(resource.file_size, 11);
    assert_eq!(state.objects.get(&resource.storage_path).unwrap(), b"hello world");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn team_upload_denied_below_admin_leaves_no_trace() {
    let (state, root) = test_state();
    seed_team(&state, "t1", "owner");
    seed_team_member(&state, "t1", "plain", TeamRole::Member);

    let result = resource_service::create_resource(
        &state,
        "plain",
        "report.pdf",
        upload_request(ResourceScope::Team, Some("t1"), "data"),
    );

    match result {
        Err(ServiceError::Forbidden(msg)) => assert!(msg.contains("insufficient-role")),
        other => panic!("Expected Forbidden, got {:?}", other.map(|r| r.id)),
    }

    // A deny aborts before any side effect
    assert!(state
        .records
        .scoped_resources(ResourceScope::Team, "t1")
        .unwrap()
        .is_empty());
    assert_eq!(count_files(Path::new(&format!("{}/objects", root))), 0);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn upload_into_unknown_team_is_rejected() {
    let (state, root) = test_state();

    let result = resource_service::create_resource(
        &state,
        "u1",
        "report.pdf",
        upload_request(ResourceScope::Team, Some("ghost"), "data"),
    );

    assert!(matches!(result, Err(ServiceError::NotFound)));

    fs::remove_dir_all(&root).ok();
}

#[test]
fn storage_write_failure_creates_no_record() {
    let (state, root) = test_state();

    // Sabotage the object root: a plain file where the directory should be
    fs::create_dir_all(&root).unwrap();
    fs::write(format!("{}/objects", root), "not a directory").unwrap();

    let result = resource_service::create_resource(
        &state,
        "u1",
        "notes.md",
        upload_request(ResourceScope::Personal, None, "hello"),
    );

    match result {
        Err(ServiceError::StorageFailure(msg)) => assert!(msg.contains("uploaded")),
        other => panic!("Expected StorageFailure, got {:?}", other.map(|r| r.id)),
    }

    assert!(state.records.personal_resources("u1").unwrap().is_empty());

    fs::remove_dir_all(&root).ok();
}

#[test]
fn record_insert_failure_removes_written_object() {
    let (state, root) = test_state();

    // Sabotage only the resources table; the object write itself succeeds
    fs::create_dir_all(format!("{}/data", root)).unwrap();
    fs::write(format!("{}/data/resources", root), "not a directory").unwrap();

    let result = resource_service::create_resource(
        &state,
        "u1",
        "notes.md",
        upload_request(ResourceScope::Personal, None, "hello"),
    );

    match result {
        Err(ServiceError::StorageFailure(msg)) => assert!(msg.contains("saved")),
        other => panic!("Expected StorageFailure, got {:?}", other.map(|r| r.id)),
    }

    // Compensation removed the object that was written in step 3
    assert_eq!(count_files(Path::new(&format!("{}/objects", root))), 0);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn delete_is_uploader_only_and_idempotent() {
    let (state, root) = test_state();
    seed_team(&state, "t1", "owner");
    seed_team_member(&state, "t1", "admin", TeamRole::Admin);

    let resource = resource_service::create_resource(
        &state,
        "admin",
        "report.pdf",
        upload_request(ResourceScope::Team, Some("t1"), "data"),
    )
    .unwrap();

    // Even the team owner cannot delete someone else's upload
    match resource_service::delete_resource(&state, "owner", &resource.id) {
        Err(ServiceError::Forbidden(msg)) => assert!(msg.contains("not-owner")),
        other => panic!("Expected Forbidden, got {:?}", other),
    }

    assert_eq!(
        resource_service::delete_resource(&state, "admin", &resource.id).unwrap(),
        DeleteOutcome::Deleted
    );

    // The object is gone along with the record
    assert!(matches!(
        state.objects.get(&resource.storage_path),
        Err(ServiceError::NotFound)
    ));

    // A second delete is a valid outcome, not a fault
    assert_eq!(
        resource_service::delete_resource(&state, "admin", &resource.id).unwrap(),
        DeleteOutcome::AlreadyGone
    );

    fs::remove_dir_all(&root).ok();
}

#[test]
fn download_url_requires_read_access() {
    let (state, root) = test_state();
    seed_team(&state, "t1", "owner");
    seed_team_member(&state, "t1", "plain", TeamRole::Member);

    let resource = resource_service::create_resource(
        &state,
        "owner",
        "report.pdf",
        upload_request(ResourceScope::Team, Some("t1"), "data"),
    )
    .unwrap();

    // Any member may fetch a link to a shared resource
    let url = resource_service::issue_download_url(&state, "plain", &resource.id).unwrap();
    assert!(url.starts_with(&format!("{}/files/signed?token=", TEST_BASE_URL)));

    // The embedded token grants exactly the resource's storage path
    let token = url.rsplit("token=").next().unwrap();
    assert_eq!(state.signer.verify(token).unwrap(), resource.storage_path);

    // Outsiders are refused at issuance time
    match resource_service::issue_download_url(&state, "stranger", &resource.id) {
        Err(ServiceError::Forbidden(msg)) => assert!(msg.contains("not-a-member")),
        other => panic!("Expected Forbidden, got {:?}", other),
    }

    fs::remove_dir_all(&root).ok();
}

#[test]
fn personal_download_url_is_owner_only() {
    let (state, root) = test_state();

    let resource = resource_service::create_resource(
        &state,
        "u1",
        "notes.md",
        upload_request(ResourceScope::Personal, None, "private"),
    )
    .unwrap();

    assert!(resource_service::issue_download_url(&state, "u1", &resource.id).is_ok());

    match resource_service::issue_download_url(&state, "u2", &resource.id) {
        Err(ServiceError::Forbidden(msg)) => assert!(msg.contains("not-owner")),
        other => panic!("Expected Forbidden, got {:?}", other),
    }

    fs::remove_dir_all(&root).ok();
}

#[test]
fn private_resources_are_hidden_from_member_listings() {
    let (state, root) = test_state();
    seed_team(&state, "t1", "owner");
    seed_team_member(&state, "t1", "plain", TeamRole::Member);

    let mut request = upload_request(ResourceScope::Team, Some("t1"), "data");
    request.is_public = Some(false);
    resource_service::create_resource(&state, "owner", "draft.pdf", request).unwrap();

    let request = upload_request(ResourceScope::Team, Some("t1"), "data");
    resource_service::create_resource(&state, "owner", "shared.pdf", request).unwrap();

    let listing = resource_service::list_team(&state, "plain", "t1").unwrap();
    assert_eq!(listing.resources.len(), 1);
    assert_eq!(listing.resources[0].file_name, "shared.pdf");
    assert!(!listing.can_upload);

    let listing = resource_service::list_team(&state, "owner", "t1").unwrap();
    assert!(listing.can_upload);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn overview_spans_every_scope_the_caller_belongs_to() {
    let (state, root) = test_state();
    seed_team(&state, "t1", "u1");

    state
        .records
        .save_project(&crate::models::Project {
            id: "p1".to_string(),
            team_id: None,
            name: "Side project".to_string(),
            slug: "side-project-0000".to_string(),
            owner_id: "u1".to_string(),
            status: "planning".to_string(),
            priority: "medium".to_string(),
            description: None,
            created_at: Utc::now(),
        })
        .unwrap();
    state
        .records
        .save_project_member(&crate::models::ProjectMember {
            user_id: "u1".to_string(),
            project_id: "p1".to_string(),
            role: ProjectRole::Owner,
            joined_at: Utc::now(),
        })
        .unwrap();

    resource_service::create_resource(
        &state,
        "u1",
        "personal.md",
        upload_request(ResourceScope::Personal, None, "a"),
    )
    .unwrap();
    resource_service::create_resource(
        &state,
        "u1",
        "team.pdf",
        upload_request(ResourceScope::Team, Some("t1"), "b"),
    )
    .unwrap();
    resource_service::create_resource(
        &state,
        "u1",
        "project.pdf",
        upload_request(ResourceScope::Project, Some("p1"), "c"),
    )
    .unwrap();

    let overview = resource_service::list_all(&state, "u1").unwrap();
    assert_eq!(overview.personal.len(), 1);
    assert_eq!(overview.team.len(), 1);
    assert_eq!(overview.project.len(), 1);

    // A user with no memberships sees nothing shared
    let overview = resource_service::list_all(&state, "u2").unwrap();
    assert!(overview.personal.is_empty());
    assert!(overview.team.is_empty());
    assert!(overview.project.is_empty());

    fs::remove_dir_all(&root).ok();
}

#[test]
fn collective_cascade_removes_records_and_objects() {
    let (state, root) = test_state();
    seed_team(&state, "t1", "owner");

    for name in ["one.pdf", "two.pdf"] {
        resource_service::create_resource(
            &state,
            "owner",
            name,
            upload_request(ResourceScope::Team, Some("t1"), "data"),
        )
        .unwrap();
    }

    let deleted =
        resource_service::delete_collective_resources(&state, ResourceScope::Team, "t1").unwrap();
    assert_eq!(deleted, 2);

    assert!(state
        .records
        .scoped_resources(ResourceScope::Team, "t1")
        .unwrap()
        .is_empty());
    assert_eq!(count_files(Path::new(&format!("{}/objects/team", root))), 0);

    fs::remove_dir_all(&root).ok();
}
