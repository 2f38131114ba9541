// mimir-service/src/services/resource_service.rs
//
// Resource lifecycle manager: orchestrates the authorization policy, the
// storage addressing scheme and the record store. Step ordering is what
// guarantees the record store never references an object that was never
// written; see create_resource.

use crate::models::{
    DeleteOutcome, Resource, ResourceListing, ResourceOverview, ResourceScope, ServiceError,
    UploadResourceRequest,
};
use crate::services::authorization::{self, Operation};
use crate::services::AppState;
use crate::store::{build_storage_path, sanitize_file_name, ObjectStore, RecordStore};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use log::{error, info};
use uuid::Uuid;

// Signed download links stay valid for one hour; authorization is re-checked
// on every issuance, never baked into a permanent link
pub const DOWNLOAD_URL_TTL_SECS: i64 = 3600;

fn decode_payload(request: &UploadResourceRequest) -> Result<Vec<u8>, ServiceError> {
    match (&request.content, &request.content_base64) {
        (Some(text), None) => Ok(text.clone().into_bytes()),
        (None, Some(encoded)) => general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ServiceError::BadRequest(format!("Invalid base64 payload: {}", e))),
        _ => Err(ServiceError::BadRequest(
            "Exactly one of content or content_base64 is required".to_string(),
        )),
    }
}

// Check the descriptor names a real collective before anything is written
fn validate_scope(
    state: &AppState,
    scope: ResourceScope,
    scope_id: Option<&str>,
) -> Result<(), ServiceError> {
    match scope {
        ResourceScope::Personal => {
            if scope_id.is_some() {
                return Err(ServiceError::BadRequest(
                    "Personal resources carry no team or project id".to_string(),
                ));
            }
        }
        ResourceScope::Team => {
            let team_id = scope_id.ok_or_else(|| {
                ServiceError::BadRequest("Team resources require a team id".to_string())
            })?;
            if state.records.find_team_by_id(team_id)?.is_none() {
                return Err(ServiceError::NotFound);
            }
        }
        ResourceScope::Project => {
            let project_id = scope_id.ok_or_else(|| {
                ServiceError::BadRequest("Project resources require a project id".to_string())
            })?;
            if state.records.find_project_by_id(project_id)?.is_none() {
                return Err(ServiceError::NotFound);
            }
        }
    }
    Ok(())
}

// Create a scoped resource. Ordering matters:
//   1. authorize; a deny aborts with no side effect
//   2. compute the storage address
//   3. write the object; failure aborts, no record is created
//   4. insert the record; failure triggers a best-effort compensating
//      removal of the object just written
// A compensating removal that itself fails leaves a transient orphaned
// object, recoverable out of band; the record store stays consistent.
pub fn create_resource(
    state: &AppState,
    actor_id: &str,
    file_name: &str,
    request: UploadResourceRequest,
) -> Result<Resource, ServiceError> {
    let bytes = decode_payload(&request)?;

    let file_name = sanitize_file_name(file_name);
    if file_name.is_empty() {
        return Err(ServiceError::BadRequest("A file name is required".to_string()));
    }
    if request.title.trim().is_empty() {
        return Err(ServiceError::BadRequest("A title is required".to_string()));
    }

    let scope_id = request.scope_id.as_deref();
    validate_scope(state, request.scope, scope_id)?;

    authorization::authorize_upload(
        state.records.as_ref(),
        Some(actor_id),
        request.scope,
        scope_id,
    )?
    .require()?;

    let now = Utc::now();
    let scope_or_owner = scope_id.unwrap_or(actor_id);
    let (storage_path, file_type) =
        build_storage_path(request.scope, scope_or_owner, &file_name, now);

    state.objects.put(&storage_path, &bytes)?;

    let is_public = request.is_public.unwrap_or(true);
    let content_url = if is_public {
        Some(state.objects.public_url(&storage_path))
    } else {
        None
    };

    let resource = Resource {
        id: Uuid::new_v4().to_string(),
        scope: request.scope,
        scope_id: request.scope_id.clone(),
        uploaded_by: Some(actor_id.to_string()),
        title: request.title.clone(),
        description: request.description.clone(),
        file_name,
        file_type,
        file_size: bytes.len() as u64,
        storage_path: storage_path.clone(),
        content_url,
        tags: request.tags.clone().unwrap_or_default(),
        is_public,
        created_at: now,
    };

    if let Err(insert_err) = state.records.insert_resource(&resource) {
        error!(
            "❌ Record insert failed for {}: {}; removing written object",
            resource.id, insert_err
        );
        if let Err(cleanup_err) = state.objects.remove(&storage_path) {
            // Orphaned object: name the path so out-of-band cleanup can find it
            error!(
                "❌ Compensating removal failed, orphaned object at {}: {}",
                storage_path, cleanup_err
            );
        }
        return Err(ServiceError::StorageFailure(
            "Resource could not be saved".to_string(),
        ));
    }

    info!("✅ Resource created: {} at {}", resource.id, storage_path);

    Ok(resource)
}

// Delete a resource. The record delete is authoritative for the outcome;
// storage removal is best-effort and eventually reconcilable. A resource
// that is already gone is a valid outcome, not a fault, so a duplicate
// delete (including a concurrent race) reports AlreadyGone.
pub fn delete_resource(
    state: &AppState,
    actor_id: &str,
    resource_id: &str,
) -> Result<DeleteOutcome, ServiceError> {
    let resource = match state.records.find_resource_by_id(resource_id)? {
        Some(resource) => resource,
        None => return Ok(DeleteOutcome::AlreadyGone),
    };

    authorization::authorize(
        state.records.as_ref(),
        Some(actor_id),
        &resource,
        Operation::Delete,
    )?
    .require()?;

    if let Err(storage_err) = state.objects.remove(&resource.storage_path) {
        error!(
            "❌ Failed to remove object {} for resource {}: {}",
            resource.storage_path, resource_id, storage_err
        );
        // Non-fatal: the record delete below decides the outcome
    }

    if !state.records.delete_resource(resource_id)? {
        return Ok(DeleteOutcome::AlreadyGone);
    }

    info!("✅ Resource deleted: {}", resource_id);

    Ok(DeleteOutcome::Deleted)
}

// Issue a time-bounded download link. The policy runs on every call, so
// access revoked after a link expires stays revoked.
pub fn issue_download_url(
    state: &AppState,
    actor_id: &str,
    resource_id: &str,
) -> Result<String, ServiceError> {
    let resource = state
        .records
        .find_resource_by_id(resource_id)?
        .ok_or(ServiceError::NotFound)?;

    authorization::authorize(
        state.records.as_ref(),
        Some(actor_id),
        &resource,
        Operation::Read,
    )?
    .require()?;

    state
        .objects
        .signed_url(&resource.storage_path, DOWNLOAD_URL_TTL_SECS)
}

pub fn list_personal(state: &AppState, actor_id: &str) -> Result<Vec<Resource>, ServiceError> {
    state.records.personal_resources(actor_id)
}

pub fn list_team(
    state: &AppState,
    actor_id: &str,
    team_id: &str,
) -> Result<ResourceListing, ServiceError> {
    let role = authorization::team_role(state.records.as_ref(), actor_id, team_id)?
        .ok_or_else(|| ServiceError::Forbidden(
            "You are not a member of this team or project (not-a-member)".to_string(),
        ))?;

    let resources = state
        .records
        .scoped_resources(ResourceScope::Team, team_id)?
        .into_iter()
        .filter(|r| r.is_public)
        .collect();

    Ok(ResourceListing {
        resources,
        can_upload: role.can_upload(),
    })
}

pub fn list_project(
    state: &AppState,
    actor_id: &str,
    project_id: &str,
) -> Result<ResourceListing, ServiceError> {
    let role = authorization::project_role(state.records.as_ref(), actor_id, project_id)?
        .ok_or_else(|| ServiceError::Forbidden(
            "You are not a member of this team or project (not-a-member)".to_string(),
        ))?;

    let resources = state
        .records
        .scoped_resources(ResourceScope::Project, project_id)?
        .into_iter()
        .filter(|r| r.is_public)
        .collect();

    Ok(ResourceListing {
        resources,
        can_upload: role.can_upload(),
    })
}

// Dashboard aggregate: the caller's personal resources plus the shared
// resources of every collective they belong to
pub fn list_all(state: &AppState, actor_id: &str) -> Result<ResourceOverview, ServiceError> {
    let personal = state.records.personal_resources(actor_id)?;

    let mut team = Vec::new();
    for membership in state.records.team_memberships_for_user(actor_id)? {
        team.extend(
            state
                .records
                .scoped_resources(ResourceScope::Team, &membership.team_id)?
                .into_iter()
                .filter(|r| r.is_public),
        );
    }

    let mut project = Vec::new();
    for membership in state.records.project_memberships_for_user(actor_id)? {
        project.extend(
            state
                .records
                .scoped_resources(ResourceScope::Project, &membership.project_id)?
                .into_iter()
                .filter(|r| r.is_public),
        );
    }

    team.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    project.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ResourceOverview { personal, team, project })
}

// Cascade helper for collective deletion: drop every resource in the scope,
// storage objects best-effort first, records authoritatively after
pub fn delete_collective_resources(
    state: &AppState,
    scope: ResourceScope,
    scope_id: &str,
) -> Result<usize, ServiceError> {
    let mut deleted = 0;
    for resource in state.records.scoped_resources(scope, scope_id)? {
        if let Err(storage_err) = state.objects.remove(&resource.storage_path) {
            error!(
                "❌ Failed to remove object {} while deleting {} {}: {}",
                resource.storage_path,
                scope.as_str(),
                scope_id,
                storage_err
            );
        }
        if state.records.delete_resource(&resource.id)? {
            deleted += 1;
        }
    }

    info!(
        "✅ Deleted {} resources for {} {}",
        deleted,
        scope.as_str(),
        scope_id
    );

    Ok(deleted)
}
