// mimir-service/src/routes/resource_routes.rs
use crate::models::{DeleteOutcome, ServiceError, UploadResourceRequest};
use crate::services::{resource_service, AppState};
use crate::utils::identity;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

// Upload a resource into a scope the caller may write to
#[post("/resources/upload/{file_name}")]
async fn upload_resource(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UploadResourceRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let file_name = path.into_inner();

    info!(
        "📤 Upload request: {} into {} scope by user: {}",
        file_name,
        body.scope.as_str(),
        actor.sub
    );

    let resource =
        resource_service::create_resource(state.get_ref(), &actor.sub, &file_name, body.into_inner())?;

    Ok(HttpResponse::Ok().json(resource))
}

// List the caller's personal resources
#[get("/resources/personal")]
async fn list_personal_resources(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;

    let resources = resource_service::list_personal(state.get_ref(), &actor.sub)?;

    info!("✅ Found {} personal resources for user: {}", resources.len(), actor.sub);

    Ok(HttpResponse::Ok().json(resources))
}

// List a team's shared resources (members only)
#[get("/resources/team/{team_id}")]
async fn list_team_resources(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let team_id = path.into_inner();

    let listing = resource_service::list_team(state.get_ref(), &actor.sub, &team_id)?;

    info!("✅ Found {} resources for team: {}", listing.resources.len(), team_id);

    Ok(HttpResponse::Ok().json(listing))
}

// List a project's shared resources (members only)
#[get("/resources/project/{project_id}")]
async fn list_project_resources(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let project_id = path.into_inner();

    let listing = resource_service::list_project(state.get_ref(), &actor.sub, &project_id)?;

    info!(
        "✅ Found {} resources for project: {}",
        listing.resources.len(),
        project_id
    );

    Ok(HttpResponse::Ok().json(listing))
}

// Dashboard aggregate across every scope the caller belongs to
#[get("/resources")]
async fn list_all_resources(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;

    let overview = resource_service::list_all(state.get_ref(), &actor.sub)?;

    Ok(HttpResponse::Ok().json(overview))
}

// Issue a time-bounded download link for a resource the caller may read
#[get("/resources/{resource_id}/download-url")]
async fn resource_download_url(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let resource_id = path.into_inner();

    info!("🔗 Download URL request for resource: {} by user: {}", resource_id, actor.sub);

    let url = resource_service::issue_download_url(state.get_ref(), &actor.sub, &resource_id)?;

    Ok(HttpResponse::Ok().json(json!({ "url": url })))
}

// Delete a resource the caller uploaded
#[delete("/resources/{resource_id}")]
async fn delete_resource(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let resource_id = path.into_inner();

    info!("🗑️ Delete request for resource: {} by user: {}", resource_id, actor.sub);

    let outcome = resource_service::delete_resource(state.get_ref(), &actor.sub, &resource_id)?;

    let message = match outcome {
        DeleteOutcome::Deleted => "Resource deleted successfully",
        DeleteOutcome::AlreadyGone => "Resource already removed",
    };

    Ok(HttpResponse::Ok().json(json!({
        "message": message,
        "resource_id": resource_id
    })))
}

// Register all resource routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_resource)
        .service(list_personal_resources)
        .service(list_team_resources)
        .service(list_project_resources)
        .service(list_all_resources)
        .service(resource_download_url)
        .service(delete_resource);
}
