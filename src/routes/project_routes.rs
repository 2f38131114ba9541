// mimir-service/src/routes/project_routes.rs
use crate::models::{
    Project, ProjectData, ProjectMember, ProjectMemberData, ProjectRole, ProjectRoleUpdate,
    ResourceScope, ServiceError,
};
use crate::services::{authorization, resource_service, AppState};
use crate::store::RecordStore;
use crate::utils::identity;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use lazy_static::lazy_static;
use log::{error, info};
use regex::Regex;
use serde_json::json;
use uuid::Uuid;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(mut value: i64) -> String {
    if value <= 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

// URL-friendly project handle: slugified name plus a short time suffix so
// two projects with the same name stay distinguishable
fn make_slug(name: &str, now_ts: i64) -> String {
    let base = SLUG_RE
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string();
    let encoded = base36(now_ts);
    let suffix = &encoded[encoded.len().saturating_sub(4)..];
    format!("{}-{}", base, suffix)
}

// Create a new project, optionally under a team
#[post("/projects")]
async fn create_project(
    state: web::Data<AppState>,
    req: HttpRequest,
    project_data: web::Json<ProjectData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;

    info!("📝 Creating new project: {} for user: {}", project_data.name, actor.sub);

    let name = project_data.name.trim();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("A project name is required".to_string()));
    }

    // A team-bound project must name a real team the caller belongs to
    if let Some(team_id) = project_data.team_id.as_deref() {
        if state.records.find_team_by_id(team_id)?.is_none() {
            error!("❌ Team not found: {}", team_id);
            return Err(ServiceError::NotFound);
        }
        if authorization::team_role(state.records.as_ref(), &actor.sub, team_id)?.is_none() {
            return Err(ServiceError::Forbidden(
                "You are not a member of this team or project (not-a-member)".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        team_id: project_data.team_id.clone(),
        name: name.to_string(),
        slug: make_slug(name, now.timestamp()),
        owner_id: actor.sub.clone(),
        status: project_data.status.clone().unwrap_or_else(|| "planning".to_string()),
        priority: project_data.priority.clone().unwrap_or_else(|| "medium".to_string()),
        description: project_data.description.clone(),
        created_at: now,
    };

    state.records.save_project(&project)?;

    // The creator becomes the project's owner member
    let member = ProjectMember {
        user_id: actor.sub.clone(),
        project_id: project.id.clone(),
        role: ProjectRole::Owner,
        joined_at: now,
    };

    state.records.save_project_member(&member)?;

    info!("✅ Project created successfully: {}", project.id);

    Ok(HttpResponse::Ok().json(project))
}

// Get all projects for the current user
#[get("/projects")]
async fn get_user_projects(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;

    info!("📋 Fetching projects for user: {}", actor.sub);

    let projects = state.records.projects_for_user(&actor.sub)?;

    info!("✅ Found {} projects for user: {}", projects.len(), actor.sub);

    Ok(HttpResponse::Ok().json(projects))
}

// Get a specific project by ID
#[get("/projects/{project_id}")]
async fn get_project(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let project_id = path.into_inner();

    info!("🔍 Fetching project: {} for user: {}", project_id, actor.sub);

    if authorization::project_role(state.records.as_ref(), &actor.sub, &project_id)?.is_none() {
        error!("❌ User: {} doesn't have access to project: {}", actor.sub, project_id);
        return Err(ServiceError::Forbidden(
            "You are not a member of this team or project (not-a-member)".to_string(),
        ));
    }

    let project = match state.records.find_project_by_id(&project_id)? {
        Some(project) => project,
        None => {
            error!("❌ Project not found: {}", project_id);
            return Err(ServiceError::NotFound);
        }
    };

    info!("✅ Found project: {}", project_id);

    Ok(HttpResponse::Ok().json(project))
}

// Add a user to a project
#[post("/projects/{project_id}/members")]
async fn add_project_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<ProjectMemberData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let project_id = path.into_inner();

    info!("👥 Adding user: {} to project: {}", data.user_id, project_id);

    let caller_role =
        match authorization::project_role(state.records.as_ref(), &actor.sub, &project_id)? {
            Some(role) => role,
            None => {
                return Err(ServiceError::Forbidden(
                    "You are not a member of this team or project (not-a-member)".to_string(),
                ))
            }
        };

    if !caller_role.can_manage_members() {
        error!(
            "❌ User: {} doesn't have permission to add members to project: {}",
            actor.sub, project_id
        );
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    if data.role == ProjectRole::Owner && caller_role != ProjectRole::Owner {
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    if state.records.find_user_by_id(&data.user_id)?.is_none() {
        error!("❌ User not found: {}", data.user_id);
        return Err(ServiceError::NotFound);
    }

    if state.records.find_project_member(&project_id, &data.user_id)?.is_some() {
        return Err(ServiceError::Conflict("User is already a project member".to_string()));
    }

    let member = ProjectMember {
        user_id: data.user_id.clone(),
        project_id: project_id.clone(),
        role: data.role,
        joined_at: Utc::now(),
    };

    state.records.save_project_member(&member)?;

    info!(
        "✅ User: {} added to project: {} with role: {:?}",
        data.user_id, project_id, data.role
    );

    Ok(HttpResponse::Ok().json(member))
}

// Get project members
#[get("/projects/{project_id}/members")]
async fn get_project_members(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let project_id = path.into_inner();

    info!("📋 Fetching members for project: {}", project_id);

    if authorization::project_role(state.records.as_ref(), &actor.sub, &project_id)?.is_none() {
        error!("❌ User: {} doesn't have access to project: {}", actor.sub, project_id);
        return Err(ServiceError::Forbidden(
            "You are not a member of this team or project (not-a-member)".to_string(),
        ));
    }

    let members = state.records.project_members(&project_id)?;

    info!("✅ Found {} project members", members.len());

    Ok(HttpResponse::Ok().json(members))
}

// Update a project member's role
#[put("/projects/{project_id}/members/{user_id}")]
async fn update_project_member_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    data: web::Json<ProjectRoleUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let (project_id, target_user_id) = path.into_inner();

    info!("🔄 Updating role for user: {} in project: {}", target_user_id, project_id);

    let caller_role =
        authorization::project_role(state.records.as_ref(), &actor.sub, &project_id)?;
    if caller_role != Some(ProjectRole::Owner) {
        error!("❌ Only project owners can update member roles");
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    let project = match state.records.find_project_by_id(&project_id)? {
        Some(project) => project,
        None => {
            error!("❌ Project not found: {}", project_id);
            return Err(ServiceError::NotFound);
        }
    };

    if target_user_id == project.owner_id {
        return Err(ServiceError::BadRequest(
            "Cannot change the project owner's role".to_string(),
        ));
    }

    let mut member = match state.records.find_project_member(&project_id, &target_user_id)? {
        Some(member) => member,
        None => return Err(ServiceError::NotFound),
    };

    member.role = data.role;
    state.records.save_project_member(&member)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("User role updated to: {:?}", data.role),
        "user_id": target_user_id,
        "project_id": project_id,
        "role": data.role
    })))
}

// Remove a member from a project
#[delete("/projects/{project_id}/members/{user_id}")]
async fn remove_project_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let (project_id, target_user_id) = path.into_inner();

    info!("🗑️ Removing user: {} from project: {}", target_user_id, project_id);

    let project = match state.records.find_project_by_id(&project_id)? {
        Some(project) => project,
        None => {
            error!("❌ Project not found: {}", project_id);
            return Err(ServiceError::NotFound);
        }
    };

    if target_user_id == project.owner_id {
        return Err(ServiceError::BadRequest(
            "Cannot remove the project owner from the project".to_string(),
        ));
    }

    let is_self_removal = actor.sub == target_user_id;
    let is_owner = authorization::project_role(state.records.as_ref(), &actor.sub, &project_id)?
        == Some(ProjectRole::Owner);

    if !is_self_removal && !is_owner {
        error!("❌ Only project owners can remove other members");
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    if !state.records.remove_project_member(&project_id, &target_user_id)? {
        return Err(ServiceError::NotFound);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User removed from project successfully",
        "user_id": target_user_id,
        "project_id": project_id
    })))
}

// Delete a project and everything scoped to it
#[delete("/projects/{project_id}")]
async fn delete_project(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let project_id = path.into_inner();

    info!("🗑️ Deleting project: {}", project_id);

    let project = match state.records.find_project_by_id(&project_id)? {
        Some(project) => project,
        None => {
            error!("❌ Project not found: {}", project_id);
            return Err(ServiceError::NotFound);
        }
    };

    if project.owner_id != actor.sub {
        error!("❌ Only the project owner can delete the project");
        return Err(ServiceError::Forbidden(
            "Only the project owner can delete the project".to_string(),
        ));
    }

    for member in state.records.project_members(&project_id)? {
        state.records.remove_project_member(&project_id, &member.user_id)?;
    }

    resource_service::delete_collective_resources(
        state.get_ref(),
        ResourceScope::Project,
        &project_id,
    )?;

    state.records.delete_project(&project_id)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Project deleted successfully",
        "project_id": project_id
    })))
}

// Register all project routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_project)
        .service(get_user_projects)
        .service(get_project)
        .service(add_project_member)
        .service(get_project_members)
        .service(update_project_member_role)
        .service(remove_project_member)
        .service(delete_project);
}

#[cfg(test)]
mod tests {
    use super::make_slug;

    #[test]
    fn slug_is_lowercase_with_suffix() {
        let slug = make_slug("Q3 Launch Plan", 1700000000);
        assert!(slug.starts_with("q3-launch-plan-"));
        assert_eq!(slug.rsplit('-').next().unwrap().len(), 4);
    }

    #[test]
    fn slug_strips_leading_and_trailing_dashes() {
        let slug = make_slug("  (Internal) ", 1700000000);
        assert!(!slug.starts_with('-'));
        assert!(slug.contains("internal"));
    }
}
