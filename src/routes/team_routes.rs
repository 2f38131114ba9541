// mimir-service/src/routes/team_routes.rs
use crate::models::{
    ResourceScope, ServiceError, Team, TeamData, TeamMember, TeamMemberData, TeamRole,
    TeamRoleUpdate,
};
use crate::services::{authorization, resource_service, AppState};
use crate::store::RecordStore;
use crate::utils::identity;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{error, info};
use serde_json::json;
use uuid::Uuid;

// Create a new team
#[post("/teams")]
async fn create_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    team_data: web::Json<TeamData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;

    info!("📝 Creating new team: {} for user: {}", team_data.name, actor.sub);

    // Create a new team with the user as owner
    let team_id = Uuid::new_v4().to_string();
    let team = Team {
        id: team_id.clone(),
        name: team_data.name.clone(),
        owner_id: actor.sub.clone(),
        created_at: Utc::now(),
    };

    // Save the team
    state.records.save_team(&team)?;

    // Add user as team owner; every collective keeps an owner membership
    let team_member = TeamMember {
        user_id: actor.sub.clone(),
        team_id: team_id.clone(),
        role: TeamRole::Owner,
        joined_at: Utc::now(),
    };

    state.records.save_team_member(&team_member)?;

    info!("✅ Team created successfully: {}", team_id);

    Ok(HttpResponse::Ok().json(team))
}

// Get all teams for the current user
#[get("/teams")]
async fn get_user_teams(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;

    info!("📋 Fetching teams for user: {}", actor.sub);

    let teams = state.records.teams_for_user(&actor.sub)?;

    info!("✅ Found {} teams for user: {}", teams.len(), actor.sub);

    Ok(HttpResponse::Ok().json(teams))
}

// Get a specific team by ID
#[get("/teams/{team_id}")]
async fn get_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let team_id = path.into_inner();

    info!("🔍 Fetching team: {} for user: {}", team_id, actor.sub);

    // Membership gates team visibility
    if authorization::team_role(state.records.as_ref(), &actor.sub, &team_id)?.is_none() {
        error!("❌ User: {} doesn't have access to team: {}", actor.sub, team_id);
        return Err(ServiceError::Forbidden(
            "You are not a member of this team or project (not-a-member)".to_string(),
        ));
    }

    // Get team details
    let team = match state.records.find_team_by_id(&team_id)? {
        Some(team) => team,
        None => {
            error!("❌ Team not found: {}", team_id);
            return Err(ServiceError::NotFound);
        }
    };

    info!("✅ Found team: {}", team_id);

    Ok(HttpResponse::Ok().json(team))
}

// Add a user to a team
#[post("/teams/{team_id}/members")]
async fn add_team_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<TeamMemberData>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let team_id = path.into_inner();

    info!("👥 Adding user: {} to team: {}", data.user_id, team_id);

    // Check the caller's standing in the team
    let caller_role = match authorization::team_role(state.records.as_ref(), &actor.sub, &team_id)? {
        Some(role) => role,
        None => {
            return Err(ServiceError::Forbidden(
                "You are not a member of this team or project (not-a-member)".to_string(),
            ))
        }
    };

    if !caller_role.can_manage_members() {
        error!(
            "❌ User: {} doesn't have permission to add members to team: {}",
            actor.sub, team_id
        );
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    // Granting owner standing is reserved for the owner
    if data.role == TeamRole::Owner && caller_role != TeamRole::Owner {
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    // The target must be a known user
    if state.records.find_user_by_id(&data.user_id)?.is_none() {
        error!("❌ User not found: {}", data.user_id);
        return Err(ServiceError::NotFound);
    }

    // At most one membership row per (user, team) pair
    if state.records.find_team_member(&team_id, &data.user_id)?.is_some() {
        return Err(ServiceError::Conflict("User is already a team member".to_string()));
    }

    let team_member = TeamMember {
        user_id: data.user_id.clone(),
        team_id: team_id.clone(),
        role: data.role,
        joined_at: Utc::now(),
    };

    state.records.save_team_member(&team_member)?;

    info!(
        "✅ User: {} added to team: {} with role: {:?}",
        data.user_id, team_id, data.role
    );

    Ok(HttpResponse::Ok().json(team_member))
}

// Get team members
#[get("/teams/{team_id}/members")]
async fn get_team_members(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let team_id = path.into_inner();

    info!("📋 Fetching members for team: {}", team_id);

    if authorization::team_role(state.records.as_ref(), &actor.sub, &team_id)?.is_none() {
        error!("❌ User: {} doesn't have access to team: {}", actor.sub, team_id);
        return Err(ServiceError::Forbidden(
            "You are not a member of this team or project (not-a-member)".to_string(),
        ));
    }

    let members = state.records.team_members(&team_id)?;

    info!("✅ Found {} team members", members.len());

    Ok(HttpResponse::Ok().json(members))
}

// Update a team member's role
#[put("/teams/{team_id}/members/{user_id}")]
async fn update_team_member_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    data: web::Json<TeamRoleUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let (team_id, target_user_id) = path.into_inner();

    info!("🔄 Updating role for user: {} in team: {}", target_user_id, team_id);

    // Only the owner hands out roles
    let caller_role = authorization::team_role(state.records.as_ref(), &actor.sub, &team_id)?;
    if caller_role != Some(TeamRole::Owner) {
        error!("❌ Only team owners can update member roles");
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    let team = match state.records.find_team_by_id(&team_id)? {
        Some(team) => team,
        None => {
            error!("❌ Team not found: {}", team_id);
            return Err(ServiceError::NotFound);
        }
    };

    // The owner's own row is immutable
    if target_user_id == team.owner_id {
        return Err(ServiceError::BadRequest(
            "Cannot change the team owner's role".to_string(),
        ));
    }

    let mut member = match state.records.find_team_member(&team_id, &target_user_id)? {
        Some(member) => member,
        None => return Err(ServiceError::NotFound),
    };

    member.role = data.role;
    state.records.save_team_member(&member)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("User role updated to: {:?}", data.role),
        "user_id": target_user_id,
        "team_id": team_id,
        "role": data.role
    })))
}

// Remove a member from a team
#[delete("/teams/{team_id}/members/{user_id}")]
async fn remove_team_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let (team_id, target_user_id) = path.into_inner();

    info!("🗑️ Removing user: {} from team: {}", target_user_id, team_id);

    let team = match state.records.find_team_by_id(&team_id)? {
        Some(team) => team,
        None => {
            error!("❌ Team not found: {}", team_id);
            return Err(ServiceError::NotFound);
        }
    };

    // Cannot remove team owner
    if target_user_id == team.owner_id {
        return Err(ServiceError::BadRequest(
            "Cannot remove the team owner from the team".to_string(),
        ));
    }

    // Users can remove themselves, or owners can remove anyone
    let is_self_removal = actor.sub == target_user_id;
    let is_owner = authorization::team_role(state.records.as_ref(), &actor.sub, &team_id)?
        == Some(TeamRole::Owner);

    if !is_self_removal && !is_owner {
        error!("❌ Only team owners can remove other members");
        return Err(ServiceError::Forbidden(
            "Your role does not permit this operation (insufficient-role)".to_string(),
        ));
    }

    if !state.records.remove_team_member(&team_id, &target_user_id)? {
        return Err(ServiceError::NotFound);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User removed from team successfully",
        "user_id": target_user_id,
        "team_id": team_id
    })))
}

// Delete a team and everything scoped to it
#[delete("/teams/{team_id}")]
async fn delete_team(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let actor = identity::require_actor(&req)?;
    let team_id = path.into_inner();

    info!("🗑️ Deleting team: {}", team_id);

    let team = match state.records.find_team_by_id(&team_id)? {
        Some(team) => team,
        None => {
            error!("❌ Team not found: {}", team_id);
            return Err(ServiceError::NotFound);
        }
    };

    // Only the team owner can delete a team
    if team.owner_id != actor.sub {
        error!("❌ Only the team owner can delete the team");
        return Err(ServiceError::Forbidden(
            "Only the team owner can delete the team".to_string(),
        ));
    }

    // Delete all team members
    for member in state.records.team_members(&team_id)? {
        state.records.remove_team_member(&team_id, &member.user_id)?;
    }

    // Delete all team-scoped resources with their storage objects
    resource_service::delete_collective_resources(state.get_ref(), ResourceScope::Team, &team_id)?;

    // Delete the team
    state.records.delete_team(&team_id)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Team deleted successfully",
        "team_id": team_id
    })))
}

// Register all team routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_team)
        .service(get_user_teams)
        .service(get_team)
        .service(add_team_member)
        .service(get_team_members)
        .service(update_team_member_role)
        .service(remove_team_member)
        .service(delete_team);
}
