// mimir-service/src/store/mod.rs
use crate::models::{
    Project, ProjectMember, Resource, ResourceScope, ServiceError, Team, TeamMember, User,
};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

pub mod object_store;
pub use object_store::{build_storage_path, sanitize_file_name, FsObjectStore, ObjectStore, UrlSigner};

// Record store consumed by every service. Durable state lives behind this
// seam; handlers receive an injected handle instead of reaching for a global.
pub trait RecordStore: Send + Sync {
    // Users
    fn save_user(&self, user: &User) -> Result<(), ServiceError>;
    fn find_user_by_id(&self, id: &str) -> Result<Option<User>, ServiceError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    // Teams
    fn save_team(&self, team: &Team) -> Result<(), ServiceError>;
    fn find_team_by_id(&self, id: &str) -> Result<Option<Team>, ServiceError>;
    fn delete_team(&self, id: &str) -> Result<bool, ServiceError>;
    fn teams_for_user(&self, user_id: &str) -> Result<Vec<Team>, ServiceError>;

    // Team memberships: at most one row per (user, team) pair
    fn save_team_member(&self, member: &TeamMember) -> Result<(), ServiceError>;
    fn find_team_member(&self, team_id: &str, user_id: &str)
        -> Result<Option<TeamMember>, ServiceError>;
    fn team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, ServiceError>;
    fn team_memberships_for_user(&self, user_id: &str) -> Result<Vec<TeamMember>, ServiceError>;
    fn remove_team_member(&self, team_id: &str, user_id: &str) -> Result<bool, ServiceError>;

    // Projects
    fn save_project(&self, project: &Project) -> Result<(), ServiceError>;
    fn find_project_by_id(&self, id: &str) -> Result<Option<Project>, ServiceError>;
    fn delete_project(&self, id: &str) -> Result<bool, ServiceError>;
    fn projects_for_user(&self, user_id: &str) -> Result<Vec<Project>, ServiceError>;

    // Project memberships
    fn save_project_member(&self, member: &ProjectMember) -> Result<(), ServiceError>;
    fn find_project_member(&self, project_id: &str, user_id: &str)
        -> Result<Option<ProjectMember>, ServiceError>;
    fn project_members(&self, project_id: &str) -> Result<Vec<ProjectMember>, ServiceError>;
    fn project_memberships_for_user(&self, user_id: &str)
        -> Result<Vec<ProjectMember>, ServiceError>;
    fn remove_project_member(&self, project_id: &str, user_id: &str)
        -> Result<bool, ServiceError>;

    // Resources
    fn insert_resource(&self, resource: &Resource) -> Result<(), ServiceError>;
    fn find_resource_by_id(&self, id: &str) -> Result<Option<Resource>, ServiceError>;
    fn find_resource_by_path(&self, storage_path: &str)
        -> Result<Option<Resource>, ServiceError>;
    fn delete_resource(&self, id: &str) -> Result<bool, ServiceError>;
    fn personal_resources(&self, user_id: &str) -> Result<Vec<Resource>, ServiceError>;
    fn scoped_resources(&self, scope: ResourceScope, scope_id: &str)
        -> Result<Vec<Resource>, ServiceError>;
}

// JSON-file backed record store. One file per row:
//   users/{id}.json
//   teams/{id}.json            team_members/{team_id}_{user_id}.json
//   projects/{id}.json         project_members/{project_id}_{user_id}.json
//   resources/{id}.json
// The membership file name encodes the (collective, user) pair, so the
// oracle's exact-pair lookup is a single file probe.
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FsRecordStore { root: root.into() }
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn row_path(&self, dir: &str, key: &str) -> PathBuf {
        self.dir(dir).join(format!("{}.json", key))
    }

    fn write_row<T: Serialize>(&self, dir: &str, key: &str, row: &T) -> Result<(), ServiceError> {
        let dir_path = self.dir(dir);
        if !dir_path.exists() {
            fs::create_dir_all(&dir_path).map_err(|e| {
                error!("Failed to create record directory {:?}: {:?}", dir_path, e);
                ServiceError::InternalServerError
            })?;
        }

        let json = serde_json::to_string_pretty(row).map_err(|e| {
            error!("Failed to serialize record: {:?}", e);
            ServiceError::InternalServerError
        })?;

        fs::write(self.row_path(dir, key), json).map_err(|e| {
            error!("Failed to write record {}/{}: {:?}", dir, key, e);
            ServiceError::InternalServerError
        })
    }

    fn read_row<T: DeserializeOwned>(&self, dir: &str, key: &str)
        -> Result<Option<T>, ServiceError>
    {
        let path = self.row_path(dir, key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read record {}/{}: {:?}", dir, key, e);
            ServiceError::InternalServerError
        })?;

        let row: T = serde_json::from_str(&content).map_err(|e| {
            error!("Failed to parse record {}/{}: {:?}", dir, key, e);
            ServiceError::InternalServerError
        })?;

        Ok(Some(row))
    }

    fn delete_row(&self, dir: &str, key: &str) -> Result<bool, ServiceError> {
        let path = self.row_path(dir, key);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).map_err(|e| {
            error!("Failed to delete record {}/{}: {:?}", dir, key, e);
            ServiceError::InternalServerError
        })?;

        Ok(true)
    }

    // Scan every row in a directory, skipping files that fail to parse
    fn scan_rows<T: DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>, ServiceError> {
        let dir_path = self.dir(dir);
        if !dir_path.exists() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        for entry_result in fs::read_dir(&dir_path).map_err(|e| {
            error!("Failed to read record directory {:?}: {:?}", dir_path, e);
            ServiceError::InternalServerError
        })? {
            let entry = entry_result.map_err(|e| {
                error!("Failed to read directory entry: {:?}", e);
                ServiceError::InternalServerError
            })?;

            let path = entry.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path).map_err(|e| {
                    error!("Failed to read record file {:?}: {:?}", path, e);
                    ServiceError::InternalServerError
                })?;

                match serde_json::from_str::<T>(&content) {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        warn!("Skipping unparsable record {:?}: {:?}", path, e);
                        continue;
                    }
                }
            }
        }

        Ok(rows)
    }
}

fn pair_key(collective_id: &str, user_id: &str) -> String {
    format!("{}_{}", collective_id, user_id)
}

impl RecordStore for FsRecordStore {
    fn save_user(&self, user: &User) -> Result<(), ServiceError> {
        self.write_row("users", &user.id, user)
    }

    fn find_user_by_id(&self, id: &str) -> Result<Option<User>, ServiceError> {
        self.read_row("users", id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let users: Vec<User> = self.scan_rows("users")?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    fn save_team(&self, team: &Team) -> Result<(), ServiceError> {
        self.write_row("teams", &team.id, team)
    }

    fn find_team_by_id(&self, id: &str) -> Result<Option<Team>, ServiceError> {
        self.read_row("teams", id)
    }

    fn delete_team(&self, id: &str) -> Result<bool, ServiceError> {
        let deleted = self.delete_row("teams", id)?;
        if deleted {
            info!("Deleted team record: {}", id);
        }
        Ok(deleted)
    }

    fn teams_for_user(&self, user_id: &str) -> Result<Vec<Team>, ServiceError> {
        let mut teams = Vec::new();
        for membership in self.team_memberships_for_user(user_id)? {
            if let Some(team) = self.find_team_by_id(&membership.team_id)? {
                teams.push(team);
            }
        }
        Ok(teams)
    }

    fn save_team_member(&self, member: &TeamMember) -> Result<(), ServiceError> {
        self.write_row("team_members", &pair_key(&member.team_id, &member.user_id), member)
    }

    fn find_team_member(&self, team_id: &str, user_id: &str)
        -> Result<Option<TeamMember>, ServiceError>
    {
        self.read_row("team_members", &pair_key(team_id, user_id))
    }

    fn team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, ServiceError> {
        let members: Vec<TeamMember> = self.scan_rows("team_members")?;
        Ok(members.into_iter().filter(|m| m.team_id == team_id).collect())
    }

    fn team_memberships_for_user(&self, user_id: &str) -> Result<Vec<TeamMember>, ServiceError> {
        let members: Vec<TeamMember> = self.scan_rows("team_members")?;
        Ok(members.into_iter().filter(|m| m.user_id == user_id).collect())
    }

    fn remove_team_member(&self, team_id: &str, user_id: &str) -> Result<bool, ServiceError> {
        self.delete_row("team_members", &pair_key(team_id, user_id))
    }

    fn save_project(&self, project: &Project) -> Result<(), ServiceError> {
        self.write_row("projects", &project.id, project)
    }

    fn find_project_by_id(&self, id: &str) -> Result<Option<Project>, ServiceError> {
        self.read_row("projects", id)
    }

    fn delete_project(&self, id: &str) -> Result<bool, ServiceError> {
        let deleted = self.delete_row("projects", id)?;
        if deleted {
            info!("Deleted project record: {}", id);
        }
        Ok(deleted)
    }

    fn projects_for_user(&self, user_id: &str) -> Result<Vec<Project>, ServiceError> {
        let mut projects = Vec::new();
        for membership in self.project_memberships_for_user(user_id)? {
            if let Some(project) = self.find_project_by_id(&membership.project_id)? {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    fn save_project_member(&self, member: &ProjectMember) -> Result<(), ServiceError> {
        self.write_row(
            "project_members",
            &pair_key(&member.project_id, &member.user_id),
            member,
        )
    }

    fn find_project_member(&self, project_id: &str, user_id: &str)
        -> Result<Option<ProjectMember>, ServiceError>
    {
        self.read_row("project_members", &pair_key(project_id, user_id))
    }

    fn project_members(&self, project_id: &str) -> Result<Vec<ProjectMember>, ServiceError> {
        let members: Vec<ProjectMember> = self.scan_rows("project_members")?;
        Ok(members.into_iter().filter(|m| m.project_id == project_id).collect())
    }

    fn project_memberships_for_user(&self, user_id: &str)
        -> Result<Vec<ProjectMember>, ServiceError>
    {
        let members: Vec<ProjectMember> = self.scan_rows("project_members")?;
        Ok(members.into_iter().filter(|m| m.user_id == user_id).collect())
    }

    fn remove_project_member(&self, project_id: &str, user_id: &str)
        -> Result<bool, ServiceError>
    {
        self.delete_row("project_members", &pair_key(project_id, user_id))
    }

    fn insert_resource(&self, resource: &Resource) -> Result<(), ServiceError> {
        if self.row_path("resources", &resource.id).exists() {
            return Err(ServiceError::Conflict(format!(
                "Resource already exists: {}",
                resource.id
            )));
        }
        self.write_row("resources", &resource.id, resource)
    }

    fn find_resource_by_id(&self, id: &str) -> Result<Option<Resource>, ServiceError> {
        self.read_row("resources", id)
    }

    fn find_resource_by_path(&self, storage_path: &str)
        -> Result<Option<Resource>, ServiceError>
    {
        let resources: Vec<Resource> = self.scan_rows("resources")?;
        Ok(resources.into_iter().find(|r| r.storage_path == storage_path))
    }

    fn delete_resource(&self, id: &str) -> Result<bool, ServiceError> {
        self.delete_row("resources", id)
    }

    fn personal_resources(&self, user_id: &str) -> Result<Vec<Resource>, ServiceError> {
        let resources: Vec<Resource> = self.scan_rows("resources")?;
        let mut matching: Vec<Resource> = resources
            .into_iter()
            .filter(|r| {
                r.scope == ResourceScope::Personal
                    && r.uploaded_by.as_deref() == Some(user_id)
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    fn scoped_resources(&self, scope: ResourceScope, scope_id: &str)
        -> Result<Vec<Resource>, ServiceError>
    {
        let resources: Vec<Resource> = self.scan_rows("resources")?;
        let mut matching: Vec<Resource> = resources
            .into_iter()
            .filter(|r| r.scope == scope && r.scope_id.as_deref() == Some(scope_id))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
