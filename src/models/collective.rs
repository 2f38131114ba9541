// mimir-service/src/models/collective.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Team models
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

// Ordered low-to-high so tier checks can compare roles directly
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Member = 0,
    Admin = 1,
    Owner = 2,
}

impl TeamRole {
    // Uploading shared team content is reserved for the elevated tiers
    pub fn can_upload(&self) -> bool {
        matches!(self, TeamRole::Owner | TeamRole::Admin)
    }

    pub fn can_manage_members(&self) -> bool {
        *self >= TeamRole::Admin
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamMember {
    pub user_id: String,
    pub team_id: String,
    pub role: TeamRole,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TeamData {
    pub name: String,
}

// Project models
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Project {
    pub id: String,
    pub team_id: Option<String>, // None for personal projects
    pub name: String,
    pub slug: String,
    pub owner_id: String,
    pub status: String,
    pub priority: String,
    pub description: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Viewer = 0,
    Contributor = 1,
    Manager = 2,
    Owner = 3,
}

impl ProjectRole {
    pub fn can_upload(&self) -> bool {
        matches!(self, ProjectRole::Owner | ProjectRole::Manager)
    }

    pub fn can_manage_members(&self) -> bool {
        *self >= ProjectRole::Manager
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectMember {
    pub user_id: String,
    pub project_id: String,
    pub role: ProjectRole,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectData {
    pub name: String,
    pub team_id: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub description: Option<String>,
}

// Request body for adding a collective member
#[derive(Serialize, Deserialize, Debug)]
pub struct TeamMemberData {
    pub user_id: String,
    pub role: TeamRole,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectMemberData {
    pub user_id: String,
    pub role: ProjectRole,
}

// Request body for changing an existing member's role
#[derive(Serialize, Deserialize, Debug)]
pub struct TeamRoleUpdate {
    pub role: TeamRole,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectRoleUpdate {
    pub role: ProjectRole,
}
