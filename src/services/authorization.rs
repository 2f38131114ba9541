// mimir-service/src/services/authorization.rs
//
// Membership oracle and scope authorization policy. The policy is a pure
// decision function per request; it holds no state of its own and never
// caches a decision across requests.

use crate::models::{ProjectRole, Resource, ResourceScope, ServiceError, TeamRole};
use crate::store::RecordStore;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Read,
    Upload,
    Delete,
}

// Denial is an expected, frequent outcome, carried as a value with a reason
// tag rather than raised as a fault
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DenyReason {
    Unauthenticated,
    NotAMember,
    InsufficientRole,
    NotOwner,
    IntegrityViolation,
}

impl DenyReason {
    pub fn as_tag(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::NotAMember => "not-a-member",
            DenyReason::InsufficientRole => "insufficient-role",
            DenyReason::NotOwner => "not-owner",
            DenyReason::IntegrityViolation => "integrity-violation",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "No authenticated user",
            DenyReason::NotAMember => "You are not a member of this team or project",
            DenyReason::InsufficientRole => "Your role does not permit this operation",
            DenyReason::NotOwner => "Only the uploader may perform this operation",
            DenyReason::IntegrityViolation => "Resource record is inconsistent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    // Route-boundary conversion: a deny becomes a Forbidden response
    pub fn require(self) -> Result<(), ServiceError> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(DenyReason::Unauthenticated) => Err(ServiceError::Unauthorized),
            AccessDecision::Deny(reason) => Err(ServiceError::Forbidden(format!(
                "{} ({})",
                reason.message(),
                reason.as_tag()
            ))),
        }
    }
}

// Membership oracle: exact (actor, collective) row lookup. None is a valid
// negative answer, not an error, and never implies public access.
pub fn team_role(
    records: &dyn RecordStore,
    user_id: &str,
    team_id: &str,
) -> Result<Option<TeamRole>, ServiceError> {
    Ok(records.find_team_member(team_id, user_id)?.map(|m| m.role))
}

pub fn project_role(
    records: &dyn RecordStore,
    user_id: &str,
    project_id: &str,
) -> Result<Option<ProjectRole>, ServiceError> {
    Ok(records.find_project_member(project_id, user_id)?.map(|m| m.role))
}

// Authorize an operation against a loaded resource record.
//
// Upload rights follow the privilege tier of the target scope; delete rights
// follow strict uploader ownership. The two axes are deliberately kept apart.
pub fn authorize(
    records: &dyn RecordStore,
    actor_id: Option<&str>,
    resource: &Resource,
    operation: Operation,
) -> Result<AccessDecision, ServiceError> {
    let actor_id = match actor_id {
        Some(id) => id,
        None => return Ok(AccessDecision::Deny(DenyReason::Unauthenticated)),
    };

    // A record without an uploader should not exist; refuse it loudly rather
    // than letting it fall through an ownership comparison
    let uploaded_by = match resource.uploaded_by.as_deref() {
        Some(id) => id,
        None => {
            warn!(
                "⚠️ Integrity violation: resource {} has no uploader",
                resource.id
            );
            return Ok(AccessDecision::Deny(DenyReason::IntegrityViolation));
        }
    };

    if operation == Operation::Upload {
        return authorize_upload(records, Some(actor_id), resource.scope, resource.scope_id.as_deref());
    }

    // Delete never depends on role, only on who uploaded the resource
    if operation == Operation::Delete {
        return Ok(if uploaded_by == actor_id {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(DenyReason::NotOwner)
        });
    }

    match resource.scope {
        ResourceScope::Personal => Ok(if uploaded_by == actor_id {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(DenyReason::NotOwner)
        }),
        ResourceScope::Team => {
            let team_id = match resource.scope_id.as_deref() {
                Some(id) => id,
                None => {
                    warn!(
                        "⚠️ Integrity violation: team resource {} has no team id",
                        resource.id
                    );
                    return Ok(AccessDecision::Deny(DenyReason::IntegrityViolation));
                }
            };

            Ok(match team_role(records, actor_id, team_id)? {
                None => AccessDecision::Deny(DenyReason::NotAMember),
                Some(_) if resource.is_public => AccessDecision::Allow,
                // Members cannot read resources that were never shared
                Some(_) => AccessDecision::Deny(DenyReason::NotOwner),
            })
        }
        ResourceScope::Project => {
            let project_id = match resource.scope_id.as_deref() {
                Some(id) => id,
                None => {
                    warn!(
                        "⚠️ Integrity violation: project resource {} has no project id",
                        resource.id
                    );
                    return Ok(AccessDecision::Deny(DenyReason::IntegrityViolation));
                }
            };

            Ok(match project_role(records, actor_id, project_id)? {
                None => AccessDecision::Deny(DenyReason::NotAMember),
                Some(_) if resource.is_public => AccessDecision::Allow,
                Some(_) => AccessDecision::Deny(DenyReason::NotOwner),
            })
        }
    }
}

// Authorize an upload before any record exists: the descriptor names the
// target scope, and the actor's role tier in that scope decides.
pub fn authorize_upload(
    records: &dyn RecordStore,
    actor_id: Option<&str>,
    scope: ResourceScope,
    scope_id: Option<&str>,
) -> Result<AccessDecision, ServiceError> {
    let actor_id = match actor_id {
        Some(id) => id,
        None => return Ok(AccessDecision::Deny(DenyReason::Unauthenticated)),
    };

    match scope {
        // Anyone may upload into their own personal scope
        ResourceScope::Personal => Ok(AccessDecision::Allow),
        ResourceScope::Team => {
            let team_id = match scope_id {
                Some(id) => id,
                None => return Ok(AccessDecision::Deny(DenyReason::NotAMember)),
            };

            Ok(match team_role(records, actor_id, team_id)? {
                None => AccessDecision::Deny(DenyReason::NotAMember),
                Some(role) if role.can_upload() => AccessDecision::Allow,
                Some(_) => AccessDecision::Deny(DenyReason::InsufficientRole),
            })
        }
        ResourceScope::Project => {
            let project_id = match scope_id {
                Some(id) => id,
                None => return Ok(AccessDecision::Deny(DenyReason::NotAMember)),
            };

            Ok(match project_role(records, actor_id, project_id)? {
                None => AccessDecision::Deny(DenyReason::NotAMember),
                Some(role) if role.can_upload() => AccessDecision::Allow,
                Some(_) => AccessDecision::Deny(DenyReason::InsufficientRole),
            })
        }
    }
}
