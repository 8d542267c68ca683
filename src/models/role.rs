//! Role and permission domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Role codes carried in access tokens and stored in `role_permission_xref.role`
pub mod role_codes {
    pub const SUPER_ADMIN: &str = "superadmin";
    pub const GYM_ADMIN: &str = "admin";
    pub const TRAINER: &str = "trainer";
    pub const CLIENT: &str = "client";

    pub const ALL: [&str; 4] = [SUPER_ADMIN, GYM_ADMIN, TRAINER, CLIENT];
}

/// Whether a role or permission applies platform-wide or within one gym
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleLevel {
    System,
    Gym,
}

impl RoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleLevel::System => "system",
            RoleLevel::Gym => "gym",
        }
    }
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub label: String,
    pub level: RoleLevel,
    pub sort_order: i32,
    pub is_system: bool,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub archived_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Permission
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: i32,
    pub key: String,
    pub level: RoleLevel,
    pub description: Option<String>,
}

/// Role code <-> permission association row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RolePermissionXref {
    pub id: i32,
    pub role: String,
    pub permission_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Create role request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    /// System code, e.g. `FRONT_DESK`
    #[validate(length(min = 2, max = 64), custom(function = "validate_role_name"))]
    pub name: String,
    #[validate(length(min = 1, max = 128))]
    pub label: String,
    pub level: RoleLevel,
    #[serde(default)]
    pub sort_order: i32,
}

/// Update role request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 128))]
    pub label: Option<String>,
    pub sort_order: Option<i32>,
}

/// Role with its permissions
#[derive(Debug, Serialize)]
pub struct RoleDetail {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Outcome of assigning a permission to a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOutcome {
    Assigned,
    AlreadyAssigned,
}

/// Rows inserted by one default seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub lookup_types: u64,
    pub lookups: u64,
    pub roles: u64,
    pub permissions: u64,
    pub role_permissions: u64,
}

impl SeedReport {
    pub fn is_noop(&self) -> bool {
        *self == SeedReport::default()
    }
}

/// Upper-case letters, digits and underscores, starting with a letter
fn validate_role_name(name: &str) -> Result<(), validator::ValidationError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    let rest_ok = chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');

    if starts_with_letter && rest_ok {
        Ok(())
    } else {
        Err(validator::ValidationError::new("role_name_format"))
    }
}

/// The role code a role's system name maps to (`GYM_ADMIN` -> `admin`)
pub fn code_for_role_name(name: &str) -> String {
    match name {
        "SUPER_ADMIN" => role_codes::SUPER_ADMIN.to_string(),
        "GYM_ADMIN" => role_codes::GYM_ADMIN.to_string(),
        other => other.to_lowercase(),
    }
}

/// The role system name a role code maps back to (`admin` -> `GYM_ADMIN`)
pub fn role_name_for_code(code: &str) -> String {
    match code {
        role_codes::SUPER_ADMIN => "SUPER_ADMIN".to_string(),
        role_codes::GYM_ADMIN => "GYM_ADMIN".to_string(),
        other => other.to_uppercase(),
    }
}
