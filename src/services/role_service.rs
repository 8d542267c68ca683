//! 角色与权限管理服务

use crate::{
    error::AppError,
    models::{
        lookup::USER_ROLE,
        role::*,
    },
    repository::{LookupRepository, RoleRepository},
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// 内置角色：(name, label, level, sort_order, role code)
pub const DEFAULT_ROLES: [(&str, &str, RoleLevel, i32, &str); 4] = [
    ("SUPER_ADMIN", "Super Admin", RoleLevel::System, 0, role_codes::SUPER_ADMIN),
    ("GYM_ADMIN", "Gym Admin", RoleLevel::Gym, 10, role_codes::GYM_ADMIN),
    ("TRAINER", "Trainer", RoleLevel::Gym, 20, role_codes::TRAINER),
    ("CLIENT", "Client", RoleLevel::Gym, 30, role_codes::CLIENT),
];

/// 内置权限：(key, level, description)
pub const DEFAULT_PERMISSIONS: [(&str, RoleLevel, &str); 12] = [
    ("roles.manage", RoleLevel::System, "Manage roles and permissions"),
    ("gyms.manage", RoleLevel::System, "Create and configure gyms"),
    ("reports.platform", RoleLevel::System, "View cross-gym reports"),
    ("members.read", RoleLevel::Gym, "View gym members"),
    ("members.write", RoleLevel::Gym, "Manage gym members"),
    ("trainers.read", RoleLevel::Gym, "View trainers"),
    ("trainers.write", RoleLevel::Gym, "Manage trainers"),
    ("attendance.read", RoleLevel::Gym, "View attendance"),
    ("attendance.write", RoleLevel::Gym, "Record attendance"),
    ("notifications.read", RoleLevel::Gym, "Read notifications"),
    ("notifications.write", RoleLevel::Gym, "Send notifications"),
    ("reports.read", RoleLevel::Gym, "View gym reports"),
];

/// 内置授权：(role code, permission keys)
pub const DEFAULT_GRANTS: [(&str, &[&str]); 4] = [
    (role_codes::SUPER_ADMIN, &["roles.manage", "gyms.manage", "reports.platform"]),
    (
        role_codes::GYM_ADMIN,
        &[
            "members.read",
            "members.write",
            "trainers.read",
            "trainers.write",
            "attendance.read",
            "attendance.write",
            "notifications.read",
            "notifications.write",
            "reports.read",
        ],
    ),
    (
        role_codes::TRAINER,
        &["members.read", "trainers.read", "attendance.read", "attendance.write", "notifications.read"],
    ),
    (role_codes::CLIENT, &["attendance.read", "notifications.read"]),
];

pub struct RoleService {
    db: PgPool,
}

impl RoleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn repo(&self) -> RoleRepository {
        RoleRepository::new(self.db.clone())
    }

    pub async fn list(&self, include_archived: bool) -> Result<Vec<Role>, AppError> {
        self.repo().list(include_archived).await
    }

    async fn find(&self, id: i32) -> Result<Role, AppError> {
        self.repo()
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Role not found"))
    }

    pub async fn get(&self, id: i32) -> Result<RoleDetail, AppError> {
        let role = self.find(id).await?;
        let permissions = self.repo().permissions_for_role(&code_for_role_name(&role.name)).await?;
        Ok(RoleDetail { role, permissions })
    }

    /// 创建角色，并在 USER_ROLE 词表中登记其角色代码
    pub async fn create(&self, req: CreateRoleRequest, actor: Uuid) -> Result<Role, AppError> {
        req.validate()?;

        if let Some(existing) = self
            .repo()
            .find_conflicting(Some(&req.name), Some(&req.label), None)
            .await?
        {
            return Err(uniqueness_conflict(&existing, &req.name));
        }

        let mut tx = self.db.begin().await?;
        let role = RoleRepository::create(&mut *tx, &req, actor)
            .await
            .map_err(|e| map_unique_violation(e, "Role name or label already exists"))?;

        if let Some(lookup_type) = LookupRepository::find_type(&mut *tx, USER_ROLE).await? {
            let code = code_for_role_name(&role.name);
            LookupRepository::insert_value(
                &mut *tx,
                lookup_type.id,
                &role.name,
                &role.label,
                &code,
                role.sort_order,
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(role_id = role.id, name = %role.name, actor = %actor, "Role created");
        Ok(role)
    }

    pub async fn update(&self, id: i32, req: UpdateRoleRequest, actor: Uuid) -> Result<Role, AppError> {
        req.validate()?;

        let role = self.find(id).await?;
        if role.is_archived {
            return Err(AppError::bad_request("Archived roles cannot be updated"));
        }

        if let Some(label) = req.label.as_deref() {
            if let Some(existing) = self.repo().find_conflicting(None, Some(label), Some(id)).await? {
                return Err(uniqueness_conflict(&existing, ""));
            }
        }

        self.repo()
            .update(id, &req, actor)
            .await
            .map_err(|e| map_unique_violation(e, "Role label already exists"))?
            .ok_or_else(|| AppError::not_found("Role not found"))
    }

    /// 软归档；已归档时直接返回
    pub async fn archive(&self, id: i32, actor: Uuid) -> Result<Role, AppError> {
        let role = self.find(id).await?;
        ensure_removable(&role)?;

        if role.is_archived {
            return Ok(role);
        }

        match self.repo().archive(id, actor).await? {
            Some(archived) => {
                tracing::info!(role_id = id, actor = %actor, "Role archived");
                Ok(archived)
            }
            // 并发归档
            None => self.find(id).await,
        }
    }

    /// 物理删除非系统角色及其权限关联和词表取值
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let role = self.find(id).await?;
        ensure_removable(&role)?;

        let code = code_for_role_name(&role.name);
        let mut tx = self.db.begin().await?;
        let removed = RoleRepository::remove_all_permissions(&mut *tx, &code).await?;
        if let Some(lookup_type) = LookupRepository::find_type(&mut *tx, USER_ROLE).await? {
            LookupRepository::delete_value(&mut *tx, lookup_type.id, &code).await?;
        }
        if !RoleRepository::delete(&mut *tx, id).await? {
            return Err(AppError::not_found("Role not found"));
        }
        tx.commit().await?;

        tracing::info!(role_id = id, xref_removed = removed, "Role deleted");
        Ok(())
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo().list_permissions().await
    }

    pub async fn permissions_for_role(&self, id: i32) -> Result<Vec<Permission>, AppError> {
        let role = self.find(id).await?;
        self.repo().permissions_for_role(&code_for_role_name(&role.name)).await
    }

    /// 幂等：重复分配返回 `AlreadyAssigned`
    pub async fn assign_permission(
        &self,
        role_id: i32,
        permission_id: i32,
    ) -> Result<AssignOutcome, AppError> {
        let role = self.find(role_id).await?;
        let permission = self
            .repo()
            .find_permission(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found("Permission not found"))?;

        ensure_assignable(&role, &permission)?;

        let code = code_for_role_name(&role.name);
        let inserted = RoleRepository::add_permission_to_role(&self.db, &code, permission.id).await?;

        tracing::info!(role = %code, permission = %permission.key, inserted, "Permission assigned");
        Ok(if inserted {
            AssignOutcome::Assigned
        } else {
            AssignOutcome::AlreadyAssigned
        })
    }

    /// 幂等：未分配时返回 false
    pub async fn revoke_permission(&self, role_id: i32, permission_id: i32) -> Result<bool, AppError> {
        let role = self.find(role_id).await?;
        self.repo()
            .remove_permission_from_role(&code_for_role_name(&role.name), permission_id)
            .await
    }

    pub async fn permission_keys_for_role_code(&self, role_code: &str) -> Result<Vec<String>, AppError> {
        let permissions = self.repo().permissions_for_role(role_code).await?;
        Ok(permissions.into_iter().map(|p| p.key).collect())
    }

    pub async fn role_has_permission(&self, role_code: &str, key: &str) -> Result<bool, AppError> {
        self.repo().role_has_permission(role_code, key).await
    }

    /// 写入内置角色、权限与授权；可重复执行
    pub async fn seed_defaults(&self, actor: Option<Uuid>) -> Result<SeedReport, AppError> {
        let mut report = SeedReport::default();
        let mut tx = self.db.begin().await?;

        if LookupRepository::insert_type(&mut *tx, USER_ROLE, "User role").await? {
            report.lookup_types += 1;
        }
        let lookup_type = LookupRepository::find_type(&mut *tx, USER_ROLE)
            .await?
            .ok_or_else(|| AppError::internal_error("USER_ROLE lookup type missing after insert"))?;

        for (name, label, level, sort_order, code) in DEFAULT_ROLES {
            if LookupRepository::insert_value(&mut *tx, lookup_type.id, name, label, code, sort_order)
                .await?
            {
                report.lookups += 1;
            }
            if RoleRepository::upsert_system_role(&mut *tx, name, label, level, sort_order, actor)
                .await
                .map_err(|e| map_unique_violation(e, "Role label already used by another role"))?
            {
                report.roles += 1;
            }
        }

        for (key, level, description) in DEFAULT_PERMISSIONS {
            if RoleRepository::insert_permission(&mut *tx, key, level, description).await? {
                report.permissions += 1;
            }
        }

        for (code, keys) in DEFAULT_GRANTS {
            for key in keys {
                if RoleRepository::grant_by_key(&mut *tx, code, key).await? {
                    report.role_permissions += 1;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            lookup_types = report.lookup_types,
            lookups = report.lookups,
            roles = report.roles,
            permissions = report.permissions,
            role_permissions = report.role_permissions,
            "Default roles seeded"
        );
        Ok(report)
    }
}

/// 系统角色不可归档或删除
pub fn ensure_removable(role: &Role) -> Result<(), AppError> {
    if role.is_system {
        tracing::warn!(role_id = role.id, name = %role.name, "Attempt to remove system role");
        return Err(AppError::forbidden("System roles cannot be archived or deleted"));
    }
    Ok(())
}

/// 权限只能分配给同级别、未归档的角色
pub fn ensure_assignable(role: &Role, permission: &Permission) -> Result<(), AppError> {
    if role.is_archived {
        return Err(AppError::bad_request("Cannot assign permissions to an archived role"));
    }
    if role.level != permission.level {
        return Err(AppError::BadRequest(format!(
            "Permission '{}' is {}-level but role '{}' is {}-level",
            permission.key, permission.level, role.name, role.level
        )));
    }
    Ok(())
}

fn uniqueness_conflict(existing: &Role, requested_name: &str) -> AppError {
    if existing.name == requested_name {
        AppError::conflict("Role name already exists")
    } else {
        AppError::conflict("Role label already exists")
    }
}

fn map_unique_violation(error: AppError, message: &str) -> AppError {
    match error {
        AppError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
            AppError::conflict(message)
        }
        other => other,
    }
}
