//! Role repository (角色与权限数据访问)

use crate::{error::AppError, models::role::*};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Roles ====================

    /// 列出角色
    pub async fn list(&self, include_archived: bool) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE $1 OR is_archived = FALSE
            ORDER BY sort_order, name
            "#,
        )
        .bind(include_archived)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    /// 根据 ID 查找角色
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// 查找名称或标签冲突的角色
    pub async fn find_conflicting(
        &self,
        name: Option<&str>,
        label: Option<&str>,
        exclude_id: Option<i32>,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE (name = $1 OR label = $2)
              AND ($3::INTEGER IS NULL OR id <> $3)
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(label)
        .bind(exclude_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// 创建角色
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        req: &CreateRoleRequest,
        created_by: Uuid,
    ) -> Result<Role, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, label, level, sort_order, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.label)
        .bind(req.level)
        .bind(req.sort_order)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(role)
    }

    /// 更新角色（已归档角色不可更新）
    pub async fn update(
        &self,
        id: i32,
        req: &UpdateRoleRequest,
        updated_by: Uuid,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET
                label = COALESCE($2, label),
                sort_order = COALESCE($3, sort_order),
                updated_by = $4,
                updated_at = NOW()
            WHERE id = $1 AND is_archived = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.label)
        .bind(req.sort_order)
        .bind(updated_by)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// 归档角色；系统角色永远不会被匹配
    pub async fn archive(&self, id: i32, archived_by: Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET
                is_archived = TRUE,
                archived_at = NOW(),
                archived_by = $2,
                updated_by = $2,
                updated_at = NOW()
            WHERE id = $1 AND is_system = FALSE AND is_archived = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(archived_by)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// 删除非系统角色
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1 AND is_system = FALSE")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Permissions ====================

    /// 列出所有权限
    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY key")
            .fetch_all(&self.db)
            .await?;

        Ok(permissions)
    }

    pub async fn find_permission(&self, id: i32) -> Result<Option<Permission>, AppError> {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(permission)
    }

    /// 获取角色代码的所有权限
    pub async fn permissions_for_role(&self, role_code: &str) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.*
            FROM permissions p
            JOIN role_permission_xref x ON p.id = x.permission_id
            WHERE x.role = $1
            ORDER BY p.key
            "#,
        )
        .bind(role_code)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// 检查角色代码是否拥有特定权限
    pub async fn role_has_permission(&self, role_code: &str, key: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM role_permission_xref x
                JOIN permissions p ON x.permission_id = p.id
                WHERE x.role = $1 AND p.key = $2
            )
            "#,
        )
        .bind(role_code)
        .bind(key)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// 为角色添加权限；已存在时返回 false
    pub async fn add_permission_to_role<'e, E: PgExecutor<'e>>(
        executor: E,
        role_code: &str,
        permission_id: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO role_permission_xref (role, permission_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(role_code)
        .bind(permission_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 从角色移除权限
    pub async fn remove_permission_from_role(
        &self,
        role_code: &str,
        permission_id: i32,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM role_permission_xref WHERE role = $1 AND permission_id = $2")
                .bind(role_code)
                .bind(permission_id)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 移除角色代码的全部权限关联
    pub async fn remove_all_permissions<'e, E: PgExecutor<'e>>(
        executor: E,
        role_code: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM role_permission_xref WHERE role = $1")
            .bind(role_code)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // ==================== Seeding ====================

    /// 插入或修复系统角色；无需变更时返回 false
    pub async fn upsert_system_role<'e, E: PgExecutor<'e>>(
        executor: E,
        name: &str,
        label: &str,
        level: RoleLevel,
        sort_order: i32,
        actor: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO roles (name, label, level, sort_order, is_system, created_by, updated_by)
            VALUES ($1, $2, $3, $4, TRUE, $5, $5)
            ON CONFLICT (name) DO UPDATE
            SET is_system = TRUE,
                is_archived = FALSE,
                archived_at = NULL,
                archived_by = NULL,
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            WHERE roles.is_system = FALSE OR roles.is_archived = TRUE
            "#,
        )
        .bind(name)
        .bind(label)
        .bind(level)
        .bind(sort_order)
        .bind(actor)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_permission<'e, E: PgExecutor<'e>>(
        executor: E,
        key: &str,
        level: RoleLevel,
        description: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO permissions (key, level, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(level)
        .bind(description)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 按权限 key 为角色代码授权
    pub async fn grant_by_key<'e, E: PgExecutor<'e>>(
        executor: E,
        role_code: &str,
        key: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permission_xref (role, permission_id)
            SELECT $1, id FROM permissions WHERE key = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_code)
        .bind(key)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Rename ====================

    /// 删除与目标代码重复的关联行，返回删除数
    pub async fn delete_duplicate_xref<'e, E: PgExecutor<'e>>(
        executor: E,
        from_code: &str,
        to_code: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM role_permission_xref old
            WHERE old.role = $1
              AND EXISTS (
                  SELECT 1 FROM role_permission_xref new
                  WHERE new.role = $2 AND new.permission_id = old.permission_id
              )
            "#,
        )
        .bind(from_code)
        .bind(to_code)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// 将关联行的角色代码从 from 改为 to
    pub async fn rename_xref_role<'e, E: PgExecutor<'e>>(
        executor: E,
        from_code: &str,
        to_code: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE role_permission_xref SET role = $2 WHERE role = $1")
            .bind(from_code)
            .bind(to_code)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// 统计引用某角色代码的关联行数
    pub async fn count_xref_for_role<'e, E: PgExecutor<'e>>(
        executor: E,
        role_code: &str,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM role_permission_xref WHERE role = $1")
                .bind(role_code)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }

    /// 统计使用某系统名的角色行数
    pub async fn count_roles_named<'e, E: PgExecutor<'e>>(
        executor: E,
        name: &str,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roles WHERE name = $1")
            .bind(name)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// 修改角色系统名，返回受影响行数
    pub async fn rename_role<'e, E: PgExecutor<'e>>(
        executor: E,
        from_name: &str,
        to_name: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE roles SET name = $2, updated_at = NOW() WHERE name = $1",
        )
        .bind(from_name)
        .bind(to_name)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
