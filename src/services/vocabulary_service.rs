//! 受控词表取值重命名（如 `member` -> `client`）
//!
//! 词表行、所有引用它的 `role_permission_xref` 行，以及 USER_ROLE 对应的
//! `roles` 行在同一个事务内更新，计数校验失败则整体回滚。

use crate::{
    error::AppError,
    models::{
        lookup::{code_and_name_for_value, Lookup, USER_ROLE},
        role::role_name_for_code,
    },
    repository::{LookupRepository, RoleRepository},
};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

/// 词表当前状态对应的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenamePlan {
    /// 只有旧值存在
    Rename,
    /// 只有新值存在，之前已迁移过
    AlreadyRenamed,
    /// 新旧值同时存在
    Conflict,
    /// 两者都不存在
    Missing,
}

impl RenamePlan {
    pub fn classify(from_exists: bool, to_exists: bool) -> Self {
        match (from_exists, to_exists) {
            (true, false) => RenamePlan::Rename,
            (false, true) => RenamePlan::AlreadyRenamed,
            (true, true) => RenamePlan::Conflict,
            (false, false) => RenamePlan::Missing,
        }
    }
}

/// 引用新旧值的行数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CodeCounts {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameReport {
    pub type_code: String,
    pub from: String,
    pub to: String,
    pub plan: RenamePlan,
    /// `role_permission_xref` 行数
    pub before: CodeCounts,
    pub after: CodeCounts,
    /// 因与新代码重复而删除的关联行
    pub merged: u64,
    /// `roles` 行数，仅 USER_ROLE
    pub roles_before: Option<CodeCounts>,
    pub roles_after: Option<CodeCounts>,
    pub lookup: Option<Lookup>,
}

/// 校验迁移后的计数，`subject` 用于错误信息
pub fn verify_counts(
    subject: &str,
    before: CodeCounts,
    after: CodeCounts,
    merged: u64,
) -> Result<(), AppError> {
    if after.from != 0 {
        return Err(AppError::Internal(format!(
            "{} {} rows still reference the old value",
            after.from, subject
        )));
    }

    let expected = before.to + before.from - merged as i64;
    if after.to != expected {
        return Err(AppError::Internal(format!(
            "{} count mismatch after rename: expected {}, found {}",
            subject, expected, after.to
        )));
    }
    Ok(())
}

async fn xref_counts(conn: &mut PgConnection, from: &str, to: &str) -> Result<CodeCounts, AppError> {
    Ok(CodeCounts {
        from: RoleRepository::count_xref_for_role(&mut *conn, from).await?,
        to: RoleRepository::count_xref_for_role(&mut *conn, to).await?,
    })
}

async fn role_counts(
    conn: &mut PgConnection,
    from_name: &str,
    to_name: &str,
) -> Result<CodeCounts, AppError> {
    Ok(CodeCounts {
        from: RoleRepository::count_roles_named(&mut *conn, from_name).await?,
        to: RoleRepository::count_roles_named(&mut *conn, to_name).await?,
    })
}

pub struct VocabularyService {
    db: PgPool,
}

impl VocabularyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 重命名词表取值
    ///
    /// `AlreadyRenamed` 时仍会把残留的旧值关联行和角色行迁到新值并校验，
    /// 没有残留时等同于空操作。
    pub async fn rename_lookup_value(
        &self,
        type_code: &str,
        from: &str,
        to: &str,
    ) -> Result<RenameReport, AppError> {
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(AppError::bad_request("Both source and target values are required"));
        }
        if from == to {
            return Err(AppError::bad_request("Source and target values are identical"));
        }

        let mut tx = self.db.begin().await?;

        let lookup_type = LookupRepository::find_type(&mut *tx, type_code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lookup type '{}' not found", type_code)))?;

        // USER_ROLE 的取值同时决定 roles.name
        let role_names = (type_code == USER_ROLE)
            .then(|| (role_name_for_code(from), role_name_for_code(to)));

        let before = xref_counts(&mut tx, from, to).await?;
        let roles_before = match &role_names {
            Some((from_name, to_name)) => Some(role_counts(&mut tx, from_name, to_name).await?),
            None => None,
        };

        let source = LookupRepository::find_value(&mut *tx, lookup_type.id, from).await?;
        let target = LookupRepository::find_value(&mut *tx, lookup_type.id, to).await?;
        let plan = RenamePlan::classify(source.is_some(), target.is_some());

        match plan {
            RenamePlan::Conflict => {
                tx.rollback().await?;
                return Err(AppError::Conflict(format!(
                    "Both '{}' and '{}' exist in {}; resolve manually",
                    from, to, type_code
                )));
            }
            RenamePlan::Missing => {
                tx.rollback().await?;
                return Err(AppError::NotFound(format!(
                    "Neither '{}' nor '{}' exists in {}",
                    from, to, type_code
                )));
            }
            RenamePlan::Rename | RenamePlan::AlreadyRenamed => {}
        }

        if let (Some((from_name, to_name)), Some(counts)) = (&role_names, roles_before) {
            if counts.from > 0 && counts.to > 0 {
                tx.rollback().await?;
                return Err(AppError::Conflict(format!(
                    "Both roles '{}' and '{}' exist; resolve manually",
                    from_name, to_name
                )));
            }
        }

        if plan == RenamePlan::AlreadyRenamed {
            let leftover_roles = roles_before.map_or(0, |c| c.from);
            if before.from > 0 || leftover_roles > 0 {
                tracing::warn!(
                    type_code,
                    from,
                    to,
                    xref_rows = before.from,
                    role_rows = leftover_roles,
                    "Lookup already renamed, moving leftover rows"
                );
            } else {
                tracing::info!(type_code, from, to, "Lookup value already renamed");
            }
        }

        let merged = RoleRepository::delete_duplicate_xref(&mut *tx, from, to).await?;
        RoleRepository::rename_xref_role(&mut *tx, from, to).await?;
        if let Some((from_name, to_name)) = &role_names {
            RoleRepository::rename_role(&mut *tx, from_name, to_name).await?;
        }

        let lookup = match source {
            Some(source) => {
                let (code, name) = code_and_name_for_value(to);
                Some(LookupRepository::rename_value(&mut *tx, source.id, &code, &name, to).await?)
            }
            None => target,
        };

        let after = xref_counts(&mut tx, from, to).await?;
        let roles_after = match &role_names {
            Some((from_name, to_name)) => Some(role_counts(&mut tx, from_name, to_name).await?),
            None => None,
        };

        let verified = verify_counts("xref", before, after, merged).and_then(|_| {
            match (roles_before, roles_after) {
                (Some(b), Some(a)) => verify_counts("role", b, a, 0),
                _ => Ok(()),
            }
        });
        if let Err(e) = verified {
            tracing::error!(
                error = %e,
                ?before,
                ?after,
                ?roles_before,
                ?roles_after,
                merged,
                "Rename verification failed, rolling back"
            );
            tx.rollback().await?;
            return Err(e);
        }

        tx.commit().await?;

        tracing::info!(
            type_code,
            from,
            to,
            ?plan,
            before_from = before.from,
            before_to = before.to,
            after_to = after.to,
            merged,
            "Lookup value renamed"
        );

        Ok(RenameReport {
            type_code: type_code.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            plan,
            before,
            after,
            merged,
            roles_before,
            roles_after,
            lookup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_plan() {
        assert_eq!(RenamePlan::classify(true, false), RenamePlan::Rename);
        assert_eq!(RenamePlan::classify(false, true), RenamePlan::AlreadyRenamed);
        assert_eq!(RenamePlan::classify(true, true), RenamePlan::Conflict);
        assert_eq!(RenamePlan::classify(false, false), RenamePlan::Missing);
    }

    #[test]
    fn test_verify_counts_accepts_clean_move() {
        let before = CodeCounts { from: 3, to: 0 };
        let after = CodeCounts { from: 0, to: 3 };
        assert!(verify_counts("xref", before, after, 0).is_ok());
    }

    #[test]
    fn test_verify_counts_accounts_for_merged_rows() {
        let before = CodeCounts { from: 3, to: 2 };
        let after = CodeCounts { from: 0, to: 4 };
        assert!(verify_counts("xref", before, after, 1).is_ok());
        assert!(verify_counts("xref", before, after, 0).is_err());
    }

    #[test]
    fn test_verify_counts_rejects_leftover_rows() {
        let before = CodeCounts { from: 2, to: 0 };
        let after = CodeCounts { from: 1, to: 1 };
        assert!(matches!(verify_counts("xref", before, after, 0), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_verify_counts_names_subject() {
        let before = CodeCounts { from: 1, to: 0 };
        let after = CodeCounts { from: 1, to: 0 };
        match verify_counts("role", before, after, 0) {
            Err(AppError::Internal(msg)) => assert!(msg.contains("role rows")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_plan_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RenamePlan::AlreadyRenamed).unwrap(),
            "\"already_renamed\""
        );
    }
}
