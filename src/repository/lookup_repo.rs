//! Lookup repository (受控词表数据访问)

use crate::{error::AppError, models::lookup::*};
use sqlx::{PgExecutor, PgPool};

pub struct LookupRepository {
    db: PgPool,
}

impl LookupRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_type<'e, E: PgExecutor<'e>>(
        executor: E,
        code: &str,
    ) -> Result<Option<LookupType>, AppError> {
        let lookup_type = sqlx::query_as::<_, LookupType>("SELECT * FROM lookup_types WHERE code = $1")
            .bind(code)
            .fetch_optional(executor)
            .await?;

        Ok(lookup_type)
    }

    /// 列出某类型下的全部取值
    pub async fn list_by_type(&self, type_code: &str) -> Result<Option<Vec<Lookup>>, AppError> {
        let Some(lookup_type) = Self::find_type(&self.db, type_code).await? else {
            return Ok(None);
        };

        let lookups = sqlx::query_as::<_, Lookup>(
            "SELECT * FROM lookups WHERE lookup_type_id = $1 ORDER BY sort_order, code",
        )
        .bind(lookup_type.id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(lookups))
    }

    /// 插入类型（已存在则跳过），返回是否新建
    pub async fn insert_type<'e, E: PgExecutor<'e>>(
        executor: E,
        code: &str,
        name: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO lookup_types (code, name) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(name)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 插入取值（code 或 value 已存在则跳过），返回是否新建
    pub async fn insert_value<'e, E: PgExecutor<'e>>(
        executor: E,
        lookup_type_id: i32,
        code: &str,
        name: &str,
        value: &str,
        sort_order: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO lookups (lookup_type_id, code, name, value, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(lookup_type_id)
        .bind(code)
        .bind(name)
        .bind(value)
        .bind(sort_order)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_value<'e, E: PgExecutor<'e>>(
        executor: E,
        lookup_type_id: i32,
        value: &str,
    ) -> Result<Option<Lookup>, AppError> {
        let lookup = sqlx::query_as::<_, Lookup>(
            "SELECT * FROM lookups WHERE lookup_type_id = $1 AND value = $2 FOR UPDATE",
        )
        .bind(lookup_type_id)
        .bind(value)
        .fetch_optional(executor)
        .await?;

        Ok(lookup)
    }

    /// 重命名取值（code、name、value 一起更新）
    pub async fn rename_value<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
        code: &str,
        name: &str,
        value: &str,
    ) -> Result<Lookup, AppError> {
        let lookup = sqlx::query_as::<_, Lookup>(
            r#"
            UPDATE lookups
            SET code = $2, name = $3, value = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(name)
        .bind(value)
        .fetch_one(executor)
        .await?;

        Ok(lookup)
    }

    pub async fn delete_value<'e, E: PgExecutor<'e>>(
        executor: E,
        lookup_type_id: i32,
        value: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM lookups WHERE lookup_type_id = $1 AND value = $2")
            .bind(lookup_type_id)
            .bind(value)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
