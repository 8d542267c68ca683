//! 词表重命名测试（需要数据库）

use gym_access::{
    error::AppError,
    models::role::AssignOutcome,
    repository::{LookupRepository, RoleRepository},
    services::{
        vocabulary_service::{CodeCounts, RenamePlan},
        RoleService, VocabularyService,
    },
};
use serial_test::serial;
use sqlx::PgPool;

mod common;
use common::setup_test_db;

/// 模拟旧数据：USER_ROLE 中的 `member` 取值、`MEMBER` 角色及其权限
async fn seed_legacy_member(pool: &PgPool) {
    RoleService::new(pool.clone()).seed_defaults(None).await.unwrap();

    sqlx::query("DELETE FROM role_permission_xref WHERE role = 'client'")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("UPDATE lookups SET code = 'MEMBER', name = 'Member', value = 'member' WHERE value = 'client'")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("UPDATE roles SET name = 'MEMBER', label = 'Member' WHERE name = 'CLIENT'")
        .execute(pool)
        .await
        .unwrap();

    for key in ["attendance.read", "notifications.read", "members.read"] {
        RoleRepository::grant_by_key(pool, "member", key).await.unwrap();
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_rename_moves_lookup_and_xref_rows() {
    let pool = setup_test_db().await;
    seed_legacy_member(&pool).await;

    // client 已有一条重复授权，重命名时合并
    RoleRepository::grant_by_key(&pool, "client", "attendance.read").await.unwrap();

    let report = VocabularyService::new(pool.clone())
        .rename_lookup_value("USER_ROLE", "member", "client")
        .await
        .unwrap();

    assert_eq!(report.plan, RenamePlan::Rename);
    assert_eq!(report.before.from, 3);
    assert_eq!(report.before.to, 1);
    assert_eq!(report.merged, 1);
    assert_eq!(report.after.from, 0);
    assert_eq!(report.after.to, 3);

    assert_eq!(report.roles_before, Some(CodeCounts { from: 1, to: 0 }));
    assert_eq!(report.roles_after, Some(CodeCounts { from: 0, to: 1 }));

    let lookup = report.lookup.unwrap();
    assert_eq!(lookup.code, "CLIENT");
    assert_eq!(lookup.name, "Client");
    assert_eq!(lookup.value, "client");

    let lookups = LookupRepository::new(pool.clone())
        .list_by_type("USER_ROLE")
        .await
        .unwrap()
        .unwrap();
    assert!(lookups.iter().all(|l| l.value != "member"));
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_rename_twice_reports_already_renamed() {
    let pool = setup_test_db().await;
    seed_legacy_member(&pool).await;
    let service = VocabularyService::new(pool.clone());

    service.rename_lookup_value("USER_ROLE", "member", "client").await.unwrap();
    let second = service
        .rename_lookup_value("USER_ROLE", "member", "client")
        .await
        .unwrap();

    assert_eq!(second.plan, RenamePlan::AlreadyRenamed);
    assert_eq!(second.merged, 0);
    assert_eq!(second.before, second.after);
    assert_eq!(second.roles_before, second.roles_after);
}

async fn id_of(pool: &PgPool, sql: &str, key: &str) -> i32 {
    let (id,): (i32,) = sqlx::query_as(sql).bind(key).fetch_one(pool).await.unwrap();
    id
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_renamed_role_keeps_permissions_and_assigns_new_code() {
    let pool = setup_test_db().await;
    seed_legacy_member(&pool).await;

    VocabularyService::new(pool.clone())
        .rename_lookup_value("USER_ROLE", "member", "client")
        .await
        .unwrap();

    let role_id = id_of(&pool, "SELECT id FROM roles WHERE name = $1", "CLIENT").await;
    assert_eq!(RoleRepository::count_roles_named(&pool, "MEMBER").await.unwrap(), 0);

    let service = RoleService::new(pool.clone());
    let detail = service.get(role_id).await.unwrap();
    let keys: Vec<&str> = detail.permissions.iter().map(|p| p.key.as_str()).collect();
    assert!(keys.contains(&"attendance.read"));
    assert!(keys.contains(&"members.read"));

    let permission_id = id_of(&pool, "SELECT id FROM permissions WHERE key = $1", "trainers.read").await;
    assert_eq!(
        service.assign_permission(role_id, permission_id).await.unwrap(),
        AssignOutcome::Assigned
    );

    assert_eq!(RoleRepository::count_xref_for_role(&pool, "member").await.unwrap(), 0);
    assert_eq!(RoleRepository::count_xref_for_role(&pool, "client").await.unwrap(), 4);
    assert!(RoleService::new(pool.clone())
        .role_has_permission("client", "trainers.read")
        .await
        .unwrap());
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_rerun_moves_leftover_rows() {
    let pool = setup_test_db().await;
    seed_legacy_member(&pool).await;
    let service = VocabularyService::new(pool.clone());

    service.rename_lookup_value("USER_ROLE", "member", "client").await.unwrap();

    // 旧代码写入方在迁移后又写了一行
    RoleRepository::grant_by_key(&pool, "member", "reports.read").await.unwrap();

    let second = service
        .rename_lookup_value("USER_ROLE", "member", "client")
        .await
        .unwrap();

    assert_eq!(second.plan, RenamePlan::AlreadyRenamed);
    assert_eq!(second.before, CodeCounts { from: 1, to: 3 });
    assert_eq!(second.after, CodeCounts { from: 0, to: 4 });
    assert_eq!(second.lookup.unwrap().value, "client");
    assert_eq!(RoleRepository::count_xref_for_role(&pool, "member").await.unwrap(), 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_rename_rejects_duplicate_role_names() {
    let pool = setup_test_db().await;
    seed_legacy_member(&pool).await;

    // 词表已迁移，但 MEMBER 与 CLIENT 两个角色并存
    sqlx::query("UPDATE lookups SET code = 'CLIENT', name = 'Client', value = 'client' WHERE value = 'member'")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO roles (name, label, level) VALUES ('CLIENT', 'Client', 'gym')")
        .execute(&pool)
        .await
        .unwrap();

    assert!(matches!(
        VocabularyService::new(pool.clone())
            .rename_lookup_value("USER_ROLE", "member", "client")
            .await,
        Err(AppError::Conflict(_))
    ));
    assert_eq!(RoleRepository::count_xref_for_role(&pool, "member").await.unwrap(), 3);
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_rename_conflict_and_missing() {
    let pool = setup_test_db().await;
    RoleService::new(pool.clone()).seed_defaults(None).await.unwrap();
    let service = VocabularyService::new(pool);

    // trainer 和 client 同时存在
    assert!(matches!(
        service.rename_lookup_value("USER_ROLE", "trainer", "client").await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        service.rename_lookup_value("USER_ROLE", "ghost", "phantom").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.rename_lookup_value("NO_SUCH_TYPE", "member", "client").await,
        Err(AppError::NotFound(_))
    ));
}
