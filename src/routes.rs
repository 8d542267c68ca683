//! 路由注册
//! 每条受保护路由都显式声明方法、路径、允许的角色和健身房范围

use axum::{
    routing::{get, MethodFilter},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    guard::{mount, RoutePolicy, RouteSpec, ScopeRequirement},
    handlers,
    middleware::AppState,
    models::role::role_codes::{CLIENT, GYM_ADMIN, TRAINER},
};

use ScopeRequirement::{Optional, Required};

fn policy(roles: &[&str], scope: ScopeRequirement) -> RoutePolicy {
    RoutePolicy::new(roles.iter().copied(), scope)
}

/// 受保护路由表
pub fn route_specs(super_admin: &str) -> Vec<RouteSpec<Arc<AppState>>> {
    let platform = [super_admin];
    let managers = [super_admin, GYM_ADMIN];
    let staff = [super_admin, GYM_ADMIN, TRAINER];
    let everyone = [super_admin, GYM_ADMIN, TRAINER, CLIENT];

    vec![
        // 当前用户
        RouteSpec::new(MethodFilter::GET, "/api/v1/me", policy(&everyone, Optional), handlers::me::get_me),
        // 角色管理（平台级）
        RouteSpec::new(MethodFilter::GET, "/api/v1/roles", policy(&platform, Optional), handlers::role::list_roles),
        RouteSpec::new(MethodFilter::POST, "/api/v1/roles", policy(&platform, Optional), handlers::role::create_role),
        RouteSpec::new(MethodFilter::GET, "/api/v1/roles/{id}", policy(&platform, Optional), handlers::role::get_role),
        RouteSpec::new(MethodFilter::PUT, "/api/v1/roles/{id}", policy(&platform, Optional), handlers::role::update_role),
        RouteSpec::new(MethodFilter::DELETE, "/api/v1/roles/{id}", policy(&platform, Optional), handlers::role::delete_role),
        RouteSpec::new(
            MethodFilter::POST,
            "/api/v1/roles/{id}/archive",
            policy(&platform, Optional),
            handlers::role::archive_role,
        ),
        RouteSpec::new(
            MethodFilter::GET,
            "/api/v1/roles/{id}/permissions",
            policy(&managers, Optional),
            handlers::role::get_role_permissions,
        ),
        RouteSpec::new(
            MethodFilter::PUT,
            "/api/v1/roles/{id}/permissions/{permission_id}",
            policy(&platform, Optional),
            handlers::role::assign_permission,
        ),
        RouteSpec::new(
            MethodFilter::DELETE,
            "/api/v1/roles/{id}/permissions/{permission_id}",
            policy(&platform, Optional),
            handlers::role::revoke_permission,
        ),
        RouteSpec::new(
            MethodFilter::GET,
            "/api/v1/permissions",
            policy(&managers, Optional),
            handlers::role::list_permissions,
        ),
        RouteSpec::new(MethodFilter::POST, "/api/v1/admin/seed", policy(&platform, Optional), handlers::role::seed_defaults),
        // 受控词表
        RouteSpec::new(
            MethodFilter::GET,
            "/api/v1/lookups/{type_code}",
            policy(&everyone, Optional),
            handlers::lookup::list_lookups,
        ),
        // 教练
        RouteSpec::new(MethodFilter::GET, "/api/v1/trainers", policy(&staff, Required), handlers::trainer::list_trainers),
        RouteSpec::new(MethodFilter::POST, "/api/v1/trainers", policy(&managers, Required), handlers::trainer::create_trainer),
        RouteSpec::new(
            MethodFilter::GET,
            "/api/v1/trainers/summary",
            policy(&managers, Optional),
            handlers::trainer::trainer_summary,
        ),
        RouteSpec::new(MethodFilter::GET, "/api/v1/trainers/{id}", policy(&staff, Required), handlers::trainer::get_trainer),
        RouteSpec::new(
            MethodFilter::DELETE,
            "/api/v1/trainers/{id}",
            policy(&managers, Required),
            handlers::trainer::archive_trainer,
        ),
        // 通知
        RouteSpec::new(
            MethodFilter::GET,
            "/api/v1/notifications",
            policy(&everyone, Required),
            handlers::notification::list_notifications,
        ),
        RouteSpec::new(
            MethodFilter::POST,
            "/api/v1/notifications",
            policy(&managers, Required),
            handlers::notification::create_notification,
        ),
        RouteSpec::new(
            MethodFilter::POST,
            "/api/v1/notifications/{id}/read",
            policy(&everyone, Required),
            handlers::notification::mark_notification_read,
        ),
    ]
}

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    let protected_routes = mount(
        Router::new(),
        state.guard_chain.clone(),
        route_specs(state.guard_chain.super_admin_role()),
    );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(RequestBodyLimitLayer::new(state.config.server.max_body_bytes))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
