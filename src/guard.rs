//! 访问守卫链
//!
//! 每条路由声明一个 [`RoutePolicy`]（允许的角色 + 健身房范围要求），
//! 由 [`mount`] 统一包装守卫中间件。守卫按固定顺序执行：
//!
//! 1. 认证：验证 Bearer 令牌，构建 [`CallerIdentity`]
//! 2. 授权谓词：角色允许列表以及附加的检查
//! 3. 范围绑定：解析有效健身房并写入请求扩展
//!
//! 任一阶段失败都会立即中止，后续阶段不会执行。

use crate::{
    auth::{Authenticator, CallerIdentity},
    error::AppError,
    tenancy::{gym_id_from_uri, resolve_gym_id, resolve_optional_gym_id, GymId, GymScope},
};
use axum::{
    extract::{FromRequestParts, Request, State},
    handler::Handler,
    http::{request::Parts, HeaderMap},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// 路由对健身房上下文的要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRequirement {
    /// 必须解析出具体健身房，否则拒绝请求
    Required,
    /// 可在平台级（无健身房）执行
    Optional,
}

/// 单条路由的访问策略
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub allowed_roles: HashSet<String>,
    pub scope: ScopeRequirement,
}

impl RoutePolicy {
    pub fn new<I, R>(allowed_roles: I, scope: ScopeRequirement) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            allowed_roles: allowed_roles.into_iter().map(Into::into).collect(),
            scope,
        }
    }

    pub fn allows(&self, role: &str) -> bool {
        self.allowed_roles.contains(role)
    }
}

/// 授权谓词，返回显式的成功或失败
pub trait AccessPredicate: Send + Sync {
    fn check(&self, caller: &CallerIdentity, policy: &RoutePolicy) -> Result<(), AppError>;
}

/// 角色允许列表检查
pub struct RoleAllowList;

impl AccessPredicate for RoleAllowList {
    fn check(&self, caller: &CallerIdentity, policy: &RoutePolicy) -> Result<(), AppError> {
        if policy.allows(&caller.role) {
            return Ok(());
        }

        tracing::warn!(
            user_id = %caller.user_id,
            role = %caller.role,
            "Role not permitted for route"
        );
        Err(AppError::forbidden("Role is not permitted for this operation"))
    }
}

/// 非超级管理员必须在令牌中携带健身房
///
/// 否则 `Optional` 路由会把这类调用者当作平台级请求处理。
pub struct GymMembership {
    super_admin_role: String,
}

impl GymMembership {
    pub fn new(super_admin_role: impl Into<String>) -> Self {
        Self { super_admin_role: super_admin_role.into() }
    }
}

impl AccessPredicate for GymMembership {
    fn check(&self, caller: &CallerIdentity, _policy: &RoutePolicy) -> Result<(), AppError> {
        if caller.role == self.super_admin_role || caller.gym_id.is_some() {
            return Ok(());
        }

        tracing::warn!(
            user_id = %caller.user_id,
            role = %caller.role,
            "Caller has no gym assignment"
        );
        Err(AppError::forbidden("operation requires a gym assignment"))
    }
}

/// 守卫链通过后写入请求扩展的上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub caller: CallerIdentity,
    pub scope: GymScope,
}

/// 认证 -> 授权 -> 范围绑定
pub struct GuardChain {
    authenticator: Arc<dyn Authenticator>,
    predicates: Vec<Arc<dyn AccessPredicate>>,
    super_admin_role: String,
}

impl GuardChain {
    /// 角色允许列表始终是第一个授权谓词，其后是健身房归属检查
    pub fn new(authenticator: Arc<dyn Authenticator>, super_admin_role: impl Into<String>) -> Self {
        let super_admin_role = super_admin_role.into();
        Self {
            authenticator,
            predicates: vec![
                Arc::new(RoleAllowList),
                Arc::new(GymMembership::new(super_admin_role.clone())),
            ],
            super_admin_role,
        }
    }

    /// 追加授权谓词（在角色检查之后执行）
    pub fn with_predicate(mut self, predicate: Arc<dyn AccessPredicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn super_admin_role(&self) -> &str {
        &self.super_admin_role
    }

    pub fn is_super_admin(&self, caller: &CallerIdentity) -> bool {
        caller.role == self.super_admin_role
    }

    pub fn evaluate(
        &self,
        headers: &HeaderMap,
        query_gym_id: Option<&str>,
        policy: &RoutePolicy,
    ) -> Result<RequestContext, AppError> {
        let caller = self.authenticator.authenticate(headers)?;

        for predicate in &self.predicates {
            predicate.check(&caller, policy)?;
        }

        let scope = match policy.scope {
            ScopeRequirement::Required => GymScope::Gym(resolve_gym_id(
                caller.gym_id,
                query_gym_id,
                self.is_super_admin(&caller),
            )?),
            ScopeRequirement::Optional => {
                GymScope::from(resolve_optional_gym_id(caller.gym_id, query_gym_id))
            }
        };

        Ok(RequestContext { caller, scope })
    }
}

/// 单条路由的守卫状态
#[derive(Clone)]
pub struct RouteGuard {
    chain: Arc<GuardChain>,
    policy: Arc<RoutePolicy>,
}

/// 守卫中间件
pub async fn guard_middleware(
    State(guard): State<RouteGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let query_gym_id = gym_id_from_uri(req.uri());
    let context = guard.chain.evaluate(req.headers(), query_gym_id.as_deref(), &guard.policy)?;

    tracing::debug!(
        user_id = %context.caller.user_id,
        role = %context.caller.role,
        gym_id = ?context.scope.gym_id(),
        "Request authorized"
    );

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// 显式的路由声明：路径、方法、访问策略和处理器
pub struct RouteSpec<S> {
    pub path: &'static str,
    pub method: MethodFilter,
    pub policy: RoutePolicy,
    handler: MethodRouter<S>,
}

impl<S> RouteSpec<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new<H, T>(method: MethodFilter, path: &'static str, policy: RoutePolicy, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        Self {
            path,
            method,
            policy,
            handler: on(method, handler),
        }
    }
}

/// 将路由声明挂载到 Router，每个处理器前都执行守卫链
pub fn mount<S>(router: Router<S>, chain: Arc<GuardChain>, specs: Vec<RouteSpec<S>>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    specs.into_iter().fold(router, |router, spec| {
        let guard = RouteGuard {
            chain: chain.clone(),
            policy: Arc::new(spec.policy),
        };
        router.route(
            spec.path,
            spec.handler.layer(from_fn_with_state(guard, guard_middleware)),
        )
    })
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 已解析的健身房，仅在 `ScopeRequirement::Required` 的路由上可用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedGym(pub GymId);

impl<S> FromRequestParts<S> for ScopedGym
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = RequestContext::from_request_parts(parts, state).await?;
        context
            .scope
            .gym_id()
            .map(ScopedGym)
            .ok_or_else(|| AppError::forbidden("operation requires a gym context"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, Json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use uuid::Uuid;

    /// 从 `x-test-role` / `x-test-gym` 头构建身份，缺失时视为未认证
    struct HeaderAuthenticator;

    impl Authenticator for HeaderAuthenticator {
        fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
            let role = headers
                .get("x-test-role")
                .and_then(|v| v.to_str().ok())
                .ok_or(AppError::Unauthorized)?;
            let gym_id = headers
                .get("x-test-gym")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            Ok(CallerIdentity { user_id: Uuid::nil(), gym_id, role: role.to_string() })
        }
    }

    #[derive(Default)]
    struct CountingPredicate {
        calls: AtomicUsize,
    }

    impl AccessPredicate for CountingPredicate {
        fn check(&self, _caller: &CallerIdentity, _policy: &RoutePolicy) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn headers(role: Option<&str>, gym: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(role) = role {
            headers.insert("x-test-role", role.parse().unwrap());
        }
        if let Some(gym) = gym {
            headers.insert("x-test-gym", gym.parse().unwrap());
        }
        headers
    }

    fn chain() -> GuardChain {
        GuardChain::new(Arc::new(HeaderAuthenticator), "superadmin")
    }

    #[test]
    fn test_failed_authentication_skips_later_stages() {
        let spy = Arc::new(CountingPredicate::default());
        let chain = chain().with_predicate(spy.clone());
        let policy = RoutePolicy::new(["admin"], ScopeRequirement::Required);

        let result = chain.evaluate(&headers(None, None), Some("abc"), &policy);
        assert!(matches!(result, Err(AppError::Unauthorized)));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_role_rejection_skips_later_predicates() {
        let spy = Arc::new(CountingPredicate::default());
        let chain = chain().with_predicate(spy.clone());
        let policy = RoutePolicy::new(["admin"], ScopeRequirement::Required);

        let result = chain.evaluate(&headers(Some("client"), Some("3")), None, &policy);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);

        chain.evaluate(&headers(Some("admin"), Some("3")), None, &policy).unwrap();
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scope_binding_uses_token_gym_first() {
        let policy = RoutePolicy::new(["admin"], ScopeRequirement::Required);
        let context = chain().evaluate(&headers(Some("admin"), Some("3")), Some("99"), &policy).unwrap();
        assert_eq!(context.scope, GymScope::Gym(3));
    }

    #[test]
    fn test_required_scope_for_super_admin() {
        let policy = RoutePolicy::new(["superadmin"], ScopeRequirement::Required);
        let chain = chain();

        let context = chain.evaluate(&headers(Some("superadmin"), None), Some("42"), &policy).unwrap();
        assert_eq!(context.scope, GymScope::Gym(42));

        let missing = chain.evaluate(&headers(Some("superadmin"), None), None, &policy);
        assert!(matches!(missing, Err(AppError::Forbidden(_))));

        let malformed = chain.evaluate(&headers(Some("superadmin"), None), Some("abc"), &policy);
        assert!(matches!(malformed, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_required_scope_for_gym_role_without_token_gym() {
        let policy = RoutePolicy::new(["admin"], ScopeRequirement::Required);
        let result = chain().evaluate(&headers(Some("admin"), None), Some("42"), &policy);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_optional_scope_never_fails() {
        let policy = RoutePolicy::new(["superadmin"], ScopeRequirement::Optional);
        let chain = chain();

        let context = chain.evaluate(&headers(Some("superadmin"), None), None, &policy).unwrap();
        assert_eq!(context.scope, GymScope::Unscoped);

        let context = chain.evaluate(&headers(Some("superadmin"), None), Some("x"), &policy).unwrap();
        assert_eq!(context.scope, GymScope::Unscoped);

        let context = chain.evaluate(&headers(Some("superadmin"), None), Some("8"), &policy).unwrap();
        assert_eq!(context.scope, GymScope::Gym(8));
    }

    #[test]
    fn test_gym_role_without_token_gym_is_denied_on_optional_route() {
        let policy = RoutePolicy::new(["admin", "superadmin"], ScopeRequirement::Optional);
        let chain = chain();

        let unscoped = chain.evaluate(&headers(Some("admin"), None), None, &policy);
        assert!(matches!(unscoped, Err(AppError::Forbidden(_))));

        let chosen = chain.evaluate(&headers(Some("admin"), None), Some("2"), &policy);
        assert!(matches!(chosen, Err(AppError::Forbidden(_))));

        let context = chain.evaluate(&headers(Some("admin"), Some("3")), Some("2"), &policy).unwrap();
        assert_eq!(context.scope, GymScope::Gym(3));

        let context = chain.evaluate(&headers(Some("superadmin"), None), None, &policy).unwrap();
        assert_eq!(context.scope, GymScope::Unscoped);
    }

    async fn echo_gym(ScopedGym(gym_id): ScopedGym) -> Json<GymId> {
        Json(gym_id)
    }

    async fn echo_context(context: RequestContext) -> Json<RequestContext> {
        Json(context)
    }

    fn router() -> Router {
        mount(
            Router::new(),
            Arc::new(chain()),
            vec![
                RouteSpec::new(
                    MethodFilter::GET,
                    "/scoped",
                    RoutePolicy::new(["admin", "superadmin"], ScopeRequirement::Required),
                    echo_gym,
                ),
                RouteSpec::new(
                    MethodFilter::POST,
                    "/scoped",
                    RoutePolicy::new(["superadmin"], ScopeRequirement::Required),
                    echo_gym,
                ),
                RouteSpec::new(
                    MethodFilter::GET,
                    "/context",
                    RoutePolicy::new(["superadmin"], ScopeRequirement::Optional),
                    echo_context,
                ),
            ],
        )
    }

    async fn send(method: &str, uri: &str, role: Option<&str>, gym: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder.header("x-test-role", role);
        }
        if let Some(gym) = gym {
            builder = builder.header("x-test-gym", gym);
        }
        let response = router().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = http_body_util::BodyExt::collect(response.into_body()).await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_mounted_routes_enforce_guard() {
        let (status, _) = send("GET", "/scoped", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send("GET", "/scoped", Some("client"), Some("1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send("GET", "/scoped?gymId=9", Some("admin"), Some("1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"1");

        let (status, body) = send("GET", "/scoped?gymId=9", Some("superadmin"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"9");

        let (status, _) = send("GET", "/scoped?gymId=nine", Some("superadmin"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_same_path_different_methods_keep_own_policy() {
        let (status, _) = send("POST", "/scoped", Some("admin"), Some("1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send("POST", "/scoped?gymId=4", Some("superadmin"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"4");
    }

    #[tokio::test]
    async fn test_context_extractor_reports_unscoped() {
        let (status, body) = send("GET", "/context", Some("superadmin"), None).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["scope"]["kind"], "unscoped");
        assert_eq!(json["caller"]["role"], "superadmin");
    }
}
