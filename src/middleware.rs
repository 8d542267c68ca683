//! HTTP 中间件
//! 应用状态与请求追踪

use crate::{
    config::AppConfig,
    guard::GuardChain,
    services::{NotificationService, RoleService, TrainerService, VocabularyService},
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 服务均为不可变的 Arc 共享实例，Clone 只拷贝指针
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: sqlx::PgPool,
    pub guard_chain: Arc<GuardChain>,
    pub role_service: Arc<RoleService>,
    pub vocabulary_service: Arc<VocabularyService>,
    pub trainer_service: Arc<TrainerService>,
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(config: AppConfig, db: sqlx::PgPool, guard_chain: Arc<GuardChain>) -> Self {
        Self {
            role_service: Arc::new(RoleService::new(db.clone())),
            vocabulary_service: Arc::new(VocabularyService::new(db.clone())),
            trainer_service: Arc::new(TrainerService::new(db.clone())),
            notification_service: Arc::new(NotificationService::new(db.clone())),
            config,
            db,
            guard_chain,
        }
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method_tag = method_label(req.method().as_str());
    let method = req.method().to_string();
    // 只记录路径，查询串里可能有 gymId 以外的参数
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        metrics::counter!(
            "http_requests_total",
            "method" => method_tag,
            "status" => status_label(status)
        )
        .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// metrics 标签使用静态字符串
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

fn status_label(status: u16) -> &'static str {
    match status {
        200 => "200",
        201 => "201",
        204 => "204",
        400 => "400",
        401 => "401",
        403 => "403",
        404 => "404",
        409 => "409",
        500 => "500",
        _ => "other",
    }
}
