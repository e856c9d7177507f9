use std::{sync::Arc, time::Duration};

use active_ics_core::{
    ActiveEventEvaluator, CalendarOptions, Error,
    cache::CacheManager,
    ics::resolve_tzid,
    source::{CalendarLoader, CalendarSource},
    zoned,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::ServerCache;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<CalendarLoader<ServerCache>>,
}

/// 健康检查响应
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// 错误响应
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// 活动事件查询参数
#[derive(Deserialize)]
struct ActiveQuery {
    /// 日历的 http(s) URL
    calendar: String,
    /// RFC 3339，或 `timezone` 中的本地时间
    at: Option<String>,
    timezone: Option<String>,
    /// 为 true 时忽略缓存重新下载日历
    #[serde(default)]
    refresh: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActiveResponse {
    at: String,
    active: Vec<String>,
}

pub fn create_app(
    cache: ServerCache,
    default_timezone: Tz,
    cache_ttl: Duration,
) -> Result<Router, Error> {
    let loader = CalendarLoader::with_cache(
        CalendarOptions { default_timezone },
        CacheManager::new(cache),
        cache_ttl,
    )?;
    let state = AppState {
        loader: Arc::new(loader),
    };

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/active", get(active_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    Ok(router)
}

/// 根路径处理器
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Active ICS Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Answers which events of an iCalendar feed are in progress at an instant",
        "endpoints": {
            "health": "/health",
            "active": "/active?calendar=<url>[&at=<instant>][&timezone=<tz>][&refresh=true]"
        }
    }))
}

/// 健康检查处理器
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 活动事件处理器
async fn active_handler(
    Query(params): Query<ActiveQuery>,
    State(state): State<AppState>,
) -> Result<Json<ActiveResponse>, AppError> {
    let source: CalendarSource = params.calendar.parse()?;
    if !source.is_remote() {
        return Err(Error::Config("calendar must be an http(s) URL".to_string()).into());
    }

    if params.refresh {
        state.loader.invalidate(&source).await?;
    }
    let calendar = state.loader.load(&source).await?;

    let tz = match params.timezone.as_deref() {
        Some(name) => resolve_tzid(name)
            .ok_or_else(|| Error::Config(format!("unknown timezone '{}'", name)))?,
        None => calendar.timezone,
    };
    let at = match params.at.as_deref() {
        Some(value) => zoned::parse_instant(value, tz)?,
        None => Utc::now().with_timezone(&tz),
    };

    // 无界规则的展开可能较慢，放到阻塞线程池执行
    let events = calendar.events;
    let active = tokio::task::spawn_blocking(move || {
        ActiveEventEvaluator::new().active_events(&at, &events)
    })
    .await
    .map_err(|e| Error::Internal(format!("evaluation task failed: {}", e)))??;
    tracing::info!("{} active event(s) in {} at {}", active.len(), source, at);

    Ok(Json(ActiveResponse {
        at: at.to_rfc3339(),
        active: active.into_iter().collect(),
    }))
}

/// 应用错误类型
#[derive(Debug)]
struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self.0 {
            Error::Config(_) => (StatusCode::BAD_REQUEST, "请求参数错误"),
            e if e.is_calendar_error() => (StatusCode::UNPROCESSABLE_ENTITY, "日历重复规则错误"),
            Error::Ics(_) | Error::DateTime(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "日历解析失败")
            }
            Error::Source { .. } | Error::Http(_) => (StatusCode::BAD_GATEWAY, "日历获取失败"),
            Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "请求超时"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "内部服务器错误"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self.0);
        }

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
