use std::sync::Arc;

use anyhow::anyhow;
use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path as UrlPath, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use log::error;
use tokio::task::spawn_blocking;
use tokio::time::timeout;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::error::{BadRequest, Result};
use super::state::AppState;
use super::types::*;
use crate::convert::is_raw_format;
use crate::delete::DeleteError;
use crate::fs::resolve_relative;
use crate::metrics;
use crate::query::{GroupView, QueryError};

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const STYLE_CSS: &str = include_str!("../../assets/style.css");
const SCRIPT_JS: &str = include_str!("../../assets/script.js");

/// 查询一个分组
#[utoipa::path(
    get,
    path = "/group",
    params(GroupParams),
    responses(
        (status = 200, body = GroupView),
        (status = 404, description = "分组不存在，或分组内的文件都已不存在"),
    )
)]
pub async fn group_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GroupParams>,
) -> Result<Json<GroupView>> {
    let index = params.index();
    let result = match usize::try_from(index) {
        Ok(index) => {
            let query = state.query.clone();
            let task = spawn_blocking(move || query.query_group(index));
            match timeout(state.options.read_timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    metrics::inc_group_query("error");
                    return Err(e.into());
                }
                Err(_) => {
                    metrics::inc_group_query("error");
                    return Err(anyhow!("分组 {index} 查询超时").into());
                }
            }
        }
        Err(_) => Err(QueryError::GroupNotFound),
    };

    match &result {
        Ok(_) => metrics::inc_group_query("ok"),
        Err(_) => metrics::inc_group_query("not_found"),
    }
    Ok(Json(result?))
}

/// 删除一张图片
#[utoipa::path(
    post,
    path = "/delete",
    request_body = DeleteRequest,
    responses(
        (status = 200, body = DeleteResponse),
        (status = 400, description = "请求体不是合法的 JSON，或缺少路径"),
    )
)]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<DeleteResponse>> {
    let request: DeleteRequest =
        serde_json::from_slice(&body).map_err(|_| BadRequest("Invalid JSON"))?;

    match state.deletion.delete_image(&request.path).await {
        Ok(()) => Ok(Json(DeleteResponse::ok())),
        Err(DeleteError::EmptyPath) => Err(BadRequest("Path is required").into()),
        Err(e) => Ok(Json(DeleteResponse::failed(e))),
    }
}

/// 返回图片文件，CR2 文件会先转换为 JPG
pub async fn image_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(relative): UrlPath<String>,
    request: Request,
) -> Response {
    let Some(path) = resolve_relative(&state.image_root, &relative) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !state.fs.exists(&path) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = if is_raw_format(&path) {
        match state.cache.convert(&path).await {
            Ok(derived) => derived,
            Err(e) => {
                error!("转换 CR2 文件 {} 失败: {}", path.display(), e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process CR2 file")
                    .into_response();
            }
        }
    } else {
        path
    };

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(never) => match never {},
    }
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn style_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], STYLE_CSS)
}

pub async fn script_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], SCRIPT_JS)
}

/// Prometheus 指标
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let text = metrics::gather_text()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
