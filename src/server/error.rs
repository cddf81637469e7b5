use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use thiserror::Error;

use crate::query::QueryError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// 请求格式错误
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BadRequest(pub &'static str);

/// API错误类型
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(e) = self.0.downcast_ref::<QueryError>() {
            return (StatusCode::NOT_FOUND, e.to_string()).into_response();
        }
        if let Some(e) = self.0.downcast_ref::<BadRequest>() {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
        error!("请求处理失败: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Something went wrong: {}", self.0))
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
