mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;
pub use self::types::{DeleteRequest, DeleteResponse};

#[derive(OpenApi)]
#[openapi(
    paths(api::group_handler, api::delete_handler),
    components(schemas(
        crate::query::GroupView,
        crate::query::ImageView,
        crate::metadata::MetadataDescriptor,
        types::DeleteRequest,
        types::DeleteResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    // 请求体限制只作用于删除接口
    let delete: Router<Arc<AppState>> = Router::new()
        .route("/delete", post(api::delete_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.options.body_limit));

    Router::new()
        .route("/", get(api::index_handler))
        .route("/style.css", get(api::style_handler))
        .route("/script.js", get(api::script_handler))
        .route("/group", get(api::group_handler))
        .merge(delete)
        .route("/images/{*path}", get(api::image_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
