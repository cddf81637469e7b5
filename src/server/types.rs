use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 分组查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GroupParams {
    /// 分组下标，缺失或无法解析时为 0
    pub idx: Option<String>,
}

impl GroupParams {
    pub fn index(&self) -> i64 {
        self.idx.as_deref().and_then(|s| s.trim().parse().ok()).unwrap_or(0)
    }
}

/// 删除请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteRequest {
    /// 要删除文件的绝对路径
    #[serde(default)]
    pub path: String,
}

/// 删除响应，是否成功只看 `success` 字段
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteResponse {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self { success: false, error: Some(error.to_string()) }
    }
}
