// API 错误类型

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::error;

/// API 层错误
///
/// 与存储域错误（StorageError）不同，这里承载配置等非存储接口的失败
#[derive(Debug)]
pub enum ApiError {
    /// 请求参数错误
    BadRequest(String),
    /// 内部错误
    Internal(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// 错误响应体
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: i32,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(e) => {
                error!("内部错误: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
            }
        };

        let body = Json(ErrorBody {
            code: status.as_u16() as i32,
            message,
        });

        (status, body).into_response()
    }
}
