// 配置管理 API

use crate::config::{AppConfig, CONFIG_PATH};
use crate::server::error::{ApiError, ApiResult};
use axum::{extract::State, response::Json};
use tracing::{info, warn};

use super::images::ApiResponse;

/// GET /api/config
/// 获取当前配置
pub async fn get_config(
    State(app_state): State<crate::server::AppState>,
) -> ApiResult<Json<ApiResponse<AppConfig>>> {
    let config = app_state.config.read().await.clone();
    Ok(Json(ApiResponse::success(config)))
}

/// PUT /api/config
/// 更新配置
///
/// 上传限制和重名策略立即生效；存储目录和服务器监听地址重启后生效
pub async fn update_config(
    State(app_state): State<crate::server::AppState>,
    Json(new_config): Json<AppConfig>,
) -> ApiResult<Json<ApiResponse<String>>> {
    info!("更新应用配置");

    // 基本验证
    if new_config.upload.max_file_size_mb == 0 {
        return Err(ApiError::BadRequest("文件大小限制必须大于0".to_string()));
    }

    new_config
        .storage
        .validate_storage_dir()
        .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?;

    // 存储目录在启动时固定在 ImageStore 中
    let current_dir = app_state.config.read().await.storage.storage_dir.clone();
    if new_config.storage.storage_dir != current_dir {
        warn!(
            "存储目录已修改，重启后生效: {:?} -> {:?}",
            current_dir, new_config.storage.storage_dir
        );
    }

    // 保存到文件
    new_config
        .save_to_file(CONFIG_PATH)
        .await
        .map_err(ApiError::Internal)?;

    // 更新内存中的配置
    *app_state.config.write().await = new_config;

    info!("配置更新成功");
    Ok(Json(ApiResponse::success("配置已更新".to_string())))
}
