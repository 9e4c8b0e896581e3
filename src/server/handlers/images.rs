// 图片 API 处理器

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::server::state::AppState;
use crate::storage::{ListQuery, StorageError, StorageErrorCode, StoredImage};

/// 统一API响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 状态码 (0: 成功, 其他: 错误码)
    pub code: i32,
    /// 消息
    pub message: String,
    /// 数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    /// 无数据的成功响应，只携带消息
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: None,
        }
    }
}

/// 错误响应
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let status = match self.code {
            StorageErrorCode::InvalidFilename => StatusCode::BAD_REQUEST,
            StorageErrorCode::PathTraversalDetected => StatusCode::BAD_REQUEST,
            StorageErrorCode::NotAnImage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StorageErrorCode::FileNotFound => StatusCode::NOT_FOUND,
            StorageErrorCode::EmptyPayload => StatusCode::BAD_REQUEST,
            StorageErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            StorageErrorCode::MissingImageField => StatusCode::BAD_REQUEST,
            StorageErrorCode::StoreIoFailed => StatusCode::INTERNAL_SERVER_ERROR,
            StorageErrorCode::MultipartInvalid => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse {
            code: self.code.code(),
            message: self.message,
            filename: self.filename,
        });

        (status, body).into_response()
    }
}

/// POST /api/upload
/// 接收 multipart 表单中的 image 字段并保存
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<StoredImage>>), StorageError> {
    info!("API: 接收图片上传");

    let max_bytes = state.config.read().await.upload.max_file_size_bytes();

    // 在表单中查找 image 字段
    let mut part = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        StorageError::new(StorageErrorCode::MultipartInvalid)
            .with_message(format!("multipart 解析失败: {}", e))
    })? {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| {
                StorageError::new(StorageErrorCode::MultipartInvalid)
                    .with_message(format!("读取上传内容失败: {}", e))
            })?;
            part = Some((filename, bytes));
            break;
        }
    }

    let (filename, bytes) =
        part.ok_or_else(|| StorageError::new(StorageErrorCode::MissingImageField))?;

    if filename.is_empty() {
        return Err(
            StorageError::new(StorageErrorCode::InvalidFilename).with_message("未选择文件")
        );
    }

    if bytes.len() > max_bytes {
        return Err(StorageError::new(StorageErrorCode::PayloadTooLarge)
            .with_filename(&filename)
            .with_message(format!(
                "文件大小 {} 字节超过限制 {} 字节",
                bytes.len(),
                max_bytes
            )));
    }

    // 文件写入放到阻塞线程池执行
    let store = state.store.clone();
    let saved = tokio::task::spawn_blocking(move || store.save(&filename, &bytes))
        .await
        .map_err(|e| {
            StorageError::new(StorageErrorCode::StoreIoFailed)
                .with_message(format!("上传任务执行失败: {}", e))
        })?
        .map_err(|e| {
            error!("图片保存失败: {}", e);
            e
        })?;

    info!("文件上传成功: {} ({} 字节)", saved.filename, saved.size);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(saved))))
}

/// GET /api/images
/// 返回所有图片的访问 URL 列表
pub async fn get_image_urls(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<String>>, StorageError> {
    let images = state.store.list(&query)?;
    Ok(Json(images.into_iter().map(|img| img.url).collect()))
}

/// GET /api/list-images
/// 返回所有图片的元数据列表
pub async fn list_image_metadata(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StoredImage>>, StorageError> {
    let images = state.store.list(&query)?;
    Ok(Json(images))
}

/// GET /api/image/:filename
/// 返回图片文件内容
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, StorageError> {
    let (path, content_type) = state.store.resolve(&filename)?;

    let file = tokio::fs::File::open(&path).await.map_err(StorageError::io)?;
    let size = file.metadata().await.map_err(StorageError::io)?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .body(body)
        .map_err(|e| {
            StorageError::new(StorageErrorCode::StoreIoFailed)
                .with_message(format!("构造响应失败: {}", e))
        })
}

/// DELETE /api/delete-image/:filename
/// 删除指定图片
pub async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<ApiResponse<()>>, StorageError> {
    info!("API: 删除图片: {}", filename);

    state.store.delete(&filename)?;

    Ok(Json(ApiResponse::message(format!(
        "文件 '{}' 已删除",
        filename
    ))))
}
