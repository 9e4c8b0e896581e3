// 存储模块数据类型定义

use serde::{Deserialize, Serialize};
use std::path::Path;

// 重新导出配置模块中的存储相关配置
pub use crate::config::{OnCollision, StorageConfig};

/// 存储错误码
/// 错误码范围：40001 - 40099
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// 文件名无效
    InvalidFilename = 40001,
    /// 路径穿越攻击
    PathTraversalDetected = 40002,
    /// 上传内容不是图片
    NotAnImage = 40003,
    /// 文件不存在
    FileNotFound = 40004,
    /// 上传内容为空
    EmptyPayload = 40005,
    /// 文件超过大小限制
    PayloadTooLarge = 40006,
    /// 请求缺少 image 字段
    MissingImageField = 40007,
    /// 存储读写失败
    StoreIoFailed = 40008,
    /// multipart 请求解析失败
    MultipartInvalid = 40009,
}

impl StorageErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidFilename => "文件名无效",
            Self::PathTraversalDetected => "检测到路径穿越攻击",
            Self::NotAnImage => "上传内容不是可识别的图片格式",
            Self::FileNotFound => "文件不存在",
            Self::EmptyPayload => "上传内容为空",
            Self::PayloadTooLarge => "文件超过大小限制",
            Self::MissingImageField => "请求中缺少 image 文件字段",
            Self::StoreIoFailed => "存储读写失败",
            Self::MultipartInvalid => "multipart 请求解析失败",
        }
    }
}

/// 存储错误
#[derive(Debug)]
pub struct StorageError {
    pub code: StorageErrorCode,
    pub message: String,
    pub filename: Option<String>,
}

impl StorageError {
    pub fn new(code: StorageErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// 包装存储读写错误
    pub fn io(err: std::io::Error) -> Self {
        Self::new(StorageErrorCode::StoreIoFailed).with_message(format!("存储读写失败: {}", err))
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref filename) = self.filename {
            write!(f, "{}: {}", self.message, filename)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for StorageError {}

/// 已存储的图片记录
///
/// 字段命名与原有 API 契约保持一致（name 与 filename 同值）
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    /// 图片名称
    pub name: String,
    /// 文件名（即标识符）
    pub filename: String,
    /// 访问 URL
    pub url: String,
    /// 文件大小（字节）
    pub size: u64,
    /// 修改时间 (ISO8601)
    pub updated: Option<String>,
}

/// 排序字段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    Size,
    Updated,
}

/// 排序顺序
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// 列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// 排序字段
    #[serde(default)]
    pub sort_field: SortField,
    /// 排序顺序
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// 生成图片的访问 URL
///
/// 本地存储直接由后端提供文件内容，返回相对路径即可
pub fn image_url(filename: &str) -> String {
    format!("/api/image/{}", filename)
}

/// 根据扩展名推断 Content-Type
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_code() {
        assert_eq!(StorageErrorCode::InvalidFilename.code(), 40001);
        assert_eq!(StorageErrorCode::FileNotFound.code(), 40004);
        assert_eq!(StorageErrorCode::MultipartInvalid.code(), 40009);
    }

    #[test]
    fn test_storage_error_builder() {
        let err = StorageError::new(StorageErrorCode::FileNotFound).with_filename("cat.png");
        assert_eq!(err.code, StorageErrorCode::FileNotFound);
        assert_eq!(err.filename.as_deref(), Some("cat.png"));
        assert!(err.to_string().contains("cat.png"));
    }

    #[test]
    fn test_image_url() {
        assert_eq!(image_url("cat.png"), "/api/image/cat.png");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.png")), "image/png");
        assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(
            content_type_for(Path::new("noext")),
            "application/octet-stream"
        );
    }
}
