// Image Host Rust Library
// 图片托管服务核心库

// 配置管理模块
pub mod config;

// 日志系统模块
pub mod logging;

// Web服务器模块
pub mod server;

// 图片存储模块
pub mod storage;

// 导出常用类型
pub use config::{AppConfig, LogConfig, OnCollision, StorageConfig, UploadConfig};
pub use server::{ApiError, ApiResult, AppState};
pub use storage::{
    ImageStore, ListQuery, NameGuard, SortField, SortOrder, StorageError, StorageErrorCode,
    StoredImage,
};
