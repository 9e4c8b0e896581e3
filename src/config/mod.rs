// 配置管理模块

pub mod env_detector;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

pub use env_detector::EnvDetector;

/// 默认配置文件路径
pub const CONFIG_PATH: &str = "config/app.toml";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// CORS允许的源
    pub cors_origins: Vec<String>,
}

/// 重名文件处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnCollision {
    /// 追加 UUID 后缀改名保存
    #[default]
    Rename,
    /// 覆盖已存在的文件
    Overwrite,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 图片存储目录（必须是绝对路径）
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// 重名文件处理策略
    #[serde(default)]
    pub on_collision: OnCollision,
}

fn default_storage_dir() -> PathBuf {
    // Docker 环境使用 /app/uploads，本地环境使用当前工作目录 + uploads
    if EnvDetector::is_docker() {
        PathBuf::from("/app/uploads")
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("uploads")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            on_collision: OnCollision::default(),
        }
    }
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 单个文件最大大小 (MB)
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_max_file_size_mb() -> u64 {
    20
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl UploadConfig {
    /// 最大文件大小（字节）
    pub fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb as usize) * 1024 * 1024
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 单个日志文件最大大小（字节，默认 50MB）
    #[serde(default = "default_log_max_file_size")]
    pub max_file_size: u64,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
            max_file_size: default_log_max_file_size(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Docker 环境使用 0.0.0.0 以便从宿主机访问，本地环境使用 127.0.0.1
        let host = if EnvDetector::is_docker() {
            "0.0.0.0".to_string()
        } else {
            "127.0.0.1".to_string()
        };

        Self {
            server: ServerConfig {
                host,
                port: 18080,
                cors_origins: vec!["*".to_string()],
            },
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl StorageConfig {
    /// 验证存储目录是否为绝对路径
    pub fn validate_storage_dir(&self) -> Result<()> {
        if !self.storage_dir.is_absolute() {
            anyhow::bail!(
                "存储目录必须是绝对路径，当前值: {:?}\n\
                 Windows 示例: D:\\uploads\n\
                 Linux/Docker 示例: /app/uploads",
                self.storage_dir
            );
        }
        Ok(())
    }

    /// 确保存储目录存在（不存在则自动创建）
    pub fn ensure_storage_dir_exists(&self) -> Result<()> {
        self.validate_storage_dir()?;

        std::fs::create_dir_all(&self.storage_dir)
            .with_context(|| format!("创建存储目录失败: {:?}", self.storage_dir))?;

        tracing::info!("存储目录已准备就绪: {:?}", self.storage_dir);
        Ok(())
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        // 验证存储路径是否为绝对路径
        config
            .storage
            .validate_storage_dir()
            .context("配置文件中的存储路径验证失败")?;

        Ok(config)
    }

    /// 加载配置，失败时回退到默认配置
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("已加载配置文件: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("加载配置文件失败（{}），使用默认配置: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    ///
    /// 保存前验证存储路径格式，并确保配置文件目录存在
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        self.storage
            .validate_storage_dir()
            .context("保存配置失败：存储路径必须是绝对路径")?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("创建配置目录失败")?;
            }
        }

        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, content)
            .await
            .context("写入配置文件失败")?;

        tracing::info!("配置已保存: {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 18080);
        assert_eq!(config.upload.max_file_size_mb, 20);
        assert_eq!(config.storage.on_collision, OnCollision::Rename);
        assert!(config.storage.storage_dir.is_absolute());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.toml");
        let path = path.to_str().unwrap();

        let config = AppConfig::default();
        config.save_to_file(path).await.unwrap();

        let loaded = AppConfig::load_from_file(path).await.unwrap();
        assert_eq!(loaded.server.port, config.server.port);
        assert_eq!(loaded.storage.storage_dir, config.storage.storage_dir);
        assert_eq!(loaded.upload.max_file_size_mb, config.upload.max_file_size_mb);
    }

    #[tokio::test]
    async fn test_load_or_default_missing_file() {
        let loaded = AppConfig::load_or_default("/nonexistent/app.toml").await;
        assert_eq!(loaded.server.port, AppConfig::default().server.port);
    }

    #[test]
    fn test_relative_storage_dir_rejected() {
        let config = StorageConfig {
            storage_dir: PathBuf::from("relative/uploads"),
            on_collision: OnCollision::Rename,
        };
        assert!(config.validate_storage_dir().is_err());
    }

    #[test]
    fn test_on_collision_toml_roundtrip() {
        let config = StorageConfig {
            storage_dir: PathBuf::from("/tmp/uploads"),
            on_collision: OnCollision::Overwrite,
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("overwrite"));

        let parsed: StorageConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.on_collision, OnCollision::Overwrite);
    }
}
