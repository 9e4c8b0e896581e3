// 应用状态

use crate::config::{AppConfig, CONFIG_PATH};
use crate::storage::ImageStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 应用全局状态
#[derive(Clone)]
pub struct AppState {
    /// 图片存储服务
    pub store: Arc<ImageStore>,
    /// 应用配置
    pub config: Arc<RwLock<AppConfig>>,
}

impl AppState {
    /// 创建新的应用状态
    ///
    /// 加载配置（失败时回退默认值）并初始化图片存储
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::load_or_default(CONFIG_PATH).await;

        config.storage.ensure_storage_dir_exists()?;
        let store = ImageStore::new(&config.storage)?;

        Ok(Self {
            store: Arc::new(store),
            config: Arc::new(RwLock::new(config)),
        })
    }
}
